//! Tests for expense records, approval rules and the authorization policy

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal_macros::dec;

use core_kernel::{Currency, UserId};

use domain_expense::approval_rule::{ApprovalRule, ApprovalRuleUpdate};
use domain_expense::authorization::{authorize, Action, AuthorizationDecision, Principal, Role};
use domain_expense::decision::Decision;
use domain_expense::error::ExpenseError;
use domain_expense::expense::{ExpenseCategory, ExpenseRecord, ExpenseStatus};

use test_utils::{
    assert_invalid_state_error, assert_not_found_error, assert_validation_error, claim_amount_strategy,
    category_strategy, low_percentage_strategy, negative_amount_strategy, valid_percentage_strategy,
    ApprovalRuleBuilder, ExpenseRecordBuilder, IdFixtures, NewExpenseBuilder,
};

// ============================================================================
// Expense Record Tests
// ============================================================================

mod record_tests {
    use super::*;

    fn draft() -> ExpenseRecord {
        ExpenseRecord::create(IdFixtures::employee_id(), NewExpenseBuilder::new().build(), Currency::USD, Utc::now())
            .unwrap()
    }

    #[test]
    fn test_create_travel_claim() {
        let record = draft();

        assert_eq!(record.status, ExpenseStatus::Draft);
        assert_eq!(record.category, ExpenseCategory::Travel);
        assert_eq!(record.amount.amount(), dec!(150.00));
        assert_eq!(record.amount.currency(), Currency::USD);
        assert_eq!(record.employee_id, IdFixtures::employee_id());
        assert!(record.approval_date.is_none());
    }

    #[test]
    fn test_create_uses_requested_currency() {
        let input = NewExpenseBuilder::new().with_currency(Currency::EUR).build();
        let record = ExpenseRecord::create(UserId::new(), input, Currency::USD, Utc::now()).unwrap();
        assert_eq!(record.amount.currency(), Currency::EUR);
    }

    #[test]
    fn test_create_negative_amount_fails() {
        let input = NewExpenseBuilder::new().with_amount(dec!(-0.01)).build();
        assert_validation_error(ExpenseRecord::create(UserId::new(), input, Currency::USD, Utc::now()));
    }

    #[test]
    fn test_create_zero_amount_is_allowed() {
        let input = NewExpenseBuilder::new().with_amount(dec!(0)).build();
        assert!(ExpenseRecord::create(UserId::new(), input, Currency::USD, Utc::now()).is_ok());
    }

    #[test]
    fn test_create_unknown_category_fails() {
        let input = NewExpenseBuilder::new().with_category("Entertainment").build();
        assert_validation_error(ExpenseRecord::create(UserId::new(), input, Currency::USD, Utc::now()));
    }

    #[test]
    fn test_create_category_is_case_insensitive() {
        let input = NewExpenseBuilder::new().with_category("food").build();
        let record = ExpenseRecord::create(UserId::new(), input, Currency::USD, Utc::now()).unwrap();
        assert_eq!(record.category, ExpenseCategory::Food);
    }

    #[test]
    fn test_create_lists_all_missing_fields() {
        let input = NewExpenseBuilder::new().without_amount().without_description().build();
        let err = ExpenseRecord::create(UserId::new(), input, Currency::USD, Utc::now()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("amount"));
        assert!(message.contains("description"));
        assert!(!message.contains("category"));
    }

    #[test]
    fn test_submit_moves_to_pending() {
        let mut record = draft();
        record.submit(IdFixtures::employee_id(), Utc::now()).unwrap();
        assert_eq!(record.status, ExpenseStatus::Pending);
    }

    #[test]
    fn test_submit_twice_fails() {
        let mut record = draft();
        record.submit(IdFixtures::employee_id(), Utc::now()).unwrap();
        assert_invalid_state_error(record.submit(IdFixtures::employee_id(), Utc::now()));
    }

    #[test]
    fn test_submit_by_other_user_is_not_found() {
        let mut record = draft();
        assert_not_found_error(record.submit(UserId::new(), Utc::now()));
        assert_eq!(record.status, ExpenseStatus::Draft);
    }

    #[test]
    fn test_decide_on_draft_fails() {
        let mut record = draft();
        let result = record.decide(IdFixtures::manager_id(), Decision::Approved, None, Utc::now());
        assert!(matches!(
            result,
            Err(ExpenseError::InvalidStatusTransition {
                from: ExpenseStatus::Draft,
                to: ExpenseStatus::Completed
            })
        ));
    }

    #[test]
    fn test_decide_records_decision_fields() {
        let mut record = draft();
        record.submit(IdFixtures::employee_id(), Utc::now()).unwrap();
        record
            .decide(IdFixtures::manager_id(), Decision::Rejected, Some("no receipt".to_string()), Utc::now())
            .unwrap();

        assert_eq!(record.status, ExpenseStatus::Rejected);
        assert_eq!(record.manager_id, Some(IdFixtures::manager_id()));
        assert_eq!(record.comments.as_deref(), Some("no receipt"));
        assert!(record.approval_date.is_some());
    }

    #[test]
    fn test_decide_only_once() {
        let mut record = draft();
        record.submit(IdFixtures::employee_id(), Utc::now()).unwrap();
        record.decide(IdFixtures::manager_id(), Decision::Approved, None, Utc::now()).unwrap();
        assert_invalid_state_error(record.decide(UserId::new(), Decision::Rejected, None, Utc::now()));
        assert_eq!(record.manager_id, Some(IdFixtures::manager_id()));
    }

    #[test]
    fn test_vote_twice_fails() {
        let approver = UserId::new();
        let mut record = ExpenseRecordBuilder::new().with_status(ExpenseStatus::Pending).build();
        record.record_vote(approver, Decision::Approved, None, Utc::now()).unwrap();
        assert_invalid_state_error(record.record_vote(approver, Decision::Rejected, None, Utc::now()));
    }

    #[test]
    fn test_vote_on_draft_fails() {
        let mut record = ExpenseRecordBuilder::new().build();
        assert_invalid_state_error(record.record_vote(UserId::new(), Decision::Approved, None, Utc::now()));
    }

    #[test]
    fn test_decision_parse() {
        assert_eq!(" approved ".parse::<Decision>().unwrap(), Decision::Approved);
        assert!(matches!("Pending".parse::<Decision>(), Err(ExpenseError::InvalidInput(_))));
    }

    proptest! {
        #[test]
        fn valid_inputs_create_drafts(amount in claim_amount_strategy(), category in category_strategy()) {
            let input = NewExpenseBuilder::new()
                .with_amount(amount)
                .with_category(category.as_str())
                .build();
            let record = ExpenseRecord::create(UserId::new(), input, Currency::USD, Utc::now()).unwrap();
            prop_assert_eq!(record.status, ExpenseStatus::Draft);
            prop_assert!(!record.amount.is_negative());
        }

        #[test]
        fn negative_amounts_are_rejected(amount in negative_amount_strategy()) {
            let input = NewExpenseBuilder::new().with_amount(amount).build();
            prop_assert!(ExpenseRecord::create(UserId::new(), input, Currency::USD, Utc::now()).is_err());
        }
    }
}

// ============================================================================
// State Machine Tests
// ============================================================================

mod state_machine_tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        use ExpenseStatus::*;
        let allowed = [
            (Draft, Pending),
            (Pending, Completed),
            (Pending, Rejected),
            (Pending, Approved),
            (Approved, Completed),
        ];
        for from in ExpenseStatus::ALL {
            for to in ExpenseStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_transition_error_names_both_states() {
        let mut record = ExpenseRecordBuilder::new().with_status(ExpenseStatus::Completed).build();
        let err = record.transition_to(ExpenseStatus::Pending, Utc::now()).unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(err.to_string(), "Invalid status transition from Completed to Pending");
    }

    #[test]
    fn test_status_parse_round_trips_display() {
        for status in ExpenseStatus::ALL {
            assert_eq!(status.to_string().parse::<ExpenseStatus>().unwrap(), status);
        }
    }
}

// ============================================================================
// Approval Rule Tests
// ============================================================================

mod rule_tests {
    use super::*;

    #[test]
    fn test_rule_80_fails_81_succeeds() {
        assert_validation_error(ApprovalRule::new(
            IdFixtures::admin_id(),
            ApprovalRuleBuilder::new().with_percentage(80).input(),
            Utc::now(),
        ));
        let rule = ApprovalRule::new(
            IdFixtures::admin_id(),
            ApprovalRuleBuilder::new().with_percentage(81).input(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(rule.min_approval_percentage, 81);
        assert_eq!(rule.created_by, IdFixtures::admin_id());
    }

    #[test]
    fn test_empty_approvers_fail() {
        assert_validation_error(ApprovalRule::new(
            IdFixtures::admin_id(),
            ApprovalRuleBuilder::new().with_approvers(vec![]).input(),
            Utc::now(),
        ));
    }

    #[test]
    fn test_duplicate_approvers_fail() {
        let approver = UserId::new();
        assert_validation_error(ApprovalRule::new(
            IdFixtures::admin_id(),
            ApprovalRuleBuilder::new().with_approvers(vec![approver, approver]).input(),
            Utc::now(),
        ));
    }

    #[test]
    fn test_blank_description_fails() {
        assert_validation_error(ApprovalRule::new(
            IdFixtures::admin_id(),
            ApprovalRuleBuilder::new().with_description("  ").input(),
            Utc::now(),
        ));
    }

    #[test]
    fn test_partial_update_keeps_other_fields() {
        let mut rule = ApprovalRuleBuilder::new().with_percentage(90).build();
        let approvers = rule.approvers.clone();

        rule.apply_update(
            ApprovalRuleUpdate {
                min_approval_percentage: Some(95),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(rule.min_approval_percentage, 95);
        assert_eq!(rule.approvers, approvers);
        assert_eq!(rule.description, "Department consensus");
    }

    #[test]
    fn test_update_to_empty_approvers_fails() {
        let mut rule = ApprovalRuleBuilder::new().build();
        assert_validation_error(rule.apply_update(
            ApprovalRuleUpdate {
                approvers: Some(vec![]),
                ..Default::default()
            },
            Utc::now(),
        ));
        assert_eq!(rule.approvers.len(), 5);
    }

    proptest! {
        #[test]
        fn percentages_in_range_are_accepted(pct in valid_percentage_strategy()) {
            let input = ApprovalRuleBuilder::new().with_percentage(pct).input();
            prop_assert!(ApprovalRule::new(IdFixtures::admin_id(), input, Utc::now()).is_ok());
        }

        #[test]
        fn percentages_below_81_are_rejected(pct in low_percentage_strategy()) {
            let input = ApprovalRuleBuilder::new().with_percentage(pct).input();
            let result = ApprovalRule::new(IdFixtures::admin_id(), input, Utc::now());
            prop_assert!(matches!(result, Err(ExpenseError::Validation(_))));
        }
    }
}

// ============================================================================
// Authorization Tests
// ============================================================================

mod authorization_tests {
    use super::*;

    fn expected(role: Role, action: Action) -> bool {
        match action {
            Action::CreateExpense | Action::SubmitExpense => matches!(role, Role::Employee | Role::Manager),
            Action::ViewOwnExpenses => true,
            Action::ReviewExpenses | Action::DecideExpense | Action::CastApproval => {
                matches!(role, Role::Manager | Role::Admin)
            }
            Action::ManageApprovalRules | Action::ManageUsers => role == Role::Admin,
        }
    }

    #[test]
    fn test_policy_table_is_exhaustive() {
        for role in Role::ALL {
            for action in Action::ALL {
                let decision = authorize(role, action);
                assert_eq!(
                    decision.is_allowed(),
                    expected(role, action),
                    "{} / {}",
                    role,
                    action
                );
                if let AuthorizationDecision::Denied { reason } = decision {
                    assert!(!reason.is_empty());
                }
            }
        }
    }

    #[test]
    fn test_principal_require_maps_to_authorization_error() {
        let employee = Principal::new(IdFixtures::employee_id(), Role::Employee);
        assert!(employee.require(Action::CreateExpense).is_ok());
        assert!(matches!(
            employee.require(Action::ManageUsers),
            Err(ExpenseError::Authorization(_))
        ));
    }

    #[test]
    fn test_can_view() {
        let record = ExpenseRecordBuilder::new().build();
        let owner = Principal::new(IdFixtures::employee_id(), Role::Employee);
        let stranger = Principal::new(UserId::new(), Role::Employee);
        let manager = Principal::new(IdFixtures::manager_id(), Role::Manager);

        assert!(owner.can_view(&record));
        assert!(!stranger.can_view(&record));
        assert!(manager.can_view(&record));
    }
}

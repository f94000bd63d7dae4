//! Tests for the approval consensus evaluator

use proptest::prelude::*;
use rust_decimal_macros::dec;

use core_kernel::UserId;

use domain_expense::approval_rule::ApprovalRule;
use domain_expense::consensus::{evaluate, ConsensusOutcome};
use domain_expense::decision::{ApproverDecision, DecisionSnapshot};

use test_utils::{approvers_with_snapshot_strategy, valid_percentage_strategy, ApprovalRuleBuilder};

fn five_approver_rule(percentage: u32) -> ApprovalRule {
    ApprovalRuleBuilder::new().with_percentage(percentage).build()
}

fn snapshot(rule: &ApprovalRule, decisions: &[ApproverDecision]) -> DecisionSnapshot {
    rule.approvers
        .iter()
        .zip(decisions.iter())
        .map(|(a, d)| (*a, *d))
        .collect()
}

mod threshold_tests {
    use super::*;
    use ApproverDecision::{Approved, Pending, Rejected};

    #[test]
    fn test_four_of_five_at_81_is_pending() {
        let rule = five_approver_rule(81);
        let tally = evaluate(&rule, &snapshot(&rule, &[Approved, Approved, Approved, Approved, Pending]));

        assert_eq!(tally.outcome, ConsensusOutcome::Pending);
        assert_eq!(tally.approved, 4);
        assert_eq!(tally.approval_percentage, dec!(80));
    }

    #[test]
    fn test_five_of_five_at_81_is_approved() {
        let rule = five_approver_rule(81);
        let tally = evaluate(&rule, &snapshot(&rule, &[Approved; 5]));

        assert_eq!(tally.outcome, ConsensusOutcome::Approved);
        assert_eq!(tally.approval_percentage, dec!(100));
    }

    #[test]
    fn test_one_rejection_of_five_at_81_short_circuits() {
        let rule = five_approver_rule(81);
        let tally = evaluate(&rule, &snapshot(&rule, &[Rejected]));

        assert_eq!(tally.outcome, ConsensusOutcome::Rejected);
        assert_eq!(tally.rejected, 1);
        assert_eq!(tally.pending, 4);
    }

    #[test]
    fn test_four_approvals_one_rejection_at_81_rejects() {
        let rule = five_approver_rule(81);
        let tally = evaluate(&rule, &snapshot(&rule, &[Approved, Approved, Approved, Approved, Rejected]));
        assert_eq!(tally.outcome, ConsensusOutcome::Rejected);
    }

    #[test]
    fn test_ten_approvers_nine_approve_at_90() {
        let approvers: Vec<UserId> = (0..10).map(|_| UserId::new()).collect();
        let rule = ApprovalRuleBuilder::new().with_approvers(approvers).with_percentage(90).build();
        let mut decisions = vec![Approved; 9];
        decisions.push(Rejected);

        let tally = evaluate(&rule, &snapshot(&rule, &decisions));
        assert_eq!(tally.outcome, ConsensusOutcome::Approved);
        assert_eq!(tally.approval_percentage, dec!(90));
    }

    #[test]
    fn test_three_approvers_percentage_is_rounded() {
        let approvers: Vec<UserId> = (0..3).map(|_| UserId::new()).collect();
        let rule = ApprovalRuleBuilder::new().with_approvers(approvers).with_percentage(100).build();
        let tally = evaluate(&rule, &snapshot(&rule, &[Approved]));

        assert_eq!(tally.approval_percentage, dec!(33.33));
        assert_eq!(tally.outcome, ConsensusOutcome::Pending);
    }

    #[test]
    fn test_single_approver_rule_models_manager_decision() {
        let manager = UserId::new();
        let rule = ApprovalRule::single_approver(manager, UserId::new(), chrono::Utc::now());

        let mut approved = DecisionSnapshot::new();
        approved.insert(manager, Approved);
        assert_eq!(evaluate(&rule, &approved).outcome, ConsensusOutcome::Approved);

        let mut rejected = DecisionSnapshot::new();
        rejected.insert(manager, Rejected);
        assert_eq!(evaluate(&rule, &rejected).outcome, ConsensusOutcome::Rejected);
    }
}

mod property_tests {
    use super::*;

    fn rule_for(approvers: Vec<UserId>, percentage: u32) -> ApprovalRule {
        ApprovalRuleBuilder::new()
            .with_approvers(approvers)
            .with_percentage(percentage)
            .build()
    }

    proptest! {
        #[test]
        fn evaluation_is_deterministic(
            (approvers, snapshot) in approvers_with_snapshot_strategy(9),
            pct in valid_percentage_strategy(),
        ) {
            let rule = rule_for(approvers, pct);
            prop_assert_eq!(evaluate(&rule, &snapshot), evaluate(&rule, &snapshot));
        }

        #[test]
        fn counts_cover_every_approver(
            (approvers, snapshot) in approvers_with_snapshot_strategy(9),
            pct in valid_percentage_strategy(),
        ) {
            let count = approvers.len() as u32;
            let tally = evaluate(&rule_for(approvers, pct), &snapshot);
            prop_assert_eq!(tally.approved + tally.rejected + tally.pending, count);
            prop_assert_eq!(tally.total, count);
        }

        #[test]
        fn outcome_matches_integer_thresholds(
            (approvers, snapshot) in approvers_with_snapshot_strategy(9),
            pct in valid_percentage_strategy(),
        ) {
            let tally = evaluate(&rule_for(approvers, pct), &snapshot);
            let needed = u64::from(pct) * u64::from(tally.total);
            match tally.outcome {
                ConsensusOutcome::Approved => prop_assert!(u64::from(tally.approved) * 100 >= needed),
                ConsensusOutcome::Rejected => {
                    prop_assert!(u64::from(tally.approved + tally.pending) * 100 < needed)
                }
                ConsensusOutcome::Pending => {
                    prop_assert!(u64::from(tally.approved) * 100 < needed);
                    prop_assert!(u64::from(tally.approved + tally.pending) * 100 >= needed);
                }
            }
        }

        #[test]
        fn all_pending_never_rejects(n in 1usize..10, pct in valid_percentage_strategy()) {
            let approvers: Vec<UserId> = (0..n).map(|_| UserId::new()).collect();
            let tally = evaluate(&rule_for(approvers, pct), &DecisionSnapshot::new());
            prop_assert_eq!(tally.outcome, ConsensusOutcome::Pending);
        }
    }
}

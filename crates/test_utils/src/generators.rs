//! Property-Based Test Generators
//!
//! Proptest strategies that produce domain-valid data, plus `fake`-backed
//! helpers for realistic names and emails.

use core_kernel::{Currency, Money, UserId};
use domain_expense::{ApproverDecision, DecisionSnapshot, ExpenseCategory};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for generating supported currencies
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::USD),
        Just(Currency::EUR),
        Just(Currency::GBP),
        Just(Currency::JPY),
        Just(Currency::INR),
        Just(Currency::AUD),
        Just(Currency::CAD),
    ]
}

/// Non-negative claim amounts, two decimal places, up to 1,000,000.00
pub fn claim_amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strictly negative amounts
pub fn negative_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(-cents, 2))
}

pub fn claim_money_strategy() -> impl Strategy<Value = Money> {
    (claim_amount_strategy(), currency_strategy())
        .prop_map(|(amount, currency)| Money::new(amount, currency))
}

pub fn category_strategy() -> impl Strategy<Value = ExpenseCategory> {
    prop::sample::select(ExpenseCategory::ALL.to_vec())
}

/// Accepted consensus thresholds
pub fn valid_percentage_strategy() -> impl Strategy<Value = u32> {
    81u32..=100u32
}

/// Thresholds below the accepted range
pub fn low_percentage_strategy() -> impl Strategy<Value = u32> {
    0u32..81u32
}

pub fn approver_decision_strategy() -> impl Strategy<Value = ApproverDecision> {
    prop_oneof![
        Just(ApproverDecision::Approved),
        Just(ApproverDecision::Rejected),
        Just(ApproverDecision::Pending),
    ]
}

/// A set of approvers together with a snapshot of their positions
pub fn approvers_with_snapshot_strategy(
    max_approvers: usize,
) -> impl Strategy<Value = (Vec<UserId>, DecisionSnapshot)> {
    prop::collection::vec(approver_decision_strategy(), 1..=max_approvers).prop_map(|decisions| {
        let approvers: Vec<UserId> = decisions.iter().map(|_| UserId::new()).collect();
        let snapshot = approvers
            .iter()
            .zip(decisions)
            .filter(|(_, d)| *d != ApproverDecision::Pending)
            .map(|(a, d)| (*a, d))
            .collect();
        (approvers, snapshot)
    })
}

/// A realistic full name
pub fn fake_name() -> String {
    Name().fake()
}

/// A realistic, non-routable email address
pub fn fake_email() -> String {
    SafeEmail().fake()
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn claim_amounts_are_non_negative(amount in claim_amount_strategy()) {
            prop_assert!(!amount.is_sign_negative() || amount.is_zero());
        }

        #[test]
        fn snapshot_only_names_rule_approvers((approvers, snapshot) in approvers_with_snapshot_strategy(7)) {
            prop_assert!(snapshot.keys().all(|k| approvers.contains(k)));
            prop_assert!(snapshot.values().all(|d| *d != ApproverDecision::Pending));
        }
    }

    #[test]
    fn fake_email_has_at_sign() {
        assert!(fake_email().contains('@'));
    }
}

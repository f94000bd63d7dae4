//! Custom Test Assertions
//!
//! Assertion helpers for domain types that give more meaningful failure
//! messages than bare `assert!`.

use core_kernel::Money;
use domain_expense::{ExpenseError, ExpenseRecord, ExpenseStatus};
use rust_decimal::Decimal;

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies differ or the amounts differ by more than `tolerance`
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

pub fn assert_status(record: &ExpenseRecord, expected: ExpenseStatus) {
    assert_eq!(
        record.status, expected,
        "Expense {} is {}, expected {}",
        record.id, record.status, expected
    );
}

/// Asserts the decision fields are written
pub fn assert_decided(record: &ExpenseRecord) {
    assert!(
        record.status.is_terminal(),
        "Expense {} is {}, expected a terminal status",
        record.id,
        record.status
    );
    assert!(record.manager_id.is_some(), "Expense {} has no deciding manager", record.id);
    assert!(record.approval_date.is_some(), "Expense {} has no decision date", record.id);
}

/// Asserts the decision fields are still empty
pub fn assert_undecided(record: &ExpenseRecord) {
    assert!(record.manager_id.is_none(), "Expense {} already has a deciding manager", record.id);
    assert!(record.approval_date.is_none(), "Expense {} already has a decision date", record.id);
}

pub fn assert_validation_error<T: std::fmt::Debug>(result: Result<T, ExpenseError>) {
    match result {
        Err(ExpenseError::Validation(_)) => {}
        other => panic!("Expected validation error, got {:?}", other),
    }
}

pub fn assert_invalid_state_error<T: std::fmt::Debug>(result: Result<T, ExpenseError>) {
    match result {
        Err(e) if e.is_invalid_state() => {}
        other => panic!("Expected invalid state error, got {:?}", other),
    }
}

pub fn assert_not_found_error<T: std::fmt::Debug>(result: Result<T, ExpenseError>) {
    match result {
        Err(ExpenseError::NotFound { .. }) => {}
        other => panic!("Expected not found error, got {:?}", other),
    }
}

pub fn assert_authorization_error<T: std::fmt::Debug>(result: Result<T, ExpenseError>) {
    match result {
        Err(ExpenseError::Authorization(_)) => {}
        other => panic!("Expected authorization error, got {:?}", other),
    }
}

pub fn assert_conflict_error<T: std::fmt::Debug>(result: Result<T, ExpenseError>) {
    match result {
        Err(ExpenseError::Conflict(_)) => {}
        other => panic!("Expected conflict error, got {:?}", other),
    }
}

//! Expense domain errors

use thiserror::Error;

use core_kernel::{MoneyError, PortError};
use crate::expense::ExpenseStatus;

/// Errors that can occur in the expense domain
#[derive(Debug, Error)]
pub enum ExpenseError {
    /// Bad input shape or values, surfaced to the caller verbatim
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: ExpenseStatus, to: ExpenseStatus },

    /// The operation is not legal for the record's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Lost an optimistic-concurrency race or hit a uniqueness constraint
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Port(PortError),
}

impl ExpenseError {
    pub fn validation(message: impl Into<String>) -> Self {
        ExpenseError::Validation(message.into())
    }

    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        ExpenseError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        ExpenseError::InvalidState(message.into())
    }

    /// True for both transition-table violations and other state preconditions
    pub fn is_invalid_state(&self) -> bool {
        matches!(
            self,
            ExpenseError::InvalidStatusTransition { .. } | ExpenseError::InvalidState(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ExpenseError::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ExpenseError::Validation(_))
    }
}

impl From<PortError> for ExpenseError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => ExpenseError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Validation { message, field } => match field {
                Some(field) => ExpenseError::Validation(format!("{}: {}", field, message)),
                None => ExpenseError::Validation(message),
            },
            PortError::Conflict { message } => ExpenseError::Conflict(message),
            other => ExpenseError::Port(other),
        }
    }
}

impl From<MoneyError> for ExpenseError {
    fn from(error: MoneyError) -> Self {
        ExpenseError::Validation(error.to_string())
    }
}

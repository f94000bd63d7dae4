//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use domain_expense::ExpenseError;

use crate::auth::AuthError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The operation is not legal for the expense's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Request body failed field validation
    #[error("Validation error")]
    InvalidFields(Vec<String>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized".to_string(), None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::InvalidState(msg) => (StatusCode::CONFLICT, "invalid_state", msg, None),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg, None),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg, None),
            ApiError::InvalidFields(details) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(details),
            ),
            ApiError::InvalidInput(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_input", msg, None),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ExpenseError> for ApiError {
    fn from(err: ExpenseError) -> Self {
        match err {
            ExpenseError::Validation(msg) => ApiError::Validation(msg),
            ExpenseError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            ExpenseError::InvalidStatusTransition { .. } => ApiError::InvalidState(err.to_string()),
            ExpenseError::InvalidState(msg) => ApiError::InvalidState(msg),
            ExpenseError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            ExpenseError::Authorization(msg) => ApiError::Forbidden(msg),
            ExpenseError::Conflict(msg) => ApiError::Conflict(msg),
            ExpenseError::Port(port) => {
                error!(error = %port, "Store failure");
                ApiError::Internal("storage failure".to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => format!("{}: {}", field, message),
                    None => format!("{}: {}", field, e.code),
                })
            })
            .collect();
        details.sort();
        ApiError::InvalidFields(details)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenCreation(msg) => ApiError::Internal(msg),
            _ => ApiError::Unauthorized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ExpenseError::validation("x"), StatusCode::UNPROCESSABLE_ENTITY),
            (ExpenseError::InvalidInput("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (ExpenseError::not_found("Expense", "EXP-1"), StatusCode::NOT_FOUND),
            (ExpenseError::invalid_state("x"), StatusCode::CONFLICT),
            (ExpenseError::Conflict("x".into()), StatusCode::CONFLICT),
            (ExpenseError::Authorization("x".into()), StatusCode::FORBIDDEN),
            (
                ExpenseError::Port(core_kernel::PortError::internal("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_unauthorized() {
        assert_eq!(ApiError::Unauthorized.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}

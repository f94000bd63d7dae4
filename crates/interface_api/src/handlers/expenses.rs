//! Employee expense handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::ExpenseId;
use domain_expense::{Action, Principal};

use crate::{AppState, error::ApiError};
use crate::dto::expense::*;

/// Lists the caller's own expenses, newest first
pub async fn list_own_expenses(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<ExpenseResponse>>, ApiError> {
    principal.require(Action::ViewOwnExpenses)?;
    let records = state.expenses.list_for_employee(principal.user_id).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// Creates a draft expense
pub async fn create_expense(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<ExpenseResponse>), ApiError> {
    principal.require(Action::CreateExpense)?;
    request.validate()?;

    let record = state
        .expenses
        .create(principal.user_id, request.into_new_expense()?)
        .await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

/// Submits a draft for review
pub async fn submit_expense(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    principal.require(Action::SubmitExpense)?;
    let record = state
        .expenses
        .submit(ExpenseId::from_uuid(id), principal.user_id)
        .await?;
    Ok(Json(record.into()))
}

/// Gets one expense; employees only see their own
pub async fn get_expense(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    let record = state.expenses.get(ExpenseId::from_uuid(id)).await?;
    if !principal.can_view(&record) {
        return Err(ApiError::Forbidden(format!(
            "expense {} belongs to another employee",
            record.id
        )));
    }
    Ok(Json(record.into()))
}

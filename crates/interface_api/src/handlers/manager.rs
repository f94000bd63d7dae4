//! Manager review handlers

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::ExpenseId;
use domain_expense::{Action, Principal};

use crate::{AppState, error::ApiError};
use crate::dto::expense::*;

/// Lists expenses awaiting a decision
pub async fn list_pending(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<ExpenseResponse>>, ApiError> {
    principal.require(Action::ReviewExpenses)?;
    let records = state.expenses.list_pending().await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// Lists all expenses, optionally filtered
pub async fn list_all(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ExpenseQuery>,
) -> Result<Json<Vec<ExpenseResponse>>, ApiError> {
    principal.require(Action::ReviewExpenses)?;
    let records = state.expenses.find(&query.into_filter()?).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// Approves or rejects a pending expense
pub async fn decide_expense(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(request): Json<DecideRequest>,
) -> Result<Json<DecisionResponse>, ApiError> {
    principal.require(Action::DecideExpense)?;
    request.validate()?;
    let decision = request.decision()?;

    let report = state
        .expenses
        .decide(ExpenseId::from_uuid(id), principal.user_id, decision, request.comments)
        .await?;
    Ok(Json(report.into()))
}

/// Records the caller's vote on a rule-governed expense
pub async fn cast_approval(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(request): Json<CastApprovalRequest>,
) -> Result<Json<ApprovalResponse>, ApiError> {
    principal.require(Action::CastApproval)?;
    request.validate()?;
    let vote = request.decision()?;

    let report = state
        .expenses
        .cast_approval(ExpenseId::from_uuid(id), principal.user_id, vote, request.comments)
        .await?;
    Ok(Json(report.into()))
}

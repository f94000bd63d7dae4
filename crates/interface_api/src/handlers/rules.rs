//! Approval rule handlers (admin only)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::ApprovalRuleId;
use domain_expense::{Action, Principal};

use crate::{AppState, error::ApiError};
use crate::dto::rule::*;

pub async fn create_rule(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateRuleRequest>,
) -> Result<(StatusCode, Json<RuleResponse>), ApiError> {
    principal.require(Action::ManageApprovalRules)?;
    request.validate()?;

    let rule = state.rules.create_rule(principal.user_id, request.into()).await?;
    Ok((StatusCode::CREATED, Json(rule.into())))
}

pub async fn list_rules(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<RuleResponse>>, ApiError> {
    principal.require(Action::ManageApprovalRules)?;
    let rules = state.rules.list_rules().await?;
    Ok(Json(rules.into_iter().map(Into::into).collect()))
}

pub async fn get_rule(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<RuleResponse>, ApiError> {
    principal.require(Action::ManageApprovalRules)?;
    let rule = state.rules.get_rule(ApprovalRuleId::from_uuid(id)).await?;
    Ok(Json(rule.into()))
}

/// Applies a partial update
pub async fn update_rule(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRuleRequest>,
) -> Result<Json<RuleResponse>, ApiError> {
    principal.require(Action::ManageApprovalRules)?;
    request.validate()?;

    let rule = state
        .rules
        .update_rule(ApprovalRuleId::from_uuid(id), request.into())
        .await?;
    Ok(Json(rule.into()))
}

pub async fn delete_rule(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    principal.require(Action::ManageApprovalRules)?;
    state.rules.delete_rule(ApprovalRuleId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

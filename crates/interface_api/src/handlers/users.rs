//! User handlers

use axum::{extract::State, http::StatusCode, Extension, Json};
use validator::Validate;

use domain_expense::{Action, Principal};

use crate::{AppState, error::ApiError};
use crate::auth::create_token;
use crate::dto::user::*;

/// Creates the single admin account
///
/// Public, but succeeds only while no admin exists; afterwards it answers
/// 409.
pub async fn bootstrap_admin(
    State(state): State<AppState>,
    Json(request): Json<BootstrapRequest>,
) -> Result<(StatusCode, Json<BootstrapResponse>), ApiError> {
    request.validate()?;

    let admin = state
        .users
        .bootstrap_admin(request.name, request.email, request.country)
        .await?;
    let token = create_token(admin.id, &state.config.jwt_secret, state.config.jwt_expiration_secs)?;

    Ok((
        StatusCode::CREATED,
        Json(BootstrapResponse {
            user: admin.into(),
            token,
        }),
    ))
}

/// Returns the caller's own account
pub async fn profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<UserResponse>, ApiError> {
    let account = state.users.profile(principal.user_id).await?;
    Ok(Json(account.into()))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    principal.require(Action::ManageUsers)?;
    request.validate()?;

    let account = state.users.add_user(request.into()).await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    principal.require(Action::ManageUsers)?;
    let users = state.users.list_users().await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

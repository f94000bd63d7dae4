//! API middleware

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{info, warn};

use domain_expense::{ExpenseError, Principal};

use crate::AppState;
use crate::auth::validate_token;
use crate::error::ApiError;

/// Authentication middleware
///
/// Validates the bearer token, then resolves the caller's current role from
/// the user directory and stores the resulting `Principal` in the request
/// extensions. A token for a user that no longer exists is rejected.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    // Extract token from Authorization header
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => {
            warn!("Missing or invalid Authorization header");
            return Err(ApiError::Unauthorized);
        }
    };

    let user_id = validate_token(token, &state.config.jwt_secret)
        .and_then(|claims| claims.user_id())
        .map_err(|e| {
            warn!("Token validation failed: {:?}", e);
            ApiError::Unauthorized
        })?;

    let principal = match state.users.principal(user_id).await {
        Ok(principal) => principal,
        Err(ExpenseError::NotFound { .. }) => {
            warn!(user_id = %user_id, "Token subject is not a known user");
            return Err(ApiError::Unauthorized);
        }
        Err(e) => return Err(e.into()),
    };

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Audit logging middleware
///
/// Logs all API requests for compliance and debugging
pub async fn audit_middleware(
    State(_state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let (user_id, role) = request
        .extensions()
        .get::<Principal>()
        .map(|p| (p.user_id.to_string(), p.role.to_string()))
        .unwrap_or_else(|| ("anonymous".to_string(), "none".to_string()));

    let start = Utc::now();

    let response = next.run(request).await.into_response();

    let duration = Utc::now() - start;
    let status = response.status();

    info!(
        method = %method,
        uri = %uri,
        user = %user_id,
        role = %role,
        status = %status.as_u16(),
        duration_ms = duration.num_milliseconds(),
        "API request"
    );

    response
}

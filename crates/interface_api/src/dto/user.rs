//! User DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::UserId;
use domain_expense::{NewUser, Role, UserAccount};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub role: Role,
    pub manager_id: Option<Uuid>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
}

impl From<CreateUserRequest> for NewUser {
    fn from(request: CreateUserRequest) -> Self {
        Self {
            name: request.name,
            email: request.email,
            role: request.role,
            manager_id: request.manager_id.map(UserId::from_uuid),
            country: request.country,
        }
    }
}

/// Body of `POST /auth/bootstrap`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 100))]
    pub country: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub manager_id: Option<UserId>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UserAccount> for UserResponse {
    fn from(account: UserAccount) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            role: account.role,
            manager_id: account.manager_id,
            country: account.country,
            created_at: account.created_at,
        }
    }
}

/// The admin account and a bearer token for it
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapResponse {
    pub user: UserResponse,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_is_lowercase_on_the_wire() {
        let request: CreateUserRequest = serde_json::from_value(serde_json::json!({
            "name": "Sam",
            "email": "sam@example.com",
            "role": "manager"
        }))
        .unwrap();
        assert_eq!(request.role, Role::Manager);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_bad_email_fails_validation() {
        let request = BootstrapRequest {
            name: "Root".to_string(),
            email: "not-an-email".to_string(),
            country: None,
        };
        assert!(request.validate().is_err());
    }
}

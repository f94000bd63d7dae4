//! User accounts as seen by the expense domain

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::UserId;
use crate::authorization::Role;
use crate::error::ExpenseError;

/// A user of the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub name: String,
    /// Stored trimmed and lowercased
    pub email: String,
    pub role: Role,
    pub manager_id: Option<UserId>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub manager_id: Option<UserId>,
    pub country: Option<String>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ExpenseError> {
        if self.name.trim().is_empty() {
            return Err(ExpenseError::validation("name must not be blank"));
        }
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
            _ => Err(ExpenseError::validation(format!("'{}' is not a valid email address", email))),
        }
    }

    /// Validates and builds the account
    pub fn into_account(self, now: DateTime<Utc>) -> Result<UserAccount, ExpenseError> {
        self.validate()?;
        Ok(UserAccount {
            id: UserId::new_v7(),
            name: self.name.trim().to_string(),
            email: normalize_email(&self.email),
            role: self.role,
            manager_id: self.manager_id,
            country: self
                .country
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            created_at: now,
        })
    }
}

/// Canonical form used for uniqueness checks
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Priya Shah".to_string(),
            email: email.to_string(),
            role: Role::Employee,
            manager_id: None,
            country: Some(" India ".to_string()),
        }
    }

    #[test]
    fn test_email_is_normalized() {
        let account = new_user(" Priya@Example.COM ").into_account(Utc::now()).unwrap();
        assert_eq!(account.email, "priya@example.com");
        assert_eq!(account.country.as_deref(), Some("India"));
    }

    #[test]
    fn test_rejects_malformed_email() {
        assert!(new_user("priya.example.com").validate().is_err());
        assert!(new_user("@example.com").validate().is_err());
    }
}

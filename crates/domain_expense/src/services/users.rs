//! User administration and principal resolution

use std::sync::Arc;

use tracing::info;

use core_kernel::UserId;

use crate::authorization::{Principal, Role};
use crate::error::ExpenseError;
use crate::ports::UserDirectory;
use crate::user::{NewUser, UserAccount};

pub struct UserService {
    users: Arc<dyn UserDirectory>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }

    /// Registers a user; the referenced manager must exist
    ///
    /// # Errors
    ///
    /// * `Validation` - blank name, malformed email or unknown manager
    /// * `Conflict` - duplicate email, or a second admin
    pub async fn add_user(&self, user: NewUser) -> Result<UserAccount, ExpenseError> {
        user.validate()?;
        if let Some(manager_id) = user.manager_id {
            if self.users.find_by_id(manager_id).await?.is_none() {
                return Err(ExpenseError::validation(format!(
                    "manager {} does not exist",
                    manager_id
                )));
            }
        }

        let account = self.users.create_user(user).await?;
        info!(user_id = %account.id, role = %account.role, "User created");
        Ok(account)
    }

    /// Creates the single admin account
    pub async fn bootstrap_admin(
        &self,
        name: String,
        email: String,
        country: Option<String>,
    ) -> Result<UserAccount, ExpenseError> {
        self.add_user(NewUser {
            name,
            email,
            role: Role::Admin,
            manager_id: None,
            country,
        })
        .await
    }

    pub async fn list_users(&self) -> Result<Vec<UserAccount>, ExpenseError> {
        Ok(self.users.list_users().await?)
    }

    pub async fn profile(&self, id: UserId) -> Result<UserAccount, ExpenseError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ExpenseError::not_found("User", id))
    }

    /// Resolves the caller's current role
    pub async fn principal(&self, id: UserId) -> Result<Principal, ExpenseError> {
        let role = self.users.role_of(id).await?;
        Ok(Principal::new(id, role))
    }
}

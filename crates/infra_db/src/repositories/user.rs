//! PostgreSQL user directory
//!
//! Email uniqueness and the single-admin rule are enforced by unique indexes,
//! so concurrent registrations race safely inside the database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{info, instrument};
use uuid::Uuid;

use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, PortError, UserId};
use domain_expense::user::normalize_email;
use domain_expense::{ExpenseError, NewUser, Role, UserAccount, UserDirectory};

use crate::error::DatabaseError;
use crate::pool::ping;

const ADAPTER_ID: &str = "postgres-user-directory";

const USER_COLUMNS: &str = r#"
    SELECT id, name, email, role, manager_id, country, created_at
    FROM users
"#;

const EMAIL_INDEX: &str = "users_email_key";
const SINGLE_ADMIN_INDEX: &str = "users_single_admin";

#[derive(Debug, Clone, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    manager_id: Option<Uuid>,
    country: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserAccount {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row.role.parse().map_err(|e: ExpenseError| {
            DatabaseError::serialization(format!("user {} has invalid role: {}", row.id, e))
        })?;

        Ok(UserAccount {
            id: row.id.into(),
            name: row.name,
            email: row.email,
            role,
            manager_id: row.manager_id.map(Into::into),
            country: row.country,
            created_at: row.created_at,
        })
    }
}

/// Names the unique index a failed insert tripped, if any
fn violated_unique_index(error: &sqlx::Error) -> Option<&str> {
    error
        .as_database_error()
        .filter(|e| e.code().as_deref() == Some("23505"))
        .and_then(|e| e.constraint())
}

/// `UserDirectory` backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_row(&self, account: &UserAccount) -> Result<(), PortError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role, manager_id, country, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*account.id.as_uuid())
        .bind(&account.name)
        .bind(&account.email)
        .bind(account.role.as_str())
        .bind(account.manager_id.map(|m| *m.as_uuid()))
        .bind(account.country.as_deref())
        .bind(account.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => Err(match violated_unique_index(&e) {
                Some(EMAIL_INDEX) => {
                    PortError::conflict(format!("email {} is already registered", account.email))
                }
                Some(SINGLE_ADMIN_INDEX) => PortError::conflict("an admin account already exists"),
                _ => DatabaseError::from(&e).into(),
            }),
        }
    }

    async fn fetch_by_id(&self, id: UserId) -> Result<Option<UserAccount>, DatabaseError> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{USER_COLUMNS} WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(UserAccount::try_from).transpose()
    }

    async fn fetch_by_email(&self, email: &str) -> Result<Option<UserAccount>, DatabaseError> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{USER_COLUMNS} WHERE email = $1"))
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        row.map(UserAccount::try_from).transpose()
    }

    async fn fetch_all(&self) -> Result<Vec<UserAccount>, DatabaseError> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!("{USER_COLUMNS} ORDER BY created_at, id"))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(UserAccount::try_from).collect()
    }
}

impl DomainPort for PgUserDirectory {}

#[async_trait]
impl HealthCheckable for PgUserDirectory {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, ADAPTER_ID).await
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, PortError> {
        Ok(self.fetch_by_id(id).await?)
    }

    #[instrument(skip(self, user), fields(role = %user.role))]
    async fn create_user(&self, user: NewUser) -> Result<UserAccount, PortError> {
        let account = user
            .into_account(Utc::now())
            .map_err(|e| PortError::validation(e.to_string()))?;

        self.insert_row(&account).await?;
        info!(user_id = %account.id, "User registered");
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, PortError> {
        Ok(self.fetch_by_email(email).await?)
    }

    async fn list_users(&self) -> Result<Vec<UserAccount>, PortError> {
        Ok(self.fetch_all().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: &str) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            name: "Mei Tanaka".to_string(),
            email: "mei@example.com".to_string(),
            role: role.to_string(),
            manager_id: None,
            country: Some("JP".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_maps_to_account() {
        let account = UserAccount::try_from(row("manager")).unwrap();
        assert_eq!(account.role, Role::Manager);
        assert_eq!(account.country.as_deref(), Some("JP"));
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let err = UserAccount::try_from(row("auditor")).unwrap_err();
        assert!(matches!(err, DatabaseError::SerializationError(_)));
    }

    #[test]
    fn test_non_database_error_has_no_index() {
        assert_eq!(violated_unique_index(&sqlx::Error::RowNotFound), None);
    }
}

//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the expense approval system using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: each repository implements one
//! of the port traits from `domain_expense` (`ExpenseStore`,
//! `ApprovalRuleStore`, `UserDirectory`), hiding the SQL from the domain.
//!
//! # Concurrency
//!
//! Expense saves are a compare-and-swap on the `version` column and rule
//! updates on `updated_at`. Uniqueness of emails and of the single admin
//! account is enforced by unique indexes.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, migrations, DatabaseConfig, PgExpenseStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/expenses")).await?;
//! migrations::run_pending(&pool).await?;
//! let expenses = PgExpenseStore::new(pool.clone());
//! ```

pub mod pool;
pub mod error;
pub mod migrations;
pub mod repositories;

pub use pool::{create_pool, ping, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use repositories::{PgApprovalRuleStore, PgExpenseStore, PgUserDirectory};

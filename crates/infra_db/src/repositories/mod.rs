//! PostgreSQL implementations of the expense domain ports
//!
//! Each repository owns its SQL and maps between rows and domain types.
//! Queries are built at runtime with `sqlx::query`/`query_as` and `FromRow`
//! row structs, so the crate builds without a live database.

pub mod expense;
pub mod approval_rule;
pub mod user;

pub use expense::PgExpenseStore;
pub use approval_rule::PgApprovalRuleStore;
pub use user::PgUserDirectory;

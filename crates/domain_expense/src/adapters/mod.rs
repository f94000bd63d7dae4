//! Adapters for the expense domain ports
//!
//! # Available Adapters
//!
//! - **InMemoryExpenseStore**, **InMemoryApprovalRuleStore**,
//!   **InMemoryUserDirectory**: process-local stores used by tests and by the
//!   API server's `memory` storage backend
//!
//! PostgreSQL adapters live in the `infra_db` crate.

pub mod memory;

pub use memory::{InMemoryApprovalRuleStore, InMemoryExpenseStore, InMemoryUserDirectory};

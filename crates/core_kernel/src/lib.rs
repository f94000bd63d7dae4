//! Core Kernel - Foundational types for the expense approval system
//!
//! This crate provides the building blocks shared by every other crate:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers for expenses, rules and users
//! - Port infrastructure for the ports-and-adapters layout

pub mod money;
pub mod identifiers;
pub mod ports;

pub use money::{Money, Currency, MoneyError};
pub use identifiers::{ExpenseId, ApprovalRuleId, UserId};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};

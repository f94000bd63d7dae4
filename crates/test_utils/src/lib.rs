//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! expense approval test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data for common entities
//! - `builders`: Builder patterns for test data construction
//! - `notifier`: Recording notifier double with switchable failure
//! - `assertions`: Custom assertion helpers for domain types
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod notifier;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use notifier::*;
pub use assertions::*;
pub use generators::*;

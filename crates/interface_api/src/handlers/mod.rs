//! Request handlers
//!
//! Each handler checks the caller's `Principal` against the action it
//! performs before touching a service.

pub mod health;
pub mod expenses;
pub mod manager;
pub mod rules;
pub mod users;

//! Request and response bodies
//!
//! Field names are camelCase on the wire. Responses are built from domain
//! types with `From`; requests convert into domain inputs.

pub mod expense;
pub mod rule;
pub mod user;

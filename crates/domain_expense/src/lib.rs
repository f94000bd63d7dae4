//! Expense Approval Domain
//!
//! This crate implements the expense claim lifecycle and the percentage-based
//! multi-approver consensus that governs decisions on claims.
//!
//! # Expense Lifecycle
//!
//! ```text
//! Draft -> Pending -> Completed/Rejected
//! ```
//!
//! An employee creates a claim in `Draft` and submits it. A manager decides
//! it, or, when an approval rule governs the claim, the rule's approvers vote
//! until the consensus evaluator reports a final outcome.

pub mod expense;
pub mod decision;
pub mod approval_rule;
pub mod consensus;
pub mod authorization;
pub mod user;
pub mod ports;
pub mod adapters;
pub mod services;
pub mod error;

pub use expense::{ExpenseCategory, ExpenseRecord, ExpenseStatus, NewExpense, MAX_AMOUNT};
pub use decision::{ApprovalVote, ApproverDecision, Decision, DecisionSnapshot};
pub use approval_rule::{
    ApprovalRule, ApprovalRuleUpdate, NewApprovalRule, MAX_APPROVAL_PERCENTAGE, MIN_APPROVAL_PERCENTAGE,
};
pub use consensus::{evaluate, ConsensusOutcome, ConsensusTally};
pub use authorization::{authorize, Action, AuthorizationDecision, Principal, Role};
pub use user::{NewUser, UserAccount};
pub use ports::{ApprovalRuleStore, DecisionNotice, ExpenseFilter, ExpenseStore, Notifier, UserDirectory};
pub use services::{
    ApprovalReport, ApprovalRuleService, DecisionReport, ExpenseLifecycleManager, NoticeStatus, UserService,
};
pub use error::ExpenseError;

//! Expense domain services
//!
//! Services orchestrate the entities over the ports. Role checks are not
//! done here: callers consult [`crate::authorization`] first.

pub mod lifecycle;
pub mod rules;
pub mod users;

pub use lifecycle::{ApprovalReport, DecisionReport, ExpenseLifecycleManager, NoticeStatus};
pub use rules::ApprovalRuleService;
pub use users::UserService;

//! Role-based authorization policy
//!
//! `authorize` is a pure table lookup from role and action to a decision.
//! Callers check it before invoking any core operation; it performs no IO
//! and knows nothing about individual records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use core_kernel::UserId;
use crate::error::ExpenseError;
use crate::expense::ExpenseRecord;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Employee];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Employee => "employee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ExpenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| {
                ExpenseError::validation(format!(
                    "role must be one of admin, manager, employee; got '{}'",
                    s
                ))
            })
    }
}

/// Operations guarded by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    CreateExpense,
    SubmitExpense,
    ViewOwnExpenses,
    ReviewExpenses,
    DecideExpense,
    CastApproval,
    ManageApprovalRules,
    ManageUsers,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::CreateExpense,
        Action::SubmitExpense,
        Action::ViewOwnExpenses,
        Action::ReviewExpenses,
        Action::DecideExpense,
        Action::CastApproval,
        Action::ManageApprovalRules,
        Action::ManageUsers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateExpense => "create_expense",
            Action::SubmitExpense => "submit_expense",
            Action::ViewOwnExpenses => "view_own_expenses",
            Action::ReviewExpenses => "review_expenses",
            Action::DecideExpense => "decide_expense",
            Action::CastApproval => "cast_approval",
            Action::ManageApprovalRules => "manage_approval_rules",
            Action::ManageUsers => "manage_users",
        }
    }

    /// Roles permitted to perform this action
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Action::CreateExpense | Action::SubmitExpense => &[Role::Employee, Role::Manager],
            Action::ViewOwnExpenses => &[Role::Admin, Role::Manager, Role::Employee],
            Action::ReviewExpenses | Action::DecideExpense | Action::CastApproval => {
                &[Role::Manager, Role::Admin]
            }
            Action::ManageApprovalRules | Action::ManageUsers => &[Role::Admin],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a policy check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AuthorizationDecision {
    Allowed,
    Denied { reason: String },
}

impl AuthorizationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthorizationDecision::Allowed)
    }

    /// Converts a denial into `ExpenseError::Authorization`
    pub fn into_result(self) -> Result<(), ExpenseError> {
        match self {
            AuthorizationDecision::Allowed => Ok(()),
            AuthorizationDecision::Denied { reason } => Err(ExpenseError::Authorization(reason)),
        }
    }
}

/// Checks whether `role` may perform `action`
pub fn authorize(role: Role, action: Action) -> AuthorizationDecision {
    if action.allowed_roles().contains(&role) {
        AuthorizationDecision::Allowed
    } else {
        AuthorizationDecision::Denied {
            reason: format!("role '{}' may not {}", role, action.as_str().replace('_', " ")),
        }
    }
}

/// An authenticated caller with the role read from the user directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Like [`authorize`], logging denials and returning them as errors
    pub fn require(&self, action: Action) -> Result<(), ExpenseError> {
        let decision = authorize(self.role, action);
        if let AuthorizationDecision::Denied { reason } = &decision {
            warn!(user_id = %self.user_id, role = %self.role, action = %action, reason = %reason, "Authorization denied");
        }
        decision.into_result()
    }

    /// Owners see their own expenses; reviewers see every expense
    pub fn can_view(&self, record: &ExpenseRecord) -> bool {
        record.is_owned_by(self.user_id) || authorize(self.role, Action::ReviewExpenses).is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("Manager".parse::<Role>().unwrap(), Role::Manager);
        assert!("auditor".parse::<Role>().is_err());
    }

    #[test]
    fn test_denial_carries_reason() {
        match authorize(Role::Employee, Action::DecideExpense) {
            AuthorizationDecision::Denied { reason } => {
                assert!(reason.contains("employee"));
                assert!(reason.contains("decide expense"));
            }
            AuthorizationDecision::Allowed => panic!("employees cannot decide"),
        }
    }

    #[test]
    fn test_admin_cannot_create_expenses() {
        let err = authorize(Role::Admin, Action::CreateExpense).into_result().unwrap_err();
        assert!(matches!(err, ExpenseError::Authorization(_)));
    }
}

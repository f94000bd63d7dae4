//! Approval decisions
//!
//! `Decision` is the final outcome a manager (or a quorum of approvers)
//! renders on a pending claim. `ApproverDecision` is one approver's position
//! inside a consensus snapshot, where not having voted yet is a valid state.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::UserId;
use crate::error::ExpenseError;
use crate::expense::ExpenseStatus;

/// Final decision on a pending expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    /// The status a pending expense moves to under this decision
    pub fn target_status(&self) -> ExpenseStatus {
        match self {
            Decision::Approved => ExpenseStatus::Completed,
            Decision::Rejected => ExpenseStatus::Rejected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "Approved",
            Decision::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = ExpenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("approved") {
            Ok(Decision::Approved)
        } else if trimmed.eq_ignore_ascii_case("rejected") {
            Ok(Decision::Rejected)
        } else {
            Err(ExpenseError::InvalidInput(format!(
                "decision must be one of Approved, Rejected; got '{}'",
                s
            )))
        }
    }
}

/// One approver's position in a consensus snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApproverDecision {
    Approved,
    Rejected,
    Pending,
}

impl From<Decision> for ApproverDecision {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => ApproverDecision::Approved,
            Decision::Rejected => ApproverDecision::Rejected,
        }
    }
}

/// A vote cast by a designated approver on a rule-governed expense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalVote {
    pub vote: Decision,
    pub comments: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// Approver decisions read at one instant, keyed by approver
pub type DecisionSnapshot = BTreeMap<UserId, ApproverDecision>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_canonical_and_lowercase() {
        assert_eq!("Approved".parse::<Decision>().unwrap(), Decision::Approved);
        assert_eq!("rejected".parse::<Decision>().unwrap(), Decision::Rejected);
    }

    #[test]
    fn test_parse_rejects_other_values() {
        let err = "Completed".parse::<Decision>().unwrap_err();
        assert!(matches!(err, ExpenseError::InvalidInput(_)));
    }

    #[test]
    fn test_target_status() {
        assert_eq!(Decision::Approved.target_status(), ExpenseStatus::Completed);
        assert_eq!(Decision::Rejected.target_status(), ExpenseStatus::Rejected);
    }
}

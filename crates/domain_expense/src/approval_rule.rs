//! Approval rules
//!
//! An approval rule names the approvers who must weigh in on an expense and
//! the share of them that must approve before the claim is accepted.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ApprovalRuleId, UserId};
use crate::error::ExpenseError;

/// Lowest accepted consensus threshold, in percent
pub const MIN_APPROVAL_PERCENTAGE: u8 = 81;
/// Highest accepted consensus threshold, in percent
pub const MAX_APPROVAL_PERCENTAGE: u8 = 100;

/// An admin-defined consensus policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRule {
    pub id: ApprovalRuleId,
    pub description: String,
    /// Ordered, unique and never empty
    pub approvers: Vec<UserId>,
    /// Always within 81..=100
    pub min_approval_percentage: u8,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a rule
#[derive(Debug, Clone)]
pub struct NewApprovalRule {
    pub description: String,
    pub approvers: Vec<UserId>,
    pub min_approval_percentage: u32,
}

/// Partial update; `None` leaves the field unchanged
#[derive(Debug, Clone, Default)]
pub struct ApprovalRuleUpdate {
    pub description: Option<String>,
    pub approvers: Option<Vec<UserId>>,
    pub min_approval_percentage: Option<u32>,
}

impl ApprovalRuleUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.approvers.is_none() && self.min_approval_percentage.is_none()
    }
}

impl ApprovalRule {
    /// Validates the input and builds a new rule
    pub fn new(created_by: UserId, input: NewApprovalRule, now: DateTime<Utc>) -> Result<Self, ExpenseError> {
        let description = validate_description(&input.description)?;
        validate_approvers(&input.approvers)?;
        let min_approval_percentage = validate_percentage(input.min_approval_percentage)?;

        Ok(Self {
            id: ApprovalRuleId::new_v7(),
            description,
            approvers: input.approvers,
            min_approval_percentage,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// A one-approver, 100% rule: plain single-manager approval
    pub fn single_approver(approver: UserId, created_by: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: ApprovalRuleId::new_v7(),
            description: format!("Single approver {}", approver),
            approvers: vec![approver],
            min_approval_percentage: MAX_APPROVAL_PERCENTAGE,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a partial update
    ///
    /// Every supplied field is validated before anything is changed, so a
    /// failed update leaves the rule untouched.
    pub fn apply_update(&mut self, update: ApprovalRuleUpdate, now: DateTime<Utc>) -> Result<(), ExpenseError> {
        let description = update
            .description
            .as_deref()
            .map(validate_description)
            .transpose()?;
        if let Some(approvers) = &update.approvers {
            validate_approvers(approvers)?;
        }
        let percentage = update
            .min_approval_percentage
            .map(validate_percentage)
            .transpose()?;

        if let Some(description) = description {
            self.description = description;
        }
        if let Some(approvers) = update.approvers {
            self.approvers = approvers;
        }
        if let Some(percentage) = percentage {
            self.min_approval_percentage = percentage;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Returns true if `user` is one of the rule's approvers
    pub fn includes(&self, user: UserId) -> bool {
        self.approvers.contains(&user)
    }

    pub fn approver_count(&self) -> usize {
        self.approvers.len()
    }
}

fn validate_description(description: &str) -> Result<String, ExpenseError> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(ExpenseError::validation("rule description must not be blank"));
    }
    Ok(trimmed.to_string())
}

fn validate_approvers(approvers: &[UserId]) -> Result<(), ExpenseError> {
    if approvers.is_empty() {
        return Err(ExpenseError::validation("approval rule needs at least one approver"));
    }
    let mut seen = HashSet::with_capacity(approvers.len());
    for approver in approvers {
        if !seen.insert(approver) {
            return Err(ExpenseError::validation(format!(
                "approver {} is listed more than once",
                approver
            )));
        }
    }
    Ok(())
}

fn validate_percentage(percentage: u32) -> Result<u8, ExpenseError> {
    if percentage < u32::from(MIN_APPROVAL_PERCENTAGE) || percentage > u32::from(MAX_APPROVAL_PERCENTAGE) {
        return Err(ExpenseError::validation(format!(
            "minimum approval percentage must be between {} and {}, got {}",
            MIN_APPROVAL_PERCENTAGE, MAX_APPROVAL_PERCENTAGE, percentage
        )));
    }
    // bounded by MAX_APPROVAL_PERCENTAGE above
    Ok(percentage as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(percentage: u32) -> NewApprovalRule {
        NewApprovalRule {
            description: "Travel over budget".to_string(),
            approvers: vec![UserId::new(), UserId::new()],
            min_approval_percentage: percentage,
        }
    }

    #[test]
    fn test_threshold_bounds() {
        let admin = UserId::new();
        assert!(ApprovalRule::new(admin, input(80), Utc::now()).is_err());
        assert!(ApprovalRule::new(admin, input(81), Utc::now()).is_ok());
        assert!(ApprovalRule::new(admin, input(100), Utc::now()).is_ok());
        assert!(ApprovalRule::new(admin, input(101), Utc::now()).is_err());
    }

    #[test]
    fn test_failed_update_leaves_rule_unchanged() {
        let mut rule = ApprovalRule::new(UserId::new(), input(90), Utc::now()).unwrap();
        let before = rule.clone();

        let result = rule.apply_update(
            ApprovalRuleUpdate {
                description: Some("Renamed".to_string()),
                min_approval_percentage: Some(50),
                ..Default::default()
            },
            Utc::now(),
        );

        assert!(result.unwrap_err().is_validation());
        assert_eq!(rule, before);
    }

    #[test]
    fn test_single_approver_rule() {
        let manager = UserId::new();
        let rule = ApprovalRule::single_approver(manager, UserId::new(), Utc::now());
        assert!(rule.includes(manager));
        assert_eq!(rule.min_approval_percentage, 100);
    }
}

//! Approval rule management

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use core_kernel::{ApprovalRuleId, UserId};

use crate::approval_rule::{ApprovalRule, ApprovalRuleUpdate, NewApprovalRule};
use crate::error::ExpenseError;
use crate::ports::{ApprovalRuleStore, UserDirectory};

/// CRUD over approval rules
///
/// Callers must have checked `Action::ManageApprovalRules` beforehand.
pub struct ApprovalRuleService {
    rules: Arc<dyn ApprovalRuleStore>,
    users: Arc<dyn UserDirectory>,
}

impl ApprovalRuleService {
    pub fn new(rules: Arc<dyn ApprovalRuleStore>, users: Arc<dyn UserDirectory>) -> Self {
        Self { rules, users }
    }

    /// Validates and stores a new rule created by `admin`
    ///
    /// # Errors
    ///
    /// `Validation` for a percentage outside 81..=100, an empty or duplicated
    /// approver list, a blank description, or an approver that does not exist.
    pub async fn create_rule(&self, admin: UserId, input: NewApprovalRule) -> Result<ApprovalRule, ExpenseError> {
        let rule = ApprovalRule::new(admin, input, Utc::now())?;
        self.ensure_approvers_exist(&rule.approvers).await?;
        self.rules.insert(&rule).await?;

        info!(
            rule_id = %rule.id,
            actor = %admin,
            approvers = rule.approvers.len(),
            min_approval_percentage = rule.min_approval_percentage,
            "Approval rule created"
        );
        Ok(rule)
    }

    /// Applies a partial update
    pub async fn update_rule(&self, id: ApprovalRuleId, update: ApprovalRuleUpdate) -> Result<ApprovalRule, ExpenseError> {
        let mut rule = self.get_rule(id).await?;
        if let Some(approvers) = &update.approvers {
            self.ensure_approvers_exist(approvers).await?;
        }

        let read_at = rule.updated_at;
        rule.apply_update(update, Utc::now())?;
        self.rules.update(&rule, read_at).await?;

        info!(
            rule_id = %id,
            approvers = rule.approvers.len(),
            min_approval_percentage = rule.min_approval_percentage,
            "Approval rule updated"
        );
        Ok(rule)
    }

    pub async fn delete_rule(&self, id: ApprovalRuleId) -> Result<(), ExpenseError> {
        if !self.rules.delete(id).await? {
            return Err(ExpenseError::not_found("ApprovalRule", id));
        }
        info!(rule_id = %id, "Approval rule deleted");
        Ok(())
    }

    pub async fn list_rules(&self) -> Result<Vec<ApprovalRule>, ExpenseError> {
        Ok(self.rules.list().await?)
    }

    pub async fn get_rule(&self, id: ApprovalRuleId) -> Result<ApprovalRule, ExpenseError> {
        self.rules
            .find_by_id(id)
            .await?
            .ok_or_else(|| ExpenseError::not_found("ApprovalRule", id))
    }

    async fn ensure_approvers_exist(&self, approvers: &[UserId]) -> Result<(), ExpenseError> {
        for approver in approvers {
            if self.users.find_by_id(*approver).await?.is_none() {
                return Err(ExpenseError::validation(format!(
                    "approver {} does not exist",
                    approver
                )));
            }
        }
        Ok(())
    }
}

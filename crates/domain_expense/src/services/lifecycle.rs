//! Expense lifecycle manager
//!
//! Every mutation is a read-modify-write of one record guarded by its
//! version: the record is read once, the entity method validates and
//! applies the change, and the store's versioned `save` commits it. A
//! concurrent writer makes the save fail with `ExpenseError::Conflict`.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use core_kernel::{Currency, ExpenseId, UserId};

use crate::approval_rule::ApprovalRule;
use crate::consensus::{evaluate, ConsensusTally};
use crate::decision::Decision;
use crate::error::ExpenseError;
use crate::expense::{ExpenseRecord, ExpenseStatus, NewExpense};
use crate::ports::{ApprovalRuleStore, DecisionNotice, ExpenseFilter, ExpenseStore, Notifier};

/// Delivery status of the decision notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NoticeStatus {
    Sent,
    /// The decision stands; only the notification was lost
    Failed { reason: String },
}

impl NoticeStatus {
    pub fn is_sent(&self) -> bool {
        matches!(self, NoticeStatus::Sent)
    }
}

/// Result of a final decision
#[derive(Debug, Clone, Serialize)]
pub struct DecisionReport {
    pub expense: ExpenseRecord,
    pub notice: NoticeStatus,
}

/// Result of casting one approver vote
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalReport {
    pub expense: ExpenseRecord,
    pub tally: ConsensusTally,
    /// Set only when the vote settled the expense
    pub notice: Option<NoticeStatus>,
}

/// Drives expenses through `Draft -> Pending -> Completed | Rejected`
pub struct ExpenseLifecycleManager {
    expenses: Arc<dyn ExpenseStore>,
    rules: Arc<dyn ApprovalRuleStore>,
    notifier: Arc<dyn Notifier>,
    default_currency: Currency,
}

impl ExpenseLifecycleManager {
    pub fn new(
        expenses: Arc<dyn ExpenseStore>,
        rules: Arc<dyn ApprovalRuleStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            expenses,
            rules,
            notifier,
            default_currency: Currency::USD,
        }
    }

    /// Currency applied when a new expense does not name one
    pub fn with_default_currency(mut self, currency: Currency) -> Self {
        self.default_currency = currency;
        self
    }

    /// Creates a draft owned by `owner`
    ///
    /// # Errors
    ///
    /// * `Validation` - missing or invalid fields
    /// * `NotFound` - the referenced approval rule does not exist
    pub async fn create(&self, owner: UserId, fields: NewExpense) -> Result<ExpenseRecord, ExpenseError> {
        if let Some(rule_id) = fields.approval_rule_id {
            self.rules
                .find_by_id(rule_id)
                .await?
                .ok_or_else(|| ExpenseError::not_found("ApprovalRule", rule_id))?;
        }

        let record = ExpenseRecord::create(owner, fields, self.default_currency, Utc::now())?;
        let saved = self.expenses.save(&record).await?;

        info!(
            expense_id = %saved.id,
            actor = %owner,
            amount = %saved.amount,
            category = %saved.category,
            "Expense created"
        );
        Ok(saved)
    }

    /// Moves the actor's draft to `Pending`
    ///
    /// # Errors
    ///
    /// * `NotFound` - no expense with this id owned by `actor`
    /// * `InvalidState` - the expense is not a draft
    pub async fn submit(&self, id: ExpenseId, actor: UserId) -> Result<ExpenseRecord, ExpenseError> {
        let mut record = self
            .expenses
            .find_by_id(id)
            .await?
            .filter(|r| r.is_owned_by(actor))
            .ok_or_else(|| ExpenseError::not_found("Expense", id))?;

        record.submit(actor, Utc::now())?;
        let saved = self.save(&record).await?;

        info!(expense_id = %id, actor = %actor, status = %saved.status, "Expense submitted");
        Ok(saved)
    }

    /// Applies a final decision to a pending expense
    ///
    /// On a rule-governed expense the decision must match the consensus the
    /// stored votes have already reached. If that rule has since been
    /// deleted, the expense falls back to a single-manager decision.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown expense
    /// * `Authorization` - the actor owns the expense
    /// * `InvalidStatusTransition` - the expense is not pending
    /// * `InvalidState` - consensus has not reached this outcome
    pub async fn decide(
        &self,
        id: ExpenseId,
        actor: UserId,
        decision: Decision,
        comments: Option<String>,
    ) -> Result<DecisionReport, ExpenseError> {
        let mut record = self.load(id).await?;
        if record.is_owned_by(actor) {
            warn!(expense_id = %id, actor = %actor, "Self-decision refused");
            return Err(ExpenseError::Authorization(format!(
                "user {} cannot decide their own expense {}",
                actor, id
            )));
        }
        if record.status != ExpenseStatus::Pending {
            return Err(ExpenseError::InvalidStatusTransition {
                from: record.status,
                to: decision.target_status(),
            });
        }

        if let Some(rule_id) = record.approval_rule_id {
            match self.rules.find_by_id(rule_id).await? {
                Some(rule) => {
                    let tally = evaluate(&rule, &record.decision_snapshot());
                    if tally.outcome.as_decision() != Some(decision) {
                        return Err(ExpenseError::invalid_state(format!(
                            "expense {} is governed by rule {}: {}/{} approvers approved, {}% required",
                            id, rule.id, tally.approved, tally.total, tally.required_percentage
                        )));
                    }
                }
                None => warn!(
                    expense_id = %id,
                    rule_id = %rule_id,
                    "Governing rule was deleted; deciding as single manager"
                ),
            }
        }

        let now = Utc::now();
        record.decide(actor, decision, comments, now)?;
        let saved = self.save(&record).await?;

        info!(expense_id = %id, actor = %actor, status = %saved.status, "Expense decided");
        let notice = self.notify(&saved, decision, actor).await;
        Ok(DecisionReport { expense: saved, notice })
    }

    /// Records one designated approver's vote
    ///
    /// Consensus is evaluated over the snapshot including this vote; when it
    /// is final the decision is applied in the same save.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown expense
    /// * `InvalidState` - no governing rule, not pending, or already voted
    /// * `Authorization` - `approver` is not named by the rule, or owns the expense
    pub async fn cast_approval(
        &self,
        id: ExpenseId,
        approver: UserId,
        vote: Decision,
        comments: Option<String>,
    ) -> Result<ApprovalReport, ExpenseError> {
        let mut record = self.load(id).await?;
        if record.is_owned_by(approver) {
            warn!(expense_id = %id, actor = %approver, "Self-vote refused");
            return Err(ExpenseError::Authorization(format!(
                "user {} cannot vote on their own expense {}",
                approver, id
            )));
        }
        let rule_id = record.approval_rule_id.ok_or_else(|| {
            ExpenseError::invalid_state(format!("expense {} has no approval rule", id))
        })?;
        let rule = self.governing_rule(&record, rule_id).await?;
        if !rule.includes(approver) {
            warn!(expense_id = %id, actor = %approver, rule_id = %rule.id, "Vote from non-approver refused");
            return Err(ExpenseError::Authorization(format!(
                "user {} is not an approver on rule {}",
                approver, rule.id
            )));
        }

        let now = Utc::now();
        record.record_vote(approver, vote, comments, now)?;
        let tally = evaluate(&rule, &record.decision_snapshot());

        let outcome = tally.outcome.as_decision();
        if let Some(decision) = outcome {
            let summary = format!(
                "{} by consensus: {}/{} approvers approved ({}%, {}% required)",
                decision, tally.approved, tally.total, tally.approval_percentage, tally.required_percentage
            );
            record.decide(approver, decision, Some(summary), now)?;
        }

        let saved = self.save(&record).await?;
        info!(
            expense_id = %id,
            actor = %approver,
            vote = %vote,
            status = %saved.status,
            approved = tally.approved,
            total = tally.total,
            "Approval vote recorded"
        );

        let notice = match outcome {
            Some(decision) => Some(self.notify(&saved, decision, approver).await),
            None => None,
        };
        Ok(ApprovalReport { expense: saved, tally, notice })
    }

    pub async fn get(&self, id: ExpenseId) -> Result<ExpenseRecord, ExpenseError> {
        self.load(id).await
    }

    /// The employee's expenses, newest first
    pub async fn list_for_employee(&self, employee_id: UserId) -> Result<Vec<ExpenseRecord>, ExpenseError> {
        self.find(&ExpenseFilter::by_employee(employee_id)).await
    }

    /// Expenses awaiting a decision
    pub async fn list_pending(&self) -> Result<Vec<ExpenseRecord>, ExpenseError> {
        self.find(&ExpenseFilter::by_status(ExpenseStatus::Pending)).await
    }

    /// Every expense, for the history view
    pub async fn list_all(&self) -> Result<Vec<ExpenseRecord>, ExpenseError> {
        self.find(&ExpenseFilter::all()).await
    }

    pub async fn find(&self, filter: &ExpenseFilter) -> Result<Vec<ExpenseRecord>, ExpenseError> {
        Ok(self.expenses.find_by_filter(filter).await?)
    }

    async fn load(&self, id: ExpenseId) -> Result<ExpenseRecord, ExpenseError> {
        self.expenses
            .find_by_id(id)
            .await?
            .ok_or_else(|| ExpenseError::not_found("Expense", id))
    }

    async fn governing_rule(
        &self,
        record: &ExpenseRecord,
        rule_id: core_kernel::ApprovalRuleId,
    ) -> Result<ApprovalRule, ExpenseError> {
        self.rules.find_by_id(rule_id).await?.ok_or_else(|| {
            ExpenseError::invalid_state(format!(
                "approval rule {} governing expense {} no longer exists; a manager must decide it directly",
                rule_id, record.id
            ))
        })
    }

    async fn save(&self, record: &ExpenseRecord) -> Result<ExpenseRecord, ExpenseError> {
        self.expenses.save(record).await.map_err(|e| {
            if e.is_conflict() {
                warn!(expense_id = %record.id, version = record.version, "Concurrent modification");
            }
            ExpenseError::from(e)
        })
    }

    async fn notify(&self, record: &ExpenseRecord, decision: Decision, decided_by: UserId) -> NoticeStatus {
        let notice = DecisionNotice {
            expense_id: record.id,
            expense_name: record.name.clone(),
            outcome: decision,
            decided_by,
            comments: record.comments.clone(),
            decided_at: record.approval_date.unwrap_or(record.updated_at),
        };

        match self.notifier.send_decision_notice(record.employee_id, &notice).await {
            Ok(()) => NoticeStatus::Sent,
            Err(e) => {
                warn!(
                    expense_id = %record.id,
                    employee_id = %record.employee_id,
                    error = %e,
                    "Decision notice failed; decision stands"
                );
                NoticeStatus::Failed { reason: e.to_string() }
            }
        }
    }
}

//! Expense record aggregate

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ApprovalRuleId, Currency, ExpenseId, Money, UserId};
use crate::decision::{ApprovalVote, ApproverDecision, Decision, DecisionSnapshot};
use crate::error::ExpenseError;

/// Largest storable amount: 15 integer digits and 4 decimal places
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0x89E7_FFFF, 0x8AC7_2304, 0, false, 4);

/// Expense status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseStatus {
    /// Saved by the employee, not yet submitted
    Draft,
    /// Submitted and awaiting a decision
    Pending,
    /// Approved but not yet settled
    Approved,
    /// Approved and closed
    Completed,
    /// Rejected and closed
    Rejected,
}

impl ExpenseStatus {
    pub const ALL: [ExpenseStatus; 5] = [
        ExpenseStatus::Draft,
        ExpenseStatus::Pending,
        ExpenseStatus::Approved,
        ExpenseStatus::Completed,
        ExpenseStatus::Rejected,
    ];

    /// No transition leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExpenseStatus::Completed | ExpenseStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseStatus::Draft => "Draft",
            ExpenseStatus::Pending => "Pending",
            ExpenseStatus::Approved => "Approved",
            ExpenseStatus::Completed => "Completed",
            ExpenseStatus::Rejected => "Rejected",
        }
    }

    /// Checks the transition table
    pub fn can_transition_to(&self, target: ExpenseStatus) -> bool {
        use ExpenseStatus::*;
        matches!(
            (*self, target),
            (Draft, Pending) |
            (Pending, Completed) |
            (Pending, Rejected) |
            (Pending, Approved) |
            (Approved, Completed)
        )
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseStatus {
    type Err = ExpenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExpenseStatus::ALL
            .iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| ExpenseError::validation(format!("unknown expense status '{}'", s)))
    }
}

/// Expense category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Travel,
    Food,
    Supplies,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 4] = [
        ExpenseCategory::Travel,
        ExpenseCategory::Food,
        ExpenseCategory::Supplies,
        ExpenseCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Travel => "Travel",
            ExpenseCategory::Food => "Food",
            ExpenseCategory::Supplies => "Supplies",
            ExpenseCategory::Other => "Other",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = ExpenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExpenseCategory::ALL
            .iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| {
                ExpenseError::validation(format!(
                    "category must be one of Travel, Food, Supplies, Other; got '{}'",
                    s
                ))
            })
    }
}

/// Raw fields submitted when creating an expense
///
/// Everything is optional here so that validation can report every missing
/// field at once.
#[derive(Debug, Clone, Default)]
pub struct NewExpense {
    pub name: Option<String>,
    pub description: Option<String>,
    pub bill_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub paid_by: Option<String>,
    pub remarks: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<Currency>,
    pub receipt: Option<String>,
    pub approval_rule_id: Option<ApprovalRuleId>,
}

/// An expense claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: ExpenseId,
    /// Submitting employee; never changes after creation
    pub employee_id: UserId,
    pub name: String,
    pub description: String,
    pub bill_date: NaiveDate,
    pub category: ExpenseCategory,
    pub paid_by: String,
    pub remarks: Option<String>,
    pub amount: Money,
    /// Opaque path or URL of the stored receipt
    pub receipt: Option<String>,
    pub status: ExpenseStatus,
    /// Rule whose approvers must reach consensus, if any
    pub approval_rule_id: Option<ApprovalRuleId>,
    pub approvals: BTreeMap<UserId, ApprovalVote>,
    pub manager_id: Option<UserId>,
    pub approval_date: Option<DateTime<Utc>>,
    pub comments: Option<String>,
    /// Optimistic concurrency token, bumped by the store on every save
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExpenseRecord {
    /// Creates a new draft expense owned by `owner`
    ///
    /// # Errors
    ///
    /// `ExpenseError::Validation` when a required field (name, description,
    /// bill date, category, paid by, amount) is missing or blank, the
    /// category is unknown, or the amount is negative or above `MAX_AMOUNT`.
    pub fn create(
        owner: UserId,
        fields: NewExpense,
        default_currency: Currency,
        now: DateTime<Utc>,
    ) -> Result<Self, ExpenseError> {
        let name = non_blank(fields.name);
        let description = non_blank(fields.description);
        let category = non_blank(fields.category);
        let paid_by = non_blank(fields.paid_by);

        let mut missing = Vec::new();
        if name.is_none() {
            missing.push("name");
        }
        if description.is_none() {
            missing.push("description");
        }
        if fields.bill_date.is_none() {
            missing.push("billDate");
        }
        if category.is_none() {
            missing.push("category");
        }
        if paid_by.is_none() {
            missing.push("paidBy");
        }
        if fields.amount.is_none() {
            missing.push("amount");
        }

        let (Some(name), Some(description), Some(bill_date), Some(category), Some(paid_by), Some(amount)) =
            (name, description, fields.bill_date, category, paid_by, fields.amount)
        else {
            return Err(ExpenseError::validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        };

        let category: ExpenseCategory = category.parse()?;
        let amount = Money::non_negative(amount, fields.currency.unwrap_or(default_currency))?;
        if amount.amount() > MAX_AMOUNT {
            return Err(ExpenseError::validation(format!(
                "amount must not exceed {}, got {}",
                MAX_AMOUNT,
                amount.amount()
            )));
        }

        Ok(Self {
            id: ExpenseId::new_v7(),
            employee_id: owner,
            name,
            description,
            bill_date,
            category,
            paid_by,
            remarks: non_blank(fields.remarks),
            amount,
            receipt: non_blank(fields.receipt),
            status: ExpenseStatus::Draft,
            approval_rule_id: fields.approval_rule_id,
            approvals: BTreeMap::new(),
            manager_id: None,
            approval_date: None,
            comments: None,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Moves the expense to `target` if the transition table allows it
    pub fn transition_to(&mut self, target: ExpenseStatus, now: DateTime<Utc>) -> Result<(), ExpenseError> {
        if !self.status.can_transition_to(target) {
            return Err(ExpenseError::InvalidStatusTransition {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.updated_at = now;
        Ok(())
    }

    /// Submits a draft for approval (`Draft -> Pending`)
    ///
    /// Only the owner may submit; for anyone else the draft does not exist.
    pub fn submit(&mut self, actor: UserId, now: DateTime<Utc>) -> Result<(), ExpenseError> {
        if actor != self.employee_id {
            return Err(ExpenseError::not_found("Draft expense", self.id));
        }
        if self.status != ExpenseStatus::Draft {
            return Err(ExpenseError::invalid_state(format!(
                "expense {} is {}, only drafts can be submitted",
                self.id, self.status
            )));
        }
        self.transition_to(ExpenseStatus::Pending, now)
    }

    /// Applies a final decision (`Pending -> Completed | Rejected`)
    ///
    /// Decision fields are written exactly once.
    pub fn decide(
        &mut self,
        actor: UserId,
        decision: Decision,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ExpenseError> {
        if self.status != ExpenseStatus::Pending {
            return Err(ExpenseError::InvalidStatusTransition {
                from: self.status,
                to: decision.target_status(),
            });
        }
        self.transition_to(decision.target_status(), now)?;
        self.manager_id = Some(actor);
        self.approval_date = Some(now);
        self.comments = non_blank(comments);
        Ok(())
    }

    /// Records one approver's vote on a pending expense
    pub fn record_vote(
        &mut self,
        approver: UserId,
        vote: Decision,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ExpenseError> {
        if self.status != ExpenseStatus::Pending {
            return Err(ExpenseError::invalid_state(format!(
                "expense {} is {}, votes are only accepted while pending",
                self.id, self.status
            )));
        }
        if self.approvals.contains_key(&approver) {
            return Err(ExpenseError::invalid_state(format!(
                "approver {} has already voted on expense {}",
                approver, self.id
            )));
        }
        self.approvals.insert(
            approver,
            ApprovalVote {
                vote,
                comments: non_blank(comments),
                decided_at: now,
            },
        );
        self.updated_at = now;
        Ok(())
    }

    /// Current approver positions; approvers without a vote are left out
    pub fn decision_snapshot(&self) -> DecisionSnapshot {
        self.approvals
            .iter()
            .map(|(approver, vote)| (*approver, ApproverDecision::from(vote.vote)))
            .collect()
    }

    pub fn is_rule_governed(&self) -> bool {
        self.approval_rule_id.is_some()
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.employee_id == user
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

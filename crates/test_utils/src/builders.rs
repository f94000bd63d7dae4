//! Test Data Builders
//!
//! Builders let tests specify only the fields they care about and take
//! defaults for everything else.

use chrono::{NaiveDate, Utc};
use core_kernel::{ApprovalRuleId, Currency, UserId};
use domain_expense::{ApprovalRule, ApprovalVote, Decision, ExpenseRecord, ExpenseStatus, NewApprovalRule, NewExpense};
use rust_decimal::Decimal;

use crate::fixtures::{ExpenseFixtures, IdFixtures};

/// Builder for expense creation input
pub struct NewExpenseBuilder {
    fields: NewExpense,
}

impl Default for NewExpenseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewExpenseBuilder {
    /// Starts from the standard 150.00 Travel claim
    pub fn new() -> Self {
        Self {
            fields: ExpenseFixtures::travel_150(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.fields.name = Some(name.into());
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.fields.amount = Some(amount);
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.fields.currency = Some(currency);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.fields.category = Some(category.into());
        self
    }

    pub fn with_bill_date(mut self, date: NaiveDate) -> Self {
        self.fields.bill_date = Some(date);
        self
    }

    pub fn with_rule(mut self, rule_id: ApprovalRuleId) -> Self {
        self.fields.approval_rule_id = Some(rule_id);
        self
    }

    pub fn without_amount(mut self) -> Self {
        self.fields.amount = None;
        self
    }

    pub fn without_description(mut self) -> Self {
        self.fields.description = None;
        self
    }

    pub fn build(self) -> NewExpense {
        self.fields
    }
}

/// Builder for stored expense records in a chosen state
pub struct ExpenseRecordBuilder {
    owner: UserId,
    fields: NewExpense,
    status: ExpenseStatus,
    votes: Vec<(UserId, Decision)>,
}

impl Default for ExpenseRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpenseRecordBuilder {
    pub fn new() -> Self {
        Self {
            owner: IdFixtures::employee_id(),
            fields: ExpenseFixtures::travel_150(),
            status: ExpenseStatus::Draft,
            votes: Vec::new(),
        }
    }

    pub fn owned_by(mut self, owner: UserId) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_status(mut self, status: ExpenseStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_rule(mut self, rule_id: ApprovalRuleId) -> Self {
        self.fields.approval_rule_id = Some(rule_id);
        self
    }

    pub fn with_vote(mut self, approver: UserId, vote: Decision) -> Self {
        self.votes.push((approver, vote));
        self
    }

    /// Builds an unsaved record (version 0)
    pub fn build(self) -> ExpenseRecord {
        let now = Utc::now();
        let mut record = ExpenseRecord::create(self.owner, self.fields, Currency::USD, now)
            .expect("fixture expense must be valid");
        record.status = self.status;
        for (approver, vote) in self.votes {
            record.approvals.insert(
                approver,
                ApprovalVote {
                    vote,
                    comments: None,
                    decided_at: now,
                },
            );
        }
        record
    }
}

/// Builder for approval rules
pub struct ApprovalRuleBuilder {
    description: String,
    approvers: Vec<UserId>,
    min_approval_percentage: u32,
    created_by: UserId,
}

impl Default for ApprovalRuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApprovalRuleBuilder {
    /// Defaults to five fresh approvers at 81%
    pub fn new() -> Self {
        Self {
            description: "Department consensus".to_string(),
            approvers: (0..5).map(|_| UserId::new()).collect(),
            min_approval_percentage: 81,
            created_by: IdFixtures::admin_id(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_approvers(mut self, approvers: Vec<UserId>) -> Self {
        self.approvers = approvers;
        self
    }

    pub fn with_percentage(mut self, percentage: u32) -> Self {
        self.min_approval_percentage = percentage;
        self
    }

    pub fn created_by(mut self, admin: UserId) -> Self {
        self.created_by = admin;
        self
    }

    /// The raw creation input, not validated
    pub fn input(self) -> NewApprovalRule {
        NewApprovalRule {
            description: self.description,
            approvers: self.approvers,
            min_approval_percentage: self.min_approval_percentage,
        }
    }

    /// A validated rule
    pub fn build(self) -> ApprovalRule {
        let created_by = self.created_by;
        ApprovalRule::new(created_by, self.input(), Utc::now()).expect("fixture rule must be valid")
    }
}

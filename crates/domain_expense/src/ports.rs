//! Expense Domain Ports
//!
//! Port interfaces the expense domain needs from the outside world. The
//! services in [`crate::services`] only ever see these traits, so the same
//! logic runs over PostgreSQL (infra_db) or the in-memory adapters in
//! [`crate::adapters`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_expense::adapters::{InMemoryApprovalRuleStore, InMemoryExpenseStore};
//! use domain_expense::ExpenseLifecycleManager;
//! use std::sync::Arc;
//!
//! let manager = ExpenseLifecycleManager::new(
//!     Arc::new(InMemoryExpenseStore::new()),
//!     Arc::new(InMemoryApprovalRuleStore::new()),
//!     Arc::new(notifier),
//! );
//! ```
//!
//! # Concurrency
//!
//! `ExpenseStore::save` is a compare-and-swap on `ExpenseRecord::version`.
//! A record with version 0 is inserted; any other record is written only if
//! the stored version still equals the one the caller read. On success the
//! returned record carries the incremented version. A lost race surfaces as
//! `PortError::Conflict` and is never retried here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{
    ApprovalRuleId, DomainPort, ExpenseId, HealthCheckable, PortError, UserId,
};

use crate::approval_rule::ApprovalRule;
use crate::authorization::Role;
use crate::decision::Decision;
use crate::expense::{ExpenseCategory, ExpenseRecord, ExpenseStatus};
use crate::user::{NewUser, UserAccount};

/// Query parameters for finding expenses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    pub status: Option<ExpenseStatus>,
    pub employee_id: Option<UserId>,
    pub category: Option<ExpenseCategory>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ExpenseFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Expenses owned by one employee
    pub fn by_employee(employee_id: UserId) -> Self {
        Self {
            employee_id: Some(employee_id),
            ..Default::default()
        }
    }

    pub fn by_status(status: ExpenseStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: ExpenseCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Adds pagination to the query
    pub fn paginate(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Returns true if `record` satisfies every set criterion
    pub fn matches(&self, record: &ExpenseRecord) -> bool {
        self.status.map_or(true, |s| record.status == s)
            && self.employee_id.map_or(true, |e| record.employee_id == e)
            && self.category.map_or(true, |c| record.category == c)
    }
}

/// Persistent store for expense records
///
/// Votes live inside the record, so `find_by_id` returns the record and its
/// whole approver snapshot from a single read.
#[async_trait]
pub trait ExpenseStore: DomainPort + HealthCheckable {
    /// Inserts (version 0) or performs a versioned update
    ///
    /// # Returns
    ///
    /// The stored record with its new version, or `PortError::Conflict` when
    /// the stored version moved on or a version-0 id already exists.
    async fn save(&self, record: &ExpenseRecord) -> Result<ExpenseRecord, PortError>;

    async fn find_by_id(&self, id: ExpenseId) -> Result<Option<ExpenseRecord>, PortError>;

    /// Matching records, newest first
    async fn find_by_filter(&self, filter: &ExpenseFilter) -> Result<Vec<ExpenseRecord>, PortError>;
}

/// Persistent store for approval rules
#[async_trait]
pub trait ApprovalRuleStore: DomainPort + HealthCheckable {
    /// Fails with `PortError::Conflict` if the id exists
    async fn insert(&self, rule: &ApprovalRule) -> Result<(), PortError>;

    /// Replaces the stored rule if its `updated_at` still equals `read_at`
    async fn update(&self, rule: &ApprovalRule, read_at: DateTime<Utc>) -> Result<(), PortError>;

    /// Returns false when no such rule exists
    async fn delete(&self, id: ApprovalRuleId) -> Result<bool, PortError>;

    async fn find_by_id(&self, id: ApprovalRuleId) -> Result<Option<ApprovalRule>, PortError>;

    /// All rules, oldest first
    async fn list(&self) -> Result<Vec<ApprovalRule>, PortError>;
}

/// Lookup and registration of user accounts
#[async_trait]
pub trait UserDirectory: DomainPort + HealthCheckable {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, PortError>;

    /// The user's role, or `PortError::NotFound`
    async fn role_of(&self, id: UserId) -> Result<Role, PortError> {
        self.find_by_id(id)
            .await?
            .map(|user| user.role)
            .ok_or_else(|| PortError::not_found("User", id))
    }

    /// Registers a user
    ///
    /// Fails with `PortError::Conflict` on a duplicate email or when the
    /// account is an admin and one already exists. Both checks and the write
    /// happen atomically.
    async fn create_user(&self, user: NewUser) -> Result<UserAccount, PortError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, PortError>;

    /// All users, oldest first
    async fn list_users(&self) -> Result<Vec<UserAccount>, PortError>;
}

/// Final decision message sent to the claim owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionNotice {
    pub expense_id: ExpenseId,
    pub expense_name: String,
    pub outcome: Decision,
    pub decided_by: UserId,
    pub comments: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// Outbound mail capability
///
/// Delivery is fire-and-forget from the domain's point of view: a failure is
/// reported back but never undoes the decision.
#[async_trait]
pub trait Notifier: DomainPort {
    async fn send_decision_notice(&self, employee_id: UserId, notice: &DecisionNotice) -> Result<(), PortError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::Currency;
    use rust_decimal::Decimal;
    use crate::expense::NewExpense;

    fn record(owner: UserId) -> ExpenseRecord {
        ExpenseRecord::create(
            owner,
            NewExpense {
                name: Some("Lunch".to_string()),
                description: Some("Team lunch".to_string()),
                bill_date: NaiveDate::from_ymd_opt(2024, 5, 2),
                category: Some("Food".to_string()),
                paid_by: Some("Cash".to_string()),
                amount: Some(Decimal::new(4250, 2)),
                ..Default::default()
            },
            Currency::USD,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_filter_matches() {
        let owner = UserId::new();
        let expense = record(owner);

        assert!(ExpenseFilter::all().matches(&expense));
        assert!(ExpenseFilter::by_employee(owner).matches(&expense));
        assert!(!ExpenseFilter::by_employee(UserId::new()).matches(&expense));
        assert!(ExpenseFilter::by_status(ExpenseStatus::Draft)
            .with_category(ExpenseCategory::Food)
            .matches(&expense));
        assert!(!ExpenseFilter::by_status(ExpenseStatus::Pending).matches(&expense));
    }
}

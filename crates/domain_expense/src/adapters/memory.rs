//! In-memory port implementations
//!
//! Each store keeps its data behind a `tokio::sync::RwLock`; every check that
//! guards a write (version, uniqueness) happens under the same write lock as
//! the write itself.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use core_kernel::{
    ApprovalRuleId, DomainPort, ExpenseId, HealthCheckResult, HealthCheckable, PortError, UserId,
};

use crate::approval_rule::ApprovalRule;
use crate::authorization::Role;
use crate::expense::ExpenseRecord;
use crate::ports::{ApprovalRuleStore, ExpenseFilter, ExpenseStore, UserDirectory};
use crate::user::{normalize_email, NewUser, UserAccount};

/// In-memory `ExpenseStore`
#[derive(Debug, Default, Clone)]
pub struct InMemoryExpenseStore {
    records: Arc<RwLock<HashMap<ExpenseId, ExpenseRecord>>>,
}

impl InMemoryExpenseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

impl DomainPort for InMemoryExpenseStore {}

#[async_trait]
impl HealthCheckable for InMemoryExpenseStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("memory-expense-store", 0)
    }
}

#[async_trait]
impl ExpenseStore for InMemoryExpenseStore {
    async fn save(&self, record: &ExpenseRecord) -> Result<ExpenseRecord, PortError> {
        let mut records = self.records.write().await;

        match records.get(&record.id) {
            None if record.version == 0 => {}
            None => return Err(PortError::not_found("Expense", record.id)),
            Some(_) if record.version == 0 => {
                return Err(PortError::conflict(format!("expense {} already exists", record.id)));
            }
            Some(stored) if stored.version != record.version => {
                return Err(PortError::conflict(format!(
                    "expense {} was modified concurrently (expected version {}, found {})",
                    record.id, record.version, stored.version
                )));
            }
            Some(stored) if stored.employee_id != record.employee_id => {
                return Err(PortError::validation_field("owner cannot change", "employee_id"));
            }
            Some(_) => {}
        }

        let mut stored = record.clone();
        stored.version += 1;
        records.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: ExpenseId) -> Result<Option<ExpenseRecord>, PortError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn find_by_filter(&self, filter: &ExpenseFilter) -> Result<Vec<ExpenseRecord>, PortError> {
        let records = self.records.read().await;
        let mut results: Vec<_> = records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        let offset = filter.offset.unwrap_or(0) as usize;
        let limit = filter.limit.map_or(usize::MAX, |l| l as usize);
        Ok(results.into_iter().skip(offset).take(limit).collect())
    }
}

/// In-memory `ApprovalRuleStore`
#[derive(Debug, Default, Clone)]
pub struct InMemoryApprovalRuleStore {
    rules: Arc<RwLock<HashMap<ApprovalRuleId, ApprovalRule>>>,
}

impl InMemoryApprovalRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates with rules for testing
    pub async fn with_rules(rules: Vec<ApprovalRule>) -> Self {
        let store = Self::new();
        {
            let mut map = store.rules.write().await;
            for rule in rules {
                map.insert(rule.id, rule);
            }
        }
        store
    }
}

impl DomainPort for InMemoryApprovalRuleStore {}

#[async_trait]
impl HealthCheckable for InMemoryApprovalRuleStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("memory-approval-rule-store", 0)
    }
}

#[async_trait]
impl ApprovalRuleStore for InMemoryApprovalRuleStore {
    async fn insert(&self, rule: &ApprovalRule) -> Result<(), PortError> {
        let mut rules = self.rules.write().await;
        if rules.contains_key(&rule.id) {
            return Err(PortError::conflict(format!("approval rule {} already exists", rule.id)));
        }
        rules.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn update(&self, rule: &ApprovalRule, read_at: DateTime<Utc>) -> Result<(), PortError> {
        let mut rules = self.rules.write().await;
        let stored = rules
            .get_mut(&rule.id)
            .ok_or_else(|| PortError::not_found("ApprovalRule", rule.id))?;
        if stored.updated_at != read_at {
            return Err(PortError::conflict(format!(
                "approval rule {} was modified concurrently",
                rule.id
            )));
        }
        *stored = rule.clone();
        Ok(())
    }

    async fn delete(&self, id: ApprovalRuleId) -> Result<bool, PortError> {
        Ok(self.rules.write().await.remove(&id).is_some())
    }

    async fn find_by_id(&self, id: ApprovalRuleId) -> Result<Option<ApprovalRule>, PortError> {
        Ok(self.rules.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<ApprovalRule>, PortError> {
        let mut rules: Vec<_> = self.rules.read().await.values().cloned().collect();
        rules.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(rules)
    }
}

/// In-memory `UserDirectory`
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<UserId, UserAccount>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates with accounts, bypassing the uniqueness checks
    pub async fn with_users(users: Vec<UserAccount>) -> Self {
        let directory = Self::new();
        {
            let mut map = directory.users.write().await;
            for user in users {
                map.insert(user.id, user);
            }
        }
        directory
    }
}

impl DomainPort for InMemoryUserDirectory {}

#[async_trait]
impl HealthCheckable for InMemoryUserDirectory {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("memory-user-directory", 0)
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, PortError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<UserAccount, PortError> {
        let account = user
            .into_account(Utc::now())
            .map_err(|e| PortError::validation(e.to_string()))?;

        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == account.email) {
            return Err(PortError::conflict(format!("email {} is already registered", account.email)));
        }
        if account.role == Role::Admin && users.values().any(UserAccount::is_admin) {
            return Err(PortError::conflict("an admin account already exists"));
        }
        users.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, PortError> {
        let email = normalize_email(email);
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserAccount>, PortError> {
        let mut users: Vec<_> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }
}

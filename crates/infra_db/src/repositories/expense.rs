//! PostgreSQL expense store
//!
//! Expenses live in `expenses`; each approver's vote is one row in
//! `expense_approvals`. A save writes both inside one transaction and reads
//! run under REPEATABLE READ so a record never pairs with a vote set from a
//! different point in time.
//!
//! Votes are append-only: a save inserts the votes it carries and ignores
//! ones already stored.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use core_kernel::{
    Currency, DomainPort, ExpenseId, HealthCheckResult, HealthCheckable, Money, MoneyError,
    PortError, UserId,
};
use domain_expense::{
    ApprovalVote, Decision, ExpenseCategory, ExpenseError, ExpenseFilter, ExpenseRecord, ExpenseStatus,
    ExpenseStore,
};

use crate::error::DatabaseError;
use crate::pool::ping;

const ADAPTER_ID: &str = "postgres-expense-store";

const EXPENSE_COLUMNS: &str = r#"
    SELECT id, employee_id, name, description, bill_date, category, paid_by, remarks,
           amount, currency, receipt, status, approval_rule_id, manager_id,
           approval_date, comments, version, created_at, updated_at
    FROM expenses
"#;

const APPROVAL_COLUMNS: &str = r#"
    SELECT expense_id, approver_id, vote, comments, decided_at
    FROM expense_approvals
"#;

/// Row shape of the `expenses` table
#[derive(Debug, Clone, FromRow)]
struct ExpenseRow {
    id: Uuid,
    employee_id: Uuid,
    name: String,
    description: String,
    bill_date: NaiveDate,
    category: String,
    paid_by: String,
    remarks: Option<String>,
    amount: Decimal,
    currency: String,
    receipt: Option<String>,
    status: String,
    approval_rule_id: Option<Uuid>,
    manager_id: Option<Uuid>,
    approval_date: Option<DateTime<Utc>>,
    comments: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Row shape of the `expense_approvals` table
#[derive(Debug, Clone, FromRow)]
struct ApprovalRow {
    expense_id: Uuid,
    approver_id: Uuid,
    vote: String,
    comments: Option<String>,
    decided_at: DateTime<Utc>,
}

/// `ExpenseStore` backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgExpenseStore {
    pool: PgPool,
}

impl PgExpenseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin_snapshot(&self) -> Result<Transaction<'static, Postgres>, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    async fn write(&self, record: &ExpenseRecord) -> Result<ExpenseRecord, DatabaseError> {
        let next_version = record
            .version
            .checked_add(1)
            .and_then(|v| i64::try_from(v).ok())
            .ok_or_else(|| DatabaseError::serialization(format!("expense {} version overflow", record.id)))?;

        let mut tx = self.pool.begin().await?;

        if record.version == 0 {
            insert_expense(&mut tx, record).await?;
        } else {
            let updated = update_expense(&mut tx, record, next_version - 1).await?;
            if updated == 0 {
                return Err(explain_missed_update(&mut tx, record).await?);
            }
        }

        for (approver, vote) in &record.approvals {
            sqlx::query(
                r#"
                INSERT INTO expense_approvals (expense_id, approver_id, vote, comments, decided_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (expense_id, approver_id) DO NOTHING
                "#,
            )
            .bind(*record.id.as_uuid())
            .bind(*approver.as_uuid())
            .bind(vote.vote.as_str())
            .bind(vote.comments.as_deref())
            .bind(vote.decided_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let mut stored = record.clone();
        stored.version = next_version as u64;
        Ok(stored)
    }

    async fn read_one(&self, id: ExpenseId) -> Result<Option<ExpenseRecord>, DatabaseError> {
        let mut tx = self.begin_snapshot().await?;

        let row: Option<ExpenseRow> = sqlx::query_as(&format!("{EXPENSE_COLUMNS} WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        let votes: Vec<ApprovalRow> =
            sqlx::query_as(&format!("{APPROVAL_COLUMNS} WHERE expense_id = $1"))
                .bind(row.id)
                .fetch_all(&mut *tx)
                .await?;

        tx.commit().await?;
        row_to_record(row, votes).map(Some)
    }

    async fn read_many(&self, filter: &ExpenseFilter) -> Result<Vec<ExpenseRecord>, DatabaseError> {
        let mut query = QueryBuilder::<Postgres>::new(EXPENSE_COLUMNS);
        query.push(" WHERE TRUE");
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(employee_id) = filter.employee_id {
            query.push(" AND employee_id = ").push_bind(*employee_id.as_uuid());
        }
        if let Some(category) = filter.category {
            query.push(" AND category = ").push_bind(category.as_str());
        }
        query.push(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(i64::from(limit));
        }
        if let Some(offset) = filter.offset {
            query.push(" OFFSET ").push_bind(i64::from(offset));
        }

        let mut tx = self.begin_snapshot().await?;
        let rows: Vec<ExpenseRow> = query.build_query_as().fetch_all(&mut *tx).await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let votes: Vec<ApprovalRow> = if ids.is_empty() {
            Vec::new()
        } else {
            sqlx::query_as(&format!("{APPROVAL_COLUMNS} WHERE expense_id = ANY($1)"))
                .bind(ids)
                .fetch_all(&mut *tx)
                .await?
        };
        tx.commit().await?;

        let mut votes_by_expense: HashMap<Uuid, Vec<ApprovalRow>> = HashMap::new();
        for vote in votes {
            votes_by_expense.entry(vote.expense_id).or_default().push(vote);
        }

        debug!(count = rows.len(), "Loaded expenses");
        rows.into_iter()
            .map(|row| {
                let votes = votes_by_expense.remove(&row.id).unwrap_or_default();
                row_to_record(row, votes)
            })
            .collect()
    }
}

async fn insert_expense(
    tx: &mut Transaction<'static, Postgres>,
    record: &ExpenseRecord,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO expenses (
            id, employee_id, name, description, bill_date, category, paid_by, remarks,
            amount, currency, receipt, status, approval_rule_id, manager_id,
            approval_date, comments, version, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, 1, $17, $18)
        "#,
    )
    .bind(*record.id.as_uuid())
    .bind(*record.employee_id.as_uuid())
    .bind(&record.name)
    .bind(&record.description)
    .bind(record.bill_date)
    .bind(record.category.as_str())
    .bind(&record.paid_by)
    .bind(record.remarks.as_deref())
    .bind(record.amount.amount())
    .bind(record.amount.currency().code())
    .bind(record.receipt.as_deref())
    .bind(record.status.as_str())
    .bind(record.approval_rule_id.map(|id| *id.as_uuid()))
    .bind(record.manager_id.map(|id| *id.as_uuid()))
    .bind(record.approval_date)
    .bind(record.comments.as_deref())
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| match DatabaseError::from(&e) {
        DatabaseError::DuplicateEntry(_) => {
            DatabaseError::duplicate("Expense", "id", record.id)
        }
        other => other,
    })?;
    Ok(())
}

/// Compare-and-swap on `version`; returns the number of rows written
async fn update_expense(
    tx: &mut Transaction<'static, Postgres>,
    record: &ExpenseRecord,
    expected_version: i64,
) -> Result<u64, DatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE expenses SET
            name = $3,
            description = $4,
            bill_date = $5,
            category = $6,
            paid_by = $7,
            remarks = $8,
            amount = $9,
            currency = $10,
            receipt = $11,
            status = $12,
            approval_rule_id = $13,
            manager_id = $14,
            approval_date = $15,
            comments = $16,
            updated_at = $17,
            version = version + 1
        WHERE id = $1 AND version = $2 AND employee_id = $18
        "#,
    )
    .bind(*record.id.as_uuid())
    .bind(expected_version)
    .bind(&record.name)
    .bind(&record.description)
    .bind(record.bill_date)
    .bind(record.category.as_str())
    .bind(&record.paid_by)
    .bind(record.remarks.as_deref())
    .bind(record.amount.amount())
    .bind(record.amount.currency().code())
    .bind(record.receipt.as_deref())
    .bind(record.status.as_str())
    .bind(record.approval_rule_id.map(|id| *id.as_uuid()))
    .bind(record.manager_id.map(|id| *id.as_uuid()))
    .bind(record.approval_date)
    .bind(record.comments.as_deref())
    .bind(record.updated_at)
    .bind(*record.employee_id.as_uuid())
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

/// Works out why a versioned update touched no rows
async fn explain_missed_update(
    tx: &mut Transaction<'static, Postgres>,
    record: &ExpenseRecord,
) -> Result<DatabaseError, DatabaseError> {
    let stored: Option<(i64, Uuid)> =
        sqlx::query_as("SELECT version, employee_id FROM expenses WHERE id = $1")
            .bind(*record.id.as_uuid())
            .fetch_optional(&mut **tx)
            .await?;

    Ok(match stored {
        None => DatabaseError::not_found("Expense", record.id),
        Some((_, owner)) if owner != *record.employee_id.as_uuid() => {
            DatabaseError::ConstraintViolation("owner cannot change".to_string())
        }
        Some((version, _)) => {
            warn!(expense_id = %record.id, expected = record.version, found = version, "Stale expense save");
            DatabaseError::VersionConflict(format!(
                "expense {} was modified concurrently (expected version {}, found {})",
                record.id, record.version, version
            ))
        }
    })
}

fn row_to_record(row: ExpenseRow, votes: Vec<ApprovalRow>) -> Result<ExpenseRecord, DatabaseError> {
    let expense_id = row.id;
    let corrupt = |what: &str, detail: String| {
        DatabaseError::serialization(format!("expense {} has invalid {}: {}", expense_id, what, detail))
    };

    let currency: Currency = row
        .currency
        .trim()
        .parse()
        .map_err(|e: MoneyError| corrupt("currency", e.to_string()))?;
    let category: ExpenseCategory = row
        .category
        .parse()
        .map_err(|e: ExpenseError| corrupt("category", e.to_string()))?;
    let status: ExpenseStatus = row
        .status
        .parse()
        .map_err(|e: ExpenseError| corrupt("status", e.to_string()))?;
    let version = u64::try_from(row.version).map_err(|e| corrupt("version", e.to_string()))?;

    let mut approvals: BTreeMap<UserId, ApprovalVote> = BTreeMap::new();
    for vote in votes {
        let decision: Decision = vote
            .vote
            .parse()
            .map_err(|e: ExpenseError| corrupt("vote", e.to_string()))?;
        approvals.insert(
            vote.approver_id.into(),
            ApprovalVote {
                vote: decision,
                comments: vote.comments,
                decided_at: vote.decided_at,
            },
        );
    }

    Ok(ExpenseRecord {
        id: expense_id.into(),
        employee_id: row.employee_id.into(),
        name: row.name,
        description: row.description,
        bill_date: row.bill_date,
        category,
        paid_by: row.paid_by,
        remarks: row.remarks,
        amount: Money::new(row.amount, currency),
        receipt: row.receipt,
        status,
        approval_rule_id: row.approval_rule_id.map(Into::into),
        approvals,
        manager_id: row.manager_id.map(Into::into),
        approval_date: row.approval_date,
        comments: row.comments,
        version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

impl DomainPort for PgExpenseStore {}

#[async_trait]
impl HealthCheckable for PgExpenseStore {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, ADAPTER_ID).await
    }
}

#[async_trait]
impl ExpenseStore for PgExpenseStore {
    #[instrument(skip(self, record), fields(expense_id = %record.id, version = record.version))]
    async fn save(&self, record: &ExpenseRecord) -> Result<ExpenseRecord, PortError> {
        Ok(self.write(record).await?)
    }

    #[instrument(skip(self), fields(expense_id = %id))]
    async fn find_by_id(&self, id: ExpenseId) -> Result<Option<ExpenseRecord>, PortError> {
        Ok(self.read_one(id).await?)
    }

    #[instrument(skip(self))]
    async fn find_by_filter(&self, filter: &ExpenseFilter) -> Result<Vec<ExpenseRecord>, PortError> {
        Ok(self.read_many(filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row() -> ExpenseRow {
        let now = Utc::now();
        ExpenseRow {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            name: "Taxi".to_string(),
            description: "Airport transfer".to_string(),
            bill_date: NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
            category: "Travel".to_string(),
            paid_by: "Card".to_string(),
            remarks: None,
            amount: dec!(150.0000),
            currency: "USD".to_string(),
            receipt: None,
            status: "Pending".to_string(),
            approval_rule_id: Some(Uuid::new_v4()),
            manager_id: None,
            approval_date: None,
            comments: None,
            version: 3,
            created_at: now,
            updated_at: now,
        }
    }

    fn vote(expense_id: Uuid, vote: &str) -> ApprovalRow {
        ApprovalRow {
            expense_id,
            approver_id: Uuid::new_v4(),
            vote: vote.to_string(),
            comments: Some("ok".to_string()),
            decided_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_maps_to_record() {
        let row = row();
        let id = row.id;
        let votes = vec![vote(id, "Approved"), vote(id, "Rejected")];

        let record = row_to_record(row, votes).unwrap();
        assert_eq!(*record.id.as_uuid(), id);
        assert_eq!(record.status, ExpenseStatus::Pending);
        assert_eq!(record.category, ExpenseCategory::Travel);
        assert_eq!(record.amount, Money::new(dec!(150), Currency::USD));
        assert_eq!(record.version, 3);
        assert_eq!(record.approvals.len(), 2);
        assert!(record.is_rule_governed());
    }

    #[test]
    fn test_padded_currency_is_accepted() {
        let mut row = row();
        row.currency = "EUR ".to_string();
        let record = row_to_record(row, Vec::new()).unwrap();
        assert_eq!(record.amount.currency(), Currency::EUR);
    }

    #[test]
    fn test_unknown_status_is_serialization_error() {
        let mut row = row();
        row.status = "Archived".to_string();
        let err = row_to_record(row, Vec::new()).unwrap_err();
        assert!(matches!(err, DatabaseError::SerializationError(_)));
    }

    #[test]
    fn test_unknown_vote_is_serialization_error() {
        let row = row();
        let bad = vote(row.id, "Abstain");
        assert!(row_to_record(row, vec![bad]).is_err());
    }

    #[test]
    fn test_negative_version_is_rejected() {
        let mut row = row();
        row.version = -1;
        assert!(row_to_record(row, Vec::new()).is_err());
    }
}

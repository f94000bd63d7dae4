//! PostgreSQL approval rule store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::instrument;
use uuid::Uuid;

use core_kernel::{ApprovalRuleId, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_expense::{ApprovalRule, ApprovalRuleStore};

use crate::error::DatabaseError;
use crate::pool::ping;

const ADAPTER_ID: &str = "postgres-approval-rule-store";

const RULE_COLUMNS: &str = r#"
    SELECT id, description, approvers, min_approval_percentage, created_by, created_at, updated_at
    FROM approval_rules
"#;

#[derive(Debug, Clone, FromRow)]
struct ApprovalRuleRow {
    id: Uuid,
    description: String,
    approvers: Vec<Uuid>,
    min_approval_percentage: i16,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ApprovalRuleRow> for ApprovalRule {
    type Error = DatabaseError;

    fn try_from(row: ApprovalRuleRow) -> Result<Self, Self::Error> {
        let min_approval_percentage = u8::try_from(row.min_approval_percentage).map_err(|_| {
            DatabaseError::serialization(format!(
                "approval rule {} has invalid percentage {}",
                row.id, row.min_approval_percentage
            ))
        })?;

        Ok(ApprovalRule {
            id: row.id.into(),
            description: row.description,
            approvers: row.approvers.into_iter().map(Into::into).collect(),
            min_approval_percentage,
            created_by: row.created_by.into(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn approver_uuids(rule: &ApprovalRule) -> Vec<Uuid> {
    rule.approvers.iter().map(|a| *a.as_uuid()).collect()
}

/// `ApprovalRuleStore` backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgApprovalRuleStore {
    pool: PgPool,
}

impl PgApprovalRuleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_row(&self, rule: &ApprovalRule) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO approval_rules
                (id, description, approvers, min_approval_percentage, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*rule.id.as_uuid())
        .bind(&rule.description)
        .bind(approver_uuids(rule))
        .bind(i16::from(rule.min_approval_percentage))
        .bind(*rule.created_by.as_uuid())
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_row(&self, rule: &ApprovalRule, read_at: DateTime<Utc>) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE approval_rules
            SET description = $2, approvers = $3, min_approval_percentage = $4, updated_at = $5
            WHERE id = $1 AND updated_at = $6
            "#,
        )
        .bind(*rule.id.as_uuid())
        .bind(&rule.description)
        .bind(approver_uuids(rule))
        .bind(i16::from(rule.min_approval_percentage))
        .bind(rule.updated_at)
        .bind(read_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM approval_rules WHERE id = $1")
            .bind(*rule.id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Err(match exists {
            None => DatabaseError::not_found("ApprovalRule", rule.id),
            Some(_) => DatabaseError::VersionConflict(format!(
                "approval rule {} was modified concurrently",
                rule.id
            )),
        })
    }

    async fn delete_row(&self, id: ApprovalRuleId) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM approval_rules WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn fetch_one(&self, id: ApprovalRuleId) -> Result<Option<ApprovalRule>, DatabaseError> {
        let row: Option<ApprovalRuleRow> = sqlx::query_as(&format!("{RULE_COLUMNS} WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(ApprovalRule::try_from).transpose()
    }

    async fn fetch_all(&self) -> Result<Vec<ApprovalRule>, DatabaseError> {
        let rows: Vec<ApprovalRuleRow> =
            sqlx::query_as(&format!("{RULE_COLUMNS} ORDER BY created_at, id"))
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(ApprovalRule::try_from).collect()
    }
}

impl DomainPort for PgApprovalRuleStore {}

#[async_trait]
impl HealthCheckable for PgApprovalRuleStore {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, ADAPTER_ID).await
    }
}

#[async_trait]
impl ApprovalRuleStore for PgApprovalRuleStore {
    #[instrument(skip(self, rule), fields(rule_id = %rule.id))]
    async fn insert(&self, rule: &ApprovalRule) -> Result<(), PortError> {
        Ok(self.insert_row(rule).await?)
    }

    #[instrument(skip(self, rule), fields(rule_id = %rule.id))]
    async fn update(&self, rule: &ApprovalRule, read_at: DateTime<Utc>) -> Result<(), PortError> {
        Ok(self.update_row(rule, read_at).await?)
    }

    #[instrument(skip(self), fields(rule_id = %id))]
    async fn delete(&self, id: ApprovalRuleId) -> Result<bool, PortError> {
        Ok(self.delete_row(id).await?)
    }

    async fn find_by_id(&self, id: ApprovalRuleId) -> Result<Option<ApprovalRule>, PortError> {
        Ok(self.fetch_one(id).await?)
    }

    async fn list(&self) -> Result<Vec<ApprovalRule>, PortError> {
        Ok(self.fetch_all().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(percentage: i16) -> ApprovalRuleRow {
        let now = Utc::now();
        ApprovalRuleRow {
            id: Uuid::new_v4(),
            description: "Travel over 1000".to_string(),
            approvers: vec![Uuid::new_v4(), Uuid::new_v4()],
            min_approval_percentage: percentage,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_row_maps_to_rule() {
        let row = row(90);
        let first = row.approvers[0];

        let rule = ApprovalRule::try_from(row).unwrap();
        assert_eq!(rule.min_approval_percentage, 90);
        assert_eq!(rule.approver_count(), 2);
        assert_eq!(*rule.approvers[0].as_uuid(), first);
    }

    #[test]
    fn test_out_of_range_percentage_is_rejected() {
        assert!(ApprovalRule::try_from(row(-5)).is_err());
    }
}

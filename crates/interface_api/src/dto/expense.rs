//! Expense DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{ApprovalRuleId, Currency, ExpenseId, UserId};
use domain_expense::{
    ApprovalReport, ConsensusOutcome, ConsensusTally, Decision, DecisionReport, ExpenseCategory, ExpenseFilter,
    ExpenseRecord, ExpenseStatus, NewExpense, NoticeStatus,
};

use crate::error::ApiError;

/// Body of `POST /employee/expenses`
///
/// Required fields are optional here so the domain can report every missing
/// field at once.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseRequest {
    #[validate(length(max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub bill_date: Option<NaiveDate>,
    pub category: Option<String>,
    #[validate(length(max = 100))]
    pub paid_by: Option<String>,
    #[validate(length(max = 2000))]
    pub remarks: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    #[validate(length(max = 1024))]
    pub receipt: Option<String>,
    pub approval_rule_id: Option<Uuid>,
}

impl CreateExpenseRequest {
    pub fn into_new_expense(self) -> Result<NewExpense, ApiError> {
        let currency = self
            .currency
            .map(|c| c.parse::<Currency>())
            .transpose()
            .map_err(|e| ApiError::Validation(e.to_string()))?;

        Ok(NewExpense {
            name: self.name,
            description: self.description,
            bill_date: self.bill_date,
            category: self.category,
            paid_by: self.paid_by,
            remarks: self.remarks,
            amount: self.amount,
            currency,
            receipt: self.receipt,
            approval_rule_id: self.approval_rule_id.map(ApprovalRuleId::from_uuid),
        })
    }
}

/// Body of `PUT /manager/update/:id`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DecideRequest {
    /// "Approved" or "Rejected", any case
    pub status: String,
    #[validate(length(max = 2000))]
    pub comments: Option<String>,
}

impl DecideRequest {
    pub fn decision(&self) -> Result<Decision, ApiError> {
        Ok(self.status.parse()?)
    }
}

/// Body of `POST /manager/expenses/:id/approvals`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CastApprovalRequest {
    pub vote: String,
    #[validate(length(max = 2000))]
    pub comments: Option<String>,
}

impl CastApprovalRequest {
    pub fn decision(&self) -> Result<Decision, ApiError> {
        Ok(self.vote.parse()?)
    }
}

/// Query string of `GET /manager/all`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub employee_id: Option<Uuid>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ExpenseQuery {
    pub fn into_filter(self) -> Result<ExpenseFilter, ApiError> {
        Ok(ExpenseFilter {
            status: self.status.map(|s| s.parse::<ExpenseStatus>()).transpose()?,
            category: self.category.map(|c| c.parse::<ExpenseCategory>()).transpose()?,
            employee_id: self.employee_id.map(UserId::from_uuid),
            limit: self.limit,
            offset: self.offset,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalVoteResponse {
    pub approver_id: UserId,
    pub vote: Decision,
    pub comments: Option<String>,
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseResponse {
    pub id: ExpenseId,
    pub employee_id: UserId,
    pub name: String,
    pub description: String,
    pub bill_date: NaiveDate,
    pub category: ExpenseCategory,
    pub paid_by: String,
    pub remarks: Option<String>,
    pub amount: Decimal,
    pub currency: Currency,
    pub receipt: Option<String>,
    pub status: ExpenseStatus,
    pub approval_rule_id: Option<ApprovalRuleId>,
    pub approvals: Vec<ApprovalVoteResponse>,
    pub manager_id: Option<UserId>,
    pub approval_date: Option<DateTime<Utc>>,
    pub comments: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ExpenseRecord> for ExpenseResponse {
    fn from(record: ExpenseRecord) -> Self {
        let approvals = record
            .approvals
            .into_iter()
            .map(|(approver_id, vote)| ApprovalVoteResponse {
                approver_id,
                vote: vote.vote,
                comments: vote.comments,
                decided_at: vote.decided_at,
            })
            .collect();

        Self {
            id: record.id,
            employee_id: record.employee_id,
            name: record.name,
            description: record.description,
            bill_date: record.bill_date,
            category: record.category,
            paid_by: record.paid_by,
            remarks: record.remarks,
            amount: record.amount.amount(),
            currency: record.amount.currency(),
            receipt: record.receipt,
            status: record.status,
            approval_rule_id: record.approval_rule_id,
            approvals,
            manager_id: record.manager_id,
            approval_date: record.approval_date,
            comments: record.comments,
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Delivery of the decision mail
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeResponse {
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<NoticeStatus> for NoticeResponse {
    fn from(status: NoticeStatus) -> Self {
        match status {
            NoticeStatus::Sent => Self { sent: true, warning: None },
            NoticeStatus::Failed { reason } => Self {
                sent: false,
                warning: Some(format!("decision saved but notification failed: {}", reason)),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    pub expense: ExpenseResponse,
    pub notice: NoticeResponse,
}

impl From<DecisionReport> for DecisionResponse {
    fn from(report: DecisionReport) -> Self {
        Self {
            expense: report.expense.into(),
            notice: report.notice.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyResponse {
    pub approved: u32,
    pub rejected: u32,
    pub pending: u32,
    pub total: u32,
    pub approval_percentage: Decimal,
    pub required_percentage: u8,
    pub outcome: ConsensusOutcome,
}

impl From<ConsensusTally> for TallyResponse {
    fn from(tally: ConsensusTally) -> Self {
        Self {
            approved: tally.approved,
            rejected: tally.rejected,
            pending: tally.pending,
            total: tally.total,
            approval_percentage: tally.approval_percentage,
            required_percentage: tally.required_percentage,
            outcome: tally.outcome,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResponse {
    pub expense: ExpenseResponse,
    pub tally: TallyResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<NoticeResponse>,
}

impl From<ApprovalReport> for ApprovalResponse {
    fn from(report: ApprovalReport) -> Self {
        Self {
            expense: report.expense.into(),
            tally: report.tally.into(),
            notice: report.notice.map(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_reads_camel_case() {
        let request: CreateExpenseRequest = serde_json::from_value(serde_json::json!({
            "name": "Taxi",
            "billDate": "2024-03-14",
            "paidBy": "Card",
            "amount": "150.00",
            "currency": "eur"
        }))
        .unwrap();

        let fields = request.into_new_expense().unwrap();
        assert_eq!(fields.paid_by.as_deref(), Some("Card"));
        assert_eq!(fields.bill_date, NaiveDate::from_ymd_opt(2024, 3, 14));
        assert_eq!(fields.currency, Some(Currency::EUR));
    }

    #[test]
    fn test_unknown_currency_is_validation_error() {
        let request = CreateExpenseRequest {
            currency: Some("XYZ".to_string()),
            ..Default::default()
        };
        assert!(matches!(request.into_new_expense(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_decision_parsing() {
        let request = DecideRequest { status: "approved".to_string(), comments: None };
        assert_eq!(request.decision().unwrap(), Decision::Approved);

        let request = DecideRequest { status: "Maybe".to_string(), comments: None };
        assert!(matches!(request.decision(), Err(ApiError::InvalidInput(_))));
    }

    #[test]
    fn test_failed_notice_becomes_warning() {
        let response = NoticeResponse::from(NoticeStatus::Failed { reason: "smtp down".to_string() });
        assert!(!response.sent);
        assert!(response.warning.unwrap().contains("smtp down"));
    }
}

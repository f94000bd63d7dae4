//! Approval rule DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{ApprovalRuleId, UserId};
use domain_expense::{ApprovalRule, ApprovalRuleUpdate, NewApprovalRule};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRuleRequest {
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[validate(length(min = 1, max = 100))]
    pub approvers: Vec<Uuid>,
    pub min_approval_percentage: u32,
}

impl From<CreateRuleRequest> for NewApprovalRule {
    fn from(request: CreateRuleRequest) -> Self {
        Self {
            description: request.description,
            approvers: request.approvers.into_iter().map(UserId::from_uuid).collect(),
            min_approval_percentage: request.min_approval_percentage,
        }
    }
}

/// Partial update; absent fields stay unchanged
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRuleRequest {
    #[validate(length(min = 1, max = 500))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub approvers: Option<Vec<Uuid>>,
    pub min_approval_percentage: Option<u32>,
}

impl From<UpdateRuleRequest> for ApprovalRuleUpdate {
    fn from(request: UpdateRuleRequest) -> Self {
        Self {
            description: request.description,
            approvers: request
                .approvers
                .map(|ids| ids.into_iter().map(UserId::from_uuid).collect()),
            min_approval_percentage: request.min_approval_percentage,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleResponse {
    pub id: ApprovalRuleId,
    pub description: String,
    pub approvers: Vec<UserId>,
    pub min_approval_percentage: u8,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ApprovalRule> for RuleResponse {
    fn from(rule: ApprovalRule) -> Self {
        Self {
            id: rule.id,
            description: rule.description,
            approvers: rule.approvers,
            min_approval_percentage: rule.min_approval_percentage,
            created_by: rule.created_by,
            created_at: rule.created_at,
            updated_at: rule.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_approver_list_fails_validation() {
        let request = CreateRuleRequest {
            description: "Travel".to_string(),
            approvers: Vec::new(),
            min_approval_percentage: 90,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_update_request_keeps_absent_fields_empty() {
        let request: UpdateRuleRequest =
            serde_json::from_value(serde_json::json!({ "minApprovalPercentage": 95 })).unwrap();
        let update = ApprovalRuleUpdate::from(request);

        assert_eq!(update.min_approval_percentage, Some(95));
        assert!(update.description.is_none());
        assert!(update.approvers.is_none());
    }
}

//! Approval consensus evaluation
//!
//! Given a rule and a snapshot of approver positions, decides whether the
//! quorum has approved, can no longer approve, or is still open. The
//! evaluation is pure: the same rule and snapshot always give the same tally.
//!
//! All threshold comparisons are done on integers
//! (`approved * 100 >= pct * total`) so that no rounding is involved.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::approval_rule::ApprovalRule;
use crate::decision::{ApproverDecision, Decision, DecisionSnapshot};

/// Outcome of a consensus evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusOutcome {
    /// Threshold met
    Approved,
    /// Threshold can no longer be met even if every pending approver approves
    Rejected,
    /// Still open
    Pending,
}

impl ConsensusOutcome {
    /// The final decision this outcome stands for, if any
    pub fn as_decision(&self) -> Option<Decision> {
        match self {
            ConsensusOutcome::Approved => Some(Decision::Approved),
            ConsensusOutcome::Rejected => Some(Decision::Rejected),
            ConsensusOutcome::Pending => None,
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, ConsensusOutcome::Pending)
    }
}

/// Vote counts over a rule's approvers together with the outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusTally {
    pub approved: u32,
    pub rejected: u32,
    pub pending: u32,
    pub total: u32,
    /// Share of approvers that approved, in percent, 2 decimal places
    pub approval_percentage: Decimal,
    pub required_percentage: u8,
    pub outcome: ConsensusOutcome,
}

/// Evaluates `snapshot` against `rule`
///
/// Votes from identities the rule does not name are ignored. A rule without
/// approvers never reaches a decision.
pub fn evaluate(rule: &ApprovalRule, snapshot: &DecisionSnapshot) -> ConsensusTally {
    let mut approved: u32 = 0;
    let mut rejected: u32 = 0;
    let mut pending: u32 = 0;

    for approver in &rule.approvers {
        match snapshot.get(approver).copied().unwrap_or(ApproverDecision::Pending) {
            ApproverDecision::Approved => approved += 1,
            ApproverDecision::Rejected => rejected += 1,
            ApproverDecision::Pending => pending += 1,
        }
    }

    let total = approved + rejected + pending;
    let required = u64::from(rule.min_approval_percentage);
    let threshold = required * u64::from(total);

    let outcome = if total == 0 {
        ConsensusOutcome::Pending
    } else if u64::from(approved) * 100 >= threshold {
        ConsensusOutcome::Approved
    } else if u64::from(approved + pending) * 100 < threshold {
        ConsensusOutcome::Rejected
    } else {
        ConsensusOutcome::Pending
    };

    let approval_percentage = if total == 0 {
        Decimal::ZERO
    } else {
        (Decimal::from(approved) * Decimal::ONE_HUNDRED / Decimal::from(total)).round_dp(2)
    };

    debug!(
        rule_id = %rule.id,
        approved,
        rejected,
        pending,
        total,
        required_percentage = rule.min_approval_percentage,
        outcome = ?outcome,
        "Evaluated approval consensus"
    );

    ConsensusTally {
        approved,
        rejected,
        pending,
        total,
        approval_percentage,
        required_percentage: rule.min_approval_percentage,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_kernel::UserId;

    fn rule(approvers: usize, percentage: u8) -> ApprovalRule {
        let now = Utc::now();
        ApprovalRule {
            id: core_kernel::ApprovalRuleId::new(),
            description: "test".to_string(),
            approvers: (0..approvers).map(|_| UserId::new()).collect(),
            min_approval_percentage: percentage,
            created_by: UserId::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_snapshot_is_pending() {
        let tally = evaluate(&rule(3, 100), &DecisionSnapshot::new());
        assert_eq!(tally.outcome, ConsensusOutcome::Pending);
        assert_eq!(tally.pending, 3);
    }

    #[test]
    fn test_exact_threshold_approves() {
        // 5 approvers at 100%: exactly 5 needed
        let rule = rule(5, 100);
        let snapshot: DecisionSnapshot = rule
            .approvers
            .iter()
            .map(|a| (*a, ApproverDecision::Approved))
            .collect();
        let tally = evaluate(&rule, &snapshot);
        assert_eq!(tally.outcome, ConsensusOutcome::Approved);
        assert_eq!(tally.approval_percentage, Decimal::ONE_HUNDRED);
    }

    #[test]
    fn test_outsider_votes_are_ignored() {
        let rule = rule(1, 100);
        let mut snapshot = DecisionSnapshot::new();
        snapshot.insert(UserId::new(), ApproverDecision::Approved);
        let tally = evaluate(&rule, &snapshot);
        assert_eq!(tally.outcome, ConsensusOutcome::Pending);
        assert_eq!(tally.total, 1);
    }

    #[test]
    fn test_approverless_rule_never_decides() {
        let tally = evaluate(&rule(0, 90), &DecisionSnapshot::new());
        assert_eq!(tally.outcome, ConsensusOutcome::Pending);
        assert_eq!(tally.approval_percentage, Decimal::ZERO);
    }
}

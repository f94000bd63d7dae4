//! Decision notices delivered to the log
//!
//! Mail transport is not part of this service; the server writes each notice
//! as a structured `tracing` event that a log shipper can forward.

use async_trait::async_trait;
use tracing::info;

use core_kernel::{DomainPort, PortError, UserId};
use domain_expense::{DecisionNotice, Notifier};

#[derive(Debug, Default, Clone)]
pub struct LoggingNotifier;

impl LoggingNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl DomainPort for LoggingNotifier {}

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send_decision_notice(&self, employee_id: UserId, notice: &DecisionNotice) -> Result<(), PortError> {
        info!(
            employee_id = %employee_id,
            expense_id = %notice.expense_id,
            expense_name = %notice.expense_name,
            outcome = %notice.outcome,
            decided_by = %notice.decided_by,
            comments = notice.comments.as_deref().unwrap_or(""),
            "Decision notice"
        );
        Ok(())
    }
}

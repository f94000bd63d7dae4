//! Notifier double
//!
//! Records every notice it is asked to send. It can be switched into a
//! failing mode to exercise the "decision stands, notice lost" path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use core_kernel::{DomainPort, PortError, UserId};
use domain_expense::{DecisionNotice, Notifier};
use tokio::sync::Mutex;

#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(UserId, DecisionNotice)>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every send fails
    pub fn failing() -> Self {
        let notifier = Self::new();
        notifier.set_failing(true);
        notifier
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Notices delivered so far, in order
    pub async fn sent(&self) -> Vec<(UserId, DecisionNotice)> {
        self.sent.lock().await.clone()
    }
}

impl DomainPort for RecordingNotifier {}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_decision_notice(&self, employee_id: UserId, notice: &DecisionNotice) -> Result<(), PortError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError::ServiceUnavailable {
                service: "smtp".to_string(),
            });
        }
        self.sent.lock().await.push((employee_id, notice.clone()));
        Ok(())
    }
}

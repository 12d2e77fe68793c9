/// Notification scheduling.
// Delivery is a capability: `TokioNotifier` fires from a timer task, and
// `NoopNotifier` stands in wherever notifications are unsupported.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Only alerts due within this horizon are scheduled
pub const ALERT_HORIZON: Duration = Duration::from_secs(2 * 60 * 60);
/// Alerts fire this long before the critical hour
pub const ALERT_LEAD: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Cancellation handle for a scheduled notification. Dropping it cancels.
#[derive(Debug, Default)]
pub struct NotificationHandle {
    task: Option<JoinHandle<()>>,
}

impl NotificationHandle {
    pub fn noop() -> Self {
        Self { task: None }
    }

    /// Still waiting to fire
    pub fn is_pending(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    pub fn cancel(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for NotificationHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

pub trait Notifier: Send + Sync {
    fn schedule(&self, at: DateTime<Utc>, message: String) -> NotificationHandle;
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn schedule(&self, _at: DateTime<Utc>, _message: String) -> NotificationHandle {
        NotificationHandle::noop()
    }
}

/// Timer-backed notifier. Must be used from within a tokio runtime.
#[derive(Default)]
pub struct TokioNotifier {
    sender: Option<mpsc::UnboundedSender<Notification>>,
}

impl TokioNotifier {
    /// Deliver through `tracing` only
    pub fn new() -> Self {
        Self { sender: None }
    }

    /// Also deliver each notification on a channel
    pub fn with_channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { sender: Some(tx) }, rx)
    }
}

impl Notifier for TokioNotifier {
    fn schedule(&self, at: DateTime<Utc>, message: String) -> NotificationHandle {
        let delay = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let sender = self.sender.clone();
        debug!(at = %at, delay_ms = delay.as_millis() as u64, "notification scheduled");

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            info!(at = %at, %message, "notification");
            if let Some(tx) = sender {
                let _ = tx.send(Notification { at, message });
            }
        });

        NotificationHandle { task: Some(task) }
    }
}

/// When to fire an alert for `critical`, if at all: only for a future instant
/// within the horizon, `ALERT_LEAD` ahead but never before `now`.
pub fn plan_critical_alert(
    critical: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let critical = critical?;
    let until = (critical - now).to_std().ok()?;
    if until.is_zero() || until > ALERT_HORIZON {
        return None;
    }
    let lead = chrono::Duration::from_std(ALERT_LEAD).ok()?;
    Some((critical - lead).max(now))
}

pub fn alert_message(critical: DateTime<Utc>) -> String {
    format!(
        "High NO₂ risk expected at {} UTC.",
        critical.format("%H:%M")
    )
}

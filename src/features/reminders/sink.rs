//! Notification delivery seam.

use crate::core::Recipient;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;

/// Delivers a reminder notification to its recipient.
///
/// `Ok(false)` is an ordinary delivery failure. `Err` is reserved for
/// unexpected faults; the scheduler logs both and retries on a later sweep.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(
        &self,
        recipient: &Recipient,
        event_name: &str,
        reminder_time: DateTime<Utc>,
        event_time: DateTime<Utc>,
    ) -> Result<bool>;
}

/// Sink that writes the notification to the log and always succeeds
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationSink;

impl LogNotificationSink {
    pub fn render(
        recipient: &Recipient,
        event_name: &str,
        reminder_time: DateTime<Utc>,
        event_time: DateTime<Utc>,
    ) -> String {
        format!(
            "===== REMINDER NOTIFICATION =====\n\
             To: {} ({})\n\
             Event: {}\n\
             Event Time: {}\n\
             Reminder Time: {}\n\
             =================================",
            recipient.name,
            recipient.contact_address,
            event_name,
            event_time.format("%Y-%m-%d %H:%M:%S UTC"),
            reminder_time.format("%Y-%m-%d %H:%M:%S UTC"),
        )
    }
}

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn deliver(
        &self,
        recipient: &Recipient,
        event_name: &str,
        reminder_time: DateTime<Utc>,
        event_time: DateTime<Utc>,
    ) -> Result<bool> {
        info!(
            "\n{}",
            Self::render(recipient, event_name, reminder_time, event_time)
        );
        Ok(true)
    }
}

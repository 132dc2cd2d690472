//! Periodic sweep that delivers due reminders.

use super::sink::NotificationSink;
use crate::core::{Clock, Recipient, ReminderSettings};
use crate::features::events::EventService;
use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Counts from a single sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Reminders inside the due window at the start of the sweep
    pub selected: usize,
    pub delivered: usize,
    pub failed: usize,
}

pub struct ReminderScheduler {
    events: Arc<EventService>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    settings: ReminderSettings,
    running: AtomicBool,
}

/// Control over a started scheduler. Dropping it stops the loop after the
/// current sweep.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the loop and wait for an in-flight sweep to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.join.await {
            warn!("Reminder scheduler task ended abnormally: {e}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl ReminderScheduler {
    pub fn new(
        events: Arc<EventService>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        settings: ReminderSettings,
    ) -> Self {
        Self {
            events,
            sink,
            clock,
            settings,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn the sweep loop.
    ///
    /// Fails if a loop started from this scheduler is still running. Once its
    /// handle has been shut down the scheduler can be started again.
    pub fn start(self: &Arc<Self>) -> Result<SchedulerHandle> {
        if self.running.swap(true, Ordering::SeqCst) {
            anyhow::bail!("reminder scheduler is already running");
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler = Arc::clone(self);
        let join = tokio::spawn(async move {
            scheduler.run(shutdown_rx).await;
            scheduler.running.store(false, Ordering::SeqCst);
        });

        Ok(SchedulerHandle { shutdown_tx, join })
    }

    async fn run(self: &Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            "Reminder scheduler started (interval: {}s, window: {}s)",
            self.settings.sweep_interval.as_secs(),
            self.settings.due_window.as_secs()
        );

        loop {
            let delay = delay_until_next_tick(self.clock.now(), self.settings.sweep_interval);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_rx.changed() => break,
            }

            // Each sweep runs in its own task so a panic is contained, and is
            // awaited so sweeps never overlap.
            let scheduler = Arc::clone(self);
            match tokio::spawn(async move { scheduler.run_tick().await }).await {
                Ok(Ok(report)) if report.selected > 0 => info!(
                    "Reminder sweep: {} due, {} delivered, {} failed",
                    report.selected, report.delivered, report.failed
                ),
                Ok(Ok(_)) => debug!("Reminder sweep: nothing due"),
                Ok(Err(e)) => error!("Reminder sweep failed: {e:#}"),
                Err(e) => error!("Reminder sweep panicked: {e}"),
            }

            if *shutdown_rx.borrow() {
                break;
            }
        }

        info!("Reminder scheduler stopped");
    }

    /// Run one sweep: find due reminders, deliver them one at a time and
    /// mark each successful delivery as sent.
    ///
    /// A failed delivery leaves the reminder unsent for the next sweep and
    /// does not stop the remaining deliveries.
    pub async fn run_tick(&self) -> Result<TickReport> {
        let now = self.clock.now();
        let window = chrono::Duration::from_std(self.settings.due_window)?;
        let due = self.events.due_reminders(now, window)?;

        let mut report = TickReport {
            selected: due.len(),
            ..Default::default()
        };

        for item in due {
            let recipient = Recipient::from(&item.user);
            let delivered = self
                .deliver(&recipient, &item.event.name, item.reminder.time, item.event.date)
                .await;
            if !delivered {
                report.failed += 1;
                continue;
            }

            report.delivered += 1;
            match self
                .events
                .mark_delivered(item.event.id, item.reminder.id, item.reminder.time)
            {
                Ok(true) => {}
                Ok(false) => debug!(
                    "Reminder {} was removed from event {} during delivery",
                    item.reminder.id, item.event.id
                ),
                Err(e) => error!(
                    "Delivered reminder {} but could not mark it sent: {e}",
                    item.reminder.id
                ),
            }
        }

        Ok(report)
    }

    async fn deliver(
        &self,
        recipient: &Recipient,
        event_name: &str,
        reminder_time: DateTime<Utc>,
        event_time: DateTime<Utc>,
    ) -> bool {
        let attempt = self
            .sink
            .deliver(recipient, event_name, reminder_time, event_time);
        match tokio::time::timeout(self.settings.delivery_timeout, attempt).await {
            Ok(Ok(true)) => {
                info!("Sent reminder for '{event_name}' to {}", recipient.name);
                true
            }
            Ok(Ok(false)) => {
                warn!(
                    "Delivery of reminder for '{event_name}' to {} failed; will retry",
                    recipient.name
                );
                false
            }
            Ok(Err(e)) => {
                warn!(
                    "Delivery of reminder for '{event_name}' to {} errored: {e}",
                    recipient.name
                );
                false
            }
            Err(_) => {
                warn!(
                    "Delivery of reminder for '{event_name}' to {} timed out after {}s",
                    recipient.name,
                    self.settings.delivery_timeout.as_secs()
                );
                false
            }
        }
    }
}

/// Time from `now` to the next multiple of `interval` since the Unix epoch.
/// Exactly on a boundary waits a full interval.
pub fn delay_until_next_tick(now: DateTime<Utc>, interval: Duration) -> Duration {
    let interval_ms = interval.as_millis().max(1) as i64;
    let elapsed = now.timestamp_millis().rem_euclid(interval_ms);
    Duration::from_millis((interval_ms - elapsed) as u64)
}

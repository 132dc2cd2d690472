//! # Reminders Feature
//!
//! Scheduled reminder delivery: a periodic sweep finds reminders inside the
//! due window and hands them to a notification sink.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: true

pub mod scheduler;
pub mod sink;

pub use scheduler::{delay_until_next_tick, ReminderScheduler, SchedulerHandle, TickReport};
pub use sink::{LogNotificationSink, NotificationSink};

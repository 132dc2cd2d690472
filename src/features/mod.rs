//! # Features
//!
//! One module per feature. Each carries its own version header.

pub mod accounts;
pub mod events;
pub mod query;
pub mod reminders;
pub mod seed;

pub use accounts::AccountService;
pub use events::EventService;
pub use query::{DueReminder, EventFilter, EventSort, EventView, UpcomingReminder};
pub use reminders::{
    LogNotificationSink, NotificationSink, ReminderScheduler, SchedulerHandle, TickReport,
};
pub use seed::{apply_seed, SeedData};

/// Crate version reported at startup
pub fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

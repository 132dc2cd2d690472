// Core layer - domain types, config, clock and errors
pub mod core;

// Infrastructure - entity storage
pub mod store;

// Features layer - all feature modules
pub mod features;

pub use self::core::{Clock, Config, MockClock, SystemClock, TrackerError, TrackerResult};
pub use store::{DeleteOutcome, EntityStore, MemoryStore};

pub use features::{
    // Accounts
    AccountService,
    // Events
    EventService,
    // Query
    EventFilter, EventSort, EventView, UpcomingReminder, DueReminder,
    // Reminders
    LogNotificationSink, NotificationSink, ReminderScheduler, SchedulerHandle, TickReport,
    // Seed
    apply_seed, SeedData,
};

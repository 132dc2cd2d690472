//! # Core Module
//!
//! Core domain types, configuration, clock and error handling for the tracker.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod clock;
pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used items
pub use clock::{Clock, MockClock, SystemClock};
pub use config::{Config, ReminderSettings};
pub use error::{EntityKind, TrackerError, TrackerResult};
pub use models::{
    Category, CategoryPatch, CategorySummary, Event, EventChanges, EventDraft, EventPatch,
    NewCategory, NewEvent, NewUser, Recipient, Reminder, User, UserPatch,
    DEFAULT_CATEGORY_COLOR,
};

//! # Feature: Events
//!
//! Create/update/delete for events, their embedded reminders and the
//! categories that group them. Ownership is checked here; the store checks
//! owner and category references in the same step as the write.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

mod categories;
mod reminders;
mod service;

pub use service::EventService;

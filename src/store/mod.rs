//! # Entity Store
//!
//! Authoritative holder of users, categories and events. Every read and write
//! goes through [`EntityStore`], so callers never touch the collections and a
//! persistent backend can replace [`MemoryStore`] without changes elsewhere.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod memory;

pub use memory::MemoryStore;

use crate::core::{
    Category, CategoryPatch, Event, EventDraft, EventPatch, NewCategory, NewUser, Reminder, User,
    UserPatch,
};
use anyhow::Result;
use uuid::Uuid;

/// Result of a category delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Events still reference the category; nothing was removed
    Blocked { blocking_count: usize },
    NotFound,
}

/// CRUD access to the tracked entities.
///
/// `create_*` assigns ids and timestamps. `update_*` merges the supplied
/// fields, bumps `updated_at` and returns `None` for unknown ids.
/// `delete_*` returns whether something was removed.
///
/// Writes that reference other records check those references atomically
/// with user and category deletes: the owner must exist and an event's
/// category must belong to the event's owner. A failed check is returned as
/// a [`TrackerError`](crate::core::TrackerError) inside the `anyhow` error
/// and nothing is written.
pub trait EntityStore: Send + Sync {
    // Users
    fn create_user(&self, user: NewUser) -> Result<User>;
    fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>>;
    /// Removes the user together with everything they own
    fn delete_user(&self, id: Uuid) -> Result<bool>;

    // Categories
    fn create_category(&self, category: NewCategory) -> Result<Category>;
    fn find_category_by_id(&self, id: Uuid) -> Result<Option<Category>>;
    fn find_categories_by_user(&self, user_id: Uuid) -> Result<Vec<Category>>;
    fn update_category(&self, id: Uuid, patch: CategoryPatch) -> Result<Option<Category>>;
    /// Refuses while any event references the category
    fn delete_category(&self, id: Uuid) -> Result<DeleteOutcome>;
    fn count_events_in_category(&self, id: Uuid) -> Result<usize>;

    // Events
    fn create_event(&self, event: EventDraft) -> Result<Event>;
    fn find_event_by_id(&self, id: Uuid) -> Result<Option<Event>>;
    fn find_events_by_owner(&self, user_id: Uuid) -> Result<Vec<Event>>;
    fn all_events(&self) -> Result<Vec<Event>>;
    fn update_event(&self, id: Uuid, patch: EventPatch) -> Result<Option<Event>>;
    fn delete_event(&self, id: Uuid) -> Result<bool>;

    // Reminders, always addressed through their event
    fn add_reminder(&self, event_id: Uuid, reminder: Reminder) -> Result<Option<Event>>;
    fn remove_reminder(&self, event_id: Uuid, reminder_id: Uuid) -> Result<bool>;
    /// Sets `sent`; a reminder that is already sent stays sent
    fn mark_reminder_sent(&self, event_id: Uuid, reminder_id: Uuid) -> Result<bool>;
}

//! Domain records held by the entity store.
//!
//! Users own categories and events by id. Reminders are embedded in their
//! event and have no identity outside of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Color assigned to a category when none is supplied
pub const DEFAULT_CATEGORY_COLOR: &str = "#3498db";

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Opaque credential produced by the auth layer; never inspected here
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to register a user
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Partial user update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

/// A user-defined grouping for events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub color: Option<String>,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub color: Option<String>,
}

/// The parts of a category shown alongside an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

impl From<&Category> for CategorySummary {
    fn from(category: &Category) -> Self {
        CategorySummary {
            id: category.id,
            name: category.name.clone(),
            color: category.color.clone(),
        }
    }
}

/// A single point in time at which the event owner is notified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    /// Unique within the owning event only
    pub id: Uuid,
    pub time: DateTime<Utc>,
    /// Flips to true once delivered and never back
    pub sent: bool,
}

impl Reminder {
    /// Create an unsent reminder with a fresh id
    pub fn new(time: DateTime<Utc>) -> Self {
        Reminder {
            id: Uuid::new_v4(),
            time,
            sent: false,
        }
    }
}

/// A dated event owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub category_id: Option<Uuid>,
    pub user_id: Uuid,
    /// Insertion order, not time order
    pub reminders: Vec<Reminder>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Look up one of this event's reminders
    pub fn reminder(&self, reminder_id: Uuid) -> Option<&Reminder> {
        self.reminders.iter().find(|r| r.id == reminder_id)
    }
}

/// Event fields as submitted at creation time
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub name: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub reminders: Vec<DateTime<Utc>>,
}

/// Event record handed to the store. Reminders are already normalized.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub name: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub category_id: Option<Uuid>,
    pub user_id: Uuid,
    pub reminders: Vec<Reminder>,
}

/// Partial event update.
///
/// The outer `Option` marks presence, so `description: Some(None)` clears the
/// description while `description: None` keeps it. A present `reminders` list
/// replaces the existing one.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub date: Option<DateTime<Utc>>,
    pub category_id: Option<Option<Uuid>>,
    pub reminders: Option<Vec<Reminder>>,
}

/// Patch as submitted by a caller, before reminders are normalized
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub date: Option<DateTime<Utc>>,
    pub category_id: Option<Option<Uuid>>,
    pub reminders: Option<Vec<DateTime<Utc>>>,
}

/// Where a reminder notification goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub id: Uuid,
    pub name: String,
    pub contact_address: String,
}

impl From<&User> for Recipient {
    fn from(user: &User) -> Self {
        Recipient {
            id: user.id,
            name: user.username.clone(),
            contact_address: user.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_reminder_is_unsent() {
        let time = Utc.with_ymd_and_hms(2025, 1, 10, 8, 55, 0).unwrap();
        let reminder = Reminder::new(time);
        assert!(!reminder.sent);
        assert_eq!(reminder.time, time);
        assert_ne!(reminder.id, Reminder::new(time).id);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "secret-hash".to_string(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("alice"));
        assert!(!json.contains("secret-hash"));
    }

    #[test]
    fn test_recipient_from_user() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        };
        let recipient = Recipient::from(&user);
        assert_eq!(recipient.id, user.id);
        assert_eq!(recipient.name, "alice");
        assert_eq!(recipient.contact_address, "a@x.com");
    }
}

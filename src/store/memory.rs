//! In-memory [`EntityStore`] backed by `DashMap` collections.
//!
//! Single-record writes lock only the affected shard. Deletes that cascade or
//! count references, and writes that point at another record, serialize on
//! `cross_lock` so a reference check and the write it guards cannot
//! interleave with a delete.

use super::{DeleteOutcome, EntityStore};
use crate::core::{
    Category, CategoryPatch, Clock, EntityKind, Event, EventDraft, EventPatch, NewCategory,
    NewUser, Reminder, TrackerError, User, UserPatch, DEFAULT_CATEGORY_COLOR,
};
use anyhow::Result;
use dashmap::DashMap;
use log::debug;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    categories: DashMap<Uuid, Category>,
    events: DashMap<Uuid, Event>,
    cross_lock: Mutex<()>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Create an empty store stamping records with `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            users: DashMap::new(),
            categories: DashMap::new(),
            events: DashMap::new(),
            cross_lock: Mutex::new(()),
            clock,
        }
    }

    fn lock_references(&self) -> MutexGuard<'_, ()> {
        self.cross_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Caller must hold `cross_lock`
    fn ensure_user(&self, user_id: Uuid) -> Result<()> {
        if !self.users.contains_key(&user_id) {
            return Err(TrackerError::not_found(EntityKind::User, user_id).into());
        }
        Ok(())
    }

    /// Caller must hold `cross_lock`
    fn ensure_category_owned(&self, user_id: Uuid, category_id: Uuid) -> Result<()> {
        let owned = self
            .categories
            .get(&category_id)
            .is_some_and(|category| category.user_id == user_id);
        if !owned {
            return Err(TrackerError::InvalidCategory(category_id).into());
        }
        Ok(())
    }
}

/// Give any reminder whose id already appeared earlier in the list a fresh id
fn dedupe_reminder_ids(reminders: &mut [Reminder]) {
    let mut seen = HashSet::new();
    for reminder in reminders.iter_mut() {
        while !seen.insert(reminder.id) {
            reminder.id = Uuid::new_v4();
        }
    }
}

impl EntityStore for MemoryStore {
    fn create_user(&self, user: NewUser) -> Result<User> {
        let now = self.clock.now();
        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id, user.clone());
        debug!("Stored user {}", user.id);
        Ok(user)
    }

    fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.clone()))
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.clone()))
    }

    fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>> {
        let now = self.clock.now();
        Ok(self.users.get_mut(&id).map(|mut user| {
            if let Some(username) = patch.username {
                user.username = username;
            }
            if let Some(email) = patch.email {
                user.email = email;
            }
            if let Some(password_hash) = patch.password_hash {
                user.password_hash = password_hash;
            }
            user.updated_at = now;
            user.clone()
        }))
    }

    fn delete_user(&self, id: Uuid) -> Result<bool> {
        let _guard = self.lock_references();
        if self.users.remove(&id).is_none() {
            return Ok(false);
        }
        self.events.retain(|_, event| event.user_id != id);
        self.categories.retain(|_, category| category.user_id != id);
        debug!("Deleted user {id} and owned records");
        Ok(true)
    }

    fn create_category(&self, category: NewCategory) -> Result<Category> {
        let now = self.clock.now();
        let _guard = self.lock_references();
        self.ensure_user(category.user_id)?;

        let category = Category {
            id: Uuid::new_v4(),
            name: category.name,
            color: category
                .color
                .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            user_id: category.user_id,
            created_at: now,
            updated_at: now,
        };
        self.categories.insert(category.id, category.clone());
        Ok(category)
    }

    fn find_category_by_id(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.categories.get(&id).map(|c| c.clone()))
    }

    fn find_categories_by_user(&self, user_id: Uuid) -> Result<Vec<Category>> {
        let mut categories: Vec<Category> = self
            .categories
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.clone())
            .collect();
        categories.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(categories)
    }

    fn update_category(&self, id: Uuid, patch: CategoryPatch) -> Result<Option<Category>> {
        let now = self.clock.now();
        Ok(self.categories.get_mut(&id).map(|mut category| {
            if let Some(name) = patch.name {
                category.name = name;
            }
            if let Some(color) = patch.color {
                category.color = color;
            }
            category.updated_at = now;
            category.clone()
        }))
    }

    fn delete_category(&self, id: Uuid) -> Result<DeleteOutcome> {
        let _guard = self.lock_references();
        if !self.categories.contains_key(&id) {
            return Ok(DeleteOutcome::NotFound);
        }

        let blocking_count = self.count_events_in_category(id)?;
        if blocking_count > 0 {
            return Ok(DeleteOutcome::Blocked { blocking_count });
        }

        self.categories.remove(&id);
        Ok(DeleteOutcome::Deleted)
    }

    fn count_events_in_category(&self, id: Uuid) -> Result<usize> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.category_id == Some(id))
            .count())
    }

    fn create_event(&self, draft: EventDraft) -> Result<Event> {
        let now = self.clock.now();
        let _guard = self.lock_references();
        self.ensure_user(draft.user_id)?;
        if let Some(category_id) = draft.category_id {
            self.ensure_category_owned(draft.user_id, category_id)?;
        }

        let mut reminders = draft.reminders;
        dedupe_reminder_ids(&mut reminders);

        let event = Event {
            id: Uuid::new_v4(),
            name: draft.name,
            description: draft.description,
            date: draft.date,
            category_id: draft.category_id,
            user_id: draft.user_id,
            reminders,
            created_at: now,
            updated_at: now,
        };
        self.events.insert(event.id, event.clone());
        Ok(event)
    }

    fn find_event_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.events.get(&id).map(|e| e.clone()))
    }

    fn find_events_by_owner(&self, user_id: Uuid) -> Result<Vec<Event>> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.clone())
            .collect())
    }

    fn all_events(&self) -> Result<Vec<Event>> {
        Ok(self.events.iter().map(|e| e.clone()).collect())
    }

    fn update_event(&self, id: Uuid, patch: EventPatch) -> Result<Option<Event>> {
        let now = self.clock.now();
        let _guard = self.lock_references();
        if let Some(Some(category_id)) = patch.category_id {
            let Some(owner) = self.events.get(&id).map(|event| event.user_id) else {
                return Ok(None);
            };
            self.ensure_category_owned(owner, category_id)?;
        }
        Ok(self.events.get_mut(&id).map(|mut event| {
            if let Some(name) = patch.name {
                event.name = name;
            }
            if let Some(description) = patch.description {
                event.description = description;
            }
            if let Some(date) = patch.date {
                event.date = date;
            }
            if let Some(category_id) = patch.category_id {
                event.category_id = category_id;
            }
            if let Some(mut reminders) = patch.reminders {
                dedupe_reminder_ids(&mut reminders);
                event.reminders = reminders;
            }
            event.updated_at = now;
            event.clone()
        }))
    }

    fn delete_event(&self, id: Uuid) -> Result<bool> {
        Ok(self.events.remove(&id).is_some())
    }

    fn add_reminder(&self, event_id: Uuid, mut reminder: Reminder) -> Result<Option<Event>> {
        let now = self.clock.now();
        Ok(self.events.get_mut(&event_id).map(|mut event| {
            while event.reminders.iter().any(|r| r.id == reminder.id) {
                reminder.id = Uuid::new_v4();
            }
            event.reminders.push(reminder);
            event.updated_at = now;
            event.clone()
        }))
    }

    fn remove_reminder(&self, event_id: Uuid, reminder_id: Uuid) -> Result<bool> {
        let now = self.clock.now();
        let Some(mut event) = self.events.get_mut(&event_id) else {
            return Ok(false);
        };
        let Some(index) = event.reminders.iter().position(|r| r.id == reminder_id) else {
            return Ok(false);
        };
        event.reminders.remove(index);
        event.updated_at = now;
        Ok(true)
    }

    fn mark_reminder_sent(&self, event_id: Uuid, reminder_id: Uuid) -> Result<bool> {
        let now = self.clock.now();
        let Some(mut event) = self.events.get_mut(&event_id) else {
            return Ok(false);
        };
        let Some(reminder) = event.reminders.iter_mut().find(|r| r.id == reminder_id) else {
            return Ok(false);
        };
        reminder.sent = true;
        event.updated_at = now;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MockClock;
    use chrono::{Duration, TimeZone, Utc};

    fn store() -> (MemoryStore, Arc<MockClock>) {
        let clock = Arc::new(MockClock::new(
            Utc.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap(),
        ));
        (MemoryStore::new(clock.clone()), clock)
    }

    fn alice(store: &MemoryStore) -> User {
        store
            .create_user(NewUser {
                username: "alice".to_string(),
                email: "a@x.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .unwrap()
    }

    fn draft(user_id: Uuid, category_id: Option<Uuid>) -> EventDraft {
        EventDraft {
            name: "Standup".to_string(),
            description: Some("daily".to_string()),
            date: Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap(),
            category_id,
            user_id,
            reminders: vec![],
        }
    }

    #[test]
    fn test_create_and_find_user() {
        let (store, clock) = store();
        let user = alice(&store);
        assert_eq!(user.created_at, clock.now());
        assert_eq!(store.find_user_by_id(user.id).unwrap(), Some(user.clone()));
        assert_eq!(
            store.find_user_by_email("a@x.com").unwrap().map(|u| u.id),
            Some(user.id)
        );
        assert_eq!(
            store.find_user_by_username("alice").unwrap().map(|u| u.id),
            Some(user.id)
        );
        assert!(store.find_user_by_email("b@x.com").unwrap().is_none());
    }

    #[test]
    fn test_category_color_defaults() {
        let (store, _) = store();
        let user = alice(&store);
        let category = store
            .create_category(NewCategory {
                name: "Work".to_string(),
                color: None,
                user_id: user.id,
            })
            .unwrap();
        assert_eq!(category.color, DEFAULT_CATEGORY_COLOR);
        assert_eq!(category.color, "#3498db");
    }

    #[test]
    fn test_update_event_presence_semantics() {
        let (store, clock) = store();
        let user = alice(&store);
        let event = store.create_event(draft(user.id, None)).unwrap();

        clock.advance(Duration::minutes(1));
        let updated = store
            .update_event(
                event.id,
                EventPatch {
                    description: Some(Some(String::new())),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.description, Some(String::new()));
        assert_eq!(updated.name, "Standup");
        assert_eq!(updated.updated_at, clock.now());
        assert_eq!(updated.created_at, event.created_at);

        let cleared = store
            .update_event(
                event.id,
                EventPatch {
                    description: Some(None),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(cleared.description, None);

        assert!(store
            .update_event(Uuid::new_v4(), EventPatch::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_delete_category_blocked_then_allowed() {
        let (store, _) = store();
        let user = alice(&store);
        let category = store
            .create_category(NewCategory {
                name: "Work".to_string(),
                color: Some("#ff0000".to_string()),
                user_id: user.id,
            })
            .unwrap();
        let first = store.create_event(draft(user.id, Some(category.id))).unwrap();
        let second = store.create_event(draft(user.id, Some(category.id))).unwrap();

        assert_eq!(
            store.delete_category(category.id).unwrap(),
            DeleteOutcome::Blocked { blocking_count: 2 }
        );
        assert!(store.find_category_by_id(category.id).unwrap().is_some());

        store
            .update_event(
                first.id,
                EventPatch {
                    category_id: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(store.delete_event(second.id).unwrap());

        assert_eq!(
            store.delete_category(category.id).unwrap(),
            DeleteOutcome::Deleted
        );
        assert_eq!(
            store.delete_category(category.id).unwrap(),
            DeleteOutcome::NotFound
        );
    }

    #[test]
    fn test_reminder_ids_unique_within_event() {
        let (store, _) = store();
        let user = alice(&store);
        let time = Utc.with_ymd_and_hms(2025, 1, 10, 8, 55, 0).unwrap();
        let duplicate = Reminder::new(time);
        let mut event_draft = draft(user.id, None);
        event_draft.reminders = vec![duplicate.clone(), duplicate.clone()];

        let event = store.create_event(event_draft).unwrap();
        assert_eq!(event.reminders.len(), 2);
        assert_ne!(event.reminders[0].id, event.reminders[1].id);

        let event = store.add_reminder(event.id, duplicate).unwrap().unwrap();
        let ids: HashSet<Uuid> = event.reminders.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_mark_and_remove_reminder() {
        let (store, _) = store();
        let user = alice(&store);
        let event = store.create_event(draft(user.id, None)).unwrap();
        let reminder = Reminder::new(Utc.with_ymd_and_hms(2025, 1, 10, 8, 55, 0).unwrap());
        let reminder_id = reminder.id;
        store.add_reminder(event.id, reminder).unwrap();

        assert!(store.mark_reminder_sent(event.id, reminder_id).unwrap());
        assert!(store.mark_reminder_sent(event.id, reminder_id).unwrap());
        let stored = store.find_event_by_id(event.id).unwrap().unwrap();
        assert!(stored.reminder(reminder_id).unwrap().sent);

        assert!(!store.mark_reminder_sent(event.id, Uuid::new_v4()).unwrap());
        assert!(!store.mark_reminder_sent(Uuid::new_v4(), reminder_id).unwrap());

        assert!(store.remove_reminder(event.id, reminder_id).unwrap());
        assert!(!store.remove_reminder(event.id, reminder_id).unwrap());
        let stored = store.find_event_by_id(event.id).unwrap().unwrap();
        assert!(stored.reminders.is_empty());
    }

    #[test]
    fn test_delete_user_cascades() {
        let (store, _) = store();
        let user = alice(&store);
        let category = store
            .create_category(NewCategory {
                name: "Work".to_string(),
                color: None,
                user_id: user.id,
            })
            .unwrap();
        store.create_event(draft(user.id, Some(category.id))).unwrap();

        assert!(store.delete_user(user.id).unwrap());
        assert!(store.users.is_empty());
        assert!(store.categories.is_empty());
        assert!(store.events.is_empty());
        assert!(!store.delete_user(user.id).unwrap());
    }

    #[test]
    fn test_writes_for_deleted_owner_leave_no_orphans() {
        let (store, _) = store();
        let user = alice(&store);
        let category = store
            .create_category(NewCategory {
                name: "Work".to_string(),
                color: None,
                user_id: user.id,
            })
            .unwrap();
        assert!(store.delete_user(user.id).unwrap());

        let err = store.create_event(draft(user.id, Some(category.id))).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrackerError>(),
            Some(TrackerError::NotFound {
                kind: EntityKind::User,
                ..
            })
        ));
        assert!(store
            .create_category(NewCategory {
                name: "Home".to_string(),
                color: None,
                user_id: user.id,
            })
            .is_err());
        assert!(store.events.is_empty());
        assert!(store.categories.is_empty());
    }

    #[test]
    fn test_event_category_must_belong_to_owner() {
        let (store, _) = store();
        let user = alice(&store);
        let bob = store
            .create_user(NewUser {
                username: "bob".to_string(),
                email: "b@x.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .unwrap();
        let bobs = store
            .create_category(NewCategory {
                name: "Bob's".to_string(),
                color: None,
                user_id: bob.id,
            })
            .unwrap();

        let err = store.create_event(draft(user.id, Some(bobs.id))).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrackerError>(),
            Some(TrackerError::InvalidCategory(id)) if *id == bobs.id
        ));

        let event = store.create_event(draft(user.id, None)).unwrap();
        let err = store
            .update_event(
                event.id,
                EventPatch {
                    category_id: Some(Some(bobs.id)),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrackerError>(),
            Some(TrackerError::InvalidCategory(_))
        ));
        let stored = store.find_event_by_id(event.id).unwrap().unwrap();
        assert_eq!(stored.category_id, None);
        assert_eq!(store.count_events_in_category(bobs.id).unwrap(), 0);
    }
}

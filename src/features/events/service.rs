use crate::core::{
    Clock, EntityKind, Event, EventChanges, EventDraft, EventPatch, NewEvent, Reminder,
    TrackerError, TrackerResult,
};
use crate::features::query::{self, EventFilter, EventSort, EventView};
use crate::store::EntityStore;
use log::{debug, info};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Mutation API for events, categories and reminders
pub struct EventService {
    pub(super) store: Arc<dyn EntityStore>,
    pub(super) clock: Arc<dyn Clock>,
    /// Held across validate-then-write sequences
    write_lock: Mutex<()>,
}

impl EventService {
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub(super) fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create an event for `user_id`. Reminder times become unsent reminders.
    pub fn create_event(&self, user_id: Uuid, event: NewEvent) -> TrackerResult<Event> {
        let name = required_name(&event.name)?;

        // The store rejects an unknown owner or a category the owner lacks
        let _guard = self.write_guard();
        let created = self.store.create_event(EventDraft {
            name,
            description: event.description,
            date: event.date,
            category_id: event.category_id,
            user_id,
            reminders: event.reminders.into_iter().map(Reminder::new).collect(),
        })?;

        info!(
            "Created event {} for user {} with {} reminder(s)",
            created.id,
            user_id,
            created.reminders.len()
        );
        Ok(created)
    }

    /// One of the caller's events with its category resolved
    pub fn get_event(&self, user_id: Uuid, event_id: Uuid) -> TrackerResult<EventView> {
        let event = self.owned_event(user_id, event_id)?;
        Ok(query::event_view(self.store.as_ref(), event)?)
    }

    pub fn list_events(
        &self,
        user_id: Uuid,
        filter: &EventFilter,
        sort: EventSort,
    ) -> TrackerResult<Vec<EventView>> {
        Ok(query::list_event_views(
            self.store.as_ref(),
            user_id,
            filter,
            sort,
        )?)
    }

    /// Apply a partial update.
    ///
    /// A supplied reminder list replaces the current one wholesale with fresh
    /// ids. A new reminder whose time matches one that was already delivered
    /// starts out sent, so replacing a list never re-sends a notification.
    pub fn update_event(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        changes: EventChanges,
    ) -> TrackerResult<Event> {
        let name = changes.name.as_deref().map(required_name).transpose()?;

        let _guard = self.write_guard();
        let current = self.owned_event(user_id, event_id)?;

        let reminders = changes.reminders.map(|times| {
            let replaced = current.reminders.len();
            let fresh: Vec<Reminder> = times
                .into_iter()
                .map(|time| {
                    let mut reminder = Reminder::new(time);
                    reminder.sent = current.reminders.iter().any(|r| r.sent && r.time == time);
                    reminder
                })
                .collect();
            debug!(
                "Replacing {replaced} reminder(s) on event {event_id} with {}",
                fresh.len()
            );
            fresh
        });

        let patch = EventPatch {
            name,
            description: changes.description,
            date: changes.date,
            category_id: changes.category_id,
            reminders,
        };
        self.store
            .update_event(event_id, patch)?
            .ok_or_else(|| TrackerError::not_found(EntityKind::Event, event_id))
    }

    /// Delete an event and every reminder it holds
    pub fn delete_event(&self, user_id: Uuid, event_id: Uuid) -> TrackerResult<()> {
        let _guard = self.write_guard();
        self.owned_event(user_id, event_id)?;
        if !self.store.delete_event(event_id)? {
            return Err(TrackerError::not_found(EntityKind::Event, event_id));
        }
        info!("Deleted event {event_id}");
        Ok(())
    }

    /// Fetch an event, treating another user's event as missing
    pub(super) fn owned_event(&self, user_id: Uuid, event_id: Uuid) -> TrackerResult<Event> {
        self.store
            .find_event_by_id(event_id)?
            .filter(|event| event.user_id == user_id)
            .ok_or_else(|| TrackerError::not_found(EntityKind::Event, event_id))
    }
}

pub(super) fn required_name(name: &str) -> TrackerResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TrackerError::Validation("name is required".to_string()));
    }
    Ok(name.to_string())
}

//! Reminder operations on a single event's embedded list.

use super::service::EventService;
use crate::core::{Clock, EntityKind, Event, Reminder, TrackerError, TrackerResult};
use crate::features::query::{self, DueReminder, UpcomingReminder};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use uuid::Uuid;

impl EventService {
    /// Append one unsent reminder to an event, leaving the rest untouched
    pub fn add_reminder(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        time: DateTime<Utc>,
    ) -> TrackerResult<Event> {
        let _guard = self.write_guard();
        self.owned_event(user_id, event_id)?;

        let reminder = Reminder::new(time);
        let reminder_id = reminder.id;
        let event = self
            .store
            .add_reminder(event_id, reminder)?
            .ok_or_else(|| TrackerError::not_found(EntityKind::Event, event_id))?;

        debug!("Added reminder {reminder_id} at {time} to event {event_id}");
        Ok(event)
    }

    /// Remove one reminder from an event
    pub fn remove_reminder(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        reminder_id: Uuid,
    ) -> TrackerResult<()> {
        let _guard = self.write_guard();
        self.owned_event(user_id, event_id)?;

        if self.store.remove_reminder(event_id, reminder_id)? {
            debug!("Removed reminder {reminder_id} from event {event_id}");
            Ok(())
        } else {
            Err(TrackerError::not_found(EntityKind::Reminder, reminder_id))
        }
    }

    /// Record a delivery made for the reminder `reminder_id` firing at `time`.
    ///
    /// If the reminder list was replaced while the notification was in
    /// flight, the unsent replacements at the same time are marked instead so
    /// the next sweep does not deliver them again. Returns false when nothing
    /// on the event matches.
    pub fn mark_delivered(
        &self,
        event_id: Uuid,
        reminder_id: Uuid,
        time: DateTime<Utc>,
    ) -> TrackerResult<bool> {
        let _guard = self.write_guard();
        if self.store.mark_reminder_sent(event_id, reminder_id)? {
            info!("Reminder {reminder_id} on event {event_id} marked as sent");
            return Ok(true);
        }

        let Some(event) = self.store.find_event_by_id(event_id)? else {
            return Ok(false);
        };
        let mut marked = false;
        for replacement in event.reminders.iter().filter(|r| !r.sent && r.time == time) {
            marked |= self.store.mark_reminder_sent(event_id, replacement.id)?;
            debug!(
                "Reminder {} on event {event_id} replaced {reminder_id} during delivery; marked as sent",
                replacement.id
            );
        }
        Ok(marked)
    }

    /// The user's pending reminders from now on, earliest first
    pub fn upcoming_reminders(&self, user_id: Uuid) -> TrackerResult<Vec<UpcomingReminder>> {
        Ok(query::find_upcoming_reminders(
            self.store.as_ref(),
            user_id,
            self.clock.now(),
        )?)
    }

    /// Every user's unsent reminders firing within `window` of `now`
    pub fn due_reminders(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> TrackerResult<Vec<DueReminder>> {
        Ok(query::find_due_reminders(self.store.as_ref(), now, window)?)
    }
}

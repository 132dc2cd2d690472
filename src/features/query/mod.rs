//! # Feature: Query
//!
//! Read-only lookups over the entity store: per-user event filtering,
//! presentation sorting, upcoming reminders and the global due-reminder scan
//! used by the scheduler. Nothing here mutates state.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

use crate::core::{Category, CategorySummary, Event, Reminder, User};
use crate::store::EntityStore;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::warn;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// ANDed constraints for [`find_events_by_user`]. Unset fields impose nothing.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub category_id: Option<Uuid>,
    /// Inclusive lower bound on the event date
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the event date
    pub end: Option<DateTime<Utc>>,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(category_id) = self.category_id {
            if event.category_id != Some(category_id) {
                return false;
            }
        }
        if self.start.is_some_and(|start| event.date < start) {
            return false;
        }
        if self.end.is_some_and(|end| event.date > end) {
            return false;
        }
        true
    }
}

/// Presentation order for event listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventSort {
    /// Ascending by date
    #[default]
    Date,
    /// By name, case-insensitive
    Name,
    /// By category name (uncategorized first), then date
    Category,
}

impl std::fmt::Display for EventSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventSort::Date => write!(f, "date"),
            EventSort::Name => write!(f, "name"),
            EventSort::Category => write!(f, "category"),
        }
    }
}

impl std::str::FromStr for EventSort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "date" => Ok(EventSort::Date),
            "name" => Ok(EventSort::Name),
            "category" => Ok(EventSort::Category),
            _ => Err(anyhow::anyhow!("Invalid sort order: {}", s)),
        }
    }
}

/// An event with its category resolved for display
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: Event,
    pub category: Option<CategorySummary>,
}

/// A pending reminder projected for a user's reminder list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpcomingReminder {
    pub id: Uuid,
    pub event_id: Uuid,
    pub event_name: String,
    pub event_date: DateTime<Utc>,
    pub category: Option<CategorySummary>,
    pub reminder_time: DateTime<Utc>,
}

/// A reminder ready for delivery, with its event and the event's owner
#[derive(Debug, Clone)]
pub struct DueReminder {
    pub event: Event,
    pub reminder: Reminder,
    pub user: User,
}

/// Events owned by `user_id` that pass `filter`, in no particular order
pub fn find_events_by_user(
    store: &dyn EntityStore,
    user_id: Uuid,
    filter: &EventFilter,
) -> Result<Vec<Event>> {
    Ok(store
        .find_events_by_owner(user_id)?
        .into_iter()
        .filter(|event| filter.matches(event))
        .collect())
}

/// Filtered events for a user with categories attached, sorted by `sort`
pub fn list_event_views(
    store: &dyn EntityStore,
    user_id: Uuid,
    filter: &EventFilter,
    sort: EventSort,
) -> Result<Vec<EventView>> {
    let categories = category_lookup(store, user_id)?;
    let mut views: Vec<EventView> = find_events_by_user(store, user_id, filter)?
        .into_iter()
        .map(|event| attach_category(event, &categories))
        .collect();
    sort_event_views(&mut views, sort);
    Ok(views)
}

/// Resolve one event's category for display
pub fn event_view(store: &dyn EntityStore, event: Event) -> Result<EventView> {
    let category = match event.category_id {
        Some(id) => store.find_category_by_id(id)?.as_ref().map(CategorySummary::from),
        None => None,
    };
    Ok(EventView { event, category })
}

pub fn sort_event_views(views: &mut [EventView], sort: EventSort) {
    match sort {
        EventSort::Date => views.sort_by(|a, b| a.event.date.cmp(&b.event.date)),
        EventSort::Name => views.sort_by(|a, b| {
            a.event
                .name
                .to_lowercase()
                .cmp(&b.event.name.to_lowercase())
                .then_with(|| a.event.name.cmp(&b.event.name))
        }),
        EventSort::Category => views.sort_by(|a, b| {
            let name_a = a.category.as_ref().map(|c| c.name.as_str()).unwrap_or("");
            let name_b = b.category.as_ref().map(|c| c.name.as_str()).unwrap_or("");
            name_a
                .to_lowercase()
                .cmp(&name_b.to_lowercase())
                .then_with(|| a.event.date.cmp(&b.event.date))
        }),
    }
}

/// Unsent reminders of `user_id` firing at or after `now`, earliest first
pub fn find_upcoming_reminders(
    store: &dyn EntityStore,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<UpcomingReminder>> {
    let categories = category_lookup(store, user_id)?;
    let mut upcoming: Vec<UpcomingReminder> = store
        .find_events_by_owner(user_id)?
        .iter()
        .flat_map(|event| {
            let category = event
                .category_id
                .and_then(|id| categories.get(&id))
                .map(CategorySummary::from);
            event
                .reminders
                .iter()
                .filter(|r| !r.sent && r.time >= now)
                .map(move |r| UpcomingReminder {
                    id: r.id,
                    event_id: event.id,
                    event_name: event.name.clone(),
                    event_date: event.date,
                    category: category.clone(),
                    reminder_time: r.time,
                })
        })
        .collect();

    upcoming.sort_by(|a, b| a.reminder_time.cmp(&b.reminder_time));
    Ok(upcoming)
}

/// Last instant of the due window opening at `now`
pub fn due_window_end(now: DateTime<Utc>, window: Duration) -> Result<DateTime<Utc>> {
    now.checked_add_signed(window).with_context(|| {
        format!(
            "due window of {}s starting at {now} is out of range",
            window.num_seconds()
        )
    })
}

/// Whether `reminder` should go out in a sweep at `now`.
///
/// Both ends of `[now, window_end]` are inclusive. Reminders already in the
/// past never qualify.
pub fn is_due(reminder: &Reminder, now: DateTime<Utc>, window_end: DateTime<Utc>) -> bool {
    !reminder.sent && reminder.time >= now && reminder.time <= window_end
}

/// Every unsent reminder across all users inside the due window, earliest first
pub fn find_due_reminders(
    store: &dyn EntityStore,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<Vec<DueReminder>> {
    let window_end = due_window_end(now, window)?;
    let mut owners: HashMap<Uuid, Option<User>> = HashMap::new();
    let mut due = Vec::new();

    for event in store.all_events()? {
        let ready: Vec<Reminder> = event
            .reminders
            .iter()
            .filter(|r| is_due(r, now, window_end))
            .cloned()
            .collect();
        if ready.is_empty() {
            continue;
        }

        let owner = match owners.get(&event.user_id) {
            Some(owner) => owner.clone(),
            None => {
                let owner = store.find_user_by_id(event.user_id)?;
                owners.insert(event.user_id, owner.clone());
                owner
            }
        };
        let Some(user) = owner else {
            warn!(
                "Skipping {} due reminder(s) on event {}: owner {} not found",
                ready.len(),
                event.id,
                event.user_id
            );
            continue;
        };

        for reminder in ready {
            due.push(DueReminder {
                event: event.clone(),
                reminder,
                user: user.clone(),
            });
        }
    }

    due.sort_by(|a, b| a.reminder.time.cmp(&b.reminder.time));
    Ok(due)
}

fn category_lookup(store: &dyn EntityStore, user_id: Uuid) -> Result<HashMap<Uuid, Category>> {
    Ok(store
        .find_categories_by_user(user_id)?
        .into_iter()
        .map(|c| (c.id, c))
        .collect())
}

fn attach_category(event: Event, categories: &HashMap<Uuid, Category>) -> EventView {
    let category = event
        .category_id
        .and_then(|id| categories.get(&id))
        .map(CategorySummary::from);
    EventView { event, category }
}

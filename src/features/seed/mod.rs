//! # Feature: Seed Data
//!
//! Loads users, categories and events from a JSON document at startup so a
//! fresh in-memory store has something to remind about. Records go through
//! the regular services and are validated like any other write.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: true

use crate::core::{NewEvent, NewUser};
use crate::features::accounts::AccountService;
use crate::features::events::EventService;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    #[serde(default)]
    pub events: Vec<SeedEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedEvent {
    pub name: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    /// Name of one of the same user's seeded categories
    pub category: Option<String>,
    #[serde(default)]
    pub reminders: Vec<DateTime<Utc>>,
}

/// Records created by [`apply_seed`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub categories: usize,
    pub events: usize,
}

impl SeedData {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("Invalid seed document")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        Self::from_json(&raw)
    }
}

/// Insert everything in `seed`, stopping at the first rejected record
pub fn apply_seed(
    accounts: &AccountService,
    events: &EventService,
    seed: SeedData,
) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for seed_user in seed.users {
        let user = accounts
            .register(NewUser {
                username: seed_user.username.clone(),
                email: seed_user.email,
                password_hash: seed_user.password_hash,
            })
            .with_context(|| format!("Seed user {}", seed_user.username))?;
        summary.users += 1;

        let mut categories = HashMap::new();
        for seed_category in seed_user.categories {
            let category = events
                .create_category(user.id, &seed_category.name, seed_category.color.as_deref())
                .with_context(|| format!("Seed category {}", seed_category.name))?;
            categories.insert(seed_category.name, category.id);
            summary.categories += 1;
        }

        for seed_event in seed_user.events {
            let category_id = match &seed_event.category {
                Some(name) => Some(*categories.get(name).with_context(|| {
                    format!(
                        "Seed event {} refers to unknown category {name}",
                        seed_event.name
                    )
                })?),
                None => None,
            };
            events
                .create_event(
                    user.id,
                    NewEvent {
                        name: seed_event.name.clone(),
                        description: seed_event.description,
                        date: seed_event.date,
                        category_id,
                        reminders: seed_event.reminders,
                    },
                )
                .with_context(|| format!("Seed event {}", seed_event.name))?;
            summary.events += 1;
        }
    }

    info!(
        "Seeded {} user(s), {} category(ies), {} event(s)",
        summary.users, summary.categories, summary.events
    );
    Ok(summary)
}

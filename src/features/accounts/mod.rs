//! # Feature: Accounts
//!
//! User registration and profile maintenance. Credentials arrive already
//! hashed; token issuance lives outside this crate.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

use crate::core::{EntityKind, NewUser, TrackerError, TrackerResult, User, UserPatch};
use crate::store::EntityStore;
use log::info;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub struct AccountService {
    store: Arc<dyn EntityStore>,
    /// Serializes uniqueness checks with the writes they guard
    write_lock: Mutex<()>,
}

impl AccountService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Register a new user; email and username must both be unused
    pub fn register(&self, user: NewUser) -> TrackerResult<User> {
        let user = NewUser {
            username: user.username.trim().to_string(),
            email: user.email.trim().to_string(),
            password_hash: user.password_hash,
        };
        if user.username.is_empty() || user.email.is_empty() || user.password_hash.is_empty() {
            return Err(TrackerError::Validation(
                "username, email and password are required".to_string(),
            ));
        }

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.ensure_available(None, Some(&user.email), Some(&user.username))?;

        let created = self.store.create_user(user)?;
        info!("Registered user {} ({})", created.username, created.id);
        Ok(created)
    }

    pub fn find_by_id(&self, id: Uuid) -> TrackerResult<User> {
        self.store
            .find_user_by_id(id)?
            .ok_or_else(|| TrackerError::not_found(EntityKind::User, id))
    }

    pub fn find_by_email(&self, email: &str) -> TrackerResult<Option<User>> {
        Ok(self.store.find_user_by_email(email)?)
    }

    pub fn find_by_username(&self, username: &str) -> TrackerResult<Option<User>> {
        Ok(self.store.find_user_by_username(username)?)
    }

    /// Change username, email or credential. The same uniqueness rules as
    /// registration apply, ignoring the user's own record.
    pub fn update_profile(&self, id: Uuid, patch: UserPatch) -> TrackerResult<User> {
        let patch = UserPatch {
            username: patch.username.map(|s| s.trim().to_string()),
            email: patch.email.map(|s| s.trim().to_string()),
            password_hash: patch.password_hash,
        };
        let blank = |field: &Option<String>| field.as_deref().is_some_and(str::is_empty);
        if blank(&patch.username) || blank(&patch.email) || blank(&patch.password_hash) {
            return Err(TrackerError::Validation(
                "username, email and password cannot be empty".to_string(),
            ));
        }

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.ensure_available(Some(id), patch.email.as_deref(), patch.username.as_deref())?;

        self.store
            .update_user(id, patch)?
            .ok_or_else(|| TrackerError::not_found(EntityKind::User, id))
    }

    /// Remove a user along with their categories and events
    pub fn delete_account(&self, id: Uuid) -> TrackerResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.store.delete_user(id)? {
            info!("Deleted user {id}");
            Ok(())
        } else {
            Err(TrackerError::not_found(EntityKind::User, id))
        }
    }

    fn ensure_available(
        &self,
        own_id: Option<Uuid>,
        email: Option<&str>,
        username: Option<&str>,
    ) -> TrackerResult<()> {
        let taken_by_other = |existing: Option<User>| {
            existing.is_some_and(|u| Some(u.id) != own_id)
        };
        if let Some(email) = email {
            if taken_by_other(self.store.find_user_by_email(email)?) {
                return Err(TrackerError::Conflict(format!("email {email} is already registered")));
            }
        }
        if let Some(username) = username {
            if taken_by_other(self.store.find_user_by_username(username)?) {
                return Err(TrackerError::Conflict(format!("username {username} is taken")));
            }
        }
        Ok(())
    }
}

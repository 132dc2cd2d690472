//! Category lifecycle.

use super::service::{required_name, EventService};
use crate::core::{
    Category, CategoryPatch, EntityKind, NewCategory, TrackerError, TrackerResult,
    DEFAULT_CATEGORY_COLOR,
};
use crate::store::DeleteOutcome;
use log::info;
use uuid::Uuid;

impl EventService {
    /// Create a category; a missing or blank color falls back to the default
    pub fn create_category(
        &self,
        user_id: Uuid,
        name: &str,
        color: Option<&str>,
    ) -> TrackerResult<Category> {
        let name = required_name(name)?;
        let color = color
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY_COLOR)
            .to_string();

        let _guard = self.write_guard();
        let category = self.store.create_category(NewCategory {
            name,
            color: Some(color),
            user_id,
        })?;
        info!("Created category {} for user {user_id}", category.id);
        Ok(category)
    }

    pub fn list_categories(&self, user_id: Uuid) -> TrackerResult<Vec<Category>> {
        Ok(self.store.find_categories_by_user(user_id)?)
    }

    /// Rename or recolor one of the caller's categories
    pub fn update_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        patch: CategoryPatch,
    ) -> TrackerResult<Category> {
        let patch = CategoryPatch {
            name: patch.name.as_deref().map(required_name).transpose()?,
            color: patch
                .color
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        };

        let _guard = self.write_guard();
        self.owned_category(user_id, category_id)?;
        self.store
            .update_category(category_id, patch)?
            .ok_or_else(|| TrackerError::not_found(EntityKind::Category, category_id))
    }

    /// Delete one of the caller's categories.
    ///
    /// Returns [`DeleteOutcome::Blocked`] with the number of referencing
    /// events instead of deleting while any remain.
    pub fn delete_category(&self, user_id: Uuid, category_id: Uuid) -> TrackerResult<DeleteOutcome> {
        let _guard = self.write_guard();
        self.owned_category(user_id, category_id)?;

        let outcome = self.store.delete_category(category_id)?;
        match outcome {
            DeleteOutcome::Deleted => info!("Deleted category {category_id}"),
            DeleteOutcome::Blocked { blocking_count } => info!(
                "Refused to delete category {category_id}: used by {blocking_count} event(s)"
            ),
            DeleteOutcome::NotFound => {
                return Err(TrackerError::not_found(EntityKind::Category, category_id))
            }
        }
        Ok(outcome)
    }

    fn owned_category(&self, user_id: Uuid, category_id: Uuid) -> TrackerResult<Category> {
        self.store
            .find_category_by_id(category_id)?
            .filter(|category| category.user_id == user_id)
            .ok_or_else(|| TrackerError::not_found(EntityKind::Category, category_id))
    }
}

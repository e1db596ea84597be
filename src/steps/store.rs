//! Persisted per-recipe step completion

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{parse_steps, StepRecord};
use crate::clock::{rfc3339_millis, SharedClock};
use crate::error::StorageError;
use crate::storage::{recipe_progress_key, Storage, RECIPE_PROGRESS_PREFIX};
use crate::types::{RecipeId, StepId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepProgressRecord {
    pub recipe_id: RecipeId,
    pub recipe_name: String,
    pub completed_steps: Vec<StepId>,
    /// RFC 3339 timestamp of the last write
    pub last_updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_fingerprint: Option<String>,
}

/// The recipe a progress record belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeRef {
    pub id: RecipeId,
    pub name: String,
}

impl RecipeRef {
    pub fn new(id: RecipeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

#[derive(Clone)]
pub struct StepProgressStore {
    storage: Storage,
    clock: SharedClock,
}

impl StepProgressStore {
    pub fn new(storage: Storage, clock: SharedClock) -> Self {
        Self { storage, clock }
    }

    pub fn parse(text: &str) -> Vec<StepRecord> {
        parse_steps(text)
    }

    /// Persisted record for a recipe. Missing and corrupt records read as `None`.
    pub fn record(&self, recipe_id: RecipeId) -> Option<StepProgressRecord> {
        match self
            .storage
            .get_json::<StepProgressRecord>(&recipe_progress_key(recipe_id))
        {
            Ok(record) => record,
            Err(e) => {
                warn!(recipe_id, error = %e, "Ignoring unreadable step progress");
                None
            }
        }
    }

    /// Completed step ids for a recipe, empty when nothing usable is stored
    pub fn load(&self, recipe_id: RecipeId) -> BTreeSet<StepId> {
        self.record(recipe_id)
            .map(|r| r.completed_steps.into_iter().collect())
            .unwrap_or_default()
    }

    /// Flip one step's completion and persist the result
    pub fn toggle(
        &self,
        recipe: &RecipeRef,
        step_id: StepId,
    ) -> Result<BTreeSet<StepId>, StorageError> {
        let existing = self.record(recipe.id);
        let fingerprint = existing.as_ref().and_then(|r| r.text_fingerprint.clone());
        let mut completed: BTreeSet<StepId> = existing
            .map(|r| r.completed_steps.into_iter().collect())
            .unwrap_or_default();

        if !completed.remove(&step_id) {
            completed.insert(step_id);
        }
        self.save(recipe, &completed, fingerprint)?;
        Ok(completed)
    }

    /// Overwrite the record with a fresh `lastUpdated`
    pub fn save(
        &self,
        recipe: &RecipeRef,
        completed: &BTreeSet<StepId>,
        text_fingerprint: Option<String>,
    ) -> Result<(), StorageError> {
        let record = StepProgressRecord {
            recipe_id: recipe.id,
            recipe_name: recipe.name.clone(),
            completed_steps: completed.iter().copied().collect(),
            last_updated: rfc3339_millis(self.clock.now_millis()),
            text_fingerprint,
        };
        self.storage
            .set_json(&recipe_progress_key(recipe.id), &record)?;
        debug!(
            recipe_id = recipe.id,
            completed = completed.len(),
            "Saved step progress"
        );
        Ok(())
    }

    /// Remove the persisted record. Returns whether one existed.
    pub fn reset(&self, recipe_id: RecipeId) -> Result<bool, StorageError> {
        let removed = self.storage.remove(&recipe_progress_key(recipe_id))?;
        debug!(recipe_id, removed, "Reset step progress");
        Ok(removed)
    }

    /// Recipe ids that currently have a progress record
    pub fn tracked_recipes(&self) -> Result<Vec<RecipeId>, StorageError> {
        let mut ids: Vec<RecipeId> = self
            .storage
            .keys_with_prefix(RECIPE_PROGRESS_PREFIX)?
            .iter()
            .filter_map(|key| key[RECIPE_PROGRESS_PREFIX.len()..].parse().ok())
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

//! In-memory view of one recipe's steps backed by [`StepProgressStore`]

use std::collections::BTreeSet;

use tracing::warn;

use super::store::{RecipeRef, StepProgressStore};
use super::{fingerprint, merge, parse_steps, StepRecord};
use crate::types::StepId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSummary {
    pub completed: usize,
    pub total: usize,
    /// Rounded to the nearest whole percent
    pub percent: u32,
    pub is_complete: bool,
}

pub struct RecipeSteps {
    store: StepProgressStore,
    recipe: RecipeRef,
    steps: Vec<StepRecord>,
    completed: BTreeSet<StepId>,
    fingerprint: String,
    stale: bool,
}

impl RecipeSteps {
    /// Parse `text` and merge in whatever progress was saved for `recipe`
    pub fn open(store: &StepProgressStore, recipe: RecipeRef, text: &str) -> Self {
        let parsed = parse_steps(text);
        let fingerprint = fingerprint(&parsed);
        let record = store.record(recipe.id);

        let stale = match record.as_ref().and_then(|r| r.text_fingerprint.as_deref()) {
            Some(saved) if saved != fingerprint => {
                warn!(
                    recipe_id = recipe.id,
                    "Recipe text changed since progress was saved; step marks may be misaligned"
                );
                true
            }
            _ => false,
        };
        let completed: BTreeSet<StepId> = record
            .map(|r| r.completed_steps.into_iter().collect())
            .unwrap_or_default();

        Self {
            store: store.clone(),
            steps: merge(parsed, &completed),
            recipe,
            completed,
            fingerprint,
            stale,
        }
    }

    pub fn recipe(&self) -> &RecipeRef {
        &self.recipe
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn completed_ids(&self) -> &BTreeSet<StepId> {
        &self.completed
    }

    /// Whether the saved progress was recorded against different recipe text
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Flip one step. Ids outside the parsed steps are ignored and return `false`.
    pub fn toggle(&mut self, step_id: StepId) -> bool {
        let Some(step) = self.steps.iter_mut().find(|s| s.id == step_id) else {
            return false;
        };
        step.completed = !step.completed;
        if step.completed {
            self.completed.insert(step_id);
        } else {
            self.completed.remove(&step_id);
        }

        if let Err(e) = self
            .store
            .save(&self.recipe, &self.completed, Some(self.fingerprint.clone()))
        {
            warn!(recipe_id = self.recipe.id, error = %e, "Failed to save step progress");
        }
        true
    }

    /// Clear every mark and drop the persisted record
    pub fn reset(&mut self) {
        self.completed.clear();
        for step in &mut self.steps {
            step.completed = false;
        }
        self.stale = false;
        if let Err(e) = self.store.reset(self.recipe.id) {
            warn!(recipe_id = self.recipe.id, error = %e, "Failed to reset step progress");
        }
    }

    pub fn summary(&self) -> ProgressSummary {
        let total = self.steps.len();
        let completed = self.steps.iter().filter(|s| s.completed).count();
        let percent = if total == 0 {
            0
        } else {
            ((completed as f64 / total as f64) * 100.0).round() as u32
        };
        ProgressSummary {
            completed,
            total,
            percent,
            is_complete: total > 0 && completed == total,
        }
    }
}

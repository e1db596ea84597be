//! Recipe step parsing and progress tracking.
//!
//! Step ids are positional: the n-th non-blank line of the recipe text is
//! step n. Persisted progress is merged back by id alone, so editing the
//! recipe text can shift completion marks onto different lines. The stored
//! text fingerprint lets callers notice when that may have happened.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::StepId;

pub mod store;
pub mod tracker;

pub use store::{RecipeRef, StepProgressRecord, StepProgressStore};
pub use tracker::{ProgressSummary, RecipeSteps};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: StepId,
    pub text: String,
    pub completed: bool,
}

/// Split recipe text into steps, one per non-blank line, ids from 1
pub fn parse_steps(text: &str) -> Vec<StepRecord> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, line)| StepRecord {
            id: index as StepId + 1,
            text: line.to_string(),
            completed: false,
        })
        .collect()
}

/// Mark steps whose id appears in `completed`
pub fn merge(mut steps: Vec<StepRecord>, completed: &BTreeSet<StepId>) -> Vec<StepRecord> {
    for step in &mut steps {
        step.completed = completed.contains(&step.id);
    }
    steps
}

/// Hex blake3 digest of the normalized step texts
pub fn fingerprint(steps: &[StepRecord]) -> String {
    let mut hasher = blake3::Hasher::new();
    for (i, step) in steps.iter().enumerate() {
        if i > 0 {
            hasher.update(b"\n");
        }
        hasher.update(step.text.as_bytes());
    }
    hex::encode(hasher.finalize().as_bytes())
}

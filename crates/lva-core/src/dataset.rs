//! JSON dataset loading for the CLI.
//!
//! A dataset is a JSON array of training examples:
//! `[{"user_id": 1, "history": [..], "outcome": {"action_count": 3, "duration": 86400.0}}]`.

use crate::logging::event_names;
use lva_common::{Result, TrainingExample, UserHistory};
use std::fs;
use std::path::Path;
use tracing::info;

/// Examples kept after filtering, plus how many were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub examples: Vec<TrainingExample>,
    pub dropped: usize,
}

/// Parse a dataset from a JSON string, dropping users with fewer than
/// `min_actions` timestamps.
pub fn parse_dataset(json: &str, min_actions: usize) -> Result<Dataset> {
    let all: Vec<TrainingExample> = serde_json::from_str(json)?;
    let total = all.len();
    let examples: Vec<TrainingExample> = all
        .into_iter()
        .filter(|ex| ex.history.len() >= min_actions)
        .collect();
    let dropped = total - examples.len();
    info!(
        event = event_names::DATA_FILTERED,
        kept = examples.len(),
        dropped,
        min_actions,
        "short histories filtered"
    );
    Ok(Dataset { examples, dropped })
}

pub fn load_dataset(path: &Path, min_actions: usize) -> Result<Dataset> {
    let content = fs::read_to_string(path)?;
    let dataset = parse_dataset(&content, min_actions)?;
    info!(
        event = event_names::DATA_LOADED,
        path = %path.display(),
        examples = dataset.examples.len(),
        "dataset loaded"
    );
    Ok(dataset)
}

/// A single prediction query: `{"user_id": 1, "history": [..]}`.
pub fn load_query(path: &Path) -> Result<UserHistory> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

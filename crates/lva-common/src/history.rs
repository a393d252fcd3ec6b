//! Action histories, derived interval sequences, and training examples.
//!
//! Timestamps are seconds stored as `f64`. Histories are owned by the caller
//! and never mutated by the learners; interval sequences are derived values
//! recomputed whenever a history changes.

use crate::error::{Error, Result};
use crate::id::UserId;
use serde::{Deserialize, Serialize};

/// Raw event timestamps for one user, in arrival order (not necessarily sorted).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionHistory(Vec<f64>);

impl ActionHistory {
    pub fn new(timestamps: Vec<f64>) -> Self {
        ActionHistory(timestamps)
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Timestamps sorted ascending (total order, so NaN sorts last).
    pub fn sorted(&self) -> Vec<f64> {
        let mut ts = self.0.clone();
        ts.sort_by(|a, b| a.total_cmp(b));
        ts
    }
}

impl From<Vec<f64>> for ActionHistory {
    fn from(timestamps: Vec<f64>) -> Self {
        ActionHistory(timestamps)
    }
}

/// Non-negative gaps between consecutive sorted timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntervalSequence(Vec<f64>);

impl IntervalSequence {
    /// Wrap already-computed gaps, rejecting negative or non-finite values.
    pub fn new(gaps: Vec<f64>) -> Result<Self> {
        if let Some(bad) = gaps.iter().find(|g| !g.is_finite() || **g < 0.0) {
            return Err(Error::InvalidArgument(format!(
                "interval gaps must be finite and non-negative, got {}",
                bad
            )));
        }
        Ok(IntervalSequence(gaps))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

/// Held-out outcome: how many actions happened over how many seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub action_count: u64,
    /// Window length in seconds.
    pub duration: f64,
}

impl Outcome {
    pub fn new(action_count: u64, duration: f64) -> Self {
        Self {
            action_count,
            duration,
        }
    }

    /// Actions per second over the window.
    ///
    /// An empty window with no actions has rate 0. Actions over a
    /// non-positive window are rejected.
    pub fn activity_rate(&self) -> Result<f64> {
        if !self.duration.is_finite() {
            return Err(Error::InvalidTrainingSet(format!(
                "outcome duration must be finite, got {}",
                self.duration
            )));
        }
        if self.duration <= 0.0 {
            if self.action_count == 0 {
                return Ok(0.0);
            }
            return Err(Error::InvalidTrainingSet(format!(
                "{} actions over non-positive duration {}",
                self.action_count, self.duration
            )));
        }
        Ok(self.action_count as f64 / self.duration)
    }
}

/// A prediction query: who, and what they did so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserHistory {
    pub user_id: UserId,
    pub history: ActionHistory,
}

impl UserHistory {
    pub fn new(user_id: impl Into<UserId>, history: impl Into<ActionHistory>) -> Self {
        Self {
            user_id: user_id.into(),
            history: history.into(),
        }
    }
}

/// One training row: a user's history plus what they did afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub user_id: UserId,
    pub history: ActionHistory,
    pub outcome: Outcome,
}

impl TrainingExample {
    pub fn new(user_id: impl Into<UserId>, history: impl Into<ActionHistory>, outcome: Outcome) -> Self {
        Self {
            user_id: user_id.into(),
            history: history.into(),
            outcome,
        }
    }

    /// The query view of this example (history without the outcome).
    pub fn query(&self) -> UserHistory {
        UserHistory {
            user_id: self.user_id,
            history: self.history.clone(),
        }
    }
}

//! Fixed-length numeric summaries of an action history.
//!
//! Used by the linear rate learner. The layout is stable:
//! `[count, first, last, span, ts_mean, ts_variance, interval_mean, interval_variance]`.

use crate::interval::intervals_from_timestamps;
use lva_common::{ActionHistory, Result};
use lva_math::{mean, variance};

/// Number of features produced per history.
pub const FEATURE_COUNT: usize = 8;

/// Feature names in vector order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "count",
    "first",
    "last",
    "span",
    "ts_mean",
    "ts_variance",
    "interval_mean",
    "interval_variance",
];

/// Summarize a history. Requires at least two timestamps.
pub fn vectorize(history: &ActionHistory) -> Result<[f64; FEATURE_COUNT]> {
    let gaps = intervals_from_timestamps(history.timestamps())?;
    let sorted = history.sorted();

    // intervals_from_timestamps guarantees len >= 2
    let first = sorted[0];
    let last = sorted[sorted.len() - 1];

    Ok([
        sorted.len() as f64,
        first,
        last,
        last - first,
        mean(&sorted),
        variance(&sorted),
        mean(gaps.as_slice()),
        variance(gaps.as_slice()),
    ])
}

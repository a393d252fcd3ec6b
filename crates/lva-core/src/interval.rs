//! Timestamps to inter-event gaps.

use lva_common::{ActionHistory, Error, IntervalSequence, Result};

/// Minimum timestamps needed to derive one interval.
pub const MIN_TIMESTAMPS: usize = 2;

/// Sort the timestamps and return successive differences.
///
/// Duplicates yield zero-length gaps. The output has `len - 1` entries.
pub fn intervals_from_timestamps(timestamps: &[f64]) -> Result<IntervalSequence> {
    if timestamps.len() < MIN_TIMESTAMPS {
        return Err(Error::InsufficientHistory {
            required: MIN_TIMESTAMPS,
            actual: timestamps.len(),
        });
    }
    if let Some(bad) = timestamps.iter().find(|t| !t.is_finite()) {
        return Err(Error::InvalidArgument(format!(
            "timestamps must be finite, got {}",
            bad
        )));
    }

    let mut sorted = timestamps.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let gaps = sorted.windows(2).map(|w| w[1] - w[0]).collect();
    IntervalSequence::new(gaps)
}

/// Interval sequence of a user's history.
pub fn intervals(history: &ActionHistory) -> Result<IntervalSequence> {
    intervals_from_timestamps(history.timestamps())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsorted_input_is_sorted_first() {
        let seq = intervals_from_timestamps(&[30.0, 10.0, 15.0]).unwrap();
        assert_eq!(seq.as_slice(), &[5.0, 15.0]);
    }

    #[test]
    fn duplicates_give_zero_gaps() {
        let seq = intervals_from_timestamps(&[5.0, 5.0, 5.0]).unwrap();
        assert_eq!(seq.as_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn too_short_history() {
        let err = intervals_from_timestamps(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientHistory {
                required: 2,
                actual: 1
            }
        ));
        assert!(intervals_from_timestamps(&[]).is_err());
    }

    #[test]
    fn non_finite_timestamp_rejected() {
        let err = intervals_from_timestamps(&[1.0, f64::NAN]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn history_does_not_change() {
        let history = ActionHistory::new(vec![3.0, 1.0, 2.0]);
        let seq = intervals(&history).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(history.timestamps(), &[3.0, 1.0, 2.0]);
    }
}

//! User and cluster identity types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// User ID wrapper with display formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        UserId(id)
    }
}

/// Behavioral cluster index.
///
/// Clusters are numbered in ascending order of their centroid activity rate,
/// so `ClusterId(0)` is always the least active group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(pub usize);

impl ClusterId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cluster-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_serde_transparent() {
        let json = serde_json::to_string(&UserId(1_488_844)).unwrap();
        assert_eq!(json, "1488844");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, UserId(1_488_844));
    }

    #[test]
    fn cluster_id_display_and_order() {
        assert_eq!(ClusterId(1).to_string(), "cluster-1");
        assert!(ClusterId(0) < ClusterId(1));
        assert_eq!(ClusterId(3).index(), 3);
    }
}

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named counts observed on one run, e.g. `total`, `men`, `women`,
/// `visible_products`.
///
/// Keys depend on which extraction strategies matched, so there is no fixed
/// schema. A `BTreeMap` keeps serialization order stable between runs.
pub type SignalMap = BTreeMap<String, u64>;

/// Change in a single signal between two runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalChange {
    pub old: u64,
    pub new: u64,
    /// `new - old`.
    pub diff: i64,
}

impl SignalChange {
    #[must_use]
    pub fn new(old: u64, new: u64) -> Self {
        let diff = i128::from(new) - i128::from(old);
        Self {
            old,
            new,
            diff: i64::try_from(diff).unwrap_or(if diff > 0 { i64::MAX } else { i64::MIN }),
        }
    }
}

/// Changed signals only, keyed by signal name.
pub type Delta = BTreeMap<String, SignalChange>;

/// The persisted counts record: the last observed [`SignalMap`] and when it
/// was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountsState {
    pub counts: SignalMap,
    pub timestamp: DateTime<Utc>,
}

impl CountsState {
    #[must_use]
    pub fn new(counts: SignalMap, timestamp: DateTime<Utc>) -> Self {
        Self { counts, timestamp }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_change_diff_is_signed() {
        assert_eq!(SignalChange::new(100, 105).diff, 5);
        assert_eq!(SignalChange::new(40, 0).diff, -40);
    }

    #[test]
    fn counts_state_serializes_with_counts_and_timestamp_keys() {
        let mut counts = SignalMap::new();
        counts.insert("total".to_string(), 2914);
        let ts = DateTime::parse_from_rfc3339("2025-01-15T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let value = serde_json::to_value(CountsState::new(counts, ts)).unwrap();
        assert_eq!(value["counts"]["total"], 2914);
        assert_eq!(value["timestamp"], "2025-01-15T10:00:00Z");
    }

    #[test]
    fn counts_state_reads_fractional_second_timestamps() {
        let raw = r#"{"counts": {"men": 7, "women": 2914}, "timestamp": "2025-01-15T10:00:00.123456Z"}"#;
        let state: CountsState = serde_json::from_str(raw).unwrap();
        assert_eq!(state.counts["women"], 2914);
        assert_eq!(state.counts["men"], 7);
    }
}

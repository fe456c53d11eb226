//! Distribution snapshots
//!
//! Every revenue distribution appends one immutable snapshot keyed by the
//! scheduled distribution time it represents. Stakers are credited lazily:
//! the sync engine replays snapshots in time order and pays each wallet its
//! pro-rata slice of the earning bucket, using the earning supply recorded
//! at distribution time as the denominator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Audit record of one revenue distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionSnapshot {
    /// Scheduled distribution time this snapshot represents; primary key.
    pub timestamp: u64,

    /// Revenue earmarked to earning-share holders for this period.
    pub earning_bucket: i64,

    /// Revenue folded into the auto-compounding backing.
    pub autocompounding_bucket: i64,

    /// Revenue paid to the treasury.
    pub treasury_bucket: i64,

    /// Revenue accrued to the ecosystem fund.
    pub ecosystem_bucket: i64,

    /// Total revenue this distribution split up.
    pub total_distributed: i64,

    /// Earning supply outstanding at distribution time; the pro-rata
    /// denominator for sync.
    pub total_earning_supply: i64,
}

impl DistributionSnapshot {
    /// A snapshot recording that nothing was distributed for this period.
    pub fn zero(timestamp: u64, total_earning_supply: i64) -> Self {
        Self {
            timestamp,
            earning_bucket: 0,
            autocompounding_bucket: 0,
            treasury_bucket: 0,
            ecosystem_bucket: 0,
            total_distributed: 0,
            total_earning_supply,
        }
    }
}

/// Append-only, time-ordered snapshot store.
#[derive(Debug, Default, Clone)]
pub struct SnapshotStore {
    snapshots: BTreeMap<u64, DistributionSnapshot>,
}

impl SnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot. Existing snapshots are immutable; appending a
    /// duplicate timestamp is a bug and is ignored.
    pub fn append(&mut self, snapshot: DistributionSnapshot) {
        debug_assert!(!self.snapshots.contains_key(&snapshot.timestamp));
        self.snapshots.entry(snapshot.timestamp).or_insert(snapshot);
    }

    /// Look up a snapshot by timestamp.
    pub fn get(&self, timestamp: u64) -> Option<&DistributionSnapshot> {
        self.snapshots.get(&timestamp)
    }

    /// Snapshots with timestamp at or after `from`, ascending.
    pub fn range_from(&self, from: u64) -> impl Iterator<Item = &DistributionSnapshot> {
        self.snapshots.range(from..).map(|(_, s)| s)
    }

    /// Number of snapshots recorded.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether no snapshot has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_from() {
        let mut store = SnapshotStore::new();
        store.append(DistributionSnapshot::zero(100, 0));
        store.append(DistributionSnapshot::zero(200, 0));
        store.append(DistributionSnapshot::zero(300, 0));

        let seen: Vec<u64> = store.range_from(200).map(|s| s.timestamp).collect();
        assert_eq!(seen, vec![200, 300]);

        let all: Vec<u64> = store.range_from(0).map(|s| s.timestamp).collect();
        assert_eq!(all, vec![100, 200, 300]);
    }

    #[test]
    fn test_zero_snapshot() {
        let snap = DistributionSnapshot::zero(50, 777);
        assert_eq!(snap.total_distributed, 0);
        assert_eq!(snap.earning_bucket, 0);
        assert_eq!(snap.total_earning_supply, 777);
    }
}

//! Redemption requests
//!
//! A queued withdrawal lives as one request per `(wallet, epoch)` pair,
//! recording the amount promised out of that epoch's bucket. Requests are
//! deleted when claimed, when their window expires, or when a new request
//! from the same wallet supersedes them.

use crate::types::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A live claim against one epoch's redemption bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionRequest {
    /// Requesting wallet.
    pub wallet: AccountId,

    /// Start time of the epoch the request draws from.
    pub epoch_start: u64,

    /// Base asset promised to this request.
    pub amount: i64,

    /// Receipt identifying this request.
    pub receipt_id: [u8; 32],
}

impl RedemptionRequest {
    /// Create a request with a derived receipt id.
    pub fn new(wallet: AccountId, epoch_start: u64, amount: i64, now: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(wallet.as_str().as_bytes());
        hasher.update(&epoch_start.to_le_bytes());
        hasher.update(&amount.to_le_bytes());
        hasher.update(&now.to_le_bytes());

        let mut receipt_id = [0u8; 32];
        hasher.finalize_xof().fill(&mut receipt_id);

        Self {
            wallet,
            epoch_start,
            amount,
            receipt_id,
        }
    }
}

/// Repository of redemption requests, scoped per wallet and ordered by
/// epoch start time within each wallet.
#[derive(Debug, Default, Clone)]
pub struct RequestStore {
    by_wallet: HashMap<AccountId, BTreeMap<u64, RedemptionRequest>>,
}

impl RequestStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a wallet's request against one epoch.
    pub fn get(&self, wallet: &AccountId, epoch_start: u64) -> Option<&RedemptionRequest> {
        self.by_wallet.get(wallet)?.get(&epoch_start)
    }

    /// Insert a request, replacing any previous one for the same key.
    pub fn insert(&mut self, request: RedemptionRequest) {
        self.by_wallet
            .entry(request.wallet.clone())
            .or_default()
            .insert(request.epoch_start, request);
    }

    /// Remove and return a wallet's request against one epoch.
    pub fn remove(&mut self, wallet: &AccountId, epoch_start: u64) -> Option<RedemptionRequest> {
        self.by_wallet.get_mut(wallet)?.remove(&epoch_start)
    }

    /// A wallet's requests in ascending epoch order.
    pub fn for_wallet(&self, wallet: &AccountId) -> Vec<&RedemptionRequest> {
        self.by_wallet
            .get(wallet)
            .map(|reqs| reqs.values().collect())
            .unwrap_or_default()
    }

    /// Total amount a wallet has queued across all epochs.
    pub fn total_for_wallet(&self, wallet: &AccountId) -> i64 {
        self.by_wallet
            .get(wallet)
            .map(|reqs| reqs.values().map(|r| r.amount).sum())
            .unwrap_or(0)
    }

    /// The wallet's request with the newest epoch start, if any.
    pub fn newest_for_wallet(&self, wallet: &AccountId) -> Option<&RedemptionRequest> {
        self.by_wallet.get(wallet)?.values().next_back()
    }

    /// Delete the wallet's requests whose epoch start is older than
    /// `bound`; their windows already closed. Returns how many were purged.
    pub fn purge_older_than(&mut self, wallet: &AccountId, bound: u64) -> usize {
        let Some(reqs) = self.by_wallet.get_mut(wallet) else {
            return 0;
        };

        let before = reqs.len();
        reqs.retain(|epoch_start, _| *epoch_start >= bound);
        before - reqs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet() -> AccountId {
        AccountId::new("alice")
    }

    #[test]
    fn test_insert_and_total() {
        let mut store = RequestStore::new();
        store.insert(RedemptionRequest::new(wallet(), 100, 30, 1));
        store.insert(RedemptionRequest::new(wallet(), 200, 20, 1));

        assert_eq!(store.total_for_wallet(&wallet()), 50);
        assert_eq!(store.get(&wallet(), 100).unwrap().amount, 30);
        assert_eq!(store.newest_for_wallet(&wallet()).unwrap().epoch_start, 200);
    }

    #[test]
    fn test_purge_older_than() {
        let mut store = RequestStore::new();
        store.insert(RedemptionRequest::new(wallet(), 100, 10, 1));
        store.insert(RedemptionRequest::new(wallet(), 200, 10, 1));
        store.insert(RedemptionRequest::new(wallet(), 300, 10, 1));

        let purged = store.purge_older_than(&wallet(), 200);
        assert_eq!(purged, 1);
        assert!(store.get(&wallet(), 100).is_none());
        assert!(store.get(&wallet(), 200).is_some());
    }

    #[test]
    fn test_receipts_differ() {
        let a = RedemptionRequest::new(wallet(), 100, 30, 1);
        let b = RedemptionRequest::new(wallet(), 100, 30, 2);
        assert_ne!(a.receipt_id, b.receipt_id);
    }
}

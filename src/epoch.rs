//! Rental epochs
//!
//! Deposits rotate through fixed-length, overlapping rental epochs. Each
//! epoch delegates a bucket of base asset to one operator, asks for it back
//! three days before the rental length elapses, and then opens a redemption
//! window for queued withdrawals.

use crate::config::ProtocolConfig;
use crate::error::{Error, Result};
use crate::types::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::info;

const SECONDS_PER_DAY: u64 = 24 * 3600;

/// How long before an epoch's nominal end the operator is asked to return
/// its funds.
pub const UNSTAKE_LEAD_SECONDS: u64 = 3 * SECONDS_PER_DAY;

/// Lifecycle phase of an epoch, derived from its timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochStatus {
    /// Created, before its start time.
    Pending,
    /// Funds delegated and earning.
    Active,
    /// Past the unstake deadline; the operator owes a return.
    UnstakeDue,
    /// Inside the redemption window.
    Redeeming,
    /// Window closed; record retained for audit only.
    Closed,
}

/// One rental epoch, keyed by its start time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Epoch {
    /// Start time; primary key.
    pub start_time: u64,

    /// Time after which the operator is asked to return funds.
    pub unstake_deadline: u64,

    /// Operator this epoch's bucket is delegated to.
    pub operator: AccountId,

    /// Base asset delegated to the operator for this epoch.
    pub funds_bucket: i64,

    /// Amount already promised to redemption requests from this epoch.
    /// Never exceeds `funds_bucket`.
    pub refund_committed: i64,

    /// When the redemption window opens.
    pub redemption_window_start: u64,

    /// When the redemption window closes.
    pub redemption_window_end: u64,

    /// Cumulative funds returned by the operator.
    pub total_returned: i64,

    /// Portion of returned funds routed to the redemption reserve rather
    /// than recycled. Never exceeds `refund_committed`.
    pub total_returned_to_redemption: i64,
}

impl Epoch {
    /// Create an epoch with zero buckets and derived timestamps.
    pub fn new(start_time: u64, operator: AccountId, config: &ProtocolConfig) -> Self {
        let rental_end = start_time + config.rental_epoch_length_seconds;

        Self {
            start_time,
            unstake_deadline: rental_end - UNSTAKE_LEAD_SECONDS,
            operator,
            funds_bucket: 0,
            refund_committed: 0,
            redemption_window_start: rental_end,
            redemption_window_end: rental_end + config.redemption_period_length_seconds,
            total_returned: 0,
            total_returned_to_redemption: 0,
        }
    }

    /// Lifecycle phase at the given time.
    pub fn status(&self, now: u64) -> EpochStatus {
        if now < self.start_time {
            EpochStatus::Pending
        } else if now < self.unstake_deadline {
            EpochStatus::Active
        } else if now < self.redemption_window_start {
            EpochStatus::UnstakeDue
        } else if now < self.redemption_window_end {
            EpochStatus::Redeeming
        } else {
            EpochStatus::Closed
        }
    }

    /// Bucket capacity not yet promised to redemption requests.
    pub fn available_for_redemption(&self) -> i64 {
        self.funds_bucket - self.refund_committed
    }
}

/// Repository of epochs with an operator index.
///
/// The index replaces a backward scan over start times when matching an
/// operator's returned funds to the epoch they belong to.
#[derive(Debug, Default, Clone)]
pub struct EpochStore {
    epochs: BTreeMap<u64, Epoch>,
    by_operator: HashMap<AccountId, BTreeSet<u64>>,
}

impl EpochStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an epoch by start time.
    pub fn get(&self, start_time: u64) -> Option<&Epoch> {
        self.epochs.get(&start_time)
    }

    /// Look up an epoch for mutation.
    pub fn get_mut(&mut self, start_time: u64) -> Option<&mut Epoch> {
        self.epochs.get_mut(&start_time)
    }

    /// Look up an epoch, failing with [`Error::NoSuchEpoch`] when absent.
    pub fn require(&self, start_time: u64) -> Result<&Epoch> {
        self.epochs
            .get(&start_time)
            .ok_or(Error::NoSuchEpoch(start_time))
    }

    /// Get the epoch at `start_time`, creating it with zero buckets and the
    /// given operator if it does not exist.
    pub fn ensure(
        &mut self,
        start_time: u64,
        operator: &AccountId,
        config: &ProtocolConfig,
    ) -> &mut Epoch {
        if !self.epochs.contains_key(&start_time) {
            info!(
                "created epoch {} with operator {}",
                start_time, operator
            );
            self.by_operator
                .entry(operator.clone())
                .or_default()
                .insert(start_time);
            self.epochs
                .insert(start_time, Epoch::new(start_time, operator.clone(), config));
        }

        self.epochs
            .get_mut(&start_time)
            .expect("epoch inserted above")
    }

    /// The operator's newest epoch starting at or before `bound`.
    pub fn latest_for_operator_at_or_before(
        &self,
        operator: &AccountId,
        bound: u64,
    ) -> Option<u64> {
        self.by_operator
            .get(operator)?
            .range(..=bound)
            .next_back()
            .copied()
    }

    /// Number of epoch records.
    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    /// Whether the store has no epochs.
    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// Iterate epochs in start-time order.
    pub fn iter(&self) -> impl Iterator<Item = &Epoch> {
        self.epochs.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProtocolConfig {
        ProtocolConfig::default()
    }

    #[test]
    fn test_derived_timestamps() {
        let c = config();
        let start = c.initial_epoch_start_time;
        let epoch = Epoch::new(start, AccountId::new("rental.one"), &c);

        let rental_end = start + c.rental_epoch_length_seconds;
        assert_eq!(epoch.unstake_deadline, rental_end - UNSTAKE_LEAD_SECONDS);
        assert_eq!(epoch.redemption_window_start, rental_end);
        assert_eq!(
            epoch.redemption_window_end,
            rental_end + c.redemption_period_length_seconds
        );
    }

    #[test]
    fn test_status_transitions() {
        let c = config();
        let start = c.initial_epoch_start_time;
        let epoch = Epoch::new(start, AccountId::new("rental.one"), &c);

        assert_eq!(epoch.status(start - 1), EpochStatus::Pending);
        assert_eq!(epoch.status(start), EpochStatus::Active);
        assert_eq!(epoch.status(epoch.unstake_deadline), EpochStatus::UnstakeDue);
        assert_eq!(
            epoch.status(epoch.redemption_window_start),
            EpochStatus::Redeeming
        );
        assert_eq!(epoch.status(epoch.redemption_window_end), EpochStatus::Closed);
    }

    #[test]
    fn test_operator_index() {
        let c = config();
        let mut store = EpochStore::new();
        let op_a = AccountId::new("rental.one");
        let op_b = AccountId::new("rental.two");

        store.ensure(100, &op_a, &c);
        store.ensure(200, &op_b, &c);
        store.ensure(300, &op_a, &c);

        assert_eq!(store.latest_for_operator_at_or_before(&op_a, 300), Some(300));
        assert_eq!(store.latest_for_operator_at_or_before(&op_a, 299), Some(100));
        assert_eq!(store.latest_for_operator_at_or_before(&op_b, 150), None);
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let c = config();
        let mut store = EpochStore::new();
        let op = AccountId::new("rental.one");

        store.ensure(100, &op, &c).funds_bucket = 55;
        let again = store.ensure(100, &op, &c);
        assert_eq!(again.funds_bucket, 55);
        assert_eq!(store.len(), 1);
    }
}

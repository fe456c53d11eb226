//! Global ledger state
//!
//! One `LedgerState` exists per deployment. It is a pure data holder; all
//! mutation happens inside engine operations, through checked arithmetic,
//! committed together with the per-entity records the operation touches.

use crate::config::ProtocolConfig;
use crate::types::AccountId;
use serde::{Deserialize, Serialize};

/// Aggregate protocol balances and scheduling cursors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerState {
    /// Earning-share units currently accruing rewards (equals the sum of
    /// all staker balances at every quiescent point).
    pub earning_balance: i64,

    /// Earning-share units backing the outstanding auto-compounding supply.
    pub backing_balance: i64,

    /// Outstanding auto-compounding share units.
    pub autocompounding_supply: i64,

    /// Collected revenue awaiting the next distribution.
    pub revenue_pending: i64,

    /// Revenue already earmarked to stakers but not yet individually
    /// credited through sync.
    pub user_funds_bucket: i64,

    /// Monotonic counter of all revenue ever distributed.
    pub total_revenue_distributed: i64,

    /// Unix time of the next scheduled distribution.
    pub next_distribution_time: u64,

    /// Base asset reserved for queued redemption claims.
    pub funds_for_redemption: i64,

    /// Start time of the most recently started epoch.
    pub last_epoch_start_time: u64,

    /// Uncommitted base asset available for rental delegation.
    pub funds_available_for_rental: i64,

    /// Price, in smallest base units, to rent one whole unit for an epoch.
    pub unit_rental_price: i64,

    /// Operator assigned to the most recently started epoch.
    pub current_rental_operator: AccountId,

    /// Unix time of the next scheduled idle-funds sweep.
    pub next_sweep_time: u64,
}

impl LedgerState {
    /// Fresh state for a new deployment.
    pub fn new(config: &ProtocolConfig, now: u64) -> Self {
        Self {
            earning_balance: 0,
            backing_balance: 0,
            autocompounding_supply: 0,
            revenue_pending: 0,
            user_funds_bucket: 0,
            total_revenue_distributed: 0,
            next_distribution_time: now,
            funds_for_redemption: 0,
            last_epoch_start_time: config.initial_epoch_start_time,
            funds_available_for_rental: 0,
            unit_rental_price: 1_000_000,
            current_rental_operator: config
                .rental_operators
                .first()
                .cloned()
                .unwrap_or_else(|| config.fallback_receiver.clone()),
            next_sweep_time: config.initial_epoch_start_time + config.seconds_between_sweeps,
        }
    }
}

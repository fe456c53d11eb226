//! Protocol configuration
//!
//! Write-rarely settings controlled through the admin operations on the
//! engine. The `Default` carries the launch parameters: 14-day rental
//! epochs starting every 7 days, daily distributions and sweeps, a 2-day
//! redemption window, and an 85/10 user/treasury revenue split with the
//! remainder going to the ecosystem fund.

use crate::error::{Error, Result};
use crate::types::{AccountId, ASSET_SCALE};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: u64 = 24 * 3600;

/// Launch timestamp of the first rental epoch.
pub const INITIAL_EPOCH_START_TIME: u64 = 1_710_460_800;

/// An ecosystem-fund beneficiary and its fraction of the ecosystem share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueReceiver {
    /// Beneficiary account.
    pub account: AccountId,
    /// Fraction of the ecosystem share (0.0 to 1.0).
    pub share: f64,
}

/// Protocol configuration singleton.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Minimum base-asset deposit with the `stake` memo (smallest units).
    pub minimum_stake_amount: i64,

    /// Minimum auto-compounding deposit with the `unliquify` memo.
    pub minimum_unliquify_amount: i64,

    /// Seconds between revenue distributions.
    pub seconds_between_distributions: u64,

    /// Maximum snapshots replayed per sync call.
    pub max_snapshots_to_process: u64,

    /// Start time of the very first epoch.
    pub initial_epoch_start_time: u64,

    /// Length of one rental epoch in seconds.
    pub rental_epoch_length_seconds: u64,

    /// Seconds between epoch starts; epochs overlap, so this is half the
    /// rental length.
    pub seconds_between_epochs: u64,

    /// How long the redemption window stays open after an epoch's rental
    /// length elapses.
    pub redemption_period_length_seconds: u64,

    /// Seconds between idle-funds sweeps.
    pub seconds_between_sweeps: u64,

    /// Fraction of distributed revenue earmarked for stakers.
    pub user_share: f64,

    /// Fraction of distributed revenue paid to the treasury.
    pub treasury_share: f64,

    /// Treasury account that receives its share at distribution time.
    pub treasury_account: AccountId,

    /// Ecosystem-fund beneficiaries; the ecosystem share is the remainder
    /// after the user and treasury shares.
    pub ecosystem_fund: Vec<RevenueReceiver>,

    /// Accounts allowed to run the admin operations.
    pub admin_accounts: Vec<AccountId>,

    /// Rental operators, in rotation order.
    pub rental_operators: Vec<AccountId>,

    /// Fallback receiver named in delegation memos.
    pub fallback_receiver: AccountId,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        let eco_split = 1.0 / 3.0;

        Self {
            minimum_stake_amount: ASSET_SCALE,
            minimum_unliquify_amount: ASSET_SCALE,
            seconds_between_distributions: SECONDS_PER_DAY,
            max_snapshots_to_process: 180,
            initial_epoch_start_time: INITIAL_EPOCH_START_TIME,
            rental_epoch_length_seconds: 14 * SECONDS_PER_DAY,
            seconds_between_epochs: 7 * SECONDS_PER_DAY,
            redemption_period_length_seconds: 2 * SECONDS_PER_DAY,
            seconds_between_sweeps: SECONDS_PER_DAY,
            user_share: 0.85,
            treasury_share: 0.10,
            treasury_account: AccountId::new("pool.treasury"),
            ecosystem_fund: vec![
                RevenueReceiver {
                    account: AccountId::new("eco.grants"),
                    share: eco_split,
                },
                RevenueReceiver {
                    account: AccountId::new("eco.markets"),
                    share: eco_split,
                },
                RevenueReceiver {
                    account: AccountId::new("eco.labs"),
                    share: eco_split,
                },
            ],
            admin_accounts: vec![AccountId::new("pool.admin")],
            rental_operators: vec![
                AccountId::new("rental.one"),
                AccountId::new("rental.two"),
                AccountId::new("rental.three"),
            ],
            fallback_receiver: AccountId::new("pool.fallback"),
        }
    }
}

impl ProtocolConfig {
    /// Whether the account is in the admin set.
    pub fn is_admin(&self, account: &AccountId) -> bool {
        self.admin_accounts.contains(account)
    }

    /// Whether the account is a configured rental operator.
    pub fn is_operator(&self, account: &AccountId) -> bool {
        self.rental_operators.contains(account)
    }

    /// The operator that follows `current` in the rotation list, wrapping
    /// at the end.
    ///
    /// Fails with [`Error::RotationError`] when `current` cannot be located
    /// in the list, or when the computed next operator equals `current`.
    pub fn next_operator_after(&self, current: &AccountId) -> Result<AccountId> {
        let position = self
            .rental_operators
            .iter()
            .position(|op| op == current)
            .ok_or_else(|| {
                Error::RotationError(format!("could not locate operator {current}"))
            })?;

        let next = &self.rental_operators[(position + 1) % self.rental_operators.len()];

        if next == current {
            return Err(Error::RotationError(
                "next operator can not be the same as the current operator".to_string(),
            ));
        }

        Ok(next.clone())
    }
}

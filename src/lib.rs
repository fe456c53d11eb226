//! Tidepool: epoch-and-ledger accounting for a liquid-staking pool.
//!
//! The crate keeps the books for a protocol that accepts a base asset,
//! mints an earning share 1:1 against it, and rents the pooled deposits to
//! operators in fixed-length, overlapping epochs. Rental revenue is split
//! between stakers, a treasury, and an ecosystem fund; the staker share is
//! credited lazily by replaying immutable distribution snapshots. A liquid
//! auto-compounding share can be minted against staked balances and
//! appreciates through a monotone exchange rate.
//!
//! [`StakingEngine`] is the single entry point. It owns every record, runs
//! single-threaded, and treats each operation transactionally: an entry
//! point keeps its writes only when it returns `Ok`, so an error leaves no
//! trace.
//! Asset movements are not performed directly; the engine queues
//! [`LedgerInstruction`] values that the host executes against the real
//! asset ledger.

#![warn(missing_docs, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod command;
pub mod config;
pub mod ecosystem;
pub mod engine;
pub mod epoch;
pub mod error;
pub mod ledger;
pub mod math;
pub mod redemption;
pub mod snapshot;
pub mod staker;
pub mod state;
pub mod types;

pub use command::DepositCommand;
pub use config::{ProtocolConfig, RevenueReceiver, INITIAL_EPOCH_START_TIME};
pub use ecosystem::{EcosystemAccount, EcosystemLedger};
pub use engine::StakingEngine;
pub use epoch::{Epoch, EpochStatus, EpochStore, UNSTAKE_LEAD_SECONDS};
pub use error::{Error, Result};
pub use ledger::LedgerInstruction;
pub use math::MAX_ASSET_AMOUNT;
pub use redemption::{RedemptionRequest, RequestStore};
pub use snapshot::{DistributionSnapshot, SnapshotStore};
pub use staker::{StakerAccount, StakerStore};
pub use state::LedgerState;
pub use types::{AccountId, Asset, Denom, ASSET_SCALE};

//! The accounting engine
//!
//! `StakingEngine` owns the ledger singleton and every per-entity store,
//! and exposes the boundary operations of the protocol. Execution is
//! single-threaded and transactional per operation: every entry point runs
//! against a checkpoint of the stores and keeps its writes only on `Ok`,
//! so an `Err` return implies zero state change.
//!
//! Every operation first rolls the epoch forward if due; user-scoped
//! operations then replay the caller's pending snapshots before touching
//! balances. Those prologue writes sit inside the same checkpoint, so a
//! failed precondition later in the call unwinds them too.

use crate::command::DepositCommand;
use crate::config::ProtocolConfig;
use crate::ecosystem::EcosystemLedger;
use crate::epoch::EpochStore;
use crate::error::{Error, Result};
use crate::ledger::{delegation_memo, LedgerInstruction};
use crate::math::{self, MAX_ASSET_AMOUNT};
use crate::redemption::{RedemptionRequest, RequestStore};
use crate::snapshot::{DistributionSnapshot, SnapshotStore};
use crate::staker::StakerStore;
use crate::state::LedgerState;
use crate::types::{AccountId, Asset, Denom, ASSET_SCALE};
use tracing::{debug, info, warn};

/// Fee charged on instant redemptions (5 basis points).
const INSTANT_REDEEM_FEE: f64 = 0.0005;

/// Smallest rental order, in whole units.
const MINIMUM_RENTAL_UNITS: i64 = 10;

/// Largest rental order, in whole units.
const MAXIMUM_RENTAL_UNITS: i64 = 10_000_000;

/// Saved copy of everything a boundary operation may write. The outbox is
/// append-only within an operation, so its rollback is a truncate. The
/// config is not saved: the admin operations that write it validate fully
/// before their only mutation.
struct Checkpoint {
    state: LedgerState,
    stakers: StakerStore,
    epochs: EpochStore,
    snapshots: SnapshotStore,
    requests: RequestStore,
    ecosystem: EcosystemLedger,
    outbox_len: usize,
}

/// The epoch-and-ledger accounting engine.
pub struct StakingEngine {
    config: ProtocolConfig,
    state: LedgerState,
    stakers: StakerStore,
    epochs: EpochStore,
    snapshots: SnapshotStore,
    requests: RequestStore,
    ecosystem: EcosystemLedger,
    outbox: Vec<LedgerInstruction>,
}

impl StakingEngine {
    /// Create an engine with a fresh ledger and the genesis epoch.
    pub fn new(config: ProtocolConfig, now: u64) -> Self {
        let state = LedgerState::new(&config, now);
        let mut epochs = EpochStore::new();
        epochs.ensure(
            state.last_epoch_start_time,
            &state.current_rental_operator,
            &config,
        );

        Self {
            config,
            state,
            stakers: StakerStore::new(),
            epochs,
            snapshots: SnapshotStore::new(),
            requests: RequestStore::new(),
            ecosystem: EcosystemLedger::new(),
            outbox: Vec::new(),
        }
    }

    // ---- read access ----

    /// The protocol configuration.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// The global ledger state.
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Staker accounts.
    pub fn stakers(&self) -> &StakerStore {
        &self.stakers
    }

    /// Epoch records.
    pub fn epochs(&self) -> &EpochStore {
        &self.epochs
    }

    /// Distribution snapshots.
    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Live redemption requests.
    pub fn requests(&self) -> &RequestStore {
        &self.requests
    }

    /// Ecosystem fund accruals.
    pub fn ecosystem(&self) -> &EcosystemLedger {
        &self.ecosystem
    }

    /// Instructions queued for the external ledger, without draining them.
    pub fn pending_instructions(&self) -> &[LedgerInstruction] {
        &self.outbox
    }

    /// Drain the queued external-ledger instructions for execution.
    pub fn drain_instructions(&mut self) -> Vec<LedgerInstruction> {
        std::mem::take(&mut self.outbox)
    }

    // ---- transaction boundary ----

    /// Run one boundary operation and keep its writes only on success.
    fn transact<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let checkpoint = self.checkpoint();
        match op(self) {
            Ok(value) => Ok(value),
            Err(error) => {
                self.restore(checkpoint);
                Err(error)
            }
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            state: self.state.clone(),
            stakers: self.stakers.clone(),
            epochs: self.epochs.clone(),
            snapshots: self.snapshots.clone(),
            requests: self.requests.clone(),
            ecosystem: self.ecosystem.clone(),
            outbox_len: self.outbox.len(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.state = checkpoint.state;
        self.stakers = checkpoint.stakers;
        self.epochs = checkpoint.epochs;
        self.snapshots = checkpoint.snapshots;
        self.requests = checkpoint.requests;
        self.ecosystem = checkpoint.ecosystem;
        self.outbox.truncate(checkpoint.outbox_len);
    }

    // ---- account lifecycle ----

    /// Open a staker account for the wallet, or replay its pending
    /// snapshots if it already has one.
    pub fn stake(&mut self, wallet: &AccountId, now: u64) -> Result<()> {
        self.transact(|engine| engine.apply_stake(wallet, now))
    }

    fn apply_stake(&mut self, wallet: &AccountId, now: u64) -> Result<()> {
        self.apply_rotate_epoch(now)?;

        if self.stakers.contains(wallet) {
            self.sync_staker(wallet, now)?;
            return Ok(());
        }

        self.stakers.create_if_absent(wallet, now);
        Ok(())
    }

    /// Replay the wallet's pending snapshots.
    pub fn sync(&mut self, wallet: &AccountId, now: u64) -> Result<()> {
        self.transact(|engine| engine.apply_sync(wallet, now))
    }

    fn apply_sync(&mut self, wallet: &AccountId, now: u64) -> Result<()> {
        self.apply_rotate_epoch(now)?;
        self.sync_staker(wallet, now)?;
        Ok(())
    }

    // ---- deposits ----

    /// Handle an incoming asset deposit.
    ///
    /// The memo decodes once into a [`DepositCommand`]; unrecognized memos
    /// keep the asset without any accounting change. Recognized commands
    /// validate the declared denomination and minimums strictly.
    pub fn deposit(
        &mut self,
        from: &AccountId,
        asset: Asset,
        memo: &str,
        now: u64,
    ) -> Result<()> {
        self.transact(|engine| engine.apply_deposit(from, asset, memo, now))
    }

    fn apply_deposit(
        &mut self,
        from: &AccountId,
        asset: Asset,
        memo: &str,
        now: u64,
    ) -> Result<()> {
        validate_amount(asset.amount)?;

        let command = DepositCommand::decode(memo);
        if command == DepositCommand::NoOp {
            debug!("accepted no-op deposit of {} from {}", asset, from);
            return Ok(());
        }

        self.apply_rotate_epoch(now)?;

        match command {
            DepositCommand::Stake => self.deposit_stake(from, asset, now),
            DepositCommand::Unliquify => self.deposit_unliquify(from, asset, now),
            DepositCommand::Revenue => {
                expect_denom(&asset, Denom::Base)?;
                self.state.revenue_pending =
                    math::checked_add_i64(self.state.revenue_pending, asset.amount)?;
                info!("received {} of revenue from {}", asset, from);
                Ok(())
            }
            DepositCommand::Liquidity => {
                expect_denom(&asset, Denom::Base)?;
                self.state.funds_available_for_rental =
                    math::checked_add_i64(self.state.funds_available_for_rental, asset.amount)?;
                info!("received {} of protocol liquidity from {}", asset, from);
                Ok(())
            }
            DepositCommand::Incentive => {
                expect_denom(&asset, Denom::Base)?;
                self.state.revenue_pending =
                    math::checked_add_i64(self.state.revenue_pending, asset.amount)?;
                info!("received {} of incentive funding from {}", asset, from);
                Ok(())
            }
            DepositCommand::Rent {
                epoch,
                receiver,
                amount,
            } => self.deposit_rent(from, asset, epoch, &receiver, amount),
            DepositCommand::NoOp => unreachable!("handled above"),
        }
    }

    fn deposit_stake(&mut self, from: &AccountId, asset: Asset, now: u64) -> Result<()> {
        expect_denom(&asset, Denom::Base)?;

        if asset.amount < self.config.minimum_stake_amount {
            return Err(Error::BelowMinimum {
                amount: asset.amount,
                minimum: self.config.minimum_stake_amount,
            });
        }

        if !self.stakers.contains(from) {
            return Err(Error::NoSuchAccount(from.to_string()));
        }

        let next_start = self.next_epoch_start();
        let next_operator = self
            .config
            .next_operator_after(&self.state.current_rental_operator)?;

        self.sync_staker(from, now)?;

        let quantity = asset.amount;
        let staker = self.stakers.get_mut(from).expect("account checked above");
        let new_staked = math::checked_add_i64(staker.staked_balance, quantity)?;
        let new_earning = math::checked_add_i64(self.state.earning_balance, quantity)?;
        let new_pool =
            math::checked_add_i64(self.state.funds_available_for_rental, quantity)?;

        staker.staked_balance = new_staked;
        self.state.earning_balance = new_earning;
        self.state.funds_available_for_rental = new_pool;

        let epoch = self.epochs.ensure(next_start, &next_operator, &self.config);
        epoch.funds_bucket = math::checked_add_i64(epoch.funds_bucket, quantity)?;

        self.outbox.push(LedgerInstruction::Mint {
            to: None,
            asset: Asset::new(quantity, Denom::Earning),
        });

        info!(
            "{} staked {}; staked balance is now {}",
            from,
            asset,
            Asset::new(new_staked, Denom::Earning)
        );
        Ok(())
    }

    fn deposit_unliquify(&mut self, from: &AccountId, asset: Asset, now: u64) -> Result<()> {
        expect_denom(&asset, Denom::AutoCompounding)?;

        if asset.amount < self.config.minimum_unliquify_amount {
            return Err(Error::BelowMinimum {
                amount: asset.amount,
                minimum: self.config.minimum_unliquify_amount,
            });
        }

        if !self.stakers.contains(from) {
            return Err(Error::NoSuchAccount(from.to_string()));
        }

        // Conversion rate must be computed before any balance moves.
        let rate = math::div_f64(
            self.state.backing_balance as f64,
            self.state.autocompounding_supply as f64,
        )?;
        let converted = math::truncate_to_i64(math::mul_f64(rate, asset.amount as f64)?)?;

        let new_supply =
            math::checked_sub_i64(self.state.autocompounding_supply, asset.amount)?;
        let new_backing = math::checked_sub_i64(self.state.backing_balance, converted)?;
        let new_earning = math::checked_add_i64(self.state.earning_balance, converted)?;

        self.sync_staker(from, now)?;

        let staker = self.stakers.get_mut(from).expect("account checked above");
        staker.staked_balance = math::checked_add_i64(staker.staked_balance, converted)?;

        self.state.autocompounding_supply = new_supply;
        self.state.backing_balance = new_backing;
        self.state.earning_balance = new_earning;

        self.outbox.push(LedgerInstruction::Burn { asset });

        info!(
            "{} unliquified {} into {}",
            from,
            asset,
            Asset::new(converted, Denom::Earning)
        );
        Ok(())
    }

    fn deposit_rent(
        &mut self,
        from: &AccountId,
        payment: Asset,
        epoch_start: u64,
        receiver: &AccountId,
        rental_units: i64,
    ) -> Result<()> {
        expect_denom(&payment, Denom::Base)?;

        if rental_units < MINIMUM_RENTAL_UNITS {
            return Err(Error::BelowMinimum {
                amount: rental_units,
                minimum: MINIMUM_RENTAL_UNITS,
            });
        }
        if rental_units > MAXIMUM_RENTAL_UNITS {
            return Err(Error::InvalidAmount(rental_units));
        }

        let cost = math::checked_mul_u64(
            rental_units as u64,
            self.state.unit_rental_price as u64,
        )? as i64;
        if payment.amount < cost {
            return Err(Error::BelowMinimum {
                amount: payment.amount,
                minimum: cost,
            });
        }

        let rented = math::checked_mul_u64(rental_units as u64, ASSET_SCALE as u64)? as i64;

        // Rentals may target the current epoch or either of the next two.
        let spacing = self.config.seconds_between_epochs;
        let last = self.state.last_epoch_start_time;
        let operator = if epoch_start == last {
            self.state.current_rental_operator.clone()
        } else if epoch_start == last + spacing {
            self.config
                .next_operator_after(&self.state.current_rental_operator)?
        } else if epoch_start == last + 2 * spacing {
            let next = self
                .config
                .next_operator_after(&self.state.current_rental_operator)?;
            self.config.next_operator_after(&next)?
        } else {
            return Err(Error::NoSuchEpoch(epoch_start));
        };

        if self.state.funds_available_for_rental < rented {
            return Err(Error::InsufficientLiquidity(format!(
                "rental pool holds {} but {} was requested",
                self.state.funds_available_for_rental, rented
            )));
        }

        let new_pool =
            math::checked_sub_i64(self.state.funds_available_for_rental, rented)?;
        let new_revenue = math::checked_add_i64(self.state.revenue_pending, payment.amount)?;

        let epoch = self.epochs.ensure(epoch_start, &operator, &self.config);
        epoch.funds_bucket = math::checked_add_i64(epoch.funds_bucket, rented)?;
        let delegate_to = epoch.operator.clone();

        self.state.funds_available_for_rental = new_pool;
        self.state.revenue_pending = new_revenue;

        self.outbox.push(LedgerInstruction::Transfer {
            to: delegate_to,
            asset: Asset::new(rented, Denom::Base),
            memo: delegation_memo(receiver, epoch_start),
        });

        info!(
            "{} rented {} units into epoch {} for {}",
            from, rental_units, epoch_start, receiver
        );
        Ok(())
    }

    // ---- share conversion ----

    /// Convert staked earning shares into auto-compounding shares.
    pub fn liquify(&mut self, wallet: &AccountId, amount: i64, now: u64) -> Result<i64> {
        self.transact(|engine| engine.liquify_inner(wallet, amount, None, now))
    }

    /// Convert staked earning shares, failing if the minted output would
    /// fall below `min_output`.
    pub fn liquify_exact(
        &mut self,
        wallet: &AccountId,
        amount: i64,
        min_output: i64,
        now: u64,
    ) -> Result<i64> {
        self.transact(|engine| engine.liquify_inner(wallet, amount, Some(min_output), now))
    }

    fn liquify_inner(
        &mut self,
        wallet: &AccountId,
        amount: i64,
        min_output: Option<i64>,
        now: u64,
    ) -> Result<i64> {
        validate_amount(amount)?;
        self.apply_rotate_epoch(now)?;
        self.sync_staker(wallet, now)?;

        let staked = self.require_staked_balance(wallet)?;
        if staked < amount {
            return Err(Error::InsufficientStake {
                requested: amount,
                staked,
            });
        }

        let minted = self.shares_for_earning(amount)?;
        if let Some(minimum) = min_output {
            if minted < minimum {
                return Err(Error::OutputBelowMinimum {
                    output: minted,
                    minimum,
                });
            }
        }

        let new_staked = math::checked_sub_i64(staked, amount)?;
        let new_earning = math::checked_sub_i64(self.state.earning_balance, amount)?;
        let new_backing = math::checked_add_i64(self.state.backing_balance, amount)?;
        let new_supply =
            math::checked_add_i64(self.state.autocompounding_supply, minted)?;

        let staker = self.stakers.get_mut(wallet).expect("synced above");
        staker.staked_balance = new_staked;
        self.state.earning_balance = new_earning;
        self.state.backing_balance = new_backing;
        self.state.autocompounding_supply = new_supply;

        self.outbox.push(LedgerInstruction::Mint {
            to: Some(wallet.clone()),
            asset: Asset::new(minted, Denom::AutoCompounding),
        });

        self.trim_requests_to_balance(wallet, new_staked)?;

        info!(
            "{} liquified {} into {}",
            wallet,
            Asset::new(amount, Denom::Earning),
            Asset::new(minted, Denom::AutoCompounding)
        );
        Ok(minted)
    }

    // ---- reward claims ----

    /// Pay out the wallet's claimable rewards in base asset.
    pub fn claim_rewards(&mut self, wallet: &AccountId, now: u64) -> Result<i64> {
        self.transact(|engine| engine.apply_claim_rewards(wallet, now))
    }

    fn apply_claim_rewards(&mut self, wallet: &AccountId, now: u64) -> Result<i64> {
        self.apply_rotate_epoch(now)?;
        self.sync_staker(wallet, now)?;

        let staker = self.stakers.get_mut(wallet).expect("synced above");
        let claimable = staker.claimable_balance;
        if claimable == 0 {
            return Err(Error::NothingToClaim);
        }

        staker.claimable_balance = 0;
        self.outbox.push(LedgerInstruction::Transfer {
            to: wallet.clone(),
            asset: Asset::new(claimable, Denom::Base),
            memo: "staking reward claim".to_string(),
        });

        info!("{} claimed {}", wallet, Asset::new(claimable, Denom::Base));
        Ok(claimable)
    }

    /// Restake the wallet's claimable rewards as earning shares.
    pub fn claim_as_staked(&mut self, wallet: &AccountId, now: u64) -> Result<i64> {
        self.transact(|engine| engine.apply_claim_as_staked(wallet, now))
    }

    fn apply_claim_as_staked(&mut self, wallet: &AccountId, now: u64) -> Result<i64> {
        self.apply_rotate_epoch(now)?;
        self.sync_staker(wallet, now)?;

        let claimable = self
            .stakers
            .get(wallet)
            .expect("synced above")
            .claimable_balance;
        if claimable == 0 {
            return Err(Error::NothingToClaim);
        }

        let new_earning = math::checked_add_i64(self.state.earning_balance, claimable)?;
        let new_pool =
            math::checked_add_i64(self.state.funds_available_for_rental, claimable)?;

        let staker = self.stakers.get_mut(wallet).expect("synced above");
        staker.staked_balance = math::checked_add_i64(staker.staked_balance, claimable)?;
        staker.claimable_balance = 0;

        self.state.earning_balance = new_earning;
        self.state.funds_available_for_rental = new_pool;

        self.outbox.push(LedgerInstruction::Mint {
            to: None,
            asset: Asset::new(claimable, Denom::Earning),
        });

        info!(
            "{} restaked {} of rewards",
            wallet,
            Asset::new(claimable, Denom::Base)
        );
        Ok(claimable)
    }

    /// Convert the wallet's claimable rewards straight into
    /// auto-compounding shares.
    pub fn claim_as_auto_compounding(
        &mut self,
        wallet: &AccountId,
        min_output: i64,
        now: u64,
    ) -> Result<i64> {
        self.transact(|engine| engine.apply_claim_as_auto_compounding(wallet, min_output, now))
    }

    fn apply_claim_as_auto_compounding(
        &mut self,
        wallet: &AccountId,
        min_output: i64,
        now: u64,
    ) -> Result<i64> {
        self.apply_rotate_epoch(now)?;
        self.sync_staker(wallet, now)?;

        let claimable = self
            .stakers
            .get(wallet)
            .expect("synced above")
            .claimable_balance;
        if claimable == 0 {
            return Err(Error::NothingToClaim);
        }

        let minted = self.shares_for_earning(claimable)?;
        if minted < min_output {
            return Err(Error::OutputBelowMinimum {
                output: minted,
                minimum: min_output,
            });
        }

        let new_backing = math::checked_add_i64(self.state.backing_balance, claimable)?;
        let new_supply =
            math::checked_add_i64(self.state.autocompounding_supply, minted)?;
        let new_pool =
            math::checked_add_i64(self.state.funds_available_for_rental, claimable)?;

        self.stakers
            .get_mut(wallet)
            .expect("synced above")
            .claimable_balance = 0;

        self.state.backing_balance = new_backing;
        self.state.autocompounding_supply = new_supply;
        self.state.funds_available_for_rental = new_pool;

        self.outbox.push(LedgerInstruction::Mint {
            to: None,
            asset: Asset::new(claimable, Denom::Earning),
        });
        self.outbox.push(LedgerInstruction::Mint {
            to: Some(wallet.clone()),
            asset: Asset::new(minted, Denom::AutoCompounding),
        });

        info!(
            "{} claimed {} as {}",
            wallet,
            Asset::new(claimable, Denom::Base),
            Asset::new(minted, Denom::AutoCompounding)
        );
        Ok(minted)
    }

    // ---- redemption ----

    /// Queue a withdrawal of `amount` earning-share units across up to
    /// three in-flight epochs, falling back to the rental pool for any
    /// remainder.
    pub fn request_redeem(&mut self, wallet: &AccountId, amount: i64, now: u64) -> Result<()> {
        self.transact(|engine| engine.apply_request_redeem(wallet, amount, now))
    }

    fn apply_request_redeem(&mut self, wallet: &AccountId, amount: i64, now: u64) -> Result<()> {
        validate_amount(amount)?;
        self.apply_rotate_epoch(now)?;
        self.sync_staker(wallet, now)?;

        let staked = self.require_staked_balance(wallet)?;
        if staked < amount {
            return Err(Error::InsufficientStake {
                requested: amount,
                staked,
            });
        }

        let spacing = self.config.seconds_between_epochs;
        let last = self.state.last_epoch_start_time;
        let candidates = [last.saturating_sub(spacing), last, last + spacing];

        // Superseded requests are removed first so re-requesting reflects
        // current balances instead of stacking.
        let mut restores: Vec<(u64, i64)> = Vec::new();
        let mut adjusted: Vec<(u64, i64)> = Vec::new();
        for &candidate in &candidates {
            let Some(epoch) = self.epochs.get(candidate) else {
                continue;
            };

            let mut committed = epoch.refund_committed;
            if let Some(request) = self.requests.get(wallet, candidate) {
                committed = math::checked_sub_i64(committed, request.amount)?;
                restores.push((candidate, committed));
            }
            adjusted.push((candidate, committed));
        }

        // Allocation plan, oldest epoch first.
        let mut remaining = amount;
        let mut commits: Vec<(u64, i64, i64)> = Vec::new();
        for &(candidate, committed) in &adjusted {
            if remaining == 0 {
                break;
            }

            let epoch = self.epochs.require(candidate)?;
            if epoch.unstake_deadline <= now {
                continue;
            }

            let available = math::checked_sub_i64(epoch.funds_bucket, committed)?;
            if available == 0 {
                continue;
            }

            let portion = available.min(remaining);
            let new_committed = math::checked_add_i64(committed, portion)?;
            commits.push((candidate, portion, new_committed));
            remaining = math::checked_sub_i64(remaining, portion)?;
        }

        if remaining > 0 && self.state.funds_available_for_rental < remaining {
            // Unreachable under correct bucket accounting.
            return Err(Error::InsufficientLiquidity(format!(
                "request remainder {} exceeds epochs and rental pool",
                remaining
            )));
        }

        // All checks passed; apply the plan.
        for (candidate, committed) in restores {
            self.requests.remove(wallet, candidate);
            self.epochs
                .get_mut(candidate)
                .expect("existence checked above")
                .refund_committed = committed;
        }

        for (candidate, portion, new_committed) in commits {
            self.epochs
                .get_mut(candidate)
                .expect("existence checked above")
                .refund_committed = new_committed;
            self.requests.insert(RedemptionRequest::new(
                wallet.clone(),
                candidate,
                portion,
                now,
            ));
            info!(
                "{} queued {} for redemption from epoch {}",
                wallet,
                Asset::new(portion, Denom::Base),
                candidate
            );
        }

        if remaining > 0 {
            self.state.funds_available_for_rental =
                math::checked_sub_i64(self.state.funds_available_for_rental, remaining)?;
            self.state.earning_balance =
                math::checked_sub_i64(self.state.earning_balance, remaining)?;

            let staker = self.stakers.get_mut(wallet).expect("synced above");
            staker.staked_balance = math::checked_sub_i64(staker.staked_balance, remaining)?;

            self.outbox.push(LedgerInstruction::Burn {
                asset: Asset::new(remaining, Denom::Earning),
            });
            self.outbox.push(LedgerInstruction::Transfer {
                to: wallet.clone(),
                asset: Asset::new(remaining, Denom::Base),
                memo: "redemption".to_string(),
            });

            info!(
                "{} redeemed {} instantly from the rental pool",
                wallet,
                Asset::new(remaining, Denom::Base)
            );
        }

        Ok(())
    }

    /// Claim a queued redemption during the open redemption window.
    pub fn redeem(&mut self, wallet: &AccountId, now: u64) -> Result<i64> {
        self.transact(|engine| engine.apply_redeem(wallet, now))
    }

    fn apply_redeem(&mut self, wallet: &AccountId, now: u64) -> Result<i64> {
        self.apply_rotate_epoch(now)?;
        self.sync_staker(wallet, now)?;

        let spacing = self.config.seconds_between_epochs;
        let window_end =
            self.state.last_epoch_start_time + self.config.redemption_period_length_seconds;

        if now >= window_end {
            return Err(Error::RedemptionWindowClosed {
                next_window: self.state.last_epoch_start_time + spacing,
            });
        }

        let target_epoch = self.state.last_epoch_start_time.saturating_sub(spacing);
        let requested = self
            .requests
            .get(wallet, target_epoch)
            .ok_or(Error::NoSuchRequest(target_epoch))?
            .amount;

        let staked = self.require_staked_balance(wallet)?;
        if requested > staked {
            return Err(Error::InsufficientStake {
                requested,
                staked,
            });
        }

        if self.state.funds_for_redemption < requested {
            // The reserve is pre-funded by operator returns; a shortfall
            // here is a ledger inconsistency.
            return Err(Error::InsufficientLiquidity(format!(
                "redemption reserve holds {} but {} was requested",
                self.state.funds_for_redemption, requested
            )));
        }

        let new_reserve =
            math::checked_sub_i64(self.state.funds_for_redemption, requested)?;
        let new_earning = math::checked_sub_i64(self.state.earning_balance, requested)?;
        let new_staked = math::checked_sub_i64(staked, requested)?;

        self.state.funds_for_redemption = new_reserve;
        self.state.earning_balance = new_earning;
        self.stakers
            .get_mut(wallet)
            .expect("synced above")
            .staked_balance = new_staked;
        self.requests.remove(wallet, target_epoch);

        self.outbox.push(LedgerInstruction::Burn {
            asset: Asset::new(requested, Denom::Earning),
        });
        self.outbox.push(LedgerInstruction::Transfer {
            to: wallet.clone(),
            asset: Asset::new(requested, Denom::Base),
            memo: "redemption".to_string(),
        });

        info!(
            "{} redeemed {} from epoch {}",
            wallet,
            Asset::new(requested, Denom::Base),
            target_epoch
        );
        Ok(requested)
    }

    /// Redeem instantly from the rental pool for a 5 bp fee, bypassing the
    /// queue entirely.
    pub fn instant_redeem(
        &mut self,
        wallet: &AccountId,
        amount: i64,
        min_output: i64,
        now: u64,
    ) -> Result<i64> {
        self.transact(|engine| engine.apply_instant_redeem(wallet, amount, min_output, now))
    }

    fn apply_instant_redeem(
        &mut self,
        wallet: &AccountId,
        amount: i64,
        min_output: i64,
        now: u64,
    ) -> Result<i64> {
        validate_amount(amount)?;
        self.apply_rotate_epoch(now)?;
        self.sync_staker(wallet, now)?;

        let staked = self.require_staked_balance(wallet)?;
        if staked < amount {
            return Err(Error::InsufficientStake {
                requested: amount,
                staked,
            });
        }

        if self.state.funds_available_for_rental < amount {
            return Err(Error::InsufficientLiquidity(
                "not enough instant-redemption funds available".to_string(),
            ));
        }

        let fee = math::truncate_to_i64(math::mul_f64(INSTANT_REDEEM_FEE, amount as f64)?)?;
        let payout =
            math::truncate_to_i64(math::mul_f64(1.0 - INSTANT_REDEEM_FEE, amount as f64)?)?;
        if math::checked_add_i64(payout, fee)? > amount {
            return Err(Error::AllocationOverrun);
        }

        if payout < min_output {
            return Err(Error::OutputBelowMinimum {
                output: payout,
                minimum: min_output,
            });
        }

        let new_pool =
            math::checked_sub_i64(self.state.funds_available_for_rental, amount)?;
        let new_earning = math::checked_sub_i64(self.state.earning_balance, amount)?;
        let new_revenue = math::checked_add_i64(self.state.revenue_pending, fee)?;
        let new_staked = math::checked_sub_i64(staked, amount)?;

        self.state.funds_available_for_rental = new_pool;
        self.state.earning_balance = new_earning;
        self.state.revenue_pending = new_revenue;
        self.stakers
            .get_mut(wallet)
            .expect("synced above")
            .staked_balance = new_staked;

        self.outbox.push(LedgerInstruction::Burn {
            asset: Asset::new(amount, Denom::Earning),
        });
        self.outbox.push(LedgerInstruction::Transfer {
            to: wallet.clone(),
            asset: Asset::new(payout, Denom::Base),
            memo: "instant redemption".to_string(),
        });

        self.trim_requests_to_balance(wallet, new_staked)?;

        info!(
            "{} instantly redeemed {} (fee {})",
            wallet,
            Asset::new(payout, Denom::Base),
            Asset::new(fee, Denom::Base)
        );
        Ok(payout)
    }

    /// Purge the wallet's redemption requests whose windows have closed.
    /// Amounts are not restored; leftover reserve funds are recycled by
    /// [`StakingEngine::reallocate`].
    pub fn clear_expired(&mut self, wallet: &AccountId, now: u64) -> Result<usize> {
        self.transact(|engine| engine.apply_clear_expired(wallet, now))
    }

    fn apply_clear_expired(&mut self, wallet: &AccountId, now: u64) -> Result<usize> {
        self.apply_rotate_epoch(now)?;
        self.sync_staker(wallet, now)?;

        // Requests against epoch X are claimable while the ledger sits at
        // X + spacing; anything older than last - spacing has lapsed.
        let bound = self
            .state
            .last_epoch_start_time
            .saturating_sub(self.config.seconds_between_epochs);
        let purged = self.requests.purge_older_than(wallet, bound);

        if purged > 0 {
            info!("purged {} expired redemption requests for {}", purged, wallet);
        }
        Ok(purged)
    }

    /// Move unclaimed redemption-reserve funds back into the rental pool
    /// once the redemption window has closed.
    pub fn reallocate(&mut self, now: u64) -> Result<i64> {
        self.transact(|engine| engine.apply_reallocate(now))
    }

    fn apply_reallocate(&mut self, now: u64) -> Result<i64> {
        self.apply_rotate_epoch(now)?;

        let due =
            self.state.last_epoch_start_time + self.config.redemption_period_length_seconds;
        if now <= due {
            return Err(Error::TooEarly { due });
        }

        let leftover = self.state.funds_for_redemption;
        if leftover == 0 {
            return Err(Error::NothingToReallocate);
        }

        self.state.funds_available_for_rental =
            math::checked_add_i64(self.state.funds_available_for_rental, leftover)?;
        self.state.funds_for_redemption = 0;

        info!(
            "reallocated {} of unclaimed redemption funds",
            Asset::new(leftover, Denom::Base)
        );
        Ok(leftover)
    }

    // ---- epoch lifecycle ----

    /// Roll the epoch forward if due. Idempotent; calling when not due is
    /// a no-op, never an error.
    pub fn rotate_epoch(&mut self, now: u64) -> Result<()> {
        self.transact(|engine| engine.apply_rotate_epoch(now))
    }

    fn apply_rotate_epoch(&mut self, now: u64) -> Result<()> {
        let spacing = self.config.seconds_between_epochs;

        loop {
            let candidate = self.state.last_epoch_start_time + spacing;
            if now < candidate {
                return Ok(());
            }

            let next_operator = self
                .config
                .next_operator_after(&self.state.current_rental_operator)?;

            self.state.last_epoch_start_time = candidate;
            self.state.current_rental_operator = next_operator.clone();
            self.epochs.ensure(candidate, &next_operator, &self.config);

            info!(
                "rotated to epoch {} with operator {}",
                candidate, next_operator
            );
        }
    }

    /// Delegate all idle funds to the next epoch. Rate-limited to once per
    /// configured interval.
    pub fn sweep_idle_funds(&mut self, now: u64) -> Result<()> {
        self.transact(|engine| engine.apply_sweep_idle_funds(now))
    }

    fn apply_sweep_idle_funds(&mut self, now: u64) -> Result<()> {
        self.apply_rotate_epoch(now)?;

        if now < self.state.next_sweep_time {
            return Err(Error::TooEarly {
                due: self.state.next_sweep_time,
            });
        }

        let idle = self.state.funds_available_for_rental;
        if idle > 0 {
            let next_start = self.next_epoch_start();
            let next_operator = self
                .config
                .next_operator_after(&self.state.current_rental_operator)?;

            let epoch = self.epochs.ensure(next_start, &next_operator, &self.config);
            epoch.funds_bucket = math::checked_add_i64(epoch.funds_bucket, idle)?;
            let delegate_to = epoch.operator.clone();

            self.state.funds_available_for_rental = 0;

            self.outbox.push(LedgerInstruction::Transfer {
                to: delegate_to.clone(),
                asset: Asset::new(idle, Denom::Base),
                memo: delegation_memo(&self.config.fallback_receiver, next_start),
            });

            info!(
                "swept {} into epoch {} for {}",
                Asset::new(idle, Denom::Base),
                next_start,
                delegate_to
            );
        }

        self.state.next_sweep_time += self.config.seconds_between_sweeps;
        Ok(())
    }

    /// Record funds returned by an operator for its most recent epoch past
    /// the return boundary.
    ///
    /// The returned amount first tops up that epoch's redemption routing
    /// (up to its committed refunds) and feeds the global redemption
    /// reserve; any remainder rejoins the rental pool.
    pub fn reconcile_operator_return(
        &mut self,
        operator: &AccountId,
        amount: i64,
        now: u64,
    ) -> Result<()> {
        self.transact(|engine| engine.apply_reconcile_operator_return(operator, amount, now))
    }

    fn apply_reconcile_operator_return(
        &mut self,
        operator: &AccountId,
        amount: i64,
        now: u64,
    ) -> Result<()> {
        validate_amount(amount)?;
        self.apply_rotate_epoch(now)?;

        // The epoch whose rental length just elapsed started two spacings
        // ago; returned funds belong to it or an older epoch of the same
        // operator.
        let bound = self
            .state
            .last_epoch_start_time
            .saturating_sub(2 * self.config.seconds_between_epochs);
        let epoch_start = self
            .epochs
            .latest_for_operator_at_or_before(operator, bound)
            .ok_or(Error::NoSuchEpoch(bound))?;

        let epoch = self.epochs.require(epoch_start)?;
        let gap = math::checked_sub_i64(
            epoch.refund_committed,
            epoch.total_returned_to_redemption,
        )?;
        let to_redemption = gap.min(amount);
        let remainder = math::checked_sub_i64(amount, to_redemption)?;

        let new_routed =
            math::checked_add_i64(epoch.total_returned_to_redemption, to_redemption)?;
        let new_total = math::checked_add_i64(epoch.total_returned, amount)?;
        let new_reserve =
            math::checked_add_i64(self.state.funds_for_redemption, to_redemption)?;
        let new_pool =
            math::checked_add_i64(self.state.funds_available_for_rental, remainder)?;

        let epoch = self.epochs.get_mut(epoch_start).expect("indexed above");
        epoch.total_returned_to_redemption = new_routed;
        epoch.total_returned = new_total;
        self.state.funds_for_redemption = new_reserve;
        self.state.funds_available_for_rental = new_pool;

        info!(
            "{} returned {} for epoch {}: {} to redemption reserve, {} recycled",
            operator,
            Asset::new(amount, Denom::Base),
            epoch_start,
            Asset::new(to_redemption, Denom::Base),
            Asset::new(remainder, Denom::Base)
        );
        Ok(())
    }

    // ---- revenue distribution ----

    /// Split pending revenue into user, treasury, and ecosystem shares and
    /// emit a distribution snapshot.
    pub fn distribute(&mut self, now: u64) -> Result<()> {
        self.transact(|engine| engine.apply_distribute(now))
    }

    fn apply_distribute(&mut self, now: u64) -> Result<()> {
        self.apply_rotate_epoch(now)?;

        if now < self.state.next_distribution_time {
            return Err(Error::TooEarly {
                due: self.state.next_distribution_time,
            });
        }

        let pending = self.state.revenue_pending;
        let combined =
            math::checked_add_i64(self.state.earning_balance, self.state.backing_balance)?;

        if pending == 0 || combined == 0 {
            self.zero_distribution();
            return Ok(());
        }

        let total = pending as f64;
        let user_allocation = math::mul_f64(total, self.config.user_share)?;
        let treasury_allocation = math::mul_f64(total, self.config.treasury_share)?;
        let ecosystem_allocation = total - user_allocation - treasury_allocation;

        // Sub-split the user share between the earning bucket and the
        // auto-compounding backing, in proportion to their balances.
        let earning_fraction =
            math::div_f64(self.state.earning_balance as f64, combined as f64)?;
        let backing_fraction =
            math::div_f64(self.state.backing_balance as f64, combined as f64)?;
        let earning_allocation = math::mul_f64(user_allocation, earning_fraction)?;
        let autocompound_allocation = math::mul_f64(user_allocation, backing_fraction)?;

        let treasury_i64 = math::truncate_to_i64(treasury_allocation)?;
        let ecosystem_i64 = math::truncate_to_i64(ecosystem_allocation)?;
        let earning_i64 = math::truncate_to_i64(earning_allocation)?;
        let autocompound_i64 = math::truncate_to_i64(autocompound_allocation)?;

        // Sanity fuse against floating-point drift.
        let mut allocated = math::checked_add_i64(treasury_i64, ecosystem_i64)?;
        allocated = math::checked_add_i64(allocated, earning_i64)?;
        allocated = math::checked_add_i64(allocated, autocompound_i64)?;
        if allocated > pending {
            return Err(Error::AllocationOverrun);
        }

        let new_backing =
            math::checked_add_i64(self.state.backing_balance, autocompound_i64)?;
        let new_user_bucket =
            math::checked_add_i64(self.state.user_funds_bucket, earning_i64)?;
        let new_total_distributed =
            math::checked_add_i64(self.state.total_revenue_distributed, pending)?;
        let new_pool = math::checked_add_i64(
            self.state.funds_available_for_rental,
            autocompound_i64,
        )?;

        let timestamp = self.state.next_distribution_time;

        self.state.revenue_pending = 0;
        self.state.backing_balance = new_backing;
        self.state.user_funds_bucket = new_user_bucket;
        self.state.total_revenue_distributed = new_total_distributed;
        self.state.funds_available_for_rental = new_pool;
        self.state.next_distribution_time += self.config.seconds_between_distributions;

        self.outbox.push(LedgerInstruction::Mint {
            to: None,
            asset: Asset::new(autocompound_i64, Denom::Earning),
        });
        if treasury_i64 > 0 {
            self.outbox.push(LedgerInstruction::Transfer {
                to: self.config.treasury_account.clone(),
                asset: Asset::new(treasury_i64, Denom::Base),
                memo: "treasury allocation".to_string(),
            });
        }

        let receivers = self.config.ecosystem_fund.clone();
        for receiver in &receivers {
            let portion = math::truncate_to_i64(math::mul_f64(
                ecosystem_i64 as f64,
                receiver.share,
            )?)?;
            if portion > 0 {
                self.ecosystem.credit(&receiver.account, portion)?;
            }
        }

        self.snapshots.append(DistributionSnapshot {
            timestamp,
            earning_bucket: earning_i64,
            autocompounding_bucket: autocompound_i64,
            treasury_bucket: treasury_i64,
            ecosystem_bucket: ecosystem_i64,
            total_distributed: pending,
            total_earning_supply: self.state.earning_balance,
        });

        info!(
            "distributed {}: {} to stakers, {} to auto-compounding, {} to treasury, {} to ecosystem",
            Asset::new(pending, Denom::Base),
            Asset::new(earning_i64, Denom::Base),
            Asset::new(autocompound_i64, Denom::Base),
            Asset::new(treasury_i64, Denom::Base),
            Asset::new(ecosystem_i64, Denom::Base)
        );
        Ok(())
    }

    fn zero_distribution(&mut self) {
        let timestamp = self.state.next_distribution_time;
        self.snapshots.append(DistributionSnapshot::zero(
            timestamp,
            self.state.earning_balance,
        ));
        self.state.next_distribution_time += self.config.seconds_between_distributions;
        debug!("recorded zero distribution for {}", timestamp);
    }

    // ---- admin operations ----

    /// Add an account to the admin set.
    pub fn add_admin(&mut self, caller: &AccountId, account: AccountId) -> Result<()> {
        self.require_admin(caller)?;
        if self.config.is_admin(&account) {
            return Err(Error::InvalidAdmin(account.to_string()));
        }
        info!("{} added admin {}", caller, account);
        self.config.admin_accounts.push(account);
        Ok(())
    }

    /// Remove an account from the admin set.
    pub fn remove_admin(&mut self, caller: &AccountId, account: &AccountId) -> Result<()> {
        self.require_admin(caller)?;
        if !self.config.is_admin(account) {
            return Err(Error::NotAnAdmin(account.to_string()));
        }
        self.config.admin_accounts.retain(|a| a != account);
        info!("{} removed admin {}", caller, account);
        Ok(())
    }

    /// Append a rental operator to the rotation list.
    pub fn add_rental_operator(
        &mut self,
        caller: &AccountId,
        operator: AccountId,
    ) -> Result<()> {
        self.require_admin(caller)?;
        if self.config.is_operator(&operator) {
            return Err(Error::InvalidOperator(operator.to_string()));
        }
        info!("{} added rental operator {}", caller, operator);
        self.config.rental_operators.push(operator);
        Ok(())
    }

    /// Remove a rental operator from the rotation list.
    pub fn remove_rental_operator(
        &mut self,
        caller: &AccountId,
        operator: &AccountId,
    ) -> Result<()> {
        self.require_admin(caller)?;
        if !self.config.is_operator(operator) {
            return Err(Error::NotAnOperator(operator.to_string()));
        }
        self.config.rental_operators.retain(|o| o != operator);
        info!("{} removed rental operator {}", caller, operator);
        Ok(())
    }

    /// Set the fallback receiver named in delegation memos.
    pub fn set_fallback_receiver(
        &mut self,
        caller: &AccountId,
        receiver: AccountId,
    ) -> Result<()> {
        self.require_admin(caller)?;
        info!("{} set fallback receiver to {}", caller, receiver);
        self.config.fallback_receiver = receiver;
        Ok(())
    }

    /// Set the per-unit rental price.
    pub fn set_rental_price(&mut self, caller: &AccountId, price: i64) -> Result<()> {
        self.require_admin(caller)?;
        if price <= 0 {
            return Err(Error::InvalidAmount(price));
        }
        info!("{} set unit rental price to {}", caller, price);
        self.state.unit_rental_price = price;
        Ok(())
    }

    // ---- internals ----

    fn require_admin(&self, caller: &AccountId) -> Result<()> {
        if !self.config.is_admin(caller) {
            return Err(Error::Unauthorized(caller.to_string()));
        }
        Ok(())
    }

    fn next_epoch_start(&self) -> u64 {
        self.state.last_epoch_start_time + self.config.seconds_between_epochs
    }

    fn require_staked_balance(&self, wallet: &AccountId) -> Result<i64> {
        self.stakers
            .get(wallet)
            .map(|s| s.staked_balance)
            .ok_or_else(|| Error::NoSuchAccount(wallet.to_string()))
    }

    /// Auto-compounding shares minted for an earning amount at the current
    /// exchange rate (1:1 while nothing is liquified).
    fn shares_for_earning(&self, amount: i64) -> Result<i64> {
        let rate = if self.state.autocompounding_supply == 0
            && self.state.backing_balance == 0
        {
            1.0
        } else {
            math::div_f64(
                self.state.autocompounding_supply as f64,
                self.state.backing_balance as f64,
            )?
        };

        math::truncate_to_i64(math::mul_f64(rate, amount as f64)?)
    }

    /// Replay pending distribution snapshots for one wallet, bounded by
    /// the configured per-call maximum. Partial progress is saved through
    /// the account's sync cursor.
    fn sync_staker(&mut self, wallet: &AccountId, now: u64) -> Result<i64> {
        let staker = self
            .stakers
            .get(wallet)
            .ok_or_else(|| Error::NoSuchAccount(wallet.to_string()))?;
        let staked = staker.staked_balance;
        let from = staker.last_sync_time;
        let max = self.config.max_snapshots_to_process as usize;

        let mut accrued: i64 = 0;
        let mut processed = 0usize;
        let mut last_timestamp = from;
        let mut iter = self.snapshots.range_from(from).peekable();

        while let Some(snapshot) = iter.next() {
            if staked > 0
                && snapshot.earning_bucket > 0
                && snapshot.total_earning_supply > 0
            {
                let share = math::div_f64(
                    staked as f64,
                    snapshot.total_earning_supply as f64,
                )?;
                let allocation = math::mul_f64(share, snapshot.earning_bucket as f64)?;
                accrued = math::checked_add_i64(accrued, math::truncate_to_i64(allocation)?)?;
            }

            last_timestamp = snapshot.timestamp;
            processed += 1;
            if processed >= max {
                break;
            }
        }

        if processed == 0 {
            return Ok(0);
        }

        let partial = iter.peek().is_some();
        let new_bucket = math::checked_sub_i64(self.state.user_funds_bucket, accrued)?;

        let staker = self.stakers.get_mut(wallet).expect("presence checked above");
        staker.claimable_balance = math::checked_add_i64(staker.claimable_balance, accrued)?;
        // The cursor must pass every processed snapshot, or a second sync
        // in the same second as a distribution would replay it.
        staker.last_sync_time = if partial {
            last_timestamp + 1
        } else {
            now.max(last_timestamp + 1)
        };
        self.state.user_funds_bucket = new_bucket;

        if accrued > 0 {
            debug!(
                "synced {} snapshots for {}; accrued {}",
                processed,
                wallet,
                Asset::new(accrued, Denom::Base)
            );
        }
        Ok(accrued)
    }

    /// Trim the wallet's queued redemption requests, newest epoch first,
    /// so the total queued never exceeds the staked balance. Restores each
    /// epoch's committed refunds for every trimmed unit.
    fn trim_requests_to_balance(&mut self, wallet: &AccountId, balance: i64) -> Result<()> {
        loop {
            let total = self.requests.total_for_wallet(wallet);
            if total <= balance {
                return Ok(());
            }

            let newest = self
                .requests
                .newest_for_wallet(wallet)
                .expect("total above zero implies a request exists");
            let epoch_start = newest.epoch_start;
            let request_amount = newest.amount;
            let excess = math::checked_sub_i64(total, balance)?;

            let epoch = self
                .epochs
                .get_mut(epoch_start)
                .ok_or(Error::NoSuchEpoch(epoch_start))?;

            if request_amount <= excess {
                epoch.refund_committed =
                    math::checked_sub_i64(epoch.refund_committed, request_amount)?;
                self.requests.remove(wallet, epoch_start);
                warn!(
                    "dropped {}'s redemption request of {} against epoch {}",
                    wallet,
                    Asset::new(request_amount, Denom::Base),
                    epoch_start
                );
            } else {
                epoch.refund_committed =
                    math::checked_sub_i64(epoch.refund_committed, excess)?;
                let mut trimmed = self
                    .requests
                    .remove(wallet, epoch_start)
                    .expect("request fetched above");
                trimmed.amount = math::checked_sub_i64(request_amount, excess)?;
                self.requests.insert(trimmed);
                warn!(
                    "trimmed {}'s redemption request against epoch {} by {}",
                    wallet,
                    epoch_start,
                    Asset::new(excess, Denom::Base)
                );
            }
        }
    }
}

fn validate_amount(amount: i64) -> Result<()> {
    if amount <= 0 || amount >= MAX_ASSET_AMOUNT {
        return Err(Error::InvalidAmount(amount));
    }
    Ok(())
}

fn expect_denom(asset: &Asset, expected: Denom) -> Result<()> {
    if asset.denom != expected {
        return Err(Error::WrongDenomination {
            expected: expected.symbol(),
            got: asset.denom.symbol(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> StakingEngine {
        let config = ProtocolConfig::default();
        let start = config.initial_epoch_start_time;
        StakingEngine::new(config, start)
    }

    fn start_time() -> u64 {
        ProtocolConfig::default().initial_epoch_start_time
    }

    #[test]
    fn test_genesis_epoch_exists() {
        let engine = engine();
        let epoch = engine.epochs().get(start_time()).unwrap();
        assert_eq!(epoch.operator, AccountId::new("rental.one"));
        assert_eq!(epoch.funds_bucket, 0);
    }

    #[test]
    fn test_rotation_is_idempotent() {
        let mut engine = engine();
        let spacing = engine.config().seconds_between_epochs;
        let now = start_time() + spacing;

        engine.rotate_epoch(now).unwrap();
        let after_first = engine.state().clone();
        let epochs_after_first = engine.epochs().len();

        engine.rotate_epoch(now).unwrap();
        assert_eq!(
            engine.state().last_epoch_start_time,
            after_first.last_epoch_start_time
        );
        assert_eq!(
            engine.state().current_rental_operator,
            after_first.current_rental_operator
        );
        assert_eq!(engine.epochs().len(), epochs_after_first);
    }

    #[test]
    fn test_rotation_advances_operator() {
        let mut engine = engine();
        let spacing = engine.config().seconds_between_epochs;

        engine.rotate_epoch(start_time() + spacing).unwrap();
        assert_eq!(
            engine.state().current_rental_operator,
            AccountId::new("rental.two")
        );

        engine.rotate_epoch(start_time() + 3 * spacing).unwrap();
        assert_eq!(
            engine.state().current_rental_operator,
            AccountId::new("rental.one")
        );
    }

    #[test]
    fn test_rotation_not_due_is_noop() {
        let mut engine = engine();
        engine.rotate_epoch(start_time() + 1).unwrap();
        assert_eq!(engine.state().last_epoch_start_time, start_time());
        assert_eq!(engine.epochs().len(), 1);
    }

    #[test]
    fn test_admin_gating() {
        let mut engine = engine();
        let stranger = AccountId::new("stranger");
        let admin = AccountId::new("pool.admin");

        let result = engine.add_admin(&stranger, AccountId::new("new.admin"));
        assert!(matches!(result, Err(Error::Unauthorized(_))));

        engine.add_admin(&admin, AccountId::new("new.admin")).unwrap();
        let duplicate = engine.add_admin(&admin, AccountId::new("new.admin"));
        assert!(matches!(duplicate, Err(Error::InvalidAdmin(_))));

        engine
            .remove_admin(&admin, &AccountId::new("new.admin"))
            .unwrap();
        let missing = engine.remove_admin(&admin, &AccountId::new("new.admin"));
        assert!(matches!(missing, Err(Error::NotAnAdmin(_))));
    }

    #[test]
    fn test_operator_admin_ops() {
        let mut engine = engine();
        let admin = AccountId::new("pool.admin");

        let duplicate = engine.add_rental_operator(&admin, AccountId::new("rental.one"));
        assert!(matches!(duplicate, Err(Error::InvalidOperator(_))));

        engine
            .add_rental_operator(&admin, AccountId::new("rental.four"))
            .unwrap();
        engine
            .remove_rental_operator(&admin, &AccountId::new("rental.four"))
            .unwrap();
        let missing =
            engine.remove_rental_operator(&admin, &AccountId::new("rental.four"));
        assert!(matches!(missing, Err(Error::NotAnOperator(_))));
    }

    #[test]
    fn test_set_rental_price_validates() {
        let mut engine = engine();
        let admin = AccountId::new("pool.admin");

        assert!(matches!(
            engine.set_rental_price(&admin, 0),
            Err(Error::InvalidAmount(0))
        ));
        engine.set_rental_price(&admin, 2_000_000).unwrap();
        assert_eq!(engine.state().unit_rental_price, 2_000_000);
    }

    #[test]
    fn test_stake_requires_account_for_deposit() {
        let mut engine = engine();
        let wallet = AccountId::new("alice");
        let result = engine.deposit(
            &wallet,
            Asset::new(ASSET_SCALE, Denom::Base),
            "stake",
            start_time(),
        );
        assert!(matches!(result, Err(Error::NoSuchAccount(_))));
    }

    #[test]
    fn test_noop_deposit_changes_nothing() {
        let mut engine = engine();
        let wallet = AccountId::new("alice");
        engine
            .deposit(
                &wallet,
                Asset::new(ASSET_SCALE, Denom::Base),
                "surprise airdrop",
                start_time(),
            )
            .unwrap();
        assert_eq!(engine.state().earning_balance, 0);
        assert_eq!(engine.state().revenue_pending, 0);
        assert!(engine.pending_instructions().is_empty());
    }
}

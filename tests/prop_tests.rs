//! Property-based tests for the accounting engine
//!
//! Checks the ledger invariants that must hold for arbitrary operation
//! sequences: conservation between the earning balance and staker
//! balances, allocator completeness, fee bounds, and the monotone
//! auto-compounding exchange rate.

use proptest::prelude::*;
use tidepool::{
    AccountId, Asset, Denom, ProtocolConfig, StakingEngine, ASSET_SCALE,
    INITIAL_EPOCH_START_TIME,
};

const DAY: u64 = 86_400;

#[derive(Debug, Clone)]
enum Op {
    Stake { tokens: i64 },
    Liquify { tokens: i64 },
    InstantRedeem { tokens: i64 },
    RequestRedeem { tokens: i64 },
    RevenueAndDistribute { tokens: i64 },
    ClaimRewards,
    ClaimAsStaked,
    Advance { days: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..=500).prop_map(|tokens| Op::Stake { tokens }),
        (1i64..=500).prop_map(|tokens| Op::Liquify { tokens }),
        (1i64..=500).prop_map(|tokens| Op::InstantRedeem { tokens }),
        (1i64..=500).prop_map(|tokens| Op::RequestRedeem { tokens }),
        (1i64..=500).prop_map(|tokens| Op::RevenueAndDistribute { tokens }),
        Just(Op::ClaimRewards),
        Just(Op::ClaimAsStaked),
        (1u64..=10).prop_map(|days| Op::Advance { days }),
    ]
}

fn fresh_engine() -> StakingEngine {
    StakingEngine::new(ProtocolConfig::default(), INITIAL_EPOCH_START_TIME)
}

fn alice() -> AccountId {
    AccountId::new("alice")
}

fn tide(tokens: i64) -> Asset {
    Asset::new(tokens * ASSET_SCALE, Denom::Base)
}

proptest! {
    /// The earning balance always equals the sum of staked balances, no
    /// matter which operations run in which order and which of them fail.
    #[test]
    fn prop_conservation_holds(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut engine = fresh_engine();
        let mut now = INITIAL_EPOCH_START_TIME;
        engine.stake(&alice(), now).unwrap();

        for op in ops {
            match op {
                Op::Stake { tokens } => {
                    let _ = engine.deposit(&alice(), tide(tokens), "stake", now);
                }
                Op::Liquify { tokens } => {
                    let _ = engine.liquify(&alice(), tokens * ASSET_SCALE, now);
                }
                Op::InstantRedeem { tokens } => {
                    let _ = engine.instant_redeem(&alice(), tokens * ASSET_SCALE, 0, now);
                }
                Op::RequestRedeem { tokens } => {
                    let _ = engine.request_redeem(&alice(), tokens * ASSET_SCALE, now);
                }
                Op::RevenueAndDistribute { tokens } => {
                    let _ = engine.deposit(&AccountId::new("revhub"), tide(tokens), "revenue", now);
                    let _ = engine.distribute(now);
                }
                Op::ClaimRewards => {
                    let _ = engine.claim_rewards(&alice(), now);
                }
                Op::ClaimAsStaked => {
                    let _ = engine.claim_as_staked(&alice(), now);
                }
                Op::Advance { days } => {
                    now += days * DAY;
                }
            }

            prop_assert_eq!(
                engine.state().earning_balance,
                engine.stakers().total_staked()
            );
            prop_assert!(engine.state().earning_balance >= 0);
            prop_assert!(engine.state().backing_balance >= 0);
        }
    }

    /// On success the allocator accounts for exactly the requested amount:
    /// queued commitments plus any fallback payout sum to the request.
    #[test]
    fn prop_allocator_accounts_for_full_request(
        staked in 1i64..=500,
        requested in 1i64..=500,
        days in 0u64..=20,
    ) {
        prop_assume!(requested <= staked);

        let mut engine = fresh_engine();
        let now = INITIAL_EPOCH_START_TIME;
        engine.stake(&alice(), now).unwrap();
        engine.deposit(&alice(), tide(staked), "stake", now).unwrap();

        let later = now + days * DAY;
        let before = engine.stakers().get(&alice()).unwrap().staked_balance;

        if engine.request_redeem(&alice(), requested * ASSET_SCALE, later).is_ok() {
            let after = engine.stakers().get(&alice()).unwrap().staked_balance;
            let queued = engine.requests().total_for_wallet(&alice());
            let fallback_paid = before - after;

            prop_assert_eq!(queued + fallback_paid, requested * ASSET_SCALE);
            prop_assert_eq!(
                engine.state().earning_balance,
                engine.stakers().total_staked()
            );
        }
    }

    /// Instant redemption never pays out more than the burned amount, and
    /// the fee plus payout leave at most one unit of truncation dust.
    #[test]
    fn prop_instant_redeem_fee_bounds(
        staked in 1i64..=1000,
        redeemed in 1i64..=1000,
    ) {
        prop_assume!(redeemed <= staked);

        let mut engine = fresh_engine();
        let now = INITIAL_EPOCH_START_TIME;
        engine.stake(&alice(), now).unwrap();
        engine.deposit(&alice(), tide(staked), "stake", now).unwrap();

        let payout = engine
            .instant_redeem(&alice(), redeemed * ASSET_SCALE, 0, now)
            .unwrap();
        let fee = engine.state().revenue_pending;

        prop_assert!(payout + fee <= redeemed * ASSET_SCALE);
        prop_assert!(redeemed * ASSET_SCALE - payout - fee <= 1);
        prop_assert!(payout <= redeemed * ASSET_SCALE);
    }

    /// Each distribution can only increase the backing behind every
    /// auto-compounding share.
    #[test]
    fn prop_exchange_rate_is_monotone(
        revenues in prop::collection::vec(1i64..=1000, 1..10),
    ) {
        let mut engine = fresh_engine();
        let mut now = INITIAL_EPOCH_START_TIME;
        engine.stake(&alice(), now).unwrap();
        engine.deposit(&alice(), tide(1000), "stake", now).unwrap();
        engine.liquify(&alice(), 500 * ASSET_SCALE, now).unwrap();

        let mut rate = engine.state().backing_balance as f64
            / engine.state().autocompounding_supply as f64;

        for tokens in revenues {
            engine
                .deposit(&AccountId::new("revhub"), tide(tokens), "revenue", now)
                .unwrap();
            engine.distribute(now).unwrap();
            now += DAY;

            let next = engine.state().backing_balance as f64
                / engine.state().autocompounding_supply as f64;
            prop_assert!(next >= rate);
            rate = next;
        }
    }

    /// Lazy sync never credits stakers more than the snapshot's earning
    /// bucket, regardless of how stake is split between them.
    #[test]
    fn prop_sync_payouts_bounded_by_bucket(
        stakes in prop::collection::vec(1i64..=500, 2..5),
        revenue in 1i64..=1000,
    ) {
        let mut engine = fresh_engine();
        let now = INITIAL_EPOCH_START_TIME;

        for (i, tokens) in stakes.iter().enumerate() {
            let wallet = AccountId::new(format!("staker{i}"));
            engine.stake(&wallet, now).unwrap();
            engine.deposit(&wallet, tide(*tokens), "stake", now).unwrap();
        }

        engine
            .deposit(&AccountId::new("revhub"), tide(revenue), "revenue", now)
            .unwrap();
        engine.distribute(now).unwrap();

        let bucket = engine
            .snapshots()
            .get(now)
            .unwrap()
            .earning_bucket;

        let mut total_claimed = 0i64;
        for i in 0..stakes.len() {
            let wallet = AccountId::new(format!("staker{i}"));
            if let Ok(claimed) = engine.claim_rewards(&wallet, now + 1) {
                prop_assert!(claimed <= bucket);
                total_claimed += claimed;
            }
        }

        prop_assert!(total_claimed <= bucket);
        prop_assert_eq!(
            engine.state().user_funds_bucket,
            bucket - total_claimed
        );
    }
}

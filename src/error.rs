//! Crate-wide error type.

use thiserror::Error;

/// Convenience alias used by every fallible operation in the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the accounting engine.
///
/// Four families:
/// - validation errors (bad input, always fatal to the operation)
/// - arithmetic errors (a protocol bound was approached, treated as a defect)
/// - state preconditions (retry later or pick a different target)
/// - consistency fuses (unreachable under correct bucket accounting)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    // ---- validation ----
    /// Amount is non-positive or above the protocol ceiling.
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// Amount is below the configured minimum for this operation.
    #[error("amount {amount} is below minimum {minimum}")]
    BelowMinimum {
        /// Offered amount.
        amount: i64,
        /// Configured minimum.
        minimum: i64,
    },

    /// Deposit or payout denominated in the wrong asset.
    #[error("wrong denomination: expected {expected}, got {got}")]
    WrongDenomination {
        /// Denomination the operation requires.
        expected: &'static str,
        /// Denomination actually supplied.
        got: &'static str,
    },

    /// Caller tried to liquify or redeem more than their staked balance.
    #[error("requested {requested} exceeds staked balance {staked}")]
    InsufficientStake {
        /// Requested amount.
        requested: i64,
        /// Caller's staked balance.
        staked: i64,
    },

    /// Caller is not in the admin set.
    #[error("{0} is not authorized for this operation")]
    Unauthorized(String),

    /// Account is already an admin.
    #[error("{0} is already an admin")]
    InvalidAdmin(String),

    /// Account is not an admin, so it cannot be removed.
    #[error("{0} is not an admin")]
    NotAnAdmin(String),

    /// Account is already a rental operator.
    #[error("{0} is already a rental operator")]
    InvalidOperator(String),

    /// Account is not a rental operator.
    #[error("{0} is not a rental operator")]
    NotAnOperator(String),

    /// Conversion output fell below the caller's minimum.
    #[error("output would be {output} but at least {minimum} was required")]
    OutputBelowMinimum {
        /// Output the conversion would produce.
        output: i64,
        /// Caller-supplied floor.
        minimum: i64,
    },

    // ---- arithmetic ----
    /// Addition or multiplication exceeded the asset-amount ceiling.
    #[error("overflow error")]
    Overflow,

    /// Subtraction would produce a negative amount.
    #[error("subtraction would result in negative number")]
    Underflow,

    /// Division by zero.
    #[error("divide by zero")]
    DivideByZero,

    // ---- state preconditions ----
    /// The wallet has no staker account yet.
    #[error("{0} has no staker account; use the stake action first")]
    NoSuchAccount(String),

    /// No epoch record for the given start time or operator.
    #[error("could not find epoch {0}")]
    NoSuchEpoch(u64),

    /// No live redemption request for the current redemption period.
    #[error("no redemption request for epoch {0}")]
    NoSuchRequest(u64),

    /// Claim attempted outside the redemption window.
    #[error("redemption window is closed; next window opens at {next_window}")]
    RedemptionWindowClosed {
        /// Unix time at which the next window opens.
        next_window: u64,
    },

    /// Scheduled operation invoked before its due time.
    #[error("too early; not due until {due}")]
    TooEarly {
        /// Unix time at which the operation becomes due.
        due: u64,
    },

    /// Operator rotation could not determine the next operator.
    #[error("rotation error: {0}")]
    RotationError(String),

    /// Claim invoked with a zero claimable balance.
    #[error("nothing to claim")]
    NothingToClaim,

    /// Reallocation invoked with an empty redemption reserve.
    #[error("there are no funds to reallocate")]
    NothingToReallocate,

    // ---- consistency fuses ----
    /// Truncated allocations summed to more than the amount being split.
    #[error("allocation sum exceeds the distributable amount")]
    AllocationOverrun,

    /// Buckets could not cover a request they should always cover.
    #[error("insufficient liquidity: {0}")]
    InsufficientLiquidity(String),
}

//! Core identifier and asset types shared across the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of smallest units per whole token (8 decimal places).
pub const ASSET_SCALE: i64 = 100_000_000;

/// Wallet, operator, or contract identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create an account identity.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// The three fixed denominations the protocol handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Denom {
    /// The base asset deposited into the protocol.
    Base,
    /// The earning share, minted 1:1 against staked base asset.
    Earning,
    /// The liquid auto-compounding share.
    AutoCompounding,
}

impl Denom {
    /// Ticker symbol for this denomination.
    pub fn symbol(&self) -> &'static str {
        match self {
            Denom::Base => "TIDE",
            Denom::Earning => "STIDE",
            Denom::AutoCompounding => "LSTIDE",
        }
    }
}

impl fmt::Display for Denom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A quantity of one denomination, in smallest units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Amount in smallest units.
    pub amount: i64,
    /// Denomination of the amount.
    pub denom: Denom,
}

impl Asset {
    /// Create an asset quantity.
    pub fn new(amount: i64, denom: Denom) -> Self {
        Self { amount, denom }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.amount / ASSET_SCALE;
        let frac = (self.amount % ASSET_SCALE).abs();
        write!(f, "{}.{:08} {}", whole, frac, self.denom)
    }
}

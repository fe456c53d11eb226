//! Per-depositor accounts
//!
//! Each wallet that interacts with the protocol gets one `StakerAccount`,
//! created on first interaction and never deleted. Accounts are owned
//! exclusively by the [`StakerStore`] and mutated only through engine
//! operations, each of which replays pending snapshots first.

use crate::types::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// One depositor's balances and sync cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakerAccount {
    /// Owning wallet.
    pub wallet: AccountId,

    /// Earning-share units staked by this wallet.
    pub staked_balance: i64,

    /// Base asset owed to this wallet, not yet withdrawn.
    pub claimable_balance: i64,

    /// Timestamp up to which distribution snapshots have been replayed.
    pub last_sync_time: u64,
}

impl StakerAccount {
    /// Create an empty account for a wallet.
    pub fn new(wallet: AccountId, now: u64) -> Self {
        Self {
            wallet,
            staked_balance: 0,
            claimable_balance: 0,
            last_sync_time: now,
        }
    }
}

/// Repository of all staker accounts.
#[derive(Debug, Default, Clone)]
pub struct StakerStore {
    accounts: HashMap<AccountId, StakerAccount>,
}

impl StakerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an account.
    pub fn get(&self, wallet: &AccountId) -> Option<&StakerAccount> {
        self.accounts.get(wallet)
    }

    /// Look up an account for mutation.
    pub fn get_mut(&mut self, wallet: &AccountId) -> Option<&mut StakerAccount> {
        self.accounts.get_mut(wallet)
    }

    /// Whether the wallet has an account.
    pub fn contains(&self, wallet: &AccountId) -> bool {
        self.accounts.contains_key(wallet)
    }

    /// Create an account if one does not exist yet.
    ///
    /// Returns true when a new row was created.
    pub fn create_if_absent(&mut self, wallet: &AccountId, now: u64) -> bool {
        if self.accounts.contains_key(wallet) {
            return false;
        }

        info!("opened staker account for {}", wallet);
        self.accounts
            .insert(wallet.clone(), StakerAccount::new(wallet.clone(), now));
        true
    }

    /// Sum of every staked balance; used to verify conservation.
    pub fn total_staked(&self) -> i64 {
        self.accounts.values().map(|a| a.staked_balance).sum()
    }

    /// Number of accounts ever created.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether the store has no accounts.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_if_absent() {
        let mut store = StakerStore::new();
        let wallet = AccountId::new("alice");

        assert!(store.create_if_absent(&wallet, 100));
        assert!(!store.create_if_absent(&wallet, 200));

        let account = store.get(&wallet).unwrap();
        assert_eq!(account.staked_balance, 0);
        assert_eq!(account.claimable_balance, 0);
        assert_eq!(account.last_sync_time, 100);
    }

    #[test]
    fn test_total_staked() {
        let mut store = StakerStore::new();
        store.create_if_absent(&AccountId::new("a"), 0);
        store.create_if_absent(&AccountId::new("b"), 0);

        store.get_mut(&AccountId::new("a")).unwrap().staked_balance = 40;
        store.get_mut(&AccountId::new("b")).unwrap().staked_balance = 60;

        assert_eq!(store.total_staked(), 100);
    }
}

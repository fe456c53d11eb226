//! Ecosystem fund accrual
//!
//! The ecosystem share of each distribution accrues to the configured
//! beneficiaries rather than being paid out inline. Rows track the live
//! balance plus a lifetime counter for audit.

use crate::error::Result;
use crate::math;
use crate::types::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Accrued balances for one beneficiary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcosystemAccount {
    /// Beneficiary account.
    pub beneficiary: AccountId,

    /// Base asset accrued and not yet paid out.
    pub balance: i64,

    /// Lifetime base asset ever received.
    pub total_received: i64,
}

/// Per-beneficiary accrual ledger for the ecosystem share.
#[derive(Debug, Default, Clone)]
pub struct EcosystemLedger {
    accounts: HashMap<AccountId, EcosystemAccount>,
}

impl EcosystemLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit a beneficiary, creating its row on first credit.
    pub fn credit(&mut self, beneficiary: &AccountId, amount: i64) -> Result<()> {
        let account = self
            .accounts
            .entry(beneficiary.clone())
            .or_insert_with(|| EcosystemAccount {
                beneficiary: beneficiary.clone(),
                balance: 0,
                total_received: 0,
            });

        account.balance = math::checked_add_i64(account.balance, amount)?;
        account.total_received = math::checked_add_i64(account.total_received, amount)?;

        debug!("credited {} to ecosystem beneficiary {}", amount, beneficiary);
        Ok(())
    }

    /// Look up a beneficiary's row.
    pub fn get(&self, beneficiary: &AccountId) -> Option<&EcosystemAccount> {
        self.accounts.get(beneficiary)
    }

    /// Sum of all live balances.
    pub fn total_balance(&self) -> i64 {
        self.accounts.values().map(|a| a.balance).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_accumulates() {
        let mut ledger = EcosystemLedger::new();
        let who = AccountId::new("eco.grants");

        ledger.credit(&who, 10).unwrap();
        ledger.credit(&who, 5).unwrap();

        let row = ledger.get(&who).unwrap();
        assert_eq!(row.balance, 15);
        assert_eq!(row.total_received, 15);
        assert_eq!(ledger.total_balance(), 15);
    }
}

//! External-ledger instructions
//!
//! The core never moves assets itself. It decides what should move and
//! appends [`LedgerInstruction`] values to an outbox that the host drains
//! and executes against the real asset ledger.

use crate::types::{AccountId, Asset};
use serde::{Deserialize, Serialize};

/// One asset movement the host must execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerInstruction {
    /// Mint new share units. `to` is the protocol itself when absent.
    Mint {
        /// Recipient of the minted units, if not the protocol.
        to: Option<AccountId>,
        /// Amount and denomination to mint.
        asset: Asset,
    },

    /// Burn share units held by the protocol.
    Burn {
        /// Amount and denomination to burn.
        asset: Asset,
    },

    /// Transfer protocol-held assets to an account.
    Transfer {
        /// Recipient.
        to: AccountId,
        /// Amount and denomination to move.
        asset: Asset,
        /// Memo forwarded with the transfer.
        memo: String,
    },
}

/// Memo attached to delegation transfers, parseable by the operator side.
pub fn delegation_memo(fallback_receiver: &AccountId, epoch_start: u64) -> String {
    format!("|delegate|{fallback_receiver}|{epoch_start}|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delegation_memo_format() {
        let memo = delegation_memo(&AccountId::new("pool.fallback"), 42);
        assert_eq!(memo, "|delegate|pool.fallback|42|");
    }
}

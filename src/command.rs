//! Deposit command decoding
//!
//! Incoming asset deposits carry a memo string describing the intended
//! operation. The memo is decoded exactly once at the boundary into a
//! closed [`DepositCommand`] enumeration; the engine's internal dispatch is
//! a match over that enum, never string inspection.
//!
//! Malformed or unrecognized memos decode to [`DepositCommand::NoOp`]: the
//! asset is kept but triggers no accounting change. This permissive policy
//! applies only to the memo itself; a recognized command still validates
//! its denomination and amounts strictly.

use crate::types::AccountId;

/// Decoded intent of an incoming deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositCommand {
    /// Base asset to stake; mints earning shares 1:1.
    Stake,

    /// Auto-compounding shares to convert back into staked earning shares.
    Unliquify,

    /// Protocol revenue awaiting the next distribution.
    Revenue,

    /// Rental payment: delegate `amount` whole units to `epoch` on behalf
    /// of `receiver`.
    Rent {
        /// Start time of the target epoch.
        epoch: u64,
        /// Account the rental benefits.
        receiver: AccountId,
        /// Whole units to rent.
        amount: i64,
    },

    /// Protocol-owned liquidity; joins the rental pool directly.
    Liquidity,

    /// Incentive funding; distributed with regular revenue.
    Incentive,

    /// Unrecognized memo; keep the asset, change nothing.
    NoOp,
}

impl DepositCommand {
    /// Decode a memo string.
    pub fn decode(memo: &str) -> Self {
        match memo {
            "stake" => return Self::Stake,
            "unliquify" => return Self::Unliquify,
            "revenue" => return Self::Revenue,
            "liquidity" => return Self::Liquidity,
            "incentive" => return Self::Incentive,
            _ => {}
        }

        if let Some(rest) = memo.strip_prefix("rent:") {
            let mut parts = rest.splitn(3, ':');

            let epoch = parts.next().and_then(|p| p.parse::<u64>().ok());
            let receiver = parts.next().filter(|p| !p.is_empty());
            let amount = parts.next().and_then(|p| p.parse::<i64>().ok());

            if let (Some(epoch), Some(receiver), Some(amount)) = (epoch, receiver, amount) {
                return Self::Rent {
                    epoch,
                    receiver: AccountId::new(receiver),
                    amount,
                };
            }
        }

        Self::NoOp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_simple_memos() {
        assert_eq!(DepositCommand::decode("stake"), DepositCommand::Stake);
        assert_eq!(DepositCommand::decode("unliquify"), DepositCommand::Unliquify);
        assert_eq!(DepositCommand::decode("revenue"), DepositCommand::Revenue);
        assert_eq!(DepositCommand::decode("liquidity"), DepositCommand::Liquidity);
        assert_eq!(DepositCommand::decode("incentive"), DepositCommand::Incentive);
    }

    #[test]
    fn test_decode_rent() {
        let cmd = DepositCommand::decode("rent:1710460800:gamer.one:500");
        assert_eq!(
            cmd,
            DepositCommand::Rent {
                epoch: 1710460800,
                receiver: AccountId::new("gamer.one"),
                amount: 500,
            }
        );
    }

    #[test]
    fn test_unrecognized_memos_are_noop() {
        assert_eq!(DepositCommand::decode(""), DepositCommand::NoOp);
        assert_eq!(DepositCommand::decode("hello"), DepositCommand::NoOp);
        assert_eq!(DepositCommand::decode("STAKE"), DepositCommand::NoOp);
        assert_eq!(DepositCommand::decode("rent:abc:x:5"), DepositCommand::NoOp);
        assert_eq!(DepositCommand::decode("rent:123"), DepositCommand::NoOp);
        assert_eq!(DepositCommand::decode("rent:123::5"), DepositCommand::NoOp);
        assert_eq!(DepositCommand::decode("rent:123:x:"), DepositCommand::NoOp);
    }
}

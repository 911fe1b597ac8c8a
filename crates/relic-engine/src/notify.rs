//! Memo parsing for inbound transfer notifications.
//!
//! Token transfers carry a memo whose first word selects what the engine
//! does with the funds; everything after a `:` or whitespace is free-form
//! and ignored. Asset transfers only require their memo to start with
//! `deposit`.

use relic_core::EngineError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The action a token-transfer memo requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMemo {
    /// Stage funds for a later redemption.
    Redeem,
    /// Stage funds for a later stake.
    Stake,
    /// A stake pool depositing rewards for distribution.
    Reward,
    /// Stage funds to cover tokenize/redeem fees.
    PayFee,
    /// Stage funds for a purchase.
    Buy,
    /// Top up a staged balance.
    Topup,
    /// A plain deposit into the staged balance.
    Deposit,
}

impl FromStr for TransferMemo {
    type Err = EngineError;

    fn from_str(memo: &str) -> Result<Self, Self::Err> {
        let tag = memo
            .trim()
            .split(|c: char| c == ':' || c.is_whitespace())
            .next()
            .unwrap_or("");
        match tag {
            "redeem" => Ok(Self::Redeem),
            "stake" => Ok(Self::Stake),
            "reward" => Ok(Self::Reward),
            "payfee" => Ok(Self::PayFee),
            "buy" => Ok(Self::Buy),
            "topup" => Ok(Self::Topup),
            "deposit" => Ok(Self::Deposit),
            _ => Err(EngineError::invalid(format!(
                "unknown transfer memo {memo:?}"
            ))),
        }
    }
}

/// Whether an asset-transfer memo marks a deposit.
#[must_use]
pub fn is_asset_deposit(memo: &str) -> bool {
    memo.trim().starts_with("deposit")
}

//! # relic-engine
//!
//! The entry-point surface of the Relic fractionalization engine.
//!
//! [`Engine`] wires the record tables from `relic-ledger` to the outside
//! world: authenticated actions (token creation, tokenization,
//! redemption, staking, fees), inbound transfer notifications dispatched
//! on their memo, and the collaborator seams the engine reads assets
//! from and settles through. Every operation is one all-or-nothing
//! transaction; outbound transfers dispatch only after commit.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod collaborators;
pub mod config;
pub mod deposits;
pub mod engine;
pub mod notify;

pub use collaborators::{
    AssetRecord, AssetRegistry, CustodyCall, CustodyLedger, FixedRateOracle, GroupInfo,
    MemoryAssetRegistry, RateOracle, RecordingCustody, RecordingSettlement, SettlementCall,
    SettlementLedger,
};
pub use config::{CONFIG_VERSION, EngineConfig, StakePoolConfig};
pub use deposits::{PendingDeposit, PendingDeposits};
pub use engine::{Engine, Receipt};
pub use notify::{TransferMemo, is_asset_deposit};

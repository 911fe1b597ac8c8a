//! # relic-ledger
//!
//! The persistent record tables of the Relic fractionalization engine:
//!
//! - [`TokenLedger`] — token definitions with supply-cap enforcement
//! - [`QuotaLedger`] — per-group tokenization quotas
//! - [`AssetPool`] — the escrow index freezing per-asset issuance
//! - [`BalanceLedger`] — internal staging balances for fees and deposits
//! - [`StakeBook`] — stake records and proportional reward distribution
//! - [`LedgerState`] — the arena composing all tables, with an
//!   all-or-nothing transaction wrapper
//!
//! Every table is an ownership-clear map of records addressed by
//! composite keys; mutations happen only inside a transaction.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod balance;
pub mod pool;
pub mod quota;
pub mod stake;
pub mod state;
pub mod token;

pub use balance::{BalanceLedger, BalanceRecord};
pub use pool::{AssetPool, PoolEntry};
pub use quota::{QuotaLedger, QuotaRecord};
pub use stake::{StakeBook, StakeRecord, distribute_rewards};
pub use state::{LedgerState, transact};
pub use token::{TokenDefinition, TokenLedger};

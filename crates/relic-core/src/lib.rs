//! # relic-core
//!
//! Core building blocks for the Relic fractionalization engine.
//!
//! This crate provides:
//! - Currency symbols and base-unit token amounts
//! - Asset, account, and group identifiers
//! - The engine-wide error taxonomy
//! - The trait-data model resolved from custody records
//! - The valuation engine mapping asset traits to issuance amounts
//!
//! Everything here is pure data and pure functions; the mutable record
//! tables live in `relic-ledger`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod amount;
pub mod error;
pub mod ids;
pub mod traits;
pub mod valuation;

pub use amount::{Symbol, TokenAmount};
pub use error::{EngineError, Result};
pub use ids::{AccountId, AssetId, GroupId};
pub use traits::{TraitSet, TraitValue};
pub use valuation::{DiscreteFactor, ValuationRule, compute_issue_amount};

//! The combined ledger arena and its transaction wrapper.
//!
//! Every externally triggered operation mutates the arena through
//! [`transact`]: the state is snapshotted, the closure runs, and on any
//! error the snapshot is restored wholesale. Partial effects of a failed
//! operation are therefore impossible by construction.

use relic_core::{EngineError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{AssetPool, BalanceLedger, QuotaLedger, StakeBook, TokenLedger};

/// All record tables of the engine, composed into one cloneable arena.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Token definitions and supply.
    pub tokens: TokenLedger,
    /// Per-group tokenization quotas.
    pub quotas: QuotaLedger,
    /// The per-asset escrow pool.
    pub pool: AssetPool,
    /// Internal staging balances.
    pub balances: BalanceLedger,
    /// Stake records and accrued rewards.
    pub stakes: StakeBook,
}

impl LedgerState {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against this arena all-or-nothing.
    ///
    /// # Errors
    ///
    /// Propagates the closure's error after restoring the pre-call state.
    pub fn transact<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        transact(self, f)
    }

    /// Check the cross-table invariants.
    ///
    /// For every token, the issued supply must equal the sum of frozen
    /// pool issuance and stay within the maximum; every quota's live
    /// count must stay within its cap.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` naming the first broken invariant.
    pub fn audit(&self) -> Result<()> {
        for token in self.tokens.iter() {
            let pooled = self.pool.issued_total(token.symbol);
            if token.issued_supply != pooled {
                return Err(EngineError::invariant(format!(
                    "token {} has issued supply {} but pool entries sum to {}",
                    token.symbol, token.issued_supply, pooled
                )));
            }
            if token.issued_supply > token.maximum_supply {
                return Err(EngineError::invariant(format!(
                    "token {} issued {} past its maximum {}",
                    token.symbol, token.issued_supply, token.maximum_supply
                )));
            }
        }
        for quota in self.quotas.iter() {
            if quota.currently_tokenized > quota.max_assets_to_tokenize {
                return Err(EngineError::invariant(format!(
                    "group {} has {} assets tokenized past its cap {}",
                    quota.group, quota.currently_tokenized, quota.max_assets_to_tokenize
                )));
            }
        }
        Ok(())
    }
}

/// Run `f` against a cloneable state all-or-nothing.
///
/// The state is snapshotted before the call; if `f` fails, the snapshot
/// is restored and the error propagated unchanged.
///
/// # Errors
///
/// Propagates the closure's error.
pub fn transact<S: Clone, T>(state: &mut S, f: impl FnOnce(&mut S) -> Result<T>) -> Result<T> {
    let snapshot = state.clone();
    match f(state) {
        Ok(value) => Ok(value),
        Err(err) => {
            debug!(error = %err, "rolling back failed transaction");
            *state = snapshot;
            Err(err)
        }
    }
}

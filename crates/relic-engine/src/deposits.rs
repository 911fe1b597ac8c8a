//! Pending asset deposits.
//!
//! Assets transferred into custody with a deposit memo are staged here
//! until their owner tokenizes them. Merges are sorted deduplicating
//! unions, so a replayed deposit notification leaves the set unchanged.

use chrono::{DateTime, Utc};
use relic_core::{AccountId, AssetId, EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One depositor's staged asset ids, sorted and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDeposit {
    /// The depositing account.
    pub depositor: AccountId,
    /// Staged asset ids, ascending, unique.
    pub assets: Vec<AssetId>,
    /// When the set last changed.
    pub updated_at: DateTime<Utc>,
}

/// The table of pending deposits, keyed by depositor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDeposits {
    records: BTreeMap<AccountId, PendingDeposit>,
}

impl PendingDeposits {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge asset ids into a depositor's set by sorted union.
    ///
    /// Idempotent: merging ids that are already staged changes nothing.
    pub fn merge(&mut self, depositor: &AccountId, assets: &[AssetId]) {
        let record = self
            .records
            .entry(depositor.clone())
            .or_insert_with(|| PendingDeposit {
                depositor: depositor.clone(),
                assets: Vec::new(),
                updated_at: Utc::now(),
            });
        record.assets.extend_from_slice(assets);
        record.assets.sort_unstable();
        record.assets.dedup();
        record.updated_at = Utc::now();
        debug!(depositor = %depositor, staged = record.assets.len(), "merged asset deposit");
    }

    /// Remove specific asset ids from a depositor's set, all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the depositor has no set or any listed id
    /// is not staged; nothing is removed in that case.
    pub fn claim(&mut self, depositor: &AccountId, assets: &[AssetId]) -> Result<()> {
        let record = self.records.get_mut(depositor).ok_or_else(|| {
            EngineError::not_found(format!("{depositor} has no pending deposits"))
        })?;
        for asset in assets {
            if record.assets.binary_search(asset).is_err() {
                return Err(EngineError::not_found(format!(
                    "asset {asset} was not deposited by {depositor}"
                )));
            }
        }
        record.assets.retain(|a| !assets.contains(a));
        if record.assets.is_empty() {
            self.records.remove(depositor);
        }
        Ok(())
    }

    /// Look up a depositor's staged set.
    #[must_use]
    pub fn get(&self, depositor: &AccountId) -> Option<&PendingDeposit> {
        self.records.get(depositor)
    }

    /// Check whether an asset is staged by a depositor.
    #[must_use]
    pub fn contains(&self, depositor: &AccountId, asset: AssetId) -> bool {
        self.records
            .get(depositor)
            .is_some_and(|r| r.assets.binary_search(&asset).is_ok())
    }
}

//! The escrow pool: per-asset issuance records.
//!
//! A [`PoolEntry`] freezes the exact amount minted for one asset at
//! tokenization time. Redemption must present exactly that amount —
//! never a recomputed valuation, since mutable trait data may have
//! changed since the mint. The existence of an entry is itself the proof
//! that the backing asset is held in escrow.

use relic_core::{AssetId, EngineError, Result, Symbol, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One escrowed asset and its frozen issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntry {
    /// The escrowed asset.
    pub asset: AssetId,
    /// Base units issued for this asset, frozen at mint time.
    pub issued_units: u64,
}

/// The escrow index, keyed by asset id within each token's namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPool {
    entries: BTreeMap<(Symbol, AssetId), PoolEntry>,
}

impl AssetPool {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an asset entering escrow.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEntry` if the asset is already pooled under this
    /// token — an asset cannot be tokenized twice without being redeemed
    /// first.
    pub fn escrow(&mut self, token: Symbol, asset: AssetId, issued_units: u64) -> Result<()> {
        if self.entries.contains_key(&(token, asset)) {
            return Err(EngineError::duplicate(format!(
                "asset {asset} is already in the {token} pool"
            )));
        }
        self.entries.insert(
            (token, asset),
            PoolEntry {
                asset,
                issued_units,
            },
        );
        Ok(())
    }

    /// Release an asset from escrow against the exact frozen amount.
    ///
    /// Returns the stored issuance and deletes the entry.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the asset is not pooled and
    /// `AmountMismatch` when `presented_units` differs from the frozen
    /// amount; the entry is left intact in that case.
    pub fn release(
        &mut self,
        token: Symbol,
        asset: AssetId,
        presented_units: u64,
    ) -> Result<u64> {
        let entry = self.entries.get(&(token, asset)).ok_or_else(|| {
            EngineError::not_found(format!("asset {asset} is not in the {token} pool"))
        })?;
        if entry.issued_units != presented_units {
            return Err(EngineError::AmountMismatch {
                expected: TokenAmount::new(token, entry.issued_units).to_string(),
                presented: TokenAmount::new(token, presented_units).to_string(),
            });
        }
        let entry = self
            .entries
            .remove(&(token, asset))
            .ok_or_else(|| EngineError::invariant("pool entry vanished during release"))?;
        Ok(entry.issued_units)
    }

    /// Look up the frozen issuance for an asset, if pooled.
    #[must_use]
    pub fn get(&self, token: Symbol, asset: AssetId) -> Option<&PoolEntry> {
        self.entries.get(&(token, asset))
    }

    /// Remove and return every entry of a token's pool, in asset order.
    pub fn drain_token(&mut self, token: Symbol) -> Vec<PoolEntry> {
        let keys: Vec<_> = self
            .entries
            .range((token, AssetId::new(0))..=(token, AssetId::new(u64::MAX)))
            .map(|(k, _)| *k)
            .collect();
        keys.iter()
            .filter_map(|k| self.entries.remove(k))
            .collect()
    }

    /// Sum of frozen issuance over a token's pool, in base units.
    #[must_use]
    pub fn issued_total(&self, token: Symbol) -> u64 {
        self.entries
            .range((token, AssetId::new(0))..=(token, AssetId::new(u64::MAX)))
            .map(|(_, e)| e.issued_units)
            .sum()
    }

    /// Number of pooled assets for a token.
    #[must_use]
    pub fn len(&self, token: Symbol) -> usize {
        self.entries
            .range((token, AssetId::new(0))..=(token, AssetId::new(u64::MAX)))
            .count()
    }

    /// Check whether a token's pool is empty.
    #[must_use]
    pub fn is_empty(&self, token: Symbol) -> bool {
        self.len(token) == 0
    }
}

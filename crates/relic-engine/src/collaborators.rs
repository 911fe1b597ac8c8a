//! External collaborator seams.
//!
//! The engine never holds assets or token supplies itself; it reads
//! asset and group records from an [`AssetRegistry`], asks a
//! [`SettlementLedger`] to execute token operations, a [`CustodyLedger`]
//! to move assets, and a [`RateOracle`] for fee conversion rates. The
//! in-memory implementations here back the integration tests and serve
//! embedders as reference doubles.

use relic_core::{
    AccountId, AssetId, EngineError, GroupId, Result, Symbol, TokenAmount, TraitSet,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A custody-side asset record as the engine sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// The asset id.
    pub asset: AssetId,
    /// The collection the asset belongs to.
    pub collection: AccountId,
    /// The group (template) the asset was minted from.
    pub group: GroupId,
    /// Immutable trait data declared on the group.
    pub template_traits: TraitSet,
    /// Immutable trait data on the asset itself.
    pub immutable_traits: TraitSet,
    /// Mutable trait data on the asset.
    pub mutable_traits: TraitSet,
}

impl AssetRecord {
    /// The asset's effective trait set, layered mutable-over-immutable.
    #[must_use]
    pub fn resolved_traits(&self) -> TraitSet {
        TraitSet::resolve(
            &self.template_traits,
            &self.immutable_traits,
            &self.mutable_traits,
        )
    }
}

/// Group metadata relevant to valuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    /// The group id.
    pub group: GroupId,
    /// The collection that owns the group.
    pub collection: AccountId,
    /// Declared number of mintable assets, the valuation slot count.
    pub slots: u32,
}

/// Read access to asset, group, and authorization records.
pub trait AssetRegistry {
    /// Look up an asset record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown asset.
    fn asset(&self, asset: AssetId) -> Result<AssetRecord>;

    /// Look up group metadata.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown group.
    fn group(&self, group: GroupId) -> Result<GroupInfo>;

    /// Whether `account` is on the collection's authorization list.
    fn is_authorized(&self, collection: &AccountId, account: &AccountId) -> bool;
}

/// Outbound token operations, executed by an external ledger.
pub trait SettlementLedger {
    /// Request creation of a currency on `ledger` with a supply cap.
    ///
    /// # Errors
    ///
    /// Implementation-defined; a failure surfaces after commit.
    fn create(&mut self, ledger: &AccountId, symbol: Symbol, maximum_supply: u64) -> Result<()>;

    /// Request issuance of `amount` to the engine's own holdings.
    ///
    /// # Errors
    ///
    /// Implementation-defined; a failure surfaces after commit.
    fn issue(&mut self, ledger: &AccountId, amount: TokenAmount, memo: &str) -> Result<()>;

    /// Request a transfer of `amount` to `to`.
    ///
    /// # Errors
    ///
    /// Implementation-defined; a failure surfaces after commit.
    fn transfer(
        &mut self,
        ledger: &AccountId,
        to: &AccountId,
        amount: TokenAmount,
        memo: &str,
    ) -> Result<()>;
}

/// Outbound asset custody transfers.
pub trait CustodyLedger {
    /// Request a transfer of `assets` to `to`.
    ///
    /// # Errors
    ///
    /// Implementation-defined; a failure surfaces after commit.
    fn transfer(&mut self, to: &AccountId, assets: &[AssetId], memo: &str) -> Result<()>;
}

/// Read-only exchange rates for fee conversion.
pub trait RateOracle {
    /// The `base → quote` rate: one whole `base` is worth `rate` whole
    /// `quote`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the pair is not quoted.
    fn rate(&self, base: Symbol, quote: Symbol) -> Result<f64>;
}

/// An in-memory asset registry for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetRegistry {
    assets: BTreeMap<AssetId, AssetRecord>,
    groups: BTreeMap<GroupId, GroupInfo>,
    authorized: BTreeMap<AccountId, BTreeSet<AccountId>>,
}

impl MemoryAssetRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a group.
    pub fn insert_group(&mut self, info: GroupInfo) {
        self.groups.insert(info.group, info);
    }

    /// Insert or replace an asset record.
    pub fn insert_asset(&mut self, record: AssetRecord) {
        self.assets.insert(record.asset, record);
    }

    /// Add `account` to a collection's authorization list.
    pub fn authorize(&mut self, collection: &AccountId, account: &AccountId) {
        self.authorized
            .entry(collection.clone())
            .or_default()
            .insert(account.clone());
    }

    /// Overwrite one mutable trait on an asset, if it exists.
    pub fn set_mutable_trait(
        &mut self,
        asset: AssetId,
        name: impl Into<String>,
        value: impl Into<relic_core::TraitValue>,
    ) {
        if let Some(record) = self.assets.get_mut(&asset) {
            record.mutable_traits.set(name, value);
        }
    }
}

impl AssetRegistry for MemoryAssetRegistry {
    fn asset(&self, asset: AssetId) -> Result<AssetRecord> {
        self.assets
            .get(&asset)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("asset {asset} does not exist")))
    }

    fn group(&self, group: GroupId) -> Result<GroupInfo> {
        self.groups
            .get(&group)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("group {group} does not exist")))
    }

    fn is_authorized(&self, collection: &AccountId, account: &AccountId) -> bool {
        self.authorized
            .get(collection)
            .is_some_and(|list| list.contains(account))
    }
}

/// One recorded settlement request.
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementCall {
    /// A currency creation request.
    Create {
        /// Target ledger.
        ledger: AccountId,
        /// The new currency.
        symbol: Symbol,
        /// Its supply cap, in base units.
        maximum_supply: u64,
    },
    /// An issuance request.
    Issue {
        /// Target ledger.
        ledger: AccountId,
        /// Amount issued.
        amount: TokenAmount,
        /// Free-form memo.
        memo: String,
    },
    /// A transfer request.
    Transfer {
        /// Target ledger.
        ledger: AccountId,
        /// Recipient.
        to: AccountId,
        /// Amount transferred.
        amount: TokenAmount,
        /// Free-form memo.
        memo: String,
    },
}

/// A settlement ledger that records every request and always succeeds.
#[derive(Debug, Clone, Default)]
pub struct RecordingSettlement {
    /// Every request, in dispatch order.
    pub calls: Vec<SettlementCall>,
}

impl RecordingSettlement {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded transfers to `to`, in order.
    #[must_use]
    pub fn transfers_to(&self, to: &AccountId) -> Vec<(TokenAmount, String)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SettlementCall::Transfer {
                    to: dest,
                    amount,
                    memo,
                    ..
                } if dest == to => Some((*amount, memo.clone())),
                _ => None,
            })
            .collect()
    }
}

impl SettlementLedger for RecordingSettlement {
    fn create(&mut self, ledger: &AccountId, symbol: Symbol, maximum_supply: u64) -> Result<()> {
        self.calls.push(SettlementCall::Create {
            ledger: ledger.clone(),
            symbol,
            maximum_supply,
        });
        Ok(())
    }

    fn issue(&mut self, ledger: &AccountId, amount: TokenAmount, memo: &str) -> Result<()> {
        self.calls.push(SettlementCall::Issue {
            ledger: ledger.clone(),
            amount,
            memo: memo.to_string(),
        });
        Ok(())
    }

    fn transfer(
        &mut self,
        ledger: &AccountId,
        to: &AccountId,
        amount: TokenAmount,
        memo: &str,
    ) -> Result<()> {
        self.calls.push(SettlementCall::Transfer {
            ledger: ledger.clone(),
            to: to.clone(),
            amount,
            memo: memo.to_string(),
        });
        Ok(())
    }
}

/// One recorded custody transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustodyCall {
    /// Recipient.
    pub to: AccountId,
    /// Assets moved.
    pub assets: Vec<AssetId>,
    /// Free-form memo.
    pub memo: String,
}

/// A custody ledger that records every request and always succeeds.
#[derive(Debug, Clone, Default)]
pub struct RecordingCustody {
    /// Every request, in dispatch order.
    pub calls: Vec<CustodyCall>,
}

impl RecordingCustody {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CustodyLedger for RecordingCustody {
    fn transfer(&mut self, to: &AccountId, assets: &[AssetId], memo: &str) -> Result<()> {
        self.calls.push(CustodyCall {
            to: to.clone(),
            assets: assets.to_vec(),
            memo: memo.to_string(),
        });
        Ok(())
    }
}

/// A fixed-rate oracle seeded with explicit pair quotes.
#[derive(Debug, Clone, Default)]
pub struct FixedRateOracle {
    rates: BTreeMap<(Symbol, Symbol), f64>,
}

impl FixedRateOracle {
    /// Create an oracle with no quotes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Quote a pair, builder-style.
    #[must_use]
    pub fn with_rate(mut self, base: Symbol, quote: Symbol, rate: f64) -> Self {
        self.set_rate(base, quote, rate);
        self
    }

    /// Quote a pair.
    pub fn set_rate(&mut self, base: Symbol, quote: Symbol, rate: f64) {
        self.rates.insert((base, quote), rate);
    }
}

impl RateOracle for FixedRateOracle {
    fn rate(&self, base: Symbol, quote: Symbol) -> Result<f64> {
        self.rates.get(&(base, quote)).copied().ok_or_else(|| {
            EngineError::not_found(format!("no rate quoted for {base} -> {quote}"))
        })
    }
}

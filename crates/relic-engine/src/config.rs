//! Engine configuration: fee schedule and the stake-pool registry.

use relic_core::{AccountId, EngineError, Result, Symbol, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current config layout version, stored with the record.
pub const CONFIG_VERSION: &str = "1.0";

/// A registered stake pool: which token is staked into it and which
/// currency its reward deposits arrive in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakePoolConfig {
    /// The pool's account; reward deposits must come from it.
    pub pool: AccountId,
    /// The token stakers lock up.
    pub stake_token: Symbol,
    /// The currency the pool deposits rewards in.
    pub reward_token: Symbol,
}

/// The engine's singleton configuration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Config layout version.
    pub version: String,
    /// The account allowed to change fees and register stake pools.
    pub admin: AccountId,
    /// Settlement ledger used for currencies the engine did not create
    /// (fee currencies staged by callers and withdrawn later).
    pub default_settlement: AccountId,
    /// Fee charged per tokenization call, if any.
    pub tokenize_fee: Option<TokenAmount>,
    /// Fee charged per redemption, if any.
    pub redeem_fee: Option<TokenAmount>,
    /// Registered stake pools, keyed by pool account.
    pub stake_pools: BTreeMap<AccountId, StakePoolConfig>,
}

impl EngineConfig {
    /// Create a fresh config with no fees and no stake pools.
    #[must_use]
    pub fn new(admin: AccountId, default_settlement: AccountId) -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            admin,
            default_settlement,
            tokenize_fee: None,
            redeem_fee: None,
            stake_pools: BTreeMap::new(),
        }
    }

    /// Look up a stake pool by its account.
    #[must_use]
    pub fn stake_pool(&self, pool: &AccountId) -> Option<&StakePoolConfig> {
        self.stake_pools.get(pool)
    }

    /// Find the pool that accepts stakes in `stake_token`.
    #[must_use]
    pub fn pool_for_stake_token(&self, stake_token: Symbol) -> Option<&StakePoolConfig> {
        self.stake_pools
            .values()
            .find(|p| p.stake_token == stake_token)
    }

    /// Register a stake pool.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEntry` when the pool account is already
    /// registered.
    pub fn register_stake_pool(&mut self, pool: StakePoolConfig) -> Result<()> {
        if self.stake_pools.contains_key(&pool.pool) {
            return Err(EngineError::duplicate(format!(
                "stake pool {} is already registered",
                pool.pool
            )));
        }
        self.stake_pools.insert(pool.pool.clone(), pool);
        Ok(())
    }
}

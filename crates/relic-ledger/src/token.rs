//! Token definitions and the supply ledger.
//!
//! A [`TokenDefinition`] is created once per currency symbol and mutated
//! by every tokenize/redeem. The supply invariant
//! `0 <= issued_supply <= maximum_supply` holds at every point between
//! transactions; [`TokenLedger::mint`] and [`TokenLedger::burn`] are the
//! only ways issued supply moves.

use chrono::{DateTime, Utc};
use relic_core::{AccountId, EngineError, GroupId, Result, Symbol, TokenAmount, ValuationRule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A fractional token backed by a set of custodied asset groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenDefinition {
    /// The currency symbol; unique key of the definition.
    pub symbol: Symbol,
    /// Hard cap on issued supply, in base units.
    pub maximum_supply: u64,
    /// Currently issued supply, in base units.
    pub issued_supply: u64,
    /// The collection the backing assets belong to.
    pub collection: AccountId,
    /// The account allowed to erase the token and change its rules.
    pub authorized_account: AccountId,
    /// The groups whose assets may be fractionalized into this token.
    pub groups: Vec<GroupId>,
    /// The external settlement ledger that executes token transfers.
    pub settlement_ledger: AccountId,
    /// Per-trait pricing rules consumed by the valuation engine.
    pub rules: Vec<ValuationRule>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TokenDefinition {
    /// The unissued remainder returned to the creator on erasure.
    #[must_use]
    pub const fn remainder(&self) -> u64 {
        self.maximum_supply - self.issued_supply
    }

    /// The issued supply as a displayable amount.
    #[must_use]
    pub const fn issued(&self) -> TokenAmount {
        TokenAmount::new(self.symbol, self.issued_supply)
    }
}

/// The table of token definitions, keyed by symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenLedger {
    tokens: BTreeMap<Symbol, TokenDefinition>,
}

impl TokenLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new token definition.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEntry` if the symbol already exists and
    /// `InvalidArgument` if the maximum supply is zero.
    pub fn create(&mut self, definition: TokenDefinition) -> Result<()> {
        if definition.maximum_supply == 0 {
            return Err(EngineError::invalid(format!(
                "token {} must declare a positive maximum supply",
                definition.symbol
            )));
        }
        if definition.issued_supply != 0 {
            return Err(EngineError::invalid(format!(
                "token {} must start with zero issued supply",
                definition.symbol
            )));
        }
        if self.tokens.contains_key(&definition.symbol) {
            return Err(EngineError::duplicate(format!(
                "token symbol {} already exists",
                definition.symbol
            )));
        }
        self.tokens.insert(definition.symbol, definition);
        Ok(())
    }

    /// Look up a token definition.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the symbol is unknown.
    pub fn get(&self, symbol: Symbol) -> Result<&TokenDefinition> {
        self.tokens
            .get(&symbol)
            .ok_or_else(|| EngineError::not_found(format!("token {symbol} not found")))
    }

    /// Look up a token definition mutably.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the symbol is unknown.
    pub fn get_mut(&mut self, symbol: Symbol) -> Result<&mut TokenDefinition> {
        self.tokens
            .get_mut(&symbol)
            .ok_or_else(|| EngineError::not_found(format!("token {symbol} not found")))
    }

    /// Find the token whose eligible groups include `group`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no token covers the group.
    pub fn find_by_group(&self, group: GroupId) -> Result<&TokenDefinition> {
        self.tokens
            .values()
            .find(|t| t.groups.contains(&group))
            .ok_or_else(|| {
                EngineError::not_found(format!("no token covers group {group}"))
            })
    }

    /// Add `amount` base units to issued supply.
    ///
    /// # Errors
    ///
    /// Returns `SupplyExceeded` when the mint would push issued supply
    /// past the maximum, `NotFound` for an unknown symbol.
    pub fn mint(&mut self, symbol: Symbol, amount: u64) -> Result<()> {
        let token = self.get_mut(symbol)?;
        let issued = token.issued_supply.checked_add(amount).ok_or_else(|| {
            EngineError::invariant(format!("issued supply overflow for {symbol}"))
        })?;
        if issued > token.maximum_supply {
            return Err(EngineError::supply_exceeded(format!(
                "minting {} would issue {} of a maximum {}",
                TokenAmount::new(symbol, amount),
                TokenAmount::new(symbol, issued),
                TokenAmount::new(symbol, token.maximum_supply),
            )));
        }
        token.issued_supply = issued;
        token.updated_at = Utc::now();
        Ok(())
    }

    /// Subtract `amount` base units from issued supply.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` on underflow; unreachable with
    /// correct bookkeeping and treated as an assertion.
    pub fn burn(&mut self, symbol: Symbol, amount: u64) -> Result<()> {
        let token = self.get_mut(symbol)?;
        token.issued_supply = token.issued_supply.checked_sub(amount).ok_or_else(|| {
            EngineError::invariant(format!(
                "burning {} exceeds issued supply {}",
                TokenAmount::new(symbol, amount),
                token.issued(),
            ))
        })?;
        token.updated_at = Utc::now();
        Ok(())
    }

    /// Replace the valuation rules of a token.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown symbol and `InvalidArgument`
    /// when any rule fails validation.
    pub fn set_rules(&mut self, symbol: Symbol, rules: Vec<ValuationRule>) -> Result<()> {
        for rule in &rules {
            rule.validate()?;
        }
        let token = self.get_mut(symbol)?;
        token.rules = rules;
        token.updated_at = Utc::now();
        Ok(())
    }

    /// Remove a token definition, returning it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the symbol is unknown.
    pub fn remove(&mut self, symbol: Symbol) -> Result<TokenDefinition> {
        self.tokens
            .remove(&symbol)
            .ok_or_else(|| EngineError::not_found(format!("token {symbol} not found")))
    }

    /// Iterate all definitions in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = &TokenDefinition> {
        self.tokens.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard() -> Symbol {
        Symbol::new("SHARD", 4).expect("symbol")
    }

    fn definition(max: u64) -> TokenDefinition {
        let now = Utc::now();
        TokenDefinition {
            symbol: shard(),
            maximum_supply: max,
            issued_supply: 0,
            collection: "artcollect".into(),
            authorized_account: "curator".into(),
            groups: vec![GroupId::new(7)],
            settlement_ledger: "token.ledger".into(),
            rules: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn create_and_lookup() {
        let mut ledger = TokenLedger::new();
        ledger.create(definition(1_000)).expect("create");
        assert_eq!(ledger.get(shard()).expect("get").maximum_supply, 1_000);
        assert_eq!(
            ledger.find_by_group(GroupId::new(7)).expect("by group").symbol,
            shard()
        );
    }

    #[test]
    fn duplicate_symbol_rejected() {
        let mut ledger = TokenLedger::new();
        ledger.create(definition(1_000)).expect("create");
        let err = ledger.create(definition(2_000)).expect_err("duplicate");
        assert!(matches!(err, EngineError::DuplicateEntry { .. }));
    }

    #[test]
    fn zero_supply_rejected() {
        let mut ledger = TokenLedger::new();
        assert!(ledger.create(definition(0)).is_err());
    }

    #[test]
    fn mint_up_to_maximum() {
        let mut ledger = TokenLedger::new();
        ledger.create(definition(1_000)).expect("create");
        ledger.mint(shard(), 600).expect("mint");
        ledger.mint(shard(), 400).expect("mint to cap");
        assert_eq!(ledger.get(shard()).expect("get").issued_supply, 1_000);
    }

    #[test]
    fn mint_past_maximum_is_supply_exceeded() {
        let mut ledger = TokenLedger::new();
        ledger.create(definition(1_000)).expect("create");
        ledger.mint(shard(), 999).expect("mint");
        let err = ledger.mint(shard(), 2).expect_err("overflow");
        assert!(matches!(err, EngineError::SupplyExceeded { .. }));
        // Failed mint leaves supply untouched.
        assert_eq!(ledger.get(shard()).expect("get").issued_supply, 999);
    }

    #[test]
    fn burn_returns_supply() {
        let mut ledger = TokenLedger::new();
        ledger.create(definition(1_000)).expect("create");
        ledger.mint(shard(), 500).expect("mint");
        ledger.burn(shard(), 500).expect("burn");
        assert_eq!(ledger.get(shard()).expect("get").issued_supply, 0);
    }

    #[test]
    fn burn_underflow_is_invariant_violation() {
        let mut ledger = TokenLedger::new();
        ledger.create(definition(1_000)).expect("create");
        ledger.mint(shard(), 10).expect("mint");
        let err = ledger.burn(shard(), 11).expect_err("underflow");
        assert!(matches!(err, EngineError::InvariantViolation { .. }));
    }

    #[test]
    fn unknown_symbol_is_not_found() {
        let mut ledger = TokenLedger::new();
        assert!(matches!(
            ledger.mint(shard(), 1).expect_err("missing"),
            EngineError::NotFound { .. }
        ));
    }

    #[test]
    fn set_rules_validates() {
        let mut ledger = TokenLedger::new();
        ledger.create(definition(1_000)).expect("create");
        let bad = ValuationRule::linear("rarity", 0.0, 1.0, 0.0, 1.0, 2.0);
        assert!(ledger.set_rules(shard(), vec![bad]).is_err());

        let good = ValuationRule::linear("rarity", 0.0, 1.0, 0.5, 1.0, 2.0);
        ledger.set_rules(shard(), vec![good]).expect("set rules");
        assert_eq!(ledger.get(shard()).expect("get").rules.len(), 1);
    }

    #[test]
    fn remove_returns_definition() {
        let mut ledger = TokenLedger::new();
        ledger.create(definition(1_000)).expect("create");
        ledger.mint(shard(), 250).expect("mint");
        let def = ledger.remove(shard()).expect("remove");
        assert_eq!(def.remainder(), 750);
        assert!(ledger.get(shard()).is_err());
    }
}

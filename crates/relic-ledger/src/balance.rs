//! Internal staging balances.
//!
//! Balances hold funds the engine has received but not yet committed:
//! deposits awaiting a redeem or stake, collected fees, and amounts
//! awaiting withdrawal. A record is an ordered list of per-currency
//! slots; debits are all-or-nothing across their whole currency list.

use relic_core::{AccountId, EngineError, Result, Symbol, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One account's staged balances, currency-unique, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRecord {
    slots: Vec<(Symbol, u64)>,
}

impl BalanceRecord {
    /// The staged amount for a currency, zero if absent.
    #[must_use]
    pub fn amount_of(&self, currency: Symbol) -> u64 {
        self.slots
            .iter()
            .find(|(sym, _)| *sym == currency)
            .map_or(0, |(_, units)| *units)
    }

    /// All slots in insertion order.
    #[must_use]
    pub fn slots(&self) -> &[(Symbol, u64)] {
        &self.slots
    }
}

/// The table of staging balances, keyed by account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLedger {
    accounts: BTreeMap<AccountId, BalanceRecord>,
}

impl BalanceLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an amount into an account, creating the record and the
    /// currency slot as needed. Crediting zero is a no-op.
    pub fn credit(&mut self, account: &AccountId, amount: TokenAmount) {
        if amount.is_zero() {
            return;
        }
        let record = self.accounts.entry(account.clone()).or_default();
        if let Some((_, units)) = record
            .slots
            .iter_mut()
            .find(|(sym, _)| *sym == amount.symbol())
        {
            *units = units.saturating_add(amount.units());
        } else {
            record.slots.push((amount.symbol(), amount.units()));
        }
    }

    /// Debit a list of amounts from an account, all-or-nothing.
    ///
    /// Either every listed currency can cover its amount and the whole
    /// debit applies, or nothing is mutated. Slots that reach zero are
    /// removed; a record with no slots left is deleted.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the account has no record at all and
    /// `Overdrawn` when any listed currency is absent or short.
    pub fn debit(&mut self, account: &AccountId, amounts: &[TokenAmount]) -> Result<()> {
        let record = self.accounts.get(account).ok_or_else(|| {
            EngineError::not_found(format!("no balance record for {account}"))
        })?;

        // First pass only checks; nothing is mutated until every listed
        // currency is known to cover its amount.
        let mut debits: BTreeMap<Symbol, u64> = BTreeMap::new();
        for amount in amounts {
            let entry = debits.entry(amount.symbol()).or_insert(0);
            *entry = entry
                .checked_add(amount.units())
                .ok_or_else(|| EngineError::invalid("debit list overflows"))?;
        }
        for (currency, units) in &debits {
            let held = record.amount_of(*currency);
            if held < *units {
                return Err(EngineError::overdrawn(format!(
                    "{account} holds {} but the debit needs {}",
                    TokenAmount::new(*currency, held),
                    TokenAmount::new(*currency, *units),
                )));
            }
        }

        let record = self
            .accounts
            .get_mut(account)
            .ok_or_else(|| EngineError::invariant("balance record vanished during debit"))?;
        for (currency, units) in &debits {
            if let Some((_, held)) = record.slots.iter_mut().find(|(sym, _)| sym == currency) {
                *held -= units;
            }
        }
        record.slots.retain(|(_, units)| *units > 0);
        if record.slots.is_empty() {
            self.accounts.remove(account);
        }
        Ok(())
    }

    /// The staged amount an account holds in a currency, zero if none.
    #[must_use]
    pub fn balance_of(&self, account: &AccountId, currency: Symbol) -> u64 {
        self.accounts
            .get(account)
            .map_or(0, |record| record.amount_of(currency))
    }

    /// Look up an account's record, if it exists.
    #[must_use]
    pub fn get(&self, account: &AccountId) -> Option<&BalanceRecord> {
        self.accounts.get(account)
    }

    /// Number of accounts with a live record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Check whether the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard() -> Symbol {
        Symbol::new("SHARD", 4).expect("symbol")
    }

    fn wax() -> Symbol {
        Symbol::new("WAX", 8).expect("symbol")
    }

    fn alice() -> AccountId {
        AccountId::new("alice")
    }

    #[test]
    fn credit_then_full_debit_removes_record() {
        let mut balances = BalanceLedger::new();
        balances.credit(&alice(), TokenAmount::new(shard(), 100));
        balances
            .debit(&alice(), &[TokenAmount::new(shard(), 100)])
            .expect("debit");
        assert!(balances.get(&alice()).is_none());
    }

    #[test]
    fn overdraft_fails_and_leaves_balance_intact() {
        let mut balances = BalanceLedger::new();
        balances.credit(&alice(), TokenAmount::new(shard(), 100));
        let err = balances
            .debit(&alice(), &[TokenAmount::new(shard(), 101)])
            .expect_err("overdraft");
        assert!(matches!(err, EngineError::Overdrawn { .. }));
        assert_eq!(balances.balance_of(&alice(), shard()), 100);
    }

    #[test]
    fn credits_aggregate_into_one_slot() {
        let mut balances = BalanceLedger::new();
        balances.credit(&alice(), TokenAmount::new(shard(), 60));
        balances.credit(&alice(), TokenAmount::new(shard(), 40));
        let record = balances.get(&alice()).expect("record");
        assert_eq!(record.slots().len(), 1);
        assert_eq!(record.amount_of(shard()), 100);
    }

    #[test]
    fn multi_currency_debit_is_all_or_nothing() {
        let mut balances = BalanceLedger::new();
        balances.credit(&alice(), TokenAmount::new(shard(), 100));
        balances.credit(&alice(), TokenAmount::new(wax(), 5));

        // WAX side is short, so the SHARD side must not move either.
        let err = balances
            .debit(
                &alice(),
                &[TokenAmount::new(shard(), 50), TokenAmount::new(wax(), 6)],
            )
            .expect_err("short on wax");
        assert!(matches!(err, EngineError::Overdrawn { .. }));
        assert_eq!(balances.balance_of(&alice(), shard()), 100);
        assert_eq!(balances.balance_of(&alice(), wax()), 5);
    }

    #[test]
    fn absent_currency_is_overdrawn() {
        let mut balances = BalanceLedger::new();
        balances.credit(&alice(), TokenAmount::new(shard(), 100));
        let err = balances
            .debit(&alice(), &[TokenAmount::new(wax(), 1)])
            .expect_err("no wax slot");
        assert!(matches!(err, EngineError::Overdrawn { .. }));
    }

    #[test]
    fn missing_account_is_not_found() {
        let mut balances = BalanceLedger::new();
        let err = balances
            .debit(&alice(), &[TokenAmount::new(shard(), 1)])
            .expect_err("no record");
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn partial_debit_keeps_remainder() {
        let mut balances = BalanceLedger::new();
        balances.credit(&alice(), TokenAmount::new(shard(), 100));
        balances.credit(&alice(), TokenAmount::new(wax(), 7));
        balances
            .debit(&alice(), &[TokenAmount::new(shard(), 100)])
            .expect("debit shard");
        // The SHARD slot is gone but the record survives for WAX.
        let record = balances.get(&alice()).expect("record");
        assert_eq!(record.amount_of(shard()), 0);
        assert_eq!(record.amount_of(wax()), 7);
    }

    #[test]
    fn repeated_currency_in_debit_list_is_summed() {
        let mut balances = BalanceLedger::new();
        balances.credit(&alice(), TokenAmount::new(shard(), 100));
        let err = balances
            .debit(
                &alice(),
                &[TokenAmount::new(shard(), 60), TokenAmount::new(shard(), 60)],
            )
            .expect_err("sums to 120");
        assert!(matches!(err, EngineError::Overdrawn { .. }));

        balances
            .debit(
                &alice(),
                &[TokenAmount::new(shard(), 60), TokenAmount::new(shard(), 40)],
            )
            .expect("sums to exactly 100");
        assert!(balances.is_empty());
    }

    #[test]
    fn zero_credit_is_a_noop() {
        let mut balances = BalanceLedger::new();
        balances.credit(&alice(), TokenAmount::zero(shard()));
        assert!(balances.is_empty());
    }
}

//! Stake records and proportional reward distribution.
//!
//! Stakes are scoped per stake-token symbol. Reward deposits are split
//! pro rata over the stakers of that symbol in ascending staker-id
//! order; integer division remainders are absorbed by the last staker so
//! the credited shares always sum exactly to the deposit.

use relic_core::{AccountId, EngineError, Result, Symbol, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One staker's position in a stake token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    /// The staking account.
    pub staker: AccountId,
    /// Staked amount in base units of the stake token.
    pub staked_units: u64,
    /// Accrued, unclaimed rewards (aggregate-or-append per currency).
    pub rewards: Vec<TokenAmount>,
}

impl StakeRecord {
    /// Credit a reward cut, aggregating into an existing currency slot
    /// or appending a new one. Zero cuts are not appended.
    pub fn credit_reward(&mut self, cut: TokenAmount) {
        if let Some(slot) = self
            .rewards
            .iter_mut()
            .find(|r| r.symbol() == cut.symbol())
        {
            *slot = TokenAmount::new(cut.symbol(), slot.units().saturating_add(cut.units()));
        } else if !cut.is_zero() {
            self.rewards.push(cut);
        }
    }
}

/// Stake records, keyed by stake token and staker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeBook {
    stakes: BTreeMap<Symbol, BTreeMap<AccountId, StakeRecord>>,
}

impl StakeBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to a staker's position, creating the record on first stake.
    pub fn stake(&mut self, token: Symbol, staker: &AccountId, units: u64) {
        let record = self
            .stakes
            .entry(token)
            .or_default()
            .entry(staker.clone())
            .or_insert_with(|| StakeRecord {
                staker: staker.clone(),
                staked_units: 0,
                rewards: Vec::new(),
            });
        record.staked_units = record.staked_units.saturating_add(units);
    }

    /// Reduce a staker's position.
    ///
    /// A full unstake removes the record and returns its accrued rewards
    /// for payout; a partial unstake returns an empty list.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown stake and `Overdrawn` when
    /// `units` exceeds the staked amount.
    pub fn unstake(
        &mut self,
        token: Symbol,
        staker: &AccountId,
        units: u64,
    ) -> Result<Vec<TokenAmount>> {
        let per_token = self
            .stakes
            .get_mut(&token)
            .ok_or_else(|| EngineError::not_found(format!("no stakes exist for {token}")))?;
        let record = per_token
            .get_mut(staker)
            .ok_or_else(|| EngineError::not_found(format!("stake not found for {staker}")))?;
        if units > record.staked_units {
            return Err(EngineError::overdrawn(format!(
                "{staker} staked {} but tried to unstake {}",
                TokenAmount::new(token, record.staked_units),
                TokenAmount::new(token, units),
            )));
        }
        if units == record.staked_units {
            let record = per_token
                .remove(staker)
                .ok_or_else(|| EngineError::invariant("stake record vanished during unstake"))?;
            if per_token.is_empty() {
                self.stakes.remove(&token);
            }
            Ok(record.rewards)
        } else {
            record.staked_units -= units;
            Ok(Vec::new())
        }
    }

    /// Drain a staker's accrued rewards for payout; the record survives
    /// while its staked amount is positive.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown stake.
    pub fn take_rewards(&mut self, token: Symbol, staker: &AccountId) -> Result<Vec<TokenAmount>> {
        let record = self
            .stakes
            .get_mut(&token)
            .and_then(|per_token| per_token.get_mut(staker))
            .ok_or_else(|| EngineError::not_found(format!("stake not found for {staker}")))?;
        Ok(std::mem::take(&mut record.rewards))
    }

    /// Look up a stake record.
    #[must_use]
    pub fn get(&self, token: Symbol, staker: &AccountId) -> Option<&StakeRecord> {
        self.stakes.get(&token).and_then(|m| m.get(staker))
    }

    /// Total staked units for a stake token.
    #[must_use]
    pub fn total_staked(&self, token: Symbol) -> u64 {
        self.stakes.get(&token).map_or(0, |per_token| {
            per_token.values().map(|r| r.staked_units).sum()
        })
    }

    /// Number of stakers in a stake token.
    #[must_use]
    pub fn staker_count(&self, token: Symbol) -> usize {
        self.stakes.get(&token).map_or(0, BTreeMap::len)
    }

    /// Mutable access to one stake token's records, ascending staker id.
    fn records_mut(&mut self, token: Symbol) -> Option<&mut BTreeMap<AccountId, StakeRecord>> {
        self.stakes.get_mut(&token)
    }
}

/// Split a reward deposit pro rata over the stakers of `stake_token`.
///
/// Stakers are visited in ascending id order. Every staker but the last
/// receives `floor(deposit * staked / total)` (clamped so the running
/// remainder never goes negative); the last staker absorbs the
/// remainder. The returned per-staker cuts always sum exactly to the
/// deposit. A deposit with no stakers to credit returns an empty list
/// and credits nothing.
pub fn distribute_rewards(
    book: &mut StakeBook,
    stake_token: Symbol,
    deposit: TokenAmount,
) -> Result<Vec<(AccountId, TokenAmount)>> {
    let total = book.total_staked(stake_token);
    if total == 0 {
        return Ok(Vec::new());
    }
    let Some(records) = book.records_mut(stake_token) else {
        return Ok(Vec::new());
    };

    let staker_count = records.len();
    let mut remaining = deposit.units();
    let mut cuts = Vec::with_capacity(staker_count);

    for (index, record) in records.values_mut().enumerate() {
        let cut = if index + 1 == staker_count {
            remaining
        } else {
            // u128 keeps deposit * staked from overflowing.
            let share = (u128::from(deposit.units()) * u128::from(record.staked_units)
                / u128::from(total)) as u64;
            share.min(remaining)
        };
        remaining -= cut;

        let amount = TokenAmount::new(deposit.symbol(), cut);
        record.credit_reward(amount);
        cuts.push((record.staker.clone(), amount));
    }

    debug!(
        stake_token = %stake_token,
        deposit = %deposit,
        stakers = staker_count,
        "distributed reward deposit"
    );
    Ok(cuts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn shard() -> Symbol {
        Symbol::new("SHARD", 4).expect("symbol")
    }

    fn wax() -> Symbol {
        Symbol::new("WAX", 8).expect("symbol")
    }

    #[test]
    fn spec_example_shares_and_remainder() {
        let mut book = StakeBook::new();
        book.stake(shard(), &AccountId::new("a"), 10);
        book.stake(shard(), &AccountId::new("b"), 20);
        book.stake(shard(), &AccountId::new("c"), 70);

        let cuts = distribute_rewards(
            &mut book,
            shard(),
            TokenAmount::new(wax(), 100_000_000),
        )
        .expect("distribute");

        let units: Vec<u64> = cuts.iter().map(|(_, c)| c.units()).collect();
        assert_eq!(units, vec![10_000_000, 20_000_000, 70_000_000]);
        assert_eq!(units.iter().sum::<u64>(), 100_000_000);
    }

    #[test]
    fn indivisible_deposit_remainder_goes_to_last_staker() {
        let mut book = StakeBook::new();
        book.stake(shard(), &AccountId::new("a"), 1);
        book.stake(shard(), &AccountId::new("b"), 1);
        book.stake(shard(), &AccountId::new("c"), 1);

        let cuts = distribute_rewards(&mut book, shard(), TokenAmount::new(wax(), 100))
            .expect("distribute");

        let units: Vec<u64> = cuts.iter().map(|(_, c)| c.units()).collect();
        // floor(100/3) twice, then the remainder.
        assert_eq!(units, vec![33, 33, 34]);
    }

    #[test]
    fn no_stakers_credits_nothing() {
        let mut book = StakeBook::new();
        let cuts = distribute_rewards(&mut book, shard(), TokenAmount::new(wax(), 100))
            .expect("distribute");
        assert!(cuts.is_empty());
    }

    #[test]
    fn rewards_aggregate_across_deposits() {
        let mut book = StakeBook::new();
        let solo = AccountId::new("solo");
        book.stake(shard(), &solo, 5);

        distribute_rewards(&mut book, shard(), TokenAmount::new(wax(), 40)).expect("first");
        distribute_rewards(&mut book, shard(), TokenAmount::new(wax(), 60)).expect("second");

        let record = book.get(shard(), &solo).expect("record");
        assert_eq!(record.rewards, vec![TokenAmount::new(wax(), 100)]);
    }

    #[test]
    fn rewards_in_multiple_currencies_append() {
        let mut book = StakeBook::new();
        let solo = AccountId::new("solo");
        book.stake(shard(), &solo, 5);

        distribute_rewards(&mut book, shard(), TokenAmount::new(wax(), 10)).expect("wax");
        let other = Symbol::new("HONEY", 2).expect("symbol");
        distribute_rewards(&mut book, shard(), TokenAmount::new(other, 7)).expect("honey");

        let record = book.get(shard(), &solo).expect("record");
        assert_eq!(record.rewards.len(), 2);
    }

    #[test]
    fn stake_merges_positions() {
        let mut book = StakeBook::new();
        let alice = AccountId::new("alice");
        book.stake(shard(), &alice, 100);
        book.stake(shard(), &alice, 50);
        assert_eq!(book.get(shard(), &alice).expect("record").staked_units, 150);
        assert_eq!(book.total_staked(shard()), 150);
    }

    #[test]
    fn partial_unstake_keeps_record_and_rewards() {
        let mut book = StakeBook::new();
        let alice = AccountId::new("alice");
        book.stake(shard(), &alice, 100);
        distribute_rewards(&mut book, shard(), TokenAmount::new(wax(), 9)).expect("reward");

        let paid = book.unstake(shard(), &alice, 40).expect("partial");
        assert!(paid.is_empty());
        let record = book.get(shard(), &alice).expect("record");
        assert_eq!(record.staked_units, 60);
        assert_eq!(record.rewards, vec![TokenAmount::new(wax(), 9)]);
    }

    #[test]
    fn full_unstake_removes_record_and_returns_rewards() {
        let mut book = StakeBook::new();
        let alice = AccountId::new("alice");
        book.stake(shard(), &alice, 100);
        distribute_rewards(&mut book, shard(), TokenAmount::new(wax(), 9)).expect("reward");

        let paid = book.unstake(shard(), &alice, 100).expect("full");
        assert_eq!(paid, vec![TokenAmount::new(wax(), 9)]);
        assert!(book.get(shard(), &alice).is_none());
        assert_eq!(book.total_staked(shard()), 0);
    }

    #[test]
    fn unstake_beyond_position_is_overdrawn() {
        let mut book = StakeBook::new();
        let alice = AccountId::new("alice");
        book.stake(shard(), &alice, 100);
        let err = book.unstake(shard(), &alice, 101).expect_err("too much");
        assert!(matches!(err, EngineError::Overdrawn { .. }));
        assert_eq!(book.get(shard(), &alice).expect("record").staked_units, 100);
    }

    #[test]
    fn take_rewards_drains_but_keeps_record() {
        let mut book = StakeBook::new();
        let alice = AccountId::new("alice");
        book.stake(shard(), &alice, 100);
        distribute_rewards(&mut book, shard(), TokenAmount::new(wax(), 5)).expect("reward");

        let paid = book.take_rewards(shard(), &alice).expect("claim");
        assert_eq!(paid, vec![TokenAmount::new(wax(), 5)]);
        let record = book.get(shard(), &alice).expect("record");
        assert!(record.rewards.is_empty());
        assert_eq!(record.staked_units, 100);
    }

    proptest! {
        #[test]
        fn distribution_is_exact_for_any_ratio(
            stakes in proptest::collection::vec(1u64..=1_000_000_000, 1..=12),
            deposit in 0u64..=1_000_000_000_000,
        ) {
            let mut book = StakeBook::new();
            for (i, staked) in stakes.iter().enumerate() {
                book.stake(shard(), &AccountId::new(format!("staker{i:02}")), *staked);
            }

            let cuts = distribute_rewards(
                &mut book,
                shard(),
                TokenAmount::new(wax(), deposit),
            ).expect("distribute");

            let credited: u64 = cuts.iter().map(|(_, c)| c.units()).sum();
            prop_assert_eq!(credited, deposit);
        }

        #[test]
        fn no_staker_exceeds_proportional_share_by_more_than_remainder(
            stakes in proptest::collection::vec(1u64..=1_000_000, 2..=8),
            deposit in 1u64..=1_000_000_000,
        ) {
            let total: u64 = stakes.iter().sum();
            let mut book = StakeBook::new();
            for (i, staked) in stakes.iter().enumerate() {
                book.stake(shard(), &AccountId::new(format!("staker{i:02}")), *staked);
            }

            let cuts = distribute_rewards(
                &mut book,
                shard(),
                TokenAmount::new(wax(), deposit),
            ).expect("distribute");

            // Everyone except the last staker gets exactly the floored share.
            for (i, (_, cut)) in cuts.iter().enumerate().take(cuts.len() - 1) {
                let share = (u128::from(deposit) * u128::from(stakes[i])
                    / u128::from(total)) as u64;
                prop_assert_eq!(cut.units(), share);
            }
        }
    }
}

//! The entry-point surface of the fractionalization engine.
//!
//! Every operation runs as one all-or-nothing transaction over the
//! engine's state; outbound token and asset transfers are collected in
//! an outbox during the transaction and handed to the collaborators only
//! after commit. A failed operation leaves no trace, not even staged
//! effects.

use chrono::Utc;
use relic_core::{
    AccountId, AssetId, EngineError, GroupId, Result, Symbol, TokenAmount, ValuationRule,
    compute_issue_amount,
};
use relic_ledger::{LedgerState, TokenDefinition, distribute_rewards, transact};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::collaborators::{AssetRegistry, CustodyLedger, RateOracle, SettlementLedger};
use crate::config::{EngineConfig, StakePoolConfig};
use crate::deposits::PendingDeposits;
use crate::notify::{TransferMemo, is_asset_deposit};

/// Proof of a committed operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// Unique id of the committed transaction.
    pub id: Uuid,
    /// Amounts issued or paid out by the operation, if any.
    pub payouts: Vec<TokenAmount>,
}

/// An outbound effect staged during a transaction, dispatched on commit.
#[derive(Debug, Clone, PartialEq)]
enum Effect {
    CreateCurrency {
        ledger: AccountId,
        symbol: Symbol,
        maximum_supply: u64,
    },
    IssueTokens {
        ledger: AccountId,
        amount: TokenAmount,
        memo: String,
    },
    TokenTransfer {
        ledger: AccountId,
        to: AccountId,
        amount: TokenAmount,
        memo: String,
    },
    AssetTransfer {
        to: AccountId,
        assets: Vec<AssetId>,
        memo: String,
    },
}

/// Everything the transaction wrapper snapshots as one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct EngineInner {
    config: Option<EngineConfig>,
    deposits: PendingDeposits,
    ledger: LedgerState,
}

/// Which configured fee an operation charges.
#[derive(Debug, Clone, Copy)]
enum FeeKind {
    Tokenize,
    Redeem,
}

/// The fractionalization engine, generic over its collaborators.
#[derive(Debug)]
pub struct Engine<R, S, C, O> {
    account: AccountId,
    inner: EngineInner,
    registry: R,
    settlement: S,
    custody: C,
    oracle: O,
}

impl<R, S, C, O> Engine<R, S, C, O>
where
    R: AssetRegistry,
    S: SettlementLedger,
    C: CustodyLedger,
    O: RateOracle,
{
    /// Create an engine operating as `account`.
    pub fn new(account: AccountId, registry: R, settlement: S, custody: C, oracle: O) -> Self {
        Self {
            account,
            inner: EngineInner::default(),
            registry,
            settlement,
            custody,
            oracle,
        }
    }

    /// The ledger tables, read-only.
    pub fn state(&self) -> &LedgerState {
        &self.inner.ledger
    }

    /// The config record, if initialized.
    pub fn config(&self) -> Option<&EngineConfig> {
        self.inner.config.as_ref()
    }

    /// The pending-deposit table, read-only.
    pub fn deposits(&self) -> &PendingDeposits {
        &self.inner.deposits
    }

    /// The settlement collaborator, for inspecting recorded requests.
    pub fn settlement(&self) -> &S {
        &self.settlement
    }

    /// The custody collaborator, for inspecting recorded requests.
    pub fn custody(&self) -> &C {
        &self.custody
    }

    /// Mutable access to the registry collaborator.
    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    /// Mutable access to the rate oracle collaborator.
    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    /// Create the config record. Idempotent: a second call changes
    /// nothing and succeeds.
    ///
    /// # Errors
    ///
    /// Infallible today; kept fallible for uniformity with the other
    /// entry points.
    pub fn init(&mut self, admin: AccountId, default_settlement: AccountId) -> Result<Receipt> {
        if self.inner.config.is_none() {
            info!(admin = %admin, "initializing engine config");
            self.inner.config = Some(EngineConfig::new(admin, default_settlement));
        }
        Ok(self.receipt("init", Vec::new()))
    }

    /// Define a new fractional token over a set of asset groups.
    ///
    /// The caller must be on the collection's authorization list. Writes
    /// the token definition and one quota record per group, charges the
    /// tokenize fee from the caller's staged balance, and requests
    /// external creation and full issuance of the supply.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for a caller missing collection authorization,
    /// `InvalidArgument` for a zero supply, empty or foreign group list,
    /// zero quota, or invalid rules, `DuplicateEntry` for an existing
    /// symbol or an already-tokenized group, `Overdrawn`/`NotFound` when
    /// the staged balance cannot cover the fee.
    #[allow(clippy::too_many_arguments)]
    pub fn create_token(
        &mut self,
        caller: &AccountId,
        collection: &AccountId,
        maximum_supply: TokenAmount,
        groups: &[(GroupId, u32)],
        rules: Vec<ValuationRule>,
        settlement_ledger: AccountId,
        fee_currency: Symbol,
    ) -> Result<Receipt> {
        let registry = &self.registry;
        let oracle = &self.oracle;
        let effects = transact(&mut self.inner, |inner| {
            required_config(inner)?;
            if !registry.is_authorized(collection, caller) {
                return Err(EngineError::unauthorized(format!(
                    "{caller} is not authorized for collection {collection}"
                )));
            }
            if groups.is_empty() {
                return Err(EngineError::invalid(format!(
                    "token {} needs at least one asset group",
                    maximum_supply.symbol()
                )));
            }
            for (group, _) in groups {
                let info = registry.group(*group)?;
                if info.collection != *collection {
                    return Err(EngineError::invalid(format!(
                        "group {group} belongs to {}, not {collection}",
                        info.collection
                    )));
                }
            }
            for rule in &rules {
                rule.validate()?;
            }

            charge_fee(inner, caller, FeeKind::Tokenize, fee_currency, oracle)?;

            let now = Utc::now();
            inner.ledger.tokens.create(TokenDefinition {
                symbol: maximum_supply.symbol(),
                maximum_supply: maximum_supply.units(),
                issued_supply: 0,
                collection: collection.clone(),
                authorized_account: caller.clone(),
                groups: groups.iter().map(|(g, _)| *g).collect(),
                settlement_ledger: settlement_ledger.clone(),
                rules,
                created_at: now,
                updated_at: now,
            })?;
            for (group, max_assets) in groups {
                inner.ledger.quotas.create(*group, *max_assets)?;
            }

            info!(
                token = %maximum_supply.symbol(),
                supply = %maximum_supply,
                groups = groups.len(),
                "token created"
            );
            Ok(vec![
                Effect::CreateCurrency {
                    ledger: settlement_ledger.clone(),
                    symbol: maximum_supply.symbol(),
                    maximum_supply: maximum_supply.units(),
                },
                Effect::IssueTokens {
                    ledger: settlement_ledger,
                    amount: maximum_supply,
                    memo: "initial issuance".to_string(),
                },
            ])
        })?;
        self.dispatch(effects)?;
        Ok(self.receipt("create_token", Vec::new()))
    }

    /// Fractionalize previously deposited assets.
    ///
    /// Every id must be in the caller's pending-deposit set and is
    /// consumed from it. Per asset: group resolution, quota admission,
    /// valuation against the resolved trait set, supply mint, and pool
    /// escrow — all within one transaction. The issued total per token
    /// is transferred to the caller after commit.
    ///
    /// # Errors
    ///
    /// `NotFound` for an undeposited asset or a group no token covers,
    /// `QuotaExceeded` / `SupplyExceeded` at the respective caps,
    /// `Overdrawn` when the staged balance cannot cover the fee.
    pub fn tokenize_assets(
        &mut self,
        caller: &AccountId,
        assets: &[AssetId],
        fee_currency: Symbol,
    ) -> Result<Receipt> {
        let registry = &self.registry;
        let oracle = &self.oracle;
        let (payouts, effects) = transact(&mut self.inner, |inner| {
            required_config(inner)?;
            inner.deposits.claim(caller, assets)?;
            charge_fee(inner, caller, FeeKind::Tokenize, fee_currency, oracle)?;

            let mut issued: BTreeMap<Symbol, u64> = BTreeMap::new();
            for asset in assets {
                let record = registry.asset(*asset)?;
                let (symbol, max_supply, rules) = {
                    let token = inner.ledger.tokens.find_by_group(record.group)?;
                    (token.symbol, token.maximum_supply, token.rules.clone())
                };
                let group = registry.group(record.group)?;
                let amount =
                    compute_issue_amount(max_supply, group.slots, &rules, &record.resolved_traits())?;

                inner.ledger.quotas.admit(record.group)?;
                inner.ledger.tokens.mint(symbol, amount)?;
                inner.ledger.pool.escrow(symbol, *asset, amount)?;
                *issued.entry(symbol).or_insert(0) += amount;
                debug!(asset = %asset, amount = %TokenAmount::new(symbol, amount), "asset tokenized");
            }

            let mut payouts = Vec::with_capacity(issued.len());
            let mut effects = Vec::with_capacity(issued.len());
            for (symbol, units) in issued {
                let ledger = inner.ledger.tokens.get(symbol)?.settlement_ledger.clone();
                let amount = TokenAmount::new(symbol, units);
                payouts.push(amount);
                effects.push(Effect::TokenTransfer {
                    ledger,
                    to: caller.clone(),
                    amount,
                    memo: "tokenized assets".to_string(),
                });
            }
            Ok((payouts, effects))
        })?;
        self.dispatch(effects)?;
        Ok(self.receipt("tokenize_assets", payouts))
    }

    /// Redeem an escrowed asset against its frozen issuance.
    ///
    /// The presented amount must have been staged via a `redeem`-memo
    /// transfer and must equal the amount frozen at tokenization time
    /// exactly; the issuance is never recomputed. On success the amount
    /// is burned and the asset transferred back to the caller.
    ///
    /// # Errors
    ///
    /// `AmountMismatch` when the presented amount differs from the
    /// frozen one (the pool entry survives), `NotFound` for an unpooled
    /// asset, `Overdrawn` when the staged balance is short.
    pub fn redeem(
        &mut self,
        caller: &AccountId,
        amount: TokenAmount,
        asset: AssetId,
        fee_currency: Symbol,
    ) -> Result<Receipt> {
        let registry = &self.registry;
        let oracle = &self.oracle;
        let effects = transact(&mut self.inner, |inner| {
            required_config(inner)?;
            let record = registry.asset(asset)?;

            charge_fee(inner, caller, FeeKind::Redeem, fee_currency, oracle)?;
            inner.ledger.balances.debit(caller, &[amount])?;
            let frozen = inner
                .ledger
                .pool
                .release(amount.symbol(), asset, amount.units())?;
            inner.ledger.quotas.release(record.group)?;
            inner.ledger.tokens.burn(amount.symbol(), frozen)?;

            info!(asset = %asset, amount = %amount, "asset redeemed");
            Ok(vec![Effect::AssetTransfer {
                to: caller.clone(),
                assets: vec![asset],
                memo: "redeemed asset".to_string(),
            }])
        })?;
        self.dispatch(effects)?;
        Ok(self.receipt("redeem", Vec::new()))
    }

    /// Withdraw staged balances, all-or-nothing across the list.
    ///
    /// # Errors
    ///
    /// `NotFound` without a balance record, `Overdrawn` when any listed
    /// currency is short; nothing moves in either case.
    pub fn withdraw(&mut self, caller: &AccountId, amounts: &[TokenAmount]) -> Result<Receipt> {
        let (payouts, effects) = transact(&mut self.inner, |inner| {
            required_config(inner)?;
            inner.ledger.balances.debit(caller, amounts)?;
            let mut effects = Vec::with_capacity(amounts.len());
            for amount in amounts {
                effects.push(Effect::TokenTransfer {
                    ledger: settlement_for(inner, amount.symbol())?,
                    to: caller.clone(),
                    amount: *amount,
                    memo: "withdraw".to_string(),
                });
            }
            Ok((amounts.to_vec(), effects))
        })?;
        self.dispatch(effects)?;
        Ok(self.receipt("withdraw", payouts))
    }

    /// Register a stake pool. Admin only.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for a non-admin caller, `DuplicateEntry` when the
    /// pool account is already registered.
    pub fn add_stake_pool(
        &mut self,
        caller: &AccountId,
        pool: AccountId,
        stake_token: Symbol,
        reward_token: Symbol,
    ) -> Result<Receipt> {
        transact(&mut self.inner, |inner| {
            let config = required_config_mut(inner)?;
            require_admin(config, caller)?;
            config.register_stake_pool(StakePoolConfig {
                pool: pool.clone(),
                stake_token,
                reward_token,
            })
        })?;
        Ok(self.receipt("add_stake_pool", Vec::new()))
    }

    /// Lock staged tokens into the matching stake pool.
    ///
    /// # Errors
    ///
    /// `NotFound` when no pool accepts the currency or the caller has no
    /// staged balance, `Overdrawn` when the staged balance is short.
    pub fn stake(&mut self, caller: &AccountId, amount: TokenAmount) -> Result<Receipt> {
        transact(&mut self.inner, |inner| {
            let config = required_config(inner)?;
            if config.pool_for_stake_token(amount.symbol()).is_none() {
                return Err(EngineError::not_found(format!(
                    "no stake pool accepts {}",
                    amount.symbol()
                )));
            }
            inner.ledger.balances.debit(caller, &[amount])?;
            inner
                .ledger
                .stakes
                .stake(amount.symbol(), caller, amount.units());
            debug!(staker = %caller, amount = %amount, "stake added");
            Ok(())
        })?;
        Ok(self.receipt("stake", Vec::new()))
    }

    /// Return staked tokens to the caller.
    ///
    /// A full unstake also pays out the accrued rewards and removes the
    /// stake record.
    ///
    /// # Errors
    ///
    /// `NotFound` without a stake record, `Overdrawn` beyond the staked
    /// amount.
    pub fn unstake(&mut self, caller: &AccountId, amount: TokenAmount) -> Result<Receipt> {
        let (payouts, effects) = transact(&mut self.inner, |inner| {
            required_config(inner)?;
            let rewards = inner
                .ledger
                .stakes
                .unstake(amount.symbol(), caller, amount.units())?;

            let mut payouts = vec![amount];
            payouts.extend(rewards.iter().copied());
            let mut effects = vec![Effect::TokenTransfer {
                ledger: settlement_for(inner, amount.symbol())?,
                to: caller.clone(),
                amount,
                memo: "unstaked".to_string(),
            }];
            for reward in rewards {
                effects.push(Effect::TokenTransfer {
                    ledger: settlement_for(inner, reward.symbol())?,
                    to: caller.clone(),
                    amount: reward,
                    memo: "stake rewards".to_string(),
                });
            }
            Ok((payouts, effects))
        })?;
        self.dispatch(effects)?;
        Ok(self.receipt("unstake", payouts))
    }

    /// Pay out the caller's accrued rewards in a stake pool.
    ///
    /// The stake record survives; only its reward list is drained.
    ///
    /// # Errors
    ///
    /// `NotFound` without a stake record.
    pub fn claim(&mut self, caller: &AccountId, stake_token: Symbol) -> Result<Receipt> {
        let (payouts, effects) = transact(&mut self.inner, |inner| {
            required_config(inner)?;
            let rewards = inner.ledger.stakes.take_rewards(stake_token, caller)?;
            let mut effects = Vec::with_capacity(rewards.len());
            for reward in &rewards {
                effects.push(Effect::TokenTransfer {
                    ledger: settlement_for(inner, reward.symbol())?,
                    to: caller.clone(),
                    amount: *reward,
                    memo: "stake rewards".to_string(),
                });
            }
            Ok((rewards, effects))
        })?;
        self.dispatch(effects)?;
        Ok(self.receipt("claim", payouts))
    }

    /// Set the tokenize fee; a zero amount clears it. Admin only.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for a non-admin caller.
    pub fn set_token_fee(&mut self, caller: &AccountId, fee: TokenAmount) -> Result<Receipt> {
        transact(&mut self.inner, |inner| {
            let config = required_config_mut(inner)?;
            require_admin(config, caller)?;
            config.tokenize_fee = (!fee.is_zero()).then_some(fee);
            Ok(())
        })?;
        Ok(self.receipt("set_token_fee", Vec::new()))
    }

    /// Set the redeem fee; a zero amount clears it. Admin only.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for a non-admin caller.
    pub fn set_redeem_fee(&mut self, caller: &AccountId, fee: TokenAmount) -> Result<Receipt> {
        transact(&mut self.inner, |inner| {
            let config = required_config_mut(inner)?;
            require_admin(config, caller)?;
            config.redeem_fee = (!fee.is_zero()).then_some(fee);
            Ok(())
        })?;
        Ok(self.receipt("set_redeem_fee", Vec::new()))
    }

    /// Replace a token's valuation rules.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless the caller is the token's authorized
    /// account, `InvalidArgument` when any rule fails validation.
    pub fn set_factors(
        &mut self,
        caller: &AccountId,
        symbol: Symbol,
        rules: Vec<ValuationRule>,
    ) -> Result<Receipt> {
        transact(&mut self.inner, |inner| {
            required_config(inner)?;
            require_token_authority(inner, symbol, caller)?;
            inner.ledger.tokens.set_rules(symbol, rules)
        })?;
        Ok(self.receipt("set_factors", Vec::new()))
    }

    /// Change a group's tokenization cap.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless the caller is the covering token's
    /// authorized account, `InvalidArgument` when the new cap is below
    /// the live count.
    pub fn set_max_assets(
        &mut self,
        caller: &AccountId,
        group: GroupId,
        new_max: u32,
    ) -> Result<Receipt> {
        transact(&mut self.inner, |inner| {
            required_config(inner)?;
            let symbol = inner.ledger.tokens.find_by_group(group)?.symbol;
            require_token_authority(inner, symbol, caller)?;
            inner.ledger.quotas.set_max(group, new_max)
        })?;
        Ok(self.receipt("set_max_assets", Vec::new()))
    }

    /// Erase a token definition.
    ///
    /// Deletes its quota records, drains its escrow pool (the assets are
    /// transferred back to the caller), returns the unissued supply
    /// remainder, and removes the definition and rules. Circulating
    /// tokens stay with their holders but can no longer be redeemed.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless the caller is the token's authorized
    /// account, `NotFound` for an unknown symbol.
    pub fn erase_token(&mut self, caller: &AccountId, symbol: Symbol) -> Result<Receipt> {
        let (payouts, effects) = transact(&mut self.inner, |inner| {
            required_config(inner)?;
            require_token_authority(inner, symbol, caller)?;

            let definition = inner.ledger.tokens.remove(symbol)?;
            for group in &definition.groups {
                inner.ledger.quotas.remove(*group);
            }
            let drained = inner.ledger.pool.drain_token(symbol);

            let remainder = TokenAmount::new(symbol, definition.remainder());
            let mut payouts = Vec::new();
            let mut effects = Vec::new();
            if !drained.is_empty() {
                effects.push(Effect::AssetTransfer {
                    to: caller.clone(),
                    assets: drained.iter().map(|e| e.asset).collect(),
                    memo: "token erased".to_string(),
                });
            }
            if !remainder.is_zero() {
                payouts.push(remainder);
                effects.push(Effect::TokenTransfer {
                    ledger: definition.settlement_ledger.clone(),
                    to: caller.clone(),
                    amount: remainder,
                    memo: "unissued remainder".to_string(),
                });
            }
            warn!(token = %symbol, escrowed = drained.len(), "token erased");
            Ok((payouts, effects))
        })?;
        self.dispatch(effects)?;
        Ok(self.receipt("erase_token", payouts))
    }

    /// Handle an inbound token transfer notification.
    ///
    /// Transfers not addressed to the engine, or sent by the engine
    /// itself, are ignored. The memo's first word selects the action:
    /// staging memos credit the sender's balance, `reward` distributes
    /// the deposit over the sending pool's stakers.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an unknown memo or a reward in the wrong
    /// currency, `Unauthorized` for a reward from an unregistered pool.
    pub fn on_token_transfer(
        &mut self,
        sender: &AccountId,
        receiver: &AccountId,
        amount: TokenAmount,
        memo: &str,
    ) -> Result<()> {
        if *receiver != self.account || *sender == self.account {
            debug!(sender = %sender, receiver = %receiver, "ignoring unrelated token transfer");
            return Ok(());
        }
        transact(&mut self.inner, |inner| {
            match memo.parse::<TransferMemo>()? {
                TransferMemo::Reward => {
                    let config = required_config(inner)?;
                    let pool = config.stake_pool(sender).ok_or_else(|| {
                        EngineError::unauthorized(format!(
                            "{sender} is not a registered stake pool"
                        ))
                    })?;
                    if amount.symbol() != pool.reward_token {
                        return Err(EngineError::invalid(format!(
                            "pool {sender} rewards in {}, not {}",
                            pool.reward_token,
                            amount.symbol()
                        )));
                    }
                    let stake_token = pool.stake_token;
                    if inner.ledger.stakes.total_staked(stake_token) == 0 {
                        warn!(pool = %sender, deposit = %amount, "reward deposit with no stakers, ignored");
                        return Ok(());
                    }
                    distribute_rewards(&mut inner.ledger.stakes, stake_token, amount)?;
                }
                TransferMemo::Redeem
                | TransferMemo::Stake
                | TransferMemo::PayFee
                | TransferMemo::Buy
                | TransferMemo::Topup
                | TransferMemo::Deposit => {
                    inner.ledger.balances.credit(sender, amount);
                    debug!(sender = %sender, amount = %amount, memo, "staged inbound funds");
                }
            }
            Ok(())
        })
    }

    /// Handle an inbound asset transfer notification.
    ///
    /// Transfers not addressed to the engine are ignored. The memo must
    /// start with `deposit`; the asset ids are merged into the sender's
    /// pending-deposit set by sorted union.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a non-deposit memo.
    pub fn on_asset_transfer(
        &mut self,
        sender: &AccountId,
        receiver: &AccountId,
        assets: &[AssetId],
        memo: &str,
    ) -> Result<()> {
        if *receiver != self.account {
            debug!(sender = %sender, receiver = %receiver, "ignoring unrelated asset transfer");
            return Ok(());
        }
        if !is_asset_deposit(memo) {
            return Err(EngineError::invalid(format!(
                "asset transfer memo must start with \"deposit\", got {memo:?}"
            )));
        }
        transact(&mut self.inner, |inner| {
            inner.deposits.merge(sender, assets);
            Ok(())
        })
    }

    /// Hand committed effects to the collaborators, in staging order.
    fn dispatch(&mut self, effects: Vec<Effect>) -> Result<()> {
        for effect in effects {
            match effect {
                Effect::CreateCurrency {
                    ledger,
                    symbol,
                    maximum_supply,
                } => self.settlement.create(&ledger, symbol, maximum_supply)?,
                Effect::IssueTokens {
                    ledger,
                    amount,
                    memo,
                } => self.settlement.issue(&ledger, amount, &memo)?,
                Effect::TokenTransfer {
                    ledger,
                    to,
                    amount,
                    memo,
                } => self.settlement.transfer(&ledger, &to, amount, &memo)?,
                Effect::AssetTransfer { to, assets, memo } => {
                    self.custody.transfer(&to, &assets, &memo)?;
                }
            }
        }
        Ok(())
    }

    fn receipt(&self, op: &'static str, payouts: Vec<TokenAmount>) -> Receipt {
        let id = Uuid::new_v4();
        info!(%id, op, "operation committed");
        Receipt { id, payouts }
    }
}

fn required_config(inner: &EngineInner) -> Result<&EngineConfig> {
    inner
        .config
        .as_ref()
        .ok_or_else(|| EngineError::not_found("engine is not initialized"))
}

fn required_config_mut(inner: &mut EngineInner) -> Result<&mut EngineConfig> {
    inner
        .config
        .as_mut()
        .ok_or_else(|| EngineError::not_found("engine is not initialized"))
}

fn require_admin(config: &EngineConfig, caller: &AccountId) -> Result<()> {
    if config.admin != *caller {
        return Err(EngineError::unauthorized(format!(
            "{caller} is not the engine admin"
        )));
    }
    Ok(())
}

fn require_token_authority(inner: &EngineInner, symbol: Symbol, caller: &AccountId) -> Result<()> {
    let token = inner.ledger.tokens.get(symbol)?;
    if token.authorized_account != *caller {
        return Err(EngineError::unauthorized(format!(
            "{caller} is not authorized for token {symbol}"
        )));
    }
    Ok(())
}

/// The settlement ledger executing transfers of `symbol`: the token's
/// own ledger when the engine created it, the configured default
/// otherwise.
fn settlement_for(inner: &EngineInner, symbol: Symbol) -> Result<AccountId> {
    if let Ok(token) = inner.ledger.tokens.get(symbol) {
        return Ok(token.settlement_ledger.clone());
    }
    Ok(required_config(inner)?.default_settlement.clone())
}

/// Debit the configured fee from the caller's staged balance, converted
/// through the oracle when paid in another currency, and credit it to
/// the admin's staged balance.
fn charge_fee<O: RateOracle>(
    inner: &mut EngineInner,
    caller: &AccountId,
    kind: FeeKind,
    pay_in: Symbol,
    oracle: &O,
) -> Result<Option<TokenAmount>> {
    let config = required_config(inner)?;
    let fee = match kind {
        FeeKind::Tokenize => config.tokenize_fee,
        FeeKind::Redeem => config.redeem_fee,
    };
    let Some(fee) = fee else {
        return Ok(None);
    };
    let admin = config.admin.clone();
    let due = convert_fee(fee, pay_in, oracle)?;
    inner.ledger.balances.debit(caller, &[due])?;
    inner.ledger.balances.credit(&admin, due);
    debug!(payer = %caller, fee = %due, "fee charged");
    Ok(Some(due))
}

/// Convert a fee into the paying currency, rounding up so the engine is
/// never underpaid.
fn convert_fee<O: RateOracle>(fee: TokenAmount, pay_in: Symbol, oracle: &O) -> Result<TokenAmount> {
    if pay_in == fee.symbol() {
        return Ok(fee);
    }
    let rate = oracle.rate(fee.symbol(), pay_in)?;
    if !rate.is_finite() || rate <= 0.0 {
        return Err(EngineError::invalid(format!(
            "unusable rate {rate} for {} -> {pay_in}",
            fee.symbol()
        )));
    }
    let scale = pay_in.unit_scale() as f64 / fee.symbol().unit_scale() as f64;
    let due = (fee.units() as f64 * rate * scale).ceil();
    if !due.is_finite() || due >= u64::MAX as f64 {
        return Err(EngineError::invariant(format!(
            "fee conversion overflows in {pay_in}"
        )));
    }
    Ok(TokenAmount::new(pay_in, due as u64))
}

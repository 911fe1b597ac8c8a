//! The trait-factor valuation engine.
//!
//! Each token carries a list of [`ValuationRule`]s, one per trait. An
//! asset's issuance amount is the base per-slot share of the token's
//! maximum supply, scaled by the product of its trait factors relative to
//! the product of the rules' average factors. An asset sitting exactly at
//! every rule's average factor receives the base share; rarer traits
//! scale the share up or down from that baseline.
//!
//! This is a pricing curve, not a distribution guarantee: the engine
//! never renormalizes a group so its slots sum to the maximum supply.
//! Over-subscription (enough high-factor assets to exceed total supply)
//! is an expected condition rejected by the supply ledger at mint time.

use crate::error::{EngineError, Result};
use crate::traits::{TraitSet, TraitValue};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// One row of a discrete value-to-factor table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteFactor {
    /// The exact textual trait value this row matches.
    pub value: String,
    /// The factor applied when the row matches.
    pub factor: f64,
}

/// A per-trait pricing curve.
///
/// When `discrete` is non-empty the rule is a lookup table over textual
/// trait values. Otherwise the rule linearly interpolates the numeric
/// trait value between `min_value` and `max_value`. The value range may
/// be given in reversed order (`max_value < min_value`), which reverses
/// the slope: higher trait values then earn lower factors. The direction
/// is honored, never normalized away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationRule {
    /// The trait this rule prices.
    pub trait_name: String,
    /// Clamp-range start; factor is `min_factor` here.
    pub min_value: f64,
    /// Clamp-range end; factor is `max_factor` here.
    pub max_value: f64,
    /// Lowest factor the curve can produce.
    pub min_factor: f64,
    /// The factor treated as the group baseline.
    pub avg_factor: f64,
    /// Highest factor the curve can produce.
    pub max_factor: f64,
    /// Optional discrete value table; overrides interpolation when set.
    pub discrete: Vec<DiscreteFactor>,
}

impl ValuationRule {
    /// Create an interpolated rule with no discrete table.
    #[must_use]
    pub fn linear(
        trait_name: impl Into<String>,
        min_value: f64,
        max_value: f64,
        min_factor: f64,
        avg_factor: f64,
        max_factor: f64,
    ) -> Self {
        Self {
            trait_name: trait_name.into(),
            min_value,
            max_value,
            min_factor,
            avg_factor,
            max_factor,
            discrete: Vec::new(),
        }
    }

    /// Attach a discrete value table to this rule.
    #[must_use]
    pub fn with_discrete(mut self, table: Vec<DiscreteFactor>) -> Self {
        self.discrete = table;
        self
    }

    /// Validate the rule bounds.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` unless `max_factor >= avg_factor >=
    /// min_factor > 0`, all bounds are finite, and every discrete factor
    /// lies in `[min_factor, max_factor]`.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            self.min_value,
            self.max_value,
            self.min_factor,
            self.avg_factor,
            self.max_factor,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(EngineError::invalid(format!(
                "rule for trait {:?} has non-finite bounds",
                self.trait_name
            )));
        }
        if self.min_factor <= 0.0 {
            return Err(EngineError::invalid(format!(
                "rule for trait {:?}: minimum factor must be > 0",
                self.trait_name
            )));
        }
        if self.avg_factor < self.min_factor || self.max_factor < self.avg_factor {
            return Err(EngineError::invalid(format!(
                "rule for trait {:?}: factors must satisfy max >= avg >= min",
                self.trait_name
            )));
        }
        for row in &self.discrete {
            if !row.factor.is_finite()
                || row.factor < self.min_factor
                || row.factor > self.max_factor
            {
                return Err(EngineError::invalid(format!(
                    "rule for trait {:?}: discrete factor {} for value {:?} \
                     outside [{}, {}]",
                    self.trait_name, row.factor, row.value, self.min_factor, self.max_factor
                )));
            }
        }
        Ok(())
    }

    /// The factor this rule assigns to a trait value, if any.
    ///
    /// A discrete table matches textual values exactly; an unmatched
    /// value contributes no factor. An interpolated rule clamps the
    /// numeric value into the rule's range and interpolates; non-numeric
    /// values contribute no factor.
    #[must_use]
    pub fn factor_for(&self, value: &TraitValue) -> Option<f64> {
        if !self.discrete.is_empty() {
            let text = value.as_text()?;
            return self
                .discrete
                .iter()
                .find(|row| row.value == text)
                .map(|row| row.factor);
        }

        let raw = value.as_number()?;
        let lo = self.min_value.min(self.max_value);
        let hi = self.min_value.max(self.max_value);
        let clamped = raw.clamp(lo, hi);

        if self.max_value == self.min_value {
            // Degenerate range pins the curve at its lower factor.
            return Some(self.min_factor);
        }

        // Computed as a position ratio so the range endpoints map to the
        // factor endpoints exactly.
        let t = (clamped - self.min_value) / (self.max_value - self.min_value);
        Some((self.max_factor - self.min_factor) * t + self.min_factor)
    }
}

/// Compute the issuance amount for one asset, in base units.
///
/// `total_supply` is the token's maximum supply in base units and
/// `slots_in_group` the number of assets the group may hold. Rules whose
/// trait is absent from the resolved set, and rules yielding a factor
/// `<= 0` (tolerated malformed data), contribute neither their factor nor
/// their average to the products.
///
/// # Errors
///
/// Returns `InvalidArgument` when `slots_in_group` is zero.
///
/// # Examples
///
/// ```
/// use relic_core::valuation::{ValuationRule, compute_issue_amount};
/// use relic_core::TraitSet;
///
/// // 1,000,000.0000 tokens over 10 slots; rarity 1..=100 maps to 0.5..=2.0.
/// let rules = vec![ValuationRule::linear("rarity", 1.0, 100.0, 0.5, 1.0, 2.0)];
/// let traits: TraitSet = [("rarity", 100.0)].into_iter().collect();
///
/// let amount = compute_issue_amount(10_000_000_000, 10, &rules, &traits)?;
/// assert_eq!(amount, 2_000_000_000); // 200,000.0000
/// # Ok::<(), relic_core::EngineError>(())
/// ```
pub fn compute_issue_amount(
    total_supply: u64,
    slots_in_group: u32,
    rules: &[ValuationRule],
    traits: &TraitSet,
) -> Result<u64> {
    if slots_in_group == 0 {
        return Err(EngineError::invalid(
            "group must hold at least one slot to value an asset",
        ));
    }

    let mut total_factor = 1.0f64;
    let mut total_avg = 1.0f64;

    for rule in rules {
        let Some(value) = traits.get(&rule.trait_name) else {
            continue;
        };
        match rule.factor_for(value) {
            Some(factor) if factor > 0.0 => {
                total_factor *= factor;
                total_avg *= rule.avg_factor;
            }
            _ => {}
        }
    }

    let base_share = total_supply as f64 / f64::from(slots_in_group);
    let amount = (base_share * (total_factor / total_avg)).floor();
    trace!(total_factor, total_avg, amount, "valued asset");

    if amount <= 0.0 {
        return Ok(0);
    }
    if amount >= u64::MAX as f64 {
        return Err(EngineError::invariant(format!(
            "valuation overflow: {amount} base units does not fit a supply counter"
        )));
    }
    Ok(amount as u64)
}

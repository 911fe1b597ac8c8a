//! Trait data resolved from custody records.
//!
//! An asset's effective trait set is layered: the template's immutable
//! data is overridden by the asset's immutable data, which is overridden
//! by the asset's mutable data. The valuation engine only ever sees the
//! resolved set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single trait value as stored in the registry schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitValue {
    /// A textual value, matched exactly against discrete factor tables.
    Text(String),
    /// A numeric value, fed through the interpolated pricing curve.
    Number(f64),
}

impl TraitValue {
    /// The numeric reading of this value, if it has one.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    /// The textual reading of this value, if it has one.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

impl fmt::Display for TraitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for TraitValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for TraitValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// A named set of trait values, ordered by trait name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitSet {
    values: BTreeMap<String, TraitValue>,
}

impl TraitSet {
    /// Create an empty trait set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a trait value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<TraitValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Look up a trait by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TraitValue> {
        self.values.get(name)
    }

    /// Number of traits in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Layer the three custody-record trait sets into one resolved set.
    ///
    /// Template-immutable values are overridden by asset-immutable
    /// values, which are overridden by asset-mutable values.
    #[must_use]
    pub fn resolve(template_immutable: &Self, asset_immutable: &Self, asset_mutable: &Self) -> Self {
        let mut resolved = template_immutable.clone();
        for (name, value) in &asset_immutable.values {
            resolved.values.insert(name.clone(), value.clone());
        }
        for (name, value) in &asset_mutable.values {
            resolved.values.insert(name.clone(), value.clone());
        }
        resolved
    }
}

impl<K: Into<String>, V: Into<TraitValue>> FromIterator<(K, V)> for TraitSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (k, v) in iter {
            set.set(k, v);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_precedence_mutable_wins() {
        let template: TraitSet = [("rarity", "common"), ("artist", "ada")].into_iter().collect();
        let immutable: TraitSet = [("rarity", "rare")].into_iter().collect();
        let mutable: TraitSet = [("rarity", "epic")].into_iter().collect();

        let resolved = TraitSet::resolve(&template, &immutable, &mutable);
        assert_eq!(resolved.get("rarity"), Some(&TraitValue::from("epic")));
        assert_eq!(resolved.get("artist"), Some(&TraitValue::from("ada")));
    }

    #[test]
    fn immutable_overrides_template() {
        let template: TraitSet = [("level", 1.0)].into_iter().collect();
        let immutable: TraitSet = [("level", 7.0)].into_iter().collect();

        let resolved = TraitSet::resolve(&template, &immutable, &TraitSet::new());
        assert_eq!(resolved.get("level").and_then(TraitValue::as_number), Some(7.0));
    }

    #[test]
    fn numeric_and_text_readings() {
        let v = TraitValue::from(42.0);
        assert_eq!(v.as_number(), Some(42.0));
        assert_eq!(v.as_text(), None);

        let t = TraitValue::from("gold");
        assert_eq!(t.as_text(), Some("gold"));
        assert_eq!(t.as_number(), None);
    }

    #[test]
    fn trait_set_serde_roundtrip() {
        let set: TraitSet = [("speed", TraitValue::from(3.5))].into_iter().collect();
        let json = serde_json::to_string(&set).expect("serialize");
        let parsed: TraitSet = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(set, parsed);
    }
}

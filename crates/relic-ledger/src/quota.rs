//! Per-group tokenization quotas.
//!
//! Each fractionalizable group declares how many of its assets may be
//! simultaneously fractionalized. Admission increments the live count,
//! redemption releases it; both happen atomically with the corresponding
//! mint or burn inside one transaction.

use relic_core::{EngineError, GroupId, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The quota state of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaRecord {
    /// The group this quota bounds.
    pub group: GroupId,
    /// How many assets may be fractionalized at once.
    pub max_assets_to_tokenize: u32,
    /// How many currently are.
    pub currently_tokenized: u32,
}

impl QuotaRecord {
    /// Remaining admission slots.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.max_assets_to_tokenize - self.currently_tokenized
    }
}

/// The table of quota records, keyed by group id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLedger {
    records: BTreeMap<GroupId, QuotaRecord>,
}

impl QuotaLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a quota for a group.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEntry` if the group already has a quota (a group
    /// can only ever back one token) and `InvalidArgument` for a zero
    /// maximum.
    pub fn create(&mut self, group: GroupId, max_assets: u32) -> Result<()> {
        if max_assets == 0 {
            return Err(EngineError::invalid(format!(
                "group {group} needs a positive maximum number of assets to tokenize"
            )));
        }
        if self.records.contains_key(&group) {
            return Err(EngineError::duplicate(format!(
                "group {group} has already been tokenized"
            )));
        }
        self.records.insert(
            group,
            QuotaRecord {
                group,
                max_assets_to_tokenize: max_assets,
                currently_tokenized: 0,
            },
        );
        Ok(())
    }

    /// Look up a quota record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the group has no quota.
    pub fn get(&self, group: GroupId) -> Result<&QuotaRecord> {
        self.records.get(&group).ok_or_else(|| {
            EngineError::not_found(format!("group {group} cannot be tokenized, no token exists"))
        })
    }

    /// Admit one more asset into the group.
    ///
    /// # Errors
    ///
    /// Returns `QuotaExceeded` when the group is at capacity.
    pub fn admit(&mut self, group: GroupId) -> Result<()> {
        let record = self.records.get_mut(&group).ok_or_else(|| {
            EngineError::not_found(format!("group {group} cannot be tokenized, no token exists"))
        })?;
        if record.currently_tokenized >= record.max_assets_to_tokenize {
            return Err(EngineError::quota_exceeded(format!(
                "group {group} is at its maximum of {} tokenized assets",
                record.max_assets_to_tokenize
            )));
        }
        record.currently_tokenized += 1;
        Ok(())
    }

    /// Release one admission slot; symmetric with [`Self::admit`].
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` when the count is already zero.
    pub fn release(&mut self, group: GroupId) -> Result<()> {
        let record = self
            .records
            .get_mut(&group)
            .ok_or_else(|| EngineError::not_found(format!("group {group} has no quota")))?;
        record.currently_tokenized = record.currently_tokenized.checked_sub(1).ok_or_else(|| {
            EngineError::invariant(format!("group {group} released below zero tokenized assets"))
        })?;
        Ok(())
    }

    /// Change the maximum for a group.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when the new maximum is below the number
    /// of currently tokenized assets.
    pub fn set_max(&mut self, group: GroupId, new_max: u32) -> Result<()> {
        let record = self
            .records
            .get_mut(&group)
            .ok_or_else(|| EngineError::not_found(format!("group {group} has no quota")))?;
        if new_max < record.currently_tokenized {
            return Err(EngineError::invalid(format!(
                "group {group} has {} assets tokenized, cannot cap at {new_max}",
                record.currently_tokenized
            )));
        }
        record.max_assets_to_tokenize = new_max;
        Ok(())
    }

    /// Drop the quota record for a group, if present.
    pub fn remove(&mut self, group: GroupId) -> Option<QuotaRecord> {
        self.records.remove(&group)
    }

    /// Iterate all records in group order.
    pub fn iter(&self) -> impl Iterator<Item = &QuotaRecord> {
        self.records.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const GROUP: GroupId = GroupId::new(31);

    #[test]
    fn admit_until_full() {
        let mut quotas = QuotaLedger::new();
        quotas.create(GROUP, 2).expect("create");
        quotas.admit(GROUP).expect("first");
        // One below the maximum still admits.
        quotas.admit(GROUP).expect("second");
        let err = quotas.admit(GROUP).expect_err("full");
        assert!(matches!(err, EngineError::QuotaExceeded { .. }));
        assert_eq!(quotas.get(GROUP).expect("get").currently_tokenized, 2);
    }

    #[test]
    fn release_frees_a_slot() {
        let mut quotas = QuotaLedger::new();
        quotas.create(GROUP, 1).expect("create");
        quotas.admit(GROUP).expect("admit");
        quotas.release(GROUP).expect("release");
        quotas.admit(GROUP).expect("re-admit");
    }

    #[test]
    fn release_below_zero_is_invariant_violation() {
        let mut quotas = QuotaLedger::new();
        quotas.create(GROUP, 1).expect("create");
        let err = quotas.release(GROUP).expect_err("empty");
        assert!(matches!(err, EngineError::InvariantViolation { .. }));
    }

    #[test]
    fn duplicate_group_rejected() {
        let mut quotas = QuotaLedger::new();
        quotas.create(GROUP, 5).expect("create");
        assert!(matches!(
            quotas.create(GROUP, 9).expect_err("dup"),
            EngineError::DuplicateEntry { .. }
        ));
    }

    #[test_case(0, false; "zero maximum rejected")]
    #[test_case(1, true; "single slot allowed")]
    #[test_case(u32::MAX, true; "huge maximum allowed")]
    fn create_validates_the_maximum(max: u32, ok: bool) {
        let mut quotas = QuotaLedger::new();
        assert_eq!(quotas.create(GROUP, max).is_ok(), ok);
    }

    #[test]
    fn set_max_respects_live_count() {
        let mut quotas = QuotaLedger::new();
        quotas.create(GROUP, 5).expect("create");
        quotas.admit(GROUP).expect("admit");
        quotas.admit(GROUP).expect("admit");

        let err = quotas.set_max(GROUP, 1).expect_err("below live count");
        assert!(matches!(err, EngineError::InvalidArgument { .. }));

        quotas.set_max(GROUP, 2).expect("exact");
        assert_eq!(quotas.get(GROUP).expect("get").remaining(), 0);
    }

    #[test]
    fn unknown_group_is_not_found() {
        let mut quotas = QuotaLedger::new();
        assert!(matches!(
            quotas.admit(GROUP).expect_err("missing"),
            EngineError::NotFound { .. }
        ));
    }
}

//! Error taxonomy for the fractionalization engine.
//!
//! Every failure aborts the whole enclosing transaction; there is no
//! partial application and no retry logic inside the engine. Each variant
//! carries a human-readable reason surfaced to the caller.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur during engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Authentication or authorization check failed.
    #[error("unauthorized: {reason}")]
    Unauthorized {
        /// Why the caller is not allowed to perform the action.
        reason: String,
    },

    /// A required record is missing.
    #[error("not found: {reason}")]
    NotFound {
        /// Description of the missing record.
        reason: String,
    },

    /// A group is already at its tokenization cap.
    #[error("quota exceeded: {reason}")]
    QuotaExceeded {
        /// Description of the exhausted quota.
        reason: String,
    },

    /// A mint would push issued supply past the maximum.
    #[error("supply exceeded: {reason}")]
    SupplyExceeded {
        /// Description of the supply overflow.
        reason: String,
    },

    /// A redemption presented an amount other than the recorded issuance.
    #[error("amount mismatch: must present exactly {expected}, got {presented}")]
    AmountMismatch {
        /// The amount frozen at tokenization time.
        expected: String,
        /// The amount the caller presented.
        presented: String,
    },

    /// A debit would drive a balance negative.
    #[error("overdrawn: {reason}")]
    Overdrawn {
        /// Description of the failing debit.
        reason: String,
    },

    /// A record that must be unique already exists.
    #[error("duplicate entry: {reason}")]
    DuplicateEntry {
        /// Description of the conflicting record.
        reason: String,
    },

    /// Malformed input: non-positive amounts, bad rule bounds, bad memos.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Description of the invalid input.
        reason: String,
    },

    /// Internal bookkeeping bug guard (e.g. burn underflow).
    #[error("invariant violation: {reason}")]
    InvariantViolation {
        /// Description of the broken invariant.
        reason: String,
    },
}

impl EngineError {
    /// Create an unauthorized error.
    #[must_use]
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Create a not-found error.
    #[must_use]
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound {
            reason: reason.into(),
        }
    }

    /// Create a quota-exceeded error.
    #[must_use]
    pub fn quota_exceeded(reason: impl Into<String>) -> Self {
        Self::QuotaExceeded {
            reason: reason.into(),
        }
    }

    /// Create a supply-exceeded error.
    #[must_use]
    pub fn supply_exceeded(reason: impl Into<String>) -> Self {
        Self::SupplyExceeded {
            reason: reason.into(),
        }
    }

    /// Create an overdrawn error.
    #[must_use]
    pub fn overdrawn(reason: impl Into<String>) -> Self {
        Self::Overdrawn {
            reason: reason.into(),
        }
    }

    /// Create a duplicate-entry error.
    #[must_use]
    pub fn duplicate(reason: impl Into<String>) -> Self {
        Self::DuplicateEntry {
            reason: reason.into(),
        }
    }

    /// Create an invalid-argument error.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create an invariant-violation error.
    #[must_use]
    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_display() {
        let err = EngineError::unauthorized("account bob lacks collection authorization");
        assert!(err.to_string().contains("unauthorized"));
        assert!(err.to_string().contains("bob"));
    }

    #[test]
    fn amount_mismatch_display() {
        let err = EngineError::AmountMismatch {
            expected: "2000000 SHARD".to_string(),
            presented: "1999999 SHARD".to_string(),
        };
        let s = err.to_string();
        assert!(s.contains("2000000 SHARD"));
        assert!(s.contains("1999999 SHARD"));
    }

    #[test]
    fn errors_compare_equal() {
        assert_eq!(
            EngineError::overdrawn("balance short"),
            EngineError::overdrawn("balance short")
        );
        assert_ne!(
            EngineError::overdrawn("balance short"),
            EngineError::not_found("balance short")
        );
    }
}

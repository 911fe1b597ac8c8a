//! Currency symbols and base-unit token amounts.
//!
//! Amounts are stored as integer base units for precision; the symbol
//! carries the decimal precision used only for display and for sizing one
//! whole token. Two amounts are only comparable or combinable when their
//! symbols (code and precision) match exactly.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum decimal precision a symbol may declare.
pub const MAX_PRECISION: u8 = 18;

/// A currency symbol: short uppercase code plus decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol {
    code: [u8; 7],
    len: u8,
    precision: u8,
}

impl Symbol {
    /// Create a symbol from a code and precision.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the code is empty, longer than seven
    /// characters, contains anything but `A`–`Z`, or the precision
    /// exceeds [`MAX_PRECISION`].
    pub fn new(code: &str, precision: u8) -> Result<Self> {
        if code.is_empty() || code.len() > 7 {
            return Err(EngineError::invalid(format!(
                "symbol code must be 1-7 characters, got {:?}",
                code
            )));
        }
        if !code.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(EngineError::invalid(format!(
                "symbol code must be uppercase A-Z, got {:?}",
                code
            )));
        }
        if precision > MAX_PRECISION {
            return Err(EngineError::invalid(format!(
                "symbol precision must be <= {MAX_PRECISION}, got {precision}"
            )));
        }
        let mut buf = [0u8; 7];
        buf[..code.len()].copy_from_slice(code.as_bytes());
        Ok(Self {
            code: buf,
            len: code.len() as u8,
            precision,
        })
    }

    /// The symbol code, e.g. `"SHARD"`.
    #[must_use]
    pub fn code(&self) -> &str {
        // Only ever built from validated ASCII.
        std::str::from_utf8(&self.code[..self.len as usize]).unwrap_or_default()
    }

    /// The declared decimal precision.
    #[must_use]
    pub const fn precision(&self) -> u8 {
        self.precision
    }

    /// Base units in one whole token (`10^precision`).
    #[must_use]
    pub fn unit_scale(&self) -> u64 {
        10u64.pow(u32::from(self.precision))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision, self.code())
    }
}

/// An amount of some token, stored as integer base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenAmount {
    symbol: Symbol,
    units: u64,
}

impl TokenAmount {
    /// Create an amount from base units.
    #[must_use]
    pub const fn new(symbol: Symbol, units: u64) -> Self {
        Self { symbol, units }
    }

    /// Zero of the given currency.
    #[must_use]
    pub const fn zero(symbol: Symbol) -> Self {
        Self { symbol, units: 0 }
    }

    /// Create an amount from whole tokens.
    #[must_use]
    pub fn whole(symbol: Symbol, tokens: u64) -> Self {
        Self {
            symbol,
            units: tokens.saturating_mul(symbol.unit_scale()),
        }
    }

    /// The currency of this amount.
    #[must_use]
    pub const fn symbol(&self) -> Symbol {
        self.symbol
    }

    /// The amount in base units.
    #[must_use]
    pub const fn units(&self) -> u64 {
        self.units
    }

    /// Check if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.units == 0
    }

    /// Checked addition; both operands must share a symbol.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` on a symbol mismatch and
    /// `InvariantViolation` on `u64` overflow.
    pub fn checked_add(&self, other: Self) -> Result<Self> {
        self.require_same_symbol(other)?;
        let units = self.units.checked_add(other.units).ok_or_else(|| {
            EngineError::invariant(format!("amount overflow adding {other} to {self}"))
        })?;
        Ok(Self {
            symbol: self.symbol,
            units,
        })
    }

    /// Checked subtraction; both operands must share a symbol.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` on a symbol mismatch and
    /// `InvariantViolation` on underflow.
    pub fn checked_sub(&self, other: Self) -> Result<Self> {
        self.require_same_symbol(other)?;
        let units = self.units.checked_sub(other.units).ok_or_else(|| {
            EngineError::invariant(format!("amount underflow subtracting {other} from {self}"))
        })?;
        Ok(Self {
            symbol: self.symbol,
            units,
        })
    }

    fn require_same_symbol(&self, other: Self) -> Result<()> {
        if self.symbol == other.symbol {
            Ok(())
        } else {
            Err(EngineError::invalid(format!(
                "symbol mismatch: {} vs {}",
                self.symbol, other.symbol
            )))
        }
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = self.symbol.unit_scale();
        let whole = self.units / scale;
        if self.symbol.precision() == 0 {
            write!(f, "{whole} {}", self.symbol.code())
        } else {
            let frac = self.units % scale;
            write!(
                f,
                "{whole}.{frac:0width$} {}",
                self.symbol.code(),
                width = self.symbol.precision() as usize
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn shard() -> Symbol {
        Symbol::new("SHARD", 4).expect("valid symbol")
    }

    #[test_case("", 4; "empty code")]
    #[test_case("TOOLONGX", 4; "code too long")]
    #[test_case("shard", 4; "lowercase code")]
    #[test_case("SH4RD", 4; "digit in code")]
    #[test_case("SHARD", 19; "precision too high")]
    fn rejects_bad_symbols(code: &str, precision: u8) {
        assert!(Symbol::new(code, precision).is_err());
    }

    #[test]
    fn symbol_display_includes_precision() {
        assert_eq!(shard().to_string(), "4,SHARD");
        assert_eq!(shard().unit_scale(), 10_000);
    }

    #[test]
    fn symbols_with_different_precision_differ() {
        let a = Symbol::new("SHARD", 4).expect("symbol");
        let b = Symbol::new("SHARD", 8).expect("symbol");
        assert_ne!(a, b);
    }

    #[test]
    fn whole_tokens_scale_by_precision() {
        let amount = TokenAmount::whole(shard(), 25);
        assert_eq!(amount.units(), 250_000);
    }

    #[test]
    fn display_pads_fraction() {
        let amount = TokenAmount::new(shard(), 2_000_000_503);
        assert_eq!(amount.to_string(), "200000.0503 SHARD");
    }

    #[test]
    fn display_zero_precision() {
        let sym = Symbol::new("TICKET", 0).expect("symbol");
        assert_eq!(TokenAmount::new(sym, 17).to_string(), "17 TICKET");
    }

    #[test]
    fn checked_add_same_symbol() {
        let a = TokenAmount::new(shard(), 100);
        let b = TokenAmount::new(shard(), 50);
        assert_eq!(a.checked_add(b).expect("add").units(), 150);
    }

    #[test]
    fn checked_sub_underflow_is_invariant_violation() {
        let a = TokenAmount::new(shard(), 10);
        let b = TokenAmount::new(shard(), 20);
        let err = a.checked_sub(b).expect_err("underflow");
        assert!(matches!(err, EngineError::InvariantViolation { .. }));
    }

    #[test]
    fn mixed_symbols_rejected() {
        let a = TokenAmount::new(shard(), 10);
        let b = TokenAmount::new(Symbol::new("WAX", 8).expect("symbol"), 10);
        assert!(a.checked_add(b).is_err());
        assert!(a.checked_sub(b).is_err());
    }

    #[test]
    fn amount_serde_roundtrip() {
        let amount = TokenAmount::new(shard(), 123_456);
        let json = serde_json::to_string(&amount).expect("serialize");
        let parsed: TokenAmount = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(amount, parsed);
    }
}

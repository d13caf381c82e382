//! Money as integer cents.
//!
//! All monetary amounts in the system are non-negative integer cents.
//! Percentages (discounts, the tax rate) are applied with round-half-up
//! semantics so that `130.00 * 10% == 13.00` and `117.00 * 15% == 17.55`.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A non-negative monetary amount in cents.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Construct from cents. Negative amounts are rejected.
    pub fn from_cents(cents: i64) -> DomainResult<Self> {
        if cents < 0 {
            return Err(DomainError::validation("amount must not be negative"));
        }
        Ok(Self(cents))
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Money) -> DomainResult<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or_else(|| DomainError::invariant("amount overflow"))
    }

    /// Subtraction; underflow below zero is an invariant violation.
    pub fn checked_sub(self, other: Money) -> DomainResult<Self> {
        if other.0 > self.0 {
            return Err(DomainError::invariant("amount underflow"));
        }
        Ok(Self(self.0 - other.0))
    }

    /// Multiply by a quantity (line totals).
    pub fn checked_mul(self, quantity: u32) -> DomainResult<Self> {
        self.0
            .checked_mul(i64::from(quantity))
            .map(Self)
            .ok_or_else(|| DomainError::invariant("amount overflow"))
    }

    /// `percent`% of this amount, rounded half-up to the nearest cent.
    ///
    /// Callers validate `percent <= 100`; values above that are accepted here
    /// so the tax constant (15) and discounts share one code path.
    pub fn percent_round(self, percent: u8) -> Money {
        // i128 intermediate: i64 cents * 100 cannot overflow it.
        let scaled = i128::from(self.0) * i128::from(percent);
        Money(((scaled + 50) / 100) as i64)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(Money::from_cents(-1).is_err());
        assert_eq!(Money::from_cents(0).unwrap(), Money::ZERO);
    }

    #[test]
    fn percent_rounds_half_up() {
        // 117.00 * 15% = 17.55 exactly.
        let base = Money::from_cents(11_700).unwrap();
        assert_eq!(base.percent_round(15).cents(), 1_755);

        // 0.10 * 15% = 0.015 -> rounds up to 0.02.
        let tiny = Money::from_cents(10).unwrap();
        assert_eq!(tiny.percent_round(15).cents(), 2);

        // 0.09 * 15% = 0.0135 -> rounds down to 0.01.
        let tinier = Money::from_cents(9).unwrap();
        assert_eq!(tinier.percent_round(15).cents(), 1);
    }

    #[test]
    fn display_pads_cents() {
        assert_eq!(Money::from_cents(13_455).unwrap().to_string(), "134.55");
        assert_eq!(Money::from_cents(5).unwrap().to_string(), "0.05");
    }

    #[test]
    fn checked_sub_refuses_underflow() {
        let a = Money::from_cents(100).unwrap();
        let b = Money::from_cents(200).unwrap();
        assert!(a.checked_sub(b).is_err());
        assert_eq!(b.checked_sub(a).unwrap().cents(), 100);
    }
}

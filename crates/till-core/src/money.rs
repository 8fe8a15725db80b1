//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A payment check like |sum(splits) - total| < 0.01 only exists         │
//! │  because of that noise.                                                 │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Totals, splits and ledger aggregates are whole cents, so a          │
//! │    balanced sale is one where the sums are EQUAL.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Quantities (kilograms, liters) stay `f64`; the only place a float meets
//! money is [`Money::scale`], which rounds straight back to cents.
//!
//! ## Usage
//! ```rust
//! use till_core::money::Money;
//!
//! let price = Money::from_cents(10000); // $100.00 per Kg
//! let line = price.scale(0.25);         // 250 g
//! assert_eq!(line.cents(), 2500);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for differences and losses
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price ──► SaleLineItem.unit_price ──► line_total ──► total    │
/// │                                                                         │
/// │  total ──► PaymentSplit.amount (one per method)                         │
/// │                                                                         │
/// │  total ──► DailyCashMovement.amount ──► DailyCash.total_income          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative values to zero.
    ///
    /// Payment splits never go below zero when they absorb a residual.
    #[inline]
    pub const fn non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Multiplies by a fractional factor and rounds to the nearest cent.
    ///
    /// ## Rounding
    /// Standard rounding (half away from zero), the same rule a cashier
    /// applies when rounding a weighed price to two decimals:
    /// ```text
    /// $100.00/Kg × 0.3335 Kg = $33.35
    /// $  0.01    × 0.5       = $ 0.01   (half rounds up)
    /// ```
    ///
    /// Non-finite factors yield zero.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let per_kg = Money::from_cents(10000);
    /// assert_eq!(per_kg.scale(2.0).cents(), 20000);
    /// assert_eq!(Money::from_cents(1).scale(0.5).cents(), 1);
    /// ```
    pub fn scale(&self, factor: f64) -> Money {
        if !factor.is_finite() {
            return Money::zero();
        }
        let scaled = (self.0 as f64 * factor).round();
        Money(scaled as i64)
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let line = Money::from_cents(10000);
    /// assert_eq!(line.apply_percentage_discount(10.0).cents(), 9000);
    /// ```
    pub fn apply_percentage_discount(&self, percent: f64) -> Money {
        if percent <= 0.0 {
            return *self;
        }
        self.scale(1.0 - percent.min(100.0) / 100.0)
    }

    /// Splits the amount into `parts` shares that add back up exactly.
    ///
    /// Leftover cents go to the last share.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let shares = Money::from_cents(1001).split_evenly(2);
    /// assert_eq!(shares, vec![Money::from_cents(500), Money::from_cents(501)]);
    /// ```
    pub fn split_evenly(&self, parts: usize) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }
        let share = self.0 / parts as i64;
        let mut shares = vec![Money(share); parts];
        let assigned = share * parts as i64;
        if let Some(last) = shares.last_mut() {
            last.0 += self.0 - assigned;
        }
        shares
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs and error messages. The frontend formats for display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_scale_rounds_half_away_from_zero() {
        assert_eq!(Money::from_cents(10000).scale(0.3335).cents(), 3335);
        assert_eq!(Money::from_cents(1).scale(0.5).cents(), 1);
        assert_eq!(Money::from_cents(-1).scale(0.5).cents(), -1);
        assert_eq!(Money::from_cents(999).scale(1.0 / 3.0).cents(), 333);
        assert_eq!(Money::from_cents(100).scale(f64::NAN).cents(), 0);
    }

    #[test]
    fn test_percentage_discount() {
        let subtotal = Money::from_cents(10000);
        assert_eq!(subtotal.apply_percentage_discount(10.0).cents(), 9000);
        assert_eq!(subtotal.apply_percentage_discount(0.0).cents(), 10000);
        assert_eq!(subtotal.apply_percentage_discount(150.0).cents(), 0);
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(Money::from_cents(-250).non_negative(), Money::zero());
        assert_eq!(Money::from_cents(250).non_negative().cents(), 250);
    }

    /// $10.00 split two ways is exact, $10.01 leaves the odd cent on the last share.
    #[test]
    fn test_split_evenly_keeps_every_cent() {
        let shares = Money::from_cents(1000).split_evenly(2);
        assert_eq!(shares, vec![Money::from_cents(500), Money::from_cents(500)]);

        let shares = Money::from_cents(1000).split_evenly(3);
        assert_eq!(shares[2].cents(), 334);
        assert_eq!(shares.into_iter().sum::<Money>().cents(), 1000);

        assert!(Money::from_cents(1000).split_evenly(0).is_empty());
    }
}

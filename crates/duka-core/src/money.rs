//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With floats, a crate of 24 at 0.1 per unit accumulated line by line   │
//! │  drifts: 0.1 + 0.2 = 0.30000000000000004                               │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    Every price, cost and total is a count of the currency's smallest   │
//! │    unit. Cart totals, sale totals and daily revenue are exact sums.    │
//! │                                                                         │
//! │  Rounding happens in exactly two places, both one-way:                 │
//! │    • percentage discount → effective unit price                        │
//! │    • pack price ÷ units per pack → per-unit display price              │
//! │  Neither result is ever fed back into a total.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use duka_core::money::Money;
//!
//! let price = Money::from_minor(1500);
//! let pack = price.multiply_quantity(12);
//! assert_eq!(pack.minor(), 18000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

/// Basis points in 100%.
pub const BPS_SCALE: i64 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: losses (negative profit) and reversals must be representable
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serialized as a bare integer**: snapshots and API payloads stay compact
///
/// ## Where Money Flows
/// ```text
/// Product.sell_price ──► effective_price ──► CartLineItem.price_per_pack
///                                                    │
///                                                    ▼
///                        Sale.total_price = pack_quantity × price_per_pack
///                                                    │
///                                                    ▼
///                              DailySummary.sales_revenue (exact sum)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ```rust
    /// use duka_core::money::Money;
    ///
    /// let price = Money::from_minor(1099);
    /// assert_eq!(price.minor(), 1099);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Creates a Money value from whole major units, given the currency's
    /// number of decimal places.
    ///
    /// ```rust
    /// use duka_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(15, 2).minor(), 1500);
    /// assert_eq!(Money::from_major(1500, 0).minor(), 1500);
    /// ```
    #[inline]
    pub const fn from_major(major: i64, decimals: u32) -> Self {
        Money(major * 10_i64.pow(decimals))
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use duka_core::money::Money;
    ///
    /// let pack_price = Money::from_minor(15000);
    /// assert_eq!(pack_price.multiply_quantity(3).minor(), 45000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ## Arguments
    /// * `discount_bps` - Discount in basis points (2000 = 20%)
    ///
    /// Rounds half-up to the nearest minor unit, using i128 so large prices
    /// cannot overflow.
    ///
    /// ```rust
    /// use duka_core::money::Money;
    ///
    /// let price = Money::from_minor(1500);
    /// assert_eq!(price.apply_percentage_discount(2000).minor(), 1200);
    /// ```
    pub fn apply_percentage_discount(&self, discount_bps: u32) -> Money {
        let discount_amount =
            (self.0 as i128 * discount_bps as i128 + (BPS_SCALE as i128 / 2)) / BPS_SCALE as i128;
        Money::from_minor(self.0 - discount_amount as i64)
    }

    /// Divides by a positive count, rounding half away from zero.
    ///
    /// Used only for per-unit display prices (pack price ÷ units per pack).
    /// A zero divisor returns the value unchanged.
    ///
    /// ```rust
    /// use duka_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(15000).divide_rounded(12).minor(), 1250);
    /// assert_eq!(Money::from_minor(1000).divide_rounded(3).minor(), 333);
    /// assert_eq!(Money::from_minor(2000).divide_rounded(3).minor(), 667);
    /// ```
    pub fn divide_rounded(&self, divisor: i64) -> Money {
        if divisor <= 0 {
            return *self;
        }
        let half = divisor / 2;
        let rounded = if self.0 >= 0 {
            (self.0 + half) / divisor
        } else {
            (self.0 - half) / divisor
        };
        Money(rounded)
    }

    /// Returns the value as a float in minor units.
    ///
    /// For ratios (growth, ROI) only. Never store the result.
    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.0 as f64
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rendering with two decimal places.
///
/// ## Note
/// The register formats money with the shop's configured currency and
/// decimals; this impl is for logs and tests.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by a unit count.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_major() {
        assert_eq!(Money::from_major(10, 2).minor(), 1000);
        assert_eq!(Money::from_major(-5, 2).minor(), -500);
        assert_eq!(Money::from_major(1500, 0).minor(), 1500);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_minor(1099)), "10.99");
        assert_eq!(format!("{}", Money::from_minor(500)), "5.00");
        assert_eq!(format!("{}", Money::from_minor(-550)), "-5.50");
        assert_eq!(format!("{}", Money::zero()), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor(), 1500);
        assert_eq!((a - b).minor(), 500);
        assert_eq!((a * 3).minor(), 3000);
        assert_eq!((-a).minor(), -1000);
    }

    #[test]
    fn test_sum() {
        let values = vec![Money::from_minor(1000), Money::from_minor(2000), Money::from_minor(1)];
        let total: Money = values.iter().sum();
        assert_eq!(total.minor(), 3001);

        let owned: Money = values.into_iter().sum();
        assert_eq!(owned.minor(), 3001);
    }

    #[test]
    fn test_percentage_discount() {
        assert_eq!(Money::from_minor(1500).apply_percentage_discount(2000).minor(), 1200);
        assert_eq!(Money::from_minor(1500).apply_percentage_discount(0).minor(), 1500);
        assert_eq!(Money::from_minor(1500).apply_percentage_discount(10_000).minor(), 0);
        // 999 × 15% = 149.85 → 150 off
        assert_eq!(Money::from_minor(999).apply_percentage_discount(1500).minor(), 849);
    }

    #[test]
    fn test_divide_rounded() {
        assert_eq!(Money::from_minor(15000).divide_rounded(12).minor(), 1250);
        assert_eq!(Money::from_minor(1000).divide_rounded(3).minor(), 333);
        assert_eq!(Money::from_minor(1001).divide_rounded(2).minor(), 501);
        assert_eq!(Money::from_minor(-1001).divide_rounded(2).minor(), -501);
        assert_eq!(Money::from_minor(700).divide_rounded(0).minor(), 700);
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_minor(1).is_positive());
        assert!(Money::from_minor(-1).is_negative());
        assert_eq!(Money::from_minor(-42).abs().minor(), 42);
    }
}

//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Splitting R$ 100.00 across 3 payers in floating point:                │
//! │    33.333333... × 3 = 99.99999999  → which payer pays the drift?       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    10000 cents / 3 = 3333 cents, remainder 1                           │
//! │    First payer takes 3334, the rest 3333 → sum is exactly 10000        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use splitdesk_core::money::Money;
//!
//! let price = Money::from_cents(2000); // 20.00
//! let line = price.multiply_quantity(2); // 40.00
//! let shares = Money::from_cents(3).split_even(2);
//! assert_eq!(shares, vec![Money::from_cents(2), Money::from_cents(1)]);
//! assert_eq!(line.to_string(), "40.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::FeeRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: a payer's net total may go negative when a discount
///   exceeds the assigned items; that case is reported, never clamped
/// - **Single field tuple struct**: zero-cost abstraction over i64
///
/// ## Where Money Flows
/// ```text
/// LineItem.unit_price ──► AllocationEntry.unit_price (frozen copy)
///                                   │
///                                   ▼
///         Payer.subtotal − discount + surcharge = Payer.total_due
///                                   │
///                     ┌─────────────┴─────────────┐
///                     ▼                           ▼
///          amount_tendered − total_due     Σ total_due vs order total
///               = change                    (settlement validation)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use splitdesk_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
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

    /// Multiplies a unit price by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use splitdesk_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(2000);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 6000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// `multiply_quantity` that reports overflow instead of wrapping.
    #[inline]
    pub fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        self.0.checked_mul(qty).map(Money)
    }

    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Self> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Applies a basis-point rate, rounding half away from zero.
    ///
    /// Used for payment method fees: 45.00 at 250 bps (2.50%) is 1.13.
    ///
    /// ```rust
    /// use splitdesk_core::money::Money;
    /// use splitdesk_core::types::FeeRate;
    ///
    /// let fee = Money::from_cents(4500).percentage(FeeRate::from_bps(250));
    /// assert_eq!(fee.cents(), 113);
    /// ```
    pub fn percentage(&self, rate: FeeRate) -> Money {
        let raw = self.0 as i128 * rate.bps() as i128;
        let rounded = if raw >= 0 {
            (raw + 5000) / 10000
        } else {
            (raw - 5000) / 10000
        };
        Money(rounded as i64)
    }

    /// Splits this amount into `parts` shares that sum back exactly.
    ///
    /// The first share absorbs the indivisible remainder, matching the
    /// quantity split policy. Returns an empty vector for zero parts.
    ///
    /// ## Example
    /// ```text
    /// 10000 cents into 3 parts
    ///      │
    ///      ▼
    /// base = 3333, remainder = 1
    ///      │
    ///      ▼
    /// [3334, 3333, 3333]  (Σ = 10000)
    /// ```
    pub fn split_even(&self, parts: usize) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }

        let n = parts as i64;
        let base = self.0 / n;
        let remainder = self.0 % n;

        let mut shares = vec![Money(base); parts];
        shares[0] = Money(base + remainder);
        shares
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders `60.00` / `-5.50`. Receipt formatting (symbols, locale) is the
/// UI's job.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

/// Parses an operator-entered decimal amount.
///
/// Accepts `.` or `,` as the decimal separator and up to two fractional
/// digits. Anything finer than a cent is rejected rather than rounded.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let mut parts = digits.splitn(2, |c: char| c == '.' || c == ',');
        let whole = parts.next().unwrap_or_default();
        let fraction = parts.next().unwrap_or_default();

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected digits before the decimal separator"));
        }
        if fraction.len() > 2 {
            return Err(invalid("at most two decimal places are allowed"));
        }
        if !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected digits after the decimal separator"));
        }

        let major: i64 = whole
            .parse()
            .map_err(|_| invalid("amount is too large"))?;
        let minor: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().unwrap_or(0) * 10,
            _ => fraction.parse::<i64>().unwrap_or(0),
        };

        let cents = major
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(|| invalid("amount is too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
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

/// Multiplication by quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
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
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(6000).to_string(), "60.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_parse_operator_input() {
        assert_eq!("45".parse::<Money>().unwrap().cents(), 4500);
        assert_eq!("45.5".parse::<Money>().unwrap().cents(), 4550);
        assert_eq!("45.00".parse::<Money>().unwrap().cents(), 4500);
        assert_eq!("45,07".parse::<Money>().unwrap().cents(), 4507);
        assert_eq!(" -3.10 ".parse::<Money>().unwrap().cents(), -310);
    }

    #[test]
    fn test_parse_rejects_sub_cent_and_garbage() {
        assert!("0.015".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
        assert!(".50".parse::<Money>().is_err());
        assert!("12a".parse::<Money>().is_err());
        assert!("1.2x".parse::<Money>().is_err());
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);

        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        let amount = Money::from_cents(4500);
        assert_eq!(amount.percentage(FeeRate::from_bps(250)).cents(), 113);
        assert_eq!(amount.percentage(FeeRate::zero()).cents(), 0);
        assert_eq!(
            Money::from_cents(-4500)
                .percentage(FeeRate::from_bps(250))
                .cents(),
            -113
        );
    }

    #[test]
    fn test_split_even_first_share_takes_remainder() {
        let shares = Money::from_cents(10000).split_even(3);
        assert_eq!(
            shares,
            vec![
                Money::from_cents(3334),
                Money::from_cents(3333),
                Money::from_cents(3333)
            ]
        );
        assert_eq!(shares.iter().copied().sum::<Money>().cents(), 10000);
    }

    #[test]
    fn test_split_even_smaller_than_parts() {
        let shares = Money::from_cents(1).split_even(3);
        assert_eq!(shares[0].cents(), 1);
        assert!(shares[1..].iter().all(|s| s.is_zero()));
        assert!(Money::from_cents(500).split_even(0).is_empty());
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());
        assert!(Money::from_cents(-100).is_negative());
        assert_eq!(Money::from_cents(-100).abs().cents(), 100);
    }
}

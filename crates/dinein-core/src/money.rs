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
//! │  Prices stored as float baht drift every time they are summed.         │
//! │                                                                         │
//! │  OUR SOLUTION: Integer satang (minor units)                            │
//! │    ฿150.00 = 15000 satang                                               │
//! │    Sums and quantity products are exact integer operations             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! At the HTTP boundary money travels as a decimal string in major units
//! (`"150.00"`). Serde on `Money` reads and writes exactly that form; the
//! database stores the minor-unit integer.
//!
//! ## Usage
//! ```rust
//! use dinein_core::money::Money;
//!
//! let price = Money::from_minor(12000);          // ฿120.00
//! let line = price.mul_by_qty(2).unwrap();       // ฿240.00
//! let total = line.checked_add(Money::from_minor(5550)).unwrap();
//! assert_eq!(total.to_string(), "295.50");
//! ```
//!
//! Division is deliberately absent.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

/// Minor units per major unit (100 satang = 1 baht).
pub const MINOR_PER_MAJOR: i64 = 100;

/// Largest amount any constructor accepts, in minor units (2⁶²).
///
/// Two amounts below this bound can always be added without overflowing
/// an `i64`.
pub const MAX_MINOR: i64 = 1 << 62;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in minor units (satang).
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  MenuItem.price ──► OrderLine.unit_price (snapshot) ──► line total     │
/// │                                                      │                  │
/// │                                  Σ line totals ◄─────┘                  │
/// │                                        │                                │
/// │                                        ▼                                │
/// │                                 Payment.amount ──► revenue buckets      │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    /// Zero baht.
    pub const ZERO: Money = Money(0);

    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use dinein_core::money::Money;
    ///
    /// let price = Money::from_minor(5550); // ฿55.50
    /// assert_eq!(price.to_minor(), 5550);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Creates a Money value from a floating-point major amount.
    ///
    /// The value is taken at its shortest decimal representation and rounded
    /// half-to-even to the nearest minor unit, so `0.125` becomes 12 satang
    /// and `0.135` becomes 14.
    ///
    /// ## Errors
    /// - `InvalidMoney` for negative, NaN, or infinite input
    /// - `Overflow` above [`MAX_MINOR`]
    ///
    /// ## Example
    /// ```rust
    /// use dinein_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(120.0).unwrap().to_minor(), 12000);
    /// assert_eq!(Money::from_major(0.125).unwrap().to_minor(), 12);
    /// assert!(Money::from_major(-1.0).is_err());
    /// assert!(Money::from_major(f64::NAN).is_err());
    /// ```
    pub fn from_major(major: f64) -> CoreResult<Self> {
        if major.is_nan() {
            return Err(CoreError::invalid_money("NaN", "not a number"));
        }
        if !major.is_finite() {
            return Err(CoreError::invalid_money(major.to_string(), "not finite"));
        }
        if major < 0.0 {
            return Err(CoreError::invalid_money(major.to_string(), "negative"));
        }
        if major == 0.0 {
            // also catches -0.0, whose string form carries a sign
            return Ok(Money::ZERO);
        }

        // f64's Display never uses exponent notation, so this is a plain
        // decimal string that parse_decimal understands.
        parse_decimal(&major.to_string())
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn to_minor(&self) -> i64 {
        self.0
    }

    /// Returns the value in major units as a float (display only).
    #[inline]
    pub fn to_major(&self) -> f64 {
        self.0 as f64 / MINOR_PER_MAJOR as f64
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, signalling `Overflow` instead of wrapping.
    pub fn checked_add(self, other: Money) -> CoreResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or(CoreError::Overflow)
    }

    /// Multiplies a unit price by a line quantity.
    ///
    /// ## Example
    /// ```rust
    /// use dinein_core::money::Money;
    ///
    /// let unit = Money::from_minor(12000);
    /// assert_eq!(unit.mul_by_qty(2).unwrap().to_minor(), 24000);
    /// ```
    pub fn mul_by_qty(self, qty: i64) -> CoreResult<Money> {
        if qty < 0 {
            return Err(CoreError::invalid_money(
                qty.to_string(),
                "quantity must not be negative",
            ));
        }
        self.0
            .checked_mul(qty)
            .map(Money)
            .ok_or(CoreError::Overflow)
    }

    /// Sums an iterator of amounts, signalling `Overflow` on the first
    /// partial sum that does not fit.
    pub fn checked_sum<I>(amounts: I) -> CoreResult<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

// =============================================================================
// Decimal Parsing
// =============================================================================

/// Parses a non-negative decimal major-unit string into minor units.
///
/// Digits beyond the second fractional place are rounded half-to-even:
/// ```text
/// "1.005"  → 100   (tie, 100 is even)
/// "1.015"  → 102   (tie, 101 is odd → up)
/// "1.0051" → 101   (above the tie)
/// ```
fn parse_decimal(input: &str) -> CoreResult<Money> {
    let s = input.trim();
    let s = s.strip_prefix('+').unwrap_or(s);

    if s.starts_with('-') {
        return Err(CoreError::invalid_money(input, "negative"));
    }

    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(CoreError::invalid_money(input, "no digits"));
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(CoreError::invalid_money(input, "not a decimal number"));
    }

    let mut minor: i64 = 0;
    for digit in int_part.bytes() {
        minor = minor
            .checked_mul(10)
            .and_then(|m| m.checked_add(i64::from(digit - b'0')))
            .ok_or(CoreError::Overflow)?;
    }
    minor = minor.checked_mul(MINOR_PER_MAJOR).ok_or(CoreError::Overflow)?;

    let frac = frac_part.as_bytes();
    let tens = frac.first().map_or(0, |d| i64::from(d - b'0'));
    let ones = frac.get(1).map_or(0, |d| i64::from(d - b'0'));
    minor = minor
        .checked_add(tens * 10 + ones)
        .ok_or(CoreError::Overflow)?;

    if frac.len() > 2 {
        let rest = &frac[2..];
        let round_up = match rest[0] {
            b'6'..=b'9' => true,
            b'5' => rest[1..].iter().any(|d| *d != b'0') || minor % 2 == 1,
            _ => false,
        };
        if round_up {
            minor = minor.checked_add(1).ok_or(CoreError::Overflow)?;
        }
    }

    if minor > MAX_MINOR {
        return Err(CoreError::Overflow);
    }

    Ok(Money(minor))
}

impl FromStr for Money {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_decimal(s)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders major units with two decimals, no currency symbol: `"295.50"`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per = MINOR_PER_MAJOR as u64;
        write!(f, "{}{}.{:02}", sign, abs / per, abs % per)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Cow::<'de, str>::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_minor_and_display() {
        assert_eq!(Money::from_minor(29550).to_string(), "295.50");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
        assert_eq!(Money::ZERO.to_string(), "0.00");
        assert_eq!(Money::from_minor(-550).to_string(), "-5.50");
    }

    #[test]
    fn test_from_major_rounds_half_to_even() {
        assert_eq!(Money::from_major(120.0).unwrap().to_minor(), 12000);
        assert_eq!(Money::from_major(55.5).unwrap().to_minor(), 5550);
        assert_eq!(Money::from_major(0.125).unwrap().to_minor(), 12);
        assert_eq!(Money::from_major(0.135).unwrap().to_minor(), 14);
        assert_eq!(Money::from_major(0.29).unwrap().to_minor(), 29);
        assert_eq!(Money::from_major(0.0).unwrap(), Money::ZERO);
    }

    #[test]
    fn test_from_major_rejects_bad_input() {
        assert!(matches!(
            Money::from_major(-0.01),
            Err(CoreError::InvalidMoney { .. })
        ));
        assert!(matches!(
            Money::from_major(f64::NAN),
            Err(CoreError::InvalidMoney { .. })
        ));
        assert!(matches!(
            Money::from_major(f64::INFINITY),
            Err(CoreError::InvalidMoney { .. })
        ));
        assert!(matches!(Money::from_major(1e300), Err(CoreError::Overflow)));
    }

    #[test]
    fn test_parse_decimal_strings() {
        assert_eq!("150.00".parse::<Money>().unwrap().to_minor(), 15000);
        assert_eq!("150".parse::<Money>().unwrap().to_minor(), 15000);
        assert_eq!("0.5".parse::<Money>().unwrap().to_minor(), 50);
        assert_eq!(".75".parse::<Money>().unwrap().to_minor(), 75);
        assert_eq!("1.005".parse::<Money>().unwrap().to_minor(), 100);
        assert_eq!("1.015".parse::<Money>().unwrap().to_minor(), 102);
        assert_eq!("1.0051".parse::<Money>().unwrap().to_minor(), 101);

        assert!("-1.00".parse::<Money>().is_err());
        assert!("1,000".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!(".".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
    }

    #[test]
    fn test_checked_arithmetic() {
        let a = Money::from_minor(24000);
        let b = Money::from_minor(5550);
        assert_eq!(a.checked_add(b).unwrap().to_minor(), 29550);

        let near_max = Money::from_minor(i64::MAX - 1);
        assert!(matches!(
            near_max.checked_add(Money::from_minor(2)),
            Err(CoreError::Overflow)
        ));
        assert!(matches!(
            Money::from_minor(MAX_MINOR).mul_by_qty(4),
            Err(CoreError::Overflow)
        ));
        assert!(Money::from_minor(100).mul_by_qty(-1).is_err());
    }

    #[test]
    fn test_bounded_addends_never_overflow() {
        let a = Money::from_minor(MAX_MINOR - 1);
        assert!(a.checked_add(a).is_ok());
    }

    #[test]
    fn test_checked_sum() {
        let total = Money::checked_sum([12000, 12000, 5550].map(Money::from_minor)).unwrap();
        assert_eq!(total.to_minor(), 29550);
        assert_eq!(Money::checked_sum(Vec::new()).unwrap(), Money::ZERO);
    }

    #[test]
    fn test_serde_uses_decimal_string() {
        let json = serde_json::to_string(&Money::from_minor(29550)).unwrap();
        assert_eq!(json, "\"295.50\"");

        let back: Money = serde_json::from_str("\"120.00\"").unwrap();
        assert_eq!(back.to_minor(), 12000);
        assert!(serde_json::from_str::<Money>("\"-1\"").is_err());
    }

    #[test]
    fn test_to_major() {
        assert!((Money::from_minor(16667).to_major() - 166.67).abs() < 1e-9);
    }
}

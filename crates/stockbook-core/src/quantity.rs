//! # Quantity Module
//!
//! Provides the `Quantity` type for stock movements and balances.
//!
//! ## Why Fixed-Point Quantities?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE SUMMING PROBLEM                                                    │
//! │                                                                         │
//! │  The ledger is the only source of truth: every balance is a SUM().     │
//! │  Summing REAL columns drifts:                                           │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ balance no longer matches        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer ten-thousandths (4 decimal places)              │
//! │    2.5 kg  → 25_000                                                     │
//! │    0.0001  → 1                                                          │
//! │    SUM(quantity) in SQLite is exact integer arithmetic                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockbook_core::quantity::Quantity;
//!
//! let received = Quantity::from_units(100);
//! let issued: Quantity = "30".parse().unwrap();
//! assert_eq!((received - issued).to_string(), "70");
//!
//! let weighed: Quantity = "2.5".parse().unwrap();
//! assert_eq!(weighed.raw(), 25_000);
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::error::ValidationError;

/// Number of fractional digits a quantity carries.
pub const QUANTITY_SCALE: u32 = 4;

/// Raw units per whole unit (10^QUANTITY_SCALE).
const UNIT: i64 = 10_000;

/// Largest magnitude a quantity or balance may reach: 99,999,999,999.9999,
/// the range of a `decimal(15,4)` column.
pub const MAX_QUANTITY: Quantity = Quantity(999_999_999_999_999);

// =============================================================================
// Quantity Type
// =============================================================================

/// A signed stock quantity with 4 fractional digits.
///
/// ## Design Decisions
/// - **i64 (signed)**: OUT entries and negative adjustments carry negative values
/// - **Ten-thousandths**: matches the `decimal(15,4)` precision of the ledger
/// - **Transparent in SQL**: stored as INTEGER so aggregates never round
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Quantity(i64);

impl Quantity {
    /// Zero quantity.
    pub const ZERO: Quantity = Quantity(0);

    /// Creates a quantity from whole units.
    ///
    /// ## Example
    /// ```rust
    /// use stockbook_core::quantity::Quantity;
    ///
    /// assert_eq!(Quantity::from_units(3).raw(), 30_000);
    /// ```
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * UNIT)
    }

    /// Creates a quantity from raw ten-thousandths.
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Quantity(raw)
    }

    /// Returns the raw ten-thousandths value.
    #[inline]
    pub const fn raw(&self) -> i64 {
        self.0
    }

    /// Converts a decimal into a quantity.
    ///
    /// Fails when the value has more than 4 fractional digits or does not
    /// fit the storage range.
    pub fn from_decimal(value: Decimal) -> Result<Self, ValidationError> {
        let scaled = value
            .checked_mul(Decimal::from(UNIT))
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "quantity".to_string(),
                reason: "value is out of range".to_string(),
            })?;

        if !scaled.fract().is_zero() {
            return Err(ValidationError::TooPrecise {
                field: "quantity".to_string(),
                max_scale: QUANTITY_SCALE,
            });
        }

        scaled
            .to_i64()
            .map(Quantity)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "quantity".to_string(),
                reason: "value is out of range".to_string(),
            })
    }

    /// Returns the quantity as a decimal (normalized, no trailing zeros).
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, QUANTITY_SCALE).normalize()
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

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Quantity(self.0.abs())
    }

    /// Returns the negated absolute value (the signed form of an outbound move).
    #[inline]
    pub const fn as_outbound(&self) -> Self {
        Quantity(-self.0.abs())
    }

    /// True when the magnitude is within [`MAX_QUANTITY`].
    #[inline]
    pub const fn is_within_limit(&self) -> bool {
        self.0.unsigned_abs() <= MAX_QUANTITY.0.unsigned_abs()
    }

    /// Addition that returns `None` on i64 overflow.
    #[inline]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(raw) => Some(Quantity(raw)),
            None => None,
        }
    }

    /// Subtraction that returns `None` on i64 overflow.
    #[inline]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(raw) => Some(Quantity(raw)),
            None => None,
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Displays the normalized decimal form: `70`, `2.5`, `-0.0001`.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl FromStr for Quantity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|_| ValidationError::InvalidFormat {
            field: "quantity".to_string(),
            reason: format!("'{}' is not a decimal number", s.trim()),
        })?;
        Quantity::from_decimal(value)
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = ValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Quantity::from_decimal(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        value.to_decimal()
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(-self.0)
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::ZERO, |acc, q| acc + q)
    }
}

impl<'a> Sum<&'a Quantity> for Quantity {
    fn sum<I: Iterator<Item = &'a Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::ZERO, |acc, q| acc + *q)
    }
}

/// Serialized as a decimal string (`"12.5"`) so JSON clients never see the
/// raw fixed-point value.
impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Accepts decimal strings and JSON numbers.
impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Quantity::from_decimal(value).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

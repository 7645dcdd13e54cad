//! Fixed-point arithmetic implementation
//!
//! Provides a Fixed structure backed by `rust_decimal` so prices, amounts and
//! fees coming from exchange APIs are carried without floating-point drift.
//! Exchange payloads encode numbers both as JSON strings and JSON numbers
//! (sometimes in scientific notation); the parsing helpers accept all forms.

use rust_decimal::{Decimal, prelude::*};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{self, Display};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Fixed-point decimal type for precise financial calculations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fixed {
    value: Decimal,
}

impl Fixed {
    /// Zero value
    pub const ZERO: Fixed = Fixed {
        value: Decimal::ZERO,
    };

    /// One value
    pub const ONE: Fixed = Fixed {
        value: Decimal::ONE,
    };

    /// Create a new Fixed from a Decimal
    pub fn from_decimal(value: Decimal) -> Self {
        Fixed { value }
    }

    /// Create a Fixed from an integer
    pub fn from_i64(value: i64) -> Self {
        Fixed {
            value: Decimal::from(value),
        }
    }

    /// Create a Fixed from a float (use with caution)
    pub fn from_f64(value: f64) -> Result<Self, FixedError> {
        let decimal = Decimal::from_f64(value).ok_or(FixedError::InvalidValue)?;
        Ok(Self::from_decimal(decimal.normalize()))
    }

    /// Parse a decimal string, accepting plain and scientific notation.
    ///
    /// Empty strings are rejected; callers that treat a missing value as zero
    /// should use [`Fixed::parse_or_zero`].
    pub fn from_str_exact(s: &str) -> Result<Self, FixedError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(FixedError::InvalidValue);
        }
        Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map(Self::from_decimal)
            .map_err(|_| FixedError::InvalidValue)
    }

    /// Parse a decimal string, mapping empty input to zero
    pub fn parse_or_zero(s: &str) -> Result<Self, FixedError> {
        if s.trim().is_empty() {
            return Ok(Self::ZERO);
        }
        Self::from_str_exact(s)
    }

    /// Decode a JSON value holding either a number or a numeric string.
    /// `null` decodes to zero.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, FixedError> {
        match value {
            serde_json::Value::Null => Ok(Self::ZERO),
            serde_json::Value::String(s) => Self::parse_or_zero(s),
            serde_json::Value::Number(n) => Self::from_str_exact(&n.to_string()),
            _ => Err(FixedError::InvalidValue),
        }
    }

    /// Get the underlying Decimal value
    pub fn to_decimal(&self) -> Decimal {
        self.value
    }

    /// Convert to f64 (may lose precision)
    pub fn to_f64(&self) -> f64 {
        self.value.to_f64().unwrap_or(0.0)
    }

    /// Convert to string with all decimal places, trailing zeros removed
    pub fn to_string_exact(&self) -> String {
        self.value.normalize().to_string()
    }

    /// Convert to string with specified decimal places
    pub fn to_string_with_scale(&self, scale: u32) -> String {
        format!("{:.1$}", self.value, scale as usize)
    }

    /// Check if the value is zero
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Check if the value is strictly positive
    pub fn is_positive(&self) -> bool {
        self.value.is_sign_positive() && !self.value.is_zero()
    }

    /// Check if the value is strictly negative
    pub fn is_negative(&self) -> bool {
        self.value.is_sign_negative() && !self.value.is_zero()
    }

    /// Get the absolute value
    pub fn abs(&self) -> Self {
        Fixed {
            value: self.value.abs(),
        }
    }

    /// Round to specified decimal places
    pub fn round_dp(&self, dp: u32) -> Self {
        Fixed {
            value: self.value.round_dp(dp),
        }
    }

    /// Truncate to specified decimal places
    pub fn trunc_with_scale(&self, scale: u32) -> Self {
        Fixed {
            value: self.value.trunc_with_scale(scale),
        }
    }

    /// Division that reports a zero divisor instead of panicking
    pub fn checked_div(&self, rhs: Fixed) -> Result<Fixed, FixedError> {
        if rhs.is_zero() {
            return Err(FixedError::DivisionByZero);
        }
        self.value
            .checked_div(rhs.value)
            .map(Self::from_decimal)
            .ok_or(FixedError::Overflow)
    }

    /// Calculate percentage of another Fixed value
    pub fn percent_of(&self, other: Fixed) -> Result<Fixed, FixedError> {
        Ok(self.checked_div(other)? * Fixed::from_i64(100))
    }
}

/// Fixed-point arithmetic errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FixedError {
    #[error("Invalid value")]
    InvalidValue,
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Overflow in arithmetic operation")]
    Overflow,
}

// Arithmetic implementations
impl Add for Fixed {
    type Output = Fixed;

    fn add(self, rhs: Self) -> Self::Output {
        Fixed {
            value: self.value + rhs.value,
        }
    }
}

impl Sub for Fixed {
    type Output = Fixed;

    fn sub(self, rhs: Self) -> Self::Output {
        Fixed {
            value: self.value - rhs.value,
        }
    }
}

impl Mul for Fixed {
    type Output = Fixed;

    fn mul(self, rhs: Self) -> Self::Output {
        Fixed {
            value: self.value * rhs.value,
        }
    }
}

impl Div for Fixed {
    type Output = Fixed;

    fn div(self, rhs: Self) -> Self::Output {
        Fixed {
            value: self.value / rhs.value,
        }
    }
}

impl Neg for Fixed {
    type Output = Fixed;

    fn neg(self) -> Self::Output {
        Fixed { value: -self.value }
    }
}

// Assignment operators
impl AddAssign for Fixed {
    fn add_assign(&mut self, rhs: Self) {
        self.value += rhs.value;
    }
}

impl SubAssign for Fixed {
    fn sub_assign(&mut self, rhs: Self) {
        self.value -= rhs.value;
    }
}

impl MulAssign for Fixed {
    fn mul_assign(&mut self, rhs: Self) {
        self.value *= rhs.value;
    }
}

impl DivAssign for Fixed {
    fn div_assign(&mut self, rhs: Self) {
        self.value /= rhs.value;
    }
}

impl std::iter::Sum for Fixed {
    fn sum<I: Iterator<Item = Fixed>>(iter: I) -> Self {
        iter.fold(Fixed::ZERO, |acc, x| acc + x)
    }
}

impl Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl FromStr for Fixed {
    type Err = FixedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_exact(s)
    }
}

impl From<Decimal> for Fixed {
    fn from(value: Decimal) -> Self {
        Fixed { value }
    }
}

impl From<Fixed> for Decimal {
    fn from(fixed: Fixed) -> Self {
        fixed.value
    }
}

/// Serde adapter for fields that arrive as either a JSON string or number.
///
/// ```ignore
/// #[serde(deserialize_with = "flexible::deserialize")]
/// price: Fixed,
/// ```
pub mod flexible {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Fixed::from_json(&value).map_err(serde::de::Error::custom)
    }

    /// Same as [`deserialize`] for optional fields; `null` stays `None`
    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        match value {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(v) => Fixed::from_json(&v)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Convenience macro for creating Fixed values
#[macro_export]
macro_rules! fixed {
    ($value:expr) => {
        $crate::fixed::Fixed::from_str_exact(stringify!($value)).unwrap()
    };
}

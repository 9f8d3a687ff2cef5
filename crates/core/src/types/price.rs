//! Type-safe price representation using decimal arithmetic.
//!
//! The backend sends prices as JSON numbers. Internally they are held as
//! [`Decimal`] so cart totals never accumulate float rounding error.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is not a number.
    #[error("price must be a number")]
    Invalid,
    /// The amount is below zero.
    #[error("price must not be negative")]
    Negative,
}

/// A non-negative price in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// A price of zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(Self(amount))
    }

    /// Parse a price from user input such as `"12.5"`.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Invalid` for non-numeric input and
    /// `PriceError::Negative` for amounts below zero.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| PriceError::Invalid)?;
        Self::new(amount)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Decimal {
        self.0 * Decimal::from(quantity)
    }
}

/// Format an amount for display with two decimals (e.g., `$19.99`).
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format_amount(self.0))
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_decimals() {
        let price = Price::parse("12.5").unwrap();
        assert_eq!(price.amount(), Decimal::new(125, 1));
    }

    #[test]
    fn test_parse_rejects_negative() {
        assert_eq!(Price::parse("-1"), Err(PriceError::Negative));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(Price::parse("twelve"), Err(PriceError::Invalid));
        assert_eq!(Price::parse(""), Err(PriceError::Invalid));
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Price::parse("3").unwrap().to_string(), "$3.00");
        assert_eq!(Price::parse("19.999").unwrap().to_string(), "$20.00");
    }

    #[test]
    fn test_times_multiplies_by_quantity() {
        let price = Price::parse("2.25").unwrap();
        assert_eq!(price.times(4), Decimal::new(9, 0));
    }

    #[test]
    fn test_wire_format_is_a_number() {
        let price = Price::parse("19.99").unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "19.99");

        let decoded: Price = serde_json::from_str("19.99").unwrap();
        assert_eq!(decoded, price);
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        assert!(serde_json::from_str::<Price>("-3").is_err());
    }
}

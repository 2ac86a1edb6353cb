//! Human-readable currency amounts.
//!
//! Prices are configured in whole-dollar units (`"$0.01"`, `0.10`, `"1,000"`)
//! and converted to the asset's smallest unit before they go on the wire.
//! All arithmetic uses [`rust_decimal::Decimal`], so no floating point value
//! ever reaches `maxAmountRequired`.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MoneyError;

/// A USD-denominated amount, validated to lie within [`Money::MIN`] and [`Money::MAX`].
///
/// # Example
///
/// ```rust
/// use p402::Money;
///
/// let price: Money = "$0.01".parse().unwrap();
/// assert_eq!(price.to_atomic_units(6).unwrap(), "10000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    /// Smallest accepted amount (`0.0001`).
    pub const MIN: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

    /// Largest accepted amount (`999999999`).
    pub const MAX: Decimal = Decimal::from_parts(999_999_999, 0, 0, false, 0);

    /// Wraps a decimal amount after checking it is within range.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::OutOfRange`] if `value` is below [`Self::MIN`]
    /// or above [`Self::MAX`].
    pub fn new(value: Decimal) -> Result<Self, MoneyError> {
        if value < Self::MIN || value > Self::MAX {
            return Err(MoneyError::OutOfRange {
                value: value.to_string(),
                min: "0.0001",
                max: "999999999",
            });
        }
        Ok(Self(value))
    }

    /// Returns the underlying decimal amount.
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Converts the amount into the asset's smallest unit, rendered as a
    /// base-10 integer string.
    ///
    /// Computes `round(amount × 10^decimals)`, rounding midpoints away from zero.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the scaled value does not fit in a [`Decimal`].
    pub fn to_atomic_units(&self, decimals: u8) -> Result<String, MoneyError> {
        let overflow = || MoneyError::Overflow(self.0.to_string());
        let factor = 10u64
            .checked_pow(u32::from(decimals))
            .ok_or_else(overflow)?;
        let scaled = self
            .0
            .checked_mul(Decimal::from(factor))
            .ok_or_else(overflow)?;
        Ok(scaled
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_string())
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    /// Parses `"$3.10"`, `"0.10"`, `"1,000"` and similar.
    ///
    /// Every character other than ASCII digits, `.` and `-` is dropped before parsing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();
        let value = Decimal::from_str(&cleaned).map_err(|_| MoneyError::Invalid {
            input: s.to_owned(),
        })?;
        Self::new(value)
    }
}

impl TryFrom<f64> for Money {
    type Error = MoneyError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let decimal = Decimal::try_from(value).map_err(|_| MoneyError::Invalid {
            input: value.to_string(),
        })?;
        Self::new(decimal)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(f64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
            Repr::Number(n) => Self::try_from(n).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dollar_strings() {
        let money: Money = "$3.10".parse().unwrap();
        assert_eq!(money.to_string(), "3.10");

        let money: Money = "1,000.50".parse().unwrap();
        assert_eq!(money.as_decimal(), Decimal::from_str("1000.50").unwrap());
    }

    #[test]
    fn rejects_garbage_and_out_of_range() {
        assert!(matches!(
            "free".parse::<Money>(),
            Err(MoneyError::Invalid { .. })
        ));
        assert!(matches!(
            "0.00001".parse::<Money>(),
            Err(MoneyError::OutOfRange { .. })
        ));
        assert!(matches!(
            "-1".parse::<Money>(),
            Err(MoneyError::OutOfRange { .. })
        ));
        assert!(matches!(
            "1000000000".parse::<Money>(),
            Err(MoneyError::OutOfRange { .. })
        ));
    }

    #[test]
    fn converts_to_usdc_atomic_units() {
        let one = Money::try_from(1.0).unwrap();
        assert_eq!(one.to_atomic_units(6).unwrap(), "1000000");

        let tiny: Money = "0.0001".parse().unwrap();
        assert_eq!(tiny.to_atomic_units(6).unwrap(), "100");

        let cents: Money = "$0.01".parse().unwrap();
        assert_eq!(cents.to_atomic_units(6).unwrap(), "10000");
    }

    #[test]
    fn rounds_sub_unit_amounts_half_away_from_zero() {
        let money: Money = "0.0012345".parse().unwrap();
        assert_eq!(money.to_atomic_units(6).unwrap(), "1235");

        let money: Money = "0.0012344".parse().unwrap();
        assert_eq!(money.to_atomic_units(6).unwrap(), "1234");
    }

    #[test]
    fn to_atomic_units_overflows_on_huge_decimals() {
        let money = Money::try_from(1.0).unwrap();
        assert!(matches!(
            money.to_atomic_units(30),
            Err(MoneyError::Overflow(_))
        ));
    }

    #[test]
    fn deserializes_from_string_or_number() {
        let from_str: Money = serde_json::from_str("\"$0.25\"").unwrap();
        let from_num: Money = serde_json::from_str("0.25").unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(serde_json::to_string(&from_str).unwrap(), "\"0.25\"");
    }
}

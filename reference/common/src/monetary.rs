//! Quantity types: 256-bit unsigned integers and vault proceeds.

use num_bigint::BigUint;
use num_traits::Zero;
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::ParseError;

/// Unsigned integer bounded to 256 bits, as used for prices, extras and
/// salts in exchange orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Uint256(BigUint);

impl Uint256 {
    /// Maximum bit width.
    pub const BITS: u64 = 256;

    /// Zero.
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    /// Create from a `BigUint`, rejecting values wider than 256 bits.
    pub fn from_biguint(value: BigUint) -> Option<Self> {
        (value.bits() <= Self::BITS).then_some(Self(value))
    }

    /// Check if the value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Borrow the underlying big integer.
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }
}

impl From<u64> for Uint256 {
    fn from(v: u64) -> Self {
        Self(BigUint::from(v))
    }
}

impl From<u128> for Uint256 {
    fn from(v: u128) -> Self {
        Self(BigUint::from(v))
    }
}

impl FromStr for Uint256 {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = BigUint::from_str(s.trim()).map_err(|_| ParseError::InvalidNumber(s.to_string()))?;
        Self::from_biguint(value).ok_or_else(|| ParseError::InvalidNumber(format!("{} exceeds 256 bits", s)))
    }
}

impl fmt::Display for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Uint256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct Uint256Visitor;

impl<'de> Visitor<'de> for Uint256Visitor {
    type Value = Uint256;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an unsigned integer or a decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Uint256, E> {
        Ok(Uint256::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Uint256, E> {
        u64::try_from(v)
            .map(Uint256::from)
            .map_err(|_| E::custom(format!("negative value {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Uint256, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Uint256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(Uint256Visitor)
    }
}

/// Fungible vault shares minted in exchange for a deposited asset,
/// in raw base units with 18 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shares(pub u128);

impl Shares {
    /// Number of decimals in one whole share.
    pub const DECIMALS: u32 = 18;

    /// One whole share.
    pub const ONE: Shares = Shares(1_000_000_000_000_000_000);

    /// Raw base units.
    pub fn raw(&self) -> u128 {
        self.0
    }

    /// Check if no shares were minted.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Whole-share decimal value. Returns `None` if the raw amount is
    /// beyond decimal precision.
    pub fn to_decimal(&self) -> Option<Decimal> {
        let raw = i128::try_from(self.0).ok()?;
        Decimal::try_from_i128_with_scale(raw, Self::DECIMALS)
            .ok()
            .map(|d| d.normalize())
    }
}

impl fmt::Display for Shares {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Some(d) => write!(f, "{} shares", d),
            None => write!(f, "{} raw shares", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_uint256_parses_large_salt() {
        let salt: Uint256 =
            "46283856062284117332718487320173134166179297852652433828828758657181924533959"
                .parse()
                .unwrap();
        assert!(!salt.is_zero());
        assert_eq!(
            salt.to_string(),
            "46283856062284117332718487320173134166179297852652433828828758657181924533959"
        );
    }

    #[test]
    fn test_uint256_rejects_overflow() {
        let too_wide = format!("{}", BigUint::from(1u8) << 256usize);
        assert!(too_wide.parse::<Uint256>().is_err());
        assert!("-1".parse::<Uint256>().is_err());
    }

    #[test]
    fn test_uint256_accepts_numbers_and_strings() {
        let from_number: Uint256 = serde_json::from_str("6000000000000000").unwrap();
        let from_string: Uint256 = serde_json::from_str("\"6000000000000000\"").unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(serde_json::to_string(&from_number).unwrap(), "\"6000000000000000\"");
        assert!(serde_json::from_str::<Uint256>("-5").is_err());
    }

    #[test]
    fn test_shares_display() {
        assert_eq!(Shares::ONE.to_decimal(), Some(dec!(1)));
        assert_eq!(Shares(1_500_000_000_000_000_000).to_decimal(), Some(dec!(1.5)));
        assert_eq!(Shares::ONE.to_string(), "1 shares");
        assert!(Shares(u128::MAX).to_decimal().is_none());
    }
}

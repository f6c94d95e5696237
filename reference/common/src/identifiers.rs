//! Identifier types for custodied assets and ledger accounts.

use num_bigint::BigUint;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when parsing identifiers from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input is not valid hexadecimal.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Decoded byte length does not match the identifier width.
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Input is not a valid unsigned decimal number.
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], ParseError> {
    let bytes = hex::decode(strip_hex_prefix(s)).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
    if bytes.len() != N {
        return Err(ParseError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// A 20-byte ledger account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// The zero address.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Address whose last byte is `n`. Handy for fixtures and simulations.
    pub const fn from_low_u8(n: u8) -> Self {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Check if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Encode as a left-padded 32-byte ABI word.
    pub fn to_word(&self) -> Bytes32 {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.0);
        Bytes32(word)
    }

    /// Decode from a 32-byte ABI word. Returns `None` if the upper
    /// 12 bytes are not zero.
    pub fn from_word(word: &Bytes32) -> Option<Self> {
        if word.0[..12].iter().any(|b| *b != 0) {
            return None;
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word.0[12..]);
        Some(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<20>(s).map(Self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A 32-byte word (hash component, ABI word, merkle root).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bytes32([u8; 32]);

impl Bytes32 {
    /// The all-zero word.
    pub const ZERO: Bytes32 = Bytes32([0u8; 32]);

    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Copy a word out of a byte slice. Returns `None` if the slice is
    /// shorter than 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let word: [u8; 32] = bytes.get(..32)?.try_into().ok()?;
        Some(Self(word))
    }
}

impl fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Bytes32 {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<32>(s).map(Self)
    }
}

impl Serialize for Bytes32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Bytes32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Arbitrary-length byte string, hex encoded on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Bytes(Vec<u8>);

impl Bytes {
    /// Create from a byte vector.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Borrow the bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl FromStr for Bytes {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex::decode(strip_hex_prefix(s))
            .map(Self)
            .map_err(|e| ParseError::InvalidHex(e.to_string()))
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier of a single token within a collection: a full 256-bit
/// unsigned integer, held as its big-endian ABI word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId([u8; 32]);

impl TokenId {
    /// Encode as a big-endian 32-byte ABI word.
    pub fn to_word(&self) -> Bytes32 {
        Bytes32::new(self.0)
    }

    /// Decode from a big-endian 32-byte ABI word. Every word is a valid id.
    pub fn from_word(word: &Bytes32) -> Self {
        Self(*word.as_bytes())
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }

    /// Create from a `BigUint`, rejecting values wider than 256 bits.
    pub fn from_biguint(value: &BigUint) -> Option<Self> {
        let bytes = value.to_bytes_be();
        if bytes.len() > 32 {
            return None;
        }
        let mut word = [0u8; 32];
        word[32 - bytes.len()..].copy_from_slice(&bytes);
        Some(Self(word))
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

impl FromStr for TokenId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = BigUint::from_str(s.trim()).map_err(|_| ParseError::InvalidNumber(s.to_string()))?;
        Self::from_biguint(&value).ok_or_else(|| ParseError::InvalidNumber(format!("{} exceeds 256 bits", s)))
    }
}

impl From<u128> for TokenId {
    fn from(id: u128) -> Self {
        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&id.to_be_bytes());
        Self(word)
    }
}

impl Serialize for TokenId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct TokenIdVisitor;

impl<'de> Visitor<'de> for TokenIdVisitor {
    type Value = TokenId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an unsigned integer or a decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<TokenId, E> {
        Ok(TokenId::from(u128::from(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<TokenId, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for TokenId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TokenIdVisitor)
    }
}

/// Reference to a custodied asset: the collection contract plus token id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetRef {
    /// Address of the asset's home ledger (collection contract).
    pub collection: Address,
    /// Token id within the collection.
    pub token_id: TokenId,
}

impl AssetRef {
    /// Create a new asset reference.
    pub fn new(collection: Address, token_id: impl Into<TokenId>) -> Self {
        Self {
            collection,
            token_id: token_id.into(),
        }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.collection, self.token_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_and_display() {
        let addr: Address = "0x75AE13C83ADD91272A02179ECF18F20BA65B8256".parse().unwrap();
        assert_eq!(addr.to_string(), "0x75ae13c83add91272a02179ecf18f20ba65b8256");
        assert!(!addr.is_zero());
        assert!(Address::ZERO.is_zero());
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidLength {
                expected: 20,
                actual: 2
            }
        );
        assert!(matches!("0xzz".parse::<Address>(), Err(ParseError::InvalidHex(_))));
    }

    #[test]
    fn test_address_word_requires_clean_padding() {
        let addr = Address::from_low_u8(7);
        let word = addr.to_word();
        assert_eq!(Address::from_word(&word), Some(addr));

        let mut dirty = *word.as_bytes();
        dirty[0] = 1;
        assert_eq!(Address::from_word(&Bytes32::new(dirty)), None);
    }

    #[test]
    fn test_token_id_spans_full_word() {
        let id = TokenId::from(1u128);
        assert_eq!(TokenId::from_word(&id.to_word()), id);

        let max = TokenId::from_word(&Bytes32::new([0xff; 32]));
        assert_eq!(
            max.to_string(),
            "115792089237316195423570985008687907853269984665640564039457584007913129639935"
        );
        assert_eq!(max.to_string().parse::<TokenId>().unwrap(), max);
        assert!(TokenId::from(u128::MAX) < max);

        let too_wide = format!("{}0", max);
        assert!(too_wide.parse::<TokenId>().is_err());
    }

    #[test]
    fn test_asset_ref_serde() {
        let asset = AssetRef::new(Address::from_low_u8(0xaa), 42u128);
        let json = serde_json::to_string(&asset).unwrap();
        assert_eq!(
            json,
            r#"{"collection":"0x00000000000000000000000000000000000000aa","token_id":"42"}"#
        );
        let back: AssetRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, asset);
    }
}

//! Value types shared by every ledger component

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Asset amount in base units (unsigned 256-bit)
pub type Amount = primitive_types::U256;

/// Sequential course identifier, starting at 1
pub type CourseId = u64;

/// Length of an account identifier in bytes
pub const ADDRESS_LEN: usize = 20;

/// Fixed-width account identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LEN]);

/// Errors raised while parsing an `Address` from text
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AddressParseError {
    #[error("Invalid hex in address: {0}")]
    InvalidHex(String),

    #[error("Invalid address length: expected 20 bytes, got {0}")]
    InvalidLength(usize),
}

impl Address {
    /// The null account. Never a valid transfer recipient.
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    /// Build an address from raw bytes
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Address(bytes)
    }

    /// Address with every byte set to `byte`
    pub fn repeat_byte(byte: u8) -> Self {
        Address([byte; ADDRESS_LEN])
    }

    /// Address whose low eight bytes hold `value` big-endian
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[ADDRESS_LEN - 8..].copy_from_slice(&value.to_be_bytes());
        Address(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Whether this is the null account
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        let bytes = hex::decode(digits).map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
        let bytes: [u8; ADDRESS_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressParseError::InvalidLength(bytes.len()))?;

        Ok(Address(bytes))
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Address(bytes)
    }
}

// Serialized as the hex string so addresses can key JSON maps.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Conversions between whole-token and base-unit amounts
pub mod units {
    use super::Amount;
    use crate::{LedgerError, LedgerResult};

    /// `10^decimals` as an `Amount`
    pub fn scale(decimals: u8) -> LedgerResult<Amount> {
        let ten = Amount::from(10u64);
        (0..decimals).try_fold(Amount::one(), |acc, _| {
            acc.checked_mul(ten).ok_or(LedgerError::Overflow)
        })
    }

    /// `whole * 10^decimals`
    pub fn to_base_units(whole: u64, decimals: u8) -> LedgerResult<Amount> {
        Amount::from(whole)
            .checked_mul(scale(decimals)?)
            .ok_or(LedgerError::Overflow)
    }

    /// Parse a decimal string such as `"1.5"` into base units
    pub fn parse_units(value: &str, decimals: u8) -> LedgerResult<Amount> {
        let value = value.trim();
        let (whole, fraction) = match value.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (value, ""),
        };

        let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
            return Err(LedgerError::InvalidAmount(value.to_string()));
        }
        if fraction.len() > decimals as usize {
            return Err(LedgerError::InvalidAmount(format!(
                "{} has more than {} decimal places",
                value, decimals
            )));
        }

        let padded = format!("{}{:0<width$}", whole, fraction, width = decimals as usize);
        let digits = padded.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(Amount::zero());
        }
        Amount::from_dec_str(digits).map_err(|_| LedgerError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display_and_parse() {
        let address = Address::repeat_byte(0xab);
        let text = address.to_string();
        assert_eq!(text, format!("0x{}", "ab".repeat(ADDRESS_LEN)));
        assert_eq!(text.parse::<Address>().unwrap(), address);

        let bare = "ab".repeat(ADDRESS_LEN);
        assert_eq!(bare.parse::<Address>().unwrap(), address);
    }

    #[test]
    fn test_address_parse_errors() {
        assert_eq!(
            "0x1234".parse::<Address>(),
            Err(AddressParseError::InvalidLength(2))
        );
        assert!(matches!(
            "0xzz".parse::<Address>(),
            Err(AddressParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_low_u64(1).is_zero());
        assert_eq!(Address::default(), Address::ZERO);
    }

    #[test]
    fn test_address_serde_as_map_key() {
        let mut balances = std::collections::BTreeMap::new();
        balances.insert(Address::from_low_u64(7), 42u64);

        let json = serde_json::to_string(&balances).unwrap();
        assert!(json.contains("0x0000000000000000000000000000000000000007"));

        let decoded: std::collections::BTreeMap<Address, u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, balances);
    }

    #[test]
    fn test_unit_conversions() {
        assert_eq!(units::to_base_units(100, 0).unwrap(), Amount::from(100u64));
        assert_eq!(
            units::to_base_units(3, 18).unwrap(),
            Amount::from(3_000_000_000_000_000_000u128)
        );
        assert_eq!(
            units::parse_units("1.5", 18).unwrap(),
            Amount::from(1_500_000_000_000_000_000u128)
        );
        assert_eq!(units::parse_units("0.000", 3).unwrap(), Amount::zero());
        assert!(units::parse_units("1.2345", 3).is_err());
        assert!(units::parse_units("abc", 18).is_err());
        assert!(units::parse_units("", 18).is_err());
    }
}

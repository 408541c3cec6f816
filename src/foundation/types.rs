use crate::foundation::error::TillerError;
use crate::foundation::name;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A numeric identity on the two-tier ledger. Immutable once validated;
/// displays as its canonical phonemic name.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Point(u64);

/// Ship class, derived from the numeric range of the point.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipClass {
    Galaxy,
    Star,
    Planet,
    Moon,
}

impl Point {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    pub const fn class(&self) -> ShipClass {
        match self.0 {
            0..=0xff => ShipClass::Galaxy,
            0x100..=0xffff => ShipClass::Star,
            0x1_0000..=0xffff_ffff => ShipClass::Planet,
            _ => ShipClass::Moon,
        }
    }

    /// Canonical phonemic name, `~` prefix included.
    pub fn name(&self) -> String {
        name::point_name(self.0)
    }

    /// The parent a point would route through by numeric derivation. Galaxies
    /// are their own parent.
    pub fn parent(&self) -> Point {
        match self.class() {
            ShipClass::Galaxy => *self,
            ShipClass::Star => Point(self.0 & 0xff),
            ShipClass::Planet => Point(self.0 & 0xffff),
            ShipClass::Moon => Point(self.0 & 0xffff_ffff),
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for Point {
    type Err = TillerError;

    /// Accepts a decimal number or a phonemic name (with or without `~`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TillerError::invalid_point(s, "empty identifier"));
        }
        if trimmed.chars().all(|c| c.is_ascii_digit()) {
            let value = trimmed
                .parse::<u64>()
                .map_err(|_| TillerError::invalid_point(trimmed, "number out of range"))?;
            return Ok(Point(value));
        }
        name::parse_name(trimmed).map(Point)
    }
}

impl From<u32> for Point {
    fn from(value: u32) -> Self {
        Point(value as u64)
    }
}

/// Which ledger is authoritative for a point's state and mutations.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dominion {
    L1,
    L2,
}

impl fmt::Display for Dominion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dominion::L1 => f.write_str("l1"),
            Dominion::L2 => f.write_str("l2"),
        }
    }
}

impl FromStr for Dominion {
    type Err = TillerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "l1" => Ok(Dominion::L1),
            "l2" => Ok(Dominion::L2),
            other => Err(TillerError::ConfigError(format!("unknown dominion '{}'", other))),
        }
    }
}

/// A 20-byte L1 account address.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct EthAddress([u8; 20]);

impl EthAddress {
    pub const ZERO: EthAddress = EthAddress([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Strips the zero-address sentinel used on chain for "absent".
    pub fn sanitized(self) -> Option<EthAddress> {
        if self.is_zero() {
            None
        } else {
            Some(self)
        }
    }
}

impl fmt::Display for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for EthAddress {
    type Err = TillerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.trim().strip_prefix("0x").unwrap_or(s.trim());
        let bytes = hex::decode(stripped)?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| TillerError::SerializationError { format: "address".to_string(), details: format!("'{}' is not 20 bytes", s) })?;
        Ok(EthAddress(bytes))
    }
}

impl Serialize for EthAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EthAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_tiers_by_range() {
        assert_eq!(Point::new(0).class(), ShipClass::Galaxy);
        assert_eq!(Point::new(255).class(), ShipClass::Galaxy);
        assert_eq!(Point::new(256).class(), ShipClass::Star);
        assert_eq!(Point::new(65535).class(), ShipClass::Star);
        assert_eq!(Point::new(65536).class(), ShipClass::Planet);
        assert_eq!(Point::new(0xffff_ffff).class(), ShipClass::Planet);
        assert_eq!(Point::new(0x1_0000_0000).class(), ShipClass::Moon);
    }

    #[test]
    fn parent_masks_by_class() {
        assert_eq!(Point::new(0).parent(), Point::new(0));
        assert_eq!(Point::new(256).parent(), Point::new(0));
        assert_eq!(Point::new(65536 + 256).parent(), Point::new(256));
    }

    #[test]
    fn point_parses_decimal_and_name() {
        assert_eq!("0".parse::<Point>().unwrap(), Point::new(0));
        assert_eq!("~zod".parse::<Point>().unwrap(), Point::new(0));
        assert!("".parse::<Point>().is_err());
        assert!("-1".parse::<Point>().is_err());
        assert!("99999999999999999999999".parse::<Point>().is_err());
    }

    #[test]
    fn address_roundtrip_and_sentinel() {
        let addr: EthAddress = "0x6d654ef2479f427950ca0e6c3bca2db5080c74e6".parse().unwrap();
        assert_eq!(addr.to_string(), "0x6d654ef2479f427950ca0e6c3bca2db5080c74e6");
        assert_eq!(addr.sanitized(), Some(addr));
        assert_eq!(EthAddress::ZERO.sanitized(), None);
        assert!("0xabcd".parse::<EthAddress>().is_err());
    }
}

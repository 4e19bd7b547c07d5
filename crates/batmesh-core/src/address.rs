//! Node addresses
//!
//! Every node is keyed by a dotted-quad address ("0.0.0.1"). Addresses are
//! plain values: the registry resolves them to nodes, nothing else does.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AddressError;

/// Unique identifier for a node in the network
///
/// Ordered byte-wise so that every address-keyed map iterates
/// deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 4]);

impl Address {
    /// Create an address from raw octets
    pub const fn new(octets: [u8; 4]) -> Self {
        Self(octets)
    }

    /// Generate the `n`-th address of the `0.0.0.x` block (1-based)
    ///
    /// Used by topology builders to name generated nodes.
    pub fn from_index(n: u8) -> Self {
        Self([0, 0, 0, n])
    }

    /// The raw octets
    pub const fn octets(&self) -> [u8; 4] {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 4];
        let mut parts = s.split('.');
        for slot in &mut octets {
            let part = parts
                .next()
                .ok_or_else(|| AddressError::InvalidFormat(s.to_string()))?;
            *slot = part.parse().map_err(|_| AddressError::InvalidOctet {
                address: s.to_string(),
                octet: part.to_string(),
            })?;
        }
        if parts.next().is_some() {
            return Err(AddressError::InvalidFormat(s.to_string()));
        }
        Ok(Self(octets))
    }
}

// Addresses serialize as their dotted-quad string so they can key JSON maps.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_round_trip() {
        let addr: Address = "10.0.0.42".parse().unwrap();
        assert_eq!(addr.octets(), [10, 0, 0, 42]);
        assert_eq!(addr.to_string(), "10.0.0.42");
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!(matches!(
            "1.2.3".parse::<Address>(),
            Err(AddressError::InvalidFormat(_))
        ));
        assert!(matches!(
            "1.2.3.4.5".parse::<Address>(),
            Err(AddressError::InvalidFormat(_))
        ));
        assert!(matches!(
            "1.2.3.boop".parse::<Address>(),
            Err(AddressError::InvalidOctet { .. })
        ));
        assert!(matches!(
            "1.2.3.900".parse::<Address>(),
            Err(AddressError::InvalidOctet { .. })
        ));
    }

    #[test]
    fn test_index_addresses_are_ordered() {
        let a = Address::from_index(1);
        let b = Address::from_index(2);
        assert!(a < b);
        assert_eq!(a.to_string(), "0.0.0.1");
    }

    #[test]
    fn test_serializes_as_string() {
        let addr = Address::new([192, 168, 0, 1]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"192.168.0.1\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}

//! Datapath identifier type.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// OpenFlow datapath identifier (the switch's unique ID).
///
/// The total order on `Dpid` is load-bearing: the spanning-tree root is
/// always the numerically smallest connected datapath, so every
/// controller instance fed the same discovery data agrees on the root
/// without any election protocol.
///
/// # Examples
///
/// ```
/// use spantree_types::Dpid;
///
/// let a = Dpid::new(1);
/// let b = Dpid::new(2);
/// assert!(a < b);
/// assert_eq!(a.to_string(), "dpid:0000000000000001");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Dpid(u64);

impl Dpid {
    /// Creates a new datapath identifier.
    pub const fn new(id: u64) -> Self {
        Dpid(id)
    }

    /// Returns the identifier as a u64.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Dpid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Canonical 16-hex-digit rendering, matching OpenFlow tooling.
        write!(f, "dpid:{:016x}", self.0)
    }
}

impl From<u64> for Dpid {
    fn from(id: u64) -> Self {
        Dpid(id)
    }
}

impl FromStr for Dpid {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("dpid:").unwrap_or(s);
        if let Some(hex) = digits.strip_prefix("0x") {
            return u64::from_str_radix(hex, 16)
                .map(Dpid)
                .map_err(|_| ParseError::InvalidDpid(s.to_string()));
        }
        // A bare 16-digit string is treated as hex (canonical form),
        // anything shorter as decimal.
        if digits.len() == 16 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
            u64::from_str_radix(digits, 16)
                .map(Dpid)
                .map_err(|_| ParseError::InvalidDpid(s.to_string()))
        } else {
            digits
                .parse::<u64>()
                .map(Dpid)
                .map_err(|_| ParseError::InvalidDpid(s.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ordering_is_numeric() {
        let mut dpids = vec![Dpid::new(21), Dpid::new(3), Dpid::new(1)];
        dpids.sort();
        assert_eq!(dpids, vec![Dpid::new(1), Dpid::new(3), Dpid::new(21)]);
    }

    #[test]
    fn test_display_canonical() {
        assert_eq!(Dpid::new(0x1f).to_string(), "dpid:000000000000001f");
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!("21".parse::<Dpid>().unwrap(), Dpid::new(21));
    }

    #[test]
    fn test_parse_canonical() {
        assert_eq!(
            "dpid:000000000000001f".parse::<Dpid>().unwrap(),
            Dpid::new(0x1f)
        );
    }

    #[test]
    fn test_parse_hex_prefix() {
        assert_eq!("0x1f".parse::<Dpid>().unwrap(), Dpid::new(0x1f));
    }

    #[test]
    fn test_parse_invalid() {
        assert!("switch-one".parse::<Dpid>().is_err());
    }
}

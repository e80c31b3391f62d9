//! Port number type with the reserved virtual-port range.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-switch port number.
///
/// OpenFlow 1.0 reserves port numbers at and above `OFPP_MAX` (0xff00)
/// for virtual ports (`IN_PORT`, `FLOOD`, `CONTROLLER`, the local
/// stack, ...). Those must never be treated as physical ports: they are
/// excluded from flooding, from drop rules, and from inter-switch port
/// accounting.
///
/// # Examples
///
/// ```
/// use spantree_types::PortNo;
///
/// assert!(!PortNo::new(1).is_virtual());
/// assert!(PortNo::new(0xfffb).is_virtual());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct PortNo(u16);

impl PortNo {
    /// First reserved virtual port number (OpenFlow 1.0 `OFPP_MAX`).
    pub const MAX_PHYSICAL: u16 = 0xff00;

    /// The controller virtual port (OpenFlow 1.0 `OFPP_CONTROLLER`).
    pub const CONTROLLER: PortNo = PortNo(0xfffd);

    /// The switch-local stack virtual port (OpenFlow 1.0 `OFPP_LOCAL`).
    pub const LOCAL: PortNo = PortNo(0xfffe);

    /// Creates a new port number.
    pub const fn new(port: u16) -> Self {
        PortNo(port)
    }

    /// Returns the port number as a u16.
    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// Returns true if this is a reserved virtual/control port.
    pub const fn is_virtual(&self) -> bool {
        self.0 >= Self::MAX_PHYSICAL
    }
}

impl fmt::Display for PortNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for PortNo {
    fn from(port: u16) -> Self {
        PortNo(port)
    }
}

impl FromStr for PortNo {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u16>()
            .map(PortNo)
            .map_err(|_| ParseError::InvalidPortNo(s.to_string()))
    }
}

//! Link observation types produced by the discovery collaborator.

use crate::{Dpid, ParseError, PortNo};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A one-directional link observation: a discovery frame sent out of
/// `(src_dpid, src_port)` was received on `(dst_dpid, dst_port)`.
///
/// Directed observations are raw discovery output. An undirected edge
/// is usable only once both directions have been observed and agree;
/// that derivation lives in the controller's topology graph, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectedLink {
    /// Switch the discovery frame was sent from.
    pub src_dpid: Dpid,
    /// Port the discovery frame was sent out of.
    pub src_port: PortNo,
    /// Switch the discovery frame arrived at.
    pub dst_dpid: Dpid,
    /// Port the discovery frame arrived on.
    pub dst_port: PortNo,
}

impl DirectedLink {
    /// Creates a directed link observation.
    pub const fn new(src_dpid: Dpid, src_port: PortNo, dst_dpid: Dpid, dst_port: PortNo) -> Self {
        Self {
            src_dpid,
            src_port,
            dst_dpid,
            dst_port,
        }
    }

    /// Returns the source endpoint as a key.
    pub const fn src(&self) -> (Dpid, PortNo) {
        (self.src_dpid, self.src_port)
    }

    /// Returns the destination endpoint.
    pub const fn dst(&self) -> (Dpid, PortNo) {
        (self.dst_dpid, self.dst_port)
    }

    /// Returns the same link observed from the far side.
    pub const fn reversed(&self) -> Self {
        Self {
            src_dpid: self.dst_dpid,
            src_port: self.dst_port,
            dst_dpid: self.src_dpid,
            dst_port: self.src_port,
        }
    }
}

impl fmt::Display for DirectedLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} -> {}/{}",
            self.src_dpid, self.src_port, self.dst_dpid, self.dst_port
        )
    }
}

/// Link event operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkOp {
    /// The link was observed (added or refreshed).
    Add,
    /// The link was reported gone (timeout or port down).
    Remove,
}

impl LinkOp {
    /// Returns true if this is an Add operation.
    pub const fn is_add(&self) -> bool {
        matches!(self, LinkOp::Add)
    }

    /// Returns true if this is a Remove operation.
    pub const fn is_remove(&self) -> bool {
        matches!(self, LinkOp::Remove)
    }
}

impl FromStr for LinkOp {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "add" => Ok(LinkOp::Add),
            "remove" => Ok(LinkOp::Remove),
            _ => Err(ParseError::InvalidLinkOp(s.to_string())),
        }
    }
}

/// One entry of the discovery feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEvent {
    /// Whether the link appeared or disappeared.
    pub op: LinkOp,
    /// The directed observation.
    pub link: DirectedLink,
}

impl LinkEvent {
    /// Creates a link-up event.
    pub const fn up(link: DirectedLink) -> Self {
        Self {
            op: LinkOp::Add,
            link,
        }
    }

    /// Creates a link-down event.
    pub const fn down(link: DirectedLink) -> Self {
        Self {
            op: LinkOp::Remove,
            link,
        }
    }
}

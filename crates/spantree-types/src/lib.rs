//! Common types for the spantree SDN control plane.
//!
//! This crate provides type-safe representations of the primitives shared
//! by the controller daemon and its collaborators:
//!
//! - [`Dpid`]: OpenFlow datapath (switch) identifiers
//! - [`PortNo`]: per-switch port numbers, including the reserved virtual range
//! - [`DirectedLink`]: one-directional link observations from discovery
//! - [`LinkEvent`]: the add/remove discovery feed unit

mod dpid;
mod link;
mod port;

pub use dpid::Dpid;
pub use link::{DirectedLink, LinkEvent, LinkOp};
pub use port::PortNo;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid datapath id: {0}")]
    InvalidDpid(String),

    #[error("invalid port number: {0}")]
    InvalidPortNo(String),

    #[error("invalid link operation: {0}")]
    InvalidLinkOp(String),
}

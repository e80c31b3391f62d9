//! Error types for spantreed.

use spantree_types::Dpid;
use thiserror::Error;

/// Errors from the switch transport collaborator.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The transport has no live connection for this switch.
    #[error("no connection for {0}")]
    NotConnected(Dpid),

    /// The underlying send failed.
    #[error("send to {dpid} failed: {reason}")]
    SendFailed { dpid: Dpid, reason: String },
}

/// Controller errors.
#[derive(Error, Debug, Clone)]
pub enum ControllerError {
    /// A query or event referenced a switch the controller does not know.
    #[error("unknown switch: {0}")]
    UnknownSwitch(Dpid),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for controller operations.
pub type Result<T> = std::result::Result<T, ControllerError>;

//! Controller configuration.
//!
//! Flooding on every port until the first topology snapshot stabilizes
//! is a connectivity-over-safety tradeoff, so it is an explicit policy
//! here instead of a silent default.

use crate::error::{ControllerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// What to do with inter-switch ports while no stable tree exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnstablePolicy {
    /// Leave every port unblocked until a tree is computed. Favors
    /// connectivity; a physical loop will forward broadcast storms
    /// until discovery converges.
    #[default]
    FloodAll,
    /// Block every known inter-switch port until a tree is computed.
    /// Favors loop safety; hosts on loop-free segments still work,
    /// inter-switch traffic waits for discovery.
    BlockInterSwitch,
}

impl fmt::Display for UnstablePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnstablePolicy::FloodAll => write!(f, "flood-all"),
            UnstablePolicy::BlockInterSwitch => write!(f, "block-inter-switch"),
        }
    }
}

impl FromStr for UnstablePolicy {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "flood-all" | "flood_all" => Ok(UnstablePolicy::FloodAll),
            "block-inter-switch" | "block_inter_switch" => Ok(UnstablePolicy::BlockInterSwitch),
            _ => Err(ControllerError::Config(format!(
                "unknown unstable policy: {} (expected flood-all or block-inter-switch)",
                s
            ))),
        }
    }
}

/// Controller configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Policy for inter-switch ports while the tree is unstable.
    #[serde(default)]
    pub unstable_policy: UnstablePolicy,
}

impl ControllerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the unstable-tree policy.
    pub fn with_unstable_policy(mut self, policy: UnstablePolicy) -> Self {
        self.unstable_policy = policy;
        self
    }

    /// Loads configuration from a JSON file.
    ///
    /// Missing fields take their defaults; unknown or malformed content
    /// is a [`ControllerError::Config`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ControllerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            ControllerError::Config(format!("cannot parse {}: {}", path.display(), e))
        })
    }
}

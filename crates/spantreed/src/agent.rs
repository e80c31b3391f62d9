//! Per-switch agent.
//!
//! The agent owns the one piece of device state this controller
//! manages: the set of ports with an installed drop rule. `blocked` is
//! local truth about what was sent to the switch, independent of the
//! current tree; it changes only through [`SwitchAgent::apply_blocked_ports`].

use crate::transport::{ControlMessage, SwitchTransport};
use spantree_types::{Dpid, PortNo};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Counters for one apply pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    /// Drop rules installed.
    pub installed: usize,
    /// Drop rules removed.
    pub removed: usize,
    /// Sends the transport rejected.
    pub send_failures: usize,
}

impl ApplyStats {
    /// Returns true if the pass issued no operations.
    pub fn is_noop(&self) -> bool {
        self.installed == 0 && self.removed == 0
    }
}

/// What to do with a packet handed up by the switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FloodDecision {
    /// Control-protocol frame (discovery): never forwarded, or the
    /// discovery signal itself gets corrupted.
    Ignore,
    /// Arrived on a blocked port. The drop rule should have caught it;
    /// this path only fires on a race during rule convergence.
    Drop,
    /// Flood out of these ports, in ascending order.
    Flood(Vec<PortNo>),
}

/// Per-switch state holder and rule applier.
pub struct SwitchAgent {
    dpid: Dpid,
    blocked: BTreeSet<PortNo>,
    transport: Arc<dyn SwitchTransport>,
}

impl SwitchAgent {
    /// Creates an agent for a freshly connected switch.
    ///
    /// A new connection carries no rules from us, so `blocked` starts
    /// empty. Device rules die with the connection, which is why a
    /// disconnect discards the agent instead of cleaning up.
    pub fn new(dpid: Dpid, transport: Arc<dyn SwitchTransport>) -> Self {
        Self {
            dpid,
            blocked: BTreeSet::new(),
            transport,
        }
    }

    /// Returns this agent's switch.
    pub fn dpid(&self) -> Dpid {
        self.dpid
    }

    /// Returns the currently installed drop-rule ports.
    pub fn blocked_ports(&self) -> &BTreeSet<PortNo> {
        &self.blocked
    }

    /// Reconciles the installed drop rules with `desired`.
    ///
    /// Removals are issued before installs, each in ascending port
    /// order, and `blocked` becomes `desired` once everything was
    /// issued. Re-applying an identical set issues nothing. Sends are
    /// fire-and-forget: a transport failure is logged and counted but
    /// does not abort the pass, and does not keep `blocked` from
    /// converging. Device rules vanish with the connection, and a dead
    /// connection discards this agent anyway.
    #[instrument(skip(self, desired), fields(dpid = %self.dpid))]
    pub fn apply_blocked_ports(&mut self, desired: &BTreeSet<PortNo>) -> ApplyStats {
        let mut stats = ApplyStats::default();

        // BTreeSet iteration is already ascending.
        for &port in self.blocked.difference(desired) {
            debug!(%port, "removing drop rule");
            if let Err(e) = self
                .transport
                .send(self.dpid, ControlMessage::remove_drop_rule(port))
            {
                warn!(%port, error = %e, "drop rule removal not sent");
                stats.send_failures += 1;
            }
            stats.removed += 1;
        }

        for &port in desired.difference(&self.blocked) {
            debug!(%port, "installing drop rule");
            if let Err(e) = self
                .transport
                .send(self.dpid, ControlMessage::install_drop_rule(port))
            {
                warn!(%port, error = %e, "drop rule install not sent");
                stats.send_failures += 1;
            }
            stats.installed += 1;
        }

        self.blocked = desired.clone();
        stats
    }

    /// Decides the fate of a packet-in.
    ///
    /// `allowed` is supplied by the orchestrator and already reflects
    /// the latest reconciliation; the decision only subtracts the
    /// arrival port and the reserved virtual range.
    pub fn flood_decision(
        &self,
        in_port: PortNo,
        is_control_frame: bool,
        allowed: &BTreeSet<PortNo>,
    ) -> FloodDecision {
        if is_control_frame {
            return FloodDecision::Ignore;
        }
        if self.blocked.contains(&in_port) {
            return FloodDecision::Drop;
        }
        let out_ports: Vec<PortNo> = allowed
            .iter()
            .copied()
            .filter(|&p| p != in_port && !p.is_virtual())
            .collect();
        FloodDecision::Flood(out_ports)
    }
}

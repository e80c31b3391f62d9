//! Switch transport seam.
//!
//! The controller never touches wire encoding. It hands protocol-level
//! control messages to a [`SwitchTransport`] and asks it which ports a
//! connected switch currently has. A real implementation wraps an
//! OpenFlow connection; [`InMemoryTransport`] backs tests and the
//! standalone daemon mode.

use crate::error::TransportError;
use spantree_types::{Dpid, PortNo};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

/// Priority of installed drop rules. High enough to shadow any
/// forwarding rule the switch may also carry.
pub const DROP_RULE_PRIORITY: u16 = 10_000;

/// Cookie tag marking rules owned by this controller.
const DROP_RULE_COOKIE_TAG: u64 = 0x5354_5245_4500_0000;

/// Stable rule identifier for the drop rule on a given port.
///
/// Deriving the cookie from the port number lets a later removal target
/// exactly the rule this controller installed, without disturbing
/// unrelated rules on the same switch.
pub const fn drop_rule_cookie(port: PortNo) -> u64 {
    DROP_RULE_COOKIE_TAG | port.as_u16() as u64
}

/// Protocol-level control messages the controller produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Install a rule that discards every frame arriving on `in_port`.
    InstallDropRule {
        in_port: PortNo,
        priority: u16,
        cookie: u64,
    },
    /// Remove the drop rule previously installed with `cookie`.
    RemoveDropRule { cookie: u64 },
    /// Flood a frame out of `out_ports`.
    ///
    /// When the switch buffered the frame, `buffer_id` references it
    /// and `data` is empty; otherwise the raw bytes travel in `data`.
    PacketOut {
        in_port: PortNo,
        buffer_id: Option<u32>,
        data: Vec<u8>,
        out_ports: Vec<PortNo>,
    },
}

impl ControlMessage {
    /// Builds the install message for a port's drop rule.
    pub fn install_drop_rule(in_port: PortNo) -> Self {
        ControlMessage::InstallDropRule {
            in_port,
            priority: DROP_RULE_PRIORITY,
            cookie: drop_rule_cookie(in_port),
        }
    }

    /// Builds the removal message for a port's drop rule.
    pub fn remove_drop_rule(in_port: PortNo) -> Self {
        ControlMessage::RemoveDropRule {
            cookie: drop_rule_cookie(in_port),
        }
    }
}

/// Interface to the switch connection layer.
///
/// Sends are fire-and-forget: the controller does not track
/// acknowledgments, and a lost connection invalidates the per-switch
/// agent rather than any in-flight message.
pub trait SwitchTransport: Send + Sync {
    /// Sends a control message to the given switch.
    fn send(&self, dpid: Dpid, msg: ControlMessage) -> Result<(), TransportError>;

    /// Returns the ports currently known on the switch's connection.
    ///
    /// Unknown or disconnected switches yield an empty set.
    fn ports_of(&self, dpid: Dpid) -> BTreeSet<PortNo>;
}

/// In-memory transport that records every message it is given.
///
/// Used by the test suites and by the daemon's standalone mode, where
/// no real switch connection layer is attached.
#[derive(Default, Clone)]
pub struct InMemoryTransport {
    inner: Arc<Mutex<InMemoryState>>,
}

#[derive(Default)]
struct InMemoryState {
    ports: HashMap<Dpid, BTreeSet<PortNo>>,
    sent: Vec<(Dpid, ControlMessage)>,
}

impl InMemoryTransport {
    /// Creates an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a switch with the given port set.
    pub fn add_switch(&self, dpid: Dpid, ports: impl IntoIterator<Item = PortNo>) {
        let mut inner = self.inner.lock().expect("transport lock");
        inner.ports.insert(dpid, ports.into_iter().collect());
    }

    /// Removes a switch's connection.
    pub fn remove_switch(&self, dpid: Dpid) {
        let mut inner = self.inner.lock().expect("transport lock");
        inner.ports.remove(&dpid);
    }

    /// Returns all messages sent so far, in order.
    pub fn sent(&self) -> Vec<(Dpid, ControlMessage)> {
        self.inner.lock().expect("transport lock").sent.clone()
    }

    /// Returns the messages sent since the last call to this method.
    pub fn drain_sent(&self) -> Vec<(Dpid, ControlMessage)> {
        std::mem::take(&mut self.inner.lock().expect("transport lock").sent)
    }
}

impl SwitchTransport for InMemoryTransport {
    fn send(&self, dpid: Dpid, msg: ControlMessage) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().expect("transport lock");
        if !inner.ports.contains_key(&dpid) {
            return Err(TransportError::NotConnected(dpid));
        }
        inner.sent.push((dpid, msg));
        Ok(())
    }

    fn ports_of(&self, dpid: Dpid) -> BTreeSet<PortNo> {
        let inner = self.inner.lock().expect("transport lock");
        inner.ports.get(&dpid).cloned().unwrap_or_default()
    }
}

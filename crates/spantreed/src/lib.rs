//! Self-stabilizing spanning-tree SDN controller.
//!
//! `spantreed` discovers the physical topology of a packet-switched
//! network from link-up/link-down events, computes a loop-free spanning
//! tree over it, and continuously reconciles each switch's
//! forwarding state (which ports may flood) with the computed tree.
//!
//! # Data flow
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Discovery events | [`topology`] | confirmed undirected adjacency |
//! | Tree computation | [`spanning_tree`] | per-switch tree ports |
//! | Reconciliation | [`controller`] | desired blocked-port sets |
//! | Rule application | [`agent`] | drop-rule install/remove messages |
//!
//! Packet-ins travel the other way: agent decision, then a flood
//! packet-out through the [`transport`] seam.
//!
//! # Example
//!
//! ```
//! use spantreed::{ControllerConfig, InMemoryTransport, TreeController};
//! use spantree_types::{DirectedLink, Dpid, LinkEvent, PortNo};
//! use std::sync::Arc;
//!
//! let transport = InMemoryTransport::new();
//! transport.add_switch(Dpid::new(1), [PortNo::new(1)]);
//! transport.add_switch(Dpid::new(2), [PortNo::new(1)]);
//!
//! let mut controller =
//!     TreeController::new(ControllerConfig::default(), Arc::new(transport));
//! controller.on_switch_connect(Dpid::new(1));
//! controller.on_switch_connect(Dpid::new(2));
//!
//! let link = DirectedLink::new(Dpid::new(1), PortNo::new(1), Dpid::new(2), PortNo::new(1));
//! controller.on_link_event(LinkEvent::up(link));
//! controller.on_link_event(LinkEvent::up(link.reversed()));
//! assert!(controller.tree().is_stable());
//! ```

pub mod agent;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod spanning_tree;
pub mod topology;
pub mod transport;

pub use agent::{ApplyStats, FloodDecision, SwitchAgent};
pub use config::{ControllerConfig, UnstablePolicy};
pub use controller::{ControllerStats, TreeController};
pub use error::{ControllerError, Result, TransportError};
pub use events::{event_channel, run_event_loop, ControllerEvent, EventSender};
pub use spanning_tree::SpanningTree;
pub use topology::{Adjacency, Neighbor, TopologyGraph};
pub use transport::{ControlMessage, InMemoryTransport, SwitchTransport, DROP_RULE_PRIORITY};

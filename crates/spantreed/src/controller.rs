//! The tree controller: orchestrates topology, tree, and agents.

use crate::agent::{FloodDecision, SwitchAgent};
use crate::config::{ControllerConfig, UnstablePolicy};
use crate::spanning_tree::SpanningTree;
use crate::topology::TopologyGraph;
use crate::transport::{ControlMessage, SwitchTransport};
use spantree_types::{Dpid, LinkEvent, LinkOp, PortNo};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Controller counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    /// Full tree recomputations performed.
    pub recomputations: u64,
    /// Drop rules installed across all switches.
    pub rules_installed: u64,
    /// Drop rules removed across all switches.
    pub rules_removed: u64,
    /// Packet-ins flooded.
    pub packets_flooded: u64,
    /// Packet-ins dropped (blocked arrival port).
    pub packets_dropped: u64,
    /// Control-protocol frames left alone.
    pub packets_ignored: u64,
    /// Transport send failures observed during reconciliation.
    pub send_failures: u64,
}

/// Spanning-tree controller.
///
/// Owns all per-switch agents and the topology state. Every mutation
/// enters through one of the `on_*` handlers, which the event loop
/// calls one at a time; `reconcile` always runs to completion before
/// the next event, so every switch observes a consistent tree snapshot.
pub struct TreeController {
    config: ControllerConfig,
    transport: Arc<dyn SwitchTransport>,
    topology: TopologyGraph,
    tree: SpanningTree,
    agents: BTreeMap<Dpid, SwitchAgent>,
    stats: ControllerStats,
}

impl TreeController {
    /// Creates a controller with no switches and an empty topology.
    pub fn new(config: ControllerConfig, transport: Arc<dyn SwitchTransport>) -> Self {
        Self {
            config,
            transport,
            topology: TopologyGraph::new(),
            tree: SpanningTree::default(),
            agents: BTreeMap::new(),
            stats: ControllerStats::default(),
        }
    }

    /// Returns the current counters.
    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    /// Returns the most recently computed tree.
    pub fn tree(&self) -> &SpanningTree {
        &self.tree
    }

    /// Returns the dpids of all live agents.
    pub fn switches(&self) -> Vec<Dpid> {
        self.agents.keys().copied().collect()
    }

    /// Returns a switch's currently installed drop-rule ports.
    ///
    /// Unknown switches yield an empty set rather than an error.
    pub fn blocked_ports(&self, dpid: Dpid) -> BTreeSet<PortNo> {
        self.agents
            .get(&dpid)
            .map(|a| a.blocked_ports().clone())
            .unwrap_or_default()
    }

    /// Handles a switch connection.
    #[instrument(skip(self), fields(dpid = %dpid))]
    pub fn on_switch_connect(&mut self, dpid: Dpid) {
        info!("switch connected");
        self.agents
            .insert(dpid, SwitchAgent::new(dpid, Arc::clone(&self.transport)));
        self.reconcile();
    }

    /// Handles a switch disconnect.
    ///
    /// The agent is discarded without rule cleanup: device rules are
    /// connection-resident and died with it.
    #[instrument(skip(self), fields(dpid = %dpid))]
    pub fn on_switch_disconnect(&mut self, dpid: Dpid) {
        if self.agents.remove(&dpid).is_none() {
            warn!("disconnect for unknown switch");
            return;
        }
        info!("switch disconnected");
        self.reconcile();
    }

    /// Handles a discovery link event.
    #[instrument(skip(self, event), fields(link = %event.link))]
    pub fn on_link_event(&mut self, event: LinkEvent) {
        match event.op {
            LinkOp::Add => self.topology.record_link_up(event.link),
            LinkOp::Remove => self.topology.record_link_down(event.link),
        }
        self.reconcile();
    }

    /// Handles a packet-in: asks the switch's agent for a decision and
    /// floods through the transport when called for.
    #[instrument(skip(self, data), fields(dpid = %dpid, in_port = %in_port))]
    pub fn on_packet_in(
        &mut self,
        dpid: Dpid,
        in_port: PortNo,
        buffer_id: Option<u32>,
        data: Vec<u8>,
        is_control_frame: bool,
    ) -> FloodDecision {
        let allowed = self.allowed_ports(dpid);
        let Some(agent) = self.agents.get(&dpid) else {
            warn!("packet-in from unknown switch");
            self.stats.packets_dropped += 1;
            return FloodDecision::Drop;
        };

        let decision = agent.flood_decision(in_port, is_control_frame, &allowed);
        match &decision {
            FloodDecision::Ignore => {
                self.stats.packets_ignored += 1;
            }
            FloodDecision::Drop => {
                debug!("packet-in on blocked port dropped");
                self.stats.packets_dropped += 1;
            }
            FloodDecision::Flood(out_ports) => {
                self.stats.packets_flooded += 1;
                let msg = ControlMessage::PacketOut {
                    in_port,
                    buffer_id,
                    data,
                    out_ports: out_ports.clone(),
                };
                if let Err(e) = self.transport.send(dpid, msg) {
                    warn!(error = %e, "packet-out not sent");
                    self.stats.send_failures += 1;
                }
            }
        }
        decision
    }

    /// Ports a packet-in from `dpid` may legally be flooded out of:
    /// everything the connection reports, minus the agent's installed
    /// drop-rule ports, minus the reserved virtual range.
    ///
    /// Reflects the latest reconciliation by construction: the agent's
    /// `blocked` set is only ever written by `reconcile`.
    pub fn allowed_ports(&self, dpid: Dpid) -> BTreeSet<PortNo> {
        let Some(agent) = self.agents.get(&dpid) else {
            return BTreeSet::new();
        };
        self.transport
            .ports_of(dpid)
            .into_iter()
            .filter(|p| !p.is_virtual() && !agent.blocked_ports().contains(p))
            .collect()
    }

    /// Recomputes the tree and drives every live agent to its desired
    /// blocked-port set.
    ///
    /// One switch's failure never aborts the sweep; failures surface as
    /// warnings and counters only.
    #[instrument(skip(self))]
    pub fn reconcile(&mut self) {
        self.tree = SpanningTree::compute(&self.topology.confirmed_adjacency());
        self.stats.recomputations += 1;

        let stable = self.tree.is_stable();
        debug!(stable, switches = self.agents.len(), "reconciling");

        for (&dpid, agent) in self.agents.iter_mut() {
            let interswitch = self.topology.interswitch_ports(dpid);
            let desired: BTreeSet<PortNo> = if stable {
                if self.tree.contains(dpid) {
                    let tree_ports = self.tree.tree_ports(dpid);
                    interswitch
                        .into_iter()
                        .filter(|p| !tree_ports.contains(p))
                        .collect()
                } else {
                    // Unreachable from the root: fail open and keep
                    // flooding rather than black-holing the island.
                    BTreeSet::new()
                }
            } else {
                match self.config.unstable_policy {
                    UnstablePolicy::FloodAll => BTreeSet::new(),
                    UnstablePolicy::BlockInterSwitch => interswitch,
                }
            };

            let applied = agent.apply_blocked_ports(&desired);
            self.stats.rules_installed += applied.installed as u64;
            self.stats.rules_removed += applied.removed as u64;
            self.stats.send_failures += applied.send_failures as u64;
            if !applied.is_noop() {
                info!(
                    %dpid,
                    installed = applied.installed,
                    removed = applied.removed,
                    "blocked ports updated"
                );
            }
        }
    }

    /// Dumps a human-readable state snapshot for debugging.
    pub fn dump(&self) -> Vec<String> {
        let mut lines = Vec::new();
        lines.push(format!(
            "tree: stable={} switches={} parent_edges={}",
            self.tree.is_stable(),
            self.tree.switch_count(),
            self.tree.parent_edge_count()
        ));
        for (dpid, agent) in &self.agents {
            let blocked: Vec<String> = agent
                .blocked_ports()
                .iter()
                .map(|p| p.to_string())
                .collect();
            lines.push(format!(
                "  {} tree_ports={:?} blocked=[{}]",
                dpid,
                self.tree
                    .tree_ports(*dpid)
                    .iter()
                    .map(|p| p.as_u16())
                    .collect::<Vec<_>>(),
                blocked.join(",")
            ));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InMemoryTransport;
    use pretty_assertions::assert_eq;
    use spantree_types::DirectedLink;

    fn ports(list: &[u16]) -> BTreeSet<PortNo> {
        list.iter().map(|&p| PortNo::new(p)).collect()
    }

    fn link(a: u64, ap: u16, b: u64, bp: u16) -> DirectedLink {
        DirectedLink::new(Dpid::new(a), PortNo::new(ap), Dpid::new(b), PortNo::new(bp))
    }

    fn setup(switches: &[(u64, &[u16])]) -> (TreeController, InMemoryTransport) {
        let transport = InMemoryTransport::new();
        let mut controller = TreeController::new(
            ControllerConfig::default(),
            Arc::new(transport.clone()),
        );
        for &(dpid, port_list) in switches {
            transport.add_switch(Dpid::new(dpid), ports(port_list));
            controller.on_switch_connect(Dpid::new(dpid));
        }
        (controller, transport)
    }

    fn confirm(controller: &mut TreeController, l: DirectedLink) {
        controller.on_link_event(LinkEvent::up(l));
        controller.on_link_event(LinkEvent::up(l.reversed()));
    }

    #[test]
    fn test_no_links_means_no_blocking() {
        let (controller, _) = setup(&[(1, &[1, 2]), (2, &[1, 2])]);
        assert!(!controller.tree().is_stable());
        assert!(controller.blocked_ports(Dpid::new(1)).is_empty());
        assert!(controller.blocked_ports(Dpid::new(2)).is_empty());
    }

    #[test]
    fn test_asymmetric_link_changes_nothing() {
        let (mut controller, _) = setup(&[(1, &[1, 2]), (2, &[1, 2])]);
        controller.on_link_event(LinkEvent::up(link(1, 1, 2, 1)));

        assert!(!controller.tree().is_stable());
        assert!(controller.blocked_ports(Dpid::new(1)).is_empty());
        assert!(controller.blocked_ports(Dpid::new(2)).is_empty());
    }

    #[test]
    fn test_triangle_blocks_off_tree_edge() {
        let (mut controller, _) =
            setup(&[(1, &[1, 2, 3]), (2, &[1, 2, 3]), (3, &[1, 2, 3])]);
        confirm(&mut controller, link(1, 1, 2, 1));
        confirm(&mut controller, link(2, 2, 3, 2));
        confirm(&mut controller, link(1, 2, 3, 1));

        // Tree edges 1-2 and 1-3; the 2-3 edge is blocked on both ends.
        assert!(controller.tree().is_stable());
        assert!(controller.blocked_ports(Dpid::new(1)).is_empty());
        assert_eq!(controller.blocked_ports(Dpid::new(2)), ports(&[2]));
        assert_eq!(controller.blocked_ports(Dpid::new(3)), ports(&[2]));
    }

    #[test]
    fn test_blocked_is_interswitch_minus_tree() {
        let (mut controller, _) =
            setup(&[(1, &[1, 2, 3]), (2, &[1, 2, 3]), (3, &[1, 2, 3])]);
        confirm(&mut controller, link(1, 1, 2, 1));
        confirm(&mut controller, link(2, 2, 3, 2));
        confirm(&mut controller, link(1, 2, 3, 1));

        let topo_check = |dpid: u64, interswitch: &[u16]| {
            let dpid = Dpid::new(dpid);
            let blocked = controller.blocked_ports(dpid);
            let tree = controller.tree().tree_ports(dpid);
            let expected: BTreeSet<PortNo> = ports(interswitch)
                .into_iter()
                .filter(|p| !tree.contains(p))
                .collect();
            assert_eq!(blocked, expected);
            assert!(blocked.intersection(&tree).next().is_none());
        };
        topo_check(1, &[1, 2]);
        topo_check(2, &[1, 2]);
        topo_check(3, &[1, 2]);
    }

    #[test]
    fn test_link_down_reopens_port() {
        let (mut controller, _) =
            setup(&[(1, &[1, 2, 3]), (2, &[1, 2, 3]), (3, &[1, 2, 3])]);
        confirm(&mut controller, link(1, 1, 2, 1));
        confirm(&mut controller, link(2, 2, 3, 2));
        confirm(&mut controller, link(1, 2, 3, 1));
        assert_eq!(controller.blocked_ports(Dpid::new(2)), ports(&[2]));

        // Tree edge 1-3 goes away; 2-3 must come back into the tree.
        controller.on_link_event(LinkEvent::down(link(1, 2, 3, 1)));
        controller.on_link_event(LinkEvent::down(link(3, 1, 1, 2)));

        assert!(controller.blocked_ports(Dpid::new(2)).is_empty());
        // The dead link's ports stay classified inter-switch and are
        // off the new tree, so they end up blocked.
        assert_eq!(controller.blocked_ports(Dpid::new(1)), ports(&[2]));
        assert_eq!(controller.blocked_ports(Dpid::new(3)), ports(&[1]));
    }

    #[test]
    fn test_disconnect_excludes_agent_from_sweep() {
        let (mut controller, transport) =
            setup(&[(1, &[1, 2, 3]), (2, &[1, 2, 3]), (3, &[1, 2, 3])]);
        confirm(&mut controller, link(1, 1, 2, 1));
        confirm(&mut controller, link(2, 2, 3, 2));
        confirm(&mut controller, link(1, 2, 3, 1));

        transport.remove_switch(Dpid::new(3));
        controller.on_switch_disconnect(Dpid::new(3));

        assert_eq!(controller.switches(), vec![Dpid::new(1), Dpid::new(2)]);
        assert!(controller.blocked_ports(Dpid::new(3)).is_empty());
    }

    #[test]
    fn test_unknown_switch_queries_return_empty() {
        let (controller, _) = setup(&[(1, &[1])]);
        assert!(controller.allowed_ports(Dpid::new(99)).is_empty());
        assert!(controller.blocked_ports(Dpid::new(99)).is_empty());
    }

    #[test]
    fn test_allowed_ports_subtracts_blocked_and_virtual() {
        let (mut controller, transport) = setup(&[(1, &[1, 2]), (2, &[1, 2]), (3, &[1, 2])]);
        // Give switch 2 a virtual local port on its connection.
        let mut with_virtual = ports(&[1, 2]);
        with_virtual.insert(PortNo::LOCAL);
        transport.add_switch(Dpid::new(2), with_virtual);

        confirm(&mut controller, link(1, 1, 2, 1));
        confirm(&mut controller, link(2, 2, 3, 2));
        confirm(&mut controller, link(1, 2, 3, 1));

        assert_eq!(controller.allowed_ports(Dpid::new(2)), ports(&[1]));
    }

    #[test]
    fn test_packet_in_flood_sends_packet_out() {
        let (mut controller, transport) = setup(&[(1, &[1, 2, 3])]);
        transport.drain_sent();

        let decision =
            controller.on_packet_in(Dpid::new(1), PortNo::new(1), None, b"frame".to_vec(), false);
        assert_eq!(
            decision,
            FloodDecision::Flood(vec![PortNo::new(2), PortNo::new(3)])
        );

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        match &sent[0].1 {
            ControlMessage::PacketOut {
                in_port,
                buffer_id,
                data,
                out_ports,
            } => {
                assert_eq!(*in_port, PortNo::new(1));
                assert_eq!(*buffer_id, None);
                assert_eq!(data, b"frame");
                assert_eq!(out_ports, &vec![PortNo::new(2), PortNo::new(3)]);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_packet_in_buffer_id_passthrough() {
        let (mut controller, transport) = setup(&[(1, &[1, 2])]);
        transport.drain_sent();

        controller.on_packet_in(Dpid::new(1), PortNo::new(1), Some(77), Vec::new(), false);

        match &transport.sent()[0].1 {
            ControlMessage::PacketOut {
                buffer_id, data, ..
            } => {
                assert_eq!(*buffer_id, Some(77));
                assert!(data.is_empty());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_packet_in_control_frame_ignored() {
        let (mut controller, transport) = setup(&[(1, &[1, 2])]);
        transport.drain_sent();

        let decision =
            controller.on_packet_in(Dpid::new(1), PortNo::new(1), None, Vec::new(), true);
        assert_eq!(decision, FloodDecision::Ignore);
        assert!(transport.sent().is_empty());
        assert_eq!(controller.stats().packets_ignored, 1);
    }

    #[test]
    fn test_packet_in_unknown_switch_dropped() {
        let (mut controller, _) = setup(&[(1, &[1])]);
        let decision =
            controller.on_packet_in(Dpid::new(9), PortNo::new(1), None, Vec::new(), false);
        assert_eq!(decision, FloodDecision::Drop);
    }

    #[test]
    fn test_block_inter_switch_policy_while_unstable() {
        let transport = InMemoryTransport::new();
        let config =
            ControllerConfig::new().with_unstable_policy(UnstablePolicy::BlockInterSwitch);
        let mut controller = TreeController::new(config, Arc::new(transport.clone()));
        transport.add_switch(Dpid::new(1), ports(&[1, 2]));
        transport.add_switch(Dpid::new(2), ports(&[1, 2]));
        controller.on_switch_connect(Dpid::new(1));
        controller.on_switch_connect(Dpid::new(2));

        // One direction only: still unstable, but port 1/1 and 2/1 are
        // now known inter-switch ports and get blocked.
        controller.on_link_event(LinkEvent::up(link(1, 1, 2, 1)));
        assert!(!controller.tree().is_stable());
        assert_eq!(controller.blocked_ports(Dpid::new(1)), ports(&[1]));
        assert_eq!(controller.blocked_ports(Dpid::new(2)), ports(&[1]));

        // Confirmation stabilizes the tree and unblocks the tree edge.
        controller.on_link_event(LinkEvent::up(link(2, 1, 1, 1)));
        assert!(controller.tree().is_stable());
        assert!(controller.blocked_ports(Dpid::new(1)).is_empty());
        assert!(controller.blocked_ports(Dpid::new(2)).is_empty());
    }

    #[test]
    fn test_reconcile_is_idempotent_across_sweeps() {
        let (mut controller, transport) =
            setup(&[(1, &[1, 2, 3]), (2, &[1, 2, 3]), (3, &[1, 2, 3])]);
        confirm(&mut controller, link(1, 1, 2, 1));
        confirm(&mut controller, link(2, 2, 3, 2));
        confirm(&mut controller, link(1, 2, 3, 1));
        transport.drain_sent();

        controller.reconcile();
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_stats_counters() {
        let (mut controller, _) = setup(&[(1, &[1, 2, 3]), (2, &[1, 2, 3]), (3, &[1, 2, 3])]);
        confirm(&mut controller, link(1, 1, 2, 1));
        confirm(&mut controller, link(2, 2, 3, 2));
        confirm(&mut controller, link(1, 2, 3, 1));

        let stats = controller.stats();
        // 3 connects + 6 link events, each triggering a reconcile.
        assert_eq!(stats.recomputations, 9);
        // Half-confirmed edges transiently block their already-classified
        // ports (3 installs, of which 3/1 is later swapped for 3/2), so
        // the sweep issues more than the final two blocked ports.
        assert_eq!(stats.rules_installed, 5);
        assert_eq!(stats.rules_removed, 3);
        assert_eq!(stats.send_failures, 0);
    }

    #[test]
    fn test_dump_contains_every_switch() {
        let (controller, _) = setup(&[(1, &[1]), (2, &[1])]);
        let lines = controller.dump();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("stable=false"));
    }
}

//! Topology graph built from directed discovery observations.
//!
//! Discovery reports links one direction at a time and the reports can
//! arrive out of order, duplicated, or stale. The graph therefore keeps
//! the raw directed observations and only derives an undirected edge
//! when both directions are present and mutually consistent. Acting on
//! half-discovered links is how forwarding loops get built.

use spantree_types::{DirectedLink, Dpid, PortNo};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// One confirmed neighbor of a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Neighbor {
    /// The neighboring switch.
    pub dpid: Dpid,
    /// Our port on the edge.
    pub local_port: PortNo,
    /// The neighbor's port on the edge.
    pub remote_port: PortNo,
}

/// Confirmed undirected adjacency, one sorted neighbor list per switch.
pub type Adjacency = BTreeMap<Dpid, Vec<Neighbor>>;

/// In-memory topology state.
#[derive(Debug, Default)]
pub struct TopologyGraph {
    /// Directed observations keyed by source endpoint. At most one
    /// target per key; a newer report for the same endpoint wins.
    directed: HashMap<(Dpid, PortNo), (Dpid, PortNo)>,
    /// Ports ever observed carrying an inter-switch link. Membership is
    /// monotonic: a flapping trunk port stays classified as
    /// inter-switch rather than transiently becoming host-facing.
    interswitch_ports: HashMap<Dpid, BTreeSet<PortNo>>,
}

impl TopologyGraph {
    /// Creates an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a directed link-up observation.
    pub fn record_link_up(&mut self, link: DirectedLink) {
        debug!(%link, "link up");
        self.directed.insert(link.src(), link.dst());
        self.interswitch_ports
            .entry(link.src_dpid)
            .or_default()
            .insert(link.src_port);
        self.interswitch_ports
            .entry(link.dst_dpid)
            .or_default()
            .insert(link.dst_port);
    }

    /// Records a directed link-down observation.
    ///
    /// The entry is removed only if it still points at exactly the
    /// reported far end. A link-down racing behind a newer link-up that
    /// reused the same source endpoint is a stale report and must not
    /// clobber the newer link.
    pub fn record_link_down(&mut self, link: DirectedLink) {
        match self.directed.get(&link.src()) {
            Some(&dst) if dst == link.dst() => {
                debug!(%link, "link down");
                self.directed.remove(&link.src());
            }
            Some(_) | None => {
                debug!(%link, "stale link down ignored");
            }
        }
    }

    /// Returns the ports of `dpid` ever observed as inter-switch.
    pub fn interswitch_ports(&self, dpid: Dpid) -> BTreeSet<PortNo> {
        self.interswitch_ports.get(&dpid).cloned().unwrap_or_default()
    }

    /// Returns the number of directed observations currently held.
    pub fn directed_link_count(&self) -> usize {
        self.directed.len()
    }

    /// Derives the confirmed undirected adjacency.
    ///
    /// An edge `u/up <-> v/vp` exists iff the directed entries
    /// `u/up -> v/vp` and `v/vp -> u/up` are both present. Each
    /// neighbor list is sorted by `(dpid, local_port, remote_port)` so
    /// traversal order, and with it the spanning tree, is a pure
    /// function of the confirmed-edge set.
    pub fn confirmed_adjacency(&self) -> Adjacency {
        let mut adjacency: Adjacency = BTreeMap::new();

        for (&(src_dpid, src_port), &(dst_dpid, dst_port)) in &self.directed {
            let confirmed = self
                .directed
                .get(&(dst_dpid, dst_port))
                .is_some_and(|&back| back == (src_dpid, src_port));
            if !confirmed {
                continue;
            }
            adjacency.entry(src_dpid).or_default().push(Neighbor {
                dpid: dst_dpid,
                local_port: src_port,
                remote_port: dst_port,
            });
        }

        for neighbors in adjacency.values_mut() {
            neighbors.sort();
        }
        adjacency
    }
}

//! Spanning-tree computation over the confirmed topology.
//!
//! The tree is recomputed from scratch on every topology change rather
//! than patched incrementally. Loop safety depends on every switch
//! observing the same tree for the same discovery feed, and a full
//! recomputation over a sorted adjacency is trivially deterministic.

use crate::topology::Adjacency;
use spantree_types::{Dpid, PortNo};
use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::debug;

/// The computed tree: per-switch tree ports plus a stability flag.
#[derive(Debug, Clone, Default)]
pub struct SpanningTree {
    tree_ports: HashMap<Dpid, BTreeSet<PortNo>>,
    stable: bool,
    parent_edges: usize,
}

impl SpanningTree {
    /// Computes the tree for the given confirmed adjacency.
    ///
    /// With no confirmed edges the result is unstable and assigns no
    /// tree ports. Otherwise a breadth-first traversal starts at the
    /// smallest dpid present; the first edge (in sorted neighbor order)
    /// that discovers a switch becomes its parent edge, and both of
    /// that edge's ports become tree ports. Sorted order makes the
    /// choice among parallel links repeatable: the lowest
    /// `(local_port, remote_port)` pair wins.
    pub fn compute(adjacency: &Adjacency) -> Self {
        let Some(&root) = adjacency.keys().next() else {
            debug!("no confirmed edges, tree unstable");
            return Self::default();
        };

        let mut tree_ports: HashMap<Dpid, BTreeSet<PortNo>> = HashMap::new();
        let mut visited: BTreeSet<Dpid> = BTreeSet::new();
        let mut parent_edges = 0;
        let mut queue = VecDeque::new();

        visited.insert(root);
        queue.push_back(root);

        while let Some(dpid) = queue.pop_front() {
            let Some(neighbors) = adjacency.get(&dpid) else {
                continue;
            };
            for neighbor in neighbors {
                if !visited.insert(neighbor.dpid) {
                    continue;
                }
                tree_ports
                    .entry(dpid)
                    .or_default()
                    .insert(neighbor.local_port);
                tree_ports
                    .entry(neighbor.dpid)
                    .or_default()
                    .insert(neighbor.remote_port);
                parent_edges += 1;
                queue.push_back(neighbor.dpid);
            }
        }

        debug!(
            %root,
            switches = visited.len(),
            parent_edges,
            "spanning tree computed"
        );

        Self {
            tree_ports,
            stable: true,
            parent_edges,
        }
    }

    /// Returns true once the tree reflects at least one confirmed edge.
    pub fn is_stable(&self) -> bool {
        self.stable
    }

    /// Returns the tree ports assigned to a switch.
    ///
    /// Switches unreachable from the root (or unknown entirely) have no
    /// assignment and yield an empty set.
    pub fn tree_ports(&self, dpid: Dpid) -> BTreeSet<PortNo> {
        self.tree_ports.get(&dpid).cloned().unwrap_or_default()
    }

    /// Returns true if the switch was reached by the traversal.
    ///
    /// Every switch in the tree carries at least one tree port (the
    /// root included, since a stable tree has at least one edge).
    pub fn contains(&self, dpid: Dpid) -> bool {
        self.tree_ports.contains_key(&dpid)
    }

    /// Returns the number of switches with at least one tree port.
    pub fn switch_count(&self) -> usize {
        self.tree_ports.len()
    }

    /// Returns the number of parent edges selected by the traversal.
    pub fn parent_edge_count(&self) -> usize {
        self.parent_edges
    }
}

//! # Reachability Resolution
//!
//! Computes the alive-set for one `(roots, mode)` pair over the current
//! edges of an `EdgeStore`.
//!
//! A simple edge makes its child alive when its parent is alive and its
//! strength holds in the requested mode. A joint edge makes its child alive
//! only once *every* owner is alive.
//!
//! `resolve` processes each newly alive node once and keeps a countdown of
//! missing owners per joint edge, so a joint edge fires the moment its last
//! owner arrives. `resolve_by_passes` is the plain repeat-until-stable
//! fixpoint; both produce the same set.

use std::collections::VecDeque;

use hashbrown::HashMap;

use crate::graph::EdgeStore;
use crate::model::{EdgeId, JointEdgeId, NodeId};

/// Why a node is alive: the first thing that made it so.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Justification {
    Root,
    Edge(EdgeId),
    Joint(JointEdgeId),
}

/// Nodes found alive, each with its justification.
///
/// Justifications always point at nodes that became alive earlier, so
/// following them backward from any member ends at a root.
#[derive(Debug, Clone)]
pub struct AliveSet {
    alive: HashMap<NodeId, Justification>,
    strong_only: bool,
}

impl AliveSet {
    fn new(strong_only: bool) -> Self {
        Self {
            alive: HashMap::new(),
            strong_only,
        }
    }

    /// Mark `node` alive. Returns `false` if it already was.
    fn mark(&mut self, node: NodeId, why: Justification) -> bool {
        if self.alive.contains_key(&node) {
            return false;
        }
        self.alive.insert(node, why);
        true
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.alive.contains_key(&node)
    }

    pub fn justification(&self, node: NodeId) -> Option<Justification> {
        self.alive.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.alive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alive.is_empty()
    }

    /// Whether only strong edges were followed.
    pub fn strong_only(&self) -> bool {
        self.strong_only
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.alive.keys().copied()
    }

    /// Members in id order.
    pub fn sorted(&self) -> Vec<NodeId> {
        let mut nodes: Vec<_> = self.iter().collect();
        nodes.sort();
        nodes
    }
}

/// Alive-set reachable from `roots`.
pub fn resolve(edges: &EdgeStore, roots: &[NodeId], strong_only: bool) -> AliveSet {
    let mut alive = AliveSet::new(strong_only);
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    // joint edge → owners not yet alive
    let mut missing: HashMap<JointEdgeId, usize> = HashMap::new();

    for root in roots {
        if alive.mark(*root, Justification::Root) {
            queue.push_back(*root);
        }
    }

    while let Some(node) = queue.pop_front() {
        for (id, edge) in edges.outgoing(node) {
            if edge.strength.holds(strong_only) && alive.mark(edge.child, Justification::Edge(id)) {
                queue.push_back(edge.child);
            }
        }

        // Owners are deduplicated and each node is dequeued once, so every
        // owner decrements a counter exactly once.
        for (id, joint) in edges.joint_owned_by(node) {
            if !joint.strength.holds(strong_only) {
                continue;
            }
            let remaining = missing.entry(id).or_insert(joint.owners.len());
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 && alive.mark(joint.child, Justification::Joint(id)) {
                queue.push_back(joint.child);
            }
        }
    }

    tracing::trace!(roots = roots.len(), alive = alive.len(), strong_only, "resolved");
    alive
}

/// Same alive-set as `resolve`, by full passes over every current edge
/// until a pass changes nothing.
pub fn resolve_by_passes(edges: &EdgeStore, roots: &[NodeId], strong_only: bool) -> AliveSet {
    let mut alive = AliveSet::new(strong_only);
    for root in roots {
        alive.mark(*root, Justification::Root);
    }

    let mut simple: Vec<_> = edges.current_edges().collect();
    simple.sort_by_key(|(id, _)| *id);
    let mut joint: Vec<_> = edges.current_joint_edges().collect();
    joint.sort_by_key(|(id, _)| *id);

    loop {
        let mut changed = false;
        for (id, edge) in &simple {
            if edge.strength.holds(strong_only) && alive.contains(edge.parent) {
                changed |= alive.mark(edge.child, Justification::Edge(*id));
            }
        }
        for (id, edge) in &joint {
            if edge.strength.holds(strong_only) && edge.owners.iter().all(|o| alive.contains(*o)) {
                changed |= alive.mark(edge.child, Justification::Joint(*id));
            }
        }
        if !changed {
            break;
        }
    }
    alive
}

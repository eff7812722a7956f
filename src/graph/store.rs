//! Node table and edge store.
//!
//! Both are arenas addressed by integer id, so cyclic graphs are plain
//! data. Edges are interned: re-emitting an identical edge yields the same
//! `EdgeId`.
//!
//! The store tracks which edges are *current*. When a node is re-classified
//! its previous edges are retired from the indexes (the arena entries stay,
//! so ids recorded earlier remain resolvable).

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::model::{Edge, EdgeId, GraphNode, JointEdge, JointEdgeId, NodeId};

type EdgeList = SmallVec<[EdgeId; 4]>;
type JointList = SmallVec<[JointEdgeId; 2]>;

// ============================================================================
// NodeTable
// ============================================================================

/// Graph nodes by id. A node is defined once and never changes.
#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    nodes: HashMap<NodeId, GraphNode>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a node. Returns `false` (keeping the original) if the id is
    /// already defined.
    pub fn define(&mut self, node: GraphNode) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id, node);
        true
    }

    pub fn get(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// ============================================================================
// EdgeStore
// ============================================================================

/// Simple and joint-owner edges with forward and backward indexes.
#[derive(Debug, Clone, Default)]
pub struct EdgeStore {
    edges: Vec<Edge>,
    joint_edges: Vec<JointEdge>,
    interned: HashMap<Edge, EdgeId>,
    interned_joint: HashMap<JointEdge, JointEdgeId>,

    /// parent → current edges
    outgoing: HashMap<NodeId, EdgeList>,
    /// child → current edges (derived)
    incoming: HashMap<NodeId, EdgeList>,
    /// emitter → current joint edges it reported
    joint_emitted: HashMap<NodeId, JointList>,
    /// current joint edge → number of emitters reporting it
    joint_emitters: HashMap<JointEdgeId, usize>,
    /// owner → current joint edges it participates in
    joint_by_owner: HashMap<NodeId, JointList>,
    /// child → current joint edges (derived)
    joint_incoming: HashMap<NodeId, JointList>,

    /// Heap revision each emitter's current edges were derived from.
    revisions: HashMap<NodeId, u64>,
}

impl EdgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Emission
    // ========================================================================

    /// Retire every current edge reported by `emitter`.
    pub fn retire(&mut self, emitter: NodeId) {
        self.revisions.remove(&emitter);

        if let Some(ids) = self.outgoing.remove(&emitter) {
            for id in ids {
                let child = self.edges[id.0 as usize].child;
                remove_from(&mut self.incoming, child, id);
            }
        }

        if let Some(ids) = self.joint_emitted.remove(&emitter) {
            for id in ids {
                // Another emitter may report the same interned edge.
                match self.joint_emitters.get_mut(&id) {
                    Some(count) if *count > 1 => {
                        *count -= 1;
                        continue;
                    }
                    _ => {
                        self.joint_emitters.remove(&id);
                    }
                }
                let joint = &self.joint_edges[id.0 as usize];
                let child = joint.child;
                for owner in joint.owners.clone() {
                    remove_from(&mut self.joint_by_owner, owner, id);
                }
                remove_from(&mut self.joint_incoming, child, id);
            }
        }
    }

    /// Add a current edge from `edge.parent`.
    pub fn add_edge(&mut self, edge: Edge) -> EdgeId {
        let id = match self.interned.get(&edge) {
            Some(id) => *id,
            None => {
                let id = EdgeId(self.edges.len() as u32);
                self.interned.insert(edge.clone(), id);
                self.edges.push(edge);
                id
            }
        };
        let edge = &self.edges[id.0 as usize];
        let (parent, child) = (edge.parent, edge.child);
        if push_unique(&mut self.outgoing, parent, id) {
            push_unique(&mut self.incoming, child, id);
        }
        id
    }

    /// Add a current joint edge reported by `emitter`.
    pub fn add_joint_edge(&mut self, emitter: NodeId, joint: JointEdge) -> JointEdgeId {
        let id = match self.interned_joint.get(&joint) {
            Some(id) => *id,
            None => {
                let id = JointEdgeId(self.joint_edges.len() as u32);
                self.interned_joint.insert(joint.clone(), id);
                self.joint_edges.push(joint);
                id
            }
        };
        if !push_unique(&mut self.joint_emitted, emitter, id) {
            return id;
        }
        let count = self.joint_emitters.entry(id).or_insert(0);
        *count += 1;
        if *count == 1 {
            let joint = &self.joint_edges[id.0 as usize];
            let child = joint.child;
            for owner in joint.owners.clone() {
                push_unique(&mut self.joint_by_owner, owner, id);
            }
            push_unique(&mut self.joint_incoming, child, id);
        }
        id
    }

    /// Record the heap revision `emitter`'s current edges reflect.
    pub fn mark_revision(&mut self, emitter: NodeId, revision: u64) {
        self.revisions.insert(emitter, revision);
    }

    /// Force every emitter to be re-derived on its next visit.
    pub fn forget_revisions(&mut self) {
        self.revisions.clear();
    }

    /// Revision recorded by `mark_revision`, if the edges are still current.
    pub fn revision_of(&self, emitter: NodeId) -> Option<u64> {
        self.revisions.get(&emitter).copied()
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Any edge ever stored, current or retired.
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.0 as usize)
    }

    /// Any joint edge ever stored, current or retired.
    pub fn joint_edge(&self, id: JointEdgeId) -> Option<&JointEdge> {
        self.joint_edges.get(id.0 as usize)
    }

    /// Current edges out of `parent`.
    pub fn outgoing(&self, parent: NodeId) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.lookup(&self.outgoing, parent)
    }

    /// Current edges into `child`.
    pub fn incoming(&self, child: NodeId) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.lookup(&self.incoming, child)
    }

    /// Current joint edges `owner` participates in.
    pub fn joint_owned_by(&self, owner: NodeId) -> impl Iterator<Item = (JointEdgeId, &JointEdge)> {
        self.lookup_joint(&self.joint_by_owner, owner)
    }

    /// Current joint edges into `child`.
    pub fn joint_into(&self, child: NodeId) -> impl Iterator<Item = (JointEdgeId, &JointEdge)> {
        self.lookup_joint(&self.joint_incoming, child)
    }

    /// Nodes `emitter`'s current edges point at, including joint children.
    pub fn emitted_children(&self, emitter: NodeId) -> Vec<NodeId> {
        let simple = self.outgoing(emitter).map(|(_, e)| e.child);
        let joint = self
            .lookup_joint(&self.joint_emitted, emitter)
            .flat_map(|(_, j)| j.owners.iter().copied().chain(std::iter::once(j.child)));
        simple.chain(joint).filter(|id| *id != emitter).collect()
    }

    /// Every current simple edge.
    pub fn current_edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.outgoing
            .values()
            .flatten()
            .map(|id| (*id, &self.edges[id.0 as usize]))
    }

    /// Every current joint edge, once regardless of how many emitters
    /// report it.
    pub fn current_joint_edges(&self) -> impl Iterator<Item = (JointEdgeId, &JointEdge)> {
        self.joint_emitters
            .keys()
            .map(|id| (*id, &self.joint_edges[id.0 as usize]))
    }

    /// Number of current simple edges.
    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(|ids| ids.len()).sum()
    }

    /// Number of current joint edges.
    pub fn joint_edge_count(&self) -> usize {
        self.joint_emitters.len()
    }

    fn lookup<'a>(
        &'a self,
        index: &'a HashMap<NodeId, EdgeList>,
        node: NodeId,
    ) -> impl Iterator<Item = (EdgeId, &'a Edge)> + 'a {
        index
            .get(&node)
            .into_iter()
            .flatten()
            .map(|id| (*id, &self.edges[id.0 as usize]))
    }

    fn lookup_joint<'a>(
        &'a self,
        index: &'a HashMap<NodeId, JointList>,
        node: NodeId,
    ) -> impl Iterator<Item = (JointEdgeId, &'a JointEdge)> + 'a {
        index
            .get(&node)
            .into_iter()
            .flatten()
            .map(|id| (*id, &self.joint_edges[id.0 as usize]))
    }
}

/// Push `id` under `key` unless already present. Returns whether it was added.
fn push_unique<A>(index: &mut HashMap<NodeId, SmallVec<A>>, key: NodeId, id: A::Item) -> bool
where
    A: smallvec::Array,
    A::Item: PartialEq + Copy,
{
    let list = index.entry(key).or_default();
    if list.contains(&id) {
        return false;
    }
    list.push(id);
    true
}

fn remove_from<A>(index: &mut HashMap<NodeId, SmallVec<A>>, key: NodeId, id: A::Item)
where
    A: smallvec::Array,
    A::Item: PartialEq + Copy,
{
    if let Some(list) = index.get_mut(&key) {
        list.retain(|x| *x != id);
        if list.is_empty() {
            index.remove(&key);
        }
    }
}

//! ReferenceGraph: the serializable proof that a target is reachable.

use serde::{Deserialize, Serialize};
use super::{EdgeContext, GraphNode, NodeId, Strength};

/// One reference in a result graph.
///
/// A joint-owner edge is reported once per owner; `joint_with` lists the
/// other owners whose liveness was also required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceEdge {
    pub parent: NodeId,
    pub child: NodeId,
    pub strength: Strength,
    pub context: EdgeContext,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joint_with: Vec<NodeId>,
}

impl ReferenceEdge {
    pub fn is_joint(&self) -> bool {
        !self.joint_with.is_empty()
    }
}

/// Result of a successful search: the nodes and edges that justify why the
/// target is alive. Edges reference nodes by id only, so the structure
/// serializes without cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceGraph {
    /// Sorted by id.
    pub nodes: Vec<GraphNode>,
    /// Sorted by (parent, child).
    pub parent_to_child_edges: Vec<ReferenceEdge>,
    /// Same edges, sorted by (child, parent).
    pub child_to_parent_edges: Vec<ReferenceEdge>,
    pub succeeded: bool,
}

impl ReferenceGraph {
    /// Build a graph from collected parts, deriving the child → parent view.
    pub fn from_parts(mut nodes: Vec<GraphNode>, mut edges: Vec<ReferenceEdge>) -> Self {
        nodes.sort_by_key(|n| n.id);
        nodes.dedup_by_key(|n| n.id);
        edges.sort_by_key(|e| (e.parent, e.child));

        let mut by_child = edges.clone();
        by_child.sort_by_key(|e| (e.child, e.parent));

        Self {
            nodes,
            parent_to_child_edges: edges,
            child_to_parent_edges: by_child,
            succeeded: true,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes
            .binary_search_by_key(&id, |n| n.id)
            .ok()
            .map(|idx| &self.nodes[idx])
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// All edges from `parent` to `child`.
    pub fn edges_between(&self, parent: NodeId, child: NodeId) -> impl Iterator<Item = &ReferenceEdge> {
        self.parent_to_child_edges
            .iter()
            .filter(move |e| e.parent == parent && e.child == child)
    }

    pub fn has_edge(&self, parent: NodeId, child: NodeId) -> bool {
        self.edges_between(parent, child).next().is_some()
    }

    /// Edges pointing at `child`.
    pub fn parents_of(&self, child: NodeId) -> impl Iterator<Item = &ReferenceEdge> {
        self.child_to_parent_edges.iter().filter(move |e| e.child == child)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

//! Result assembly: turn an alive-set into the graph that proves the
//! target is alive.

use hashbrown::HashSet;

use crate::graph::{EdgeStore, NodeTable};
use crate::model::{NodeId, ReferenceEdge, ReferenceGraph};
use crate::resolve::{AliveSet, Justification};
use crate::{Error, Result};

/// `None` when `target` is not alive. Otherwise the nodes and edges on the
/// justification chains from `target` back to the roots.
///
/// Each alive node contributes exactly the edge that first made it alive,
/// so the result is a minimal proof. A joint edge contributes one
/// `ReferenceEdge` per owner.
pub fn assemble(
    target: NodeId,
    alive: &AliveSet,
    nodes: &NodeTable,
    edges: &EdgeStore,
) -> Result<Option<ReferenceGraph>> {
    if !alive.contains(target) {
        return Ok(None);
    }

    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut stack = vec![target];
    let mut graph_nodes = Vec::new();
    let mut graph_edges = Vec::new();

    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let node = nodes.get(id).ok_or(Error::UnknownNode(id))?;
        graph_nodes.push(node.clone());

        let why = alive
            .justification(id)
            .ok_or_else(|| Error::Internal(format!("{id} is on a proof path but not alive")))?;
        match why {
            Justification::Root => {}
            Justification::Edge(edge_id) => {
                let edge = edges
                    .edge(edge_id)
                    .ok_or_else(|| Error::Internal(format!("no edge {}", edge_id.0)))?;
                graph_edges.push(ReferenceEdge {
                    parent: edge.parent,
                    child: edge.child,
                    strength: edge.strength,
                    context: edge.context.clone(),
                    joint_with: Vec::new(),
                });
                stack.push(edge.parent);
            }
            Justification::Joint(joint_id) => {
                let joint = edges
                    .joint_edge(joint_id)
                    .ok_or_else(|| Error::Internal(format!("no joint edge {}", joint_id.0)))?;
                for owner in &joint.owners {
                    graph_edges.push(ReferenceEdge {
                        parent: *owner,
                        child: joint.child,
                        strength: joint.strength,
                        context: joint.context.clone(),
                        joint_with: joint.owners.iter().copied().filter(|o| o != owner).collect(),
                    });
                    stack.push(*owner);
                }
            }
        }
    }

    Ok(Some(ReferenceGraph::from_parts(graph_nodes, graph_edges)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CollectionRole, Edge, EdgeContext, GraphNode, JointEdge, Strength};
    use crate::resolve::resolve;
    use pretty_assertions::assert_eq;

    fn table(ids: &[u64]) -> NodeTable {
        let mut nodes = NodeTable::new();
        for id in ids {
            nodes.define(GraphNode::new(NodeId(*id)).with_built_in_kind("Object"));
        }
        nodes
    }

    fn prop(parent: u64, child: u64, name: &str) -> Edge {
        Edge::new(NodeId(parent), NodeId(child), Strength::Strong, EdgeContext::PropertyName(name.into()))
    }

    #[test]
    fn test_unreachable_target_is_none() {
        let nodes = table(&[1, 2]);
        let store = EdgeStore::new();
        let alive = resolve(&store, &[NodeId(1)], true);
        assert_eq!(assemble(NodeId(2), &alive, &nodes, &store).unwrap(), None);
    }

    #[test]
    fn test_root_target_is_a_single_node() {
        let nodes = table(&[1]);
        let store = EdgeStore::new();
        let alive = resolve(&store, &[NodeId(1)], true);
        let graph = assemble(NodeId(1), &alive, &nodes, &store).unwrap().unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.parent_to_child_edges.is_empty());
        assert!(graph.succeeded);
    }

    #[test]
    fn test_minimal_path_only() {
        // 1 → 2 → 3 and a dead-end branch 1 → 4.
        let nodes = table(&[1, 2, 3, 4]);
        let mut store = EdgeStore::new();
        store.add_edge(prop(1, 2, "a"));
        store.add_edge(prop(2, 3, "b"));
        store.add_edge(prop(1, 4, "c"));

        let alive = resolve(&store, &[NodeId(1)], true);
        let graph = assemble(NodeId(3), &alive, &nodes, &store).unwrap().unwrap();

        let ids: Vec<_> = graph.nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![NodeId(1), NodeId(2), NodeId(3)]);
        let pairs: Vec<_> = graph.parent_to_child_edges.iter().map(|e| (e.parent, e.child)).collect();
        assert_eq!(pairs, vec![(NodeId(1), NodeId(2)), (NodeId(2), NodeId(3))]);
        let reversed: Vec<_> = graph.child_to_parent_edges.iter().map(|e| (e.child, e.parent)).collect();
        assert_eq!(reversed, vec![(NodeId(2), NodeId(1)), (NodeId(3), NodeId(2))]);
    }

    #[test]
    fn test_joint_edge_reports_every_owner() {
        let nodes = table(&[1, 2, 3]);
        let mut store = EdgeStore::new();
        let joint = JointEdge::new(
            [NodeId(1), NodeId(2)],
            NodeId(3),
            Strength::Strong,
            EdgeContext::CollectionPseudo(CollectionRole::EntryValue),
        )
        .unwrap();
        store.add_joint_edge(NodeId(1), joint);

        let alive = resolve(&store, &[NodeId(1), NodeId(2)], true);
        let graph = assemble(NodeId(3), &alive, &nodes, &store).unwrap().unwrap();

        let edges: Vec<_> = graph
            .parent_to_child_edges
            .iter()
            .map(|e| (e.parent, e.child, e.joint_with.clone()))
            .collect();
        assert_eq!(
            edges,
            vec![
                (NodeId(1), NodeId(3), vec![NodeId(2)]),
                (NodeId(2), NodeId(3), vec![NodeId(1)]),
            ]
        );
    }

    #[test]
    fn test_undefined_node_is_an_error() {
        let nodes = table(&[1]);
        let mut store = EdgeStore::new();
        store.add_edge(prop(1, 2, "x"));
        let alive = resolve(&store, &[NodeId(1)], true);
        assert!(matches!(
            assemble(NodeId(2), &alive, &nodes, &store),
            Err(Error::UnknownNode(NodeId(2)))
        ));
    }
}

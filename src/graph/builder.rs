//! Worklist graph builder.
//!
//! Traversal uses an explicit queue and a visited set, never recursion, so
//! depth and cycles in the inspected heap cost nothing on the call stack.

use std::collections::VecDeque;

use hashbrown::HashSet;

use crate::classify::{ClassifierRegistry, EdgeSink};
use crate::config::TraversalOrder;
use crate::heap::{HeapRef, HeapView, Value};
use crate::model::{CollectionRole, Edge, EdgeContext, GraphNode, JointEdge, NodeId, Strength};
use crate::{Error, Result};
use super::GraphState;

/// What one build did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Root ids, deduplicated, excluded roots omitted.
    pub roots: Vec<NodeId>,
    /// Nodes popped from the worklist.
    pub visited: usize,
    /// Nodes whose edges were (re-)derived by a classifier.
    pub classified: usize,
    /// Nodes whose edges were reused from an earlier query.
    pub reused: usize,
    /// Objects with no applicable classifier.
    pub opaque: usize,
}

/// Discovers the graph reachable (strongly, weakly or jointly) from a root
/// set and records it in a `GraphState`.
pub struct GraphBuilder<'a> {
    heap: &'a dyn HeapView,
    classifiers: &'a ClassifierRegistry,
    excluded: &'a HashSet<HeapRef>,
    order: TraversalOrder,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        heap: &'a dyn HeapView,
        classifiers: &'a ClassifierRegistry,
        excluded: &'a HashSet<HeapRef>,
    ) -> Self {
        Self {
            heap,
            classifiers,
            excluded,
            order: TraversalOrder::default(),
        }
    }

    pub fn with_order(mut self, order: TraversalOrder) -> Self {
        self.order = order;
        self
    }

    /// Traverse from `roots`, classifying every value reached.
    pub fn build(&self, state: &mut GraphState, roots: &[HeapRef]) -> Result<BuildReport> {
        let mut report = BuildReport::default();
        let mut worklist: VecDeque<NodeId> = VecDeque::new();
        let mut visited: HashSet<NodeId> = HashSet::new();

        for root in roots {
            if self.excluded.contains(root) {
                continue;
            }
            let id = define_node(self.heap, state, *root)?;
            if visited.insert(id) {
                report.roots.push(id);
                worklist.push_back(id);
            }
        }

        loop {
            let next = match self.order {
                TraversalOrder::BreadthFirst => worklist.pop_front(),
                TraversalOrder::DepthFirst => worklist.pop_back(),
            };
            let Some(id) = next else { break };
            report.visited += 1;

            for child in self.visit(state, id, &mut report)? {
                if visited.insert(child) {
                    worklist.push_back(child);
                }
            }
        }

        Ok(report)
    }

    /// Derive (or reuse) `id`'s edges. Returns the nodes they lead to.
    fn visit(&self, state: &mut GraphState, id: NodeId, report: &mut BuildReport) -> Result<Vec<NodeId>> {
        let value = state.registry.value_of(id).ok_or(Error::UnknownNode(id))?;
        // Symbols hold nothing.
        let HeapRef::Object(obj) = value else {
            return Ok(Vec::new());
        };
        let object = self.heap.object(obj).ok_or(Error::UnknownValue(value))?;

        let Some(classifier) = self.classifiers.classifier_for(object) else {
            tracing::trace!(node = %id, kind = object.internals.built_in_name(), "opaque");
            state.edges.retire(id);
            report.opaque += 1;
            return Ok(Vec::new());
        };

        let revision = self.heap.revision(obj);
        if !classifier.is_volatile() && revision.is_some() && state.edges.revision_of(id) == revision {
            report.reused += 1;
            return Ok(state.edges.emitted_children(id));
        }

        tracing::trace!(node = %id, tag = ?classifier.tag(), "classify");
        state.edges.retire(id);
        let mut sink = BuilderSink {
            heap: self.heap,
            state: &mut *state,
            excluded: self.excluded,
            parent: id,
            discovered: Vec::new(),
        };
        classifier.emit_edges(self.heap, object, &mut sink)?;
        let discovered = sink.discovered;

        if let Some(revision) = revision {
            state.edges.mark_revision(id, revision);
        }
        report.classified += 1;
        Ok(discovered)
    }
}

/// Registered id for `value`, defining its graph node on first sight.
/// Dangling handles are rejected before an id is allocated.
pub(crate) fn define_node(heap: &dyn HeapView, state: &mut GraphState, value: HeapRef) -> Result<NodeId> {
    if let Some(id) = state.registry.key_for_existing(value) {
        return Ok(id);
    }
    let (built_in, derived) = match value {
        HeapRef::Object(obj) => {
            let object = heap.object(obj).ok_or(Error::UnknownValue(value))?;
            (object.internals.built_in_name().to_string(), object.class_name.clone())
        }
        HeapRef::Symbol(sym) => {
            heap.symbol(sym).ok_or(Error::UnknownValue(value))?;
            ("Symbol".to_string(), None)
        }
    };

    let id = state.registry.id_for(value);
    let mut node = GraphNode::new(id).with_built_in_kind(built_in);
    if let Some(name) = derived {
        node = node.with_derived_name(name);
    }
    state.nodes.define(node);
    Ok(id)
}

// ============================================================================
// BuilderSink
// ============================================================================

/// `EdgeSink` that registers children and records edges from `parent`.
struct BuilderSink<'s> {
    heap: &'s dyn HeapView,
    state: &'s mut GraphState,
    excluded: &'s HashSet<HeapRef>,
    parent: NodeId,
    discovered: Vec<NodeId>,
}

impl BuilderSink<'_> {
    fn node_for(&mut self, value: &Value) -> Result<Option<NodeId>> {
        let Some(value) = value.as_heap_ref() else {
            return Ok(None);
        };
        if self.excluded.contains(&value) {
            return Ok(None);
        }
        let id = define_node(self.heap, self.state, value)?;
        self.discovered.push(id);
        Ok(Some(id))
    }
}

impl EdgeSink for BuilderSink<'_> {
    fn add_edge(&mut self, child: &Value, strength: Strength, context: EdgeContext) -> Result<Option<NodeId>> {
        let Some(child) = self.node_for(child)? else {
            return Ok(None);
        };
        self.state.edges.add_edge(Edge::new(self.parent, child, strength, context));
        Ok(Some(child))
    }

    fn add_collection_key_and_value(
        &mut self,
        key: &Value,
        key_is_strong: bool,
        value: Option<&Value>,
    ) -> Result<()> {
        let key_role = if value.is_some() { CollectionRole::MapKey } else { CollectionRole::SetElement };
        let key_id = self.add_edge(
            key,
            Strength::from_strong(key_is_strong),
            EdgeContext::CollectionPseudo(key_role),
        )?;
        let Some(value) = value else {
            return Ok(());
        };

        // A strong collection holds the value itself; the joint edge below
        // then only records which key it belongs to.
        let value_id = if key_is_strong {
            self.add_edge(value, Strength::Strong, EdgeContext::CollectionPseudo(CollectionRole::MapValue))?
        } else {
            self.node_for(value)?
        };

        if let (Some(key_id), Some(value_id)) = (key_id, value_id) {
            let joint = JointEdge::new(
                [self.parent, key_id],
                value_id,
                Strength::Strong,
                EdgeContext::CollectionPseudo(CollectionRole::EntryValue),
            );
            if let Some(joint) = joint {
                self.state.edges.add_joint_edge(self.parent, joint);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::Heap;

    fn build(heap: &Heap, roots: &[HeapRef]) -> (GraphState, BuildReport) {
        build_excluding(heap, roots, &HashSet::new())
    }

    fn build_excluding(heap: &Heap, roots: &[HeapRef], excluded: &HashSet<HeapRef>) -> (GraphState, BuildReport) {
        let classifiers = ClassifierRegistry::with_defaults(&SessionConfig::default());
        let mut state = GraphState::new();
        let report = GraphBuilder::new(heap, &classifiers, excluded).build(&mut state, roots).unwrap();
        (state, report)
    }

    #[test]
    fn test_cycle_terminates() {
        let mut heap = Heap::new();
        let a = heap.create_object();
        let b = heap.create_object();
        heap.set_property(a, "b", b).unwrap();
        heap.set_property(b, "a", a).unwrap();

        let (state, report) = build(&heap, &[a.into()]);
        assert_eq!(report.visited, 2);
        assert_eq!(state.edges.edge_count(), 2);
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let mut heap = Heap::new();
        let head = heap.create_object();
        let mut tail = head;
        for _ in 0..50_000 {
            let next = heap.create_object();
            heap.set_property(tail, "next", next).unwrap();
            tail = next;
        }

        let (state, report) = build(&heap, &[head.into()]);
        assert_eq!(report.visited, 50_001);
        assert!(state.registry.has_id(tail.into()));
    }

    #[test]
    fn test_excluded_values_get_no_id() {
        let mut heap = Heap::new();
        let root = heap.create_object();
        let global = heap.create_object();
        let behind = heap.create_object();
        heap.set_property(root, "global", global).unwrap();
        heap.set_property(global, "behind", behind).unwrap();

        let excluded: HashSet<HeapRef> = [HeapRef::from(global)].into_iter().collect();
        let (state, report) = build_excluding(&heap, &[root.into()], &excluded);
        assert_eq!(report.visited, 1);
        assert!(!state.registry.has_id(global.into()));
        assert!(!state.registry.has_id(behind.into()));
        assert_eq!(state.edges.edge_count(), 0);
    }

    #[test]
    fn test_weak_map_entry_becomes_joint_edge() {
        let mut heap = Heap::new();
        let map = heap.create_weak_map();
        let key = heap.create_object();
        let value = heap.create_object();
        heap.weak_map_set(map, key, value).unwrap();

        let (state, _) = build(&heap, &[map.into()]);
        let map_id = state.registry.key_for_existing(map.into()).unwrap();
        let key_id = state.registry.key_for_existing(key.into()).unwrap();
        let value_id = state.registry.key_for_existing(value.into()).unwrap();

        let out: Vec<_> = state.edges.outgoing(map_id).map(|(_, e)| (e.child, e.strength)).collect();
        assert_eq!(out, vec![(key_id, Strength::Weak)]);
        let joints: Vec<_> = state.edges.joint_into(value_id).map(|(_, j)| j.owners.to_vec()).collect();
        let mut owners = vec![map_id, key_id];
        owners.sort();
        assert_eq!(joints, vec![owners]);
    }

    #[test]
    fn test_nodes_carry_kind_metadata() {
        let mut heap = Heap::new();
        let instance = heap.create_instance("Widget");
        let sym = heap.create_symbol(Some("id"));
        heap.set_property(instance, sym, 1).unwrap();

        let (state, _) = build(&heap, &[instance.into()]);
        let node = state.nodes.get(state.registry.key_for_existing(instance.into()).unwrap()).unwrap();
        assert_eq!(node.built_in_kind.as_deref(), Some("Object"));
        assert_eq!(node.derived_name.as_deref(), Some("Widget"));

        let sym_node = state.nodes.get(state.registry.key_for_existing(sym.into()).unwrap()).unwrap();
        assert_eq!(sym_node.built_in_kind.as_deref(), Some("Symbol"));
    }

    #[test]
    fn test_rebuild_reuses_unchanged_nodes() {
        let mut heap = Heap::new();
        let root = heap.create_object();
        let child = heap.create_object();
        heap.set_property(root, "child", child).unwrap();

        let classifiers = ClassifierRegistry::with_defaults(&SessionConfig::default());
        let excluded = HashSet::new();
        let mut state = GraphState::new();
        let first = GraphBuilder::new(&heap, &classifiers, &excluded).build(&mut state, &[root.into()]).unwrap();
        let second = GraphBuilder::new(&heap, &classifiers, &excluded).build(&mut state, &[root.into()]).unwrap();

        assert_eq!(first.classified, 2);
        assert_eq!(second.classified, 0);
        assert_eq!(second.reused, 2);
        assert_eq!(state.edges.edge_count(), 1);
    }

    #[test]
    fn test_rebuild_rederives_mutated_nodes() {
        let mut heap = Heap::new();
        let root = heap.create_object();
        let child = heap.create_object();
        heap.set_property(root, "child", child).unwrap();

        let classifiers = ClassifierRegistry::with_defaults(&SessionConfig::default());
        let excluded = HashSet::new();
        let mut state = GraphState::new();
        GraphBuilder::new(&heap, &classifiers, &excluded).build(&mut state, &[root.into()]).unwrap();

        heap.delete_property(root, "child").unwrap();
        let report = GraphBuilder::new(&heap, &classifiers, &excluded).build(&mut state, &[root.into()]).unwrap();
        assert_eq!(report.visited, 1);
        assert_eq!(state.edges.edge_count(), 0);
    }

    #[test]
    fn test_dangling_root_is_rejected() {
        let heap = Heap::new();
        let classifiers = ClassifierRegistry::with_defaults(&SessionConfig::default());
        let excluded = HashSet::new();
        let mut state = GraphState::new();
        let result = GraphBuilder::new(&heap, &classifiers, &excluded)
            .build(&mut state, &[HeapRef::Object(crate::ObjectRef(5))]);
        assert!(matches!(result, Err(Error::UnknownValue(_))));
        assert!(state.registry.is_empty());
    }
}

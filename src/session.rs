//! # Search Session
//!
//! The caller-facing entry point. A session owns the heap view, the
//! classifier registry and the graph discovered so far; every named query
//! runs Build → Resolve → Assemble over that shared state.
//!
//! ```text
//! search(key, target, held, strong_only)
//!   │  validate (errors returned to the caller)
//!   ├─ drain heap jobs
//!   ├─ GraphBuilder::build(held ∪ anchors)
//!   ├─ resolve()
//!   └─ assemble() ─▶ results[key]
//!          (internal errors: error trap, results[key] = None)
//! ```

use hashbrown::{HashMap, HashSet};

use crate::assemble::assemble;
use crate::classify::ClassifierRegistry;
use crate::config::SessionConfig;
use crate::graph::{GraphBuilder, GraphState};
use crate::heap::{HeapRef, HeapView, Value};
use crate::model::{GraphNode, NodeId, ReferenceGraph};
use crate::resolve::resolve;
use crate::{Error, Result};

/// Callback receiving internal errors, with the results key of the query
/// that raised them.
pub type ErrorTrap = Box<dyn FnMut(&str, &Error)>;

/// A sequence of named reachability queries over one heap.
pub struct SearchSession<H: HeapView> {
    heap: H,
    config: SessionConfig,
    classifiers: ClassifierRegistry,
    state: GraphState,
    excluded: HashSet<HeapRef>,
    anchors: Vec<HeapRef>,
    /// In query order.
    results: Vec<(String, Option<ReferenceGraph>)>,
    result_index: HashMap<String, usize>,
    error_trap: Option<ErrorTrap>,
}

impl<H: HeapView> SearchSession<H> {
    /// Session with default configuration.
    pub fn new(heap: H) -> Self {
        Self::with_config(heap, SessionConfig::default())
    }

    /// Session with the built-in classifiers, configured from `config`.
    pub fn with_config(heap: H, config: SessionConfig) -> Self {
        let classifiers = ClassifierRegistry::with_defaults(&config);
        Self::with_classifiers(heap, config, classifiers)
    }

    /// Session with a caller-assembled classifier registry.
    pub fn with_classifiers(heap: H, config: SessionConfig, classifiers: ClassifierRegistry) -> Self {
        Self {
            heap,
            config,
            classifiers,
            state: GraphState::new(),
            excluded: HashSet::new(),
            anchors: Vec::new(),
            results: Vec::new(),
            result_index: HashMap::new(),
            error_trap: None,
        }
    }

    pub fn heap(&self) -> &H {
        &self.heap
    }

    /// Mutable heap access between queries. Changes are picked up by the
    /// next search.
    pub fn heap_mut(&mut self) -> &mut H {
        &mut self.heap
    }

    pub fn into_heap(self) -> H {
        self.heap
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ========================================================================
    // Setup
    // ========================================================================

    /// Never traverse `value`, never give it an id, and report it as not
    /// found when it is a target.
    pub fn exclude(&mut self, value: impl Into<HeapRef>) -> Result<()> {
        let value = self.live(value.into())?;
        if self.excluded.insert(value) && self.state.registry.has_id(value) {
            // Edges already recorded may lead into it.
            self.state.edges.forget_revisions();
        }
        Ok(())
    }

    /// Treat `value` as held by every subsequent query.
    pub fn add_anchor(&mut self, value: impl Into<HeapRef>) -> Result<()> {
        let value = self.live(value.into())?;
        if !self.anchors.contains(&value) {
            self.anchors.push(value);
        }
        Ok(())
    }

    /// Receive internal errors instead of only logging them.
    pub fn set_error_trap(&mut self, trap: impl FnMut(&str, &Error) + 'static) {
        self.error_trap = Some(Box::new(trap));
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Is `target` reachable from `held_values` (plus anchors)? The outcome
    /// is recorded under `results_key`.
    ///
    /// Argument problems are returned as errors and record nothing. Errors
    /// while analysing the heap go to the error trap and record `None`.
    pub fn search(
        &mut self,
        results_key: &str,
        target: &Value,
        held_values: &[Value],
        strong_references_only: bool,
    ) -> Result<()> {
        if results_key.is_empty() {
            return Err(Error::EmptyResultsKey);
        }
        if self.result_index.contains_key(results_key) {
            return Err(Error::DuplicateResultsKey(results_key.to_string()));
        }
        let target = target
            .as_heap_ref()
            .ok_or(Error::InvalidTarget { got: target.type_name() })?;
        let held = held_values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                value
                    .as_heap_ref()
                    .ok_or(Error::InvalidHeldValue { index, got: value.type_name() })
            })
            .collect::<Result<Vec<_>>>()?;
        self.live(target)?;
        for value in &held {
            self.live(*value)?;
        }

        let outcome = match self.run_query(results_key, target, &held, strong_references_only) {
            Ok(graph) => graph,
            Err(err) => {
                tracing::warn!(key = results_key, error = %err, "query failed; recording not found");
                if let Some(trap) = self.error_trap.as_mut() {
                    trap(results_key, &err);
                }
                None
            }
        };

        self.result_index.insert(results_key.to_string(), self.results.len());
        self.results.push((results_key.to_string(), outcome));
        Ok(())
    }

    fn run_query(
        &mut self,
        key: &str,
        target: HeapRef,
        held: &[HeapRef],
        strong_only: bool,
    ) -> Result<Option<ReferenceGraph>> {
        if self.config.drain_jobs {
            let ran = self.heap.drain_jobs()?;
            if ran > 0 {
                tracing::debug!(key, ran, "drained pending jobs");
            }
        }

        if self.excluded.contains(&target) {
            tracing::debug!(key, %target, "target is excluded");
            return Ok(None);
        }

        let mut roots: Vec<HeapRef> = Vec::with_capacity(held.len() + self.anchors.len());
        for root in held.iter().chain(&self.anchors) {
            if !self.excluded.contains(root) && !roots.contains(root) {
                roots.push(*root);
            }
        }

        let report = GraphBuilder::new(&self.heap, &self.classifiers, &self.excluded)
            .with_order(self.config.traversal)
            .build(&mut self.state, &roots)?;

        let Some(target_id) = self.state.registry.key_for_existing(target) else {
            tracing::debug!(key, %target, visited = report.visited, "target never discovered");
            return Ok(None);
        };

        let alive = resolve(&self.state.edges, &report.roots, strong_only);
        let graph = assemble(target_id, &alive, &self.state.nodes, &self.state.edges)?;

        tracing::debug!(
            key,
            roots = report.roots.len(),
            strong_only,
            visited = report.visited,
            classified = report.classified,
            reused = report.reused,
            alive = alive.len(),
            found = graph.is_some(),
            "query complete"
        );
        Ok(graph)
    }

    fn live(&self, value: HeapRef) -> Result<HeapRef> {
        if self.heap.contains(value) {
            Ok(value)
        } else {
            Err(Error::UnknownValue(value))
        }
    }

    // ========================================================================
    // Results
    // ========================================================================

    /// Every recorded outcome, in query order.
    pub fn results(&self) -> impl Iterator<Item = (&str, Option<&ReferenceGraph>)> {
        self.results.iter().map(|(key, graph)| (key.as_str(), graph.as_ref()))
    }

    /// `None` if no query used `key`; `Some(None)` if its target was not
    /// found.
    pub fn result(&self, key: &str) -> Option<Option<&ReferenceGraph>> {
        let index = *self.result_index.get(key)?;
        self.results.get(index).map(|(_, graph)| graph.as_ref())
    }

    /// `{ key: graph | null }` for every recorded query.
    pub fn results_to_json(&self) -> Result<String> {
        let mut map = serde_json::Map::new();
        for (key, graph) in &self.results {
            map.insert(key.clone(), serde_json::to_value(graph)?);
        }
        Ok(serde_json::to_string(&serde_json::Value::Object(map))?)
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Id assigned to `value`, if any query has discovered it and it is
    /// not excluded.
    pub fn key_for(&self, value: impl Into<HeapRef>) -> Option<NodeId> {
        let value = value.into();
        if self.excluded.contains(&value) {
            return None;
        }
        self.state.registry.key_for_existing(value)
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.state.nodes.get(id)
    }

    /// Values discovered so far.
    pub fn node_count(&self) -> usize {
        self.state.nodes.len()
    }

    /// Current simple plus joint edges.
    pub fn edge_count(&self) -> usize {
        self.state.edges.edge_count() + self.state.edges.joint_edge_count()
    }
}

impl<H: HeapView + std::fmt::Debug> std::fmt::Debug for SearchSession<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchSession")
            .field("heap", &self.heap)
            .field("config", &self.config)
            .field("nodes", &self.node_count())
            .field("edges", &self.edge_count())
            .field("results", &self.results.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Classifier, EdgeSink};
    use crate::heap::{ConstructTag, HeapObject, IterationKind, ObjectRef, SymbolRef};
    use crate::Heap;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn found(session: &SearchSession<Heap>, key: &str) -> bool {
        session.result(key).expect("query recorded").is_some()
    }

    #[test]
    fn test_validation_errors() {
        let mut heap = Heap::new();
        let obj = heap.create_object();
        let mut session = SearchSession::new(heap);

        assert!(matches!(session.search("", &obj.into(), &[], true), Err(Error::EmptyResultsKey)));
        assert!(matches!(
            session.search("k", &Value::Null, &[], true),
            Err(Error::InvalidTarget { got: "null" })
        ));
        assert!(matches!(
            session.search("k", &obj.into(), &[obj.into(), Value::from(3)], true),
            Err(Error::InvalidHeldValue { index: 1, .. })
        ));
        assert!(matches!(
            session.search("k", &Value::Object(ObjectRef(99)), &[], true),
            Err(Error::UnknownValue(_))
        ));
        assert!(matches!(
            session.search("k", &obj.into(), &[Value::Symbol(SymbolRef(4))], true),
            Err(Error::UnknownValue(_))
        ));
        // Nothing was recorded, so the key is still free.
        session.search("k", &obj.into(), &[], true).unwrap();
        assert!(session.result("k").is_some());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut heap = Heap::new();
        let obj = heap.create_object();
        let mut session = SearchSession::new(heap);

        session.search("k", &obj.into(), &[obj.into()], true).unwrap();
        let err = session.search("k", &obj.into(), &[obj.into()], true).unwrap_err();
        assert!(matches!(err, Error::DuplicateResultsKey(ref k) if k == "k"));
        assert!(err.is_validation());
        assert_eq!(session.results().count(), 1);
    }

    #[test]
    fn test_unknown_key_is_none() {
        let session = SearchSession::new(Heap::new());
        assert!(session.result("never").is_none());
    }

    #[test]
    fn test_anchor_joins_every_query() {
        let mut heap = Heap::new();
        let global = heap.create_object();
        let target = heap.create_object();
        heap.set_property(global, "t", target).unwrap();
        let mut session = SearchSession::new(heap);

        session.search("before", &target.into(), &[], true).unwrap();
        session.add_anchor(global).unwrap();
        session.search("after", &target.into(), &[], true).unwrap();

        assert!(!found(&session, "before"));
        assert!(found(&session, "after"));
    }

    #[test]
    fn test_excluded_target_is_not_found() {
        let mut heap = Heap::new();
        let root = heap.create_object();
        let target = heap.create_object();
        heap.set_property(root, "t", target).unwrap();
        let mut session = SearchSession::new(heap);
        session.exclude(target).unwrap();

        session.search("k", &target.into(), &[root.into()], true).unwrap();
        assert!(!found(&session, "k"));
        assert_eq!(session.key_for(target), None);
    }

    #[test]
    fn test_exclusion_after_discovery_cuts_paths() {
        let mut heap = Heap::new();
        let root = heap.create_object();
        let middle = heap.create_object();
        let target = heap.create_object();
        heap.set_property(root, "m", middle).unwrap();
        heap.set_property(middle, "t", target).unwrap();
        let mut session = SearchSession::new(heap);

        session.search("first", &target.into(), &[root.into()], true).unwrap();
        session.exclude(middle).unwrap();
        session.search("second", &target.into(), &[root.into()], true).unwrap();

        assert!(found(&session, "first"));
        assert!(!found(&session, "second"));
        assert_eq!(session.key_for(middle), None);
        assert!(session.key_for(target).is_some());
    }

    #[test]
    fn test_heap_changes_between_queries() {
        let mut heap = Heap::new();
        let root = heap.create_object();
        let target = heap.create_object();
        heap.set_property(root, "t", target).unwrap();
        let mut session = SearchSession::new(heap);

        session.search("attached", &target.into(), &[root.into()], true).unwrap();
        session.heap_mut().delete_property(root, "t").unwrap();
        session.search("detached", &target.into(), &[root.into()], true).unwrap();

        assert!(found(&session, "attached"));
        assert!(!found(&session, "detached"));
    }

    #[test]
    fn test_ids_persist_across_queries() {
        let mut heap = Heap::new();
        let root = heap.create_object();
        let target = heap.create_object();
        heap.set_property(root, "t", target).unwrap();
        let mut session = SearchSession::new(heap);

        session.search("one", &target.into(), &[root.into()], true).unwrap();
        let id = session.key_for(target).unwrap();
        let nodes = session.node_count();
        session.search("two", &target.into(), &[root.into()], false).unwrap();

        assert_eq!(session.key_for(target), Some(id));
        assert_eq!(session.node_count(), nodes);
        let graph = session.result("two").unwrap().unwrap();
        assert!(graph.contains_node(id));
    }

    #[test]
    fn test_iterator_sees_source_growth() {
        let mut heap = Heap::new();
        let array = heap.create_array(Vec::new()).unwrap();
        let it = heap.create_iterator(array, IterationKind::Values).unwrap();
        let late = heap.create_object();
        let mut session = SearchSession::new(heap);

        session.search("empty", &late.into(), &[it.into()], true).unwrap();
        session.heap_mut().array_push(array, late).unwrap();
        session.search("grown", &late.into(), &[it.into()], true).unwrap();

        assert!(!found(&session, "empty"));
        assert!(found(&session, "grown"));
    }

    #[test]
    fn test_pending_jobs_run_before_build() {
        let mut heap = Heap::new();
        let root = heap.create_object();
        let target = heap.create_object();
        heap.queue_job(move |heap| heap.set_property(root, "late", target));
        let mut session = SearchSession::new(heap);

        session.search("k", &target.into(), &[root.into()], true).unwrap();
        assert!(found(&session, "k"));
        assert_eq!(session.heap().pending_jobs(), 0);
    }

    #[test]
    fn test_drain_can_be_disabled() {
        let mut heap = Heap::new();
        let root = heap.create_object();
        let target = heap.create_object();
        heap.queue_job(move |heap| heap.set_property(root, "late", target));
        let config = SessionConfig { drain_jobs: false, ..SessionConfig::default() };
        let mut session = SearchSession::with_config(heap, config);

        session.search("k", &target.into(), &[root.into()], true).unwrap();
        assert!(!found(&session, "k"));
        assert_eq!(session.heap().pending_jobs(), 1);
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn tag(&self) -> ConstructTag {
            ConstructTag::Ordinary
        }

        fn emit_edges(&self, _: &dyn HeapView, _: &HeapObject, _: &mut dyn EdgeSink) -> Result<()> {
            Err(Error::Classification("cannot read internals".into()))
        }
    }

    #[test]
    fn test_internal_error_goes_to_trap() {
        let mut heap = Heap::new();
        let root = heap.create_object();
        let map = heap.create_map();
        let mut classifiers = ClassifierRegistry::with_defaults(&SessionConfig::default());
        classifiers.register(Box::new(FailingClassifier));
        let mut session = SearchSession::with_classifiers(heap, SessionConfig::default(), classifiers);

        let trapped: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = Rc::clone(&trapped);
        session.set_error_trap(move |key, err| sink.borrow_mut().push(format!("{key}: {err}")));

        session.search("broken", &root.into(), &[root.into()], true).unwrap();
        session.search("fine", &map.into(), &[map.into()], true).unwrap();

        assert!(!found(&session, "broken"));
        assert!(found(&session, "fine"));
        assert_eq!(
            *trapped.borrow(),
            vec!["broken: Classification error: cannot read internals".to_string()]
        );
    }

    #[test]
    fn test_failing_job_is_internal() {
        let mut heap = Heap::new();
        let obj = heap.create_object();
        heap.queue_job(|_| Err(Error::HeapError("job threw".into())));
        let mut session = SearchSession::new(heap);

        session.search("k", &obj.into(), &[obj.into()], true).unwrap();
        assert!(!found(&session, "k"));
    }

    #[test]
    fn test_results_to_json() {
        let mut heap = Heap::new();
        let root = heap.create_object();
        let lost = heap.create_object();
        let mut session = SearchSession::new(heap);

        session.search("root", &root.into(), &[root.into()], true).unwrap();
        session.search("lost", &lost.into(), &[root.into()], true).unwrap();

        let json: serde_json::Value = serde_json::from_str(&session.results_to_json().unwrap()).unwrap();
        assert!(json["lost"].is_null());
        assert_eq!(json["root"]["succeeded"], serde_json::Value::Bool(true));
        assert_eq!(json["root"]["nodes"].as_array().map(Vec::len), Some(1));
    }
}

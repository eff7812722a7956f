//! # Construct Classifiers
//!
//! One `Classifier` per construct kind. The graph builder asks the heap for
//! an object's `ConstructTag`, looks the classifier up in a
//! `ClassifierRegistry`, and lets it report edges through an `EdgeSink`.
//!
//! | Tag | Classifier | Edges |
//! |-----|------------|-------|
//! | `Ordinary` | `OrdinaryClassifier` | own properties, private fields |
//! | `Array` | `ArrayClassifier` | elements + own properties |
//! | `Map`, `Set` | `StrongCollectionClassifier` | keys and values, strong |
//! | `WeakMap`, `WeakSet` | `WeakCollectionClassifier` | weak keys, joint values |
//! | `Proxy` | `ProxyClassifier` | target + handler until revoked |
//! | `WeakRef` | `WeakRefClassifier` | weak referent |
//! | `FinalizationRegistry` | `FinalizationRegistryClassifier` | cells, callback |
//! | `BoundFunction` | `BoundFunctionClassifier` | target, receiver, arguments |
//! | `Function` | `ClosureClassifier` | referenced captured bindings |
//! | `Iterator` | `IteratorClassifier` | not-yet-visited source entries |
//! | `Promise` | `PromiseClassifier` | reactions or settled result |
//!
//! Tags without a registered classifier (e.g. `Host`) are opaque: they
//! contribute no edges, and that is not an error.

pub mod object;
pub mod collection;
pub mod proxy;
pub mod weak;
pub mod function;
pub mod iterator;
pub mod promise;

use hashbrown::HashMap;

use crate::config::SessionConfig;
use crate::heap::{ConstructTag, HeapObject, HeapView, Value};
use crate::model::{EdgeContext, NodeId, Strength};
use crate::{Error, Result};

pub use object::{ArrayClassifier, OrdinaryClassifier, OwnProperties};
pub use collection::{StrongCollectionClassifier, WeakCollectionClassifier};
pub use proxy::ProxyClassifier;
pub use weak::{FinalizationRegistryClassifier, WeakRefClassifier};
pub use function::{BoundFunctionClassifier, ClosureClassifier};
pub use iterator::IteratorClassifier;
pub use promise::PromiseClassifier;

// ============================================================================
// EdgeSink
// ============================================================================

/// Receives the edges of the object currently being classified.
///
/// Primitive children are ignored. Children the session excludes are
/// dropped. Returned ids are those of the registered child, if any.
pub trait EdgeSink {
    /// Reference from the current object to `child`.
    fn add_edge(&mut self, child: &Value, strength: Strength, context: EdgeContext) -> Result<Option<NodeId>>;

    /// Reference held in an engine-internal slot.
    fn add_internal_slot_edge(&mut self, slot: &str, child: &Value, is_strong: bool) -> Result<Option<NodeId>> {
        self.add_edge(child, Strength::from_strong(is_strong), EdgeContext::InternalSlot(slot.to_string()))
    }

    /// One collection entry. `value` is `None` for set-like collections.
    ///
    /// With a weak key, the entry value is owned jointly by the collection
    /// and the key.
    fn add_collection_key_and_value(
        &mut self,
        key: &Value,
        key_is_strong: bool,
        value: Option<&Value>,
    ) -> Result<()>;
}

// ============================================================================
// Classifier
// ============================================================================

/// Outcome of `Classifier::classify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Kind(ConstructTag),
    Opaque,
}

/// Interprets one construct kind.
pub trait Classifier {
    /// Tag this classifier is registered under.
    fn tag(&self) -> ConstructTag;

    /// Confirm the object is interpretable. Default: tag match.
    fn classify(&self, object: &HeapObject) -> Classification {
        if object.tag() == self.tag() {
            Classification::Kind(self.tag())
        } else {
            Classification::Opaque
        }
    }

    /// Report every outgoing edge of `object`.
    fn emit_edges(&self, heap: &dyn HeapView, object: &HeapObject, sink: &mut dyn EdgeSink) -> Result<()>;

    /// Edges may change without the object itself being mutated, so they
    /// must be re-derived on every visit.
    fn is_volatile(&self) -> bool {
        false
    }
}

/// Error for internals that do not match the classifier's construct.
pub(crate) fn mismatch(expected: &str, object: &HeapObject) -> Error {
    Error::Classification(format!(
        "expected {expected} internals, found {}",
        object.internals.built_in_name()
    ))
}

// ============================================================================
// ClassifierRegistry
// ============================================================================

/// Tag → classifier table, built once and handed to each builder.
#[derive(Default)]
pub struct ClassifierRegistry {
    by_tag: HashMap<ConstructTag, Box<dyn Classifier>>,
}

impl std::fmt::Debug for ClassifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<_> = self.by_tag.keys().map(|t| format!("{t:?}")).collect();
        tags.sort();
        f.debug_struct("ClassifierRegistry").field("tags", &tags).finish()
    }
}

impl ClassifierRegistry {
    /// Empty registry: everything is opaque.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in classifier, configured from `config`.
    pub fn with_defaults(config: &SessionConfig) -> Self {
        let props = OwnProperties::new(config.trace_symbol_keys);
        let mut registry = Self::new();
        registry.register(Box::new(OrdinaryClassifier::new(props)));
        registry.register(Box::new(ArrayClassifier::new(props)));
        registry.register(Box::new(StrongCollectionClassifier::map(props)));
        registry.register(Box::new(StrongCollectionClassifier::set(props)));
        registry.register(Box::new(WeakCollectionClassifier::weak_map(props)));
        registry.register(Box::new(WeakCollectionClassifier::weak_set(props)));
        registry.register(Box::new(ProxyClassifier));
        registry.register(Box::new(WeakRefClassifier::new(props)));
        registry.register(Box::new(FinalizationRegistryClassifier::new(props)));
        registry.register(Box::new(BoundFunctionClassifier::new(props)));
        registry.register(Box::new(ClosureClassifier::new(props)));
        registry.register(Box::new(IteratorClassifier::new(props)));
        registry.register(Box::new(PromiseClassifier::new(props)));
        registry
    }

    /// Register a classifier under its tag, returning the one it replaces.
    pub fn register(&mut self, classifier: Box<dyn Classifier>) -> Option<Box<dyn Classifier>> {
        self.by_tag.insert(classifier.tag(), classifier)
    }

    /// Make a tag opaque again.
    pub fn unregister(&mut self, tag: ConstructTag) -> Option<Box<dyn Classifier>> {
        self.by_tag.remove(&tag)
    }

    pub fn get(&self, tag: ConstructTag) -> Option<&dyn Classifier> {
        self.by_tag.get(&tag).map(|c| c.as_ref())
    }

    /// Classifier for `object`, or `None` when it is opaque.
    pub fn classifier_for(&self, object: &HeapObject) -> Option<&dyn Classifier> {
        let classifier = self.get(object.tag())?;
        match classifier.classify(object) {
            Classification::Kind(_) => Some(classifier),
            Classification::Opaque => None,
        }
    }

    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }
}

// ============================================================================
// Test support
// ============================================================================

//! # Heap Boundary
//!
//! This is THE contract between the engine and whatever runtime owns the
//! heap being inspected. The runtime executes program code; the engine only
//! reads object internals through `HeapView`.
//!
//! ## Implementations
//!
//! | Heap | Module | Description |
//! |------|--------|-------------|
//! | `Heap` | `memory` | In-memory heap for testing/embedding |

pub mod value;
pub mod memory;

use serde::{Deserialize, Serialize};

use crate::Result;

pub use memory::{Heap, Job};
pub use value::{HeapRef, ObjectRef, PropertyKey, SymbolRef, Value};

// ============================================================================
// Construct tags
// ============================================================================

/// Construct kind reported by the heap for an object.
///
/// Classifiers are registered per tag. A tag with no registered classifier
/// is treated as opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstructTag {
    Ordinary,
    Array,
    Map,
    Set,
    WeakMap,
    WeakSet,
    Proxy,
    WeakRef,
    FinalizationRegistry,
    BoundFunction,
    Function,
    Iterator,
    Promise,
    /// Runtime-specific exotic object.
    Host,
}

// ============================================================================
// Object internals
// ============================================================================

/// Which part of each entry an iterator yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IterationKind {
    Keys,
    Values,
    Entries,
}

/// A captured binding in a closure's lexical environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub value: Value,
}

/// Internal state of a function object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionInternals {
    pub name: String,
    /// Bindings of the enclosing lexical environment.
    pub environment: Vec<Binding>,
    /// Free variable names the function body actually uses.
    pub referenced: Vec<String>,
}

impl FunctionInternals {
    /// Captured bindings the body references.
    pub fn live_bindings(&self) -> impl Iterator<Item = &Binding> {
        self.environment
            .iter()
            .filter(|b| self.referenced.iter().any(|name| *name == b.name))
    }
}

/// Progress of an iterator.
#[derive(Debug, Clone, PartialEq)]
pub enum IteratorState {
    /// Built-in iterator over an Array, Map or Set.
    Collection {
        source: ObjectRef,
        kind: IterationKind,
        /// Next slot to visit in the source's entry table.
        position: usize,
        done: bool,
    },
    /// Generator or user-authored iterator: step logic is not introspectable.
    Opaque { name: String },
}

/// Settlement state of a promise.
#[derive(Debug, Clone, PartialEq)]
pub enum PromiseState {
    Pending { reactions: Vec<ObjectRef> },
    Fulfilled(Value),
    Rejected(Value),
}

/// One registration in a finalization registry.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizationCell {
    pub target: HeapRef,
    pub held: Value,
    pub token: Option<HeapRef>,
}

/// Revocable proxy slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxySlots {
    pub target: ObjectRef,
    pub handler: ObjectRef,
}

/// Construct-specific internal state.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectInternals {
    Ordinary,
    Array { elements: Vec<Value> },
    /// Deleted entries leave a `None` hole so iterator positions stay valid.
    Map { entries: Vec<Option<(Value, Value)>> },
    Set { elements: Vec<Option<Value>> },
    WeakMap { entries: Vec<(HeapRef, Value)> },
    WeakSet { elements: Vec<HeapRef> },
    /// `None` once revoked.
    Proxy { slots: Option<ProxySlots> },
    WeakRef { target: HeapRef },
    FinalizationRegistry { cleanup: ObjectRef, cells: Vec<FinalizationCell> },
    BoundFunction { target: ObjectRef, this: Value, args: Vec<Value> },
    Function(FunctionInternals),
    Iterator(IteratorState),
    Promise(PromiseState),
    Host { name: String },
}

impl ObjectInternals {
    pub fn tag(&self) -> ConstructTag {
        match self {
            ObjectInternals::Ordinary => ConstructTag::Ordinary,
            ObjectInternals::Array { .. } => ConstructTag::Array,
            ObjectInternals::Map { .. } => ConstructTag::Map,
            ObjectInternals::Set { .. } => ConstructTag::Set,
            ObjectInternals::WeakMap { .. } => ConstructTag::WeakMap,
            ObjectInternals::WeakSet { .. } => ConstructTag::WeakSet,
            ObjectInternals::Proxy { .. } => ConstructTag::Proxy,
            ObjectInternals::WeakRef { .. } => ConstructTag::WeakRef,
            ObjectInternals::FinalizationRegistry { .. } => ConstructTag::FinalizationRegistry,
            ObjectInternals::BoundFunction { .. } => ConstructTag::BoundFunction,
            ObjectInternals::Function(_) => ConstructTag::Function,
            ObjectInternals::Iterator(_) => ConstructTag::Iterator,
            ObjectInternals::Promise(_) => ConstructTag::Promise,
            ObjectInternals::Host { .. } => ConstructTag::Host,
        }
    }

    /// Entries of an Array, Map or Set at or after `position`, as
    /// `(slot, key, value)`. Array keys are indices; Set keys equal values.
    /// Empty for any other construct.
    pub fn entries_from(&self, position: usize) -> Vec<(usize, Value, Value)> {
        match self {
            ObjectInternals::Array { elements } => elements
                .iter()
                .enumerate()
                .skip(position)
                .map(|(slot, v)| (slot, Value::Number(slot as f64), v.clone()))
                .collect(),
            ObjectInternals::Map { entries } => entries
                .iter()
                .enumerate()
                .skip(position)
                .filter_map(|(slot, e)| e.as_ref().map(|(k, v)| (slot, k.clone(), v.clone())))
                .collect(),
            ObjectInternals::Set { elements } => elements
                .iter()
                .enumerate()
                .skip(position)
                .filter_map(|(slot, e)| e.as_ref().map(|v| (slot, v.clone(), v.clone())))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_iterable_collection(&self) -> bool {
        matches!(
            self,
            ObjectInternals::Array { .. } | ObjectInternals::Map { .. } | ObjectInternals::Set { .. }
        )
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, ObjectInternals::Function(_) | ObjectInternals::BoundFunction { .. })
    }

    /// Built-in constructor name.
    pub fn built_in_name(&self) -> &str {
        match self {
            ObjectInternals::Ordinary => "Object",
            ObjectInternals::Array { .. } => "Array",
            ObjectInternals::Map { .. } => "Map",
            ObjectInternals::Set { .. } => "Set",
            ObjectInternals::WeakMap { .. } => "WeakMap",
            ObjectInternals::WeakSet { .. } => "WeakSet",
            ObjectInternals::Proxy { .. } => "Proxy",
            ObjectInternals::WeakRef { .. } => "WeakRef",
            ObjectInternals::FinalizationRegistry { .. } => "FinalizationRegistry",
            ObjectInternals::BoundFunction { .. } => "BoundFunction",
            ObjectInternals::Function(_) => "Function",
            ObjectInternals::Iterator(IteratorState::Collection { .. }) => "Iterator",
            ObjectInternals::Iterator(IteratorState::Opaque { name }) => name,
            ObjectInternals::Promise(_) => "Promise",
            ObjectInternals::Host { name } => name,
        }
    }
}

// ============================================================================
// Heap records
// ============================================================================

/// An object as exposed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct HeapObject {
    /// User-defined class, if constructed from one.
    pub class_name: Option<String>,
    /// Own properties, in insertion order.
    pub properties: Vec<(PropertyKey, Value)>,
    /// Private (`#name`) fields.
    pub private_fields: Vec<(String, Value)>,
    pub internals: ObjectInternals,
    /// Bumped on every observable mutation of this object.
    pub revision: u64,
}

impl HeapObject {
    pub fn new(internals: ObjectInternals) -> Self {
        Self {
            class_name: None,
            properties: Vec::new(),
            private_fields: Vec::new(),
            internals,
            revision: 0,
        }
    }

    pub fn tag(&self) -> ConstructTag {
        self.internals.tag()
    }

    pub fn get(&self, key: &PropertyKey) -> Option<&Value> {
        self.properties.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// A symbol as exposed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolData {
    pub description: Option<String>,
    /// Created through the global symbol registry (`Symbol.for`). Such
    /// symbols can never be collected and are not valid weak keys.
    pub registered: bool,
}

impl SymbolData {
    /// `Symbol(description)`.
    pub fn display(&self) -> String {
        format!("Symbol({})", self.description.as_deref().unwrap_or(""))
    }
}

// ============================================================================
// HeapView trait
// ============================================================================

/// Read access to a live heap, plus the hook to let it reach quiescence.
///
/// Implementors own all program state. The engine never mutates the heap
/// except through `drain_jobs`, which asks the runtime to finish its own
/// pending work.
pub trait HeapView {
    /// Look up a live object. `None` for a dangling handle.
    fn object(&self, obj: ObjectRef) -> Option<&HeapObject>;

    /// Look up a live symbol. `None` for a dangling handle.
    fn symbol(&self, sym: SymbolRef) -> Option<&SymbolData>;

    /// Is this handle live in the heap?
    fn contains(&self, value: HeapRef) -> bool {
        match value {
            HeapRef::Object(o) => self.object(o).is_some(),
            HeapRef::Symbol(s) => self.symbol(s).is_some(),
        }
    }

    /// Mutation counter for an object.
    ///
    /// Default: the revision stored on the object record.
    fn revision(&self, obj: ObjectRef) -> Option<u64> {
        self.object(obj).map(|o| o.revision)
    }

    /// Run pending jobs (promise reactions, timers already due) until the
    /// queue is empty. Returns how many ran.
    ///
    /// Default: nothing to drain.
    fn drain_jobs(&mut self) -> Result<usize> {
        Ok(0)
    }
}

//! # heapreach: Heap Reachability Engine
//!
//! Answers one question about a captured heap: *is this value still
//! reachable from these held values, and through which references?*
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `HeapView` is the contract between the engine and the runtime that owns the heap
//! 2. **Arena + ids**: every value becomes a `NodeId`; edges reference ids, so cycles are plain data
//! 3. **Injected classifiers**: one `Classifier` per construct kind, looked up by tag
//! 4. **Conjunctive edges are first-class**: ephemeron entries are `JointEdge`s, never "any parent" edges
//!
//! ## Quick Start
//!
//! ```rust
//! use heapreach::{Heap, SearchSession, Value};
//!
//! # fn example() -> heapreach::Result<()> {
//! let mut heap = Heap::new();
//! let key = heap.create_object();
//! let value = heap.create_object();
//! let map = heap.create_weak_map();
//! heap.weak_map_set(map, key, value)?;
//!
//! let mut session = SearchSession::new(heap);
//! session.search("map only", &value.into(), &[map.into()], true)?;
//! session.search("map and key", &value.into(), &[map.into(), key.into()], true)?;
//!
//! assert!(session.result("map only").unwrap().is_none());
//! assert!(session.result("map and key").unwrap().is_some());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Pipeline
//!
//! | Phase | Module | Description |
//! |-------|--------|-------------|
//! | Build | `graph` | Worklist traversal from the roots, dispatching to classifiers |
//! | Resolve | `resolve` | Alive-set fixpoint over simple and joint edges |
//! | Assemble | `assemble` | Minimal graph justifying the target, or "not found" |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod heap;
pub mod classify;
pub mod graph;
pub mod resolve;
pub mod assemble;
pub mod session;
pub mod config;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    CollectionRole, Edge, EdgeContext, EdgeId, GraphNode, JointEdge, JointEdgeId,
    NodeId, ReferenceEdge, ReferenceGraph, Strength,
};

// ============================================================================
// Re-exports: Heap boundary
// ============================================================================

pub use heap::{
    ConstructTag, Heap, HeapObject, HeapRef, HeapView, IterationKind,
    ObjectRef, PropertyKey, SymbolRef, Value,
};

// ============================================================================
// Re-exports: Engine
// ============================================================================

pub use classify::{Classification, Classifier, ClassifierRegistry, EdgeSink};
pub use graph::{BuildReport, EdgeStore, GraphBuilder, GraphState, KeyRegistry, NodeTable};
pub use resolve::{AliveSet, Justification};
pub use session::{ErrorTrap, SearchSession};
pub use config::{SessionConfig, TraversalOrder};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("resultsKey must be a non-empty string")]
    EmptyResultsKey,

    #[error("resultsKey \"{0}\" was already used in this session")]
    DuplicateResultsKey(String),

    #[error("targetValue must be an object or a symbol, got {got}")]
    InvalidTarget { got: &'static str },

    #[error("heldValues[{index}] must be an object or a symbol, got {got}")]
    InvalidHeldValue { index: usize, got: &'static str },

    #[error("{0} is not a live value in this heap")]
    UnknownValue(HeapRef),

    #[error("Heap error: {0}")]
    HeapError(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Caller mistakes, raised before a query runs.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::EmptyResultsKey
                | Error::DuplicateResultsKey(_)
                | Error::InvalidTarget { .. }
                | Error::InvalidHeldValue { .. }
                | Error::UnknownValue(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! # Graph Discovery
//!
//! Session-scoped graph state and the worklist builder that fills it.
//!
//! ```text
//! roots ─▶ GraphBuilder ─▶ ClassifierRegistry ─▶ Classifier::emit_edges
//!                │                                        │
//!                ▼                                        ▼
//!           KeyRegistry ◀──────── BuilderSink ────────▶ EdgeStore
//! ```

pub mod registry;
pub mod store;
pub mod builder;

pub use builder::{BuildReport, GraphBuilder};
pub use registry::KeyRegistry;
pub use store::{EdgeStore, NodeTable};

/// Everything discovered so far in a session. Shared by its queries.
#[derive(Debug, Clone, Default)]
pub struct GraphState {
    pub registry: KeyRegistry,
    pub nodes: NodeTable,
    pub edges: EdgeStore,
}

impl GraphState {
    pub fn new() -> Self {
        Self::default()
    }
}

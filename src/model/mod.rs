//! # Reference Graph Model
//!
//! Clean DTOs for nodes, edges and result graphs.
//! These types cross every boundary: builder ↔ resolver ↔ assembler ↔ caller.
//!
//! Design rule: NO heap handles here. Everything is addressed by `NodeId`.
//! This module is pure data: no I/O, no state.

pub mod node;
pub mod edge;
pub mod graph;

pub use node::{GraphNode, NodeId};
pub use edge::{CollectionRole, Edge, EdgeContext, EdgeId, JointEdge, JointEdgeId, Strength};
pub use graph::{ReferenceEdge, ReferenceGraph};

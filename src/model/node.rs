//! Node in the reference graph.

use serde::{Deserialize, Serialize};

/// Opaque node identifier.
///
/// Assigned monotonically by the key registry, one per distinct heap object
/// or symbol. Never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node in the reference graph.
///
/// Created once when a value is first discovered, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: NodeId,
    /// Built-in construct name (`"Map"`, `"WeakRef"`, `"Symbol"`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub built_in_kind: Option<String>,
    /// User-defined class name, when the value is an instance of one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_name: Option<String>,
}

impl GraphNode {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            built_in_kind: None,
            derived_name: None,
        }
    }

    pub fn with_built_in_kind(mut self, kind: impl Into<String>) -> Self {
        self.built_in_kind = Some(kind.into());
        self
    }

    pub fn with_derived_name(mut self, name: impl Into<String>) -> Self {
        self.derived_name = Some(name.into());
        self
    }

    /// The most specific name available for display.
    pub fn display_name(&self) -> &str {
        self.derived_name
            .as_deref()
            .or(self.built_in_kind.as_deref())
            .unwrap_or("Object")
    }
}

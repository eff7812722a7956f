//! Edges (references) between graph nodes.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use super::NodeId;

/// Identifier of a simple edge in the edge store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

/// Identifier of a joint-owner edge in the edge store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JointEdgeId(pub u32);

/// Whether an edge alone keeps its child alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strength {
    Strong,
    Weak,
}

impl Strength {
    /// Does an edge of this strength count under the given mode?
    pub fn holds(self, strong_only: bool) -> bool {
        match self {
            Strength::Strong => true,
            Strength::Weak => !strong_only,
        }
    }

    pub fn from_strong(is_strong: bool) -> Self {
        if is_strong { Strength::Strong } else { Strength::Weak }
    }
}

/// Role a collection entry member plays relative to its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionRole {
    /// Member of a Set / WeakSet.
    SetElement,
    /// Key of a Map / WeakMap entry.
    MapKey,
    /// Value of a Map entry, held by the collection itself.
    MapValue,
    /// Value of an entry, held jointly by the collection and the entry key.
    EntryValue,
}

/// What an edge represents on its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EdgeContext {
    /// Named property (string key, or `Symbol(description)` for symbol keys).
    PropertyName(String),
    /// The symbol used as a property key.
    PropertyKey(String),
    /// Element or canonical numeric property.
    ArrayIndex(u32),
    /// Engine-internal slot or private field (`[[ProxyTarget]]`, `#secret`).
    InternalSlot(String),
    /// Collection membership.
    CollectionPseudo(CollectionRole),
}

impl std::fmt::Display for EdgeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeContext::PropertyName(name) => write!(f, ".{name}"),
            EdgeContext::PropertyKey(name) => write!(f, "key {name}"),
            EdgeContext::ArrayIndex(index) => write!(f, "[{index}]"),
            EdgeContext::InternalSlot(slot) => f.write_str(slot),
            EdgeContext::CollectionPseudo(role) => write!(f, "<{role:?}>"),
        }
    }
}

/// A directed parent → child reference. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub parent: NodeId,
    pub child: NodeId,
    pub strength: Strength,
    pub context: EdgeContext,
}

impl Edge {
    pub fn new(parent: NodeId, child: NodeId, strength: Strength, context: EdgeContext) -> Self {
        Self { parent, child, strength, context }
    }

    pub fn is_strong(&self) -> bool {
        self.strength == Strength::Strong
    }
}

/// An edge whose child is alive only once *every* owner is alive.
///
/// Models ephemeron entries: a WeakMap value is kept by the map and its
/// key together, never by either alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JointEdge {
    /// Distinct, sorted, non-empty.
    pub owners: SmallVec<[NodeId; 2]>,
    pub child: NodeId,
    pub strength: Strength,
    pub context: EdgeContext,
}

impl JointEdge {
    /// Build a joint edge, normalizing the owner set. Returns `None` for an
    /// empty owner set.
    pub fn new(
        owners: impl IntoIterator<Item = NodeId>,
        child: NodeId,
        strength: Strength,
        context: EdgeContext,
    ) -> Option<Self> {
        let mut owners: SmallVec<[NodeId; 2]> = owners.into_iter().collect();
        owners.sort_unstable();
        owners.dedup();
        if owners.is_empty() {
            return None;
        }
        Some(Self { owners, child, strength, context })
    }

    pub fn is_owned_by(&self, node: NodeId) -> bool {
        self.owners.contains(&node)
    }
}

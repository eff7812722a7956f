//! Key registry: reference identity → `NodeId`.

use hashbrown::HashMap;

use crate::heap::{HeapRef, ObjectRef, SymbolRef};
use crate::model::NodeId;

/// Assigns one permanent id per distinct object or symbol.
///
/// Identity is by handle, never by structure: two objects with the same
/// contents get different ids. There is no removal.
#[derive(Debug, Clone)]
pub struct KeyRegistry {
    objects: HashMap<ObjectRef, NodeId>,
    symbols: HashMap<SymbolRef, NodeId>,
    /// `values[id - 1]` is the handle behind `id`.
    values: Vec<HeapRef>,
}

impl Default for KeyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            symbols: HashMap::new(),
            values: Vec::new(),
        }
    }

    /// Existing id for `value`, or a freshly allocated one.
    pub fn id_for(&mut self, value: HeapRef) -> NodeId {
        if let Some(id) = self.key_for_existing(value) {
            return id;
        }
        self.values.push(value);
        let id = NodeId(self.values.len() as u64);
        match value {
            HeapRef::Object(o) => self.objects.insert(o, id),
            HeapRef::Symbol(s) => self.symbols.insert(s, id),
        };
        id
    }

    pub fn has_id(&self, value: HeapRef) -> bool {
        self.key_for_existing(value).is_some()
    }

    pub fn key_for_existing(&self, value: HeapRef) -> Option<NodeId> {
        match value {
            HeapRef::Object(o) => self.key_for_existing_object(o),
            HeapRef::Symbol(s) => self.key_for_existing_symbol(s),
        }
    }

    pub fn key_for_existing_object(&self, obj: ObjectRef) -> Option<NodeId> {
        self.objects.get(&obj).copied()
    }

    pub fn key_for_existing_symbol(&self, sym: SymbolRef) -> Option<NodeId> {
        self.symbols.get(&sym).copied()
    }

    /// The handle an id was assigned to.
    pub fn value_of(&self, id: NodeId) -> Option<HeapRef> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.values.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

//! Keyed collections: Map, Set, WeakMap, WeakSet.
//!
//! Strong collections hold keys and values outright. Weak collections hold
//! their keys weakly, and an entry's value only through the conjunction of
//! collection and key (an ephemeron).

use crate::heap::{ConstructTag, HeapObject, HeapView, ObjectInternals, Value};
use crate::Result;
use super::{mismatch, Classifier, EdgeSink, OwnProperties};

/// `Map` and `Set`.
#[derive(Debug, Clone, Copy)]
pub struct StrongCollectionClassifier {
    tag: ConstructTag,
    props: OwnProperties,
}

impl StrongCollectionClassifier {
    pub fn map(props: OwnProperties) -> Self {
        Self { tag: ConstructTag::Map, props }
    }

    pub fn set(props: OwnProperties) -> Self {
        Self { tag: ConstructTag::Set, props }
    }
}

impl Classifier for StrongCollectionClassifier {
    fn tag(&self) -> ConstructTag {
        self.tag
    }

    fn emit_edges(&self, heap: &dyn HeapView, object: &HeapObject, sink: &mut dyn EdgeSink) -> Result<()> {
        match &object.internals {
            ObjectInternals::Map { entries } => {
                for (key, value) in entries.iter().flatten() {
                    sink.add_collection_key_and_value(key, true, Some(value))?;
                }
            }
            ObjectInternals::Set { elements } => {
                for element in elements.iter().flatten() {
                    sink.add_collection_key_and_value(element, true, None)?;
                }
            }
            _ => return Err(mismatch("Map or Set", object)),
        }
        self.props.emit(heap, object, sink)
    }
}

/// `WeakMap` and `WeakSet`.
#[derive(Debug, Clone, Copy)]
pub struct WeakCollectionClassifier {
    tag: ConstructTag,
    props: OwnProperties,
}

impl WeakCollectionClassifier {
    pub fn weak_map(props: OwnProperties) -> Self {
        Self { tag: ConstructTag::WeakMap, props }
    }

    pub fn weak_set(props: OwnProperties) -> Self {
        Self { tag: ConstructTag::WeakSet, props }
    }
}

impl Classifier for WeakCollectionClassifier {
    fn tag(&self) -> ConstructTag {
        self.tag
    }

    fn emit_edges(&self, heap: &dyn HeapView, object: &HeapObject, sink: &mut dyn EdgeSink) -> Result<()> {
        match &object.internals {
            ObjectInternals::WeakMap { entries } => {
                for (key, value) in entries {
                    sink.add_collection_key_and_value(&Value::from(*key), false, Some(value))?;
                }
            }
            ObjectInternals::WeakSet { elements } => {
                for element in elements {
                    sink.add_collection_key_and_value(&Value::from(*element), false, None)?;
                }
            }
            _ => return Err(mismatch("WeakMap or WeakSet", object)),
        }
        self.props.emit(heap, object, sink)
    }
}

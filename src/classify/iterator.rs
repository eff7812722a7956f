//! Built-in collection iterators.
//!
//! An iterator only keeps alive what it has yet to yield. Its edges are a
//! function of its progress *and* of the source's current entries, so they
//! are re-derived on every visit.

use crate::heap::{ConstructTag, HeapObject, HeapView, IterationKind, IteratorState, ObjectInternals};
use crate::model::{EdgeContext, Strength};
use crate::{Error, Result};
use super::{mismatch, Classification, Classifier, EdgeSink, OwnProperties};

#[derive(Debug, Clone, Copy)]
pub struct IteratorClassifier {
    props: OwnProperties,
}

impl IteratorClassifier {
    pub fn new(props: OwnProperties) -> Self {
        Self { props }
    }
}

impl Classifier for IteratorClassifier {
    fn tag(&self) -> ConstructTag {
        ConstructTag::Iterator
    }

    /// Generators and hand-written iterators are opaque: nothing about
    /// their step logic says what they retain.
    fn classify(&self, object: &HeapObject) -> Classification {
        match &object.internals {
            ObjectInternals::Iterator(IteratorState::Collection { .. }) => Classification::Kind(ConstructTag::Iterator),
            _ => Classification::Opaque,
        }
    }

    fn emit_edges(&self, heap: &dyn HeapView, object: &HeapObject, sink: &mut dyn EdgeSink) -> Result<()> {
        let ObjectInternals::Iterator(IteratorState::Collection { source, kind, position, done }) = &object.internals
        else {
            return Err(mismatch("collection Iterator", object));
        };
        if !*done {
            let source_object = heap
                .object(*source)
                .ok_or_else(|| Error::Classification(format!("iterator source {} is not live", source.0)))?;
            for (slot, key, value) in source_object.internals.entries_from(*position) {
                if matches!(kind, IterationKind::Keys | IterationKind::Entries) {
                    sink.add_edge(&key, Strength::Strong, EdgeContext::InternalSlot(format!("[[Remaining]][{slot}].key")))?;
                }
                if matches!(kind, IterationKind::Values | IterationKind::Entries) {
                    sink.add_edge(&value, Strength::Strong, EdgeContext::InternalSlot(format!("[[Remaining]][{slot}].value")))?;
                }
            }
        }
        self.props.emit(heap, object, sink)
    }

    fn is_volatile(&self) -> bool {
        true
    }
}

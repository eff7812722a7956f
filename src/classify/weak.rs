//! Weak references and finalization registries.

use crate::heap::{ConstructTag, HeapObject, HeapView, ObjectInternals, Value};
use crate::Result;
use super::{mismatch, Classifier, EdgeSink, OwnProperties};

/// `WeakRef`: a single weak edge to the referent.
#[derive(Debug, Clone, Copy)]
pub struct WeakRefClassifier {
    props: OwnProperties,
}

impl WeakRefClassifier {
    pub fn new(props: OwnProperties) -> Self {
        Self { props }
    }
}

impl Classifier for WeakRefClassifier {
    fn tag(&self) -> ConstructTag {
        ConstructTag::WeakRef
    }

    fn emit_edges(&self, heap: &dyn HeapView, object: &HeapObject, sink: &mut dyn EdgeSink) -> Result<()> {
        let ObjectInternals::WeakRef { target } = &object.internals else {
            return Err(mismatch("WeakRef", object));
        };
        sink.add_internal_slot_edge("[[WeakRefTarget]]", &Value::from(*target), false)?;
        self.props.emit(heap, object, sink)
    }
}

/// `FinalizationRegistry`.
///
/// Per registration: weak target, strong held value, weak unregister
/// token. Unregistered cells are gone from the heap and emit nothing.
#[derive(Debug, Clone, Copy)]
pub struct FinalizationRegistryClassifier {
    props: OwnProperties,
}

impl FinalizationRegistryClassifier {
    pub fn new(props: OwnProperties) -> Self {
        Self { props }
    }
}

impl Classifier for FinalizationRegistryClassifier {
    fn tag(&self) -> ConstructTag {
        ConstructTag::FinalizationRegistry
    }

    fn emit_edges(&self, heap: &dyn HeapView, object: &HeapObject, sink: &mut dyn EdgeSink) -> Result<()> {
        let ObjectInternals::FinalizationRegistry { cleanup, cells } = &object.internals else {
            return Err(mismatch("FinalizationRegistry", object));
        };
        sink.add_internal_slot_edge("[[CleanupCallback]]", &Value::Object(*cleanup), true)?;
        for (index, cell) in cells.iter().enumerate() {
            sink.add_internal_slot_edge(&format!("[[Cells]][{index}].target"), &Value::from(cell.target), false)?;
            sink.add_internal_slot_edge(&format!("[[Cells]][{index}].held"), &cell.held, true)?;
            if let Some(token) = cell.token {
                sink.add_internal_slot_edge(&format!("[[Cells]][{index}].token"), &Value::from(token), false)?;
            }
        }
        self.props.emit(heap, object, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::testing::emit;
    use crate::model::{EdgeContext, Strength};
    use crate::Heap;

    #[test]
    fn test_weak_ref_is_weak() {
        let mut heap = Heap::new();
        let target = heap.create_object();
        let weak = heap.create_weak_ref(target).unwrap();

        assert_eq!(
            emit(&heap, weak).edges(),
            vec![(Value::Object(target), Strength::Weak, EdgeContext::InternalSlot("[[WeakRefTarget]]".into()))]
        );
    }

    #[test]
    fn test_registry_cell_strengths() {
        let mut heap = Heap::new();
        let cleanup = heap.create_closure("cleanup", vec![], &[]).unwrap();
        let registry = heap.create_finalization_registry(cleanup).unwrap();
        let target = heap.create_object();
        let held = heap.create_object();
        let token = heap.create_object();
        heap.register(registry, target, held, Some(token.into())).unwrap();

        let strengths: Vec<(Value, Strength)> =
            emit(&heap, registry).edges().into_iter().map(|(v, s, _)| (v, s)).collect();
        assert_eq!(
            strengths,
            vec![
                (Value::Object(cleanup), Strength::Strong),
                (Value::Object(target), Strength::Weak),
                (Value::Object(held), Strength::Strong),
                (Value::Object(token), Strength::Weak),
            ]
        );
    }

    #[test]
    fn test_unregister_drops_cell_edges() {
        let mut heap = Heap::new();
        let cleanup = heap.create_closure("cleanup", vec![], &[]).unwrap();
        let registry = heap.create_finalization_registry(cleanup).unwrap();
        let target = heap.create_object();
        let held = heap.create_object();
        heap.register(registry, target, held, Some(target.into())).unwrap();
        heap.unregister(registry, target).unwrap();

        let edges = emit(&heap, registry).edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].0, Value::Object(cleanup));
    }
}

//! Ordinary objects and arrays.

use crate::heap::{ConstructTag, HeapObject, HeapView, ObjectInternals, PropertyKey, Value};
use crate::model::{EdgeContext, Strength};
use crate::Result;
use super::{mismatch, Classifier, EdgeSink};

/// Own-property edges, shared by every classifier whose construct can
/// carry properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnProperties {
    trace_symbol_keys: bool,
}

impl OwnProperties {
    pub fn new(trace_symbol_keys: bool) -> Self {
        Self { trace_symbol_keys }
    }

    /// One strong edge per own property and private field. Canonical
    /// numeric keys use `ArrayIndex` context.
    pub fn emit(&self, heap: &dyn HeapView, object: &HeapObject, sink: &mut dyn EdgeSink) -> Result<()> {
        for (key, value) in &object.properties {
            let context = match key {
                PropertyKey::String(name) => match key.as_array_index() {
                    Some(index) => EdgeContext::ArrayIndex(index),
                    None => EdgeContext::PropertyName(name.clone()),
                },
                PropertyKey::Symbol(sym) => {
                    let name = heap
                        .symbol(*sym)
                        .map(|data| data.display())
                        .unwrap_or_else(|| "Symbol()".to_string());
                    if self.trace_symbol_keys {
                        sink.add_edge(&Value::Symbol(*sym), Strength::Strong, EdgeContext::PropertyKey(name.clone()))?;
                    }
                    EdgeContext::PropertyName(name)
                }
            };
            sink.add_edge(value, Strength::Strong, context)?;
        }
        for (name, value) in &object.private_fields {
            sink.add_edge(value, Strength::Strong, EdgeContext::InternalSlot(format!("#{name}")))?;
        }
        Ok(())
    }
}

impl Default for OwnProperties {
    fn default() -> Self {
        Self::new(true)
    }
}

// ============================================================================
// Ordinary objects
// ============================================================================

/// Plain objects and class instances.
#[derive(Debug, Clone, Copy)]
pub struct OrdinaryClassifier {
    props: OwnProperties,
}

impl OrdinaryClassifier {
    pub fn new(props: OwnProperties) -> Self {
        Self { props }
    }
}

impl Classifier for OrdinaryClassifier {
    fn tag(&self) -> ConstructTag {
        ConstructTag::Ordinary
    }

    fn emit_edges(&self, heap: &dyn HeapView, object: &HeapObject, sink: &mut dyn EdgeSink) -> Result<()> {
        self.props.emit(heap, object, sink)
    }
}

// ============================================================================
// Arrays
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct ArrayClassifier {
    props: OwnProperties,
}

impl ArrayClassifier {
    pub fn new(props: OwnProperties) -> Self {
        Self { props }
    }
}

impl Classifier for ArrayClassifier {
    fn tag(&self) -> ConstructTag {
        ConstructTag::Array
    }

    fn emit_edges(&self, heap: &dyn HeapView, object: &HeapObject, sink: &mut dyn EdgeSink) -> Result<()> {
        let ObjectInternals::Array { elements } = &object.internals else {
            return Err(mismatch("Array", object));
        };
        for (index, element) in elements.iter().enumerate() {
            sink.add_edge(element, Strength::Strong, EdgeContext::ArrayIndex(index as u32))?;
        }
        self.props.emit(heap, object, sink)
    }
}

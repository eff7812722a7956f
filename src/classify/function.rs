//! Functions: closures and bound functions.

use crate::heap::{ConstructTag, HeapObject, HeapView, ObjectInternals, Value};
use crate::model::{EdgeContext, Strength};
use crate::Result;
use super::{mismatch, Classifier, EdgeSink, OwnProperties};

/// Closures hold the captured bindings their body actually uses.
#[derive(Debug, Clone, Copy)]
pub struct ClosureClassifier {
    props: OwnProperties,
}

impl ClosureClassifier {
    pub fn new(props: OwnProperties) -> Self {
        Self { props }
    }
}

impl Classifier for ClosureClassifier {
    fn tag(&self) -> ConstructTag {
        ConstructTag::Function
    }

    fn emit_edges(&self, heap: &dyn HeapView, object: &HeapObject, sink: &mut dyn EdgeSink) -> Result<()> {
        let ObjectInternals::Function(function) = &object.internals else {
            return Err(mismatch("Function", object));
        };
        for binding in function.live_bindings() {
            sink.add_edge(
                &binding.value,
                Strength::Strong,
                EdgeContext::InternalSlot(format!("[[Environment]].{}", binding.name)),
            )?;
        }
        self.props.emit(heap, object, sink)
    }
}

/// `fn.bind(this, ...args)`.
#[derive(Debug, Clone, Copy)]
pub struct BoundFunctionClassifier {
    props: OwnProperties,
}

impl BoundFunctionClassifier {
    pub fn new(props: OwnProperties) -> Self {
        Self { props }
    }
}

impl Classifier for BoundFunctionClassifier {
    fn tag(&self) -> ConstructTag {
        ConstructTag::BoundFunction
    }

    fn emit_edges(&self, heap: &dyn HeapView, object: &HeapObject, sink: &mut dyn EdgeSink) -> Result<()> {
        let ObjectInternals::BoundFunction { target, this, args } = &object.internals else {
            return Err(mismatch("BoundFunction", object));
        };
        sink.add_internal_slot_edge("[[BoundTargetFunction]]", &Value::Object(*target), true)?;
        sink.add_internal_slot_edge("[[BoundThis]]", this, true)?;
        for (index, arg) in args.iter().enumerate() {
            sink.add_internal_slot_edge(&format!("[[BoundArguments]][{index}]"), arg, true)?;
        }
        self.props.emit(heap, object, sink)
    }
}

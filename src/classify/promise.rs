//! Promises.

use crate::heap::{ConstructTag, HeapObject, HeapView, ObjectInternals, PromiseState, Value};
use crate::Result;
use super::{mismatch, Classifier, EdgeSink, OwnProperties};

/// Pending promises hold their reactions; settled ones hold their result.
#[derive(Debug, Clone, Copy)]
pub struct PromiseClassifier {
    props: OwnProperties,
}

impl PromiseClassifier {
    pub fn new(props: OwnProperties) -> Self {
        Self { props }
    }
}

impl Classifier for PromiseClassifier {
    fn tag(&self) -> ConstructTag {
        ConstructTag::Promise
    }

    fn emit_edges(&self, heap: &dyn HeapView, object: &HeapObject, sink: &mut dyn EdgeSink) -> Result<()> {
        let ObjectInternals::Promise(state) = &object.internals else {
            return Err(mismatch("Promise", object));
        };
        match state {
            PromiseState::Pending { reactions } => {
                for (index, reaction) in reactions.iter().enumerate() {
                    sink.add_internal_slot_edge(
                        &format!("[[PromiseReactions]][{index}]"),
                        &Value::Object(*reaction),
                        true,
                    )?;
                }
            }
            PromiseState::Fulfilled(result) | PromiseState::Rejected(result) => {
                sink.add_internal_slot_edge("[[PromiseResult]]", result, true)?;
            }
        }
        self.props.emit(heap, object, sink)
    }
}

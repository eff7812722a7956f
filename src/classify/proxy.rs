//! Revocable proxies.

use crate::heap::{ConstructTag, HeapObject, HeapView, ObjectInternals, Value};
use crate::Result;
use super::{mismatch, Classifier, EdgeSink};

/// Strong edges to target and handler; nothing once revoked.
///
/// Property access on a proxy is forwarded to its target, so the proxy
/// itself reports no own properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyClassifier;

impl Classifier for ProxyClassifier {
    fn tag(&self) -> ConstructTag {
        ConstructTag::Proxy
    }

    fn emit_edges(&self, _heap: &dyn HeapView, object: &HeapObject, sink: &mut dyn EdgeSink) -> Result<()> {
        let ObjectInternals::Proxy { slots } = &object.internals else {
            return Err(mismatch("Proxy", object));
        };
        if let Some(slots) = slots {
            sink.add_internal_slot_edge("[[ProxyTarget]]", &Value::Object(slots.target), true)?;
            sink.add_internal_slot_edge("[[ProxyHandler]]", &Value::Object(slots.handler), true)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::testing::emit;
    use crate::model::{EdgeContext, Strength};
    use crate::Heap;

    #[test]
    fn test_live_proxy_holds_target_and_handler() {
        let mut heap = Heap::new();
        let target = heap.create_object();
        let handler = heap.create_object();
        let proxy = heap.create_proxy(target, handler).unwrap();

        let edges = emit(&heap, proxy).edges();
        assert_eq!(
            edges,
            vec![
                (Value::Object(target), Strength::Strong, EdgeContext::InternalSlot("[[ProxyTarget]]".into())),
                (Value::Object(handler), Strength::Strong, EdgeContext::InternalSlot("[[ProxyHandler]]".into())),
            ]
        );
    }

    #[test]
    fn test_revoked_proxy_has_no_edges() {
        let mut heap = Heap::new();
        let target = heap.create_object();
        let handler = heap.create_object();
        let proxy = heap.create_proxy(target, handler).unwrap();
        heap.revoke_proxy(proxy).unwrap();

        assert!(emit(&heap, proxy).records.is_empty());
    }
}

//! In-memory heap.
//!
//! This is the reference implementation of `HeapView`.
//! It keeps objects and symbols in two arenas addressed by handle.
//!
//! ## Limitations
//!
//! - **No collection**: objects are never freed. Reachability is only ever
//!   *reported*, so handles stay valid for the heap's lifetime.
//! - **No code execution**: closures, reactions and cleanup callbacks are
//!   plain objects. Deferred work is modelled by `queue_job` with a Rust
//!   closure that mutates the heap when drained.
//!
//! Use this heap for:
//! - Testing classifiers, the resolver and sessions end to end
//! - Embedding the engine behind a runtime that snapshots into it

use std::collections::VecDeque;
use std::fmt;

use hashbrown::HashMap;

use crate::{Error, Result};
use super::*;

/// Deferred heap mutation, run by `drain_jobs`.
pub type Job = Box<dyn FnOnce(&mut Heap) -> Result<()>>;

/// One past the largest array index.
const MAX_ARRAY_LENGTH: usize = u32::MAX as usize;

fn heap_error(message: impl Into<String>) -> Error {
    Error::HeapError(message.into())
}

// ============================================================================
// Heap
// ============================================================================

/// In-memory heap of objects and symbols.
#[derive(Default)]
pub struct Heap {
    objects: Vec<HeapObject>,
    symbols: Vec<SymbolData>,
    /// `Symbol.for` registry.
    symbol_registry: HashMap<String, SymbolRef>,
    jobs: VecDeque<Job>,
    /// Source of per-object revisions.
    clock: u64,
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("objects", &self.objects.len())
            .field("symbols", &self.symbols.len())
            .field("pending_jobs", &self.jobs.len())
            .finish()
    }
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn pending_jobs(&self) -> usize {
        self.jobs.len()
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    fn alloc(&mut self, internals: ObjectInternals) -> ObjectRef {
        let id = ObjectRef(self.objects.len() as u32);
        self.clock += 1;
        let mut object = HeapObject::new(internals);
        object.revision = self.clock;
        self.objects.push(object);
        id
    }

    /// `{}`
    pub fn create_object(&mut self) -> ObjectRef {
        self.alloc(ObjectInternals::Ordinary)
    }

    /// `new ClassName()` for a user-defined class.
    pub fn create_instance(&mut self, class_name: &str) -> ObjectRef {
        let id = self.alloc(ObjectInternals::Ordinary);
        self.objects[id.0 as usize].class_name = Some(class_name.to_string());
        id
    }

    /// `Symbol(description)`
    pub fn create_symbol(&mut self, description: Option<&str>) -> SymbolRef {
        let id = SymbolRef(self.symbols.len() as u32);
        self.symbols.push(SymbolData {
            description: description.map(str::to_string),
            registered: false,
        });
        id
    }

    /// `Symbol.for(key)`: one shared symbol per key.
    pub fn symbol_for(&mut self, key: &str) -> SymbolRef {
        if let Some(sym) = self.symbol_registry.get(key) {
            return *sym;
        }
        let id = SymbolRef(self.symbols.len() as u32);
        self.symbols.push(SymbolData {
            description: Some(key.to_string()),
            registered: true,
        });
        self.symbol_registry.insert(key.to_string(), id);
        id
    }

    /// Runtime-specific exotic object the engine cannot look into.
    pub fn create_host_object(&mut self, name: &str) -> ObjectRef {
        self.alloc(ObjectInternals::Host { name: name.to_string() })
    }

    // ========================================================================
    // Validation helpers
    // ========================================================================

    fn get(&self, obj: ObjectRef) -> Result<&HeapObject> {
        self.objects
            .get(obj.0 as usize)
            .ok_or_else(|| heap_error(format!("dangling object handle {}", obj.0)))
    }

    /// Apply `f` to `obj`, recording a mutation only if `f` succeeds.
    ///
    /// `f` must not change the object before it fails.
    fn modify<T>(&mut self, obj: ObjectRef, f: impl FnOnce(&mut HeapObject) -> Result<T>) -> Result<T> {
        let object = self
            .objects
            .get_mut(obj.0 as usize)
            .ok_or_else(|| heap_error(format!("dangling object handle {}", obj.0)))?;
        let out = f(object)?;
        self.clock += 1;
        object.revision = self.clock;
        Ok(out)
    }

    fn check_value(&self, value: &Value) -> Result<()> {
        match value.as_heap_ref() {
            Some(r) if !self.contains(r) => Err(heap_error(format!("dangling handle {r}"))),
            _ => Ok(()),
        }
    }

    /// Weak targets must be objects or unregistered symbols.
    fn check_weak_target(&self, target: HeapRef) -> Result<()> {
        match target {
            HeapRef::Object(o) => self.get(o).map(|_| ()),
            HeapRef::Symbol(s) => match self.symbols.get(s.0 as usize) {
                None => Err(heap_error(format!("dangling symbol handle {}", s.0))),
                Some(data) if data.registered => Err(heap_error(format!(
                    "registered symbol {} cannot be held weakly",
                    data.display()
                ))),
                Some(_) => Ok(()),
            },
        }
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Define or overwrite an own property.
    pub fn set_property(
        &mut self,
        obj: ObjectRef,
        key: impl Into<PropertyKey>,
        value: impl Into<Value>,
    ) -> Result<()> {
        let (key, value) = (key.into(), value.into());
        self.check_value(&value)?;
        if let PropertyKey::Symbol(s) = &key {
            self.check_value(&Value::Symbol(*s))?;
        }
        self.modify(obj, |object| {
            if matches!(object.internals, ObjectInternals::Proxy { .. }) {
                return Err(heap_error("proxy properties live on the proxy target"));
            }
            match object.properties.iter().position(|(k, _)| *k == key) {
                Some(idx) => object.properties[idx].1 = value,
                None => object.properties.push((key, value)),
            }
            Ok(())
        })
    }

    /// `delete obj[key]`. Returns whether the property existed.
    pub fn delete_property(&mut self, obj: ObjectRef, key: impl Into<PropertyKey>) -> Result<bool> {
        let key = key.into();
        self.modify(obj, |object| {
            let before = object.properties.len();
            object.properties.retain(|(k, _)| *k != key);
            Ok(object.properties.len() != before)
        })
    }

    /// Define or overwrite a `#private` field.
    pub fn set_private_field(&mut self, obj: ObjectRef, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.check_value(&value)?;
        self.modify(obj, |object| {
            match object.private_fields.iter().position(|(n, _)| n == name) {
                Some(idx) => object.private_fields[idx].1 = value,
                None => object.private_fields.push((name.to_string(), value)),
            }
            Ok(())
        })
    }

    // ========================================================================
    // Arrays
    // ========================================================================

    pub fn create_array(&mut self, elements: Vec<Value>) -> Result<ObjectRef> {
        for element in &elements {
            self.check_value(element)?;
        }
        Ok(self.alloc(ObjectInternals::Array { elements }))
    }

    pub fn array_push(&mut self, array: ObjectRef, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.check_value(&value)?;
        self.modify(array, |object| match &mut object.internals {
            ObjectInternals::Array { elements } => {
                elements.push(value);
                Ok(())
            }
            other => Err(heap_error(format!("{} is not an Array", other.built_in_name()))),
        })
    }

    /// `array[index] = value`, growing with `undefined` holes as needed.
    /// Indexes at or above 2^32 - 1 are not array indexes and are rejected.
    pub fn array_set(&mut self, array: ObjectRef, index: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.check_value(&value)?;
        if index >= MAX_ARRAY_LENGTH {
            return Err(heap_error(format!("{index} is not a valid array index")));
        }
        self.modify(array, |object| match &mut object.internals {
            ObjectInternals::Array { elements } => {
                if elements.len() <= index {
                    elements.resize(index + 1, Value::Undefined);
                }
                elements[index] = value;
                Ok(())
            }
            other => Err(heap_error(format!("{} is not an Array", other.built_in_name()))),
        })
    }

    // ========================================================================
    // Strong collections
    // ========================================================================

    pub fn create_map(&mut self) -> ObjectRef {
        self.alloc(ObjectInternals::Map { entries: Vec::new() })
    }

    /// `map.set(key, value)`
    pub fn map_set(&mut self, map: ObjectRef, key: impl Into<Value>, value: impl Into<Value>) -> Result<()> {
        let (key, value) = (key.into(), value.into());
        self.check_value(&key)?;
        self.check_value(&value)?;
        self.modify(map, |object| match &mut object.internals {
            ObjectInternals::Map { entries } => {
                let existing = entries
                    .iter()
                    .position(|e| e.as_ref().is_some_and(|(k, _)| k.same_value_zero(&key)));
                match existing {
                    Some(idx) => entries[idx] = Some((key, value)),
                    None => entries.push(Some((key, value))),
                }
                Ok(())
            }
            other => Err(heap_error(format!("{} is not a Map", other.built_in_name()))),
        })
    }

    /// `map.delete(key)`
    pub fn map_delete(&mut self, map: ObjectRef, key: &Value) -> Result<bool> {
        self.modify(map, |object| match &mut object.internals {
            ObjectInternals::Map { entries } => {
                let slot = entries
                    .iter_mut()
                    .find(|e| e.as_ref().is_some_and(|(k, _)| k.same_value_zero(key)));
                Ok(slot.map(|s| s.take()).is_some())
            }
            other => Err(heap_error(format!("{} is not a Map", other.built_in_name()))),
        })
    }

    pub fn create_set(&mut self) -> ObjectRef {
        self.alloc(ObjectInternals::Set { elements: Vec::new() })
    }

    /// `set.add(value)`
    pub fn set_add(&mut self, set: ObjectRef, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.check_value(&value)?;
        self.modify(set, |object| match &mut object.internals {
            ObjectInternals::Set { elements } => {
                if !elements.iter().flatten().any(|v| v.same_value_zero(&value)) {
                    elements.push(Some(value));
                }
                Ok(())
            }
            other => Err(heap_error(format!("{} is not a Set", other.built_in_name()))),
        })
    }

    /// `set.delete(value)`
    pub fn set_delete(&mut self, set: ObjectRef, value: &Value) -> Result<bool> {
        self.modify(set, |object| match &mut object.internals {
            ObjectInternals::Set { elements } => {
                let slot = elements
                    .iter_mut()
                    .find(|e| e.as_ref().is_some_and(|v| v.same_value_zero(value)));
                Ok(slot.map(|s| s.take()).is_some())
            }
            other => Err(heap_error(format!("{} is not a Set", other.built_in_name()))),
        })
    }

    // ========================================================================
    // Weak collections
    // ========================================================================

    pub fn create_weak_map(&mut self) -> ObjectRef {
        self.alloc(ObjectInternals::WeakMap { entries: Vec::new() })
    }

    /// `weakMap.set(key, value)`
    pub fn weak_map_set(&mut self, map: ObjectRef, key: impl Into<HeapRef>, value: impl Into<Value>) -> Result<()> {
        let (key, value) = (key.into(), value.into());
        self.check_weak_target(key)?;
        self.check_value(&value)?;
        self.modify(map, |object| match &mut object.internals {
            ObjectInternals::WeakMap { entries } => {
                match entries.iter().position(|(k, _)| *k == key) {
                    Some(idx) => entries[idx].1 = value,
                    None => entries.push((key, value)),
                }
                Ok(())
            }
            other => Err(heap_error(format!("{} is not a WeakMap", other.built_in_name()))),
        })
    }

    /// `weakMap.delete(key)`
    pub fn weak_map_delete(&mut self, map: ObjectRef, key: impl Into<HeapRef>) -> Result<bool> {
        let key = key.into();
        self.modify(map, |object| match &mut object.internals {
            ObjectInternals::WeakMap { entries } => {
                let before = entries.len();
                entries.retain(|(k, _)| *k != key);
                Ok(entries.len() != before)
            }
            other => Err(heap_error(format!("{} is not a WeakMap", other.built_in_name()))),
        })
    }

    pub fn create_weak_set(&mut self) -> ObjectRef {
        self.alloc(ObjectInternals::WeakSet { elements: Vec::new() })
    }

    /// `weakSet.add(value)`
    pub fn weak_set_add(&mut self, set: ObjectRef, value: impl Into<HeapRef>) -> Result<()> {
        let value = value.into();
        self.check_weak_target(value)?;
        self.modify(set, |object| match &mut object.internals {
            ObjectInternals::WeakSet { elements } => {
                if !elements.contains(&value) {
                    elements.push(value);
                }
                Ok(())
            }
            other => Err(heap_error(format!("{} is not a WeakSet", other.built_in_name()))),
        })
    }

    // ========================================================================
    // Proxies
    // ========================================================================

    /// `Proxy.revocable(target, handler).proxy`
    pub fn create_proxy(&mut self, target: ObjectRef, handler: ObjectRef) -> Result<ObjectRef> {
        self.get(target)?;
        self.get(handler)?;
        Ok(self.alloc(ObjectInternals::Proxy {
            slots: Some(ProxySlots { target, handler }),
        }))
    }

    /// Revoke a proxy, dropping its target and handler. Idempotent.
    pub fn revoke_proxy(&mut self, proxy: ObjectRef) -> Result<()> {
        self.modify(proxy, |object| match &mut object.internals {
            ObjectInternals::Proxy { slots } => {
                *slots = None;
                Ok(())
            }
            other => Err(heap_error(format!("{} is not a Proxy", other.built_in_name()))),
        })
    }

    // ========================================================================
    // Weak references and finalization
    // ========================================================================

    /// `new WeakRef(target)`
    pub fn create_weak_ref(&mut self, target: impl Into<HeapRef>) -> Result<ObjectRef> {
        let target = target.into();
        self.check_weak_target(target)?;
        Ok(self.alloc(ObjectInternals::WeakRef { target }))
    }

    /// `new FinalizationRegistry(cleanup)`
    pub fn create_finalization_registry(&mut self, cleanup: ObjectRef) -> Result<ObjectRef> {
        if !self.get(cleanup)?.internals.is_callable() {
            return Err(heap_error("finalization cleanup callback must be callable"));
        }
        Ok(self.alloc(ObjectInternals::FinalizationRegistry {
            cleanup,
            cells: Vec::new(),
        }))
    }

    /// `registry.register(target, held, token)`
    pub fn register(
        &mut self,
        registry: ObjectRef,
        target: impl Into<HeapRef>,
        held: impl Into<Value>,
        token: Option<HeapRef>,
    ) -> Result<()> {
        let (target, held) = (target.into(), held.into());
        self.check_weak_target(target)?;
        self.check_value(&held)?;
        if let Some(token) = token {
            self.check_weak_target(token)?;
        }
        if held.as_heap_ref() == Some(target) {
            return Err(heap_error("finalization target and held value must differ"));
        }
        self.modify(registry, |object| match &mut object.internals {
            ObjectInternals::FinalizationRegistry { cells, .. } => {
                cells.push(FinalizationCell { target, held, token });
                Ok(())
            }
            other => Err(heap_error(format!("{} is not a FinalizationRegistry", other.built_in_name()))),
        })
    }

    /// `registry.unregister(token)`: drops every cell registered with it.
    pub fn unregister(&mut self, registry: ObjectRef, token: impl Into<HeapRef>) -> Result<bool> {
        let token = token.into();
        self.modify(registry, |object| match &mut object.internals {
            ObjectInternals::FinalizationRegistry { cells, .. } => {
                let before = cells.len();
                cells.retain(|cell| cell.token != Some(token));
                Ok(cells.len() != before)
            }
            other => Err(heap_error(format!("{} is not a FinalizationRegistry", other.built_in_name()))),
        })
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// A closure over `captures`, whose body uses the names in `referenced`.
    pub fn create_closure(
        &mut self,
        name: &str,
        captures: Vec<(&str, Value)>,
        referenced: &[&str],
    ) -> Result<ObjectRef> {
        let mut environment = Vec::with_capacity(captures.len());
        for (binding, value) in captures {
            self.check_value(&value)?;
            environment.push(Binding { name: binding.to_string(), value });
        }
        Ok(self.alloc(ObjectInternals::Function(FunctionInternals {
            name: name.to_string(),
            environment,
            referenced: referenced.iter().map(|s| s.to_string()).collect(),
        })))
    }

    /// `target.bind(this, ...args)`
    pub fn create_bound_function(
        &mut self,
        target: ObjectRef,
        this: impl Into<Value>,
        args: Vec<Value>,
    ) -> Result<ObjectRef> {
        if !self.get(target)?.internals.is_callable() {
            return Err(heap_error("bind target must be callable"));
        }
        let this = this.into();
        self.check_value(&this)?;
        for arg in &args {
            self.check_value(arg)?;
        }
        Ok(self.alloc(ObjectInternals::BoundFunction { target, this, args }))
    }

    // ========================================================================
    // Iterators
    // ========================================================================

    /// `source.keys()` / `.values()` / `.entries()` over an Array, Map or Set.
    pub fn create_iterator(&mut self, source: ObjectRef, kind: IterationKind) -> Result<ObjectRef> {
        let internals = &self.get(source)?.internals;
        if !internals.is_iterable_collection() {
            return Err(heap_error(format!("{} has no built-in iterator", internals.built_in_name())));
        }
        Ok(self.alloc(ObjectInternals::Iterator(IteratorState::Collection {
            source,
            kind,
            position: 0,
            done: false,
        })))
    }

    /// A generator or hand-written iterator object.
    pub fn create_generator(&mut self, name: &str) -> ObjectRef {
        self.alloc(ObjectInternals::Iterator(IteratorState::Opaque { name: name.to_string() }))
    }

    /// `iterator.next()`. `None` once exhausted.
    pub fn iterator_next(&mut self, iterator: ObjectRef) -> Result<Option<Value>> {
        let (source, kind, position) = match &self.get(iterator)?.internals {
            ObjectInternals::Iterator(IteratorState::Collection { done: true, .. }) => return Ok(None),
            ObjectInternals::Iterator(IteratorState::Collection { source, kind, position, .. }) => {
                (*source, *kind, *position)
            }
            ObjectInternals::Iterator(IteratorState::Opaque { name }) => {
                return Err(heap_error(format!("{name} cannot be stepped from outside the runtime")));
            }
            other => return Err(heap_error(format!("{} is not an iterator", other.built_in_name()))),
        };

        let next = self.get(source)?.internals.entries_from(position).into_iter().next();
        let (next_position, result) = match next {
            None => (position, None),
            Some((slot, key, value)) => {
                let item = match kind {
                    IterationKind::Keys => key,
                    IterationKind::Values => value,
                    IterationKind::Entries => Value::Object(self.create_array(vec![key, value])?),
                };
                (slot + 1, Some(item))
            }
        };

        let exhausted = result.is_none();
        self.modify(iterator, |object| {
            if let ObjectInternals::Iterator(IteratorState::Collection { position, done, .. }) =
                &mut object.internals
            {
                *position = next_position;
                *done = exhausted;
            }
            Ok(())
        })?;
        Ok(result)
    }

    // ========================================================================
    // Promises and jobs
    // ========================================================================

    pub fn create_promise(&mut self) -> ObjectRef {
        self.alloc(ObjectInternals::Promise(PromiseState::Pending { reactions: Vec::new() }))
    }

    /// `promise.then(reaction)`. A settled promise does not retain the
    /// reaction; the runtime would schedule it instead.
    pub fn promise_then(&mut self, promise: ObjectRef, reaction: ObjectRef) -> Result<()> {
        if !self.get(reaction)?.internals.is_callable() {
            return Err(heap_error("promise reaction must be callable"));
        }
        self.modify(promise, |object| match &mut object.internals {
            ObjectInternals::Promise(PromiseState::Pending { reactions }) => {
                reactions.push(reaction);
                Ok(())
            }
            ObjectInternals::Promise(_) => Ok(()),
            other => Err(heap_error(format!("{} is not a Promise", other.built_in_name()))),
        })
    }

    /// Fulfill or reject a pending promise, releasing its reactions.
    /// Settling an already settled promise is a no-op.
    pub fn settle_promise(&mut self, promise: ObjectRef, result: impl Into<Value>, fulfilled: bool) -> Result<()> {
        let result = result.into();
        self.check_value(&result)?;
        self.modify(promise, |object| match &mut object.internals {
            ObjectInternals::Promise(state @ PromiseState::Pending { .. }) => {
                *state = if fulfilled {
                    PromiseState::Fulfilled(result)
                } else {
                    PromiseState::Rejected(result)
                };
                Ok(())
            }
            ObjectInternals::Promise(_) => Ok(()),
            other => Err(heap_error(format!("{} is not a Promise", other.built_in_name()))),
        })
    }

    /// Schedule deferred work. Runs on the next `drain_jobs`.
    pub fn queue_job(&mut self, job: impl FnOnce(&mut Heap) -> Result<()> + 'static) {
        self.jobs.push_back(Box::new(job));
    }
}

// ============================================================================
// HeapView impl
// ============================================================================

impl HeapView for Heap {
    fn object(&self, obj: ObjectRef) -> Option<&HeapObject> {
        self.objects.get(obj.0 as usize)
    }

    fn symbol(&self, sym: SymbolRef) -> Option<&SymbolData> {
        self.symbols.get(sym.0 as usize)
    }

    /// Jobs queued by running jobs run in the same drain.
    fn drain_jobs(&mut self) -> Result<usize> {
        let mut ran = 0;
        while let Some(job) = self.jobs.pop_front() {
            job(self)?;
            ran += 1;
        }
        Ok(ran)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_overwrite_property() {
        let mut heap = Heap::new();
        let obj = heap.create_object();
        let child = heap.create_object();

        heap.set_property(obj, "a", 1).unwrap();
        heap.set_property(obj, "a", child).unwrap();

        let record = heap.object(obj).unwrap();
        assert_eq!(record.properties.len(), 1);
        assert_eq!(record.get(&"a".into()), Some(&Value::Object(child)));
    }

    #[test]
    fn test_mutation_bumps_revision() {
        let mut heap = Heap::new();
        let obj = heap.create_object();
        let before = heap.revision(obj).unwrap();
        heap.set_property(obj, "x", true).unwrap();
        assert!(heap.revision(obj).unwrap() > before);
    }

    #[test]
    fn test_dangling_handle_rejected() {
        let mut heap = Heap::new();
        let obj = heap.create_object();
        let result = heap.set_property(obj, "x", ObjectRef(99));
        assert!(matches!(result, Err(Error::HeapError(_))));
    }

    #[test]
    fn test_symbol_for_is_shared() {
        let mut heap = Heap::new();
        let a = heap.symbol_for("app");
        let b = heap.symbol_for("app");
        let c = heap.create_symbol(Some("app"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_registered_symbol_is_not_a_weak_key() {
        let mut heap = Heap::new();
        let map = heap.create_weak_map();
        let registered = heap.symbol_for("shared");
        let local = heap.create_symbol(Some("local"));

        assert!(heap.weak_map_set(map, registered, 1).is_err());
        assert!(heap.weak_map_set(map, local, 1).is_ok());
    }

    #[test]
    fn test_map_delete_leaves_hole() {
        let mut heap = Heap::new();
        let map = heap.create_map();
        heap.map_set(map, "a", 1).unwrap();
        heap.map_set(map, "b", 2).unwrap();
        assert!(heap.map_delete(map, &Value::from("a")).unwrap());
        assert!(!heap.map_delete(map, &Value::from("a")).unwrap());

        let remaining = heap.object(map).unwrap().internals.entries_from(0);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].0, 1);
    }

    #[test]
    fn test_iterator_walks_set_and_finishes() {
        let mut heap = Heap::new();
        let set = heap.create_set();
        heap.set_add(set, "a").unwrap();
        heap.set_add(set, "b").unwrap();
        let it = heap.create_iterator(set, IterationKind::Values).unwrap();

        assert_eq!(heap.iterator_next(it).unwrap(), Some(Value::from("a")));
        heap.set_delete(set, &Value::from("b")).unwrap();
        assert_eq!(heap.iterator_next(it).unwrap(), None);
        assert_eq!(heap.iterator_next(it).unwrap(), None);
    }

    #[test]
    fn test_entries_iterator_allocates_pairs() {
        let mut heap = Heap::new();
        let map = heap.create_map();
        heap.map_set(map, "k", "v").unwrap();
        let it = heap.create_iterator(map, IterationKind::Entries).unwrap();

        let pair = heap.iterator_next(it).unwrap().and_then(|v| v.as_object()).unwrap();
        let internals = &heap.object(pair).unwrap().internals;
        assert_eq!(
            internals,
            &ObjectInternals::Array { elements: vec![Value::from("k"), Value::from("v")] }
        );
    }

    #[test]
    fn test_generator_cannot_be_stepped() {
        let mut heap = Heap::new();
        let generator = heap.create_generator("Generator");
        assert!(heap.iterator_next(generator).is_err());
    }

    #[test]
    fn test_unregister_removes_matching_cells() {
        let mut heap = Heap::new();
        let cleanup = heap.create_closure("cleanup", vec![], &[]).unwrap();
        let registry = heap.create_finalization_registry(cleanup).unwrap();
        let target = heap.create_object();
        let token = heap.create_object();

        heap.register(registry, target, "held", Some(token.into())).unwrap();
        assert!(heap.unregister(registry, token).unwrap());
        assert!(!heap.unregister(registry, token).unwrap());
    }

    #[test]
    fn test_register_rejects_target_as_held_value() {
        let mut heap = Heap::new();
        let cleanup = heap.create_closure("cleanup", vec![], &[]).unwrap();
        let registry = heap.create_finalization_registry(cleanup).unwrap();
        let target = heap.create_object();
        assert!(heap.register(registry, target, target, None).is_err());
    }

    #[test]
    fn test_drain_runs_nested_jobs() {
        let mut heap = Heap::new();
        let obj = heap.create_object();
        heap.queue_job(move |heap| {
            heap.set_property(obj, "first", true)?;
            heap.queue_job(move |heap| heap.set_property(obj, "second", true));
            Ok(())
        });

        assert_eq!(heap.drain_jobs().unwrap(), 2);
        assert_eq!(heap.pending_jobs(), 0);
        assert_eq!(heap.object(obj).unwrap().properties.len(), 2);
    }

    #[test]
    fn test_settle_releases_reactions() {
        let mut heap = Heap::new();
        let promise = heap.create_promise();
        let reaction = heap.create_closure("onFulfilled", vec![], &[]).unwrap();
        heap.promise_then(promise, reaction).unwrap();
        heap.settle_promise(promise, "done", true).unwrap();

        assert_eq!(
            heap.object(promise).unwrap().internals,
            ObjectInternals::Promise(PromiseState::Fulfilled(Value::from("done")))
        );
    }

    #[test]
    fn test_array_index_limit() {
        let mut heap = Heap::new();
        let array = heap.create_array(vec![]).unwrap();

        assert!(matches!(heap.array_set(array, usize::MAX, 1), Err(Error::HeapError(_))));
        assert!(matches!(heap.array_set(array, u32::MAX as usize, 1), Err(Error::HeapError(_))));
        heap.array_set(array, 2, 1).unwrap();

        let ObjectInternals::Array { elements } = &heap.object(array).unwrap().internals else {
            panic!("not an array");
        };
        assert_eq!(elements, &vec![Value::Undefined, Value::Undefined, Value::from(1)]);
    }

    #[test]
    fn test_failed_mutation_keeps_revision() {
        let mut heap = Heap::new();
        let target = heap.create_object();
        let handler = heap.create_object();
        let proxy = heap.create_proxy(target, handler).unwrap();
        let set = heap.create_set();
        let array = heap.create_array(vec![]).unwrap();

        let before = (heap.revision(proxy), heap.revision(set), heap.revision(array));
        assert!(heap.set_property(proxy, "x", 1).is_err());
        assert!(heap.map_set(set, 1, 2).is_err());
        assert!(heap.array_set(array, usize::MAX, 1).is_err());
        assert!(heap.iterator_next(set).is_err());
        assert_eq!((heap.revision(proxy), heap.revision(set), heap.revision(array)), before);

        heap.set_add(set, 1).unwrap();
        assert!(heap.revision(set) > before.1);
    }
}

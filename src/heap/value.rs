//! Heap values as seen by the engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Handle to an object in the inspected heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectRef(pub u32);

/// Handle to a symbol in the inspected heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolRef(pub u32);

/// Anything with reference identity: an object or a symbol.
///
/// The two handle spaces are disjoint, so `Object(ObjectRef(1))` and
/// `Symbol(SymbolRef(1))` are different keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HeapRef {
    Object(ObjectRef),
    Symbol(SymbolRef),
}

impl fmt::Display for HeapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapRef::Object(o) => write!(f, "object#{}", o.0),
            HeapRef::Symbol(s) => write!(f, "symbol#{}", s.0),
        }
    }
}

impl From<ObjectRef> for HeapRef {
    fn from(obj: ObjectRef) -> Self { HeapRef::Object(obj) }
}

impl From<SymbolRef> for HeapRef {
    fn from(sym: SymbolRef) -> Self { HeapRef::Symbol(sym) }
}

/// A heap value: primitives plus references.
///
/// Only `Object` and `Symbol` have identity; primitives never become graph
/// nodes and never carry edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Symbol(SymbolRef),
    Object(ObjectRef),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Object(_) => "object",
        }
    }

    /// The identity handle, if this value has one.
    pub fn as_heap_ref(&self) -> Option<HeapRef> {
        match self {
            Value::Object(o) => Some(HeapRef::Object(*o)),
            Value::Symbol(s) => Some(HeapRef::Symbol(*s)),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            Value::Object(o) => Some(*o),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        self.as_heap_ref().is_none()
    }

    /// SameValueZero: the equality Map and Set use for their keys.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => (a.is_nan() && b.is_nan()) || a == b,
            _ => self == other,
        }
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self { Value::Object(obj) }
}

impl From<SymbolRef> for Value {
    fn from(sym: SymbolRef) -> Self { Value::Symbol(sym) }
}

impl From<HeapRef> for Value {
    fn from(r: HeapRef) -> Self {
        match r {
            HeapRef::Object(o) => Value::Object(o),
            HeapRef::Symbol(s) => Value::Symbol(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Bool(b) }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self { Value::Number(n) }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self { Value::Number(n as f64) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::String(s.to_string()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::String(s) }
}

/// An own-property key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKey {
    String(String),
    Symbol(SymbolRef),
}

impl PropertyKey {
    /// Canonical array index (`"0"`, `"17"`, not `"01"` or `"4294967295"`).
    pub fn as_array_index(&self) -> Option<u32> {
        let PropertyKey::String(s) = self else { return None };
        if s.is_empty() || (s.len() > 1 && s.starts_with('0')) {
            return None;
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match s.parse::<u32>() {
            Ok(idx) if idx != u32::MAX => Some(idx),
            _ => None,
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self { PropertyKey::String(s.to_string()) }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self { PropertyKey::String(s) }
}

impl From<SymbolRef> for PropertyKey {
    fn from(sym: SymbolRef) -> Self { PropertyKey::Symbol(sym) }
}

//! Engine-visible values.
//!
//! Host data enters the engine as [`Value`], a small dynamic type covering
//! scalars, sequences, mappings, lazily computed slots, and capability-bearing
//! host objects ("drops"). Plain data converts from [`serde_json::Value`], so
//! anything a host can serialize can be handed to a render call.
//!
//! Values are `Send + Sync`, so a parsed template carrying accumulated
//! assigns can move between threads; per-render state still belongs to one
//! [`Context`] at a time.
//!
//! # Laziness
//!
//! A [`Value::Lazy`] wraps a zero-argument computation behind a shared
//! compute-once cell. Resolution forces the cell when a scope slot or a
//! bracketed member is read, and the result is memoized for every clone of
//! the value; a plain member read invokes the computation without committing
//! the result.
//!
//! # Drops
//!
//! A drop is any host type implementing [`DropObject`]. Instead of probing a
//! value's shape at runtime, the resolution engine goes through the trait's
//! explicit capabilities: field computation, field membership, projection to
//! a plain value, and a context back-reference hook.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::context::Context;

/// A host object exposed to templates through explicit capabilities.
///
/// All methods except [`get_field`](Self::get_field) have permissive
/// defaults: every field name is considered present, no projection is
/// offered, and the context hook does nothing.
pub trait DropObject: Send + Sync {
    /// Computes the value of a named field. Unknown fields resolve to
    /// [`Value::Nil`].
    fn get_field(&self, name: &str) -> Value;

    /// Membership test for field names. Defaults to accepting everything.
    fn has_field(&self, _name: &str) -> bool {
        true
    }

    /// Projects the drop into a plain engine value, if it has one.
    fn to_value(&self) -> Option<Value> {
        None
    }

    /// Receives a back-reference to the context the drop was resolved in.
    fn bind_context(&self, _context: &Context) {}
}

/// A zero-argument computation with a shared compute-once cell.
///
/// Cloning a `LazyValue` shares the cell, so forcing any clone memoizes the
/// result for all of them.
#[derive(Clone)]
pub struct LazyValue {
    thunk: Arc<dyn Fn() -> Value + Send + Sync>,
    cell: Arc<Mutex<Option<Value>>>,
}

impl LazyValue {
    pub fn new(thunk: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Self {
            thunk: Arc::new(thunk),
            cell: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the memoized result, or runs the computation without
    /// committing the result to the cell.
    pub fn invoke(&self) -> Value {
        if let Some(cached) = self.cell.lock().expect("lazy cell poisoned").as_ref() {
            return cached.clone();
        }
        (self.thunk)()
    }

    /// Returns the memoized result, computing and committing it on first use.
    pub fn force(&self) -> Value {
        if let Some(cached) = self.cell.lock().expect("lazy cell poisoned").as_ref() {
            return cached.clone();
        }
        let computed = (self.thunk)();
        *self.cell.lock().expect("lazy cell poisoned") = Some(computed.clone());
        computed
    }
}

impl fmt::Debug for LazyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.lock().expect("lazy cell poisoned").as_ref() {
            Some(v) => write!(f, "LazyValue(cached: {:?})", v),
            None => write!(f, "LazyValue(pending)"),
        }
    }
}

/// A dynamically typed engine value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    Lazy(LazyValue),
    Drop(Arc<dyn DropObject>),
}

impl Value {
    /// Wraps a zero-argument computation; see [`LazyValue`].
    pub fn lazy(thunk: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Value::Lazy(LazyValue::new(thunk))
    }

    /// Wraps a host object; see [`DropObject`].
    pub fn drop_object(object: impl DropObject + 'static) -> Self {
        Value::Drop(Arc::new(object))
    }

    /// Truthiness for conditions: `Nil`, `false`, `0`, `0.0` and `""` are
    /// false, everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Numeric view used by comparison operators and loop attributes.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(n) => Some(*n as i64),
            Value::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// The string form used when a resolved value addresses a mapping key.
    pub(crate) fn as_key(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.to_output(),
        }
    }

    /// The textual form a value takes in rendered output. `Nil` renders as
    /// the empty string, never as a literal word.
    pub fn to_output(&self) -> String {
        match self {
            Value::Nil => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::Str(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(Value::to_output)
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => {
                let mut out = String::new();
                self.write_json(&mut out);
                out
            }
            Value::Lazy(lazy) => lazy.invoke().to_output(),
            Value::Drop(drop) => match drop.to_value() {
                Some(projected) => projected.to_output(),
                None => String::new(),
            },
        }
    }

    fn write_json(&self, out: &mut String) {
        match self {
            Value::Nil => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Int(n) => out.push_str(&n.to_string()),
            Value::Float(n) => out.push_str(&n.to_string()),
            Value::Str(s) => {
                out.push('"');
                for c in s.chars() {
                    match c {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        c => out.push(c),
                    }
                }
                out.push('"');
            }
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_json(out);
                }
                out.push(']');
            }
            Value::Object(map) => {
                out.push('{');
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    Value::Str(key.clone()).write_json(out);
                    out.push_str(": ");
                    value.write_json(out);
                }
                out.push('}');
            }
            Value::Lazy(_) | Value::Drop(_) => out.push_str("null"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(n) => write!(f, "Int({})", n),
            Value::Float(n) => write!(f, "Float({})", n),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Object(map) => f.debug_tuple("Object").field(map).finish(),
            Value::Lazy(lazy) => lazy.fmt(f),
            Value::Drop(_) => write!(f, "Drop(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Drop(a), Value::Drop(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Object(map)
    }
}

impl From<&serde_json::Value> for Value {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::from(&v)
    }
}

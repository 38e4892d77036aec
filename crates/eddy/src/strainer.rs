//! Filter registration and dispatch.
//!
//! Filters are plain functions over value slices: the running value arrives
//! first, explicit arguments follow. A [`Strainer`] is the per-context
//! dispatch table, assembled from the process-wide registry when the
//! context is built and optionally extended per render.
//!
//! Dispatch is deliberately permissive: a filter name nobody registered
//! passes its input through unchanged. This mirrors the engine's resolution
//! rules (missing variables are nil) and contrasts with comparison
//! operators, which fail hard on unknown names.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::value::Value;

/// A filter implementation. `args[0]` is the running value; the rest are
/// the filter's explicit arguments, already resolved against the context.
pub type FilterFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Name → filter mapping, used both for registration and per-render merges.
pub type FilterMap = HashMap<String, FilterFn>;

/// Wraps a closure as a [`FilterFn`].
pub fn filter_fn(f: impl Fn(&[Value]) -> Value + Send + Sync + 'static) -> FilterFn {
    Arc::new(f)
}

/// Per-context filter dispatch table.
#[derive(Clone)]
pub struct Strainer {
    filters: FilterMap,
}

impl Strainer {
    /// Builds a strainer from the process-wide filter registry.
    pub(crate) fn from_global() -> Self {
        Self {
            filters: FILTERS.read().expect("filter registry poisoned").clone(),
        }
    }

    pub(crate) fn add_all(&mut self, filters: &FilterMap) {
        for (name, f) in filters {
            self.filters.insert(name.clone(), Arc::clone(f));
        }
    }

    pub fn knows(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Invokes a filter by name. Unknown names are the identity: the first
    /// argument (or nil when there is none) comes back unchanged.
    pub fn invoke(&self, name: &str, args: &[Value]) -> Value {
        match self.filters.get(name) {
            Some(f) => f(args),
            None => args.first().cloned().unwrap_or(Value::Nil),
        }
    }
}

static FILTERS: Lazy<RwLock<FilterMap>> = Lazy::new(|| RwLock::new(builtin_filters()));

/// Merges filters into the process-wide registry, effective for every
/// context built afterwards.
pub fn register_filter(filters: FilterMap) {
    FILTERS
        .write()
        .expect("filter registry poisoned")
        .extend(filters);
}

/// HTML-escapes `&`, `<`, `>` and `"`, in that order.
fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn builtin_filters() -> FilterMap {
    let mut filters = FilterMap::new();

    filters.insert(
        "html".to_string(),
        filter_fn(|args| {
            let text = args.first().map(Value::to_output).unwrap_or_default();
            Value::Str(escape_html(&text))
        }),
    );

    filters.insert(
        "upcase".to_string(),
        filter_fn(|args| {
            let text = args.first().map(Value::to_output).unwrap_or_default();
            Value::Str(text.to_uppercase())
        }),
    );

    filters.insert(
        "downcase".to_string(),
        filter_fn(|args| {
            let text = args.first().map(Value::to_output).unwrap_or_default();
            Value::Str(text.to_lowercase())
        }),
    );

    filters.insert(
        "capitalize".to_string(),
        filter_fn(|args| {
            let text = args.first().map(Value::to_output).unwrap_or_default();
            let mut chars = text.chars();
            let capitalized = match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            };
            Value::Str(capitalized)
        }),
    );

    filters.insert(
        "strip".to_string(),
        filter_fn(|args| {
            let text = args.first().map(Value::to_output).unwrap_or_default();
            Value::Str(text.trim().to_string())
        }),
    );

    filters.insert(
        "size".to_string(),
        filter_fn(|args| match args.first() {
            Some(Value::Array(items)) => items.len().into(),
            Some(Value::Object(map)) => map.len().into(),
            Some(Value::Str(s)) => s.chars().count().into(),
            Some(other) => other.to_output().chars().count().into(),
            None => Value::Int(0),
        }),
    );

    filters.insert(
        "join".to_string(),
        filter_fn(|args| {
            let glue = match args.get(1) {
                Some(v) => v.to_output(),
                None => ", ".to_string(),
            };
            match args.first() {
                Some(Value::Array(items)) => Value::Str(
                    items
                        .iter()
                        .map(Value::to_output)
                        .collect::<Vec<_>>()
                        .join(&glue),
                ),
                Some(other) => other.clone(),
                None => Value::Nil,
            }
        }),
    );

    filters.insert(
        "first".to_string(),
        filter_fn(|args| match args.first() {
            Some(Value::Array(items)) => items.first().cloned().unwrap_or(Value::Nil),
            Some(Value::Str(s)) => s
                .chars()
                .next()
                .map(|c| Value::Str(c.to_string()))
                .unwrap_or(Value::Nil),
            _ => Value::Nil,
        }),
    );

    filters.insert(
        "last".to_string(),
        filter_fn(|args| match args.first() {
            Some(Value::Array(items)) => items.last().cloned().unwrap_or(Value::Nil),
            Some(Value::Str(s)) => s
                .chars()
                .last()
                .map(|c| Value::Str(c.to_string()))
                .unwrap_or(Value::Nil),
            _ => Value::Nil,
        }),
    );

    filters
}

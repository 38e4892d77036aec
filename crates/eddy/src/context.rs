//! Render context: scope stack, registers, and expression resolution.
//!
//! A [`Context`] carries all mutable render state. The scope stack grows
//! inward: index 0 is the innermost, most recently pushed scope; the last
//! entry is the root scope the context was created with. Lookup walks
//! scopes innermost-out on an *existence* check, so a name bound to `nil`
//! or `false` in an inner scope still shadows an outer binding.
//!
//! The registers bag holds auxiliary state that crosses node boundaries —
//! loop pagination cursors live in `registers["for"]` — and survives for as
//! long as the context itself. Reusing one context across renders is what
//! makes `offset: continue` pagination resume.
//!
//! # Expression grammar
//!
//! [`Context::resolve`] maps an expression to a value:
//!
//! | Expression | Result |
//! |---|---|
//! | `nil`, `null`, empty | nil |
//! | `true`, `false` | boolean |
//! | `blank`, `empty` | empty string |
//! | `'...'`, `"..."` | string literal |
//! | digits | integer |
//! | digit-led with `.` separators | float |
//! | anything else | variable path lookup |
//!
//! Variable paths mix word parts and bracketed sub-expressions:
//! `users[0].name`, `map[key]`, `settings["theme"]`. A bracketed first part
//! is resolved first and names the root dynamically. Unresolvable paths
//! yield nil, never an error.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::strainer::{FilterMap, Strainer};
use crate::value::Value;

/// One name → value mapping in the scope stack.
pub type Scope = HashMap<String, Value>;

static PATH_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]+\]|(?:[\w-]\??)+").expect("path part pattern"));
static INT_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("int pattern"));
static FLOAT_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d[\d.]+$").expect("float pattern"));

/// Per-render state: scope stack, registers, and filter dispatch.
pub struct Context {
    scopes: Vec<Scope>,
    registers: HashMap<String, Value>,
    strainer: Strainer,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::with_parts(Scope::new(), HashMap::new())
    }

    pub fn with_assigns(assigns: Scope) -> Self {
        Self::with_parts(assigns, HashMap::new())
    }

    /// Builds a context from a root scope and a seeded registers bag. The
    /// filter dispatch table is assembled from the process-wide filter
    /// registry at this point.
    pub fn with_parts(assigns: Scope, registers: HashMap<String, Value>) -> Self {
        Self {
            scopes: vec![assigns],
            registers,
            strainer: Strainer::from_global(),
        }
    }

    /// Resolves an expression; alias for [`resolve`](Self::resolve).
    pub fn get(&mut self, expression: &str) -> Value {
        self.resolve(expression)
    }

    /// Binds a name in the innermost scope.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.scopes[0].insert(name.into(), value);
    }

    /// Binds a name in the root scope, surviving every scope pop.
    pub fn set_root(&mut self, name: impl Into<String>, value: Value) {
        self.scopes
            .last_mut()
            .expect("context always has a root scope")
            .insert(name.into(), value);
    }

    /// Copies bindings into the innermost scope.
    pub fn merge(&mut self, bindings: Scope) {
        self.scopes[0].extend(bindings);
    }

    /// Truthiness of a resolved expression.
    pub fn has_key(&mut self, expression: &str) -> bool {
        self.resolve(expression).is_truthy()
    }

    pub fn push_scope(&mut self) {
        self.scopes.insert(0, Scope::new());
    }

    /// Pops the innermost scope. Popping the root scope is a logic error in
    /// whatever tag drove the context there, not a recoverable condition.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() == 1 {
            panic!("context stack error: cannot pop the root scope");
        }
        self.scopes.remove(0);
    }

    /// Runs `body` inside one freshly pushed scope, popping it afterwards.
    pub fn stack<R>(&mut self, body: impl FnOnce(&mut Context) -> R) -> R {
        self.push_scope();
        let result = body(self);
        self.pop_scope();
        result
    }

    pub fn registers(&self) -> &HashMap<String, Value> {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut HashMap<String, Value> {
        &mut self.registers
    }

    /// Dispatches a filter through this context's strainer. Unknown filter
    /// names pass the first argument through unchanged.
    pub fn invoke_filter(&self, name: &str, args: &[Value]) -> Value {
        self.strainer.invoke(name, args)
    }

    /// Merges additional filters into this context's dispatch table.
    pub fn add_filters(&mut self, filters: &FilterMap) {
        self.strainer.add_all(filters);
    }

    /// Resolves an expression to a value; see the module docs for the
    /// literal table. Anything that is not a literal is a variable path.
    pub fn resolve(&mut self, expression: &str) -> Value {
        match expression {
            "nil" | "null" | "" => return Value::Nil,
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            "blank" | "empty" => return Value::Str(String::new()),
            _ => {}
        }
        if let Some(inner) = strip_quotes(expression) {
            return Value::Str(inner.to_string());
        }
        if INT_LITERAL.is_match(expression) {
            return match expression.parse::<i64>() {
                Ok(n) => Value::Int(n),
                Err(_) => Value::Float(parse_float_prefix(expression)),
            };
        }
        if FLOAT_LITERAL.is_match(expression) {
            return Value::Float(parse_float_prefix(expression));
        }
        self.variable(expression)
    }

    /// Resolves a variable path: root lookup in the scope stack, then a
    /// descent through the remaining parts. Any part that fails makes the
    /// whole path nil and stops the traversal.
    pub fn variable(&mut self, path: &str) -> Value {
        let parts: Vec<&str> = PATH_PART.find_iter(path).map(|m| m.as_str()).collect();
        let Some((first, rest)) = parts.split_first() else {
            return Value::Nil;
        };

        // A bracketed first part names the root dynamically.
        let root = match bracket_inner(first) {
            Some(inner) => self.resolve(inner).as_key(),
            None => (*first).to_string(),
        };
        let mut current = self.find_variable(&root);

        for part in rest {
            if matches!(current, Value::Nil) {
                return Value::Nil;
            }
            current = self.descend(current, part);
            if let Value::Drop(drop) = &current {
                drop.bind_context(self);
            }
        }
        current
    }

    /// Scans scopes innermost-out for the first one *defining* the name.
    /// A lazy slot is forced and the result memoized back into the scope;
    /// the found value then has its projection and context hook applied.
    fn find_variable(&mut self, name: &str) -> Value {
        let mut found = None;
        for scope in &mut self.scopes {
            if let Some(slot) = scope.get_mut(name) {
                let forced = match &*slot {
                    Value::Lazy(lazy) => Some(lazy.force()),
                    _ => None,
                };
                if let Some(computed) = forced {
                    *slot = computed;
                }
                found = Some(slot.clone());
                break;
            }
        }
        let Some(mut value) = found else {
            return Value::Nil;
        };
        if let Value::Drop(drop) = &value {
            if let Some(projected) = drop.to_value() {
                value = projected;
            }
        }
        if let Value::Drop(drop) = &value {
            drop.bind_context(self);
        }
        value
    }

    /// One step of path descent.
    fn descend(&mut self, current: Value, part: &str) -> Value {
        if let Some(inner) = bracket_inner(part) {
            let key = self.resolve(inner);
            return project(index_into(&current, &key));
        }
        match &current {
            Value::Object(map) => {
                if let Some(member) = map.get(part) {
                    let value = match member {
                        // A plain member read invokes without memoizing.
                        Value::Lazy(lazy) => lazy.invoke(),
                        other => other.clone(),
                    };
                    return project(value);
                }
            }
            Value::Drop(drop) => {
                if drop.has_field(part) {
                    return project(drop.get_field(part));
                }
            }
            Value::Array(items) => {
                if let Ok(index) = part.parse::<usize>() {
                    let value = match items.get(index) {
                        Some(Value::Lazy(lazy)) => lazy.invoke(),
                        Some(other) => other.clone(),
                        None => Value::Nil,
                    };
                    return project(value);
                }
            }
            Value::Str(s) => {
                if let Ok(index) = part.parse::<usize>() {
                    return match s.chars().nth(index) {
                        Some(c) => Value::Str(c.to_string()),
                        None => Value::Nil,
                    };
                }
            }
            _ => {}
        }
        introspect(&current, part)
    }
}

/// Brackets index into the current value with a resolved key; a lazy member
/// addressed this way is forced and memoized.
fn index_into(current: &Value, key: &Value) -> Value {
    match current {
        Value::Object(map) => match map.get(&key.as_key()) {
            Some(Value::Lazy(lazy)) => lazy.force(),
            Some(other) => other.clone(),
            None => Value::Nil,
        },
        Value::Array(items) => match key.as_int() {
            Some(i) if i >= 0 => match items.get(i as usize) {
                Some(Value::Lazy(lazy)) => lazy.force(),
                Some(other) => other.clone(),
                None => Value::Nil,
            },
            _ => Value::Nil,
        },
        Value::Str(s) => match key.as_int() {
            Some(i) if i >= 0 => match s.chars().nth(i as usize) {
                Some(c) => Value::Str(c.to_string()),
                None => Value::Nil,
            },
            _ => Value::Nil,
        },
        Value::Drop(drop) => {
            let name = key.as_key();
            if drop.has_field(&name) {
                drop.get_field(&name)
            } else {
                Value::Nil
            }
        }
        _ => Value::Nil,
    }
}

/// The fixed introspection names usable on any collection-like value.
fn introspect(current: &Value, part: &str) -> Value {
    match part {
        "length" | "size" => match current {
            Value::Array(items) => items.len().into(),
            Value::Str(s) => s.chars().count().into(),
            Value::Object(map) => map.len().into(),
            _ => Value::Nil,
        },
        "first" => match current {
            Value::Array(items) => items.first().cloned().unwrap_or(Value::Nil),
            _ => Value::Nil,
        },
        "last" => match current {
            Value::Array(items) => items.last().cloned().unwrap_or(Value::Nil),
            _ => Value::Nil,
        },
        _ => Value::Nil,
    }
}

fn project(value: Value) -> Value {
    if let Value::Drop(drop) = &value {
        if let Some(projected) = drop.to_value() {
            return projected;
        }
    }
    value
}

fn bracket_inner(part: &str) -> Option<&str> {
    part.strip_prefix('[')?.strip_suffix(']')
}

fn strip_quotes(expression: &str) -> Option<&str> {
    if expression.len() < 2 {
        return None;
    }
    for quote in ['\'', '"'] {
        if let Some(inner) = expression
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Some(inner);
        }
    }
    None
}

/// Longest leading numeric prefix with at most one decimal separator,
/// matching the original engine's permissive float parse.
fn parse_float_prefix(literal: &str) -> f64 {
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in literal.char_indices() {
        match c {
            '0'..='9' => end = i + 1,
            '.' if !seen_dot => {
                seen_dot = true;
                end = i + 1;
            }
            _ => break,
        }
    }
    literal[..end].parse().unwrap_or(0.0)
}

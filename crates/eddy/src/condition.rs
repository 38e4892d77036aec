//! Condition chains for `if`/`elsif` clauses.
//!
//! A clause's markup splits on whole-word `and`/`or` boundaries and the
//! fragments fold together from the right: the rightmost fragment is the
//! base condition and each fragment to its left wraps what came before.
//! Mixed chains therefore nest right-to-left literally — `a and b or c`
//! means `a and (b or c)` — rather than following conventional operator
//! precedence. That construction order is part of the language's observed
//! behavior and is kept as-is.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::Context;
use crate::error::{ParseError, RenderError};
use crate::value::Value;

static BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(and|or)\b").expect("boundary pattern"));
static EXPRESSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*("[^"]+"|'[^']+'|[^\s,|]+)\s*([=!<>A-Za-z_]+)?\s*("[^"]+"|'[^']+'|[^\s,|]+)?"#)
        .expect("expression pattern")
});

/// How a condition combines with its child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    And,
    Or,
}

/// One node of a condition chain.
#[derive(Debug, Clone)]
pub enum Condition {
    Comparison {
        left: String,
        operator: Option<String>,
        right: Option<String>,
        child: Option<(Relation, Box<Condition>)>,
    },
    /// The `else` clause: always true, no comparison, no chaining.
    Else,
}

impl Condition {
    /// Parses a clause's full markup into a chain; see the module docs for
    /// the fold order.
    pub fn parse_chain(tag: &str, markup: &str) -> Result<Self, ParseError> {
        let mut fragments = Vec::new();
        let mut relations = Vec::new();
        let mut last = 0;
        for m in BOUNDARY.find_iter(markup) {
            fragments.push(&markup[last..m.start()]);
            relations.push(match m.as_str() {
                "and" => Relation::And,
                _ => Relation::Or,
            });
            last = m.end();
        }
        fragments.push(&markup[last..]);

        let mut condition = Self::parse_single(tag, fragments.pop().expect("one fragment"))?;
        while let Some(relation) = relations.pop() {
            let fragment = fragments.pop().expect("fragment per relation");
            let mut wrapper = Self::parse_single(tag, fragment)?;
            wrapper.set_child(relation, condition);
            condition = wrapper;
        }
        Ok(condition)
    }

    fn parse_single(tag: &str, fragment: &str) -> Result<Self, ParseError> {
        let caps = EXPRESSION
            .captures(fragment)
            .filter(|c| c.get(1).is_some())
            .ok_or_else(|| ParseError::TagSyntax {
                tag: tag.to_string(),
                usage: format!("{} [expression]", tag),
            })?;
        Ok(Condition::Comparison {
            left: caps.get(1).expect("left group").as_str().to_string(),
            operator: caps.get(2).map(|m| m.as_str().to_string()),
            right: caps.get(3).map(|m| m.as_str().to_string()),
            child: None,
        })
    }

    fn set_child(&mut self, relation: Relation, condition: Condition) {
        if let Condition::Comparison { child, .. } = self {
            *child = Some((relation, Box::new(condition)));
        }
    }

    /// Evaluates the chain. `or` short-circuits its child when the local
    /// result is already true; `and` always evaluates the local result and
    /// skips the child only when it is false.
    pub fn evaluate(&self, context: &mut Context) -> Result<bool, RenderError> {
        match self {
            Condition::Else => Ok(true),
            Condition::Comparison {
                left,
                operator,
                right,
                child,
            } => {
                let local = interpret(left, operator.as_deref(), right.as_deref(), context)?;
                match child {
                    Some((Relation::Or, next)) => {
                        if local {
                            Ok(true)
                        } else {
                            next.evaluate(context)
                        }
                    }
                    Some((Relation::And, next)) => {
                        if local {
                            next.evaluate(context)
                        } else {
                            Ok(false)
                        }
                    }
                    None => Ok(local),
                }
            }
        }
    }
}

fn interpret(
    left: &str,
    operator: Option<&str>,
    right: Option<&str>,
    context: &mut Context,
) -> Result<bool, RenderError> {
    let Some(operator) = operator else {
        return Ok(context.resolve(left).is_truthy());
    };
    let left = context.resolve(left);
    let right = match right {
        Some(expr) => context.resolve(expr),
        None => Value::Nil,
    };
    apply_operator(operator, &left, &right)
}

fn apply_operator(operator: &str, left: &Value, right: &Value) -> Result<bool, RenderError> {
    let result = match operator {
        "==" | "=" => left == right,
        "!=" | "<>" => left != right,
        "<" => ordering(left, right).map(|o| o.is_lt()).unwrap_or(false),
        ">" => ordering(left, right).map(|o| o.is_gt()).unwrap_or(false),
        "<=" => ordering(left, right).map(|o| o.is_le()).unwrap_or(false),
        ">=" => ordering(left, right).map(|o| o.is_ge()).unwrap_or(false),
        "contains" => contains(left, right),
        "hasKey" => has_key(left, right),
        "hasValue" => has_value(left, right),
        unknown => return Err(RenderError::UnknownOperator(unknown.to_string())),
    };
    Ok(result)
}

fn ordering(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    if let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) {
        return l.partial_cmp(&r);
    }
    if let (Value::Str(l), Value::Str(r)) = (left, right) {
        return Some(l.cmp(r));
    }
    None
}

fn contains(left: &Value, right: &Value) -> bool {
    match left {
        Value::Str(haystack) => haystack.contains(&right.to_output()),
        Value::Array(items) => items.contains(right),
        _ => false,
    }
}

fn has_key(left: &Value, right: &Value) -> bool {
    match left {
        Value::Object(map) => map.contains_key(&right.as_key()),
        _ => false,
    }
}

// Index-membership, as the original engine evaluated it: keys for mappings,
// index bounds for sequences.
fn has_value(left: &Value, right: &Value) -> bool {
    match left {
        Value::Object(map) => map.contains_key(&right.as_key()),
        Value::Array(items) => match right.as_int() {
            Some(i) => i >= 0 && (i as usize) < items.len(),
            None => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Scope;
    use std::collections::BTreeMap;

    fn context_with(pairs: &[(&str, Value)]) -> Context {
        let mut assigns = Scope::new();
        for (name, value) in pairs {
            assigns.insert((*name).to_string(), value.clone());
        }
        Context::with_assigns(assigns)
    }

    fn eval(markup: &str, pairs: &[(&str, Value)]) -> Result<bool, RenderError> {
        let condition = Condition::parse_chain("if", markup).unwrap();
        condition.evaluate(&mut context_with(pairs))
    }

    #[test]
    fn equality_and_inequality() {
        assert!(eval("a == b", &[("a", Value::Int(1)), ("b", Value::Int(1))]).unwrap());
        assert!(!eval("a == b", &[("a", Value::Int(1)), ("b", Value::Int(2))]).unwrap());
        assert!(eval("a != b", &[("a", Value::Int(1)), ("b", Value::Int(2))]).unwrap());
        assert!(eval("a <> b", &[("a", Value::Int(1)), ("b", Value::Int(2))]).unwrap());
        assert!(eval("a = b", &[("a", Value::Int(3)), ("b", Value::Int(3))]).unwrap());
    }

    #[test]
    fn orderings() {
        assert!(eval("a < 5", &[("a", Value::Int(3))]).unwrap());
        assert!(eval("a >= 3", &[("a", Value::Int(3))]).unwrap());
        assert!(eval("a > 2.5", &[("a", Value::Int(3))]).unwrap());
        assert!(!eval("a > 5", &[("a", Value::Int(3))]).unwrap());
    }

    #[test]
    fn string_orderings_are_lexicographic() {
        assert!(eval("a < b", &[("a", Value::from("apple")), ("b", Value::from("banana"))])
            .unwrap());
    }

    #[test]
    fn bare_expression_uses_truthiness() {
        assert!(eval("true", &[]).unwrap());
        assert!(!eval("false", &[]).unwrap());
        assert!(!eval("missing", &[]).unwrap());
        assert!(eval("x", &[("x", Value::from("set"))]).unwrap());
        assert!(!eval("x", &[("x", Value::Int(0))]).unwrap());
    }

    #[test]
    fn contains_on_strings_and_arrays() {
        assert!(eval(
            "word contains 'ell'",
            &[("word", Value::from("hello"))]
        )
        .unwrap());
        let items = Value::Array(vec![Value::Int(1), Value::Int(2)]);
        assert!(eval("items contains 2", &[("items", items.clone())]).unwrap());
        assert!(!eval("items contains 5", &[("items", items)]).unwrap());
    }

    #[test]
    fn key_membership_operators() {
        let mut map = BTreeMap::new();
        map.insert("k".to_string(), Value::Int(1));
        let object = Value::Object(map);
        assert!(eval("m hasKey 'k'", &[("m", object.clone())]).unwrap());
        assert!(!eval("m hasKey 'q'", &[("m", object.clone())]).unwrap());
        assert!(eval("m hasValue 'k'", &[("m", object)]).unwrap());
        let items = Value::Array(vec![Value::from("x")]);
        assert!(eval("items hasValue 0", &[("items", items.clone())]).unwrap());
        assert!(!eval("items hasValue 1", &[("items", items)]).unwrap());
    }

    #[test]
    fn unknown_operator_fails_hard() {
        let err = eval("a sortof b", &[]).unwrap_err();
        assert!(matches!(err, RenderError::UnknownOperator(op) if op == "sortof"));
    }

    #[test]
    fn and_chain() {
        assert!(eval("true and true", &[]).unwrap());
        assert!(!eval("true and false", &[]).unwrap());
        assert!(!eval("false and true", &[]).unwrap());
    }

    #[test]
    fn or_chain() {
        assert!(eval("false or true", &[]).unwrap());
        assert!(!eval("false or false", &[]).unwrap());
    }

    #[test]
    fn mixed_chain_nests_from_the_right() {
        // a and (b or c): the right-to-left fold binds `or` tighter here.
        assert!(eval("true and false or true", &[]).unwrap());
        assert!(!eval("false and true or true", &[]).unwrap());
        // (a or (b and c)) with a true: short-circuits without the child.
        assert!(eval("true or false and false", &[]).unwrap());
    }

    #[test]
    fn or_short_circuit_skips_bad_child_operator() {
        // The child chain has an unknown operator, but a true local result
        // short-circuits before it is interpreted.
        assert!(eval("true or a sortof b", &[]).unwrap());
        assert!(eval("false and a sortof b", &[]).unwrap() == false);
    }

    #[test]
    fn empty_markup_is_a_syntax_error() {
        let err = Condition::parse_chain("if", "   ").unwrap_err();
        assert!(matches!(err, ParseError::TagSyntax { tag, .. } if tag == "if"));
    }

    #[test]
    fn else_is_always_true() {
        let mut ctx = Context::new();
        assert!(Condition::Else.evaluate(&mut ctx).unwrap());
    }
}

//! `{% for item in collection (limit: n) (offset: n|continue) %}`.
//!
//! Iterates a resolved collection, binding the loop variable and a
//! `forloop` metadata mapping inside one scope that wraps every iteration.
//!
//! # Pagination
//!
//! With a `limit` or `offset` attribute the loop renders a window of the
//! collection and stores a continuation cursor in `registers["for"]` under
//! the loop's signature (`var-collection`). A later loop over the same
//! names with `offset: continue` — in a context that survived the first
//! render — resumes from that cursor. The stored cursor is
//! `offset + limit + 1`, so a continued loop skips one element past the
//! rendered window; that offset arithmetic is part of the language's
//! observed pagination behavior.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::Context;
use crate::error::{ParseError, RenderError};
use crate::nodes::{render_all, Node};
use crate::parse::{parse_block_body, TokenStream};
use crate::registry::TagRegistry;
use crate::value::Value;

static SYNTAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\w+)\s+in\s+((?:\(?[\w\-.\[\]]\)?)+)").expect("for pattern")
});
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\w+)\s*:\s*("[^"]+"|'[^']+'|[^\s,|]+)"#).expect("attribute pattern")
});

#[derive(Debug)]
pub struct ForBlock {
    variable_name: String,
    collection_name: String,
    /// Pagination key: `var-collection`.
    signature: String,
    attributes: Vec<(String, String)>,
    nodes: Vec<Node>,
}

pub fn construct(
    _name: &str,
    markup: &str,
    stream: &mut TokenStream<'_>,
    registry: &TagRegistry,
) -> Result<Node, ParseError> {
    let caps = SYNTAX.captures(markup).ok_or_else(|| ParseError::TagSyntax {
        tag: "for".to_string(),
        usage: "for [item] in [collection]".to_string(),
    })?;
    let variable_name = caps.get(1).expect("variable group").as_str().to_string();
    let collection_name = caps.get(2).expect("collection group").as_str().to_string();
    let attributes = ATTRIBUTE
        .captures_iter(markup)
        .map(|c| {
            (
                c.get(1).expect("attr name").as_str().to_string(),
                c.get(2).expect("attr value").as_str().to_string(),
            )
        })
        .collect();
    let nodes = parse_block_body(stream, registry, "for")?;
    Ok(Node::For(ForBlock {
        signature: format!("{}-{}", variable_name, collection_name),
        variable_name,
        collection_name,
        attributes,
        nodes,
    }))
}

impl ForBlock {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Reads this loop's stored continuation cursor.
    fn stored_cursor(&self, context: &Context) -> usize {
        let Some(Value::Object(loops)) = context.registers().get("for") else {
            return 0;
        };
        loops
            .get(&self.signature)
            .and_then(Value::as_int)
            .map(|n| n.max(0) as usize)
            .unwrap_or(0)
    }

    fn store_cursor(&self, context: &mut Context, cursor: usize) {
        let loops = context
            .registers_mut()
            .entry("for".to_string())
            .or_insert_with(|| Value::Object(BTreeMap::new()));
        if let Value::Object(map) = loops {
            map.insert(self.signature.clone(), cursor.into());
        }
    }

    pub(crate) fn render(&self, context: &mut Context, out: &mut String) -> Result<(), RenderError> {
        let collection = match context.get(&self.collection_name) {
            Value::Array(items) => items,
            _ => Vec::new(),
        };
        let total = collection.len();

        let (start, end) = if self.attribute("limit").is_some() || self.attribute("offset").is_some()
        {
            let offset = match self.attribute("offset") {
                Some("continue") => self.stored_cursor(context),
                Some(expr) => context
                    .get(expr)
                    .as_int()
                    .map(|n| n.max(0) as usize)
                    .unwrap_or(0),
                None => 0,
            };
            // A resolved limit of zero counts as no limit at all.
            let limit = self
                .attribute("limit")
                .and_then(|expr| context.get(expr).as_int())
                .filter(|n| *n > 0)
                .map(|n| n as usize);

            let start = offset.min(total);
            let (end, cursor) = match limit {
                Some(limit) => ((offset + limit).min(total), offset + limit + 1),
                None => (total, total),
            };
            self.store_cursor(context, cursor);
            (start, end.max(start))
        } else {
            (0, total)
        };

        let segment = &collection[start..end];
        if segment.is_empty() {
            return Ok(());
        }

        context.stack(|ctx| {
            let length = segment.len();
            for (index, item) in segment.iter().enumerate() {
                ctx.set(self.variable_name.clone(), item.clone());
                ctx.set("forloop", self.forloop_metadata(length, index));
                render_all(&self.nodes, ctx, out)?;
            }
            Ok(())
        })
    }

    fn forloop_metadata(&self, length: usize, index: usize) -> Value {
        let mut meta = BTreeMap::new();
        meta.insert("name".to_string(), Value::from(self.signature.clone()));
        meta.insert("length".to_string(), length.into());
        meta.insert("index".to_string(), (index + 1).into());
        meta.insert("index0".to_string(), index.into());
        meta.insert("rindex".to_string(), (length - index).into());
        meta.insert("rindex0".to_string(), (length - index - 1).into());
        meta.insert("first".to_string(), Value::Bool(index == 0));
        meta.insert("last".to_string(), Value::Bool(index == length - 1));
        Value::Object(meta)
    }
}

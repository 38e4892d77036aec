//! Template orchestration: parse once, render many times.
//!
//! [`Template::parse`] turns source into an immutable node tree; the
//! returned template can render repeatedly against different data. Render
//! state lives entirely in the [`Context`] built (or supplied) per render,
//! so a parsed tree is safe to share across renders.
//!
//! Assigns accumulate on the template instance: data passed to one render
//! call is still visible to the next, merged under any newer bindings.

use std::collections::HashMap;

use serde::Serialize;

use crate::context::{Context, Scope};
use crate::error::{ParseError, RenderError};
use crate::nodes::{render_all, Node};
use crate::parse::{parse_segment, reject_unknown_tag, SegmentEnd, TokenStream};
use crate::registry::{self, TagRegistry};
use crate::strainer::FilterMap;
use crate::value::Value;

/// The root block. It has no end delimiter and completes silently when the
/// token stream runs out; unknown tags at the top level still fail.
#[derive(Debug)]
pub(crate) struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub(crate) fn parse(
        stream: &mut TokenStream<'_>,
        registry: &TagRegistry,
    ) -> Result<Self, ParseError> {
        let mut nodes = Vec::new();
        match parse_segment(stream, registry, None, &mut nodes)? {
            SegmentEnd::Exhausted => Ok(Self { nodes }),
            SegmentEnd::Unknown { name, .. } => Err(reject_unknown_tag("document", None, &name)),
            SegmentEnd::Close => unreachable!("document has no end delimiter"),
        }
    }

    pub(crate) fn render(
        &self,
        context: &mut Context,
        out: &mut String,
    ) -> Result<(), RenderError> {
        render_all(&self.nodes, context, out)
    }
}

/// A parsed template plus the assigns and registers it has accumulated.
#[derive(Debug)]
pub struct Template {
    root: Document,
    assigns: Scope,
    registers: HashMap<String, Value>,
}

impl Template {
    /// Parses source with the process-wide tag registry.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        Self::parse_with(source, &registry::global_tags())
    }

    /// Parses source with an explicit registry, bypassing process-wide
    /// registrations.
    pub fn parse_with(source: &str, registry: &TagRegistry) -> Result<Self, ParseError> {
        let mut stream = TokenStream::new(source);
        let root = Document::parse(&mut stream, registry)?;
        Ok(Self {
            root,
            assigns: Scope::new(),
            registers: HashMap::new(),
        })
    }

    /// Renders against a mapping of assigns (a JSON object; anything else
    /// adds no bindings). The mapping is merged into the template's
    /// accumulated assigns, and a fresh context is built for the render —
    /// loop pagination does not carry over to other fresh-context renders.
    pub fn render(&mut self, assigns: &serde_json::Value) -> Result<String, RenderError> {
        self.render_with(assigns, None, None)
    }

    /// [`render`](Self::render) plus per-render filters and seeded
    /// registers.
    pub fn render_with(
        &mut self,
        assigns: &serde_json::Value,
        filters: Option<&FilterMap>,
        registers: Option<HashMap<String, Value>>,
    ) -> Result<String, RenderError> {
        if let serde_json::Value::Object(map) = assigns {
            for (name, value) in map {
                self.assigns.insert(name.clone(), Value::from(value));
            }
        }
        if let Some(registers) = registers {
            self.registers.extend(registers);
        }

        let mut context = Context::with_parts(self.assigns.clone(), self.registers.clone());
        if let Some(filters) = filters {
            context.add_filters(filters);
        }
        self.render_in(&mut context)
    }

    /// Serializes any host value into assigns and renders.
    pub fn render_data<T: Serialize>(&mut self, data: &T) -> Result<String, RenderError> {
        let assigns = serde_json::to_value(data)
            .map_err(|err| RenderError::Serialization(err.to_string()))?;
        self.render(&assigns)
    }

    /// Renders into a caller-owned context. Reusing one context across
    /// renders is what lets `offset: continue` loops resume.
    pub fn render_in(&self, context: &mut Context) -> Result<String, RenderError> {
        let mut out = String::new();
        self.root.render(context, &mut out)?;
        Ok(out)
    }
}

/// Parses source into a [`Template`] with the process-wide tag registry.
pub fn parse(source: &str) -> Result<Template, ParseError> {
    Template::parse(source)
}

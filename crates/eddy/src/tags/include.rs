//! `{% include "name" (with|for) expr (attr: expr)* %}`.
//!
//! At render time the template name is resolved through the context, its
//! source is requested from the active [loader](crate::loader), and the
//! partial is parsed fresh — there is no cross-call cache. The partial sees
//! one new scope holding the attribute bindings plus either the `with`/`for`
//! target or a variable sharing the include's own name; sequence targets
//! render the partial once per element.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::Context;
use crate::error::{ParseError, RenderError};
use crate::loader;
use crate::nodes::Node;
use crate::parse::TokenStream;
use crate::registry::TagRegistry;
use crate::template::Template;
use crate::value::Value;

static SYNTAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^\s*((?:"[^"]+"|'[^']+'|[^\s,|]+)+)(?:\s+(?:with|for)\s+((?:"[^"]+"|'[^']+'|[^\s,|]+)+))?"#,
    )
    .expect("include pattern")
});
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\w+)\s*:\s*("[^"]+"|'[^']+'|[^\s,|]+)"#).expect("attribute pattern")
});

#[derive(Debug)]
pub struct Include {
    /// The name expression as written, usually a quoted literal.
    template_name: String,
    /// The quote-stripped name; also the binding the partial sees.
    bind_name: String,
    /// Optional `with`/`for` target expression.
    target: Option<String>,
    attributes: Vec<(String, String)>,
}

pub fn construct(
    _name: &str,
    markup: &str,
    _stream: &mut TokenStream<'_>,
    _registry: &TagRegistry,
) -> Result<Node, ParseError> {
    let caps = SYNTAX.captures(markup).ok_or_else(|| ParseError::TagSyntax {
        tag: "include".to_string(),
        usage: "include '[template]' (with|for) [object|collection]".to_string(),
    })?;
    let template_name = caps.get(1).expect("name group").as_str().to_string();
    let attributes = ATTRIBUTE
        .captures_iter(markup)
        .map(|c| {
            (
                c.get(1).expect("attr name").as_str().to_string(),
                c.get(2).expect("attr value").as_str().to_string(),
            )
        })
        .collect();
    Ok(Node::Include(Include {
        bind_name: unquote(&template_name).to_string(),
        template_name,
        target: caps.get(2).map(|m| m.as_str().to_string()),
        attributes,
    }))
}

fn unquote(token: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = token
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    token
}

impl Include {
    pub(crate) fn render(&self, context: &mut Context, out: &mut String) -> Result<(), RenderError> {
        let name = context.get(&self.template_name).to_output();
        let source = loader::load_template_source(&name)?;
        let partial = Template::parse(&source)?;

        let target_expression = self.target.as_deref().unwrap_or(&self.bind_name);
        let target = context.get(target_expression);

        // Attribute values resolve against the outer context, before the
        // partial's scope opens.
        let attributes: Vec<(String, Value)> = self
            .attributes
            .iter()
            .map(|(key, expr)| (key.clone(), context.get(expr)))
            .collect();

        context.stack(|ctx| {
            for (key, value) in attributes {
                ctx.set(key, value);
            }
            match target {
                Value::Array(items) => {
                    for item in items {
                        ctx.set(self.bind_name.clone(), item);
                        out.push_str(&partial.render_in(ctx)?);
                    }
                    Ok(())
                }
                single => {
                    ctx.set(self.bind_name.clone(), single);
                    out.push_str(&partial.render_in(ctx)?);
                    Ok(())
                }
            }
        })
    }
}

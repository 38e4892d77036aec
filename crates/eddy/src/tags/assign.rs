//! `{% assign name = expr %}`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::Context;
use crate::error::{ParseError, RenderError};
use crate::nodes::Node;
use crate::parse::TokenStream;
use crate::registry::TagRegistry;

static SYNTAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"((?:\(?[\w\-.\[\]]\)?)+)\s*=\s*((?:"[^"]+"|'[^']+'|[^\s,|]+)+)"#)
        .expect("assign pattern")
});

/// Writes a resolved expression into the root scope at render time.
///
/// Assignment deliberately escapes block scoping: a value assigned inside an
/// `if` or `for` body is still visible after that block's scope pops.
#[derive(Debug)]
pub struct Assign {
    to: String,
    from: String,
}

pub fn construct(
    _name: &str,
    markup: &str,
    _stream: &mut TokenStream<'_>,
    _registry: &TagRegistry,
) -> Result<Node, ParseError> {
    let caps = SYNTAX.captures(markup).ok_or_else(|| ParseError::TagSyntax {
        tag: "assign".to_string(),
        usage: "assign [var] = [source]".to_string(),
    })?;
    Ok(Node::Assign(Assign {
        to: caps.get(1).expect("target group").as_str().to_string(),
        from: caps.get(2).expect("source group").as_str().to_string(),
    }))
}

impl Assign {
    pub(crate) fn render(&self, context: &mut Context) -> Result<(), RenderError> {
        let value = context.get(&self.from);
        context.set_root(self.to.clone(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn assign_of(markup: &str) -> Result<Assign, ParseError> {
        let mut stream = TokenStream::new("");
        let registry = TagRegistry::new();
        match construct("assign", markup, &mut stream, &registry)? {
            Node::Assign(assign) => Ok(assign),
            _ => unreachable!(),
        }
    }

    #[test]
    fn parses_target_and_source() {
        let assign = assign_of("x = 'hello'").unwrap();
        assert_eq!(assign.to, "x");
        assert_eq!(assign.from, "'hello'");
    }

    #[test]
    fn rejects_markup_without_equals() {
        let err = assign_of("x hello").unwrap_err();
        assert!(matches!(err, ParseError::TagSyntax { tag, .. } if tag == "assign"));
    }

    #[test]
    fn writes_to_the_root_scope() {
        let assign = assign_of("x = 41").unwrap();
        let mut ctx = Context::new();
        ctx.push_scope();
        assign.render(&mut ctx).unwrap();
        ctx.pop_scope();
        assert_eq!(ctx.resolve("x"), Value::Int(41));
    }

    #[test]
    fn source_resolves_at_render_time() {
        let assign = assign_of("copy = original").unwrap();
        let mut ctx = Context::new();
        ctx.set("original", Value::from("live"));
        assign.render(&mut ctx).unwrap();
        assert_eq!(ctx.resolve("copy"), Value::from("live"));
    }
}

//! `{% if %}` / `{% elsif %}` / `{% else %}` / `{% endif %}`.
//!
//! The if block overrides the unknown-tag policy to treat `elsif` and
//! `else` as branch continuations. Branches are tried in declaration order
//! and the first one whose condition holds renders, inside one pushed
//! scope; at most one branch renders.

use crate::condition::Condition;
use crate::context::Context;
use crate::error::{ParseError, RenderError};
use crate::nodes::{render_all, Node};
use crate::parse::{parse_segment, reject_unknown_tag, SegmentEnd, TokenStream};
use crate::registry::TagRegistry;

#[derive(Debug)]
struct Branch {
    condition: Condition,
    nodes: Vec<Node>,
}

#[derive(Debug)]
pub struct IfBlock {
    branches: Vec<Branch>,
}

pub fn construct(
    _name: &str,
    markup: &str,
    stream: &mut TokenStream<'_>,
    registry: &TagRegistry,
) -> Result<Node, ParseError> {
    let mut branches = vec![Branch {
        condition: Condition::parse_chain("if", markup)?,
        nodes: Vec::new(),
    }];

    loop {
        let nodes = &mut branches.last_mut().expect("at least one branch").nodes;
        match parse_segment(stream, registry, Some("endif"), nodes)? {
            SegmentEnd::Close => break,
            SegmentEnd::Unknown { name, markup } => match name.as_str() {
                "elsif" => branches.push(Branch {
                    condition: Condition::parse_chain("elsif", &markup)?,
                    nodes: Vec::new(),
                }),
                "else" => branches.push(Branch {
                    condition: Condition::Else,
                    nodes: Vec::new(),
                }),
                other => return Err(reject_unknown_tag("if", Some("endif"), other)),
            },
            SegmentEnd::Exhausted => return Err(ParseError::UnclosedBlock("if".to_string())),
        }
    }

    Ok(Node::If(IfBlock { branches }))
}

impl IfBlock {
    pub(crate) fn render(&self, context: &mut Context, out: &mut String) -> Result<(), RenderError> {
        context.stack(|ctx| {
            for branch in &self.branches {
                if branch.condition.evaluate(ctx)? {
                    return render_all(&branch.nodes, ctx, out);
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Scope;
    use crate::value::Value;

    fn if_block(src: &str) -> Result<IfBlock, ParseError> {
        let registry = TagRegistry::with_builtins();
        let mut stream = TokenStream::new(src);
        let mut nodes = Vec::new();
        parse_segment(&mut stream, &registry, None, &mut nodes)?;
        match nodes.into_iter().next() {
            Some(Node::If(block)) => Ok(block),
            _ => unreachable!("expected an if node"),
        }
    }

    fn render_with(src: &str, pairs: &[(&str, Value)]) -> String {
        let block = if_block(src).unwrap();
        let mut assigns = Scope::new();
        for (name, value) in pairs {
            assigns.insert((*name).to_string(), value.clone());
        }
        let mut context = Context::with_assigns(assigns);
        let mut out = String::new();
        block.render(&mut context, &mut out).unwrap();
        out
    }

    #[test]
    fn renders_the_true_branch() {
        let src = "{% if a == b %}Y{% else %}N{% endif %}";
        assert_eq!(
            render_with(src, &[("a", Value::Int(1)), ("b", Value::Int(1))]),
            "Y"
        );
        assert_eq!(
            render_with(src, &[("a", Value::Int(1)), ("b", Value::Int(2))]),
            "N"
        );
    }

    #[test]
    fn renders_nothing_without_a_true_branch() {
        assert_eq!(render_with("{% if x %}Y{% endif %}", &[]), "");
    }

    #[test]
    fn elsif_chain_takes_the_first_true_branch() {
        let src = "{% if n == 1 %}one{% elsif n == 2 %}two{% elsif n == 3 %}three{% else %}many{% endif %}";
        assert_eq!(render_with(src, &[("n", Value::Int(2))]), "two");
        assert_eq!(render_with(src, &[("n", Value::Int(3))]), "three");
        assert_eq!(render_with(src, &[("n", Value::Int(9))]), "many");
    }

    #[test]
    fn at_most_one_branch_renders() {
        let src = "{% if true %}a{% elsif true %}b{% else %}c{% endif %}";
        assert_eq!(render_with(src, &[]), "a");
    }

    #[test]
    fn nested_if_blocks() {
        let src = "{% if true %}({% if false %}x{% else %}y{% endif %}){% endif %}";
        assert_eq!(render_with(src, &[]), "(y)");
    }

    #[test]
    fn unclosed_if_fails_to_parse() {
        let err = if_block("{% if true %}no end").unwrap_err();
        assert!(matches!(err, ParseError::UnclosedBlock(name) if name == "if"));
    }

    #[test]
    fn unknown_tag_inside_if_is_rejected() {
        let err = if_block("{% if true %}{% widget %}{% endif %}").unwrap_err();
        assert!(matches!(err, ParseError::UnknownTag(name) if name == "widget"));
    }

    #[test]
    fn bad_end_delimiter_names_endif() {
        let err = if_block("{% if true %}x{% end %}").unwrap_err();
        assert!(
            matches!(err, ParseError::BadEndDelimiter { expected, .. } if expected == "endif")
        );
    }

    #[test]
    fn else_inside_for_is_rejected() {
        let registry = TagRegistry::with_builtins();
        let mut stream = TokenStream::new("{% for i in xs %}{% else %}{% endfor %}");
        let mut nodes = Vec::new();
        let err = parse_segment(&mut stream, &registry, None, &mut nodes).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedElse { block } if block == "for"));
    }
}

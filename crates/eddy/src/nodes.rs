//! The node tree.
//!
//! A parsed template is a tree of [`Node`] values. The tree is built once,
//! holds no render state, and may be rendered repeatedly; everything mutable
//! lives in the [`Context`] a render call supplies. Rendering appends to a
//! shared output buffer, which is the flattened form of the tree walk.

use std::fmt;

use crate::context::Context;
use crate::error::RenderError;
use crate::tags::assign::Assign;
use crate::tags::for_block::ForBlock;
use crate::tags::if_block::IfBlock;
use crate::tags::include::Include;
use crate::variable::Variable;

/// A host-defined tag node. Constructors registered through
/// [`register_tag`](crate::register_tag) produce these via
/// [`Node::custom`]; parsing already happened, so only rendering remains.
pub trait CustomTag: Send + Sync {
    fn render(&self, context: &mut Context, out: &mut String) -> Result<(), RenderError>;
}

/// One node of a parsed template.
pub enum Node {
    /// Literal text, emitted verbatim.
    Text(String),
    /// An output expression with its filter chain.
    Output(Variable),
    Assign(Assign),
    Include(Include),
    /// A comment block: body parsed for validity, never rendered.
    Comment,
    /// A named block marker: body parsed, never rendered.
    BlockMarker,
    If(IfBlock),
    For(ForBlock),
    Custom(Box<dyn CustomTag>),
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Node::Output(variable) => f.debug_tuple("Output").field(variable).finish(),
            Node::Assign(assign) => f.debug_tuple("Assign").field(assign).finish(),
            Node::Include(include) => f.debug_tuple("Include").field(include).finish(),
            Node::Comment => write!(f, "Comment"),
            Node::BlockMarker => write!(f, "BlockMarker"),
            Node::If(block) => f.debug_tuple("If").field(block).finish(),
            Node::For(block) => f.debug_tuple("For").field(block).finish(),
            Node::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl Node {
    pub fn custom(tag: impl CustomTag + 'static) -> Self {
        Node::Custom(Box::new(tag))
    }

    pub fn render(&self, context: &mut Context, out: &mut String) -> Result<(), RenderError> {
        match self {
            Node::Text(text) => {
                out.push_str(text);
                Ok(())
            }
            Node::Output(variable) => variable.render(context, out),
            Node::Assign(assign) => assign.render(context),
            Node::Include(include) => include.render(context, out),
            Node::Comment | Node::BlockMarker => Ok(()),
            Node::If(block) => block.render(context, out),
            Node::For(block) => block.render(context, out),
            Node::Custom(tag) => tag.render(context, out),
        }
    }
}

/// Renders a node list in order into one buffer. Custom block tags use this
/// to render the body they collected at parse time.
pub fn render_all(
    nodes: &[Node],
    context: &mut Context,
    out: &mut String,
) -> Result<(), RenderError> {
    for node in nodes {
        node.render(context, out)?;
    }
    Ok(())
}

//! Built-in tags.
//!
//! Each tag module exposes a `construct` function with the registry's
//! constructor signature. Leaf tags (`assign`, `include`) parse only their
//! markup; block tags additionally consume their body, up to and including
//! their end delimiter, from the shared token stream.

pub mod assign;
pub mod for_block;
pub mod if_block;
pub mod include;

use crate::error::ParseError;
use crate::nodes::Node;
use crate::parse::{parse_block_body, TokenStream};
use crate::registry::TagRegistry;

/// `{% comment %}...{% endcomment %}` — the body is parsed (so malformed
/// nested tags are still rejected) and then discarded.
pub fn construct_comment(
    _name: &str,
    _markup: &str,
    stream: &mut TokenStream<'_>,
    registry: &TagRegistry,
) -> Result<Node, ParseError> {
    parse_block_body(stream, registry, "comment")?;
    Ok(Node::Comment)
}

/// `{% block name %}...{% endblock %}` — a named placeholder region. The
/// body is parsed and discarded; the marker renders nothing.
pub fn construct_block_marker(
    _name: &str,
    _markup: &str,
    stream: &mut TokenStream<'_>,
    registry: &TagRegistry,
) -> Result<Node, ParseError> {
    parse_block_body(stream, registry, "block")?;
    Ok(Node::BlockMarker)
}

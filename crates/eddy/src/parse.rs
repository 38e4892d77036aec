//! Shared block-parsing machinery.
//!
//! All block constructs consume tokens from one [`TokenStream`] cursor: a
//! child block advances the same cursor its parent later continues from.
//! The body loop lives in [`parse_segment`], which returns control to the
//! calling block when it hits the block's end delimiter, an unregistered
//! tag, or the end of input. Blocks without special branching use
//! [`parse_block_body`], which applies the default unknown-tag policy and
//! the unclosed-block rule.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ParseError;
use crate::lexer::{tokenize, Token};
use crate::nodes::Node;
use crate::registry::TagRegistry;
use crate::variable::Variable;

static TAG_HEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{%\s*(\w+)\s*(.*?)\s*%\}$").expect("tag header pattern"));

/// An immutable token sequence with a shared parse cursor.
pub struct TokenStream<'src> {
    tokens: Vec<Token<'src>>,
    pos: usize,
}

impl<'src> TokenStream<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            tokens: tokenize(src),
            pos: 0,
        }
    }

    pub(crate) fn next(&mut self) -> Option<Token<'src>> {
        let token = self.tokens.get(self.pos).copied();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

/// Why a body segment stopped consuming tokens.
#[derive(Debug)]
pub(crate) enum SegmentEnd {
    /// The expected end delimiter was consumed.
    Close,
    /// An unregistered tag was consumed; the caller decides what it means.
    Unknown { name: String, markup: String },
    /// The token sequence ran out.
    Exhausted,
}

/// Consumes tokens into `nodes` until an end delimiter, an unregistered tag,
/// or exhaustion. Registered tags construct themselves recursively from the
/// same cursor, consuming their own bodies and end delimiters.
pub(crate) fn parse_segment(
    stream: &mut TokenStream<'_>,
    registry: &TagRegistry,
    end_tag: Option<&str>,
    nodes: &mut Vec<Node>,
) -> Result<SegmentEnd, ParseError> {
    while let Some(token) = stream.next() {
        match token {
            Token::Text(text) => nodes.push(Node::Text(text.to_string())),
            Token::Output(raw) => nodes.push(Node::Output(Variable::from_token(raw)?)),
            Token::Tag(raw) => {
                let caps = TAG_HEAD
                    .captures(raw)
                    .ok_or_else(|| ParseError::UnterminatedTag(raw.to_string()))?;
                let name = caps.get(1).expect("tag name group").as_str();
                let markup = caps.get(2).map_or("", |m| m.as_str());
                if end_tag == Some(name) {
                    return Ok(SegmentEnd::Close);
                }
                match registry.get(name) {
                    Some(construct) => nodes.push(construct(name, markup, stream, registry)?),
                    None => {
                        return Ok(SegmentEnd::Unknown {
                            name: name.to_string(),
                            markup: markup.to_string(),
                        })
                    }
                }
            }
        }
    }
    Ok(SegmentEnd::Exhausted)
}

/// Parses a block body up to and including `end<block_name>`, applying the
/// default unknown-tag policy. This is the parse entry point for custom
/// block tags registered by hosts.
pub fn parse_block_body(
    stream: &mut TokenStream<'_>,
    registry: &TagRegistry,
    block_name: &str,
) -> Result<Vec<Node>, ParseError> {
    let end_tag = format!("end{}", block_name);
    let mut nodes = Vec::new();
    match parse_segment(stream, registry, Some(&end_tag), &mut nodes)? {
        SegmentEnd::Close => Ok(nodes),
        SegmentEnd::Unknown { name, .. } => {
            Err(reject_unknown_tag(block_name, Some(&end_tag), &name))
        }
        SegmentEnd::Exhausted => Err(ParseError::UnclosedBlock(block_name.to_string())),
    }
}

/// The default policy for a tag no registry entry claims: `else` and `end`
/// get pointed errors, anything else is simply unknown.
pub(crate) fn reject_unknown_tag(
    block_name: &str,
    expected_end: Option<&str>,
    tag: &str,
) -> ParseError {
    match tag {
        "else" => ParseError::UnexpectedElse {
            block: block_name.to_string(),
        },
        "end" => match expected_end {
            Some(expected) => ParseError::BadEndDelimiter {
                block: block_name.to_string(),
                expected: expected.to_string(),
            },
            None => ParseError::UnknownTag(tag.to_string()),
        },
        other => ParseError::UnknownTag(other.to_string()),
    }
}

//! Error types for parsing and rendering.
//!
//! Parsing is fail-fast: any [`ParseError`] aborts the whole parse and no
//! partial tree is produced. Rendering distinguishes hard failures
//! ([`RenderError`]) from soft resolution misses: an unresolvable variable
//! path renders as the empty string and an unknown filter name passes its
//! input through, while an unknown comparison operator or a failing include
//! aborts the render.

use thiserror::Error;

/// Error raised while turning template source into a node tree.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A `{%` tag token with no recognizable tag name.
    #[error("tag '{0}' was not properly terminated with: %}}")]
    UnterminatedTag(String),

    /// A `{{` output token with no recognizable expression body.
    #[error("variable '{0}' was not properly terminated with: }}}}")]
    UnterminatedVariable(String),

    /// A tag name with no registered constructor.
    #[error("unknown tag '{0}'")]
    UnknownTag(String),

    /// An `else` inside a block that has no else branches.
    #[error("{block} tag does not expect an else tag")]
    UnexpectedElse { block: String },

    /// A literal `end` where a named end delimiter is required.
    #[error("'end' is not a valid delimiter for {block} tags, use {expected}")]
    BadEndDelimiter { block: String, expected: String },

    /// Input ran out before a block's end delimiter was found.
    #[error("{0} tag was never closed")]
    UnclosedBlock(String),

    /// A tag header that does not match the tag's expected shape.
    #[error("syntax error in '{tag}' - valid syntax: {usage}")]
    TagSyntax { tag: String, usage: String },
}

/// Error raised while rendering a parsed template against a context.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A comparison operator name missing from the operator table. Unlike
    /// filters, operators fail hard.
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    /// The active template loader rejects includes.
    #[error("this template context does not allow includes")]
    IncludesNotAllowed,

    /// The loader had no template under the requested name.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// Host data could not be serialized into engine values.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O failure from a filesystem-backed loader.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An included partial failed to parse.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

//! Tag registry.
//!
//! Maps tag names to node constructors. A [`TagRegistry`] is an explicit
//! value so parsers can be handed a registry directly; the process-wide
//! default registry backs [`Template::parse`](crate::Template::parse) and is
//! extended with [`register_tag`]. Registration is effective for all
//! subsequent parses; the engine does not synchronize registration against
//! parses already in flight.

use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::error::ParseError;
use crate::nodes::Node;
use crate::parse::TokenStream;
use crate::tags;

/// Builds a node from a tag's name and markup. Block constructors consume
/// their body (including the end delimiter) from the shared stream.
pub type TagConstructor = fn(
    name: &str,
    markup: &str,
    stream: &mut TokenStream<'_>,
    registry: &TagRegistry,
) -> Result<Node, ParseError>;

/// Name → constructor table consulted during parsing.
#[derive(Clone, Default)]
pub struct TagRegistry {
    tags: HashMap<String, TagConstructor>,
}

impl TagRegistry {
    /// An empty registry. Useful for parsing with a fully custom tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in tags: `assign`, `include`, `comment`,
    /// `block`, `for` and `if`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("assign", tags::assign::construct);
        registry.register("include", tags::include::construct);
        registry.register("comment", tags::construct_comment);
        registry.register("block", tags::construct_block_marker);
        registry.register("for", tags::for_block::construct);
        registry.register("if", tags::if_block::construct);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, constructor: TagConstructor) {
        self.tags.insert(name.into(), constructor);
    }

    pub fn get(&self, name: &str) -> Option<TagConstructor> {
        self.tags.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }
}

static TAGS: Lazy<RwLock<TagRegistry>> = Lazy::new(|| RwLock::new(TagRegistry::with_builtins()));

/// Registers a tag constructor process-wide, for all subsequent parses.
pub fn register_tag(name: impl Into<String>, constructor: TagConstructor) {
    TAGS.write()
        .expect("tag registry poisoned")
        .register(name, constructor);
}

/// Snapshot of the process-wide registry.
pub(crate) fn global_tags() -> TagRegistry {
    TAGS.read().expect("tag registry poisoned").clone()
}

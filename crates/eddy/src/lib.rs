//! # Eddy — an embeddable template engine
//!
//! `eddy` compiles text containing output expressions (`{{ expr | filters }}`)
//! and control tags (`{% tag args %}`) into a reusable node tree, then
//! evaluates that tree against host-supplied data to produce output text.
//! It is built for places where templates carry untrusted or semi-trusted
//! logic — content pipelines, generated documents, emails — and must never
//! reach into the host language itself.
//!
//! ## Core Concepts
//!
//! - [`Template`]: parse once, render many times
//! - [`Context`]: per-render scope stack, registers, and filter dispatch
//! - [`Value`]: the engine's dynamic value type, converting from
//!   [`serde_json::Value`]
//! - [`DropObject`]: capability trait exposing host objects to templates
//! - [`register_tag`] / [`register_filter`]: process-wide extension points
//! - [`TemplateLoader`]: host collaborator serving `include` sources
//!
//! ## Quick Start
//!
//! ```rust
//! use eddy::Template;
//! use serde_json::json;
//!
//! let mut template = Template::parse("Hello {{ name }}!").unwrap();
//! let out = template.render(&json!({"name": "World"})).unwrap();
//! assert_eq!(out, "Hello World!");
//! ```
//!
//! ## Tags, Filters, Conditions
//!
//! ```rust
//! use serde_json::json;
//!
//! let mut template = eddy::parse(
//!     "{% for user in users %}{% if user.admin %}{{ user.name | upcase }};{% endif %}{% endfor %}",
//! ).unwrap();
//!
//! let out = template.render(&json!({
//!     "users": [
//!         {"name": "ada", "admin": true},
//!         {"name": "bob", "admin": false},
//!         {"name": "lin", "admin": true},
//!     ]
//! })).unwrap();
//!
//! assert_eq!(out, "ADA;LIN;");
//! ```
//!
//! ## Scoping Rules
//!
//! Variable lookup walks the scope stack innermost-out on an existence
//! check. Block tags (`if`, `for`, `include`) push a scope around their
//! bodies; `assign` deliberately writes to the root scope, so an assignment
//! made inside a block survives the block:
//!
//! ```rust
//! use serde_json::json;
//!
//! let mut template =
//!     eddy::parse("{% if true %}{% assign x = 1 %}{% endif %}{{ x }}").unwrap();
//! assert_eq!(template.render(&json!({})).unwrap(), "1");
//! ```
//!
//! ## Error Behavior
//!
//! Parsing fails fast with a [`ParseError`]; no partial tree survives.
//! Rendering is permissive about data — missing variables are empty,
//! unknown filters pass values through — but strict about structure:
//! unknown comparison operators and failing includes abort the render with
//! a [`RenderError`].
//!
//! ## Concurrency
//!
//! A parsed tree holds no render state and may be rendered from multiple
//! threads, each with its own [`Context`]. The tag/filter registries and
//! the include loader are process-wide; registration is not synchronized
//! against in-flight parses and renders, so register at startup.

pub mod condition;
pub mod context;
pub mod loader;
pub mod tags;

mod error;
mod lexer;
mod nodes;
mod parse;
mod registry;
mod strainer;
mod template;
mod value;
mod variable;

pub use condition::{Condition, Relation};
pub use context::{Context, Scope};
pub use error::{ParseError, RenderError};
pub use lexer::{tokenize, Token};
pub use loader::{set_template_loader, DirLoader, MemoryLoader, NullLoader, TemplateLoader};
pub use nodes::{render_all, CustomTag, Node};
pub use parse::{parse_block_body, TokenStream};
pub use registry::{register_tag, TagConstructor, TagRegistry};
pub use strainer::{filter_fn, register_filter, FilterFn, FilterMap, Strainer};
pub use template::{parse, Template};
pub use value::{DropObject, LazyValue, Value};
pub use variable::Variable;

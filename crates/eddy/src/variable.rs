//! Output expressions: `{{ name | filter:arg,arg | filter2 }}`.
//!
//! A [`Variable`] is an expression token plus an ordered filter chain.
//! Filters apply strictly in written order; each receives the running value
//! as its first argument, followed by its own arguments resolved against
//! the context at render time.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::Context;
use crate::error::{ParseError, RenderError};

static OUTPUT_BODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\{(.*)\}\}$").expect("output body pattern"));
static NAME_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*("[^"]+"|'[^']+'|[^\s,|]+)"#).expect("name pattern"));
static FILTER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\w+)").expect("filter name pattern"));
static FILTER_ARG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[:,]\s*("[^"]+"|'[^']+'|[^\s,|]+)"#).expect("filter arg pattern"));

/// A parsed output expression.
#[derive(Debug)]
pub struct Variable {
    name: Option<String>,
    filters: Vec<(String, Vec<String>)>,
}

impl Variable {
    /// Parses the inside of a `{{ ... }}` token. An empty body is legal and
    /// renders as nothing.
    pub fn new(markup: &str) -> Self {
        let Some(caps) = NAME_TOKEN.captures(markup) else {
            return Self {
                name: None,
                filters: Vec::new(),
            };
        };
        let name = caps.get(1).expect("name group").as_str().to_string();

        let mut filters = Vec::new();
        if let Some(pipe) = markup.find('|') {
            for segment in markup[pipe + 1..].split('|') {
                let Some(name_caps) = FILTER_NAME.captures(segment) else {
                    continue;
                };
                let args = FILTER_ARG
                    .captures_iter(segment)
                    .map(|c| c.get(1).expect("arg group").as_str().to_string())
                    .collect();
                filters.push((name_caps.get(1).expect("filter group").as_str().to_string(), args));
            }
        }

        Self {
            name: Some(name),
            filters,
        }
    }

    /// Parses a full `{{ ... }}` token, delimiters included.
    pub(crate) fn from_token(raw: &str) -> Result<Self, ParseError> {
        match OUTPUT_BODY.captures(raw) {
            Some(caps) => Ok(Self::new(caps.get(1).expect("body group").as_str())),
            None => Err(ParseError::UnterminatedVariable(raw.to_string())),
        }
    }

    pub(crate) fn render(
        &self,
        context: &mut Context,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let Some(name) = &self.name else {
            return Ok(());
        };
        let mut value = context.get(name);
        for (filter, args) in &self.filters {
            let mut call = Vec::with_capacity(args.len() + 1);
            call.push(value);
            for arg in args {
                call.push(context.get(arg));
            }
            value = context.invoke_filter(filter, &call);
        }
        out.push_str(&value.to_output());
        Ok(())
    }
}

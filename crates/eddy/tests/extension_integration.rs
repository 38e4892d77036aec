//! Extension points: custom tags, registered filters, include loaders.
//!
//! These tests mutate process-wide registries, so anything touching them
//! runs serialized.

use std::sync::Arc;

use eddy::{
    filter_fn, parse_block_body, register_filter, register_tag, set_template_loader, Context,
    CustomTag, DirLoader, FilterMap, MemoryLoader, Node, NullLoader, ParseError, RenderError,
    TagRegistry, Template, TokenStream, Value,
};
use serde_json::json;
use serial_test::serial;

// ==================== Custom Tags ====================

struct Stamp;

impl CustomTag for Stamp {
    fn render(&self, _context: &mut Context, out: &mut String) -> Result<(), RenderError> {
        out.push_str("*");
        Ok(())
    }
}

fn construct_stamp(
    _name: &str,
    _markup: &str,
    _stream: &mut TokenStream<'_>,
    _registry: &TagRegistry,
) -> Result<Node, ParseError> {
    Ok(Node::custom(Stamp))
}

struct Loud {
    nodes: Vec<Node>,
}

impl CustomTag for Loud {
    fn render(&self, context: &mut Context, out: &mut String) -> Result<(), RenderError> {
        let mut inner = String::new();
        eddy::render_all(&self.nodes, context, &mut inner)?;
        out.push_str(&inner.to_uppercase());
        Ok(())
    }
}

fn construct_loud(
    _name: &str,
    _markup: &str,
    stream: &mut TokenStream<'_>,
    registry: &TagRegistry,
) -> Result<Node, ParseError> {
    let nodes = parse_block_body(stream, registry, "loud")?;
    Ok(Node::custom(Loud { nodes }))
}

#[test]
#[serial]
fn registered_leaf_tag_renders() {
    register_tag("stamp", construct_stamp);
    let mut template = Template::parse("a{% stamp %}b").unwrap();
    assert_eq!(template.render(&json!({})).unwrap(), "a*b");
}

#[test]
#[serial]
fn registered_block_tag_consumes_its_body() {
    register_tag("loud", construct_loud);
    let mut template = Template::parse("{% loud %}hi {{ name }}{% endloud %}!").unwrap();
    assert_eq!(template.render(&json!({"name": "ada"})).unwrap(), "HI ADA!");
}

#[test]
#[serial]
fn unclosed_custom_block_still_fails() {
    register_tag("loud", construct_loud);
    let err = Template::parse("{% loud %}never closed").unwrap_err();
    assert!(matches!(err, ParseError::UnclosedBlock(name) if name == "loud"));
}

#[test]
fn injected_registry_keeps_custom_tags_local() {
    let mut registry = TagRegistry::with_builtins();
    registry.register("stamp", construct_stamp);
    let template = Template::parse_with("x{% stamp %}", &registry).unwrap();
    let mut context = Context::new();
    assert_eq!(template.render_in(&mut context).unwrap(), "x*");
}

// ==================== Filters ====================

#[test]
#[serial]
fn globally_registered_filter_reaches_new_renders() {
    let mut filters = FilterMap::new();
    filters.insert(
        "shout".to_string(),
        filter_fn(|args| {
            let text = args.first().map(Value::to_output).unwrap_or_default();
            Value::Str(format!("{}!", text))
        }),
    );
    register_filter(filters);

    let mut template = Template::parse("{{ word | shout }}").unwrap();
    assert_eq!(template.render(&json!({"word": "hey"})).unwrap(), "hey!");
}

#[test]
fn per_render_filters_stay_per_render() {
    let mut filters = FilterMap::new();
    filters.insert(
        "wrap".to_string(),
        filter_fn(|args| {
            let text = args.first().map(Value::to_output).unwrap_or_default();
            Value::Str(format!("[{}]", text))
        }),
    );

    let mut template = Template::parse("{{ word | wrap }}").unwrap();
    assert_eq!(
        template
            .render_with(&json!({"word": "w"}), Some(&filters), None)
            .unwrap(),
        "[w]"
    );
    // Without the merge the name is unknown and passes through.
    assert_eq!(template.render(&json!({"word": "w"})).unwrap(), "w");
}

// ==================== Includes & Loaders ====================

#[test]
#[serial]
fn includes_are_rejected_by_default() {
    set_template_loader(Arc::new(NullLoader));
    let mut template = Template::parse("{% include 'x' %}").unwrap();
    let err = template.render(&json!({})).unwrap_err();
    assert!(matches!(err, RenderError::IncludesNotAllowed));
}

#[test]
#[serial]
fn include_binds_the_with_target() {
    let mut loader = MemoryLoader::new();
    loader.insert("card", "[{{ card }}]");
    set_template_loader(Arc::new(loader));

    let mut template = Template::parse("{% include 'card' with user %}").unwrap();
    assert_eq!(template.render(&json!({"user": "ada"})).unwrap(), "[ada]");
}

#[test]
#[serial]
fn include_repeats_for_sequences() {
    let mut loader = MemoryLoader::new();
    loader.insert("row", "({{ row }})");
    set_template_loader(Arc::new(loader));

    let mut template = Template::parse("{% include 'row' for items %}").unwrap();
    assert_eq!(
        template.render(&json!({"items": [1, 2, 3]})).unwrap(),
        "(1)(2)(3)"
    );
}

#[test]
#[serial]
fn include_attributes_resolve_in_the_outer_context() {
    let mut loader = MemoryLoader::new();
    loader.insert("banner", "{{ width }}:{{ banner }}");
    set_template_loader(Arc::new(loader));

    let mut template = Template::parse("{% include 'banner' width: w %}").unwrap();
    assert_eq!(template.render(&json!({"w": 3})).unwrap(), "3:");
}

#[test]
#[serial]
fn include_scope_closes_after_the_partial() {
    let mut loader = MemoryLoader::new();
    loader.insert("leaky", "{% assign escaped = 'yes' %}{{ secret }}");
    set_template_loader(Arc::new(loader));

    // The attribute binding dies with the include scope; the assign escapes
    // to the root scope on purpose.
    let mut template =
        Template::parse("{% include 'leaky' secret: 's' %}|{{ secret }}|{{ escaped }}").unwrap();
    assert_eq!(template.render(&json!({})).unwrap(), "s||yes");
}

#[test]
#[serial]
fn missing_partial_is_a_render_error() {
    set_template_loader(Arc::new(MemoryLoader::new()));
    let mut template = Template::parse("{% include 'ghost' %}").unwrap();
    let err = template.render(&json!({})).unwrap_err();
    assert!(matches!(err, RenderError::TemplateNotFound(name) if name == "ghost"));
}

#[test]
#[serial]
fn broken_partial_propagates_its_parse_error() {
    let mut loader = MemoryLoader::new();
    loader.insert("broken", "{% if %}x{% endif %}");
    set_template_loader(Arc::new(loader));

    let mut template = Template::parse("{% include 'broken' %}").unwrap();
    let err = template.render(&json!({})).unwrap_err();
    assert!(matches!(err, RenderError::Parse(_)));
}

#[test]
#[serial]
fn dir_loader_serves_partials_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("footer"), "-- {{ footer }}").unwrap();
    set_template_loader(Arc::new(DirLoader::new(dir.path())));

    let mut template = Template::parse("{% include 'footer' with sig %}").unwrap();
    assert_eq!(template.render(&json!({"sig": "fin"})).unwrap(), "-- fin");
}

#[test]
#[serial]
fn dynamic_include_names_resolve_through_the_context() {
    let mut loader = MemoryLoader::new();
    loader.insert("a", "A");
    loader.insert("b", "B");
    set_template_loader(Arc::new(loader));

    let mut template = Template::parse("{% include which %}").unwrap();
    assert_eq!(template.render(&json!({"which": "b"})).unwrap(), "B");
}

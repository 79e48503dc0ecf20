//! Auto-escaping tests for template engine

use serde_json::json;

use super::helpers::{debug_config, engine_with_config, render};
use super::*;
use crate::config::Autoescape;

fn markup() -> serde_json::Value {
    json!({"x": "<b>"})
}

fn engine_with_autoescape(autoescape: Autoescape) -> Engine {
    engine_with_config(
        EngineConfig {
            autoescape,
            ..debug_config()
        },
        &[],
    )
}

#[test]
fn test_autoescape_on_by_default() {
    assert_eq!(render("{{ x }}", markup()), "&lt;b&gt;");
    assert_eq!(render("{{ \"a & b\" }}", json!({})), "a &amp; b");
}

#[test]
fn test_raw_filter_disables_escape() {
    assert_eq!(render("{{ x|raw }}", markup()), "<b>");
    assert_eq!(render("{{ x|raw|upper }}", markup()), "<B>");
}

#[test]
fn test_escape_applied_after_filters() {
    assert_eq!(render("{{ x|replace('<', '[') }}", markup()), "[b&gt;");
}

#[test]
fn test_escape_filter_always_escapes() {
    let engine = engine_with_autoescape(Autoescape::Enabled(false));
    assert_eq!(engine.render("{{ x }}", markup()).unwrap(), "<b>");
    assert_eq!(engine.render("{{ x|escape }}", markup()).unwrap(), "&lt;b&gt;");
    assert_eq!(engine.render("{{ x|e }}", markup()).unwrap(), "&lt;b&gt;");

    assert_eq!(
        render("{% autoescape false %}{{ x|escape }}{% endautoescape %}", markup()),
        "&lt;b&gt;"
    );
}

#[test]
fn test_escape_is_not_doubled() {
    assert_eq!(render("{{ x|escape }}", markup()), "&lt;b&gt;");
}

#[test]
fn test_js_escape() {
    assert_eq!(render("{{ x|e('js') }}", markup()), "\\u003Cb\\u003E");
    assert_eq!(
        render("{% autoescape \"js\" %}{{ x }}{% endautoescape %}", markup()),
        "\\u003Cb\\u003E"
    );
}

#[test]
fn test_autoescape_block_restores_policy() {
    assert_eq!(
        render(
            "{% autoescape false %}{{ x }}{% endautoescape %}{{ x }}",
            markup()
        ),
        "<b>&lt;b&gt;"
    );
    let engine = engine_with_autoescape(Autoescape::Enabled(false));
    assert_eq!(
        engine
            .render("{% autoescape true %}{{ x }}{% endautoescape %}{{ x }}", markup())
            .unwrap(),
        "&lt;b&gt;<b>"
    );
}

#[test]
fn test_configured_escape_kind() {
    let engine = engine_with_autoescape(Autoescape::Kind(EscapeKind::Js));
    assert_eq!(engine.render("{{ x }}", markup()).unwrap(), "\\u003Cb\\u003E");
}

#[test]
fn test_set_value_escaped_on_output() {
    assert_eq!(render("{% set y = x %}{{ y }}", markup()), "&lt;b&gt;");
}

#[test]
fn test_macro_output_not_escaped_twice() {
    let source = "{% macro bold(t) %}<b>{{ t }}</b>{% endmacro %}{{ bold(\"<i>\") }}";
    assert_eq!(render(source, json!({})), "<b>&lt;i&gt;</b>");
}

#[test]
fn test_macro_output_escaped_after_filters() {
    let source = "{% macro bold() %}<b>x</b>{% endmacro %}{{ bold()|upper }}";
    assert_eq!(render(source, json!({})), "&lt;B&gt;X&lt;/B&gt;");
}

#[test]
fn test_literal_text_never_escaped() {
    assert_eq!(render("<p>{{ x }}</p>", markup()), "<p>&lt;b&gt;</p>");
}

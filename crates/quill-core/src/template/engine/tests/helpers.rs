//! Shared test helpers for template engine tests

use serde_json::{json, Value};

use super::*;

/// Configuration that propagates render errors
pub(super) fn debug_config() -> EngineConfig {
    EngineConfig {
        debug: true,
        ..EngineConfig::default()
    }
}

/// Isolated engine over in-memory templates
pub(super) fn engine_with(templates: &[(&str, &str)]) -> Engine {
    engine_with_config(debug_config(), templates)
}

pub(super) fn engine_with_config(config: EngineConfig, templates: &[(&str, &str)]) -> Engine {
    let loader = MemoryLoader::new();
    for (name, source) in templates {
        loader.insert(*name, *source);
    }
    Engine::with_loader(config, loader)
}

/// Render `source` with an isolated engine
pub(super) fn render(source: &str, data: Value) -> String {
    engine_with(&[])
        .render(source, data)
        .unwrap_or_else(|err| panic!("render of {source:?} failed: {err}"))
}

/// Compile error of `source`
pub(super) fn compile_err(source: &str) -> TemplateError {
    engine_with(&[])
        .compile(source, CompileOptions::default())
        .expect_err("compile should fail")
}

/// Scalar values
pub(super) fn simple_context() -> Value {
    json!({
        "title": "My Title",
        "count": 42,
        "price": 9.99,
        "enabled": true,
        "nothing": null,
    })
}

/// Nested objects and arrays
pub(super) fn nested_context() -> Value {
    json!({
        "paper": {
            "title": "Research Paper",
            "language": "en",
            "authors": [
                {"name": "John Doe", "email": "john@example.com"},
                {"name": "Jane Smith", "email": "jane@example.com"},
            ],
        },
    })
}

//! Integration tests for templates loaded from disk

use quill_core::template::TemplateError;
use quill_core::{Engine, EngineConfig};
use quill_testkit::{init_tracing, temp_dir_in_workspace, write_templates};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

fn engine_rooted_at(root: &Path) -> Engine {
    init_tracing();
    Engine::new(EngineConfig {
        root: Some(root.to_path_buf()),
        debug: true,
        ..EngineConfig::default()
    })
}

/// A small site: layout, page, partials and a macro library
fn write_site(root: &Path) {
    write_templates(
        root,
        &[
            (
                "layouts/base.html",
                "<html><head><title>{% block title %}Site{% endblock %}</title></head>\
                 <body>{% include \"partials/nav.html\" %}{% block content %}{% endblock %}</body></html>",
            ),
            (
                "partials/nav.html",
                "<nav>{% for link in links %}<a href=\"{{ link.href }}\">{{ link.label }}</a>{% endfor %}</nav>",
            ),
            (
                "macros/forms.html",
                "{% macro field(name, value) %}<input name=\"{{ name }}\" value=\"{{ value }}\">{% endmacro %}",
            ),
            (
                "pages/index.html",
                "{% extends \"layouts/base.html\" %}\
                 {% block title %}Home - {% parent %}{% endblock %}\
                 {% block content %}{% import \"macros/forms.html\" as forms %}{{ forms.field(\"q\", query) }}{% endblock %}",
            ),
        ],
    );
}

#[test]
fn test_render_file_with_layout_includes_and_imports() {
    let temp = temp_dir_in_workspace();
    write_site(temp.path());
    let engine = engine_rooted_at(temp.path());

    let data = json!({
        "links": [{"href": "/", "label": "Home"}, {"href": "/about", "label": "About"}],
        "query": "rust & templates",
    });
    let out = engine.render_file("pages/index.html", data).unwrap();

    assert_eq!(
        out,
        "<html><head><title>Home - Site</title></head><body>\
         <nav><a href=\"/\">Home</a><a href=\"/about\">About</a></nav>\
         <input name=\"q\" value=\"rust &amp; templates\"></body></html>"
    );
}

#[test]
fn test_compile_file_caches_by_resolved_path() {
    let temp = temp_dir_in_workspace();
    write_site(temp.path());
    let engine = engine_rooted_at(temp.path());

    let first = engine.compile_file("pages/index.html").unwrap();
    let second = engine.compile_file("./pages/../pages/index.html").unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let page_key = temp.path().join("pages/index.html").to_string_lossy().into_owned();
    let layout_key = temp.path().join("layouts/base.html").to_string_lossy().into_owned();
    assert_eq!(first.id(), page_key);
    assert_eq!(first.parent(), Some(layout_key.as_str()));

    let keys = engine.cached_keys();
    assert!(keys.contains(&page_key), "keys: {keys:?}");
    assert!(keys.contains(&layout_key), "keys: {keys:?}");
}

#[test]
fn test_absolute_names_bypass_root() {
    let temp = temp_dir_in_workspace();
    let other = temp_dir_in_workspace();
    let paths = write_templates(other.path(), &[("outside.html", "outside {{ n }}")]);
    let engine = engine_rooted_at(temp.path());

    let absolute = paths[0].to_string_lossy().into_owned();
    assert_eq!(engine.render_file(&absolute, json!({"n": 1})).unwrap(), "outside 1");
}

#[test]
fn test_relative_names_without_root() {
    let temp = temp_dir_in_workspace();
    let paths = write_templates(
        temp.path(),
        &[
            ("views/page.html", "{% include \"./shared/footer.html\" %}"),
            ("views/shared/footer.html", "footer {{ year }}"),
        ],
    );
    init_tracing();
    let engine = Engine::new(EngineConfig {
        debug: true,
        ..EngineConfig::default()
    });

    let page = paths[0].to_string_lossy().into_owned();
    assert_eq!(engine.render_file(&page, json!({"year": 2024})).unwrap(), "footer 2024");
}

#[test]
fn test_missing_file_is_load_error() {
    let temp = temp_dir_in_workspace();
    let engine = engine_rooted_at(temp.path());

    let err = engine.compile_file("nope.html").unwrap_err();
    match err {
        TemplateError::Load { name, message } => {
            assert!(name.ends_with("nope.html"), "name: {name}");
            assert!(
                message.contains("Failed to read template file"),
                "message: {message}"
            );
        }
        other => panic!("Expected Load error, got {other:?}"),
    }
}

#[test]
fn test_clear_cache_picks_up_edits() {
    let temp = temp_dir_in_workspace();
    write_templates(temp.path(), &[("page.html", "v1")]);
    let engine = engine_rooted_at(temp.path());

    assert_eq!(engine.render_file("page.html", json!({})).unwrap(), "v1");

    write_templates(temp.path(), &[("page.html", "v2")]);
    assert_eq!(
        engine.render_file("page.html", json!({})).unwrap(),
        "v1",
        "Cached template should still be served"
    );

    engine.clear_cache();
    assert_eq!(engine.render_file("page.html", json!({})).unwrap(), "v2");
}

#[test]
fn test_uncached_engine_rereads_files() {
    let temp = temp_dir_in_workspace();
    write_templates(temp.path(), &[("page.html", "v1")]);
    init_tracing();
    let engine = Engine::new(EngineConfig {
        root: Some(temp.path().to_path_buf()),
        cache: false,
        debug: true,
        ..EngineConfig::default()
    });

    assert_eq!(engine.render_file("page.html", json!({})).unwrap(), "v1");
    write_templates(temp.path(), &[("page.html", "v2")]);
    assert_eq!(engine.render_file("page.html", json!({})).unwrap(), "v2");
    assert!(engine.cached_keys().is_empty());
}

#[test]
fn test_dynamic_layout_from_disk() {
    let temp = temp_dir_in_workspace();
    write_templates(
        temp.path(),
        &[
            ("light.html", "light[{% block body %}{% endblock %}]"),
            ("dark.html", "dark[{% block body %}{% endblock %}]"),
            ("page.html", "{% extends theme %}{% block body %}{{ text }}{% endblock %}"),
        ],
    );
    let engine = engine_rooted_at(temp.path());

    let page = engine.compile_file("page.html").unwrap();
    assert!(!page.is_precompiled());
    assert_eq!(page.render(json!({"theme": "light.html", "text": "hi"})).unwrap(), "light[hi]");
    assert_eq!(page.render(json!({"theme": "dark.html", "text": "hi"})).unwrap(), "dark[hi]");
}

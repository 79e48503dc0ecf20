//! Built-in filter tests

use super::*;
use serde_json::json;

fn run(name: &str, input: Value, args: Vec<Value>) -> Value {
    FilterRegistry::builtin(0).apply(&input, &[(name, args)])
}

#[test]
fn test_apply_chains_left_to_right() {
    let registry = FilterRegistry::builtin(0);
    let out = registry.apply(
        &json!("  hello world"),
        &[("upper", vec![]), ("replace", vec![json!("^\\s+"), json!("")])],
    );
    assert_eq!(out, json!("HELLO WORLD"));
}

#[test]
fn test_apply_unknown_filter_passes_through() {
    let out = FilterRegistry::builtin(0).apply(&json!("x"), &[("bogus", vec![])]);
    assert_eq!(out, json!("x"));
}

#[test]
fn test_add() {
    assert_eq!(run("add", json!(1), vec![json!(2)]), json!(3));
    assert_eq!(run("add", json!([1]), vec![json!([2, 3])]), json!([1, 2, 3]));
    assert_eq!(run("add", json!({"a": 1}), vec![json!({"b": 2})]), json!({"a": 1, "b": 2}));
    assert_eq!(run("add", json!("a"), vec![json!(1)]), json!("a1"));
}

#[test]
fn test_addslashes() {
    assert_eq!(
        run("addslashes", json!(r#"it's "quoted" \ ok"#), vec![]),
        json!(r#"it\'s \"quoted\" \\ ok"#)
    );
}

#[test]
fn test_capitalize_and_title() {
    assert_eq!(run("capitalize", json!("hELLO world"), vec![]), json!("Hello world"));
    assert_eq!(run("title", json!("hello wORLD-wide web"), vec![]), json!("Hello World-wide Web"));
    assert_eq!(run("upper", json!(["a", ["b"]]), vec![]), json!(["A", ["B"]]));
}

#[test]
fn test_date_uses_registry_offset() {
    let registry = FilterRegistry::builtin(-60);
    let out = registry.apply(&json!("2013-09-03T14:07:05Z"), &[("date", vec![json!("H:i")])]);
    assert_eq!(out, json!("15:07"));

    let overridden = registry.apply(
        &json!("2013-09-03T14:07:05Z"),
        &[("date", vec![json!("H:i T"), json!(0), json!("Z")])],
    );
    assert_eq!(overridden, json!("14:07 Z"));
}

#[test]
fn test_date_invalid_input_is_empty() {
    assert_eq!(run("date", json!("yesterday"), vec![json!("Y")]), json!(""));
}

#[test]
fn test_default() {
    assert_eq!(run("default", json!(null), vec![json!("x")]), json!("x"));
    assert_eq!(run("default", json!(""), vec![json!("x")]), json!("x"));
    assert_eq!(run("default", json!(false), vec![json!("x")]), json!("x"));
    assert_eq!(run("default", json!(0), vec![json!("x")]), json!(0));
    assert_eq!(run("default", json!("set"), vec![json!("x")]), json!("set"));
}

#[test]
fn test_escape_kinds() {
    assert_eq!(run("e", json!("<b>"), vec![]), json!("&lt;b&gt;"));
    assert_eq!(run("escape", json!("<b>"), vec![json!("js")]), json!("\\u003Cb\\u003E"));
    assert_eq!(run("escape", json!(["<", {"k": ">"}]), vec![]), json!(["&lt;", {"k": "&gt;"}]));
}

#[test]
fn test_first_last() {
    assert_eq!(run("first", json!([1, 2, 3]), vec![]), json!(1));
    assert_eq!(run("last", json!([1, 2, 3]), vec![]), json!(3));
    assert_eq!(run("first", json!("abc"), vec![]), json!("a"));
    assert_eq!(run("last", json!("abc"), vec![]), json!("c"));
    assert_eq!(run("first", json!({"a": 1}), vec![]), json!(""));
    assert_eq!(run("last", json!([]), vec![]), json!(""));
}

#[test]
fn test_join() {
    assert_eq!(run("join", json!([1, "b", 3]), vec![json!(", ")]), json!("1, b, 3"));
    assert_eq!(run("join", json!({"a": 1, "b": 2}), vec![json!("-")]), json!("1-2"));
    assert_eq!(run("join", json!(5), vec![json!("-")]), json!(""));
}

#[test]
fn test_json_encode() {
    assert_eq!(run("json_encode", json!({"a": [1, 2]}), vec![]), json!(r#"{"a":[1,2]}"#));
    assert_eq!(
        run("json_encode", json!({"a": 1}), vec![json!(2)]),
        json!("{\n  \"a\": 1\n}")
    );
}

#[test]
fn test_length() {
    assert_eq!(run("length", json!([1, 2]), vec![]), json!(2));
    assert_eq!(run("length", json!("héllo"), vec![]), json!(5));
    assert_eq!(run("length", json!({"a": 1}), vec![]), json!(1));
    assert_eq!(run("length", json!(12), vec![]), json!(""));
}

#[test]
fn test_replace() {
    assert_eq!(
        run("replace", json!("aXbXc"), vec![json!("x"), json!("-"), json!("gi")]),
        json!("a-b-c")
    );
    assert_eq!(run("replace", json!("aXbXc"), vec![json!("X"), json!("-")]), json!("a-bXc"));
    assert_eq!(
        run("replace", json!("2013-09-03"), vec![json!("(\\d+)-(\\d+)"), json!("$2/$1")]),
        json!("09/2013-03")
    );
    assert_eq!(run("replace", json!("a(b"), vec![json!("("), json!("")]), json!("a(b"));
}

#[test]
fn test_reverse_and_uniq() {
    assert_eq!(run("reverse", json!([1, 2, 3]), vec![]), json!([3, 2, 1]));
    assert_eq!(run("reverse", json!("abc"), vec![]), json!("abc"));
    assert_eq!(run("uniq", json!([1, 2, 1, "1", 2]), vec![]), json!([1, 2, "1"]));
}

#[test]
fn test_striptags() {
    assert_eq!(
        run("striptags", json!("<p>Hello <b>there</b></p>"), vec![]),
        json!("Hello there")
    );
}

#[test]
fn test_url_encode_decode() {
    assert_eq!(run("url_encode", json!("a b&c"), vec![]), json!("a%20b%26c"));
    assert_eq!(run("url_decode", json!("a%20b%26c"), vec![]), json!("a b&c"));
}

#[test]
fn test_custom_filter_overrides_builtin() {
    let mut registry = FilterRegistry::builtin(0);
    registry.insert("upper", Arc::new(|_: &Value, _: &[Value]| json!("custom")));
    assert!(registry.contains("upper"));
    assert_eq!(registry.apply(&json!("x"), &[("upper", vec![])]), json!("custom"));
}

//! Token tree construction tests

use super::*;
use crate::template::engine::parser::{parse, FilterRef, LogicToken, Token};
use crate::template::tags::{Tag, TagRegistry};

fn tree(source: &str) -> Vec<Token> {
    parse(source, &TagRegistry::builtin(), Some(EscapeKind::Html)).unwrap()
}

fn tree_err(source: &str) -> TemplateError {
    parse(source, &TagRegistry::builtin(), Some(EscapeKind::Html)).unwrap_err()
}

fn logic(token: &Token) -> &LogicToken {
    match token {
        Token::Logic(logic) => logic,
        other => panic!("expected logic token, got {other:?}"),
    }
}

#[test]
fn test_nested_blocks_own_children() {
    let tokens = tree("{% if a %}{% for x in y %}{{ x }}{% endfor %}{% endif %}");
    assert_eq!(tokens.len(), 1);

    let if_token = logic(&tokens[0]);
    assert_eq!(if_token.tag, Tag::If);
    assert_eq!(if_token.args, "a");

    let for_token = logic(&if_token.tokens[0]);
    assert_eq!(for_token.tag, Tag::For);
    assert_eq!(for_token.words, vec!["x", "in", "y"]);
    assert_eq!(for_token.parents, vec!["if"]);
    assert!(matches!(&for_token.tokens[0], Token::Variable(v) if v.expr == "x"));
}

#[test]
fn test_strip_markers() {
    let tokens = tree("{%- if a -%} x {%- endif -%}");
    let strip = logic(&tokens[0]).strip;
    assert!(strip.before, "{{%- sets strip-before");
    assert!(strip.start, "-%}} on the opener trims the first child");
    assert!(strip.end, "{{%- on the closer trims the last child");
    assert!(strip.after, "-%}} on the closer trims the next sibling");
}

#[test]
fn test_strip_markers_are_independent() {
    let tokens = tree("{% set a = 1 -%}");
    let strip = logic(&tokens[0]).strip;
    assert!(!strip.before);
    assert!(strip.after);
}

#[test]
fn test_variable_filters() {
    let tokens = tree("{{ a|replace('x', 'y')|upper }}");
    let Token::Variable(variable) = &tokens[0] else {
        panic!("expected variable token");
    };
    assert_eq!(variable.expr, "a");
    assert_eq!(
        variable.filters,
        vec![
            FilterRef {
                name: "replace".to_string(),
                args: Some("'x', 'y'".to_string()),
            },
            FilterRef {
                name: "upper".to_string(),
                args: None,
            },
        ]
    );
    assert_eq!(variable.escape, Some(EscapeKind::Html));
}

#[test]
fn test_logical_or_is_not_a_filter() {
    let tokens = tree("{{ a || b }}");
    let Token::Variable(variable) = &tokens[0] else {
        panic!("expected variable token");
    };
    assert_eq!(variable.expr, "a || b");
    assert!(variable.filters.is_empty());
}

#[test]
fn test_safe_filter_disables_escape() {
    for source in ["{{ a|raw }}", "{{ a|e }}", "{{ a|escape('js') }}"] {
        let tokens = tree(source);
        let Token::Variable(variable) = &tokens[0] else {
            panic!("expected variable token");
        };
        assert_eq!(variable.escape, None, "{source}");
    }
}

#[test]
fn test_autoescape_scope_restored() {
    let tokens = tree("{% autoescape false %}{{ a }}{% endautoescape %}{{ b }}");

    let inner = &logic(&tokens[0]).tokens[0];
    assert!(matches!(inner, Token::Variable(v) if v.escape.is_none()));
    assert!(matches!(&tokens[1], Token::Variable(v) if v.escape == Some(EscapeKind::Html)));
}

#[test]
fn test_autoescape_kind() {
    let tokens = parse(
        "{% autoescape \"js\" %}{{ a }}{% endautoescape %}",
        &TagRegistry::builtin(),
        None,
    )
    .unwrap();
    let inner = &logic(&tokens[0]).tokens[0];
    assert!(matches!(inner, Token::Variable(v) if v.escape == Some(EscapeKind::Js)));
}

#[test]
fn test_autoescape_invalid_argument() {
    assert!(matches!(
        tree_err("{% autoescape maybe %}{% endautoescape %}"),
        TemplateError::InvalidArguments { .. }
    ));
}

#[test]
fn test_raw_block_is_literal() {
    let tokens = tree("{% raw %}{{ x }}{% if %}{% endraw %}");
    assert_eq!(tokens.len(), 1);

    let raw = logic(&tokens[0]);
    assert_eq!(raw.tag, Tag::Raw);
    assert_eq!(raw.tokens, vec![Token::Literal("{{ x }}{% if %}".to_string())]);
    assert!(!raw.strip.before && !raw.strip.start && !raw.strip.end && !raw.strip.after);
}

#[test]
fn test_raw_block_strip_markers() {
    let tokens = tree("a {%- raw -%} x {%- endraw -%} b");
    let raw = logic(&tokens[1]);
    assert!(raw.strip.before, "{{%- raw trims the preceding literal");
    assert!(raw.strip.start, "raw -%}} trims the body start");
    assert!(raw.strip.end, "{{%- endraw trims the body end");
    assert!(raw.strip.after, "endraw -%}} trims the following literal");
}

#[test]
fn test_arguments_regrouped() {
    let tokens = tree("{% set x = [1, 2, 3] %}{% set y = {a: \"b c\"} %}");
    assert_eq!(logic(&tokens[0]).words, vec!["x", "=", "[1, 2, 3]"]);
    assert_eq!(logic(&tokens[1]).words, vec!["y", "=", "{a: \"b c\"}"]);
}

#[test]
fn test_unclosed_argument() {
    assert_eq!(
        tree_err("\n{% set x = [1, 2 %}"),
        TemplateError::UnclosedArgument {
            arg: "[1, 2".to_string(),
            line: 2
        }
    );
}

#[test]
fn test_unknown_tag() {
    assert_eq!(
        tree_err("ok\n{% bogus %}"),
        TemplateError::UnknownTag {
            name: "bogus".to_string(),
            line: 2
        }
    );
}

#[test]
fn test_mismatched_end_tag() {
    assert_eq!(
        tree_err("{% if a %}\n{% endfor %}"),
        TemplateError::MismatchedEndTag {
            expected: "if".to_string(),
            opened: 1,
            found: "endfor".to_string(),
            line: 2
        }
    );
}

#[test]
fn test_end_tag_at_depth_zero() {
    assert!(matches!(
        tree_err("{% endif %}"),
        TemplateError::UnexpectedEndTag { line: 1, .. }
    ));
}

#[test]
fn test_unclosed_block() {
    assert_eq!(
        tree_err("{% for x in y %}\n{{ x }}"),
        TemplateError::UnclosedTag {
            name: "for".to_string(),
            line: 1
        }
    );
}

#[test]
fn test_else_outside_if() {
    assert!(matches!(
        tree_err("{% else %}"),
        TemplateError::MisplacedTag { .. }
    ));
    assert!(matches!(
        tree_err("{% if a %}{% set x = 1 %}{% filter upper %}{% else %}{% endfilter %}{% endif %}"),
        TemplateError::MisplacedTag { .. }
    ));
}

#[test]
fn test_block_nested_in_logic() {
    assert_eq!(
        tree_err("{% if a %}{% block body %}{% endblock %}{% endif %}"),
        TemplateError::IllegalBlockNesting {
            name: "body".to_string(),
            parent: "if".to_string(),
            line: 1
        }
    );
}

#[test]
fn test_block_nested_in_block() {
    let tokens = tree("{% block outer %}{% block inner %}x{% endblock %}{% endblock %}");
    let inner = logic(&logic(&tokens[0]).tokens[0]);
    assert_eq!(inner.words, vec!["inner"]);
}

#[test]
fn test_invalid_block_name() {
    assert!(matches!(
        tree_err("{% block 1st %}{% endblock %}"),
        TemplateError::InvalidBlockName { .. }
    ));
    assert!(matches!(
        tree_err("{% block a b %}{% endblock %}"),
        TemplateError::InvalidArguments { .. }
    ));
}

#[test]
fn test_nested_extends() {
    assert_eq!(
        tree_err("{% block a %}{% extends \"base\" %}{% endblock %}"),
        TemplateError::ExtendsNotFirst { line: 1 }
    );
}

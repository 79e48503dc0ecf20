//! Unit tests for TokenStream

use super::tokenize::{Delimiter, RawBody, Segment, TokenStream};
use super::*;

fn segments(source: &str) -> Vec<Segment<'_>> {
    TokenStream::new(source)
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[test]
fn test_text_only() {
    assert_eq!(
        segments("Hello, world!\nNo tags."),
        vec![Segment::Text {
            text: "Hello, world!\nNo tags.",
            line: 1
        }]
    );
}

#[test]
fn test_variable_and_logic_tags() {
    assert_eq!(
        segments("a {{ b }} c {% if d %}"),
        vec![
            Segment::Text { text: "a ", line: 1 },
            Segment::Tag {
                delimiter: Delimiter::Variable,
                content: " b ",
                line: 1
            },
            Segment::Text { text: " c ", line: 1 },
            Segment::Tag {
                delimiter: Delimiter::Logic,
                content: " if d ",
                line: 1
            },
        ]
    );
}

#[test]
fn test_adjacent_tags_have_no_empty_text() {
    let got = segments("{{ a }}{{ b }}");
    assert_eq!(got.len(), 2);
    assert!(got.iter().all(|s| matches!(s, Segment::Tag { .. })));
}

#[test]
fn test_comment_skipped_but_counts_lines() {
    let got = segments("a{# one\ntwo #}\n{{ z }}");
    assert_eq!(
        got,
        vec![
            Segment::Text { text: "a", line: 1 },
            Segment::Text { text: "\n", line: 2 },
            Segment::Tag {
                delimiter: Delimiter::Variable,
                content: " z ",
                line: 3
            },
        ]
    );
}

#[test]
fn test_lone_braces_are_text() {
    assert_eq!(
        segments("fn main() { let x = {a: 1}; }"),
        vec![Segment::Text {
            text: "fn main() { let x = {a: 1}; }",
            line: 1
        }]
    );
}

#[test]
fn test_brace_inside_tag() {
    // A `}` alone does not close a variable tag
    let got = segments("{{ {a: 1} }}");
    assert_eq!(
        got,
        vec![Segment::Tag {
            delimiter: Delimiter::Variable,
            content: " {a: 1} ",
            line: 1
        }]
    );
}

#[test]
fn test_percent_inside_logic_tag() {
    let got = segments("{% set x = \"50%\" %}");
    assert_eq!(
        got,
        vec![Segment::Tag {
            delimiter: Delimiter::Logic,
            content: " set x = \"50%\" ",
            line: 1
        }]
    );
}

#[test]
fn test_tag_line_numbers() {
    let got = segments("one\ntwo\n{{ three }}\n\n{% four %}");
    let lines: Vec<usize> = got
        .iter()
        .filter_map(|s| match s {
            Segment::Tag { line, .. } => Some(*line),
            Segment::Text { .. } => None,
        })
        .collect();
    assert_eq!(lines, vec![3, 5]);
}

#[test]
fn test_unclosed_variable() {
    let result: Result<Vec<_>, _> = TokenStream::new("text\n{{ open").collect();
    assert_eq!(
        result.unwrap_err(),
        TemplateError::UnclosedDelimiter {
            delimiter: "{{",
            line: 2
        }
    );
}

#[test]
fn test_unclosed_comment() {
    let result: Result<Vec<_>, _> = TokenStream::new("{# never closed").collect();
    assert!(matches!(
        result,
        Err(TemplateError::UnclosedDelimiter { delimiter: "{#", line: 1 })
    ));
}

#[test]
fn test_take_raw() {
    let mut stream = TokenStream::new("{% raw %}{{ x }}\n{% if %}{% endraw %}after");
    assert!(matches!(
        stream.next(),
        Some(Ok(Segment::Tag { delimiter: Delimiter::Logic, .. }))
    ));

    assert_eq!(stream.take_raw(1).unwrap().text, "{{ x }}\n{% if %}");
    assert_eq!(stream.line(), 2);
    assert_eq!(
        stream.next(),
        Some(Ok(Segment::Text {
            text: "after",
            line: 2
        }))
    );
    assert_eq!(stream.next(), None);
}

#[test]
fn test_take_raw_with_strip_markers() {
    let mut stream = TokenStream::new("{% raw %}body{%- endraw -%}");
    stream.next();
    assert_eq!(
        stream.take_raw(1).unwrap(),
        RawBody {
            text: "body",
            strip_before: true,
            strip_after: true,
        }
    );
}

#[test]
fn test_take_raw_unclosed() {
    let mut stream = TokenStream::new("\n{% raw %}{{ x }}");
    stream.next();
    stream.next();
    assert_eq!(stream.take_raw(2), Err(TemplateError::UnclosedRaw { line: 2 }));
}

#[test]
fn test_large_input_terminates() {
    let mut large_input = String::with_capacity(10_000);
    for i in 0..500 {
        large_input.push_str(&format!("Text before {{{{ key{i} }}}} text after. "));
    }

    let tokens: Vec<_> = TokenStream::new(&large_input).collect();

    let tags = tokens
        .iter()
        .filter(|t| matches!(t, Ok(Segment::Tag { .. })))
        .count();
    assert_eq!(tags, 500);
    // One text run before each tag plus the trailing one
    assert_eq!(tokens.len(), 1001);
}

#[test]
fn test_malformed_open_braces_terminate() {
    let input = "{".repeat(5_000);
    let tokens: Vec<_> = TokenStream::new(&input).collect();
    assert!(matches!(
        tokens.last(),
        Some(Err(TemplateError::UnclosedDelimiter { .. }))
    ));
}

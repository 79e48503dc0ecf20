//! Output escaping

use serde::{Deserialize, Serialize};

/// How output is escaped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeKind {
    /// HTML entities for `& < > " '`
    #[default]
    Html,
    /// `\uXXXX` escapes safe inside a JavaScript string literal
    Js,
}

impl EscapeKind {
    /// `"html"` or `"js"`
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "html" => Some(Self::Html),
            "js" => Some(Self::Js),
            _ => None,
        }
    }

    pub fn apply(self, text: &str) -> String {
        match self {
            Self::Html => escape_html(text),
            Self::Js => escape_js(text),
        }
    }
}

/// Entities left alone so already-escaped text is not escaped twice
const ENTITIES: &[&str] = &["amp;", "lt;", "gt;", "quot;", "#39;"];

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for (idx, ch) in text.char_indices() {
        match ch {
            '&' => {
                let rest = &text[idx + 1..];
                if ENTITIES.iter().any(|entity| rest.starts_with(entity)) {
                    out.push('&');
                } else {
                    out.push_str("&amp;");
                }
            }
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }

    out
}

fn escape_js(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '\\' | '"' | '\'' | '<' | '>' | '&' | '=' | '-' | ';' | '\u{2028}' | '\u{2029}' => {
                out.push_str(&format!("\\u{:04X}", u32::from(ch)));
            }
            _ => out.push(ch),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            EscapeKind::Html.apply(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_html_escape_is_idempotent_on_entities() {
        assert_eq!(EscapeKind::Html.apply("&amp; &lt; &#39; &copy;"), "&amp; &lt; &#39; &amp;copy;");
    }

    #[test]
    fn test_js_escape() {
        assert_eq!(
            EscapeKind::Js.apply(r#"a"b'c\<d>"#),
            "a\\u0022b\\u0027c\\u005C\\u003Cd\\u003E"
        );
        assert_eq!(EscapeKind::Js.apply("x=1;-"), "x\\u003D1\\u003B\\u002D");
    }

    #[test]
    fn test_from_name() {
        assert_eq!(EscapeKind::from_name("js"), Some(EscapeKind::Js));
        assert_eq!(EscapeKind::from_name("html"), Some(EscapeKind::Html));
        assert_eq!(EscapeKind::from_name("xml"), None);
    }
}

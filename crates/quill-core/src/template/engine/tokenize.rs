//! Tokenization for template engine
//!
//! Splits template source into text runs and `{{ }}` / `{% %}` tags in a
//! single forward pass. Comments (`{# #}`) are consumed here and never reach
//! the parser, but their newlines still advance the line counter.

use crate::template::error::TemplateError;

/// Tag delimiter family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delimiter {
    /// `{{ ... }}`
    Variable,
    /// `{% ... %}`
    Logic,
    /// `{# ... #}`
    Comment,
}

impl Delimiter {
    /// Classify the byte following a `{`
    fn from_second_byte(byte: u8) -> Option<Self> {
        match byte {
            b'{' => Some(Self::Variable),
            b'%' => Some(Self::Logic),
            b'#' => Some(Self::Comment),
            _ => None,
        }
    }

    /// First byte of the closing delimiter (the second is always `}`)
    fn close_byte(self) -> u8 {
        match self {
            Self::Variable => b'}',
            Self::Logic => b'%',
            Self::Comment => b'#',
        }
    }

    pub(crate) fn opening(self) -> &'static str {
        match self {
            Self::Variable => "{{",
            Self::Logic => "{%",
            Self::Comment => "{#",
        }
    }
}

/// A run of source text or the inside of a tag
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment<'a> {
    Text {
        text: &'a str,
        line: usize,
    },
    Tag {
        delimiter: Delimiter,
        /// Content between the delimiters, untrimmed
        content: &'a str,
        /// Line where the opening delimiter starts
        line: usize,
    },
}

/// Tokenization state machine
///
/// ```text
/// Normal ──{──> SeenLBrace ──{ % #──> InTag ──close──> SeenClose ──}──> [Yield Tag] → Normal
///   │               │                   │                  │
///   │               │ (other)           │                  │ (other)
///   └<──────────────┘                   └<─────────────────┘
/// ```
///
/// Every byte is examined at most twice (once more after a failed lookahead),
/// so scanning stays linear in the input size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ScanState {
    /// Plain text
    Normal,

    /// Seen `{`, the next byte decides whether a tag starts
    SeenLBrace { pos: usize },

    /// Inside a tag, scanning for its closing delimiter
    InTag {
        delimiter: Delimiter,
        content_start: usize,
        line: usize,
    },

    /// Seen the first byte of the closing delimiter
    SeenClose {
        delimiter: Delimiter,
        content_start: usize,
        close_pos: usize,
        line: usize,
    },
}

/// Iterator over text and tag segments of a template
pub(crate) struct TokenStream<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    state: ScanState,
    /// Start of the pending text run
    text_start: usize,
    /// Line where the pending text run starts
    text_line: usize,
    /// Current line number (for error messages)
    line: usize,
    finished: bool,
}

impl<'a> TokenStream<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            state: ScanState::Normal,
            text_start: 0,
            text_line: 1,
            line: 1,
            finished: false,
        }
    }

    /// Current line number
    pub fn line(&self) -> usize {
        self.line
    }

    /// Consume everything up to the matching `{% endraw %}` verbatim
    ///
    /// Must be called right after the `{% raw %}` tag was yielded.
    pub fn take_raw(&mut self, opened_line: usize) -> Result<RawBody<'a>, TemplateError> {
        let rest = &self.source[self.pos..];
        let end = find_endraw(rest).ok_or(TemplateError::UnclosedRaw { line: opened_line })?;

        self.line += count_newlines(&rest[..end.tag_end]);
        self.pos += end.tag_end;
        self.text_start = self.pos;
        self.text_line = self.line;
        self.state = ScanState::Normal;

        Ok(RawBody {
            text: &rest[..end.body_end],
            strip_before: end.strip_before,
            strip_after: end.strip_after,
        })
    }

    /// Handle a byte in Normal state
    fn process_normal(&mut self, byte: u8) {
        if byte == b'{' {
            self.state = ScanState::SeenLBrace { pos: self.pos };
        } else if byte == b'\n' {
            self.line += 1;
        }
        self.pos += 1;
    }

    /// Handle the byte after a `{`
    ///
    /// Returns the text run preceding a newly opened tag, if any.
    fn process_seen_lbrace(&mut self, byte: u8, lbrace_pos: usize) -> Option<Segment<'a>> {
        let Some(delimiter) = Delimiter::from_second_byte(byte) else {
            // Lone `{`: reprocess this byte as plain text
            self.state = ScanState::Normal;
            return None;
        };

        self.pos += 1;
        self.state = ScanState::InTag {
            delimiter,
            content_start: self.pos,
            line: self.line,
        };

        (lbrace_pos > self.text_start).then(|| Segment::Text {
            text: &self.source[self.text_start..lbrace_pos],
            line: self.text_line,
        })
    }

    fn process_in_tag(&mut self, byte: u8, delimiter: Delimiter, content_start: usize, line: usize) {
        if byte == delimiter.close_byte() {
            self.state = ScanState::SeenClose {
                delimiter,
                content_start,
                close_pos: self.pos,
                line,
            };
        } else if byte == b'\n' {
            self.line += 1;
        }
        self.pos += 1;
    }
}

impl<'a> Iterator for TokenStream<'a> {
    type Item = Result<Segment<'a>, TemplateError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        while self.pos < self.bytes.len() {
            let byte = self.bytes[self.pos];

            match self.state {
                ScanState::Normal => self.process_normal(byte),
                ScanState::SeenLBrace { pos } => {
                    if let Some(text) = self.process_seen_lbrace(byte, pos) {
                        return Some(Ok(text));
                    }
                }
                ScanState::InTag {
                    delimiter,
                    content_start,
                    line,
                } => self.process_in_tag(byte, delimiter, content_start, line),
                ScanState::SeenClose {
                    delimiter,
                    content_start,
                    close_pos,
                    line,
                } => {
                    if byte != b'}' {
                        // Not a closing delimiter after all: reprocess inside the tag
                        self.state = ScanState::InTag {
                            delimiter,
                            content_start,
                            line,
                        };
                        continue;
                    }

                    self.pos += 1;
                    self.state = ScanState::Normal;
                    self.text_start = self.pos;
                    self.text_line = self.line;

                    if delimiter == Delimiter::Comment {
                        continue;
                    }

                    return Some(Ok(Segment::Tag {
                        delimiter,
                        content: &self.source[content_start..close_pos],
                        line,
                    }));
                }
            }
        }

        self.finished = true;
        match self.state {
            ScanState::InTag {
                delimiter, line, ..
            }
            | ScanState::SeenClose {
                delimiter, line, ..
            } => Some(Err(TemplateError::UnclosedDelimiter {
                delimiter: delimiter.opening(),
                line,
            })),
            ScanState::Normal | ScanState::SeenLBrace { .. } => {
                (self.text_start < self.bytes.len()).then(|| {
                    Ok(Segment::Text {
                        text: &self.source[self.text_start..],
                        line: self.text_line,
                    })
                })
            }
        }
    }
}

/// Verbatim body of a raw block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBody<'a> {
    pub text: &'a str,
    /// `{%- endraw`
    pub strip_before: bool,
    /// `endraw -%}`
    pub strip_after: bool,
}

struct EndRaw {
    body_end: usize,
    tag_end: usize,
    strip_before: bool,
    strip_after: bool,
}

/// Locate `{% endraw %}` (with optional strip markers)
fn find_endraw(text: &str) -> Option<EndRaw> {
    let mut from = 0;

    while let Some(offset) = text[from..].find("{%") {
        let open = from + offset;
        let close = open + 2 + text[open + 2..].find("%}")?;

        let inner = text[open + 2..close].trim();
        let (strip_before, inner) = match inner.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, inner),
        };
        let (strip_after, inner) = match inner.strip_suffix('-') {
            Some(rest) => (true, rest),
            None => (false, inner),
        };
        if inner.trim() == "endraw" {
            return Some(EndRaw {
                body_end: open,
                tag_end: close + 2,
                strip_before,
                strip_after,
            });
        }

        from = open + 2;
    }

    None
}

/// Count newlines in text
pub(crate) fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

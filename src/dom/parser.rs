//! Markup-string parser.
//!
//! `render_template` implementations return a markup string; this parser
//! turns it into a detached [`MarkupNode`] tree that the document arena then
//! materializes. The dialect is deliberately small: elements, quoted and bare
//! attributes, text, self-closing tags, `<!-- -->` comments. Runs of
//! insignificant whitespace in text are collapsed to a single space.

use thiserror::Error;

/// A parsed, detached markup tree. Produced by [`parse`], consumed by
/// `Document::insert_fragment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<MarkupNode>,
    },
    Text(String),
}

/// Errors produced while parsing a markup string. Offsets are byte positions
/// into the input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkupError {
    #[error("markup is empty")]
    Empty,

    #[error("markup must have a single root element, found extra content at byte {at}")]
    MultipleRoots { at: usize },

    #[error("unexpected end of markup inside {context}")]
    UnexpectedEof { context: &'static str },

    #[error("invalid tag name at byte {at}")]
    InvalidTag { at: usize },

    #[error("mismatched closing tag at byte {at}: expected </{expected}>, found </{found}>")]
    MismatchedClose {
        expected: String,
        found: String,
        at: usize,
    },

    #[error("unterminated attribute value at byte {at}")]
    UnterminatedAttribute { at: usize },

    #[error("text is not allowed outside the root element (byte {at})")]
    TextOutsideRoot { at: usize },
}

/// Tags that never carry children and close themselves even without `/>`.
const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "meta"];

/// Parse a markup string into exactly one root element.
pub fn parse(markup: &str) -> Result<MarkupNode, MarkupError> {
    let mut parser = Parser::new(markup);
    parser.skip_trivia()?;
    if parser.at_end() {
        return Err(MarkupError::Empty);
    }
    if !parser.starts_with("<") {
        return Err(MarkupError::TextOutsideRoot { at: parser.pos });
    }
    let root = parser.parse_element()?;
    parser.skip_trivia()?;
    if !parser.at_end() {
        return Err(MarkupError::MultipleRoots { at: parser.pos });
    }
    Ok(root)
}

/// Escape text content for serialization.
pub(crate) fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape an attribute value for serialization inside double quotes.
pub(crate) fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.input[self.pos..].starts_with(prefix)
    }

    /// Skip whitespace and comments between top-level constructs.
    fn skip_trivia(&mut self) -> Result<(), MarkupError> {
        loop {
            while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
                self.pos += 1;
            }
            if self.starts_with("<!--") {
                self.skip_comment()?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_comment(&mut self) -> Result<(), MarkupError> {
        debug_assert!(self.starts_with("<!--"));
        match self.input[self.pos..].find("-->") {
            Some(offset) => {
                self.pos += offset + "-->".len();
                Ok(())
            }
            None => Err(MarkupError::UnexpectedEof { context: "comment" }),
        }
    }

    fn parse_element(&mut self) -> Result<MarkupNode, MarkupError> {
        debug_assert_eq!(self.peek(), Some(b'<'));
        let open_at = self.pos;
        self.pos += 1;
        if self.peek() == Some(b'/') {
            return Err(MarkupError::InvalidTag { at: open_at });
        }
        let tag = self.read_name();
        if tag.is_empty() {
            return Err(MarkupError::InvalidTag { at: open_at });
        }

        let attributes = self.parse_attributes()?;

        // Closing of the open tag: either "/>" (self-closing) or ">".
        let self_closing = if self.starts_with("/>") {
            self.pos += 2;
            true
        } else if self.peek() == Some(b'>') {
            self.pos += 1;
            false
        } else {
            return Err(MarkupError::UnexpectedEof { context: "open tag" });
        };

        if self_closing || VOID_TAGS.contains(&tag.as_str()) {
            return Ok(MarkupNode::Element {
                tag,
                attributes,
                children: Vec::new(),
            });
        }

        let children = self.parse_children(&tag)?;
        Ok(MarkupNode::Element {
            tag,
            attributes,
            children,
        })
    }

    fn parse_children(&mut self, open_tag: &str) -> Result<Vec<MarkupNode>, MarkupError> {
        let mut children = Vec::new();
        loop {
            if self.at_end() {
                return Err(MarkupError::UnexpectedEof { context: "element" });
            }
            if self.starts_with("<!--") {
                self.skip_comment()?;
                continue;
            }
            if self.starts_with("</") {
                let close_at = self.pos;
                self.pos += 2;
                let found = self.read_name();
                self.skip_spaces();
                if self.peek() != Some(b'>') {
                    return Err(MarkupError::UnexpectedEof { context: "close tag" });
                }
                self.pos += 1;
                if found != open_tag {
                    return Err(MarkupError::MismatchedClose {
                        expected: open_tag.to_string(),
                        found,
                        at: close_at,
                    });
                }
                return Ok(children);
            }
            if self.peek() == Some(b'<') {
                children.push(self.parse_element()?);
                continue;
            }
            if let Some(text) = self.parse_text() {
                children.push(MarkupNode::Text(text));
            }
        }
    }

    /// Consume a run of raw text up to the next `<`. Whitespace runs are
    /// collapsed to a single space; a run that collapses to nothing yields
    /// `None` (template indentation is not content).
    fn parse_text(&mut self) -> Option<String> {
        let start = self.pos;
        while !self.at_end() && self.peek() != Some(b'<') {
            self.pos += 1;
        }
        let raw = &self.input[start..self.pos];
        let collapsed = collapse_whitespace(raw);
        if collapsed.is_empty() {
            None
        } else {
            Some(unescape(&collapsed))
        }
    }

    fn parse_attributes(&mut self) -> Result<Vec<(String, String)>, MarkupError> {
        let mut attributes = Vec::new();
        loop {
            self.skip_spaces();
            match self.peek() {
                None => return Err(MarkupError::UnexpectedEof { context: "open tag" }),
                Some(b'>') | Some(b'/') => return Ok(attributes),
                _ => {}
            }
            let name_at = self.pos;
            let name = self.read_name();
            if name.is_empty() {
                return Err(MarkupError::InvalidTag { at: name_at });
            }
            self.skip_spaces();
            if self.peek() != Some(b'=') {
                // Bare boolean attribute, e.g. `disabled`.
                attributes.push((name, String::new()));
                continue;
            }
            self.pos += 1;
            self.skip_spaces();
            let quote = match self.peek() {
                Some(q @ (b'"' | b'\'')) => q,
                _ => return Err(MarkupError::UnterminatedAttribute { at: name_at }),
            };
            self.pos += 1;
            let value_start = self.pos;
            while self.peek() != Some(quote) {
                if self.at_end() {
                    return Err(MarkupError::UnterminatedAttribute { at: name_at });
                }
                self.pos += 1;
            }
            let value = unescape(&self.input[value_start..self.pos]);
            self.pos += 1;
            attributes.push((name, value));
        }
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(b) if b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
        ) {
            self.pos += 1;
        }
        self.input[start..self.pos].to_string()
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }
}

fn collapse_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_space = true; // leading whitespace is dropped
    for ch in raw.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

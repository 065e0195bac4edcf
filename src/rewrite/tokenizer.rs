//! Incremental HTML tokenizer.
//!
//! Pull-based: callers [`feed`](Tokenizer::feed) bytes as they arrive and
//! drain [`next_token`](Tokenizer::next_token) until it returns `None`. Every
//! byte fed comes back out in exactly one token's `raw`, so concatenating the
//! raw bytes reproduces the input.
//!
//! This is a lexer for locating tags, not a conforming HTML5 tokenizer: no
//! entity decoding, no tree construction, no error recovery beyond treating
//! anything it cannot classify as text.

use axum::body::Bytes;

/// Elements whose content is not markup.
const RAW_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "textarea", "title"];

/// An unterminated tag or comment longer than this is given up on and
/// released as text.
pub const MAX_PENDING_TAG: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    StartTag { name: String, self_closing: bool },
    EndTag { name: String },
    Text,
    Comment,
    /// Doctype, processing instructions and other `<!…>` / `<?…>` constructs.
    Markup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub raw: Bytes,
}

impl Token {
    pub fn is_start(&self, tag: &str) -> bool {
        matches!(&self.kind, TokenKind::StartTag { name, .. } if name == tag)
    }

    pub fn is_end(&self, tag: &str) -> bool {
        matches!(&self.kind, TokenKind::EndTag { name } if name == tag)
    }
}

/// Outcome of scanning at the current position.
enum Scan {
    /// A token spanning `len` bytes.
    Complete(TokenKind, usize),
    /// Not enough input yet.
    Incomplete,
}

#[derive(Debug, Default)]
pub struct Tokenizer {
    buf: Vec<u8>,
    pos: usize,
    /// Set inside a raw text element; holds its lowercase name.
    raw_text_end: Option<String>,
    finished: bool,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        self.buf.extend_from_slice(chunk);
    }

    /// Mark the end of input; pending bytes are flushed by `next_token`.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Bytes fed but not yet returned in a token.
    pub fn pending(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn next_token(&mut self) -> Option<Token> {
        if self.pos >= self.buf.len() {
            return None;
        }

        let (kind, len) = match self.raw_text_end.clone() {
            Some(name) => match self.scan_raw_text(&name) {
                Some(len) => (TokenKind::Text, len),
                None => {
                    self.raw_text_end = None;
                    return self.next_token();
                }
            },
            None => match self.scan() {
                Scan::Complete(kind, len) => (kind, len),
                Scan::Incomplete if self.finished || self.pending() > MAX_PENDING_TAG => {
                    (TokenKind::Text, self.text_len(self.pos + 1))
                }
                Scan::Incomplete => return None,
            },
        };

        if len == 0 {
            return None;
        }

        if let TokenKind::StartTag { name, self_closing: false } = &kind {
            if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                self.raw_text_end = Some(name.clone());
            }
        }

        let raw = Bytes::copy_from_slice(&self.buf[self.pos..self.pos + len]);
        self.pos += len;
        Some(Token { kind, raw })
    }

    /// Length of the text run starting at `pos` with the scan resuming at `from`.
    fn text_len(&self, from: usize) -> usize {
        let end = find_byte(&self.buf, from, b'<').unwrap_or(self.buf.len());
        end - self.pos
    }

    fn scan(&self) -> Scan {
        let buf = &self.buf;
        let start = self.pos;

        if buf[start] != b'<' {
            return Scan::Complete(TokenKind::Text, self.text_len(start));
        }

        let Some(&next) = buf.get(start + 1) else {
            return Scan::Incomplete;
        };

        match next {
            b'!' => {
                let rest = &buf[start..];
                if rest.starts_with(b"<!--") {
                    match find_seq(buf, start + 4, b"-->") {
                        Some(end) => Scan::Complete(TokenKind::Comment, end + 3 - start),
                        None => Scan::Incomplete,
                    }
                } else if b"<!--".starts_with(rest) {
                    Scan::Incomplete
                } else {
                    close_markup(buf, start)
                }
            }
            b'?' => close_markup(buf, start),
            b'/' => match buf.get(start + 2) {
                None => Scan::Incomplete,
                Some(c) if c.is_ascii_alphabetic() => {
                    let (name, name_end) = read_name(buf, start + 2);
                    match find_byte(buf, name_end, b'>') {
                        Some(end) => Scan::Complete(TokenKind::EndTag { name }, end + 1 - start),
                        None => Scan::Incomplete,
                    }
                }
                Some(_) => close_markup(buf, start),
            },
            c if c.is_ascii_alphabetic() => {
                let (name, name_end) = read_name(buf, start + 1);
                match find_tag_end(buf, name_end) {
                    Some(end) => {
                        let self_closing = end > name_end && buf[end - 1] == b'/';
                        Scan::Complete(TokenKind::StartTag { name, self_closing }, end + 1 - start)
                    }
                    None => Scan::Incomplete,
                }
            }
            _ => Scan::Complete(TokenKind::Text, self.text_len(start + 1)),
        }
    }

    /// Text inside a raw text element, up to its closing tag.
    ///
    /// `None` once the closing tag is at the current position.
    fn scan_raw_text(&self, name: &str) -> Option<usize> {
        let start = self.pos;
        let mut from = start;
        while let Some(lt) = find_seq(&self.buf, from, b"</") {
            let name_start = lt + 2;
            let name_end = name_start + name.len();
            if name_end < self.buf.len() {
                let candidate = &self.buf[name_start..name_end];
                let boundary = self.buf[name_end];
                if candidate.eq_ignore_ascii_case(name.as_bytes())
                    && (boundary == b'>' || boundary == b'/' || boundary.is_ascii_whitespace())
                {
                    return if lt == start { None } else { Some(lt - start) };
                }
            } else if !self.finished {
                // Possibly a split closing tag; hold it back.
                return Some(lt - start);
            }
            from = lt + 2;
        }

        if self.finished {
            return Some(self.buf.len() - start);
        }
        // Keep a tail long enough to hold a split "</name".
        let keep = name.len() + 2;
        Some(self.buf.len().saturating_sub(keep).saturating_sub(start))
    }
}

fn find_byte(buf: &[u8], from: usize, needle: u8) -> Option<usize> {
    buf.get(from..)?.iter().position(|&b| b == needle).map(|i| from + i)
}

fn find_seq(buf: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    buf.get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| from + i)
}

fn close_markup(buf: &[u8], start: usize) -> Scan {
    match find_byte(buf, start, b'>') {
        Some(end) => Scan::Complete(TokenKind::Markup, end + 1 - start),
        None => Scan::Incomplete,
    }
}

/// Lowercased tag name starting at `from`, and the index just past it.
fn read_name(buf: &[u8], from: usize) -> (String, usize) {
    let end = buf[from..]
        .iter()
        .position(|&b| b.is_ascii_whitespace() || b == b'/' || b == b'>')
        .map_or(buf.len(), |i| from + i);
    (String::from_utf8_lossy(&buf[from..end]).to_ascii_lowercase(), end)
}

/// Index of the `>` closing a start tag whose attributes begin at `from`.
///
/// Quotes only delimit attribute values, so they are honored after `=`.
fn find_tag_end(buf: &[u8], from: usize) -> Option<usize> {
    enum State {
        Attrs,
        AfterEquals,
        Quoted(u8),
    }

    let mut state = State::Attrs;
    for (i, &b) in buf.iter().enumerate().skip(from) {
        state = match state {
            State::Attrs | State::AfterEquals if b == b'>' => return Some(i),
            State::Attrs if b == b'=' => State::AfterEquals,
            State::Attrs => State::Attrs,
            State::AfterEquals if b.is_ascii_whitespace() => State::AfterEquals,
            State::AfterEquals if b == b'"' || b == b'\'' => State::Quoted(b),
            State::AfterEquals => State::Attrs,
            State::Quoted(q) if b == q => State::Attrs,
            State::Quoted(q) => State::Quoted(q),
        };
    }
    None
}

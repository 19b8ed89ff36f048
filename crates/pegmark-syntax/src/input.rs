//! # Input Buffer
//!
//! The grammar runs over an immutable, random-access sequence of `char`s.
//! Indexing by `char` (rather than byte) keeps every terminal matcher a
//! single comparison and makes spans count characters, which is what a
//! renderer slicing the original text wants.
//!
//! Container constructs (block quotes, list items, definitions) build a new
//! buffer out of pieces of the current one with [`InnerSource`] and hand it
//! to a fresh parse. Each character of such a buffer remembers where it came
//! from in the top-level document, so spans recorded during the nested parse
//! still point into the original source.

use crate::ast::Span;

/// An immutable character buffer with an optional origin table.
#[derive(Debug, Clone)]
pub struct InputBuffer {
    chars: Vec<char>,
    /// For sub-parse buffers: top-level index of every character.
    /// `None` means the buffer *is* the top-level document.
    origin: Option<Vec<usize>>,
    /// Length of the caller's source; spans never extend past it.
    source_len: usize,
}

impl InputBuffer {
    /// Creates a top-level buffer from `source`, appending `padding` newlines.
    ///
    /// The padding characters are addressable by the grammar but spans are
    /// clamped to the length of `source`.
    pub fn new(source: &str, padding: usize) -> Self {
        let mut chars: Vec<char> = source.chars().collect();
        let source_len = chars.len();
        chars.extend(std::iter::repeat_n('\n', padding));
        Self {
            chars,
            origin: None,
            source_len,
        }
    }

    /// Number of characters, padding included.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Character at `pos`, or `None` past the end.
    #[inline]
    pub fn get(&self, pos: usize) -> Option<char> {
        self.chars.get(pos).copied()
    }

    /// Characters in `start..end` collected into a `String`.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.chars.len());
        let start = start.min(end);
        self.chars[start..end].iter().collect()
    }

    /// Returns true if the characters at `pos` spell out `lit`.
    pub fn matches_at(&self, pos: usize, lit: &str) -> bool {
        let mut i = pos;
        for c in lit.chars() {
            if self.get(i) != Some(c) {
                return false;
            }
            i += 1;
        }
        true
    }

    /// Top-level index of the character at `pos`.
    ///
    /// Positions at or past the end map to one past the origin of the last
    /// character, so half-open span ends translate correctly.
    pub fn origin_of(&self, pos: usize) -> usize {
        match &self.origin {
            None => pos,
            Some(origin) => match origin.get(pos) {
                Some(&o) => o,
                None => origin.last().map_or(0, |&o| o + 1),
            },
        }
    }

    /// Translates a local half-open range into a span of the top-level source.
    pub fn span(&self, start: usize, end: usize) -> Span {
        let (start, end) = match &self.origin {
            None => (start, end),
            Some(_) if end <= start => {
                let s = self.origin_of(start);
                (s, s)
            }
            Some(_) => (self.origin_of(start), self.origin_of(end - 1) + 1),
        };
        let end = end.min(self.source_len);
        Span::new(start.min(end), end)
    }

    /// 1-based line and column of `pos` within this buffer.
    pub fn line_col(&self, pos: usize) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;
        for &c in self.chars.iter().take(pos) {
            if c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }
}

/// Builder for the buffer of a container's inner document.
///
/// Pieces are copied from the enclosing buffer together with their origins;
/// synthetic characters (separating newlines) inherit the origin of the
/// character before them.
#[derive(Debug, Clone, Default)]
pub struct InnerSource {
    chars: Vec<char>,
    origin: Vec<usize>,
}

impl InnerSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies `start..end` of `from`.
    pub fn push_range(&mut self, from: &InputBuffer, start: usize, end: usize) {
        for pos in start..end.min(from.len()) {
            if let Some(c) = from.get(pos) {
                self.chars.push(c);
                self.origin.push(from.origin_of(pos));
            }
        }
    }

    /// Copies the line content `start..end` of `from` followed by a `'\n'`
    /// standing in for the line end at `end`, whatever form it had.
    pub fn push_line(&mut self, from: &InputBuffer, start: usize, end: usize) {
        self.push_range(from, start, end);
        self.chars.push('\n');
        self.origin.push(from.origin_of(end));
    }

    /// Appends a character that does not exist in the source.
    pub fn push_synthetic(&mut self, c: char) {
        let origin = self.origin.last().copied().unwrap_or(0);
        self.chars.push(c);
        self.origin.push(origin);
    }

    /// Appends `text` as synthetic characters.
    pub fn push_synthetic_str(&mut self, text: &str) {
        for c in text.chars() {
            self.push_synthetic(c);
        }
    }

    /// Appends everything in `other`.
    pub fn append(&mut self, other: InnerSource) {
        self.chars.extend(other.chars);
        self.origin.extend(other.origin);
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// The text accumulated so far.
    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    /// Seals the builder into a buffer that clamps spans like `parent` does.
    pub fn into_buffer(self, parent: &InputBuffer) -> InputBuffer {
        InputBuffer {
            chars: self.chars,
            origin: Some(self.origin),
            source_len: parent.source_len,
        }
    }
}

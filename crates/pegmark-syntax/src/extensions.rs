//! Extension capability set and parser options.
//!
//! Extensions change the *shape* of the grammar, not just the output: they
//! decide which alternatives are inserted into the block and inline ordered
//! choices when a [`Grammar`](crate::parser::grammar::Grammar) is compiled,
//! and which characters stop a run of plain text.

use bitflags::bitflags;

bitflags! {
    /// Optional syntax beyond the core Markdown grammar.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Extensions: u32 {
        /// Ellipsis, en-dash, em-dash and apostrophe marks.
        const SMARTS = 1;
        /// Typographic single, double and double-angle quotes.
        const QUOTES = 1 << 1;
        /// Abbreviation definitions (`*[HTML]: Hypertext Markup Language`).
        const ABBREVIATIONS = 1 << 2;
        /// Every line end inside a paragraph becomes a hard line break.
        const HARDWRAPS = 1 << 3;
        /// Bare URLs and email addresses become links without `<...>`.
        const AUTOLINKS = 1 << 4;
        /// Pipe tables.
        const TABLES = 1 << 5;
        /// Definition lists.
        const DEFINITIONS = 1 << 6;
        /// Code blocks delimited by ``` or ~~~ fences.
        const FENCED_CODE_BLOCKS = 1 << 7;
        /// HTML blocks are kept as empty placeholder nodes.
        const SUPPRESS_HTML_BLOCKS = 1 << 16;
        /// Inline HTML is kept as empty placeholder nodes.
        const SUPPRESS_INLINE_HTML = 1 << 17;

        const SMARTYPANTS = Self::SMARTS.bits() | Self::QUOTES.bits();
        const SUPPRESS_ALL_HTML =
            Self::SUPPRESS_HTML_BLOCKS.bits() | Self::SUPPRESS_INLINE_HTML.bits();
        /// Every syntax extension; HTML suppression is not included.
        const ALL = Self::SMARTYPANTS.bits()
            | Self::ABBREVIATIONS.bits()
            | Self::HARDWRAPS.bits()
            | Self::AUTOLINKS.bits()
            | Self::TABLES.bits()
            | Self::DEFINITIONS.bits()
            | Self::FENCED_CODE_BLOCKS.bits();
    }
}

impl Extensions {
    /// Plain Markdown.
    pub const NONE: Extensions = Extensions::empty();

    /// Looks up a single flag by its lowercase name, e.g. `"fenced_code_blocks"`.
    pub fn by_name(name: &str) -> Option<Extensions> {
        Extensions::all()
            .iter_names()
            .chain([
                ("SMARTYPANTS", Extensions::SMARTYPANTS),
                ("SUPPRESS_ALL_HTML", Extensions::SUPPRESS_ALL_HTML),
                ("ALL", Extensions::ALL),
            ])
            .find(|(flag, _)| flag.eq_ignore_ascii_case(name))
            .map(|(_, ext)| ext)
    }

    /// Characters that never belong to a plain text run.
    ///
    /// The base set covers every character that can open an inline
    /// construct; extensions add the characters their rules start with.
    pub fn special_chars(self) -> String {
        let mut chars = String::from("*_`&[]<>!\\");
        if self.contains(Extensions::QUOTES) {
            chars.push_str("'\"");
        }
        if self.contains(Extensions::SMARTS) {
            chars.push_str(".-");
        }
        if self.contains(Extensions::AUTOLINKS) {
            chars.push_str("(){}");
        }
        if self.contains(Extensions::TABLES) {
            chars.push('|');
        }
        chars
    }
}

/// Default nesting ceiling for named rules, summed across nested parses.
pub const DEFAULT_MAX_DEPTH: usize = 96;

/// Everything a [`MarkdownParser`](crate::MarkdownParser) is configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    pub extensions: Extensions,
    /// Ceiling on the nesting of blocks and inline constructs. Exceeding it
    /// fails the parse with [`ParseError::RecursionBudget`](crate::ParseError).
    ///
    /// Only constructs that can still close count: an emphasis marker or
    /// `[` with no possible closer later in the paragraph stays text
    /// without opening a level.
    pub max_depth: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            extensions: Extensions::NONE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParserOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl From<Extensions> for ParserOptions {
    fn from(extensions: Extensions) -> Self {
        Self::default().with_extensions(extensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(Extensions::NONE, "*_`&[]<>!\\")]
    #[case(Extensions::QUOTES, "*_`&[]<>!\\'\"")]
    #[case(Extensions::SMARTS, "*_`&[]<>!\\.-")]
    #[case(Extensions::AUTOLINKS, "*_`&[]<>!\\(){}")]
    #[case(Extensions::TABLES, "*_`&[]<>!\\|")]
    #[case(Extensions::ALL, "*_`&[]<>!\\'\".-(){}|")]
    fn special_chars_follow_extensions(#[case] ext: Extensions, #[case] expected: &str) {
        assert_eq!(ext.special_chars(), expected);
    }

    #[test]
    fn all_excludes_suppression() {
        assert!(!Extensions::ALL.intersects(Extensions::SUPPRESS_ALL_HTML));
        assert!(Extensions::ALL.contains(Extensions::SMARTYPANTS));
    }

    #[rstest]
    #[case("smarts", Some(Extensions::SMARTS))]
    #[case("Fenced_Code_Blocks", Some(Extensions::FENCED_CODE_BLOCKS))]
    #[case("smartypants", Some(Extensions::SMARTYPANTS))]
    #[case("wikilinks", None)]
    fn lookup_by_name(#[case] name: &str, #[case] expected: Option<Extensions>) {
        assert_eq!(Extensions::by_name(name), expected);
    }

    #[test]
    fn options_builder() {
        let options = ParserOptions::new()
            .with_extensions(Extensions::TABLES)
            .with_max_depth(12);
        assert_eq!(options.extensions, Extensions::TABLES);
        assert_eq!(options.max_depth, 12);
    }
}

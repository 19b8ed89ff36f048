//! # pegmark-syntax
//!
//! A Markdown parser driven by a backtracking PEG grammar. It turns source
//! text into a typed abstract syntax tree that a renderer walks afterwards.
//!
//! ## Architecture Overview
//!
//! ```text
//! Source Text → InputBuffer → Grammar rules over Parser → Root
//!                             (value stack + side tables)
//! ```
//!
//! ### 1. Input (`input` module)
//!
//! The source is held as a vector of `char`s. Container constructs (block
//! quotes, list items, definitions) copy their content lines into a new
//! buffer and parse it again; every character remembers where it came from,
//! so spans always index the original document.
//!
//! ### 2. Parser (`parser` module)
//!
//! Rules are plain functions over `Parser` that either match or
//! fail without a trace. The grammar builds the tree on an explicit value
//! stack and records reference and abbreviation definitions in document-wide
//! side tables.
//!
//! ### 3. Result ([`Root`])
//!
//! Top-level blocks plus the reference table and abbreviation list. Links
//! to references are not resolved during the parse; [`ReferenceTable::get`]
//! does that for the renderer.
//!
//! ## Module Structure
//!
//! ```text
//! pegmark-syntax/
//! ├── lib.rs           # This file - MarkdownParser and parse()
//! ├── ast.rs           # Node, NodeKind, Root, Span
//! ├── extensions.rs    # Extensions flags and ParserOptions
//! ├── error.rs         # ParseError
//! ├── input.rs         # InputBuffer and InnerSource
//! ├── tables.rs        # ReferenceTable and the per-parse side tables
//! └── parser/
//!     ├── mod.rs       # Parser state, value stack, transactions
//!     ├── combinators.rs
//!     ├── memo.rs      # RuleKey and the failure cache
//!     ├── trace.rs     # ParseTracer hooks
//!     ├── subparse.rs  # Recursive parses of container contents
//!     └── grammar/     # The Markdown rules
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use pegmark_syntax::{Extensions, MarkdownParser, NodeKind, ParserOptions};
//!
//! let parser = MarkdownParser::new(ParserOptions::from(Extensions::SMARTS));
//! let root = parser.parse("# Hello\n\nIt's *here*.\n").unwrap();
//!
//! assert_eq!(root.children.len(), 2);
//! assert_eq!(root.children[0].kind, NodeKind::Header { level: 1 });
//! assert_eq!(root.children[1].kind, NodeKind::Para);
//! ```

pub mod ast;
mod error;
pub mod extensions;
mod input;
mod parser;
mod tables;

pub use ast::{
    Alignment, LinkKind, LinkTarget, Mark, Node, NodeKind, QuoteKind, Root, Span,
};
pub use error::ParseError;
pub use extensions::{DEFAULT_MAX_DEPTH, Extensions, ParserOptions};
pub use parser::grammar::list::ListKind;
pub use parser::memo::RuleKey;
pub use parser::trace::{LogTracer, NoopTracer, ParseTracer};
pub use tables::{ReferenceEntry, ReferenceTable, normalize_reference_key};

use input::InputBuffer;
use parser::Parser;
use parser::grammar::{self, Grammar};
use tables::SideTables;

/// Newlines appended to every top-level document so that its last block is
/// terminated like any other.
const INPUT_PADDING: usize = 2;

/// A configured parser. The grammar is compiled once in [`new`](Self::new)
/// and shared by every document parsed afterwards.
pub struct MarkdownParser {
    options: ParserOptions,
    grammar: Grammar,
}

impl MarkdownParser {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            grammar: Grammar::compile(options.extensions),
            options,
        }
    }

    pub fn options(&self) -> ParserOptions {
        self.options
    }

    /// Parse one document.
    pub fn parse(&self, source: &str) -> Result<Root, ParseError> {
        self.parse_traced(source, &mut NoopTracer)
    }

    /// Parse one document, reporting every named rule to `tracer`.
    pub fn parse_traced(
        &self,
        source: &str,
        tracer: &mut dyn ParseTracer,
    ) -> Result<Root, ParseError> {
        let input = InputBuffer::new(source, INPUT_PADDING);
        let mut tables = SideTables::new();
        let root = {
            let mut parser = Parser::new(
                &input,
                &self.grammar,
                &mut tables,
                tracer,
                self.options.max_depth,
            );
            let matched = grammar::root(&mut parser);
            parser.finish(matched)?
        };
        log::debug!(
            "parsed {} chars into {} blocks, {} references, {} abbreviations",
            input.len() - INPUT_PADDING,
            root.children.len(),
            tables.references.len(),
            tables.abbreviations.len()
        );
        Ok(Root {
            children: root.children,
            references: tables.references,
            abbreviations: tables.abbreviations,
            span: Some(Span::new(0, input.len() - INPUT_PADDING)),
        })
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new(ParserOptions::default())
    }
}

/// Parse `source` with no extensions enabled.
pub fn parse(source: &str) -> Result<Root, ParseError> {
    MarkdownParser::default().parse(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    #[test]
    fn snapshot_simple_paragraph() {
        let root = parse("Hello, world!\n").unwrap();
        assert_snapshot!(root.to_string(), @r#"
        Root
          Para
            Text "Hello, world!"
        "#);
    }

    #[test]
    fn snapshot_heading() {
        let root = parse("# Hello\n").unwrap();
        assert_snapshot!(root.to_string(), @r#"
        Root
          Header h1
            Text "Hello"
        "#);
    }

    #[test]
    fn snapshot_inline_elements() {
        let root = parse("Text with `code` and *emphasis* and **strong**.\n").unwrap();
        assert_snapshot!(root.to_string(), @r#"
        Root
          Para
            Text "Text with "
            Code "code"
            Text " and "
            Emph
              Text "emphasis"
            Text " and "
            Strong
              Text "strong"
            Text "."
        "#);
    }

    #[test]
    fn snapshot_nested_content() {
        let root = parse("# Heading\n\n> A quote\n\n- List item\n").unwrap();
        assert_snapshot!(root.to_string(), @r#"
        Root
          Header h1
            Text "Heading"
          BlockQuote
            Para
              Text "A quote"
          BulletList tight
            ListItem tight
              Super
                Text "List item"
        "#);
    }

    #[test]
    fn missing_final_newline_is_tolerated() {
        let root = parse("last line").unwrap();
        assert_eq!(root.to_string(), "Root\n  Para\n    Text \"last line\"\n");
    }

    #[test]
    fn empty_input() {
        let root = parse("").unwrap();
        assert!(root.children.is_empty());
        assert_eq!(root.span, Some(Span::new(0, 0)));
    }

    #[test]
    fn root_span_covers_source_chars() {
        let root = parse("héllo\n").unwrap();
        assert_eq!(root.span, Some(Span::new(0, 6)));
    }

    #[test]
    fn references_are_collected_for_forward_links() {
        let root = parse("see [x]\n\n[x]: /url \"Title\"\n").unwrap();
        assert_eq!(root.children.len(), 1);
        let target = root.references.get("X").unwrap();
        assert_eq!(target.url, "/url");
        assert_eq!(target.title.as_deref(), Some("Title"));
    }

    #[test]
    fn parser_is_reusable() {
        let parser = MarkdownParser::new(ParserOptions::from(Extensions::ABBREVIATIONS));
        let first = parser.parse("*[HTML]: markup\n\nHTML\n").unwrap();
        let second = parser.parse("plain\n").unwrap();
        assert_eq!(first.abbreviations.len(), 1);
        assert!(second.abbreviations.is_empty());
    }

    #[test]
    fn nesting_budget_is_enforced() {
        let parser = MarkdownParser::new(ParserOptions::new().with_max_depth(8));
        let source = format!("{}deep\n", "> ".repeat(20));
        let err = parser.parse(&source).unwrap_err();
        assert!(matches!(err, ParseError::RecursionBudget { limit: 8, .. }));
    }

    #[derive(Default)]
    struct Counter {
        entered: usize,
        exited: usize,
    }

    impl ParseTracer for Counter {
        fn enter(&mut self, _rule: RuleKey, _pos: usize) {
            self.entered += 1;
        }

        fn exit(&mut self, _rule: RuleKey, _pos: usize, _matched: bool) {
            self.exited += 1;
        }
    }

    #[test]
    fn tracer_observes_without_changing_the_result() {
        let parser = MarkdownParser::default();
        let source = "# T\n\n* a\n* b\n";
        let mut counter = Counter::default();
        let traced = parser.parse_traced(source, &mut counter).unwrap();
        assert!(counter.entered > 0);
        assert_eq!(counter.entered, counter.exited);
        assert_eq!(traced, parser.parse(source).unwrap());
    }
}

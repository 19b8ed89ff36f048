//! # Grammar
//!
//! The Markdown rules, written as plain functions over [`Parser`].
//!
//! ## Shape
//!
//! ```text
//! Root   = Block* BlankLine* EOI
//! Block  = BlankLine* ( BlockQuote / Verbatim / [Abbreviation] / [Table]
//!                     / Reference / HorizontalRule / Heading / OrderedList
//!                     / BulletList / HtmlBlock / [DefinitionList]
//!                     / [FencedCodeBlock] / Para / Inlines )
//! Inline = Link / Str / Endline / UlOrStarLine / Space / Strong / Emph
//!        / Image / Code / InlineHtml / Entity / EscapedChar
//!        / [SingleQuoted / DoubleQuoted / DoubleAngleQuoted] / [Smarts]
//!        / Symbol
//! ```
//!
//! Bracketed alternatives only exist when their extension is enabled:
//! [`Grammar::compile`] builds the two ordered-choice lists once per
//! configuration, so a disabled construct is not merely rejected, it is
//! never tried. The character class that ends a plain text run is fixed at
//! the same time.
//!
//! ## Module Structure
//!
//! - `block` - paragraphs, headings, quotes, code blocks, rules, definitions
//! - `list` - bullet, ordered and definition lists
//! - `html` - HTML blocks and inline HTML
//! - `table` - pipe tables
//! - `inline` - inline sequences, line ends, text, code spans, typography
//! - `emphasis` - emphasis and strong
//! - `link` - links, images and autolinks

pub mod block;
pub mod emphasis;
pub mod html;
pub mod inline;
pub mod link;
pub mod list;
pub mod table;

use crate::ast::{Node, NodeKind};
use crate::extensions::Extensions;

use super::Parser;
use super::memo::RuleKey;

/// A grammar rule.
pub type Rule = fn(&mut Parser<'_>) -> bool;

/// The rule set for one extension configuration.
pub struct Grammar {
    extensions: Extensions,
    blocks: Vec<Rule>,
    inlines: Vec<Rule>,
    special: [bool; 128],
}

impl Grammar {
    pub fn compile(extensions: Extensions) -> Self {
        let mut blocks: Vec<Rule> = vec![block::block_quote, block::verbatim];
        if extensions.contains(Extensions::ABBREVIATIONS) {
            blocks.push(block::abbreviation);
        }
        if extensions.contains(Extensions::TABLES) {
            blocks.push(table::table);
        }
        let core: [Rule; 6] = [
            block::reference,
            block::horizontal_rule,
            block::heading,
            list::ordered_list,
            list::bullet_list,
            html::html_block,
        ];
        blocks.extend(core);
        if extensions.contains(Extensions::DEFINITIONS) {
            blocks.push(list::definition_list);
        }
        if extensions.contains(Extensions::FENCED_CODE_BLOCKS) {
            blocks.push(block::fenced_code_block);
        }
        blocks.push(block::para);
        blocks.push(inline::inlines);

        let mut inlines: Vec<Rule> = vec![
            link::link,
            inline::str,
            inline::endline,
            emphasis::ul_or_star_line,
            inline::space,
            emphasis::strong,
            emphasis::emph,
            link::image,
            inline::code,
            html::inline_html,
            inline::entity,
            inline::escaped_char,
        ];
        if extensions.contains(Extensions::QUOTES) {
            let quotes: [Rule; 3] = [
                inline::single_quoted,
                inline::double_quoted,
                inline::double_angle_quoted,
            ];
            inlines.extend(quotes);
        }
        if extensions.contains(Extensions::SMARTS) {
            inlines.push(inline::smarts);
        }
        inlines.push(inline::symbol);

        let mut special = [false; 128];
        for c in extensions.special_chars().chars() {
            special[c as usize] = true;
        }

        log::debug!(
            "compiled grammar for {extensions:?}: {} block and {} inline alternatives",
            blocks.len(),
            inlines.len()
        );
        Self {
            extensions,
            blocks,
            inlines,
            special,
        }
    }

    pub fn extensions(&self) -> Extensions {
        self.extensions
    }

    /// Whether `c` can never be part of a plain text run.
    #[inline]
    pub fn is_special(&self, c: char) -> bool {
        c.is_ascii() && self.special[c as usize]
    }
}

impl Parser<'_> {
    /// Whether `extension` is enabled for this parse.
    pub fn ext(&self, extension: Extensions) -> bool {
        self.grammar().extensions.contains(extension)
    }
}

// === Document structure ===

pub fn root(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::Root, |p| {
        p.push(Node::new(NodeKind::Root))
            && p.zero_or_more(|p| {
                let height = p.stack_len();
                // definitions register themselves and leave nothing behind
                block(p) && (p.stack_len() == height || p.add_as_child())
            })
            && p.zero_or_more(blank_line)
            && p.eoi()
    })
}

pub fn block(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::Block, |p| {
        let rules = &p.grammar().blocks;
        p.zero_or_more(blank_line) && rules.iter().any(|rule| rule(p))
    })
}

pub fn inline(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::Inline, |p| {
        let rules = &p.grammar().inlines;
        rules.iter().any(|rule| rule(p))
    })
}

// === Characters ===

pub fn spacechar(p: &mut Parser<'_>) -> bool {
    p.any_of(" \t")
}

/// Optional run of spaces and tabs.
pub fn sp(p: &mut Parser<'_>) -> bool {
    p.skip_while(|c| c == ' ' || c == '\t')
}

/// Spaces, optionally spanning one line end.
pub fn spn1(p: &mut Parser<'_>) -> bool {
    sp(p) && p.optional(|p| newline(p) && sp(p))
}

pub fn newline(p: &mut Parser<'_>) -> bool {
    p.ch('\n') || (p.ch('\r') && p.optional(|p| p.ch('\n')))
}

pub fn nonspacechar(p: &mut Parser<'_>) -> bool {
    p.char_if("non-space character", |c| !matches!(c, ' ' | '\t' | '\n' | '\r'))
}

/// Up to three spaces.
pub fn nonindent_space(p: &mut Parser<'_>) -> bool {
    p.literal("   ") || p.literal("  ") || p.literal(" ") || true
}

pub fn indent(p: &mut Parser<'_>) -> bool {
    p.ch('\t') || p.literal("    ")
}

pub fn letter(p: &mut Parser<'_>) -> bool {
    p.char_if("letter", |c| c.is_ascii_alphabetic())
}

pub fn digit(p: &mut Parser<'_>) -> bool {
    p.char_range('0', '9')
}

pub fn alphanumeric(p: &mut Parser<'_>) -> bool {
    p.char_if("letter or digit", |c| c.is_ascii_alphanumeric())
}

pub fn special_char(p: &mut Parser<'_>) -> bool {
    let grammar = p.grammar();
    p.char_if("special character", |c| grammar.is_special(c))
}

/// A character that belongs in a plain text run.
pub fn normal_char(p: &mut Parser<'_>) -> bool {
    let grammar = p.grammar();
    p.char_if("text", |c| {
        !grammar.is_special(c) && !matches!(c, ' ' | '\t' | '\n' | '\r')
    })
}

// === Lines ===

pub fn blank_line(p: &mut Parser<'_>) -> bool {
    p.seq(|p| sp(p) && newline(p))
}

/// Consume the rest of the line and its line end, returning the range of
/// the content.
pub fn line_range(p: &mut Parser<'_>) -> Option<(usize, usize)> {
    p.seq_value(|p| {
        let start = p.pos();
        p.skip_while(|c| c != '\n' && c != '\r');
        let end = p.pos();
        newline(p).then_some((start, end))
    })
}

/// Consume a blank line, returning the empty range at its line end.
pub fn blank_line_range(p: &mut Parser<'_>) -> Option<(usize, usize)> {
    p.seq_value(|p| {
        sp(p);
        let at = p.pos();
        newline(p).then_some((at, at))
    })
}

/// Consume a line and record its content range in `lines`.
pub fn line_into(p: &mut Parser<'_>, lines: &mut Vec<(usize, usize)>) -> bool {
    match line_range(p) {
        Some(range) => {
            lines.push(range);
            true
        }
        None => false,
    }
}

/// Consume a blank line and record it in `lines` as an empty line.
pub fn blank_line_into(p: &mut Parser<'_>, lines: &mut Vec<(usize, usize)>) -> bool {
    match blank_line_range(p) {
        Some(range) => {
            lines.push(range);
            true
        }
        None => false,
    }
}

/// The text of a consumed line, line end normalised to `'\n'`.
pub fn line_text(p: &Parser<'_>, (start, end): (usize, usize)) -> String {
    let mut text = p.slice(start, end);
    text.push('\n');
    text
}

pub fn indented_line(p: &mut Parser<'_>) -> Option<(usize, usize)> {
    p.seq_value(|p| if indent(p) { line_range(p) } else { None })
}

pub fn optionally_indented_line(p: &mut Parser<'_>) -> Option<(usize, usize)> {
    p.seq_value(|p| {
        p.optional(indent);
        line_range(p)
    })
}

pub fn nonblank_indented_line(p: &mut Parser<'_>) -> Option<(usize, usize)> {
    if p.test_not(blank_line) {
        indented_line(p)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputBuffer;
    use crate::parser::trace::NoopTracer;
    use crate::tables::SideTables;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn run<R>(source: &str, ext: Extensions, f: impl FnOnce(&mut Parser<'_>) -> R) -> R {
        let input = InputBuffer::new(source, 0);
        let grammar = Grammar::compile(ext);
        let mut tables = SideTables::new();
        let mut tracer = NoopTracer;
        let mut parser = Parser::new(&input, &grammar, &mut tables, &mut tracer, 64);
        f(&mut parser)
    }

    #[test]
    fn extensions_change_the_alternative_lists() {
        let plain = Grammar::compile(Extensions::NONE);
        let full = Grammar::compile(Extensions::ALL);
        assert_eq!(plain.blocks.len(), 10);
        assert_eq!(full.blocks.len(), 14);
        assert_eq!(plain.inlines.len(), 13);
        assert_eq!(full.inlines.len(), 17);
    }

    #[rstest]
    #[case(Extensions::NONE, '|', false)]
    #[case(Extensions::TABLES, '|', true)]
    #[case(Extensions::NONE, '*', true)]
    #[case(Extensions::SMARTS, '.', true)]
    #[case(Extensions::ALL, 'a', false)]
    #[case(Extensions::ALL, 'é', false)]
    fn special_class_follows_extensions(
        #[case] ext: Extensions,
        #[case] c: char,
        #[case] special: bool,
    ) {
        assert_eq!(Grammar::compile(ext).is_special(c), special);
    }

    #[rstest]
    #[case("\n", true, 1)]
    #[case("\r\n", true, 2)]
    #[case("\rx", true, 1)]
    #[case("x", false, 0)]
    fn newline_forms(#[case] source: &str, #[case] matched: bool, #[case] end: usize) {
        run(source, Extensions::NONE, |p| {
            assert_eq!(newline(p), matched);
            assert_eq!(p.pos(), end);
        });
    }

    #[test]
    fn line_range_excludes_the_line_end() {
        run("ab\r\ncd", Extensions::NONE, |p| {
            assert_eq!(line_range(p), Some((0, 2)));
            assert_eq!(p.pos(), 4);
            // no line end: not a line
            assert_eq!(line_range(p), None);
            assert_eq!(p.pos(), 4);
        });
    }

    #[test]
    fn nonindent_space_takes_at_most_three() {
        run("     x", Extensions::NONE, |p| {
            assert!(nonindent_space(p));
            assert_eq!(p.pos(), 3);
        });
    }
}

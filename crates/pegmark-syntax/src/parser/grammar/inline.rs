//! Inline sequences, line ends, plain text, code spans, entities and
//! typographic marks.

use crate::ast::{Mark, Node, NodeKind, QuoteKind};
use crate::extensions::Extensions;

use super::super::Parser;
use super::super::memo::RuleKey;
use super::{
    alphanumeric, blank_line, digit, inline, newline, nonspacechar, normal_char, sp, spacechar,
    special_char,
};

/// One or more inlines, up to (and consuming, but dropping) the line end
/// that finishes them. Pushes a `Super` holding the inlines.
pub fn inlines(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::Inlines, |p| {
        let start = p.pos();
        if !(p.push(Node::new(NodeKind::Super))
            && inline_or_intermediate_endline(p)
            && p.add_as_child()
            && p.zero_or_more(|p| inline_or_intermediate_endline(p) && p.add_as_child()))
        {
            return false;
        }
        let end = p.pos();
        p.mark_span(start, end) && p.optional(|p| endline(p) && p.drop_top())
    })
}

fn inline_or_intermediate_endline(p: &mut Parser<'_>) -> bool {
    p.seq(|p| p.test_not(endline) && inline(p)) || p.seq(|p| endline(p) && p.test(inline))
}

// === Line ends ===

pub fn endline(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::Endline, |p| {
        line_break(p) || terminal_endline(p) || normal_endline(p)
    })
}

/// Two or more spaces before a line end.
fn line_break(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        let start = p.pos();
        p.literal("  ")
            && normal_endline(p)
            && p.drop_top()
            && p.push_spanned(Node::mark(Mark::Linebreak), start)
    })
}

fn terminal_endline(p: &mut Parser<'_>) -> bool {
    p.seq(|p| sp(p) && newline(p) && p.eoi() && p.push(Node::text("\n")))
}

/// A line end that continues the paragraph: the next line is not blank,
/// not a quote, not an ATX heading and not the text of a Setext heading.
fn normal_endline(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        let start = p.pos();
        sp(p)
            && newline(p)
            && p.test_not(|p| {
                blank_line(p)
                    || p.ch('>')
                    || super::block::atx_start(p).is_some()
                    || (super::line_range(p).is_some()
                        && (p.n_or_more('=', 3) || p.n_or_more('-', 3))
                        && newline(p))
            })
            && if p.ext(Extensions::HARDWRAPS) {
                p.push_spanned(Node::mark(Mark::Linebreak), start)
            } else {
                p.push_spanned(Node::text("\n"), start)
            }
    })
}

// === Text ===

pub fn str(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        let start = p.pos();
        p.one_or_more(normal_char) && {
            let text = p.slice(start, p.pos());
            p.push_spanned(Node::text(text), start)
        }
    })
}

/// A run of spaces and tabs, collapsed to one space.
pub fn space(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        let start = p.pos();
        p.one_or_more(spacechar) && p.push_spanned(Node::text(" "), start)
    })
}

/// A special character that no other inline rule wanted.
pub fn symbol(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        let start = p.pos();
        special_char(p) && {
            let text = p.slice(start, p.pos());
            p.push_spanned(Node::text(text), start)
        }
    })
}

pub fn escaped_char(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        let start = p.pos();
        p.ch('\\')
            && p.test_not(newline)
            && p.any()
            && {
                let escaped = p.slice(start + 1, p.pos());
                p.push_spanned(Node::new(NodeKind::SpecialText(escaped)), start)
            }
    })
}

/// `&#x1F;`, `&#123;` or `&name;`, kept verbatim.
pub fn entity(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::Entity, |p| {
        let start = p.pos();
        (hex_entity(p) || dec_entity(p) || char_entity(p)) && {
            let text = p.slice(start, p.pos());
            p.push_spanned(Node::new(NodeKind::Entity(text)), start)
        }
    })
}

fn hex_entity(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        p.literal("&#")
            && p.literal_ignore_case("x")
            && p.one_or_more(|p| p.char_if("hex digit", |c| c.is_ascii_hexdigit()))
            && p.ch(';')
    })
}

fn dec_entity(p: &mut Parser<'_>) -> bool {
    p.seq(|p| p.literal("&#") && p.one_or_more(digit) && p.ch(';'))
}

fn char_entity(p: &mut Parser<'_>) -> bool {
    p.seq(|p| p.ch('&') && p.one_or_more(alphanumeric) && p.ch(';'))
}

// === Code spans ===

/// A code span delimited by 1 to 5 backticks.
pub fn code(p: &mut Parser<'_>) -> bool {
    (1..=5).any(|n| code_with(p, n))
}

/// Exactly `n` backticks, not followed by another.
fn ticks(p: &mut Parser<'_>, n: usize) -> bool {
    p.seq(|p| (0..n).all(|_| p.ch('`')) && p.test_not(|p| p.ch('`')))
}

fn code_with(p: &mut Parser<'_>, n: usize) -> bool {
    p.rule(RuleKey::Code { ticks: n }, |p| {
        let start = p.pos();
        if !(ticks(p, n) && sp(p)) {
            return false;
        }
        let body = p.pos();
        let matched = p.one_or_more(|p| {
            p.seq(|p| p.test_not(|p| p.ch('`')) && nonspacechar(p))
                || p.seq(|p| p.test_not(|p| ticks(p, n)) && p.one_or_more(|p| p.ch('`')))
                || p.seq(|p| {
                    p.test_not(|p| sp(p) && ticks(p, n))
                        && (spacechar(p) || p.seq(|p| newline(p) && p.test_not(blank_line)))
                })
        });
        if !matched {
            return false;
        }
        let text = p.slice(body, p.pos());
        sp(p) && ticks(p, n) && p.push_spanned(Node::new(NodeKind::Code(text)), start)
    })
}

// === Typography ===

pub fn smarts(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::Smarts, |p| {
        let start = p.pos();
        let mark = if p.literal("...") || p.literal(". . .") {
            Mark::Ellipsis
        } else if p.literal("---") {
            Mark::Emdash
        } else if p.literal("--") {
            Mark::Endash
        } else if p.ch('\'') {
            Mark::Apostrophe
        } else {
            return false;
        };
        p.push_spanned(Node::mark(mark), start)
    })
}

pub fn single_quoted(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::Quoted(QuoteKind::Single), |p| {
        let start = p.pos();
        single_quote_start(p)
            && p.push(Node::new(NodeKind::Quoted(QuoteKind::Single)))
            && p.one_or_more(|p| p.test_not(single_quote_end) && inline(p) && p.add_as_child())
            && single_quote_end(p)
            && {
                let end = p.pos();
                p.mark_span(start, end)
            }
    })
}

/// An opening `'` that is not an apostrophe in `it's`, `I've`, `I'll`,
/// `I'm`, `they're` and the like.
fn single_quote_start(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        p.ch('\'')
            && p.test_not(|p| p.any_of(")!],.;:-? \t\n"))
            && p.test_not(|p| {
                (p.any_of("st") || p.ch('m') || p.literal("ve") || p.literal("ll") || p.literal("re"))
                    && p.test_not(alphanumeric)
            })
    })
}

fn single_quote_end(p: &mut Parser<'_>) -> bool {
    p.seq(|p| p.ch('\'') && p.test_not(alphanumeric))
}

pub fn double_quoted(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::Quoted(QuoteKind::Double), |p| {
        let start = p.pos();
        p.ch('"')
            && p.push(Node::new(NodeKind::Quoted(QuoteKind::Double)))
            && p.one_or_more(|p| p.test_not(|p| p.ch('"')) && inline(p) && p.add_as_child())
            && p.ch('"')
            && {
                let end = p.pos();
                p.mark_span(start, end)
            }
    })
}

/// `<< text >>`, with padding spaces kept as non-breaking spaces.
pub fn double_angle_quoted(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::Quoted(QuoteKind::DoubleAngle), |p| {
        let start = p.pos();
        p.literal("<<")
            && p.push(Node::new(NodeKind::Quoted(QuoteKind::DoubleAngle)))
            && p.optional(|p| spacechar(p) && nbsp(p))
            && p.one_or_more(|p| {
                p.seq(|p| {
                    p.one_or_more(spacechar) && p.test(|p| p.literal(">>")) && nbsp(p)
                }) || p.seq(|p| p.test_not(|p| p.literal(">>")) && inline(p) && p.add_as_child())
            })
            && p.literal(">>")
            && {
                let end = p.pos();
                p.mark_span(start, end)
            }
    })
}

fn nbsp(p: &mut Parser<'_>) -> bool {
    p.push(Node::mark(Mark::Nbsp)) && p.add_as_child()
}

//! Emphasis and strong emphasis.
//!
//! Both are one parameterized rule, [`emph_or_strong`], instantiated for
//! `*`, `_`, `**` and `__`. The marker and its width are part of the rule's
//! cache key, so a failed attempt at a position is never repeated.
//!
//! Runs of four or more markers, and runs with a space on either side, are
//! plain text ([`ul_or_star_line`]). Such runs can never open emphasis, which
//! is what keeps long lines of `*` from backtracking through every possible
//! nesting.

use crate::ast::{Node, NodeKind};

use super::super::Parser;
use super::super::memo::RuleKey;
use super::{alphanumeric, inline, newline, spacechar};

/// A guarded run of `_` or `*`, pushed as text.
pub fn ul_or_star_line(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::UlOrStarLine, |p| {
        let start = p.pos();
        (char_line(p, '_') || char_line(p, '*')) && {
            let text = p.slice(start, p.pos());
            p.push_spanned(Node::text(text), start)
        }
    })
}

/// Four or more `c`, or a space followed by a run of `c` followed by a space.
fn char_line(p: &mut Parser<'_>, c: char) -> bool {
    p.n_or_more(c, 4)
        || p.seq(|p| spacechar(p) && p.one_or_more(|p| p.ch(c)) && p.test(spacechar))
}

pub fn strong(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::Strong, |p| {
        emph_or_strong(p, '*', true) || emph_or_strong(p, '_', true)
    })
}

pub fn emph(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::Emph, |p| {
        emph_or_strong(p, '*', false) || emph_or_strong(p, '_', false)
    })
}

fn marker(p: &mut Parser<'_>, c: char, double: bool) -> bool {
    p.seq(|p| p.ch(c) && (!double || p.ch(c)))
}

/// Emphasis (`double == false`) or strong emphasis delimited by `c`.
pub fn emph_or_strong(p: &mut Parser<'_>, c: char, double: bool) -> bool {
    p.rule(RuleKey::EmphOrStrong { marker: c, double }, |p| {
        let start = p.pos();
        let kind = if double {
            NodeKind::Strong
        } else {
            NodeKind::Emph
        };
        closer_ahead(p, c, double)
            && open(p, c, double)
            && p.push(Node::new(kind))
            && p.one_or_more(|p| {
                p.test_not(|p| close(p, c, double))
                    && p.test_not(newline)
                    && inline(p)
                    && p.add_as_child()
            })
            && close(p, c, double)
            && {
                let end = p.pos();
                p.mark_span(start, end)
            }
    })
}

/// Whether the rest of the paragraph has a marker run that [`close`] could
/// accept. Openers without one fail before parsing any content, so a line
/// of unclosed openers never nests.
fn closer_ahead(p: &Parser<'_>, c: char, double: bool) -> bool {
    let input = p.input();
    let width = if double { 2 } else { 1 };
    let mut i = p.pos() + width;
    let mut line_is_blank = false;
    while let Some(ch) = input.get(i) {
        match ch {
            '\n' if line_is_blank => return false,
            '\n' => line_is_blank = true,
            ' ' | '\t' | '\r' => {}
            _ => line_is_blank = false,
        }
        if ch == c
            && (!double || input.get(i + 1) == Some(c))
            && !matches!(input.get(i - 1), Some(' ' | '\t'))
            && !input
                .get(i + width)
                .is_some_and(|next| next.is_ascii_alphanumeric())
        {
            return true;
        }
        i += 1;
    }
    false
}

/// The marker, not part of a guarded run and not followed by whitespace.
fn open(p: &mut Parser<'_>, c: char, double: bool) -> bool {
    p.seq(|p| {
        p.test_not(|p| char_line(p, c))
            && marker(p, c, double)
            && p.test_not(spacechar)
            && p.test_not(newline)
    })
}

/// The marker, not preceded by whitespace and not followed by a letter or
/// digit. A single marker does not close when it starts a double one.
fn close(p: &mut Parser<'_>, c: char, double: bool) -> bool {
    p.rule(RuleKey::EmphOrStrongClose { marker: c, double }, |p| {
        !matches!(p.prev_char(), Some(' ' | '\t' | '\n' | '\r'))
            && p.test_not(spacechar)
            && p.test_not(newline)
            && (double || p.test_not(|p| emph_or_strong(p, c, true)))
            && marker(p, c, double)
            && p.test_not(alphanumeric)
    })
}

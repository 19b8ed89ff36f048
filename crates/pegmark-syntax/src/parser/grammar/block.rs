//! Block-level grammar rules.
//!
//! Paragraphs, headings, block quotes, code blocks, horizontal rules and
//! the two kinds of definitions. Lists live in `list`, HTML blocks in
//! `html` and tables in `table`.

use crate::ast::{LinkTarget, Mark, Node, NodeKind};
use crate::input::InnerSource;

use super::super::Parser;
use super::super::memo::RuleKey;
use super::super::subparse::parse_inner;
use super::inline::{endline, inlines};
use super::link::label;
use super::{
    blank_line, blank_line_range, inline, line_range, line_text, newline, nonblank_indented_line,
    nonindent_space, nonspacechar, sp, spn1,
};

// === Paragraphs ===

pub fn para(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::Para, |p| {
        nonindent_space(p)
            && inlines(p)
            && p.retag(NodeKind::Para)
            && p.one_or_more(blank_line)
    })
}

// === Headings ===

pub fn heading(p: &mut Parser<'_>) -> bool {
    atx_heading(p) || setext_heading(p)
}

/// One to six `#`, returning the heading level.
pub fn atx_start(p: &mut Parser<'_>) -> Option<u8> {
    ["######", "#####", "####", "###", "##", "#"]
        .into_iter()
        .find(|hashes| p.literal(hashes))
        .map(|hashes| hashes.len() as u8)
}

fn atx_heading(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::AtxHeading, |p| {
        let start = p.pos();
        let Some(level) = atx_start(p) else {
            return false;
        };
        sp(p)
            && p.push(Node::new(NodeKind::Header { level }))
            && p.one_or_more(|p| atx_inline(p) && p.add_as_child())
            && p.optional(|p| sp(p) && p.skip_while(|c| c == '#') && sp(p))
            && {
                let end = p.pos();
                p.mark_span(start, end)
            }
            && newline(p)
    })
}

fn atx_inline(p: &mut Parser<'_>) -> bool {
    p.test_not(newline)
        && p.test_not(|p| sp(p) && p.skip_while(|c| c == '#') && sp(p) && newline(p))
        && inline(p)
}

/// A line of text underlined with `===` (level 1) or `---` (level 2).
fn setext_heading(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::SetextHeading, |p| {
        // check the underline first so nothing is built for ordinary lines
        p.test(|p| {
            p.one_or_more(|p| p.test_not(newline) && p.any())
                && newline(p)
                && (p.n_or_more('=', 3) || p.n_or_more('-', 3))
                && newline(p)
        }) && (setext_with(p, '=', 1) || setext_with(p, '-', 2))
    })
}

fn setext_with(p: &mut Parser<'_>, underline: char, level: u8) -> bool {
    p.seq(|p| {
        let start = p.pos();
        p.push(Node::new(NodeKind::Header { level }))
            && p.one_or_more(|p| p.test_not(endline) && inline(p) && p.add_as_child())
            && {
                let end = p.pos();
                p.mark_span(start, end)
            }
            && sp(p)
            && newline(p)
            && p.n_or_more(underline, 3)
            && newline(p)
    })
}

// === Block quotes ===

/// `>`-prefixed lines, their lazy continuations and trailing blank lines,
/// parsed again as a document of their own.
pub fn block_quote(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::BlockQuote, |p| {
        let start = p.pos();
        let input = p.input();
        let mut inner = InnerSource::new();
        let matched = p.one_or_more(|p| {
            let first = p.seq_value(|p| {
                if !p.ch('>') {
                    return None;
                }
                p.optional(|p| p.ch(' '));
                line_range(p)
            });
            let Some((line_start, line_end)) = first else {
                return false;
            };
            inner.push_line(input, line_start, line_end);
            p.zero_or_more(|p| {
                let lazy = p.seq_value(|p| {
                    if p.test_not(|p| p.ch('>')) && p.test_not(blank_line) {
                        line_range(p)
                    } else {
                        None
                    }
                });
                match lazy {
                    Some((s, e)) => {
                        inner.push_line(input, s, e);
                        true
                    }
                    None => false,
                }
            }) && p.zero_or_more(|p| match blank_line_range(p) {
                Some((at, _)) => {
                    inner.push_line(input, at, at);
                    true
                }
                None => false,
            })
        });
        if !matched {
            return false;
        }
        match parse_inner(p, inner, "block quote") {
            Some(children) => {
                p.push_spanned(Node::with_children(NodeKind::BlockQuote, children), start)
            }
            None => false,
        }
    })
}

// === Code blocks ===

/// Lines indented by a tab or four spaces. Blank lines between them are
/// kept; the indentation is not.
pub fn verbatim(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::Verbatim, |p| {
        let start = p.pos();
        let mut text = String::new();
        let matched = p.one_or_more(|p| {
            let chunk = p.seq_value(|p| {
                let mut blanks = 0;
                p.zero_or_more(|p| {
                    blank_line(p) && {
                        blanks += 1;
                        true
                    }
                });
                nonblank_indented_line(p).map(|line| (blanks, line))
            });
            match chunk {
                Some((blanks, line)) => {
                    text.extend(std::iter::repeat_n('\n', blanks));
                    text.push_str(&line_text(p, line));
                    true
                }
                None => false,
            }
        });
        matched
            && p.push_spanned(
                Node::new(NodeKind::Verbatim { text, info: None }),
                start,
            )
    })
}

/// A block between two fences of three or more backticks or tildes. The
/// closing fence must repeat the opening one exactly.
pub fn fenced_code_block(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::FencedCodeBlock, |p| {
        let start = p.pos();
        let Some((marker, len, info)) = p.seq_value(fence_open) else {
            return false;
        };
        let mut text = String::new();
        let matched = p.one_or_more(|p| {
            let line = p.seq_value(|p| {
                if p.test_not(|p| code_fence(p, marker, len)) {
                    line_range(p)
                } else {
                    None
                }
            });
            match line {
                Some(range) => {
                    text.push_str(&line_text(p, range));
                    true
                }
                None => false,
            }
        });
        matched
            && code_fence(p, marker, len)
            && p.push_spanned(Node::new(NodeKind::Verbatim { text, info }), start)
            && p.zero_or_more(blank_line)
    })
}

fn fence_open(p: &mut Parser<'_>) -> Option<(char, usize, Option<String>)> {
    nonindent_space(p);
    let marker = p.peek().filter(|&c| matches!(c, '`' | '~'))?;
    let run_start = p.pos();
    if !p.n_or_more(marker, 3) {
        return None;
    }
    let len = p.pos() - run_start;
    let info = line_range(p).map(|(s, e)| p.slice(s, e))?;
    let info = info.trim();
    Some((marker, len, (!info.is_empty()).then(|| info.to_string())))
}

/// Exactly `len` fence characters on a line of their own.
fn code_fence(p: &mut Parser<'_>, marker: char, len: usize) -> bool {
    p.rule(RuleKey::CodeFence { marker, len }, |p| {
        nonindent_space(p)
            && (0..len).all(|_| p.ch(marker))
            && p.test_not(|p| p.ch(marker))
            && sp(p)
            && newline(p)
    })
}

// === Horizontal rules ===

pub fn horizontal_rule(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::HorizontalRule, |p| {
        let start = p.pos();
        if !(nonindent_space(p) && (hr_chars(p, '*') || hr_chars(p, '-') || hr_chars(p, '_'))) {
            return false;
        }
        let span = p.span(start, p.pos());
        sp(p)
            && newline(p)
            && p.one_or_more(blank_line)
            && p.push(Node::mark(Mark::HRule).with_span(span))
    })
}

/// Three or more `c`, optionally separated by spaces.
fn hr_chars(p: &mut Parser<'_>, c: char) -> bool {
    p.seq(|p| {
        p.ch(c)
            && sp(p)
            && p.ch(c)
            && sp(p)
            && p.ch(c)
            && p.zero_or_more(|p| sp(p) && p.ch(c))
    })
}

// === Definitions ===

/// `[label]: url "title"`. Registered in the reference table; nothing is
/// left in the tree.
pub fn reference(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::Reference, |p| {
        let start = p.pos();
        nonindent_space(p);
        let Some(label_text) = label(p) else {
            return false;
        };
        if !(p.ch(':') && spn1(p)) {
            return false;
        }
        let Some(url) = ref_src(p) else {
            return false;
        };
        sp(p);
        let title = ref_title(p);
        if !(sp(p) && newline(p)) {
            return false;
        }
        let span = p.span(start, p.pos());
        p.zero_or_more(blank_line);
        let Some(label_node) = p.pop() else {
            return false;
        };
        let node = Node::with_children(
            NodeKind::Reference(LinkTarget { url, title }),
            label_node.children,
        )
        .with_span(span);
        p.tables().references.insert(&label_text, node);
        true
    })
}

fn ref_src(p: &mut Parser<'_>) -> Option<String> {
    p.seq_value(|p| {
        if !p.ch('<') {
            return None;
        }
        let url = ref_src_content(p)?;
        p.ch('>').then_some(url)
    })
    .or_else(|| ref_src_content(p))
}

fn ref_src_content(p: &mut Parser<'_>) -> Option<String> {
    p.seq_value(|p| {
        let start = p.pos();
        p.one_or_more(|p| p.test_not(|p| p.ch('>')) && nonspacechar(p))
            .then(|| p.slice(start, p.pos()))
    })
}

/// A title in `'...'`, `"..."` or `(...)`, closed by the delimiter that ends
/// the line.
fn ref_title(p: &mut Parser<'_>) -> Option<String> {
    [('\'', '\''), ('"', '"'), ('(', ')')]
        .into_iter()
        .find_map(|(open, close)| {
            p.seq_value(|p| {
                if !p.ch(open) {
                    return None;
                }
                let start = p.pos();
                p.zero_or_more(|p| {
                    p.test_not(|p| p.ch(close) && sp(p) && newline(p))
                        && p.test_not(newline)
                        && p.any()
                });
                let title = p.slice(start, p.pos());
                p.ch(close).then_some(title)
            })
        })
}

/// `*[label]: expansion`. Registered in the abbreviation list; nothing is
/// left in the tree.
pub fn abbreviation(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::Abbreviation, |p| {
        let start = p.pos();
        nonindent_space(p);
        if !p.ch('*') {
            return false;
        }
        let Some(label_text) = label(p) else {
            return false;
        };
        p.drop_top()
            && sp(p)
            && p.ch(':')
            && sp(p)
            && p.push(Node::new(NodeKind::Abbreviation { label: label_text }))
            && p.zero_or_more(|p| p.test_not(newline) && inline(p) && p.add_as_child())
            && {
                let end = p.pos();
                p.mark_span(start, end)
            }
            && p.zero_or_more(blank_line)
            && match p.pop() {
                Some(node) => {
                    p.tables().abbreviations.push(node);
                    true
                }
                None => false,
            }
    })
}

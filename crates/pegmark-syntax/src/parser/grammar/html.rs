//! Raw HTML: block-level elements and inline tags.
//!
//! Only the block-level tag names in [`HTML_TAGS`] start an HTML block.
//! Anything else in angle brackets is inline HTML inside a paragraph.

use crate::ast::{Node, NodeKind};
use crate::extensions::Extensions;

use super::super::Parser;
use super::super::memo::RuleKey;
use super::{alphanumeric, blank_line, nonspacechar, spn1};

/// Block-level tag names, sorted for binary search.
const HTML_TAGS: [&str; 36] = [
    "address",
    "blockquote",
    "center",
    "dd",
    "dir",
    "div",
    "dl",
    "dt",
    "fieldset",
    "form",
    "frameset",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "hr",
    "isindex",
    "li",
    "menu",
    "noframes",
    "noscript",
    "ol",
    "p",
    "pre",
    "script",
    "style",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "tr",
    "ul",
];

// === Blocks ===

pub fn html_block(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::HtmlBlock, |p| {
        let start = p.pos();
        if !(html_block_in_tags(p) || html_comment(p) || html_block_self_closing(p)) {
            return false;
        }
        let end = p.pos();
        let text = if p.ext(Extensions::SUPPRESS_HTML_BLOCKS) {
            String::new()
        } else {
            p.slice(start, end)
        };
        let span = p.span(start, end);
        p.push(Node::new(NodeKind::HtmlBlock(text)).with_span(span)) && p.one_or_more(blank_line)
    })
}

/// An open tag, everything up to its matching close tag, and the close tag.
/// Elements of the same name nested inside are skipped as a whole.
fn html_block_in_tags(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::HtmlBlockInTags, |p| {
        let Some(tag) = html_block_open(p) else {
            return false;
        };
        p.zero_or_more(|p| {
            html_block_in_tags(p) || p.seq(|p| p.test_not(|p| html_block_close(p, &tag)) && p.any())
        }) && html_block_close(p, &tag)
    })
}

fn html_block_open(p: &mut Parser<'_>) -> Option<String> {
    p.seq_value(|p| {
        if !(p.ch('<') && spn1(p)) {
            return None;
        }
        let tag = defined_tag_name(p)?;
        (spn1(p) && p.zero_or_more(html_attribute) && p.ch('>')).then_some(tag)
    })
}

fn html_block_close(p: &mut Parser<'_>, tag: &str) -> bool {
    p.seq(|p| {
        p.ch('<')
            && spn1(p)
            && p.ch('/')
            && {
                let start = p.pos();
                p.one_or_more(alphanumeric) && p.slice(start, p.pos()).eq_ignore_ascii_case(tag)
            }
            && spn1(p)
            && p.ch('>')
    })
}

fn html_block_self_closing(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        p.ch('<')
            && spn1(p)
            && defined_tag_name(p).is_some()
            && spn1(p)
            && p.zero_or_more(html_attribute)
            && p.optional(|p| p.ch('/'))
            && spn1(p)
            && p.ch('>')
    })
}

/// A tag name from [`HTML_TAGS`], in any case. Returns it lowercased.
fn defined_tag_name(p: &mut Parser<'_>) -> Option<String> {
    p.seq_value(|p| {
        let start = p.pos();
        if !p.one_or_more(alphanumeric) {
            return None;
        }
        let name = p.slice(start, p.pos()).to_ascii_lowercase();
        HTML_TAGS
            .binary_search(&name.as_str())
            .is_ok()
            .then_some(name)
    })
}

// === Inline ===

pub fn inline_html(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::InlineHtml, |p| {
        let start = p.pos();
        if !(html_comment(p) || html_tag(p)) {
            return false;
        }
        let text = if p.ext(Extensions::SUPPRESS_INLINE_HTML) {
            String::new()
        } else {
            p.slice(start, p.pos())
        };
        p.push_spanned(Node::new(NodeKind::InlineHtml(text)), start)
    })
}

fn html_comment(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        p.literal("<!--")
            && p.zero_or_more(|p| p.test_not(|p| p.literal("-->")) && p.any())
            && p.literal("-->")
    })
}

/// Any open, close or self-closing tag.
fn html_tag(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        p.ch('<')
            && spn1(p)
            && p.optional(|p| p.ch('/'))
            && p.one_or_more(alphanumeric)
            && spn1(p)
            && p.zero_or_more(html_attribute)
            && p.optional(|p| p.ch('/'))
            && spn1(p)
            && p.ch('>')
    })
}

fn html_attribute(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        p.one_or_more(|p| alphanumeric(p) || p.ch('-'))
            && spn1(p)
            && p.optional(|p| {
                p.ch('=')
                    && spn1(p)
                    && (quoted(p)
                        || p.one_or_more(|p| p.test_not(|p| p.ch('>')) && nonspacechar(p)))
            })
            && spn1(p)
    })
}

fn quoted(p: &mut Parser<'_>) -> bool {
    ['"', '\''].into_iter().any(|q| {
        p.seq(|p| p.ch(q) && p.zero_or_more(|p| p.test_not(|p| p.ch(q)) && p.any()) && p.ch(q))
    })
}

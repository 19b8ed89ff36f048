//! Links, images and autolinks.
//!
//! Reference links are not resolved here: the node records the label and
//! key source text and a renderer looks them up in the document's
//! [`ReferenceTable`](crate::ReferenceTable) afterwards, which is what lets a
//! link refer to a definition further down the document.

use crate::ast::{LinkKind, Node, NodeKind};
use crate::extensions::Extensions;

use super::super::Parser;
use super::super::memo::RuleKey;
use super::{alphanumeric, inline, letter, newline, nonspacechar, sp, spacechar, spn1};

pub fn link(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::Link, |p| {
        explicit_link(p) || reference_link(p) || auto_link_url(p) || auto_link_email(p)
    })
}

pub fn image(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::Image, |p| {
        let start = p.pos();
        p.ch('!') && (explicit_link(p) || reference_link(p)) && into_image(p) && {
            let end = p.pos();
            p.mark_span(start, end)
        }
    })
}

fn into_image(p: &mut Parser<'_>) -> bool {
    match p.peek_node_mut(0) {
        Some(node) => {
            node.kind = match std::mem::replace(&mut node.kind, NodeKind::Super) {
                NodeKind::Link(link) => NodeKind::Image(link),
                other => other,
            };
            true
        }
        None => false,
    }
}

/// `[` inlines `]`. Pushes a `Super` with the inlines and returns the
/// source text between the brackets.
pub fn label(p: &mut Parser<'_>) -> Option<String> {
    let mut raw = None;
    let matched = p.rule(RuleKey::Label, |p| {
        let start = p.pos();
        bracket_closes(p)
            && p.ch('[')
            && p.push(Node::new(NodeKind::Super))
            && p.one_or_more(|p| p.test_not(|p| p.ch(']')) && inline(p) && p.add_as_child())
            && p.ch(']')
            && {
                raw = Some(p.slice(start + 1, p.pos() - 1));
                true
            }
    });
    if matched { raw } else { None }
}

/// Whether a `]` follows before the paragraph ends. Without one no label
/// can match, and runs of `[` stay flat text.
fn bracket_closes(p: &Parser<'_>) -> bool {
    let input = p.input();
    let mut i = p.pos() + 1;
    let mut line_is_blank = false;
    while let Some(c) = input.get(i) {
        match c {
            ']' => return true,
            '\n' if line_is_blank => return false,
            '\n' => line_is_blank = true,
            ' ' | '\t' | '\r' => {}
            _ => line_is_blank = false,
        }
        i += 1;
    }
    false
}

/// `[label](url "title")`
fn explicit_link(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        let start = p.pos();
        if label(p).is_none() || !(spn1(p) && p.ch('(') && sp(p)) {
            return false;
        }
        let url = link_source(p);
        spn1(p);
        let title = link_title(p);
        sp(p)
            && p.ch(')')
            && p.retag(NodeKind::Link(LinkKind::Explicit { url, title }))
            && {
                let end = p.pos();
                p.mark_span(start, end)
            }
    })
}

/// `[label][key]`, `[label][]` or a bare `[label]`.
fn reference_link(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        let start = p.pos();
        let Some(label_text) = label(p) else {
            return false;
        };
        let keyed = p.seq_value(|p| {
            let separator = separator(p);
            let key = label(p)?;
            p.drop_top().then_some((separator, key))
        });
        let (key, separator) = match keyed {
            Some((separator, key)) => (Some(key), Some(separator)),
            None => {
                let empty = p.seq_value(|p| {
                    let separator = separator(p);
                    p.literal("[]").then_some(separator)
                });
                (None, empty)
            }
        };
        p.retag(NodeKind::Link(LinkKind::Reference {
            label: label_text,
            key,
            separator,
        })) && {
            let end = p.pos();
            p.mark_span(start, end)
        }
    })
}

fn separator(p: &mut Parser<'_>) -> String {
    let start = p.pos();
    spn1(p);
    p.slice(start, p.pos())
}

/// The URL of an explicit link: `<...>`, or a run of non-space characters
/// in which parentheses must balance and `\(` / `\)` stand for themselves.
fn link_source(p: &mut Parser<'_>) -> String {
    let bracketed = p.seq_value(|p| {
        if !p.ch('<') {
            return None;
        }
        let start = p.pos();
        p.zero_or_more(|p| p.test_not(|p| p.ch('>')) && nonspacechar(p));
        let url = p.slice(start, p.pos());
        p.ch('>').then_some(url)
    });
    bracketed.unwrap_or_else(|| url_chars(p))
}

fn url_chars(p: &mut Parser<'_>) -> String {
    let mut url = String::new();
    p.zero_or_more(|p| match url_piece(p) {
        Some(piece) => {
            url.push_str(&piece);
            true
        }
        None => false,
    });
    url
}

fn url_piece(p: &mut Parser<'_>) -> Option<String> {
    let start = p.pos();
    if p.seq(|p| p.ch('\\') && p.any_of("()")) {
        return Some(p.slice(start + 1, p.pos()));
    }
    let mut nested = None;
    if p.rule(RuleKey::LinkSource, |p| {
        p.ch('(') && {
            let inner = url_chars(p);
            nested = Some(format!("({inner})"));
            p.ch(')')
        }
    }) {
        return nested;
    }
    if p.seq(|p| p.test_not(|p| p.any_of("()>")) && nonspacechar(p)) {
        return Some(p.slice(start, p.pos()));
    }
    None
}

/// A link title in `'` or `"`. The closing delimiter is the one followed by
/// optional space and the closing `)` or a line end.
fn link_title(p: &mut Parser<'_>) -> Option<String> {
    ['\'', '"'].into_iter().find_map(|delim| {
        p.seq_value(|p| {
            if !p.ch(delim) {
                return None;
            }
            let start = p.pos();
            p.zero_or_more(|p| {
                p.test_not(|p| p.ch(delim) && sp(p) && (p.ch(')') || newline(p)))
                    && p.test_not(newline)
                    && p.any()
            });
            let title = p.slice(start, p.pos());
            p.ch(delim).then_some(title)
        })
    })
}

// === Autolinks ===

/// `<scheme://...>`; with AUTOLINKS the brackets are optional.
fn auto_link_url(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        let start = p.pos();
        if !open_bracket(p) {
            return false;
        }
        let url_start = p.pos();
        p.one_or_more(letter)
            && p.literal("://")
            && auto_link_end(p)
            && {
                let url = p.slice(url_start, p.pos());
                p.push(Node::new(NodeKind::Link(LinkKind::AutoUrl { url })))
            }
            && close_bracket(p)
            && {
                let end = p.pos();
                p.mark_span(start, end)
            }
    })
}

/// `<user@host>`; with AUTOLINKS the brackets are optional.
fn auto_link_email(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        let start = p.pos();
        if !open_bracket(p) {
            return false;
        }
        let address_start = p.pos();
        p.one_or_more(|p| alphanumeric(p) || p.any_of("-+_."))
            && p.ch('@')
            && auto_link_end(p)
            && {
                let address = p.slice(address_start, p.pos());
                p.push(Node::new(NodeKind::Link(LinkKind::AutoEmail { address })))
            }
            && close_bracket(p)
            && {
                let end = p.pos();
                p.mark_span(start, end)
            }
    })
}

fn open_bracket(p: &mut Parser<'_>) -> bool {
    if p.ext(Extensions::AUTOLINKS) {
        p.optional(|p| p.ch('<'))
    } else {
        p.ch('<')
    }
}

fn close_bracket(p: &mut Parser<'_>) -> bool {
    if p.ext(Extensions::AUTOLINKS) {
        p.optional(|p| p.ch('>'))
    } else {
        p.ch('>')
    }
}

/// The rest of an autolink. Unbracketed links stop before trailing
/// punctuation that is followed by whitespace.
fn auto_link_end(p: &mut Parser<'_>) -> bool {
    let bare = p.ext(Extensions::AUTOLINKS);
    p.one_or_more(|p| {
        p.test_not(newline)
            && if bare {
                p.test_not(|p| {
                    p.ch('>')
                        || p.seq(|p| {
                            p.optional(|p| p.any_of(".,;:)}]")) && (spacechar(p) || newline(p))
                        })
                })
            } else {
                p.test_not(|p| p.ch('>'))
            }
            && p.any()
    })
}

#[cfg(test)]
mod tests {
    use crate::{Extensions, MarkdownParser, ParserOptions};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn para(source: &str, ext: Extensions) -> String {
        let root = MarkdownParser::new(ParserOptions::from(ext))
            .parse(source)
            .unwrap();
        assert_eq!(root.children.len(), 1, "expected a single block in {root}");
        root.children[0].to_string()
    }

    #[rstest]
    #[case(
        "[a](http://x.com \"T\")\n",
        "Para\n  Link \"http://x.com\" title=\"T\"\n    Text \"a\"\n"
    )]
    #[case("[a](foo(bar))\n", "Para\n  Link \"foo(bar)\"\n    Text \"a\"\n")]
    #[case("[a](foo\\)bar)\n", "Para\n  Link \"foo)bar\"\n    Text \"a\"\n")]
    #[case("[a](<x>)\n", "Para\n  Link \"x\"\n    Text \"a\"\n")]
    #[case(
        "[a](<x y>)\n",
        "Para\n  Link ref=\"a\"\n    Text \"a\"\n  Text \"(\"\n  InlineHtml \"<x y>\"\n  Text \")\"\n"
    )]
    #[case("[a]()\n", "Para\n  Link \"\"\n    Text \"a\"\n")]
    #[case("[a][b]\n", "Para\n  Link ref=\"b\"\n    Text \"a\"\n")]
    #[case("[a] [b]\n", "Para\n  Link ref=\"b\"\n    Text \"a\"\n")]
    #[case("[a][]\n", "Para\n  Link ref=\"a\"\n    Text \"a\"\n")]
    #[case("[a]\n", "Para\n  Link ref=\"a\"\n    Text \"a\"\n")]
    #[case("<http://x.com>\n", "Para\n  Link auto \"http://x.com\"\n")]
    #[case("<me@x.com>\n", "Para\n  Link mailto \"me@x.com\"\n")]
    #[case("![alt](/i.png)\n", "Para\n  Image \"/i.png\"\n    Text \"alt\"\n")]
    #[case("![alt][logo]\n", "Para\n  Image ref=\"logo\"\n    Text \"alt\"\n")]
    fn link_forms(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(para(source, Extensions::NONE), expected);
    }

    #[test]
    fn unbalanced_parens_are_not_a_link() {
        let outline = para("[a](foo(bar)\n", Extensions::NONE);
        assert!(!outline.contains("Link \"foo"), "{outline}");
    }

    #[test]
    fn unclosed_brackets_stay_text() {
        let source = format!("{}\n", "[".repeat(500));
        let root = crate::parse(&source).unwrap();
        assert_eq!(root.children[0].text_content(), source.trim_end());
    }

    #[test]
    fn nesting_past_the_ceiling_is_reported() {
        let source = format!("{}x{}\n", "[".repeat(200), "]".repeat(200));
        let err = crate::parse(&source).unwrap_err();
        assert!(
            matches!(err, crate::ParseError::RecursionBudget { limit: 96, .. }),
            "{err}"
        );
    }

    #[test]
    fn reference_link_keeps_separator() {
        let root = crate::parse("[a]\n[b]\n").unwrap();
        let link = root.children[0].children[0].clone();
        assert_eq!(
            link.kind,
            crate::NodeKind::Link(crate::LinkKind::Reference {
                label: "a".into(),
                key: Some("b".into()),
                separator: Some("\n".into()),
            })
        );
    }

    #[test]
    fn bare_autolinks_need_the_extension() {
        assert_eq!(
            para("see http://x.com.\n", Extensions::NONE),
            "Para\n  Text \"see http://x.com.\"\n"
        );
        assert_eq!(
            para("see http://x.com.\n", Extensions::AUTOLINKS),
            "Para\n  Text \"see \"\n  Link auto \"http://x.com\"\n  Text \".\"\n"
        );
    }
}

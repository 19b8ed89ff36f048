//! Bullet, ordered and definition lists.
//!
//! A list item collects its source lines (marker and one level of
//! indentation stripped) and parses them as a document of its own. Every
//! list is first tried as tight; any blank line between two items, or
//! between an item's first line and an indented continuation, makes the
//! tight attempt fail and the list is parsed again as loose.
//!
//! Loose items get two newlines appended to their source, so their first
//! line parses as a paragraph. Tight items do not, so their text stays an
//! unwrapped `Super`.
//!
//! Continuation blocks that follow an item's first line without a blank
//! line in between are parsed separately (one segment each) and their
//! results concatenated. Otherwise an indented sub-list would be glued onto
//! the text before it as a lazy paragraph line.

use crate::ast::{Node, NodeKind};
use crate::extensions::Extensions;
use crate::input::{InnerSource, InputBuffer};

use super::super::Parser;
use super::super::memo::RuleKey;
use super::super::subparse::parse_segments;
use super::block::horizontal_rule;
use super::{
    blank_line, digit, indent, inline, line_range, newline, nonindent_space,
    optionally_indented_line, sp, spacechar,
};

/// Which marker starts the items of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    /// `*`, `+` or `-`
    Bullet,
    /// digits followed by `.`
    Ordered,
    /// `:` or `~`, introducing a definition
    Definition,
}

impl ListKind {
    fn marker(self, p: &mut Parser<'_>) -> bool {
        match self {
            ListKind::Bullet => bullet(p),
            ListKind::Ordered => enumerator(p),
            ListKind::Definition => definition_marker(p),
        }
    }

    fn list_node(self, tight: bool) -> NodeKind {
        match self {
            ListKind::Bullet => NodeKind::BulletList { tight },
            ListKind::Ordered => NodeKind::OrderedList { tight },
            ListKind::Definition => NodeKind::DefinitionList,
        }
    }

    fn item_node(self, tight: bool) -> NodeKind {
        match self {
            ListKind::Definition => NodeKind::Definition,
            _ => NodeKind::ListItem { tight },
        }
    }
}

// === Markers ===

pub fn bullet(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        p.test_not(horizontal_rule)
            && nonindent_space(p)
            && p.any_of("+*-")
            && p.one_or_more(spacechar)
    })
}

pub fn enumerator(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        nonindent_space(p) && p.one_or_more(digit) && p.ch('.') && p.one_or_more(spacechar)
    })
}

fn definition_marker(p: &mut Parser<'_>) -> bool {
    p.seq(|p| nonindent_space(p) && p.any_of(":~") && p.one_or_more(spacechar))
}

/// Any marker that starts a new item, whatever list it belongs to.
fn any_marker(p: &mut Parser<'_>) -> bool {
    bullet(p)
        || enumerator(p)
        || (p.ext(Extensions::DEFINITIONS) && definition_marker(p))
}

// === Lists ===

pub fn bullet_list(p: &mut Parser<'_>) -> bool {
    list(p, ListKind::Bullet)
}

pub fn ordered_list(p: &mut Parser<'_>) -> bool {
    list(p, ListKind::Ordered)
}

fn list(p: &mut Parser<'_>, kind: ListKind) -> bool {
    p.rule(RuleKey::List(kind), |p| {
        let start = p.pos();
        p.test(|p| kind.marker(p))
            && (list_tight(p, kind) || list_loose(p, kind))
            && {
                let end = p.pos();
                p.mark_span(start, end)
            }
    })
}

fn list_tight(p: &mut Parser<'_>, kind: ListKind) -> bool {
    p.seq(|p| {
        p.push(Node::new(kind.list_node(true)))
            && p.one_or_more(|p| list_item(p, kind, true) && p.add_as_child())
            && p.zero_or_more(blank_line)
            && p.test_not(|p| kind.marker(p))
    })
}

fn list_loose(p: &mut Parser<'_>, kind: ListKind) -> bool {
    p.seq(|p| {
        p.push(Node::new(kind.list_node(false)))
            && p.one_or_more(|p| {
                list_item(p, kind, false) && p.add_as_child() && p.zero_or_more(blank_line)
            })
    })
}

// === Items ===

/// One item: the marker line with its lazy continuation lines, then any
/// indented continuation blocks.
fn list_item(p: &mut Parser<'_>, kind: ListKind, tight: bool) -> bool {
    p.rule(RuleKey::ListItem { kind, tight }, |p| {
        let start = p.pos();
        let input = p.input();
        if !kind.marker(p) {
            return false;
        }
        let Some(first) = list_block(p) else {
            return false;
        };
        let mut segments = vec![InnerSource::new()];
        push_block(&mut segments, input, &first);

        let mut extra_newlines = !tight;
        let mut needs_loose = false;
        p.zero_or_more(|p| {
            let Some((blanks, blocks)) = continuation(p) else {
                return false;
            };
            if blanks > 0 && tight {
                needs_loose = true;
                return false;
            }
            if blanks > 0 {
                if let Some(segment) = segments.last_mut() {
                    segment.push_synthetic_str(&"\n".repeat(blanks));
                }
            } else {
                if !tight && let Some(segment) = segments.last_mut() {
                    segment.push_synthetic_str("\n\n");
                }
                segments.push(InnerSource::new());
            }
            for block in &blocks {
                push_block(&mut segments, input, block);
            }
            extra_newlines = true;
            true
        });
        if needs_loose {
            return false;
        }
        if extra_newlines && let Some(segment) = segments.last_mut() {
            segment.push_synthetic_str("\n\n");
        }

        match parse_segments(p, segments, "list item") {
            Some(children) => {
                p.push_spanned(Node::with_children(kind.item_node(tight), children), start)
            }
            None => false,
        }
    })
}

fn push_block(segments: &mut [InnerSource], input: &InputBuffer, lines: &[(usize, usize)]) {
    if let Some(segment) = segments.last_mut() {
        for &(start, end) in lines {
            segment.push_line(input, start, end);
        }
    }
}

/// Blank lines followed by one or more indented blocks. Returns the number
/// of blank lines and the line ranges of each block.
fn continuation(p: &mut Parser<'_>) -> Option<(usize, Vec<Vec<(usize, usize)>>)> {
    p.seq_value(|p| {
        let mut blanks = 0;
        p.zero_or_more(|p| {
            blank_line(p) && {
                blanks += 1;
                true
            }
        });
        let mut blocks = Vec::new();
        p.zero_or_more(|p| {
            indent(p)
                && match list_block(p) {
                    Some(block) => {
                        blocks.push(block);
                        true
                    }
                    None => false,
                }
        });
        (!blocks.is_empty()).then_some((blanks, blocks))
    })
}

/// A line followed by its lazy continuation lines.
fn list_block(p: &mut Parser<'_>) -> Option<Vec<(usize, usize)>> {
    p.seq_value(|p| {
        let mut lines = vec![line_range(p)?];
        p.zero_or_more(|p| match list_block_line(p) {
            Some(line) => {
                lines.push(line);
                true
            }
            None => false,
        });
        Some(lines)
    })
}

fn list_block_line(p: &mut Parser<'_>) -> Option<(usize, usize)> {
    p.seq_value(|p| {
        let continues = p.test_not(|p| p.optional(indent) && any_marker(p))
            && p.test_not(blank_line)
            && p.test_not(horizontal_rule);
        if continues {
            optionally_indented_line(p)
        } else {
            None
        }
    })
}

// === Definition lists ===

/// Groups of term lines, each followed by one or more definitions.
pub fn definition_list(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::DefinitionList, |p| {
        let start = p.pos();
        p.push(Node::new(NodeKind::DefinitionList))
            && p.one_or_more(definition_group)
            && {
                let end = p.pos();
                p.mark_span(start, end)
            }
    })
}

/// Terms and their definitions, collected on a scratch node so that a
/// group without definitions leaves the list untouched. Moving them into
/// the list is the last step.
fn definition_group(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        p.push(Node::new(NodeKind::Super))
            && p.one_or_more(|p| def_term(p) && p.add_as_child())
            && p.one_or_more(|p| definition(p) && p.add_as_child())
            && p.zero_or_more(blank_line)
            && append_group(p)
    })
}

fn append_group(p: &mut Parser<'_>) -> bool {
    let Some(group) = p.pop() else {
        return false;
    };
    match p.peek_node_mut(0) {
        Some(list) => {
            for child in group.children {
                list.add_child(child);
            }
            true
        }
        None => false,
    }
}

fn def_term(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        let start = p.pos();
        p.test_not(spacechar)
            && p.test_not(blank_line)
            && p.test_not(definition_marker)
            && p.push(Node::new(NodeKind::DefinitionTerm))
            && p.one_or_more(|p| {
                p.test_not(|p| sp(p) && newline(p)) && inline(p) && p.add_as_child()
            })
            && {
                let end = p.pos();
                p.mark_span(start, end)
            }
            && sp(p)
            && newline(p)
    })
}

fn definition(p: &mut Parser<'_>) -> bool {
    list_item(p, ListKind::Definition, true) || list_item(p, ListKind::Definition, false)
}

#[cfg(test)]
mod tests {
    use crate::{Extensions, MarkdownParser, NodeKind, ParserOptions, parse};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn tight_list_items_are_unwrapped() {
        assert_eq!(
            parse("- a\n- b\n").unwrap().to_string(),
            "Root\n  BulletList tight\n    ListItem tight\n      Super\n        Text \"a\"\n    ListItem tight\n      Super\n        Text \"b\"\n"
        );
    }

    #[test]
    fn a_blank_line_between_items_makes_the_list_loose() {
        assert_eq!(
            parse("- a\n\n- b\n").unwrap().to_string(),
            "Root\n  BulletList loose\n    ListItem loose\n      Para\n        Text \"a\"\n    ListItem loose\n      Para\n        Text \"b\"\n"
        );
    }

    #[rstest]
    #[case("1. one\n2. two\n", 2)]
    #[case("7. seven\n1. one\n3. three\n", 3)]
    fn ordered_lists(#[case] source: &str, #[case] items: usize) {
        let root = parse(source).unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].kind, NodeKind::OrderedList { tight: true });
        assert_eq!(root.children[0].children.len(), items);
    }

    #[test]
    fn lazy_lines_belong_to_the_item() {
        let root = parse("* one\ncontinued\n* two\n").unwrap();
        let list = &root.children[0];
        assert_eq!(list.children.len(), 2);
        assert_eq!(list.children[0].text_content(), "one\ncontinued");
    }

    #[test]
    fn nested_list_is_a_separate_block() {
        assert_eq!(
            parse("- a\n    - b\n- c\n").unwrap().to_string(),
            "Root\n  BulletList tight\n    ListItem tight\n      Super\n        Text \"a\"\n      BulletList tight\n        ListItem tight\n          Super\n            Text \"b\"\n    ListItem tight\n      Super\n        Text \"c\"\n"
        );
    }

    #[test]
    fn indented_paragraph_after_blank_makes_item_loose() {
        let root = parse("- a\n\n    b\n").unwrap();
        let list = &root.children[0];
        assert_eq!(list.kind, NodeKind::BulletList { tight: false });
        let item = &list.children[0];
        assert_eq!(item.children.len(), 2);
        assert!(item.children.iter().all(|n| n.kind == NodeKind::Para));
    }

    #[test]
    fn marker_style_change_starts_a_new_list() {
        let root = parse("- a\n1. b\n").unwrap();
        let kinds: Vec<_> = root.children.iter().map(|n| n.kind.name()).collect();
        assert_eq!(kinds, ["BulletList", "OrderedList"]);
    }

    #[test]
    fn horizontal_rule_is_not_a_bullet() {
        let root = parse("- - -\n").unwrap();
        assert_eq!(root.to_string(), "Root\n  SimpleMark HRule\n");
    }

    #[test]
    fn definition_lists() {
        let root = MarkdownParser::new(ParserOptions::from(Extensions::DEFINITIONS))
            .parse("Apple\n: A fruit\n: A company\n\nPear\n~ Another fruit\n")
            .unwrap();
        assert_eq!(
            root.to_string(),
            "Root\n  DefinitionList\n    DefinitionTerm\n      Text \"Apple\"\n    Definition\n      Super\n        Text \"A fruit\"\n    Definition\n      Super\n        Text \"A company\"\n    DefinitionTerm\n      Text \"Pear\"\n    Definition\n      Super\n        Text \"Another fruit\"\n"
        );
    }

    #[rstest]
    #[case("Some text\n", "Root\n  Para\n    Text \"Some text\"\n")]
    #[case(
        "Term\n\n: def\n",
        "Root\n  Para\n    Text \"Term\"\n  Para\n    Text \": def\"\n"
    )]
    #[case(
        "Apple\nPear\n: A fruit\n",
        "Root\n  DefinitionList\n    DefinitionTerm\n      Text \"Apple\"\n    DefinitionTerm\n      Text \"Pear\"\n    Definition\n      Super\n        Text \"A fruit\"\n"
    )]
    fn terms_without_definitions_fall_through(#[case] source: &str, #[case] expected: &str) {
        let root = MarkdownParser::new(ParserOptions::from(Extensions::DEFINITIONS))
            .parse(source)
            .unwrap();
        assert_eq!(root.to_string(), expected);
    }

    #[test]
    fn every_extension_parses_plain_text() {
        let parser = MarkdownParser::new(ParserOptions::from(Extensions::ALL));
        for source in ["Some text\n", "# a\n\n> b *c*\n", "*a *a\n"] {
            let root = parser.parse(source).unwrap();
            assert!(
                root.descendants()
                    .all(|n| !matches!(n.kind, NodeKind::DefinitionList)),
                "{root}"
            );
        }
    }

    #[test]
    fn definition_lists_need_the_extension() {
        let root = parse("Apple\n: A fruit\n").unwrap();
        assert!(
            root.descendants()
                .all(|n| !matches!(n.kind, NodeKind::DefinitionList))
        );
    }
}

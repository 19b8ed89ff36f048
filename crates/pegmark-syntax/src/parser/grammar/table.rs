//! Pipe tables.
//!
//! ```text
//! | a   | b  |     <- header rows (optional)
//! |:----|---:|     <- divider: one column per dash group
//! | 1   | 2  |     <- body rows (optional)
//! ```
//!
//! A divider needs a pipe or at least two dash groups, and a table needs
//! at least one header or body row. Anything less is left to the other
//! block rules, which keeps a lone line of dashes a horizontal rule or a
//! Setext underline.

use crate::ast::{Alignment, Node, NodeKind};

use super::super::Parser;
use super::super::memo::RuleKey;
use super::{inline, newline, sp};

pub fn table(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::Table, |p| {
        let start = p.pos();
        let header = table_section(p, NodeKind::TableHeader);
        let Some(columns) = table_divider(p) else {
            return false;
        };
        let body = table_section(p, NodeKind::TableBody);
        if header.is_none() && body.is_none() {
            return false;
        }
        let children = columns
            .into_iter()
            .map(|align| Node::new(NodeKind::TableColumn(align)))
            .chain(header)
            .chain(body);
        let span = p.span(start, p.pos());
        p.push(Node::with_children(NodeKind::Table, children).with_span(span))
    })
}

/// One or more rows wrapped in a node of `kind`.
fn table_section(p: &mut Parser<'_>, kind: NodeKind) -> Option<Node> {
    p.seq_value(|p| {
        if !(p.push(Node::new(kind)) && p.one_or_more(|p| table_row(p) && p.add_as_child())) {
            return None;
        }
        p.pop()
    })
}

/// The divider line, returning the alignment of each column.
fn table_divider(p: &mut Parser<'_>) -> Option<Vec<Alignment>> {
    p.seq_value(|p| {
        let mut pipe_seen = p.ch('|');
        let mut columns = Vec::new();
        p.one_or_more(|p| match table_column(p) {
            Some((align, pipe)) => {
                pipe_seen |= pipe;
                columns.push(align);
                true
            }
            None => false,
        });
        let accepted = !columns.is_empty() && (pipe_seen || columns.len() >= 2);
        (accepted && sp(p) && newline(p)).then_some(columns)
    })
}

/// `:---:` with optional colons and a trailing pipe. Returns the alignment
/// and whether the pipe was there.
fn table_column(p: &mut Parser<'_>) -> Option<(Alignment, bool)> {
    p.seq_value(|p| {
        sp(p);
        let left = p.ch(':');
        sp(p);
        if !p.one_or_more(|p| p.ch('-')) {
            return None;
        }
        sp(p);
        let right = p.ch(':');
        sp(p);
        let pipe = p.ch('|');
        Some((Alignment::from_colons(left, right), pipe))
    })
}

/// Cells separated by pipes. A row needs a leading pipe, a trailing pipe
/// or more than one cell.
fn table_row(p: &mut Parser<'_>) -> bool {
    p.rule(RuleKey::TableRow, |p| {
        let start = p.pos();
        let leading_pipe = p.ch('|');
        p.push(Node::new(NodeKind::TableRow))
            && p.one_or_more(|p| table_cell(p) && p.add_as_child())
            && (leading_pipe
                || p.peek_node(0).is_some_and(|row| row.children.len() > 1)
                || p.prev_char() == Some('|'))
            && {
                let end = p.pos();
                p.mark_span(start, end)
            }
            && sp(p)
            && newline(p)
    })
}

/// Inline content up to the next pipe. A run of closing pipes spans that
/// many columns.
fn table_cell(p: &mut Parser<'_>) -> bool {
    p.seq(|p| {
        let start = p.pos();
        p.test_not(divider_cell)
            && p.push(Node::new(NodeKind::TableCell { colspan: 1 }))
            && p.optional(|p| sp(p) && p.test_not(|p| p.ch('|')) && p.test_not(newline))
            && p.one_or_more(|p| {
                p.test_not(|p| p.ch('|'))
                    && p.test_not(|p| sp(p) && newline(p))
                    && inline(p)
                    && p.add_as_child()
                    && p.optional(|p| sp(p) && p.test(|p| p.ch('|')))
            })
            && {
                let end = p.pos();
                p.mark_span(start, end)
            }
            && {
                let pipes = p.pos();
                p.skip_while(|c| c == '|');
                let colspan = (p.pos() - pipes).max(1);
                p.retag(NodeKind::TableCell { colspan })
            }
    })
}

/// Something that looks like a divider column, which never starts a cell.
fn divider_cell(p: &mut Parser<'_>) -> bool {
    sp(p)
        && p.optional(|p| p.ch(':'))
        && sp(p)
        && p.one_or_more(|p| p.ch('-'))
        && sp(p)
        && p.optional(|p| p.ch(':'))
        && sp(p)
        && (p.ch('|') || newline(p))
}

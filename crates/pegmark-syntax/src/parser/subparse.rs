//! Recursive parses of container contents.
//!
//! Block quotes, list items and definitions collect their content lines
//! (markers and indentation stripped) into an [`InnerSource`] and run the
//! whole grammar over it again, starting from the root rule. The nested run
//! shares the side tables, the tracer and the nesting budget of the run
//! that started it; its root's children become the container's children.

use crate::ast::Node;
use crate::input::InnerSource;

use super::Parser;
use super::grammar;

/// Parse `source` as a document of its own, returning its top-level nodes.
///
/// Returns `None` if the nested run failed; the failure has then been
/// recorded as fatal on `p`.
pub fn parse_inner(p: &mut Parser<'_>, source: InnerSource, container: &str) -> Option<Vec<Node>> {
    if p.has_failed() {
        return None;
    }
    let buffer = source.into_buffer(p.input());
    log::debug!(
        "sub-parse of {container} ({} chars at depth {})",
        buffer.len(),
        p.depth
    );
    let result = {
        let mut inner = Parser::nested(&buffer, p);
        let matched = grammar::root(&mut inner);
        inner.finish(matched)
    };
    match result {
        Ok(root) => Some(root.children),
        Err(err) => {
            p.fail_fatal(err);
            None
        }
    }
}

/// Parse each segment independently and concatenate the results.
///
/// Tight list items whose continuation blocks were not separated by blank
/// lines are split into segments so that the continuation is never glued
/// onto the preceding paragraph.
pub fn parse_segments(
    p: &mut Parser<'_>,
    segments: Vec<InnerSource>,
    container: &str,
) -> Option<Vec<Node>> {
    let mut children = Vec::new();
    for segment in segments {
        if segment.is_empty() {
            continue;
        }
        children.extend(parse_inner(p, segment, container)?);
    }
    Some(children)
}

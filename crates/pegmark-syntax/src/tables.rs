//! Document-wide side tables.
//!
//! Reference and abbreviation definitions may appear anywhere, including
//! inside block quotes and list items that are parsed in their own nested
//! runs, and links may refer to definitions further down the document. All
//! runs of one parse therefore append to a single [`SideTables`] value that
//! is borrowed mutably through every nested parse and moved into the
//! [`Root`](crate::Root) at the end.
//!
//! The accumulator is append-only, which makes rollback cheap: the engine
//! records the lengths at each checkpoint and truncates on backtrack.

use std::collections::HashMap;

use serde::Serialize;

use crate::ast::{LinkTarget, Node, NodeKind};

/// Normalises a reference label into a lookup key: whitespace runs become a
/// single space, the ends are trimmed and ASCII letters are lowercased.
pub fn normalize_reference_key(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

/// One link reference definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceEntry {
    /// Normalised key.
    pub key: String,
    /// The `Reference` node: label inlines as children, target as payload.
    pub node: Node,
}

impl ReferenceEntry {
    pub fn target(&self) -> Option<&LinkTarget> {
        match &self.node.kind {
            NodeKind::Reference(target) => Some(target),
            _ => None,
        }
    }
}

/// Insertion-ordered reference definitions with case-insensitive lookup.
///
/// When a key is defined more than once every definition is kept, but
/// lookups resolve to the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceTable {
    entries: Vec<ReferenceEntry>,
    #[serde(skip)]
    first_by_key: HashMap<String, usize>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition under the normalised form of `label`.
    pub fn insert(&mut self, label: &str, node: Node) {
        let key = normalize_reference_key(label);
        self.first_by_key
            .entry(key.clone())
            .or_insert(self.entries.len());
        self.entries.push(ReferenceEntry { key, node });
    }

    /// The target registered for `label` (normalised before lookup).
    pub fn get(&self, label: &str) -> Option<&LinkTarget> {
        let idx = *self.first_by_key.get(&normalize_reference_key(label))?;
        self.entries[idx].target()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceEntry> {
        self.entries.iter()
    }

    /// Drops every definition registered after the first `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        if len >= self.entries.len() {
            return;
        }
        self.entries.truncate(len);
        self.first_by_key.retain(|_, idx| *idx < len);
    }
}

/// The accumulator threaded through every run of one parse.
#[derive(Debug, Default)]
pub struct SideTables {
    pub references: ReferenceTable,
    pub abbreviations: Vec<Node>,
}

/// Lengths of both tables at a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TableMark {
    references: usize,
    abbreviations: usize,
}

impl SideTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn mark(&self) -> TableMark {
        TableMark {
            references: self.references.len(),
            abbreviations: self.abbreviations.len(),
        }
    }

    pub(crate) fn rollback(&mut self, mark: TableMark) {
        self.references.truncate(mark.references);
        self.abbreviations.truncate(mark.abbreviations);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reference(url: &str) -> Node {
        Node::new(NodeKind::Reference(LinkTarget {
            url: url.into(),
            title: None,
        }))
    }

    #[test]
    fn keys_are_case_and_space_normalised() {
        assert_eq!(normalize_reference_key("  Foo \n  Bar "), "foo bar");
    }

    #[test]
    fn first_definition_wins() {
        let mut table = ReferenceTable::new();
        table.insert("Home", reference("/one"));
        table.insert("home", reference("/two"));
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("HOME").map(|t| t.url.as_str()), Some("/one"));
    }

    #[test]
    fn rollback_forgets_later_definitions() {
        let mut tables = SideTables::new();
        tables.references.insert("a", reference("/a"));
        let mark = tables.mark();
        tables.references.insert("b", reference("/b"));
        tables.abbreviations.push(Node::new(NodeKind::Abbreviation {
            label: "HTML".into(),
        }));

        tables.rollback(mark);

        assert_eq!(tables.references.len(), 1);
        assert!(tables.references.get("b").is_none());
        assert!(tables.references.get("a").is_some());
        assert!(tables.abbreviations.is_empty());
    }
}

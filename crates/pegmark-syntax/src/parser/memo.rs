//! Rule identities and the failure cache.
//!
//! A rule instance is identified by its [`RuleKey`], which includes every
//! parameter the rule was instantiated with: the closing fence of a code
//! block of length 4 is a different rule from the one of length 3, and
//! `**` emphasis is a different rule from `*` emphasis.
//!
//! Only failures are cached. Every cached rule is a pure function of its
//! key and the cursor position, so once `(key, pos)` has failed it will
//! always fail, and skipping it cannot change the outcome. This is what
//! keeps inputs like long runs of unmatched `*` or deeply nested unclosed
//! HTML tags from backtracking exponentially.

use std::collections::HashSet;
use std::fmt;

use crate::ast::QuoteKind;

use super::grammar::list::ListKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKey {
    Root,
    Block,
    Para,
    Inlines,
    BlockQuote,
    Verbatim,
    FencedCodeBlock,
    CodeFence { marker: char, len: usize },
    HorizontalRule,
    AtxHeading,
    SetextHeading,
    List(ListKind),
    ListItem { kind: ListKind, tight: bool },
    DefinitionList,
    HtmlBlock,
    HtmlBlockInTags,
    Reference,
    Abbreviation,
    Table,
    TableRow,
    Inline,
    Endline,
    UlOrStarLine,
    Link,
    Label,
    LinkSource,
    Image,
    Strong,
    Emph,
    EmphOrStrong { marker: char, double: bool },
    EmphOrStrongClose { marker: char, double: bool },
    Code { ticks: usize },
    InlineHtml,
    Entity,
    Quoted(QuoteKind),
    Smarts,
}

impl RuleKey {
    /// Rules whose failures are worth remembering: the ones tried at the
    /// same position by many alternatives, or that recurse.
    pub fn is_memoized(self) -> bool {
        matches!(
            self,
            RuleKey::Inline
                | RuleKey::Endline
                | RuleKey::UlOrStarLine
                | RuleKey::Link
                | RuleKey::Label
                | RuleKey::LinkSource
                | RuleKey::EmphOrStrong { .. }
                | RuleKey::EmphOrStrongClose { .. }
                | RuleKey::CodeFence { .. }
                | RuleKey::Code { .. }
                | RuleKey::ListItem { .. }
                | RuleKey::HtmlBlockInTags
        )
    }

    /// Rules that mark one level of structural nesting.
    pub fn counts_depth(self) -> bool {
        matches!(
            self,
            RuleKey::Block | RuleKey::Inline | RuleKey::HtmlBlockInTags | RuleKey::LinkSource
        )
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKey::CodeFence { marker, len } => write!(f, "CodeFence({marker}x{len})"),
            RuleKey::List(kind) => write!(f, "{kind:?}List"),
            RuleKey::ListItem { kind, tight } => {
                write!(f, "{kind:?}Item({})", if *tight { "tight" } else { "loose" })
            }
            RuleKey::EmphOrStrong { marker, double } => {
                write!(f, "EmphOrStrong({})", marker_text(*marker, *double))
            }
            RuleKey::EmphOrStrongClose { marker, double } => {
                write!(f, "EmphOrStrongClose({})", marker_text(*marker, *double))
            }
            RuleKey::Code { ticks } => write!(f, "Code({ticks})"),
            RuleKey::Quoted(kind) => write!(f, "{kind:?}Quoted"),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

fn marker_text(marker: char, double: bool) -> String {
    if double {
        format!("{marker}{marker}")
    } else {
        marker.to_string()
    }
}

/// Failed `(rule, position)` pairs of one run.
#[derive(Debug, Default)]
pub struct MemoCache {
    failures: HashSet<(RuleKey, usize)>,
    hits: usize,
}

impl MemoCache {
    pub fn is_known_failure(&mut self, key: RuleKey, pos: usize) -> bool {
        let known = self.failures.contains(&(key, pos));
        if known {
            self.hits += 1;
        }
        known
    }

    pub fn record_failure(&mut self, key: RuleKey, pos: usize) {
        self.failures.insert((key, pos));
    }

    pub fn stats(&self) -> String {
        format!("{} cached failures, {} hits", self.failures.len(), self.hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parameters_distinguish_keys() {
        let mut memo = MemoCache::default();
        memo.record_failure(RuleKey::CodeFence { marker: '`', len: 3 }, 7);
        assert!(memo.is_known_failure(RuleKey::CodeFence { marker: '`', len: 3 }, 7));
        assert!(!memo.is_known_failure(RuleKey::CodeFence { marker: '`', len: 4 }, 7));
        assert!(!memo.is_known_failure(RuleKey::CodeFence { marker: '~', len: 3 }, 7));
        assert!(!memo.is_known_failure(RuleKey::CodeFence { marker: '`', len: 3 }, 8));
    }

    #[test]
    fn display_names() {
        assert_eq!(
            RuleKey::EmphOrStrong {
                marker: '*',
                double: true
            }
            .to_string(),
            "EmphOrStrong(**)"
        );
        assert_eq!(RuleKey::List(ListKind::Bullet).to_string(), "BulletList");
        assert_eq!(RuleKey::Para.to_string(), "Para");
    }
}

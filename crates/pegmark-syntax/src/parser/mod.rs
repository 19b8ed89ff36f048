//! # Parser - Backtracking Rule Engine
//!
//! This module holds the state of one grammar run over one [`InputBuffer`]:
//! the cursor, the explicit **value stack** on which grammar actions build
//! the tree, the failure cache, and borrowed access to the document-wide
//! [`SideTables`].
//!
//! ## Rules
//!
//! A rule is an ordinary function `fn(&mut Parser<'_>) -> bool`. It either
//! **matches** (returns `true`, may advance the cursor and push values) or
//! **fails** (returns `false` and leaves *no trace*: cursor, value stack and
//! side tables exactly as before). The combinators in [`combinators`] are
//! what make that guarantee cheap to uphold:
//!
//! ```ignore
//! fn heading_line(p: &mut Parser<'_>) -> bool {
//!     p.seq(|p| {                      // a transaction
//!         p.ch('#')                    // terminal matcher
//!             && p.push(Node::new(NodeKind::Header { level: 1 }))
//!             && inline(p)             // another rule
//!             && p.add_as_child()      // stack action
//!             && newline(p)            // if this fails, everything above is undone
//!     })
//! }
//! ```
//!
//! Ordered choice is plain `||` over rules that are each clean on failure.
//!
//! ## Transactions
//!
//! [`Parser::start`] opens a [`Transaction`]: a record of the cursor, the
//! stack height and the side-table lengths. It **must** be either committed
//! or rolled back; dropping it unresolved panics, the same contract the
//! event-based tree builders use for their node markers. Rolling back
//! restores the cursor and truncates the stack and tables.
//!
//! Truncation is only correct if nothing *below* the recorded stack height
//! was consumed or modified. Actions that reach beneath the current
//! transaction (attaching the top value to its parent, for instance) must
//! therefore be the last fallible step of their sequence. The engine tracks
//! the lowest stack slot each transaction touched and reports a
//! [`ParseError::StackDiscipline`] if a transaction that reached beneath its
//! floor is rolled back.
//!
//! ## Fatal errors
//!
//! Stack discipline violations and the recursion ceiling are not
//! backtracking failures. The first one is stored, every combinator fails
//! fast from then on, and [`Parser::finish`] reports it.
//!
//! ## Module Structure
//!
//! - [`combinators`] - sequence, repetition, lookahead, terminal matchers
//! - [`memo`] - rule identities and the failure cache
//! - [`trace`] - observer hooks for rule entry/exit
//! - [`subparse`] - recursive parses of container contents
//! - [`grammar`] - the Markdown rules themselves

pub mod combinators;
pub mod grammar;
pub mod memo;
pub mod subparse;
pub mod trace;

use crate::ast::{Node, NodeKind, Span};
use crate::error::ParseError;
use crate::input::InputBuffer;
use crate::tables::{SideTables, TableMark};
use grammar::Grammar;
use memo::{MemoCache, RuleKey};
use trace::ParseTracer;

/// Bookkeeping for one open transaction.
#[derive(Debug, Clone, Copy)]
struct Frame {
    pos: usize,
    /// Stack height when the transaction opened.
    floor: usize,
    /// Lowest stack slot popped or modified while it was open.
    low_water: usize,
    tables: TableMark,
}

/// The furthest position at which a terminal failed outside lookahead.
#[derive(Debug, Default)]
struct Furthest {
    pos: usize,
    expected: Vec<String>,
    rules: Vec<RuleKey>,
}

/// The state machine for one grammar run.
///
/// Grammar functions receive `&mut Parser` and use it to:
///
/// - Inspect input: `pos()`, `peek()`, `char_at()`, `slice()`
/// - Match: the terminal matchers and combinators in [`combinators`]
/// - Build structure: `push()`, `pop()`, `peek_node()`, `add_as_child()`,
///   `mark_span()`
pub struct Parser<'a> {
    input: &'a InputBuffer,
    /// The top-level buffer, for diagnostics of nested runs.
    document: &'a InputBuffer,
    grammar: &'a Grammar,
    tables: &'a mut SideTables,
    tracer: &'a mut dyn ParseTracer,
    pos: usize,
    stack: Vec<Node>,
    frames: Vec<Frame>,
    memo: MemoCache,
    trail: Vec<RuleKey>,
    /// Nesting of depth-counting rules, including that of enclosing runs.
    depth: usize,
    max_depth: usize,
    /// How many lookaheads are currently open.
    predicate_depth: usize,
    furthest: Furthest,
    fatal: Option<ParseError>,
}

impl<'a> Parser<'a> {
    /// Create a parser for a top-level document.
    pub fn new(
        input: &'a InputBuffer,
        grammar: &'a Grammar,
        tables: &'a mut SideTables,
        tracer: &'a mut dyn ParseTracer,
        max_depth: usize,
    ) -> Self {
        Self {
            input,
            document: input,
            grammar,
            tables,
            tracer,
            pos: 0,
            stack: Vec::new(),
            frames: Vec::new(),
            memo: MemoCache::default(),
            trail: Vec::new(),
            depth: 0,
            max_depth,
            predicate_depth: 0,
            furthest: Furthest::default(),
            fatal: None,
        }
    }

    /// Create a parser for a container's inner buffer.
    ///
    /// The new run gets its own cursor, stack and failure cache but shares
    /// the side tables, the tracer and the nesting budget of `outer`.
    pub fn nested<'b>(input: &'b InputBuffer, outer: &'b mut Parser<'_>) -> Parser<'b> {
        Parser {
            input,
            document: outer.document,
            grammar: outer.grammar,
            tables: &mut *outer.tables,
            tracer: &mut *outer.tracer,
            pos: 0,
            stack: Vec::new(),
            frames: Vec::new(),
            memo: MemoCache::default(),
            trail: Vec::new(),
            depth: outer.depth,
            max_depth: outer.max_depth,
            predicate_depth: 0,
            furthest: Furthest::default(),
            fatal: None,
        }
    }

    /// Consume the parser after the root rule ran, yielding the root node.
    pub fn finish(mut self, matched: bool) -> Result<Node, ParseError> {
        log::trace!(
            "run over {} chars finished: matched={matched}, {}",
            self.input.len(),
            self.memo.stats()
        );
        if let Some(err) = self.fatal.take() {
            return Err(err);
        }
        if !matched {
            return Err(self.exhaustion());
        }
        match (self.stack.pop(), self.stack.is_empty()) {
            (Some(root), true) if root.kind == NodeKind::Root => Ok(root),
            (top, _) => Err(ParseError::StackDiscipline {
                message: format!(
                    "root rule left {} value(s), top is {}",
                    self.stack.len() + usize::from(top.is_some()),
                    top.map_or("nothing", |n| n.kind.name())
                ),
            }),
        }
    }

    fn exhaustion(&self) -> ParseError {
        let position = self.input.origin_of(self.furthest.pos);
        let (line, column) = self.document.line_col(position);
        let expected = if self.furthest.expected.is_empty() {
            vec!["end of input".to_string()]
        } else {
            self.furthest.expected.clone()
        };
        ParseError::GrammarExhaustion {
            position,
            line,
            column,
            expected,
            rules: self.furthest.rules.iter().map(|r| r.to_string()).collect(),
        }
    }

    // === Cursor ===

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn input(&self) -> &'a InputBuffer {
        self.input
    }

    pub fn grammar(&self) -> &'a Grammar {
        self.grammar
    }

    /// Current character, if any.
    #[inline]
    pub fn peek(&self) -> Option<char> {
        self.input.get(self.pos)
    }

    /// Character `offset` positions ahead of the cursor.
    pub fn char_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset)
    }

    /// Character just before the cursor.
    pub fn prev_char(&self) -> Option<char> {
        self.pos.checked_sub(1).and_then(|i| self.input.get(i))
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Text of the local range `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> String {
        self.input.slice(start, end)
    }

    /// Top-level span of the local range `start..end`.
    pub fn span(&self, start: usize, end: usize) -> Span {
        self.input.span(start, end)
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    // === Value stack ===

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Push a value. Always matches, so it can sit inside `&&` chains.
    pub fn push(&mut self, node: Node) -> bool {
        self.stack.push(node);
        true
    }

    /// Push `node` with a span from `start` to the cursor.
    pub fn push_spanned(&mut self, node: Node, start: usize) -> bool {
        let span = self.span(start, self.pos);
        self.push(node.with_span(span))
    }

    /// Pop the top value. Popping an empty stack is a discipline violation.
    pub fn pop(&mut self) -> Option<Node> {
        let Some(node) = self.stack.pop() else {
            self.violation("pop from an empty value stack");
            return None;
        };
        self.touch(self.stack.len());
        Some(node)
    }

    /// Pop the top value and discard it.
    pub fn drop_top(&mut self) -> bool {
        self.pop().is_some()
    }

    /// Pop a value that must be a `Text` node, returning its text.
    pub fn pop_text(&mut self) -> Option<String> {
        match self.pop()?.kind {
            NodeKind::Text(text) => Some(text),
            other => {
                self.violation(format!("expected Text on the stack, found {}", other.name()));
                None
            }
        }
    }

    /// The value `depth` slots below the top (0 is the top).
    pub fn peek_node(&self, depth: usize) -> Option<&Node> {
        let len = self.stack.len();
        if depth >= len {
            return None;
        }
        self.stack.get(len - 1 - depth)
    }

    /// Mutable access to the value `depth` slots below the top, for setting
    /// node fields right after construction.
    pub fn peek_node_mut(&mut self, depth: usize) -> Option<&mut Node> {
        let len = self.stack.len();
        if depth >= len {
            self.violation(format!("peek {depth} below a stack of {len}"));
            return None;
        }
        let idx = len - 1 - depth;
        self.touch(idx);
        self.stack.get_mut(idx)
    }

    /// Replace the kind of the top value, keeping its children and span.
    pub fn retag(&mut self, kind: NodeKind) -> bool {
        match self.peek_node_mut(0) {
            Some(top) => {
                top.kind = kind;
                true
            }
            None => false,
        }
    }

    /// Pop the top value and append it to the value beneath it, merging
    /// adjacent text.
    pub fn add_as_child(&mut self) -> bool {
        if self.stack.len() < 2 {
            return self.violation(format!(
                "add_as_child needs two values, stack has {}",
                self.stack.len()
            ));
        }
        let Some(child) = self.pop() else {
            return false;
        };
        match self.peek_node_mut(0) {
            Some(parent) => {
                parent.add_child(child);
                true
            }
            None => false,
        }
    }

    /// Set the span of the top value to the local range `start..end`.
    pub fn mark_span(&mut self, start: usize, end: usize) -> bool {
        let span = self.span(start, end);
        match self.peek_node_mut(0) {
            Some(top) => {
                top.span = Some(span);
                true
            }
            None => false,
        }
    }

    fn touch(&mut self, slot: usize) {
        if let Some(frame) = self.frames.last_mut() {
            frame.low_water = frame.low_water.min(slot);
        }
    }

    // === Side tables ===

    pub fn tables(&mut self) -> &mut SideTables {
        self.tables
    }

    // === Fatal errors ===

    /// Whether a fatal error has been recorded.
    pub fn has_failed(&self) -> bool {
        self.fatal.is_some()
    }

    /// Record a fatal error (the first one wins). Returns `false`.
    pub fn fail_fatal(&mut self, err: ParseError) -> bool {
        if self.fatal.is_none() {
            log::debug!("parse aborted: {err}");
            self.fatal = Some(err);
        }
        false
    }

    fn violation(&mut self, message: impl Into<String>) -> bool {
        self.fail_fatal(ParseError::StackDiscipline {
            message: message.into(),
        })
    }

    // === Transactions ===

    /// Open a transaction at the current state.
    pub fn start(&mut self) -> Transaction {
        self.frames.push(Frame {
            pos: self.pos,
            floor: self.stack.len(),
            low_water: self.stack.len(),
            tables: self.tables.mark(),
        });
        Transaction {
            depth: self.frames.len(),
            completed: false,
        }
    }

    // === Diagnostics ===

    /// Note that a terminal wanted `describe()` at the cursor and failed.
    fn expected(&mut self, describe: impl FnOnce() -> String) {
        if self.predicate_depth > 0 {
            return;
        }
        if self.pos > self.furthest.pos || self.furthest.expected.is_empty() {
            self.furthest.pos = self.pos;
            self.furthest.expected = vec![describe()];
            self.furthest.rules = self.trail.clone();
        } else if self.pos == self.furthest.pos {
            let what = describe();
            if !self.furthest.expected.contains(&what) {
                self.furthest.expected.push(what);
            }
        }
    }
}

/// An open transaction on a [`Parser`].
///
/// ## The Must-Resolve Contract
///
/// Every transaction is either:
///
/// - **Committed** via `commit(parser)` - the changes stay, and whatever
///   the transaction reached beneath its floor is charged to the enclosing
///   transaction
/// - **Rolled back** via `rollback(parser)` - cursor, stack and side tables
///   return to the state at `start()`
///
/// Dropping one without doing either panics. Transactions nest strictly:
/// only the innermost open transaction may be resolved.
#[must_use = "Transactions must be committed or rolled back, dropping them is a bug"]
pub struct Transaction {
    /// Frame count right after this transaction opened.
    depth: usize,
    completed: bool,
}

impl Transaction {
    /// Keep everything done since `start()`.
    pub fn commit(mut self, p: &mut Parser<'_>) {
        self.completed = true;
        let Some(frame) = self.take_frame(p) else {
            return;
        };
        if let Some(parent) = p.frames.last_mut() {
            parent.low_water = parent.low_water.min(frame.low_water);
        }
    }

    /// Undo everything done since `start()`.
    pub fn rollback(mut self, p: &mut Parser<'_>) {
        self.completed = true;
        let Some(frame) = self.take_frame(p) else {
            return;
        };
        if frame.low_water < frame.floor {
            p.violation(format!(
                "failed alternative consumed stack slot {} beneath its floor {}",
                frame.low_water, frame.floor
            ));
        }
        p.pos = frame.pos;
        p.stack.truncate(frame.floor);
        p.tables.rollback(frame.tables);
    }

    fn take_frame(&self, p: &mut Parser<'_>) -> Option<Frame> {
        if p.frames.len() != self.depth {
            p.violation(format!(
                "transaction {} resolved while {} are open",
                self.depth,
                p.frames.len()
            ));
            return None;
        }
        p.frames.pop()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.completed && !std::thread::panicking() {
            panic!("Transaction must be either committed or rolled back");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::Extensions;
    use crate::parser::trace::NoopTracer;
    use pretty_assertions::assert_eq;

    fn with_parser<R>(source: &str, f: impl FnOnce(&mut Parser<'_>) -> R) -> R {
        let input = InputBuffer::new(source, 0);
        let grammar = Grammar::compile(Extensions::NONE);
        let mut tables = SideTables::new();
        let mut tracer = NoopTracer;
        let mut parser = Parser::new(&input, &grammar, &mut tables, &mut tracer, 32);
        f(&mut parser)
    }

    #[test]
    fn rollback_restores_cursor_and_stack() {
        with_parser("abc", |p| {
            let t = p.start();
            assert!(p.ch('a'));
            p.push(Node::text("a"));
            t.rollback(p);
            assert_eq!(p.pos(), 0);
            assert_eq!(p.stack_len(), 0);
            assert!(!p.has_failed());
        });
    }

    #[test]
    fn commit_keeps_changes() {
        with_parser("abc", |p| {
            let t = p.start();
            assert!(p.ch('a'));
            p.push(Node::text("a"));
            t.commit(p);
            assert_eq!(p.pos(), 1);
            assert_eq!(p.stack_len(), 1);
        });
    }

    #[test]
    fn add_as_child_merges_text() {
        with_parser("", |p| {
            p.push(Node::new(NodeKind::Para));
            p.push(Node::text("a"));
            assert!(p.add_as_child());
            p.push(Node::text("b"));
            assert!(p.add_as_child());
            let para = p.pop().unwrap();
            assert_eq!(para.children, vec![Node::text("ab")]);
        });
    }

    #[test]
    fn pop_from_empty_stack_is_fatal() {
        with_parser("", |p| {
            assert!(p.pop().is_none());
            assert!(matches!(
                p.fatal,
                Some(ParseError::StackDiscipline { .. })
            ));
        });
    }

    #[test]
    fn rolling_back_after_reaching_below_floor_is_fatal() {
        with_parser("", |p| {
            p.push(Node::new(NodeKind::Para));
            let t = p.start();
            p.push(Node::text("x"));
            p.add_as_child();
            t.rollback(p);
            assert!(matches!(
                p.fatal,
                Some(ParseError::StackDiscipline { .. })
            ));
        });
    }

    #[test]
    fn committing_after_reaching_below_floor_is_fine() {
        with_parser("", |p| {
            p.push(Node::new(NodeKind::Para));
            let t = p.start();
            p.push(Node::text("x"));
            p.add_as_child();
            t.commit(p);
            assert!(!p.has_failed());
            assert_eq!(p.stack_len(), 1);
        });
    }

    #[test]
    fn unresolved_transaction_panics() {
        let result = std::panic::catch_unwind(|| {
            with_parser("x", |p| {
                let _t = p.start();
            });
        });
        assert!(result.is_err());
    }

    #[test]
    fn finish_requires_a_single_root() {
        let input = InputBuffer::new("", 0);
        let grammar = Grammar::compile(Extensions::NONE);
        let mut tables = SideTables::new();
        let mut tracer = NoopTracer;
        let mut parser = Parser::new(&input, &grammar, &mut tables, &mut tracer, 32);
        parser.push(Node::new(NodeKind::Para));
        let err = parser.finish(true).unwrap_err();
        assert!(matches!(err, ParseError::StackDiscipline { .. }));
    }
}

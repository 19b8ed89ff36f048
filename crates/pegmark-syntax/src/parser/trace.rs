//! Observer hooks for rule entry and exit.
//!
//! Tracing is a debugging aid: a tracer sees every named rule the engine
//! tries, with the top-level source position, and whether it matched. It
//! cannot influence the parse.

use super::memo::RuleKey;

pub trait ParseTracer {
    fn enter(&mut self, _rule: RuleKey, _pos: usize) {}
    fn exit(&mut self, _rule: RuleKey, _pos: usize, _matched: bool) {}
}

/// Does nothing. Used by [`MarkdownParser::parse`](crate::MarkdownParser::parse).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl ParseTracer for NoopTracer {}

/// Emits one `trace!` record per rule entry and exit, indented by depth.
///
/// Enable with `RUST_LOG=pegmark_syntax=trace`; output is large.
#[derive(Debug, Default)]
pub struct LogTracer {
    depth: usize,
}

impl LogTracer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ParseTracer for LogTracer {
    fn enter(&mut self, rule: RuleKey, pos: usize) {
        log::trace!("{:indent$}> {rule} @{pos}", "", indent = self.depth);
        self.depth += 1;
    }

    fn exit(&mut self, rule: RuleKey, pos: usize, matched: bool) {
        self.depth = self.depth.saturating_sub(1);
        let outcome = if matched { "ok" } else { "fail" };
        log::trace!("{:indent$}< {rule} {outcome} @{pos}", "", indent = self.depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Extensions, MarkdownParser, ParserOptions};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        events: Vec<(RuleKey, bool)>,
    }

    impl ParseTracer for Recorder {
        fn exit(&mut self, rule: RuleKey, _pos: usize, matched: bool) {
            self.events.push((rule, matched));
        }
    }

    #[test]
    fn log_tracer_balances_depth() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut tracer = LogTracer::new();
        let root = MarkdownParser::new(ParserOptions::from(Extensions::ALL))
            .parse_traced("# a\n\n> b *c*\n", &mut tracer)
            .unwrap();
        assert_eq!(root.children.len(), 2);
        assert_eq!(tracer.depth, 0);
    }

    #[test]
    fn root_exits_last() {
        let mut recorder = Recorder::default();
        MarkdownParser::default()
            .parse_traced("text\n", &mut recorder)
            .unwrap();
        assert_eq!(recorder.events.last(), Some(&(RuleKey::Root, true)));
        assert!(recorder.events.contains(&(RuleKey::Para, true)));
    }
}

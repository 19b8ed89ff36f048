//! Sequence, repetition, lookahead and terminal matchers.
//!
//! Every combinator here upholds the engine's one rule: on failure the
//! parser is exactly as it was before the call. Terminals only move the
//! cursor when they match; composite combinators wrap their body in a
//! [`Transaction`](super::Transaction) and roll it back on failure.
//!
//! Once a fatal error is recorded every combinator returns `false`
//! immediately, so the whole rule tree unwinds without doing more work.

use super::Parser;
use super::memo::RuleKey;

impl<'a> Parser<'a> {
    /// Run `f` as one unit: if it fails, undo everything it did.
    pub fn seq(&mut self, f: impl FnOnce(&mut Self) -> bool) -> bool {
        if self.fatal.is_some() {
            return false;
        }
        let t = self.start();
        let matched = f(self) && self.fatal.is_none();
        if matched {
            t.commit(self);
        } else {
            t.rollback(self);
        }
        matched
    }

    /// Like [`seq`](Self::seq), for rules that produce a value instead of
    /// (or besides) pushing one.
    pub fn seq_value<T>(&mut self, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        if self.fatal.is_some() {
            return None;
        }
        let t = self.start();
        match f(self) {
            Some(value) if self.fatal.is_none() => {
                t.commit(self);
                Some(value)
            }
            _ => {
                t.rollback(self);
                None
            }
        }
    }

    /// Try `f`; matches either way.
    pub fn optional(&mut self, f: impl FnOnce(&mut Self) -> bool) -> bool {
        self.seq(f);
        self.fatal.is_none()
    }

    /// Apply `f` as often as it matches. An iteration that matches without
    /// consuming input ends the loop.
    pub fn zero_or_more(&mut self, mut f: impl FnMut(&mut Self) -> bool) -> bool {
        loop {
            let before = self.pos;
            if !self.seq(&mut f) || self.pos == before {
                break;
            }
        }
        self.fatal.is_none()
    }

    /// Apply `f` at least once, then as often as it matches.
    pub fn one_or_more(&mut self, mut f: impl FnMut(&mut Self) -> bool) -> bool {
        self.seq(&mut f) && self.zero_or_more(f)
    }

    /// Positive lookahead: does `f` match here? Never consumes or pushes.
    pub fn test(&mut self, f: impl FnOnce(&mut Self) -> bool) -> bool {
        if self.fatal.is_some() {
            return false;
        }
        let t = self.start();
        self.predicate_depth += 1;
        let matched = f(self);
        self.predicate_depth -= 1;
        t.rollback(self);
        matched && self.fatal.is_none()
    }

    /// Negative lookahead: matches when `f` does not.
    pub fn test_not(&mut self, f: impl FnOnce(&mut Self) -> bool) -> bool {
        let matched = self.test(f);
        !matched && self.fatal.is_none()
    }

    /// A named rule: traced, depth-checked and, for the keys that ask for
    /// it, remembered when it fails at a position.
    pub fn rule(&mut self, key: RuleKey, f: impl FnOnce(&mut Self) -> bool) -> bool {
        if self.fatal.is_some() {
            return false;
        }
        let start = self.pos;
        if key.is_memoized() && self.memo.is_known_failure(key, start) {
            return false;
        }
        let counts = key.counts_depth();
        if counts {
            if self.depth >= self.max_depth {
                let position = self.input.origin_of(start);
                return self.fail_fatal(crate::ParseError::RecursionBudget {
                    limit: self.max_depth,
                    position,
                });
            }
            self.depth += 1;
        }

        let origin = self.input.origin_of(start);
        self.tracer.enter(key, origin);
        self.trail.push(key);
        let matched = self.seq(f);
        self.trail.pop();
        self.tracer.exit(key, self.input.origin_of(self.pos), matched);

        if counts {
            self.depth -= 1;
        }
        if !matched && key.is_memoized() && self.fatal.is_none() {
            self.memo.record_failure(key, start);
        }
        matched
    }

    // === Terminals ===

    /// A single character.
    pub fn ch(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.advance(1);
            true
        } else {
            self.expected(|| format!("{c:?}"));
            false
        }
    }

    /// Any character of `set`.
    pub fn any_of(&mut self, set: &'static str) -> bool {
        match self.peek() {
            Some(c) if set.contains(c) => {
                self.advance(1);
                true
            }
            _ => {
                self.expected(|| format!("one of {set:?}"));
                false
            }
        }
    }

    /// Any character in `lo..=hi`.
    pub fn char_range(&mut self, lo: char, hi: char) -> bool {
        match self.peek() {
            Some(c) if (lo..=hi).contains(&c) => {
                self.advance(1);
                true
            }
            _ => {
                self.expected(|| format!("{lo:?}..={hi:?}"));
                false
            }
        }
    }

    /// Any character satisfying `pred`; `class` names it in diagnostics.
    pub fn char_if(&mut self, class: &'static str, pred: impl Fn(char) -> bool) -> bool {
        match self.peek() {
            Some(c) if pred(c) => {
                self.advance(1);
                true
            }
            _ => {
                self.expected(|| class.to_string());
                false
            }
        }
    }

    /// An exact string.
    pub fn literal(&mut self, lit: &str) -> bool {
        if self.input.matches_at(self.pos, lit) {
            self.advance(lit.chars().count());
            true
        } else {
            self.expected(|| format!("{lit:?}"));
            false
        }
    }

    /// A string, ignoring ASCII case.
    pub fn literal_ignore_case(&mut self, lit: &str) -> bool {
        let mut n = 0;
        for expected in lit.chars() {
            match self.char_at(n) {
                Some(c) if c.eq_ignore_ascii_case(&expected) => n += 1,
                _ => {
                    self.expected(|| format!("{lit:?}"));
                    return false;
                }
            }
        }
        self.advance(n);
        true
    }

    /// Any single character.
    pub fn any(&mut self) -> bool {
        if self.at_end() {
            self.expected(|| "any character".to_string());
            false
        } else {
            self.advance(1);
            true
        }
    }

    /// End of input.
    pub fn eoi(&mut self) -> bool {
        if self.at_end() {
            true
        } else {
            self.expected(|| "end of input".to_string());
            false
        }
    }

    /// Skip characters while `pred` holds. Always matches.
    pub fn skip_while(&mut self, pred: impl Fn(char) -> bool) -> bool {
        while self.peek().is_some_and(&pred) {
            self.advance(1);
        }
        true
    }

    /// At least `n` repetitions of `c`, then as many more as there are.
    pub fn n_or_more(&mut self, c: char, n: usize) -> bool {
        let mut count = 0;
        while self.char_at(count) == Some(c) {
            count += 1;
        }
        if count >= n {
            self.advance(count);
            true
        } else {
            self.expected(|| format!("{n} or more {c:?}"));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::extensions::Extensions;
    use crate::input::InputBuffer;
    use crate::parser::grammar::Grammar;
    use crate::parser::memo::RuleKey;
    use crate::parser::trace::NoopTracer;
    use crate::parser::Parser;
    use crate::tables::SideTables;
    use crate::{Node, ParseError};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn run<R>(source: &str, max_depth: usize, f: impl FnOnce(&mut Parser<'_>) -> R) -> R {
        let input = InputBuffer::new(source, 0);
        let grammar = Grammar::compile(Extensions::NONE);
        let mut tables = SideTables::new();
        let mut tracer = NoopTracer;
        let mut parser = Parser::new(&input, &grammar, &mut tables, &mut tracer, max_depth);
        f(&mut parser)
    }

    #[test]
    fn failed_sequence_is_clean() {
        run("abd", 8, |p| {
            let matched = p.seq(|p| p.ch('a') && p.push(Node::text("a")) && p.literal("bc"));
            assert!(!matched);
            assert_eq!(p.pos(), 0);
            assert_eq!(p.stack_len(), 0);
        });
    }

    #[test]
    fn ordered_choice_takes_first_match() {
        run("ab", 8, |p| {
            assert!(p.literal("abc") || p.literal("ab") || p.ch('a'));
            assert_eq!(p.pos(), 2);
        });
    }

    #[test]
    fn repetition_counts() {
        run("aaab", 8, |p| {
            assert!(p.zero_or_more(|p| p.ch('b')));
            assert_eq!(p.pos(), 0);
            assert!(p.one_or_more(|p| p.ch('a')));
            assert_eq!(p.pos(), 3);
            assert!(!p.one_or_more(|p| p.ch('a')));
        });
    }

    #[test]
    fn repetition_stops_on_empty_match() {
        run("x", 8, |p| {
            assert!(p.zero_or_more(|p| p.optional(|p| p.ch('y'))));
            assert_eq!(p.pos(), 0);
        });
    }

    #[test]
    fn lookahead_never_consumes() {
        run("ab", 8, |p| {
            assert!(p.test(|p| p.literal("ab") && p.push(Node::text("ab"))));
            assert_eq!(p.pos(), 0);
            assert_eq!(p.stack_len(), 0);
            assert!(p.test_not(|p| p.ch('b')));
            assert!(!p.test_not(|p| p.ch('a')));
        });
    }

    #[rstest]
    #[case("---x", '-', 3, true, 3)]
    #[case("--x", '-', 3, false, 0)]
    #[case("*****", '*', 4, true, 5)]
    fn n_or_more_cases(
        #[case] source: &str,
        #[case] c: char,
        #[case] n: usize,
        #[case] matched: bool,
        #[case] end: usize,
    ) {
        run(source, 8, |p| {
            assert_eq!(p.n_or_more(c, n), matched);
            assert_eq!(p.pos(), end);
        });
    }

    #[test]
    fn literal_ignore_case_matches_mixed_case() {
        run("X1", 8, |p| {
            assert!(p.literal_ignore_case("x"));
            assert!(p.char_range('0', '9'));
            assert!(p.eoi());
        });
    }

    #[test]
    fn recursion_ceiling_is_fatal() {
        fn nest(p: &mut Parser<'_>) -> bool {
            p.rule(RuleKey::Inline, |p| p.ch('(') && nest(p))
        }
        run("((((((((((", 4, |p| {
            assert!(!nest(p));
            assert!(matches!(
                p.fatal,
                Some(ParseError::RecursionBudget { limit: 4, position: 4 })
            ));
            // everything fails fast afterwards
            assert!(!p.optional(|p| p.ch('(')));
        });
    }

    #[test]
    fn failures_are_memoized() {
        use std::cell::Cell;
        let calls = Cell::new(0);
        run("ab", 8, |p| {
            for _ in 0..3 {
                assert!(!p.rule(RuleKey::Inline, |p| {
                    calls.set(calls.get() + 1);
                    p.literal("ax")
                }));
            }
        });
        assert_eq!(calls.get(), 1);
    }
}

//! Errors returned by a parse.
//!
//! A parse either yields a [`Root`](crate::Root) or one [`ParseError`]. The
//! grammar backtracks freely, so only whole-run outcomes and fatal
//! conditions (a broken value stack, an exhausted depth budget) reach here.

use thiserror::Error;

/// Why a parse produced no tree.
///
/// Backtracking failures inside the grammar are ordinary control flow and
/// never surface here; only the outcome of the outermost run is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The root rule stopped before the end of the input.
    #[error(
        "no rule matched at line {line}, column {column} (offset {position}); expected {}{}",
        .expected.join(" or "),
        rule_trail(.rules)
    )]
    GrammarExhaustion {
        position: usize,
        line: usize,
        column: usize,
        /// Terminals that failed at the furthest position reached.
        expected: Vec<String>,
        /// Named rules active when that failure was recorded, outermost first.
        rules: Vec<String>,
    },

    /// A grammar action broke the value-stack protocol. Always a bug in the
    /// grammar, never a property of the input.
    #[error("value stack discipline violated: {message}")]
    StackDiscipline { message: String },

    /// Nesting went deeper than the configured ceiling.
    #[error("nesting deeper than {limit} levels at offset {position}")]
    RecursionBudget { limit: usize, position: usize },
}

fn rule_trail(rules: &[String]) -> String {
    if rules.is_empty() {
        String::new()
    } else {
        format!(" (in {})", rules.join(" > "))
    }
}

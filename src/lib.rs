//! Pegine: a backtracking PEG execution engine.
//!
//! Grammars are composable rule trees built through [`rules::GrammarBuilder`]
//! and matched by a single depth-first backtracking engine. Instrumentation
//! is pluggable per parse attempt ([`trace::Silent`] for production,
//! [`trace::Tracing`] for diagnostics), and action hooks let matched
//! substrings mutate arbitrary user state. The [`calc`] module is the
//! shipped instantiation: an arithmetic-expression evaluator driving the
//! whole protocol.

pub use crate::cursor::{Cursor, Location};
pub use crate::diagnostics::{print_error, ActionError, SyntaxError, SyntaxErrorKind};
pub use crate::engine::{parse_complete, parse_complete_nothrow, Matcher};
pub use crate::rules::{
    CharClass, Grammar, GrammarBuilder, GrammarError, Hook, RepeatMin, Rule, RuleId,
};
pub use crate::trace::{Instrument, Silent, TraceRecord, TraceSink, Tracing};

pub mod calc;
pub mod cli;
pub mod cursor;
pub mod diagnostics;
pub mod engine;
pub mod rules;
pub mod trace;

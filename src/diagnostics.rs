//! Fatal parse errors and hook-level action faults.
//!
//! Ordinary combinator mismatches are not errors; they backtrack silently
//! inside the engine and never surface. The types here cover the fatal tier
//! only: a must-match rule failing after a committed token, or an action hook
//! raising a domain fault. Both abort the entire parse.

use std::fmt;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource};
use thiserror::Error;

use crate::cursor::Location;

/// A fault raised by an action hook: a domain error (division by zero), a
/// semantic-stack underflow, or a capture that cannot be converted.
///
/// The engine escalates it to a [`SyntaxError`] at the action's location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActionError {
    pub message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// What made the parse fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// A must-match rule failed after its commit point.
    Unmatched { rule: String },
    /// An action hook raised a fault after its rule matched.
    Action { rule: String, message: String },
}

/// A fatal parse error: the failing rule's display name and the location the
/// parse aborted at. Immutable once created; terminates the parse.
#[derive(Debug, Clone)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub location: Location,
    source: Option<Arc<NamedSource<String>>>,
}

impl SyntaxError {
    pub fn unmatched(rule: impl Into<String>, location: Location) -> Self {
        Self {
            kind: SyntaxErrorKind::Unmatched { rule: rule.into() },
            location,
            source: None,
        }
    }

    pub fn action(rule: impl Into<String>, location: Location, fault: ActionError) -> Self {
        Self {
            kind: SyntaxErrorKind::Action {
                rule: rule.into(),
                message: fault.message,
            },
            location,
            source: None,
        }
    }

    /// The display name of the rule the parse aborted in.
    pub fn rule(&self) -> &str {
        match &self.kind {
            SyntaxErrorKind::Unmatched { rule } | SyntaxErrorKind::Action { rule, .. } => rule,
        }
    }

    /// Attaches the input text so miette can render a labeled snippet.
    pub fn with_source(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.source = Some(Arc::new(NamedSource::new(name.into(), content.into())));
        self
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SyntaxErrorKind::Unmatched { rule } => {
                write!(f, "parsing aborted at {}: expected {}", self.location, rule)
            }
            SyntaxErrorKind::Action { rule, message } => {
                write!(
                    f,
                    "parsing aborted at {}: {} (in {})",
                    self.location, message, rule
                )
            }
        }
    }
}

impl std::error::Error for SyntaxError {}

impl Diagnostic for SyntaxError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match self.kind {
            SyntaxErrorKind::Unmatched { .. } => "pegine::parse::must_match",
            SyntaxErrorKind::Action { .. } => "pegine::parse::action",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self.kind {
            SyntaxErrorKind::Unmatched { .. } => Some(Box::new(
                "the grammar is committed past this point and cannot backtrack",
            )),
            SyntaxErrorKind::Action { .. } => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        self.source.as_ref()?;
        let label = LabeledSpan::new_with_span(
            Some(self.rule().to_string()),
            self.location.offset..self.location.offset,
        );
        Some(Box::new(std::iter::once(label)))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &dyn miette::SourceCode)
    }
}

/// Prints a [`SyntaxError`] with full miette diagnostics to stderr.
pub fn print_error(error: SyntaxError) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}

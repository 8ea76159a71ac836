//! Instrumentation strategies wrapping every rule invocation.
//!
//! A strategy is selected once per top-level parse and threaded uniformly
//! through the whole rule tree. [`Silent`] is the production path: it adds
//! zero bookkeeping. [`Tracing`] is the diagnostic path: it maintains a
//! nesting counter via a scope guard and emits a trace record when a
//! must-match rule fails.
//!
//! The nesting counter is balanced to zero after every parse attempt,
//! whether it succeeds, mismatches, or aborts with a fatal. The guard returned by
//! [`Instrument::enter`] decrements on `Drop`, and fatals propagate as
//! `Result::Err` past the guard, so no exit path can skip the decrement.

use std::cell::Cell;
use std::io::Write;
use std::rc::Rc;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::cursor::Location;
use crate::diagnostics::SyntaxError;

// ============================================================================
// TRACE OUTPUT
// ============================================================================

/// One diagnostic trace record: the rule-invocation depth at which a
/// must-match rule failed, where, and the rule's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub depth: u32,
    pub location: Location,
    pub rule: String,
}

/// Destination for trace records, injected into [`Tracing`] at construction.
pub trait TraceSink {
    fn record(&mut self, record: &TraceRecord);
}

/// Writes colored trace lines to stderr.
pub struct StderrTraceSink;

impl TraceSink for StderrTraceSink {
    fn record(&mut self, record: &TraceRecord) {
        let mut stream = StandardStream::stderr(ColorChoice::Auto);
        let _ = stream.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        let _ = writeln!(
            stream,
            "trace: nesting #{:2} at {} rule {}",
            record.depth, record.location, record.rule
        );
        let _ = stream.reset();
    }
}

/// Collects trace records into a shared buffer for later inspection.
pub struct CollectingSink {
    records: Rc<Cell<Vec<TraceRecord>>>,
}

impl CollectingSink {
    /// Returns the sink and a handle for reading the records afterwards.
    pub fn new() -> (Self, TraceHandle) {
        let records = Rc::new(Cell::new(Vec::new()));
        (
            Self {
                records: Rc::clone(&records),
            },
            TraceHandle { records },
        )
    }
}

impl TraceSink for CollectingSink {
    fn record(&mut self, record: &TraceRecord) {
        let mut records = self.records.take();
        records.push(record.clone());
        self.records.set(records);
    }
}

/// Read side of a [`CollectingSink`].
pub struct TraceHandle {
    records: Rc<Cell<Vec<TraceRecord>>>,
}

impl TraceHandle {
    pub fn take(&self) -> Vec<TraceRecord> {
        self.records.take()
    }
}

// ============================================================================
// STRATEGIES
// ============================================================================

/// The per-parse instrumentation contract. `Scope` is the guard value held
/// for the duration of one rule invocation; its drop is the guaranteed
/// "leave" half of the bookkeeping.
pub trait Instrument {
    type Scope;

    /// Called on entry to every rule invocation.
    fn enter(&mut self, at: Location) -> Self::Scope;

    /// Called when a rule flagged as must-match has failed. Returns the
    /// fatal error that will unwind the parse.
    fn must_failure(&mut self, rule: &str, at: Location) -> SyntaxError;
}

/// Production strategy: no bookkeeping at all.
#[derive(Debug, Default)]
pub struct Silent;

impl Instrument for Silent {
    type Scope = ();

    fn enter(&mut self, _at: Location) {}

    fn must_failure(&mut self, rule: &str, at: Location) -> SyntaxError {
        SyntaxError::unmatched(rule, at)
    }
}

/// Diagnostic strategy: nesting counter plus trace emission on must-match
/// failure. The sink is injected at construction; there is no global state.
pub struct Tracing {
    nesting: Rc<Cell<u32>>,
    sink: Box<dyn TraceSink>,
}

impl Tracing {
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        Self {
            nesting: Rc::new(Cell::new(0)),
            sink,
        }
    }

    /// A tracing strategy that prints to stderr.
    pub fn to_stderr() -> Self {
        Self::new(Box::new(StderrTraceSink))
    }

    /// Current rule-invocation depth. Zero whenever no parse is in flight.
    pub fn depth(&self) -> u32 {
        self.nesting.get()
    }
}

/// Scope guard for one traced rule invocation. Holds its own handle on the
/// counter so the decrement survives any borrow of the strategy itself.
pub struct NestScope {
    nesting: Rc<Cell<u32>>,
}

impl Drop for NestScope {
    fn drop(&mut self) {
        self.nesting.set(self.nesting.get() - 1);
    }
}

impl Instrument for Tracing {
    type Scope = NestScope;

    fn enter(&mut self, _at: Location) -> NestScope {
        self.nesting.set(self.nesting.get() + 1);
        NestScope {
            nesting: Rc::clone(&self.nesting),
        }
    }

    fn must_failure(&mut self, rule: &str, at: Location) -> SyntaxError {
        self.sink.record(&TraceRecord {
            depth: self.nesting.get(),
            location: at,
            rule: rule.to_string(),
        });
        SyntaxError::unmatched(rule, at)
    }
}

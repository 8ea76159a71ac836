//! The backtracking matcher and the top-level parse drivers.
//!
//! Matching is a single-threaded, depth-first walk of the rule tree. Every
//! rule invocation goes through [`Matcher::apply`], which wraps the variant
//! dispatch in the selected instrumentation strategy and escalates a failed
//! must-match into a fatal [`SyntaxError`]. The three-way outcome is encoded
//! as `Result<bool, SyntaxError>`:
//!
//! - `Ok(true)`: matched, cursor advanced past the consumed span;
//! - `Ok(false)`: ordinary mismatch, cursor unchanged;
//! - `Err(_)`: fatal, unwinds the whole parse immediately.
//!
//! Call-stack depth is proportional to grammar nesting times input size;
//! pathological grammars can exhaust it. That limit is documented, not
//! handled.

use crate::cursor::{Cursor, Location};
use crate::diagnostics::{ActionError, SyntaxError};
use crate::rules::{CharClass, Grammar, RepeatMin, Rule, RuleId};
use crate::trace::Instrument;

// ============================================================================
// MATCH CONTEXT
// ============================================================================

/// Per-invocation aggregate of grammar, cursor, user state, and the
/// instrumentation strategy. Lifetime = one top-level parse attempt; nothing
/// here is shared across attempts.
pub struct Matcher<'g, 'i, 's, 'm, S, I: Instrument> {
    grammar: &'g Grammar<S>,
    cursor: Cursor<'i>,
    state: &'s mut S,
    instrument: &'m mut I,
}

impl<'g, 'i, 's, 'm, S, I: Instrument> Matcher<'g, 'i, 's, 'm, S, I> {
    pub fn new(
        grammar: &'g Grammar<S>,
        input: &'i str,
        state: &'s mut S,
        instrument: &'m mut I,
    ) -> Self {
        Self {
            grammar,
            cursor: Cursor::new(input),
            state,
            instrument,
        }
    }

    /// The current cursor position.
    pub fn location(&self) -> Location {
        self.cursor.location()
    }

    /// Matches one rule at the current position.
    ///
    /// `must` marks the invocation as committed: an ordinary mismatch is
    /// escalated to a fatal error by the instrumentation strategy instead of
    /// being returned for backtracking.
    pub fn apply(&mut self, id: RuleId, must: bool) -> Result<bool, SyntaxError> {
        let at = self.cursor.location();
        let _scope = self.instrument.enter(at);
        let matched = self.dispatch(id, must)?;
        if !matched && must {
            let name = self.grammar.display_name(id);
            return Err(self.instrument.must_failure(&name, at));
        }
        Ok(matched)
    }

    fn dispatch(&mut self, id: RuleId, must: bool) -> Result<bool, SyntaxError> {
        let grammar = self.grammar;
        match grammar.rule(id) {
            Rule::Literal(c) => Ok(self.eat(|got| got == *c)),

            Rule::Class(class) => Ok(self.eat(|got| class.contains(got))),

            Rule::Sequence(items) => self.match_sequence(items, must, None),

            Rule::OrderedChoice(alternatives) => {
                let entry = self.cursor.location();
                for alternative in alternatives {
                    if self.apply(*alternative, false)? {
                        return Ok(true);
                    }
                    self.cursor.restore(entry);
                }
                Ok(false)
            }

            Rule::Repeat { inner, min } => {
                if matches!(min, RepeatMin::One) && !self.apply(*inner, must)? {
                    return Ok(false);
                }
                loop {
                    let before = self.cursor.location();
                    if !self.apply(*inner, false)? {
                        break;
                    }
                    // A zero-width iteration would repeat forever.
                    if self.cursor.location() == before {
                        break;
                    }
                }
                Ok(true)
            }

            Rule::Optional(inner) => {
                // The sub-rule restores the cursor itself on mismatch; a
                // fatal from deeper in the tree still propagates.
                let _ = self.apply(*inner, false)?;
                Ok(true)
            }

            Rule::IfMust { head, body } => {
                if !self.apply(*head, must)? {
                    return Ok(false);
                }
                // Committed: the body either matches or aborts the parse.
                self.apply(*body, true)
            }

            Rule::Pad { inner, skip } => {
                let entry = self.cursor.location();
                self.cursor.skip_class(*skip);
                if !self.apply(*inner, must)? {
                    self.cursor.restore(entry);
                    return Ok(false);
                }
                self.cursor.skip_class(*skip);
                Ok(true)
            }

            Rule::Action {
                inner,
                capture,
                hook,
            } => {
                let start = self.cursor.location();
                let text = if *capture == 1 {
                    if !self.apply(*inner, must)? {
                        return Ok(false);
                    }
                    self.cursor.slice(start, self.cursor.location())
                } else {
                    match self.match_capture(id, *inner, *capture, must)? {
                        Some(text) => text,
                        None => return Ok(false),
                    }
                };
                match hook.as_ref()(text, self.state) {
                    Ok(()) => Ok(true),
                    Err(fault) => Err(SyntaxError::action(
                        grammar.display_name(id),
                        start,
                        fault,
                    )),
                }
            }
        }
    }

    /// Matches `items` in order, restoring the entry position on the first
    /// mismatch. When `boundaries` is supplied, records the cursor position
    /// after each element for capture selection.
    fn match_sequence(
        &mut self,
        items: &[RuleId],
        must: bool,
        mut boundaries: Option<&mut Vec<Location>>,
    ) -> Result<bool, SyntaxError> {
        let entry = self.cursor.location();
        for item in items {
            if !self.apply(*item, must)? {
                self.cursor.restore(entry);
                return Ok(false);
            }
            if let Some(recorded) = boundaries.as_deref_mut() {
                recorded.push(self.cursor.location());
            }
        }
        Ok(true)
    }

    /// Matches the wrapped rule of an action with capture index > 1 and
    /// returns the selected sub-span's text. Sub-captures are only defined
    /// for a sequence inner rule: capture `k` selects its `k - 1`-th element.
    fn match_capture(
        &mut self,
        action: RuleId,
        inner: RuleId,
        capture: usize,
        must: bool,
    ) -> Result<Option<&'i str>, SyntaxError> {
        let grammar = self.grammar;
        let start = self.cursor.location();
        let fault = |message: String| {
            SyntaxError::action(grammar.display_name(action), start, ActionError::new(message))
        };
        if capture == 0 {
            return Err(fault("capture indices are 1-based".to_string()));
        }
        let Rule::Sequence(items) = grammar.rule(inner) else {
            return Err(fault(format!(
                "capture {capture} requires a sequence rule"
            )));
        };
        let mut boundaries = Vec::with_capacity(items.len());
        if !self.match_sequence(items, must, Some(&mut boundaries))? {
            return Ok(None);
        }
        let element = capture - 1;
        if element > boundaries.len() {
            return Err(fault(format!(
                "capture {capture} is out of range for a sequence of {} rules",
                boundaries.len()
            )));
        }
        let from = if element == 1 {
            start
        } else {
            boundaries[element - 2]
        };
        Ok(Some(self.cursor.slice(from, boundaries[element - 1])))
    }

    fn eat(&mut self, wanted: impl Fn(char) -> bool) -> bool {
        match self.cursor.peek() {
            Some(c) if wanted(c) => {
                self.cursor.bump();
                true
            }
            _ => false,
        }
    }
}

// ============================================================================
// TOP-LEVEL DRIVERS
// ============================================================================

/// Matches `start` against the whole input: the rule must succeed and only
/// whitespace may remain. Propagates fatal errors to the caller.
pub fn parse_complete<S, I: Instrument>(
    grammar: &Grammar<S>,
    start: RuleId,
    input: &str,
    state: &mut S,
    instrument: &mut I,
) -> Result<bool, SyntaxError> {
    let mut matcher = Matcher::new(grammar, input, state, instrument);
    if !matcher.apply(start, false)? {
        return Ok(false);
    }
    matcher.cursor.skip_class(CharClass::Space);
    Ok(matcher.cursor.at_end())
}

/// Non-throwing form of [`parse_complete`]: fatal errors become `false`.
///
/// On failure the user state is left in whatever partial shape the already
/// executed actions produced; callers must not assume any particular content.
pub fn parse_complete_nothrow<S, I: Instrument>(
    grammar: &Grammar<S>,
    start: RuleId,
    input: &str,
    state: &mut S,
    instrument: &mut I,
) -> bool {
    parse_complete(grammar, start, input, state, instrument).unwrap_or(false)
}

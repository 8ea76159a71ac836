//! Grammar representation: rule variants, the rule arena, and the builder.
//!
//! A grammar is an arena of rules addressed by [`RuleId`]; composite rules
//! refer to their sub-rules by id rather than by ownership, which makes
//! recursive grammars (an expression containing a parenthesized expression)
//! representable without reference cycles. The builder's `declare`/`define`
//! pair reserves an id before the rule body exists.
//!
//! Rules are data, not code. All matching behavior lives in the engine;
//! this module only describes shapes and names.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::diagnostics::ActionError;

// ============================================================================
// CHARACTER CLASSES
// ============================================================================

/// The character classes the engine matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// ASCII decimal digits.
    Digit,
    /// A leading `+` or `-`.
    Sign,
    /// ASCII whitespace, including tabs and newlines.
    Space,
}

impl CharClass {
    pub fn contains(&self, c: char) -> bool {
        match self {
            CharClass::Digit => c.is_ascii_digit(),
            CharClass::Sign => c == '+' || c == '-',
            CharClass::Space => c.is_ascii_whitespace(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CharClass::Digit => "digit",
            CharClass::Sign => "sign",
            CharClass::Space => "space",
        }
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// RULES
// ============================================================================

/// Handle to a rule in its grammar's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleId(pub(crate) usize);

/// Minimum iteration count for [`Rule::Repeat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatMin {
    Zero,
    One,
}

/// An action hook: receives the captured text and the caller's state.
/// Returning an error aborts the entire parse.
pub type Hook<S> = Arc<dyn Fn(&str, &mut S) -> Result<(), ActionError> + Send + Sync>;

/// One grammar rule. `S` is the user state type action hooks mutate.
pub enum Rule<S> {
    /// Matches exactly one given character.
    Literal(char),
    /// Matches exactly one character of a class.
    Class(CharClass),
    /// Matches every sub-rule in order; rewinds wholesale on mismatch.
    Sequence(Vec<RuleId>),
    /// Tries each alternative from the same position; first match wins.
    OrderedChoice(Vec<RuleId>),
    /// Greedy repetition: as many iterations as the input allows.
    Repeat { inner: RuleId, min: RepeatMin },
    /// Matches the sub-rule if possible; succeeds either way.
    Optional(RuleId),
    /// Commit point: once `head` matches, `body` must match or the parse
    /// aborts with a fatal error.
    IfMust { head: RuleId, body: RuleId },
    /// Discards characters of `skip` on both sides of the inner rule.
    Pad { inner: RuleId, skip: CharClass },
    /// Runs `hook` on the captured text after the inner rule matches.
    /// Capture 1 is the whole inner match; capture k > 1 selects the
    /// `k - 1`-th element of an inner sequence.
    Action {
        inner: RuleId,
        capture: usize,
        hook: Hook<S>,
    },
}

impl<S> Rule<S> {
    pub fn literal(c: char) -> Self {
        Rule::Literal(c)
    }

    pub fn class(class: CharClass) -> Self {
        Rule::Class(class)
    }

    pub fn sequence(items: Vec<RuleId>) -> Self {
        Rule::Sequence(items)
    }

    pub fn choice(alternatives: Vec<RuleId>) -> Self {
        Rule::OrderedChoice(alternatives)
    }

    pub fn zero_or_more(inner: RuleId) -> Self {
        Rule::Repeat {
            inner,
            min: RepeatMin::Zero,
        }
    }

    pub fn one_or_more(inner: RuleId) -> Self {
        Rule::Repeat {
            inner,
            min: RepeatMin::One,
        }
    }

    pub fn optional(inner: RuleId) -> Self {
        Rule::Optional(inner)
    }

    pub fn if_must(head: RuleId, body: RuleId) -> Self {
        Rule::IfMust { head, body }
    }

    pub fn pad(inner: RuleId, skip: CharClass) -> Self {
        Rule::Pad { inner, skip }
    }

    pub fn action(inner: RuleId, capture: usize, hook: Hook<S>) -> Self {
        Rule::Action {
            inner,
            capture,
            hook,
        }
    }
}

struct RuleDef<S> {
    name: Option<&'static str>,
    rule: Rule<S>,
}

// ============================================================================
// GRAMMAR
// ============================================================================

/// A finished, immutable grammar: the rule arena plus display names.
pub struct Grammar<S> {
    rules: Vec<RuleDef<S>>,
}

impl<S> Grammar<S> {
    pub(crate) fn rule(&self, id: RuleId) -> &Rule<S> {
        &self.rules[id.0].rule
    }

    /// The human-readable name used in fatal errors and trace records.
    ///
    /// An explicit name always wins. Unnamed rules get a name derived from
    /// their shape; unnamed wrappers borrow the name of what they wrap.
    pub fn display_name(&self, id: RuleId) -> String {
        let def = &self.rules[id.0];
        if let Some(name) = def.name {
            return name.to_string();
        }
        match &def.rule {
            Rule::Literal(c) => format!("'{c}'"),
            Rule::Class(class) => class.name().to_string(),
            Rule::Sequence(_) => "sequence".to_string(),
            Rule::OrderedChoice(_) => "choice".to_string(),
            Rule::Repeat {
                min: RepeatMin::Zero,
                ..
            } => "zero-or-more repetition".to_string(),
            Rule::Repeat {
                min: RepeatMin::One,
                ..
            } => "one-or-more repetition".to_string(),
            Rule::Optional(_) => "optional".to_string(),
            Rule::IfMust { body, .. } => self.display_name(*body),
            Rule::Pad { inner, .. } => self.display_name(*inner),
            Rule::Action { inner, .. } => self.display_name(*inner),
        }
    }
}

/// Grammar construction failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    /// A rule was declared but never given a definition.
    #[error("rule '{name}' was declared but never defined")]
    Undefined { name: &'static str },
}

enum Slot<S> {
    Defined(RuleDef<S>),
    Declared(&'static str),
}

/// Builds a [`Grammar`] one rule at a time.
///
/// For recursive grammars, `declare` hands out the id up front and `define`
/// fills in the body later; `finish` rejects any id left undefined.
pub struct GrammarBuilder<S> {
    slots: Vec<Slot<S>>,
}

impl<S> GrammarBuilder<S> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Adds an unnamed rule.
    pub fn add(&mut self, rule: Rule<S>) -> RuleId {
        self.insert(None, rule)
    }

    /// Adds a rule with an explicit display name.
    pub fn named(&mut self, name: &'static str, rule: Rule<S>) -> RuleId {
        self.insert(Some(name), rule)
    }

    /// Reserves an id for a rule whose body will be supplied by `define`.
    pub fn declare(&mut self, name: &'static str) -> RuleId {
        let id = RuleId(self.slots.len());
        self.slots.push(Slot::Declared(name));
        id
    }

    /// Supplies the body of a declared rule, keeping its declared name.
    pub fn define(&mut self, id: RuleId, rule: Rule<S>) {
        let name = match &self.slots[id.0] {
            Slot::Declared(name) => Some(*name),
            Slot::Defined(def) => def.name,
        };
        self.slots[id.0] = Slot::Defined(RuleDef { name, rule });
    }

    pub fn finish(self) -> Result<Grammar<S>, GrammarError> {
        let mut rules = Vec::with_capacity(self.slots.len());
        for slot in self.slots {
            match slot {
                Slot::Defined(def) => rules.push(def),
                Slot::Declared(name) => return Err(GrammarError::Undefined { name }),
            }
        }
        Ok(Grammar { rules })
    }

    fn insert(&mut self, name: Option<&'static str>, rule: Rule<S>) -> RuleId {
        let id = RuleId(self.slots.len());
        self.slots.push(Slot::Defined(RuleDef { name, rule }));
        id
    }
}

impl<S> Default for GrammarBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

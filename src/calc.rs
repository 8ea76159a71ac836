//! The arithmetic calculator: the reference instantiation of the action
//! protocol.
//!
//! The grammar accepts signed integers, the four basic operations with
//! standard precedence and left-to-right associativity, parenthesized
//! grouping, and arbitrary whitespace around tokens. Evaluation happens
//! during the match itself: numeral rules push onto the semantic stack,
//! operator rules pop two operands and push the result. After a successful
//! top-level parse exactly one value remains on the stack.
//!
//! Operator and opening-parenthesis tokens are commit points: once one has
//! matched, the operand that must follow cannot fail quietly. A missing
//! right operand or closing parenthesis aborts the whole parse.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::diagnostics::{ActionError, SyntaxError};
use crate::engine::{parse_complete, parse_complete_nothrow};
use crate::rules::{CharClass, Grammar, GrammarBuilder, GrammarError, Hook, Rule, RuleId};
use crate::trace::{Instrument, Silent};

/// The value type the calculator computes with.
pub type Value = i64;

// ============================================================================
// SEMANTIC STACK
// ============================================================================

/// The semantic stack: owned by the caller, mutated by action hooks.
///
/// After a failed parse the content is unspecified: actions execute eagerly
/// and their effects are not rolled back when a later fatal aborts the parse.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stack(Vec<Value>);

impl Stack {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, value: Value) {
        self.0.push(value);
    }

    /// Pops the most recently pushed value.
    pub fn pull(&mut self) -> Option<Value> {
        self.0.pop()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The parse result: the single remaining value. Any other count means
    /// the grammar and its actions disagree.
    pub fn single(&self) -> Option<Value> {
        match self.0.as_slice() {
            [value] => Some(*value),
            _ => None,
        }
    }
}

// ============================================================================
// ACTION HOOKS
// ============================================================================

fn underflow(operator: &str) -> ActionError {
    ActionError::new(format!("semantic stack underflow in '{operator}'"))
}

/// Parses the matched numeral span and pushes it.
///
/// The grammar only invokes this on `[+-]?[0-9]+`, so a conversion failure
/// (an out-of-range literal) is a fatal fault, not a backtrack.
fn push_number(text: &str, stack: &mut Stack) -> Result<(), ActionError> {
    let value = text
        .parse::<Value>()
        .map_err(|_| ActionError::new(format!("'{text}' is not a representable integer")))?;
    stack.push(value);
    Ok(())
}

/// Builds a binary-operator hook from the operation itself plus an optional
/// pre-check on the right operand.
///
/// The top of stack was pushed most recently, by the right-hand
/// sub-expression, so it is pulled first as the right operand. The pre-check
/// runs before the left operand is pulled, matching the original evaluation
/// order for division by zero.
fn binary_op(
    operator: &'static str,
    apply: fn(Value, Value) -> Value,
    check_right: Option<fn(Value) -> Result<(), ActionError>>,
) -> Hook<Stack> {
    Arc::new(move |_text, stack: &mut Stack| {
        let right = stack.pull().ok_or_else(|| underflow(operator))?;
        if let Some(check) = check_right {
            check(right)?;
        }
        let left = stack.pull().ok_or_else(|| underflow(operator))?;
        stack.push(apply(left, right));
        Ok(())
    })
}

fn nonzero_divisor(right: Value) -> Result<(), ActionError> {
    if right == 0 {
        return Err(ActionError::new("division by zero"));
    }
    Ok(())
}

// ============================================================================
// GRAMMAR
// ============================================================================

/// The calculator: the arithmetic grammar plus its start rule. Built once
/// and reusable across any number of parse attempts.
pub struct Calculator {
    grammar: Grammar<Stack>,
    start: RuleId,
}

static CALCULATOR: Lazy<Calculator> =
    Lazy::new(|| Calculator::new().expect("calculator grammar is well-formed"));

impl Calculator {
    /// Builds the grammar. Rule layering encodes precedence: `expression`
    /// over `product` over `atom`, with `*`/`/` binding tighter than `+`/`-`.
    pub fn new() -> Result<Self, GrammarError> {
        let mut b = GrammarBuilder::<Stack>::new();
        let expression = b.declare("expression");

        // number: [+-]?[0-9]+, padded, pushed onto the stack
        let sign = b.add(Rule::class(CharClass::Sign));
        let opt_sign = b.add(Rule::optional(sign));
        let digit = b.add(Rule::class(CharClass::Digit));
        let digits = b.add(Rule::one_or_more(digit));
        let number = b.named("number", Rule::sequence(vec![opt_sign, digits]));
        let push_hook: Hook<Stack> = Arc::new(push_number);
        let push = b.add(Rule::action(number, 1, push_hook));
        let padded_number = b.add(Rule::pad(push, CharClass::Space));

        // ( expression ), committed once the opening parenthesis matched
        let open_paren = b.add(Rule::literal('('));
        let open = b.add(Rule::pad(open_paren, CharClass::Space));
        let close_paren = b.named("closing parenthesis", Rule::literal(')'));
        let close = b.add(Rule::pad(close_paren, CharClass::Space));
        let group_body = b.named(
            "parenthesized expression",
            Rule::sequence(vec![expression, close]),
        );
        let group = b.add(Rule::if_must(open, group_body));

        let atom = b.named("atom", Rule::choice(vec![padded_number, group]));

        // product: atom (('*' | '/') atom)*
        let mul_token = b.add(Rule::literal('*'));
        let mul_op = b.add(Rule::pad(mul_token, CharClass::Space));
        let mul_body = b.add(Rule::if_must(mul_op, atom));
        let mul = b.add(Rule::action(
            mul_body,
            1,
            binary_op("*", |a, b| a.wrapping_mul(b), None),
        ));

        let div_token = b.add(Rule::literal('/'));
        let div_op = b.add(Rule::pad(div_token, CharClass::Space));
        let div_body = b.add(Rule::if_must(div_op, atom));
        let div = b.add(Rule::action(
            div_body,
            1,
            binary_op("/", |a, b| a.wrapping_div(b), Some(nonzero_divisor)),
        ));

        let product_tail = b.add(Rule::choice(vec![mul, div]));
        let product_star = b.add(Rule::zero_or_more(product_tail));
        let product = b.named("product", Rule::sequence(vec![atom, product_star]));

        // expression: product (('+' | '-') product)*
        let add_token = b.add(Rule::literal('+'));
        let add_op = b.add(Rule::pad(add_token, CharClass::Space));
        let add_body = b.add(Rule::if_must(add_op, product));
        let add = b.add(Rule::action(
            add_body,
            1,
            binary_op("+", |a, b| a.wrapping_add(b), None),
        ));

        let sub_token = b.add(Rule::literal('-'));
        let sub_op = b.add(Rule::pad(sub_token, CharClass::Space));
        let sub_body = b.add(Rule::if_must(sub_op, product));
        let sub = b.add(Rule::action(
            sub_body,
            1,
            binary_op("-", |a, b| a.wrapping_sub(b), None),
        ));

        let sum_tail = b.add(Rule::choice(vec![add, sub]));
        let sum_star = b.add(Rule::zero_or_more(sum_tail));
        b.define(expression, Rule::sequence(vec![product, sum_star]));

        Ok(Self {
            grammar: b.finish()?,
            start: expression,
        })
    }

    /// The process-wide calculator instance.
    pub fn global() -> &'static Calculator {
        &CALCULATOR
    }

    pub fn grammar(&self) -> &Grammar<Stack> {
        &self.grammar
    }

    pub fn start(&self) -> RuleId {
        self.start
    }

    /// Throwing entry point: matches the whole input against `expression`
    /// with a caller-supplied stack and instrumentation strategy. Fatal
    /// errors carry the input as source context.
    pub fn parse<I: Instrument>(
        &self,
        input: &str,
        stack: &mut Stack,
        instrument: &mut I,
    ) -> Result<bool, SyntaxError> {
        parse_complete(&self.grammar, self.start, input, stack, instrument)
            .map_err(|error| error.with_source("expression", input))
    }

    /// Non-throwing convenience: evaluates `input` with a fresh stack and
    /// the silent strategy. `None` covers ordinary mismatch, fatal errors,
    /// and a stack that did not end up holding exactly one value.
    pub fn evaluate(&self, input: &str) -> Option<Value> {
        let mut stack = Stack::new();
        if !parse_complete_nothrow(&self.grammar, self.start, input, &mut stack, &mut Silent) {
            return None;
        }
        stack.single()
    }
}

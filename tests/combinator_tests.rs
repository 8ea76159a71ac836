// Combinator-level semantics: consumption, backtracking, commit points, and
// the action capture protocol, exercised on small purpose-built grammars.

use std::sync::Arc;

use pegine::{
    CharClass, Grammar, GrammarBuilder, Hook, Matcher, Rule, RuleId, Silent, SyntaxErrorKind,
};

// ---
// Test Setup
// ---

/// Applies `start` once (not anchored to end of input) and returns the match
/// outcome plus the byte offset the cursor ended at.
fn apply<S>(grammar: &Grammar<S>, start: RuleId, input: &str, state: &mut S) -> (bool, usize) {
    let mut silent = Silent;
    let mut matcher = Matcher::new(grammar, input, state, &mut silent);
    let matched = matcher.apply(start, false).expect("no fatal expected");
    (matched, matcher.location().offset)
}

fn apply_unit(grammar: &Grammar<()>, start: RuleId, input: &str) -> (bool, usize) {
    apply(grammar, start, input, &mut ())
}

/// A hook that appends a tag and the matched text to a string log.
fn log_hook(tag: &'static str) -> Hook<Vec<String>> {
    Arc::new(move |text, log: &mut Vec<String>| {
        log.push(format!("{tag}:{text}"));
        Ok(())
    })
}

// ---
// Atoms
// ---

#[test]
fn literal_consumes_exactly_one_character() {
    let mut b = GrammarBuilder::<()>::new();
    let start = b.add(Rule::literal('a'));
    let grammar = b.finish().unwrap();

    assert_eq!(apply_unit(&grammar, start, "ab"), (true, 1));
    assert_eq!(apply_unit(&grammar, start, "ba"), (false, 0));
    assert_eq!(apply_unit(&grammar, start, ""), (false, 0));
}

#[test]
fn char_class_matches_by_class() {
    let mut b = GrammarBuilder::<()>::new();
    let digit = b.add(Rule::class(CharClass::Digit));
    let grammar = b.finish().unwrap();

    assert_eq!(apply_unit(&grammar, digit, "7x"), (true, 1));
    assert_eq!(apply_unit(&grammar, digit, "x7"), (false, 0));
}

// ---
// Composition
// ---

#[test]
fn sequence_restores_cursor_on_mid_failure() {
    let mut b = GrammarBuilder::<()>::new();
    let a = b.add(Rule::literal('a'));
    let c = b.add(Rule::literal('c'));
    let start = b.add(Rule::sequence(vec![a, c]));
    let grammar = b.finish().unwrap();

    assert_eq!(apply_unit(&grammar, start, "ac"), (true, 2));
    // 'a' matched and consumed, 'c' failed: the whole sequence rewinds.
    assert_eq!(apply_unit(&grammar, start, "ab"), (false, 0));
}

#[test]
fn ordered_choice_commits_to_first_matching_alternative() {
    let mut b = GrammarBuilder::<Vec<String>>::new();
    let digit = b.add(Rule::class(CharClass::Digit));
    let first = b.add(Rule::action(digit, 1, log_hook("first")));
    let digit_again = b.add(Rule::class(CharClass::Digit));
    let second = b.add(Rule::action(digit_again, 1, log_hook("second")));
    let start = b.add(Rule::choice(vec![first, second]));
    let grammar = b.finish().unwrap();

    let mut log = Vec::new();
    let (matched, _) = apply(&grammar, start, "5", &mut log);
    assert!(matched);
    // Both alternatives would match; only the first one may run.
    assert_eq!(log, vec!["first:5".to_string()]);
}

#[test]
fn ordered_choice_restores_cursor_between_alternatives() {
    let mut b = GrammarBuilder::<()>::new();
    let a = b.add(Rule::literal('a'));
    let bee = b.add(Rule::literal('b'));
    let ab = b.add(Rule::sequence(vec![a, bee]));
    let lone_a = b.add(Rule::literal('a'));
    let start = b.add(Rule::choice(vec![ab, lone_a]));
    let grammar = b.finish().unwrap();

    // "ab" fails in the first alternative after consuming 'a'; the second
    // alternative must start over from the entry position.
    assert_eq!(apply_unit(&grammar, start, "ax"), (true, 1));
}

#[test]
fn zero_or_more_is_greedy_and_never_fails() {
    let mut b = GrammarBuilder::<()>::new();
    let digit = b.add(Rule::class(CharClass::Digit));
    let start = b.add(Rule::zero_or_more(digit));
    let grammar = b.finish().unwrap();

    assert_eq!(apply_unit(&grammar, start, "123a"), (true, 3));
    assert_eq!(apply_unit(&grammar, start, "a"), (true, 0));
    assert_eq!(apply_unit(&grammar, start, ""), (true, 0));
}

#[test]
fn one_or_more_requires_at_least_one_iteration() {
    let mut b = GrammarBuilder::<()>::new();
    let digit = b.add(Rule::class(CharClass::Digit));
    let start = b.add(Rule::one_or_more(digit));
    let grammar = b.finish().unwrap();

    assert_eq!(apply_unit(&grammar, start, "42x"), (true, 2));
    assert_eq!(apply_unit(&grammar, start, "x"), (false, 0));
}

#[test]
fn optional_never_fails() {
    let mut b = GrammarBuilder::<()>::new();
    let sign = b.add(Rule::class(CharClass::Sign));
    let start = b.add(Rule::optional(sign));
    let grammar = b.finish().unwrap();

    assert_eq!(apply_unit(&grammar, start, "-1"), (true, 1));
    assert_eq!(apply_unit(&grammar, start, "1"), (true, 0));
}

#[test]
fn pad_discards_whitespace_on_both_sides() {
    let mut b = GrammarBuilder::<()>::new();
    let plus = b.add(Rule::literal('+'));
    let start = b.add(Rule::pad(plus, CharClass::Space));
    let grammar = b.finish().unwrap();

    assert_eq!(apply_unit(&grammar, start, "  +  x"), (true, 5));
    // Inner rule failed: leading whitespace is given back too.
    assert_eq!(apply_unit(&grammar, start, "  x"), (false, 0));
}

// ---
// Actions and captures
// ---

#[test]
fn action_receives_full_match_for_capture_one() {
    let mut b = GrammarBuilder::<Vec<String>>::new();
    let sign = b.add(Rule::class(CharClass::Sign));
    let opt_sign = b.add(Rule::optional(sign));
    let digit = b.add(Rule::class(CharClass::Digit));
    let digits = b.add(Rule::one_or_more(digit));
    let number = b.add(Rule::sequence(vec![opt_sign, digits]));
    let start = b.add(Rule::action(number, 1, log_hook("num")));
    let grammar = b.finish().unwrap();

    let mut log = Vec::new();
    let (matched, offset) = apply(&grammar, start, "-42 ", &mut log);
    assert!(matched);
    assert_eq!(offset, 3);
    assert_eq!(log, vec!["num:-42".to_string()]);
}

#[test]
fn action_selects_sequence_element_for_higher_captures() {
    // capture 2 = first element of the sequence, capture 3 = second.
    let mut b = GrammarBuilder::<Vec<String>>::new();
    let sign = b.add(Rule::class(CharClass::Sign));
    let digit = b.add(Rule::class(CharClass::Digit));
    let digits = b.add(Rule::one_or_more(digit));
    let signed = b.add(Rule::sequence(vec![sign, digits]));
    let start = b.add(Rule::action(signed, 3, log_hook("digits")));
    let grammar = b.finish().unwrap();

    let mut log = Vec::new();
    let (matched, _) = apply(&grammar, start, "+42", &mut log);
    assert!(matched);
    assert_eq!(log, vec!["digits:42".to_string()]);
}

#[test]
fn action_does_not_run_when_inner_rule_fails() {
    let mut b = GrammarBuilder::<Vec<String>>::new();
    let digit = b.add(Rule::class(CharClass::Digit));
    let start = b.add(Rule::action(digit, 1, log_hook("num")));
    let grammar = b.finish().unwrap();

    let mut log = Vec::new();
    let (matched, _) = apply(&grammar, start, "x", &mut log);
    assert!(!matched);
    assert!(log.is_empty());
}

#[test]
fn hook_error_is_fatal() {
    let mut b = GrammarBuilder::<()>::new();
    let digit = b.add(Rule::class(CharClass::Digit));
    let failing: Hook<()> = Arc::new(|_, _| Err(pegine::ActionError::new("nope")));
    let start = b.named("doomed", Rule::action(digit, 1, failing));
    let grammar = b.finish().unwrap();

    let mut state = ();
    let mut silent = Silent;
    let mut matcher = Matcher::new(&grammar, "5", &mut state, &mut silent);
    let error = matcher.apply(start, false).unwrap_err();
    assert_eq!(error.rule(), "doomed");
    assert!(matches!(error.kind, SyntaxErrorKind::Action { .. }));
}

// ---
// Commit semantics
// ---

#[test]
fn if_must_escalates_body_failure_to_fatal() {
    let mut b = GrammarBuilder::<()>::new();
    let open = b.add(Rule::literal('('));
    let digit = b.add(Rule::class(CharClass::Digit));
    let close = b.add(Rule::literal(')'));
    let body = b.named("group body", Rule::sequence(vec![digit, close]));
    let start = b.add(Rule::if_must(open, body));
    let grammar = b.finish().unwrap();

    // Head fails: ordinary mismatch, no commitment yet.
    assert_eq!(apply_unit(&grammar, start, "5"), (false, 0));

    // Head matched: a body failure may not backtrack.
    let mut state = ();
    let mut silent = Silent;
    let mut matcher = Matcher::new(&grammar, "(x", &mut state, &mut silent);
    let error = matcher.apply(start, false).unwrap_err();
    assert!(matches!(error.kind, SyntaxErrorKind::Unmatched { .. }));
}

#[test]
fn enclosing_choice_does_not_fall_back_after_commit() {
    let mut b = GrammarBuilder::<()>::new();
    let open = b.add(Rule::literal('('));
    let digit = b.add(Rule::class(CharClass::Digit));
    let close = b.add(Rule::literal(')'));
    let body = b.add(Rule::sequence(vec![digit, close]));
    let group = b.add(Rule::if_must(open, body));
    // This alternative would match "(x" inputs if the choice were allowed
    // to retry after the commit point.
    let open_again = b.add(Rule::literal('('));
    let start = b.add(Rule::choice(vec![group, open_again]));
    let grammar = b.finish().unwrap();

    let mut state = ();
    let mut silent = Silent;
    let mut matcher = Matcher::new(&grammar, "(x", &mut state, &mut silent);
    assert!(matcher.apply(start, false).is_err());
}

#[test]
fn must_flag_propagates_through_sequence_elements() {
    // ifmust body is a sequence: its failing element reports the fatal.
    let mut b = GrammarBuilder::<()>::new();
    let colon = b.add(Rule::literal(':'));
    let digit = b.named("value digit", Rule::class(CharClass::Digit));
    let end = b.add(Rule::literal(';'));
    let body = b.add(Rule::sequence(vec![digit, end]));
    let start = b.add(Rule::if_must(colon, body));
    let grammar = b.finish().unwrap();

    let mut state = ();
    let mut silent = Silent;
    let mut matcher = Matcher::new(&grammar, ":x;", &mut state, &mut silent);
    let error = matcher.apply(start, false).unwrap_err();
    assert_eq!(error.rule(), "value digit");
}

// ---
// Builder
// ---

#[test]
fn undefined_declared_rule_is_a_build_error() {
    let mut b = GrammarBuilder::<()>::new();
    let _ = b.declare("never defined");
    assert!(matches!(
        b.finish(),
        Err(pegine::GrammarError::Undefined {
            name: "never defined"
        })
    ));
}

#[test]
fn display_name_prefers_explicit_names() {
    let mut b = GrammarBuilder::<()>::new();
    let lit = b.add(Rule::literal('('));
    let digit = b.add(Rule::class(CharClass::Digit));
    let named = b.named("operand", Rule::class(CharClass::Digit));
    let grammar = b.finish().unwrap();

    assert_eq!(grammar.display_name(lit), "'('");
    assert_eq!(grammar.display_name(digit), "digit");
    assert_eq!(grammar.display_name(named), "operand");
}

//! Command-line front end: evaluates each process argument as an arithmetic
//! expression and reports the result.

use clap::Parser;

use crate::{
    calc::{Calculator, Stack, Value},
    diagnostics::print_error,
    trace::Tracing,
};

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "pegine",
    version,
    about = "A backtracking PEG execution engine with an arithmetic calculator front end."
)]
pub struct PegineArgs {
    /// Arithmetic expressions to evaluate, one per argument.
    #[arg(required = true)]
    pub expressions: Vec<String>,

    /// Trace rule nesting and must-match failures to stderr.
    #[arg(long)]
    pub trace: bool,
}

/// The main entry point for the CLI.
///
/// Each expression gets a fresh cursor and stack; a failed expression does
/// not stop the remaining ones, and the exit code is always zero.
pub fn run() {
    let args = PegineArgs::parse();
    let calculator = Calculator::global();

    for expression in &args.expressions {
        let result = if args.trace {
            evaluate_traced(calculator, expression)
        } else {
            calculator.evaluate(expression)
        };
        match result {
            Some(value) => println!("input {expression} result {value}"),
            None => println!("input {expression} invalid"),
        }
    }
}

/// Evaluates one expression under the diagnostic strategy, rendering any
/// fatal error with full miette diagnostics before reporting it as invalid.
fn evaluate_traced(calculator: &Calculator, expression: &str) -> Option<Value> {
    let mut stack = Stack::new();
    let mut tracing = Tracing::to_stderr();
    match calculator.parse(expression, &mut stack, &mut tracing) {
        Ok(true) => stack.single(),
        Ok(false) => None,
        Err(error) => {
            print_error(error);
            None
        }
    }
}

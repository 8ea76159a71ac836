//! Input cursor: a read-only view over the input text plus the current
//! position in it.
//!
//! Positions are plain [`Location`] values, so saving one is a copy and
//! restoring one is an assignment. Backtracking combinators lean on that:
//! every rewind in the engine is a `location()` followed by a `restore()`.
//! Line and column are tracked on the way forward only; a `restore` simply
//! reinstates the numbers that were saved with the offset.

use std::fmt;

use crate::rules::CharClass;

/// A position in the input: byte offset plus 1-based line and column.
///
/// The column counts characters, not bytes, so multi-byte input reports
/// human positions while `offset` stays usable for slicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl Location {
    fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} column {}", self.line, self.column)
    }
}

/// The engine's view of the input during one parse attempt.
pub struct Cursor<'i> {
    input: &'i str,
    location: Location,
}

impl<'i> Cursor<'i> {
    pub fn new(input: &'i str) -> Self {
        Self {
            input,
            location: Location::start(),
        }
    }

    /// The current position. Copy it out to save a backtrack point.
    pub fn location(&self) -> Location {
        self.location
    }

    /// Rewinds (or fast-forwards) to a previously saved position.
    ///
    /// The saved location must come from this cursor; positions from other
    /// inputs would desynchronize offset and line accounting.
    pub fn restore(&mut self, saved: Location) {
        self.location = saved;
    }

    /// The character at the current position, without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.input[self.location.offset..].chars().next()
    }

    /// Consumes one character, keeping line and column accounting current.
    /// No-op at end of input.
    pub fn bump(&mut self) {
        let Some(c) = self.peek() else { return };
        self.location.offset += c.len_utf8();
        if c == '\n' {
            self.location.line += 1;
            self.location.column = 1;
        } else {
            self.location.column += 1;
        }
    }

    /// Consumes every consecutive character of `class` at the current
    /// position. Consuming zero characters is fine.
    pub fn skip_class(&mut self, class: CharClass) {
        while matches!(self.peek(), Some(c) if class.contains(c)) {
            self.bump();
        }
    }

    /// The input text between two saved positions.
    pub fn slice(&self, from: Location, to: Location) -> &'i str {
        &self.input[from.offset..to.offset]
    }

    pub fn at_end(&self) -> bool {
        self.location.offset == self.input.len()
    }
}

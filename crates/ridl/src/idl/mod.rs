// SPDX-License-Identifier: Apache-2.0 OR MIT

//! IDL text parsing.
//!
//! `.thrift`-style interface definitions are tokenized and parsed into
//! an unresolved syntax tree ([`ast::RawProgram`]): every type
//! reference is a bare name string. Resolution against other programs
//! happens later in the [`TypeLoader`](crate::loader::TypeLoader).
//! Parsing is pure; the only input is the source text itself.

pub mod ast;
mod lexer;
mod parser;

pub use lexer::{Token, TokenKind};
pub use parser::parse;

use std::fmt;

/// A malformed-IDL failure, with enough position info to render a
/// caret diagnostic pointing at the offending token.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    /// 1-based source line number.
    pub line: usize,
    /// 0-based column of the offending token.
    pub pos: usize,
    /// Token length in characters.
    pub len: usize,
    /// The raw source line, for the diagnostic.
    pub line_text: String,
}

impl ParseError {
    pub(crate) fn new(
        message: impl Into<String>,
        line: usize,
        pos: usize,
        len: usize,
        line_text: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            line,
            pos,
            len: len.max(1),
            line_text: line_text.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Error on line {}, pos {}: {}",
            self.line, self.pos, self.message
        )?;
        writeln!(f, "{}", self.line_text)?;
        write!(f, "{}^", "~".repeat(self.pos))
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caret_diagnostic_rendering() {
        let err = ParseError::new("expected field id", 3, 4, 6, "    struct {");
        let text = err.to_string();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Error on line 3, pos 4: expected field id")
        );
        assert_eq!(lines.next(), Some("    struct {"));
        assert_eq!(lines.next(), Some("~~~~^"));
    }
}

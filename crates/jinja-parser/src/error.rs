//! Error type for template parsing.

use source_map::Span;
use std::fmt;

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, SyntaxError>;

/// A syntax error in a template.
///
/// The first error aborts the compilation; there is no recovery and no
/// accumulation. Displayed as `(<line>:<column>) <message>`, pointing at the
/// first character of the offending token.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    /// The error message, without the position prefix.
    pub message: String,
    /// The span of the offending token.
    pub location: Span,
    /// The error code.
    pub code: SyntaxErrorCode,
}

impl SyntaxError {
    /// Create a new syntax error.
    pub fn new(message: impl Into<String>, location: Span, code: SyntaxErrorCode) -> Self {
        Self {
            message: message.into(),
            location,
            code,
        }
    }

    /// Create an unexpected token error.
    pub fn unexpected_token(expected: &str, found: &str, location: Span) -> Self {
        Self::new(
            format!("Expected {}, found {}", expected, found),
            location,
            SyntaxErrorCode::UnexpectedToken,
        )
    }

    /// Create an unexpected end of input error.
    pub fn unexpected_end(expected: &str, location: Span) -> Self {
        Self::new(
            format!("Expected {}, found end of input", expected),
            location,
            SyntaxErrorCode::UnexpectedEndOfInput,
        )
    }

    /// Create an unexpected keyword error.
    pub fn unexpected_keyword(keyword: &str, location: Span) -> Self {
        Self::new(
            format!("Unexpected '{}'", keyword),
            location,
            SyntaxErrorCode::UnexpectedKeyword,
        )
    }

    /// Create an unclosed block error.
    pub fn unclosed_block(keyword: &str, location: Span) -> Self {
        Self::new(
            format!("Unclosed '{}' block", keyword),
            location,
            SyntaxErrorCode::UnclosedBlock,
        )
    }

    /// Create a mismatched parenthesis error.
    pub fn mismatched_paren(location: Span) -> Self {
        Self::new(
            "Mismatched parenthesis",
            location,
            SyntaxErrorCode::MismatchedParen,
        )
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}:{}) {}",
            self.location.start.line, self.location.start.column, self.message
        )
    }
}

impl std::error::Error for SyntaxError {}

/// Error codes for categorizing syntax errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxErrorCode {
    /// Unexpected token encountered.
    UnexpectedToken,
    /// Input ended in the middle of a construct.
    UnexpectedEndOfInput,
    /// A keyword the current context cannot handle.
    UnexpectedKeyword,
    /// A block tag was never closed.
    UnclosedBlock,
    /// An opening or closing parenthesis without its partner.
    MismatchedParen,
    /// An operator without enough operands.
    StrayOperator,
    /// An expression left more than one value on the output stack.
    ExtraValue,
    /// A terminator arrived before any expression was read.
    ExpectedExpression,
    /// A macro default that is not a literal.
    InvalidDefault,
    /// A call to a macro with no definition in the template.
    UnknownMacro,
}

impl SyntaxErrorCode {
    /// Get the error code as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnexpectedToken => "unexpected-token",
            Self::UnexpectedEndOfInput => "unexpected-end-of-input",
            Self::UnexpectedKeyword => "unexpected-keyword",
            Self::UnclosedBlock => "unclosed-block",
            Self::MismatchedParen => "mismatched-paren",
            Self::StrayOperator => "stray-operator",
            Self::ExtraValue => "extra-value",
            Self::ExpectedExpression => "expected-expression",
            Self::InvalidDefault => "invalid-default",
            Self::UnknownMacro => "unknown-macro",
        }
    }
}

impl fmt::Display for SyntaxErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use source_map::Position;

    #[test]
    fn test_display_format() {
        let err = SyntaxError::unexpected_keyword(
            "endfor",
            Span::new(Position::new(12, 3, 4), Position::new(18, 3, 10)),
        );
        assert_eq!(err.to_string(), "(3:4) Unexpected 'endfor'");
    }
}

//! Tokens produced by the template lexer.

use smol_str::SmolStr;
use source_map::Span;
use std::fmt;

/// The closed set of multi-purpose symbols the lexer recognizes.
///
/// Longest match wins within a shared prefix, so `{%` is one symbol rather
/// than `{` followed by `%`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Symbol {
    /// `!`
    Bang,
    /// `!=`
    BangEq,
    /// `%`
    Percent,
    /// `%}`
    StatementClose,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `*`
    Star,
    /// `**`
    StarStar,
    /// `+`
    Plus,
    /// `,`
    Comma,
    /// `-`
    Minus,
    /// `.`
    Dot,
    /// `/`
    Slash,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `=`
    Eq,
    /// `==`
    EqEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `{`
    LBrace,
    /// `{%`
    StatementOpen,
    /// `{{`
    ExpressionOpen,
    /// `|`
    Pipe,
    /// `}`
    RBrace,
    /// `}}`
    ExpressionClose,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
}

impl Symbol {
    /// The lexeme for this symbol.
    pub fn as_str(&self) -> &'static str {
        match self {
            Symbol::Bang => "!",
            Symbol::BangEq => "!=",
            Symbol::Percent => "%",
            Symbol::StatementClose => "%}",
            Symbol::LParen => "(",
            Symbol::RParen => ")",
            Symbol::Star => "*",
            Symbol::StarStar => "**",
            Symbol::Plus => "+",
            Symbol::Comma => ",",
            Symbol::Minus => "-",
            Symbol::Dot => ".",
            Symbol::Slash => "/",
            Symbol::Lt => "<",
            Symbol::LtEq => "<=",
            Symbol::Eq => "=",
            Symbol::EqEq => "==",
            Symbol::Gt => ">",
            Symbol::GtEq => ">=",
            Symbol::LBrace => "{",
            Symbol::StatementOpen => "{%",
            Symbol::ExpressionOpen => "{{",
            Symbol::Pipe => "|",
            Symbol::RBrace => "}",
            Symbol::ExpressionClose => "}}",
            Symbol::LBracket => "[",
            Symbol::RBracket => "]",
        }
    }

    /// Check whether a character can start or continue a symbol.
    pub fn is_symbol_char(c: char) -> bool {
        matches!(
            c,
            '-' | '<'
                | '>'
                | ','
                | '.'
                | '/'
                | '{'
                | '}'
                | '['
                | ']'
                | '!'
                | '#'
                | '%'
                | '*'
                | '('
                | ')'
                | '+'
                | '='
                | '|'
        )
    }

    /// Resolve a two-character lexeme against the table.
    pub fn from_pair(a: char, b: char) -> Option<Symbol> {
        match (a, b) {
            ('!', '=') => Some(Symbol::BangEq),
            ('%', '}') => Some(Symbol::StatementClose),
            ('*', '*') => Some(Symbol::StarStar),
            ('<', '=') => Some(Symbol::LtEq),
            ('=', '=') => Some(Symbol::EqEq),
            ('>', '=') => Some(Symbol::GtEq),
            ('{', '%') => Some(Symbol::StatementOpen),
            ('{', '{') => Some(Symbol::ExpressionOpen),
            ('}', '}') => Some(Symbol::ExpressionClose),
            _ => None,
        }
    }

    /// Resolve a one-character lexeme against the table.
    pub fn from_char(c: char) -> Option<Symbol> {
        match c {
            '!' => Some(Symbol::Bang),
            '%' => Some(Symbol::Percent),
            '(' => Some(Symbol::LParen),
            ')' => Some(Symbol::RParen),
            '*' => Some(Symbol::Star),
            '+' => Some(Symbol::Plus),
            ',' => Some(Symbol::Comma),
            '-' => Some(Symbol::Minus),
            '.' => Some(Symbol::Dot),
            '/' => Some(Symbol::Slash),
            '<' => Some(Symbol::Lt),
            '=' => Some(Symbol::Eq),
            '>' => Some(Symbol::Gt),
            '{' => Some(Symbol::LBrace),
            '|' => Some(Symbol::Pipe),
            '}' => Some(Symbol::RBrace),
            '[' => Some(Symbol::LBracket),
            ']' => Some(Symbol::RBracket),
            _ => None,
        }
    }

    /// All symbols, for table round-trip checks.
    pub fn all() -> &'static [Symbol] {
        &[
            Symbol::Bang,
            Symbol::BangEq,
            Symbol::Percent,
            Symbol::StatementClose,
            Symbol::LParen,
            Symbol::RParen,
            Symbol::Star,
            Symbol::StarStar,
            Symbol::Plus,
            Symbol::Comma,
            Symbol::Minus,
            Symbol::Dot,
            Symbol::Slash,
            Symbol::Lt,
            Symbol::LtEq,
            Symbol::Eq,
            Symbol::EqEq,
            Symbol::Gt,
            Symbol::GtEq,
            Symbol::LBrace,
            Symbol::StatementOpen,
            Symbol::ExpressionOpen,
            Symbol::Pipe,
            Symbol::RBrace,
            Symbol::ExpressionClose,
            Symbol::LBracket,
            Symbol::RBracket,
        ]
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a token is.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenKind {
    /// A numeric literal.
    Number(f64),
    /// An identifier or keyword.
    Identifier(SmolStr),
    /// A string literal; the contents are decoded (escapes resolved).
    Str(String),
    /// A symbol from the fixed table.
    Symbol(Symbol),
    /// Any character the other rules do not claim.
    Character(char),
    /// End of input.
    EndOfStream,
}

/// A token with its source span.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    /// The token kind and payload.
    pub kind: TokenKind,
    /// Start of the first scanned character to just past the last.
    pub span: Span,
}

impl Token {
    /// Check if this token is a specific symbol.
    pub fn is_symbol(&self, symbol: Symbol) -> bool {
        matches!(self.kind, TokenKind::Symbol(s) if s == symbol)
    }

    /// Check if this token is a specific identifier.
    pub fn is_identifier(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Identifier(n) if n == name)
    }

    /// Check if this token is the end of the stream.
    pub fn is_eos(&self) -> bool {
        matches!(self.kind, TokenKind::EndOfStream)
    }

    /// A short description for error messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Number(v) => format!("number {}", v),
            TokenKind::Identifier(n) => format!("'{}'", n),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Symbol(s) => format!("'{}'", s.as_str()),
            TokenKind::Character(c) => format!("'{}'", c),
            TokenKind::EndOfStream => "end of input".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_resolution() {
        assert_eq!(Symbol::from_pair('{', '%'), Some(Symbol::StatementOpen));
        assert_eq!(Symbol::from_pair('*', '*'), Some(Symbol::StarStar));
        assert_eq!(Symbol::from_pair('*', '/'), None);
    }

    #[test]
    fn test_lexeme_round_trip() {
        for symbol in Symbol::all() {
            let lexeme = symbol.as_str();
            let mut chars = lexeme.chars();
            let a = chars.next().unwrap();
            let resolved = match chars.next() {
                Some(b) => Symbol::from_pair(a, b),
                None => Symbol::from_char(a),
            };
            assert_eq!(resolved, Some(*symbol), "lexeme {:?}", lexeme);
        }
    }

    #[test]
    fn test_hash_is_not_a_symbol() {
        assert!(Symbol::is_symbol_char('#'));
        assert_eq!(Symbol::from_char('#'), None);
    }
}

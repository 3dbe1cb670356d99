//! Streaming lexer for templates.
//!
//! One cursor serves both the top-level text scanner and the expression
//! parser; the `strings` flag decides whether quotes start string literals
//! or pass through as plain characters.

use crate::token::{Symbol, Token, TokenKind};
use source_map::{Position, Span};

/// A lexer over a template source.
pub struct Lexer<'a> {
    source: &'a str,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 0,
        }
    }

    /// The full source.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Check if at end of input.
    pub fn eos(&self) -> bool {
        self.offset >= self.source.len()
    }

    /// The current character, indexed by byte offset.
    pub fn chr(&self) -> Option<char> {
        self.source[self.offset..].chars().next()
    }

    /// The source slice between two byte offsets.
    pub fn substr(&self, start: u32, end: u32) -> &'a str {
        &self.source[start as usize..end as usize]
    }

    /// The current cursor position.
    pub fn position(&self) -> Position {
        Position::new(self.offset as u32, self.line, self.column)
    }

    /// Consume the current character.
    ///
    /// The line counter and column reset happen after the offset moves, as
    /// part of consuming the newline itself: the position just past a `\n`
    /// already sits on the following line at column 0, and so does the end
    /// position of any lexeme whose final character is a newline.
    fn bump(&mut self) -> Option<char> {
        let c = self.chr()?;
        self.offset += c.len_utf8();
        self.column += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        }
        Some(c)
    }

    /// Skip whitespace.
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.chr() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// The character after the current one, for two-character symbols.
    fn chr2(&self) -> Option<char> {
        let mut chars = self.source[self.offset..].chars();
        chars.next()?;
        chars.next()
    }

    /// Scan the next token.
    ///
    /// With `strings` set, `"` and `'` start string literals; without it they
    /// are plain characters (the top-level text scanner runs without it).
    pub fn next_token(&mut self, strings: bool) -> Token {
        self.skip_whitespace();
        let start = self.position();

        let Some(c) = self.chr() else {
            return Token {
                kind: TokenKind::EndOfStream,
                span: Span::empty(start),
            };
        };

        if c.is_ascii_digit() {
            return self.scan_number(start);
        }

        if c.is_ascii_alphanumeric() || c == '_' {
            return self.scan_identifier(start);
        }

        if strings && (c == '"' || c == '\'') {
            return self.scan_string(start, c);
        }

        if Symbol::is_symbol_char(c) {
            if let Some(token) = self.scan_symbol(start, c) {
                return token;
            }
        }

        self.bump();
        Token {
            kind: TokenKind::Character(c),
            span: Span::new(start, self.position()),
        }
    }

    /// Scan a number: digits, optionally `.` and more digits.
    fn scan_number(&mut self, start: Position) -> Token {
        while matches!(self.chr(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        if self.chr() == Some('.') {
            self.bump();
            while matches!(self.chr(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }
        let end = self.position();
        let lexeme = self.substr(start.offset, end.offset);
        // Digit runs with at most one dot always parse.
        let value = lexeme.parse::<f64>().unwrap_or(f64::NAN);
        Token {
            kind: TokenKind::Number(value),
            span: Span::new(start, end),
        }
    }

    /// Scan a maximal word run.
    fn scan_identifier(&mut self, start: Position) -> Token {
        while matches!(self.chr(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        let end = self.position();
        let name = self.substr(start.offset, end.offset);
        Token {
            kind: TokenKind::Identifier(name.into()),
            span: Span::new(start, end),
        }
    }

    /// Scan a string literal, decoding escapes.
    ///
    /// `\` escapes the next character; `\n`, `\t`, `\\`, `\"` and `\'`
    /// decode to their usual values, anything else to the character itself.
    /// An unterminated string consumes to the end of input without error.
    fn scan_string(&mut self, start: Position, quote: char) -> Token {
        self.bump();
        let mut value = String::new();
        while let Some(c) = self.chr() {
            if c == quote {
                self.bump();
                break;
            }
            if c == '\\' {
                self.bump();
                if let Some(escaped) = self.chr() {
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                    self.bump();
                }
            } else {
                self.bump();
                value.push(c);
            }
        }
        Token {
            kind: TokenKind::Str(value),
            span: Span::new(start, self.position()),
        }
    }

    /// Resolve the longest symbol at the cursor. A symbol-class character
    /// with no table entry (only `#`) falls back to the caller.
    fn scan_symbol(&mut self, start: Position, c: char) -> Option<Token> {
        let two = self.chr2().and_then(|next| Symbol::from_pair(c, next));
        let symbol = if let Some(symbol) = two {
            self.bump();
            self.bump();
            symbol
        } else if let Some(symbol) = Symbol::from_char(c) {
            self.bump();
            symbol
        } else {
            return None;
        };
        Some(Token {
            kind: TokenKind::Symbol(symbol),
            span: Span::new(start, self.position()),
        })
    }

    /// A lazy token sequence; ends after yielding `EndOfStream` once.
    pub fn tokens(self, strings: bool) -> Tokens<'a> {
        Tokens {
            lexer: self,
            strings,
            done: false,
        }
    }
}

/// Iterator over the tokens of a source.
pub struct Tokens<'a> {
    lexer: Lexer<'a>,
    strings: bool,
    done: bool,
}

impl Iterator for Tokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        let token = self.lexer.next_token(self.strings);
        if token.is_eos() {
            self.done = true;
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str, strings: bool) -> Vec<Token> {
        Lexer::new(source).tokens(strings).collect()
    }

    #[test]
    fn test_empty_source() {
        let tokens = lex_all("", true);
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_eos());
        assert_eq!(tokens[0].span.start, Position::origin());
    }

    #[test]
    fn test_number() {
        let tokens = lex_all("3.25", true);
        assert_eq!(tokens[0].kind, TokenKind::Number(3.25));
        assert_eq!(tokens[0].span.start.offset, 0);
        assert_eq!(tokens[0].span.end.offset, 4);
    }

    #[test]
    fn test_number_trailing_dot() {
        let tokens = lex_all("2.", true);
        assert_eq!(tokens[0].kind, TokenKind::Number(2.0));
    }

    #[test]
    fn test_identifier() {
        let tokens = lex_all("  some_name4 ", true);
        assert_eq!(tokens[0].kind, TokenKind::Identifier("some_name4".into()));
        assert_eq!(tokens[0].span.start.offset, 2);
        assert_eq!(tokens[0].span.end.offset, 12);
    }

    #[test]
    fn test_symbol_round_trip() {
        for symbol in Symbol::all() {
            let lexeme = symbol.as_str();
            let tokens = lex_all(lexeme, true);
            assert_eq!(
                tokens[0].kind,
                TokenKind::Symbol(*symbol),
                "lexeme {:?}",
                lexeme
            );
            assert_eq!(tokens[0].span.start.offset, 0);
            assert_eq!(tokens[0].span.end.offset, lexeme.len() as u32);
        }
    }

    #[test]
    fn test_longest_match() {
        let tokens = lex_all("{{%}}", true);
        assert_eq!(tokens[0].kind, TokenKind::Symbol(Symbol::ExpressionOpen));
        assert_eq!(tokens[1].kind, TokenKind::Symbol(Symbol::StatementClose));
        assert_eq!(tokens[2].kind, TokenKind::Symbol(Symbol::RBrace));
    }

    #[test]
    fn test_string_decoding() {
        let tokens = lex_all(r#""a\n\t\\\"b""#, true);
        assert_eq!(tokens[0].kind, TokenKind::Str("a\n\t\\\"b".to_string()));
    }

    #[test]
    fn test_string_span_includes_quotes() {
        let tokens = lex_all("'ab'", true);
        assert_eq!(tokens[0].span.start.offset, 0);
        assert_eq!(tokens[0].span.end.offset, 4);
    }

    #[test]
    fn test_unterminated_string_is_not_an_error() {
        let tokens = lex_all("'abc", true);
        assert_eq!(tokens[0].kind, TokenKind::Str("abc".to_string()));
        assert!(tokens[1].is_eos());
    }

    #[test]
    fn test_quotes_without_strings_flag() {
        let tokens = lex_all("'a'", false);
        assert_eq!(tokens[0].kind, TokenKind::Character('\''));
        assert_eq!(tokens[1].kind, TokenKind::Identifier("a".into()));
        assert_eq!(tokens[2].kind, TokenKind::Character('\''));
    }

    #[test]
    fn test_hash_is_a_character() {
        let tokens = lex_all("#", true);
        assert_eq!(tokens[0].kind, TokenKind::Character('#'));
    }

    #[test]
    fn test_line_tracking() {
        let mut lexer = Lexer::new("a\nbb");
        let a = lexer.next_token(true);
        assert_eq!(a.span.start, Position::new(0, 1, 0));
        assert_eq!(a.span.end, Position::new(1, 1, 1));
        let b = lexer.next_token(true);
        // The newline was consumed as whitespace; line advanced once and the
        // column restarted.
        assert_eq!(b.span.start, Position::new(2, 2, 0));
        assert_eq!(b.span.end, Position::new(4, 2, 2));
        assert!(lexer.next_token(true).is_eos());
    }

    #[test]
    fn test_line_increments_once_per_newline() {
        let mut lexer = Lexer::new("\n\nx");
        let x = lexer.next_token(true);
        assert_eq!(x.span.start, Position::new(2, 3, 0));
    }
}

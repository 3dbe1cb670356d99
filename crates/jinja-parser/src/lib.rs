//! Template parser.
//!
//! This crate turns Jinja-like template source into an AST: a streaming
//! lexer, a shunting-yard expression parser, and a context-stack statement
//! parser. Lowering into an executable form lives downstream; this crate
//! stops at the template AST.

pub mod ast;
pub mod error;
mod expr;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::*;
pub use error::{ParseResult, SyntaxError, SyntaxErrorCode};
pub use lexer::Lexer;
pub use parser::parse;
pub use token::{Symbol, Token, TokenKind};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_template() {
        let source = "Hello {{ name }}!{% for x in xs %} {{ x }}{% endfor %}";
        let template = parse(source).unwrap();
        assert_eq!(template.body.body.len(), 4);
    }

    #[test]
    fn test_parse_error_propagates() {
        let err = parse("{{ a + }}").unwrap_err();
        assert_eq!(err.code, SyntaxErrorCode::StrayOperator);
    }
}

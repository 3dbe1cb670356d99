//! Shunting-yard expression parser.
//!
//! Two stacks: `out` holds finished values, `stack` holds pending operators.
//! A call is recognized when `(` follows a value-producing token; a synthetic
//! call operator and an argument-list guard mark where the argument list
//! starts on the output stack.

use crate::ast::{
    BinOpExpr, BoolLit, CallExpr, Expr, FilterExpr, Ident, MemberExpr, NumberLit, Operator, StrLit,
};
use crate::error::{ParseResult, SyntaxError, SyntaxErrorCode};
use crate::parser::Parser;
use crate::token::{Symbol, Token, TokenKind};
use source_map::{Position, Span};

/// Precedence of the synthetic call operator.
const CALL_PRECEDENCE: u16 = 550;

/// Where expression parsing stops: a set of symbols, plus identifiers that
/// act as keywords in the surrounding statement (`if` inside a `for` head).
pub(crate) struct Terminators<'t> {
    pub symbols: &'t [Symbol],
    pub keywords: &'t [&'t str],
}

/// Parse one expression, stopping at (and consuming) a terminator token.
///
/// Returns the expression and the terminator that ended it.
pub(crate) fn parse_expression(
    parser: &mut Parser<'_>,
    terminators: &Terminators<'_>,
) -> ParseResult<(Expr, Token)> {
    let mut yard = Yard::new();
    loop {
        let token = parser.next_token(true);
        if is_terminator(&token, terminators) {
            let expr = yard.finish(&token)?;
            return Ok((expr, token));
        }
        yard.write(token)?;
    }
}

fn is_terminator(token: &Token, terminators: &Terminators<'_>) -> bool {
    match &token.kind {
        TokenKind::Symbol(s) => terminators.symbols.contains(s),
        TokenKind::Identifier(name) => terminators.keywords.iter().any(|k| name == k),
        _ => false,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
}

/// The operator table. Higher precedence binds tighter.
fn operator_precedence(symbol: Symbol) -> Option<(u16, Assoc)> {
    match symbol {
        Symbol::Eq => Some((100, Assoc::Left)),
        Symbol::Pipe => Some((50, Assoc::Left)),
        Symbol::BangEq
        | Symbol::EqEq
        | Symbol::Lt
        | Symbol::LtEq
        | Symbol::Gt
        | Symbol::GtEq => Some((200, Assoc::Left)),
        Symbol::Plus | Symbol::Minus => Some((300, Assoc::Left)),
        Symbol::Star | Symbol::Slash | Symbol::Percent => Some((400, Assoc::Left)),
        Symbol::StarStar => Some((500, Assoc::Right)),
        Symbol::Dot => Some((600, Assoc::Left)),
        _ => None,
    }
}

enum OutEntry {
    Value(Expr),
    /// Marks the bottom of a call's argument list.
    ArgGuard,
}

enum StackEntry {
    Op(Operator),
    /// The synthetic call operator; the span is the opening parenthesis.
    Call(Span),
    /// The `(` sentinel.
    Paren(Span),
}

struct Yard {
    out: Vec<OutEntry>,
    stack: Vec<StackEntry>,
    /// Whether the previous token could end a callee, so that a following
    /// `(` means application rather than grouping.
    callable: bool,
    /// End of the most recent `)`, used as the end of call spans.
    end: Option<Position>,
}

impl Yard {
    fn new() -> Self {
        Self {
            out: Vec::new(),
            stack: Vec::new(),
            callable: false,
            end: None,
        }
    }

    fn write(&mut self, token: Token) -> ParseResult<()> {
        let span = token.span;
        match token.kind {
            TokenKind::Number(value) => {
                self.out
                    .push(OutEntry::Value(Expr::Number(NumberLit { value, span })));
                self.callable = true;
            }
            TokenKind::Str(value) => {
                self.out
                    .push(OutEntry::Value(Expr::Str(StrLit { value, span })));
                self.callable = true;
            }
            TokenKind::Identifier(name) => {
                let expr = if name == "true" {
                    Expr::Boolean(BoolLit { value: true, span })
                } else if name == "false" {
                    Expr::Boolean(BoolLit { value: false, span })
                } else {
                    Expr::Variable(Ident { name, span })
                };
                self.out.push(OutEntry::Value(expr));
                self.callable = true;
            }
            TokenKind::Symbol(Symbol::LParen) => {
                if self.callable {
                    self.write_operator(StackEntry::Call(span), CALL_PRECEDENCE, Assoc::Left)?;
                    self.out.push(OutEntry::ArgGuard);
                }
                self.stack.push(StackEntry::Paren(span));
                self.callable = false;
            }
            TokenKind::Symbol(Symbol::RParen) => {
                self.end = Some(span.end);
                loop {
                    match self.stack.pop() {
                        Some(StackEntry::Paren(_)) => break,
                        Some(entry) => self.write_pop(entry)?,
                        None => return Err(SyntaxError::mismatched_paren(span)),
                    }
                }
                self.callable = true;
            }
            TokenKind::Symbol(Symbol::Comma) => {
                loop {
                    match self.stack.pop() {
                        Some(StackEntry::Paren(paren)) => {
                            self.stack.push(StackEntry::Paren(paren));
                            break;
                        }
                        Some(entry) => self.write_pop(entry)?,
                        None => return Err(SyntaxError::mismatched_paren(span)),
                    }
                }
                self.callable = false;
            }
            TokenKind::Symbol(symbol) => match operator_precedence(symbol) {
                Some((precedence, assoc)) => {
                    let op = Operator { symbol, span };
                    self.write_operator(StackEntry::Op(op), precedence, assoc)?;
                    self.callable = false;
                }
                None => {
                    return Err(SyntaxError::unexpected_token(
                        "an operator",
                        &format!("'{}'", symbol),
                        span,
                    ));
                }
            },
            TokenKind::Character(c) => {
                return Err(SyntaxError::unexpected_token(
                    "an expression",
                    &format!("'{}'", c),
                    span,
                ));
            }
            TokenKind::EndOfStream => {
                return Err(SyntaxError::unexpected_end("an expression", span));
            }
        }
        Ok(())
    }

    /// Pop every stacked operator that binds at least as tightly, then push.
    fn write_operator(
        &mut self,
        entry: StackEntry,
        precedence: u16,
        assoc: Assoc,
    ) -> ParseResult<()> {
        loop {
            let top = match self.stack.last() {
                Some(StackEntry::Op(op)) => {
                    operator_precedence(op.symbol).map_or(0, |(p, _)| p)
                }
                Some(StackEntry::Call(_)) => CALL_PRECEDENCE,
                Some(StackEntry::Paren(_)) | None => break,
            };
            if top > precedence || (top == precedence && assoc == Assoc::Left) {
                if let Some(popped) = self.stack.pop() {
                    self.write_pop(popped)?;
                }
            } else {
                break;
            }
        }
        self.stack.push(entry);
        Ok(())
    }

    /// Build the AST node for a popped operator.
    fn write_pop(&mut self, entry: StackEntry) -> ParseResult<()> {
        match entry {
            StackEntry::Paren(span) => Err(SyntaxError::mismatched_paren(span)),
            StackEntry::Op(op) if op.symbol == Symbol::Dot => {
                let property = self.pop_value(op.span)?;
                let object = self.pop_value(op.span)?;
                let span = Span::new(object.span().start, property.span().end);
                self.out.push(OutEntry::Value(Expr::Member(Box::new(MemberExpr {
                    object,
                    property,
                    span,
                }))));
                Ok(())
            }
            StackEntry::Op(op) if op.symbol == Symbol::Pipe => {
                let filter = self.pop_value(op.span)?;
                let value = self.pop_value(op.span)?;
                let span = Span::new(value.span().start, filter.span().end);
                self.out.push(OutEntry::Value(Expr::Filter(Box::new(FilterExpr {
                    value,
                    filter,
                    span,
                }))));
                Ok(())
            }
            StackEntry::Op(op) => {
                let right = self.pop_value(op.span)?;
                let left = self.pop_value(op.span)?;
                let span = Span::new(left.span().start, right.span().end);
                self.out.push(OutEntry::Value(Expr::BinOp(Box::new(BinOpExpr {
                    op,
                    left,
                    right,
                    span,
                }))));
                Ok(())
            }
            StackEntry::Call(call_span) => {
                let mut args = Vec::new();
                let function = loop {
                    match self.out.pop() {
                        Some(OutEntry::Value(value)) => args.push(value),
                        Some(OutEntry::ArgGuard) => match self.out.pop() {
                            Some(OutEntry::Value(function)) => break function,
                            _ => {
                                return Err(SyntaxError::new(
                                    "Call is missing its callee",
                                    call_span,
                                    SyntaxErrorCode::StrayOperator,
                                ));
                            }
                        },
                        None => return Err(SyntaxError::mismatched_paren(call_span)),
                    }
                };
                args.reverse();
                let end = self.end.unwrap_or(function.span().end);
                let span = Span::new(function.span().start, end);
                self.out.push(OutEntry::Value(Expr::FunctionCall(Box::new(CallExpr {
                    function,
                    args,
                    span,
                }))));
                Ok(())
            }
        }
    }

    fn pop_value(&mut self, at: Span) -> ParseResult<Expr> {
        match self.out.pop() {
            Some(OutEntry::Value(value)) => Ok(value),
            _ => Err(SyntaxError::new(
                "Operator is missing a value",
                at,
                SyntaxErrorCode::StrayOperator,
            )),
        }
    }

    /// Drain the stack and return the single remaining value.
    fn finish(mut self, terminator: &Token) -> ParseResult<Expr> {
        while let Some(entry) = self.stack.pop() {
            self.write_pop(entry)?;
        }
        match self.out.len() {
            0 => Err(SyntaxError::new(
                "Expected an expression",
                terminator.span,
                SyntaxErrorCode::ExpectedExpression,
            )),
            1 => match self.out.pop() {
                Some(OutEntry::Value(value)) => Ok(value),
                _ => Err(SyntaxError::mismatched_paren(terminator.span)),
            },
            _ => Err(SyntaxError::new(
                "Expression produced more than one value",
                terminator.span,
                SyntaxErrorCode::ExtraValue,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TERMS: Terminators<'static> = Terminators {
        symbols: &[Symbol::StatementClose],
        keywords: &[],
    };

    fn parse(source: &str) -> Expr {
        try_parse(source).unwrap()
    }

    fn try_parse(source: &str) -> ParseResult<Expr> {
        let source: &'static str = format!("{} %}}", source).leak();
        let mut parser = Parser::new(source);
        parse_expression(&mut parser, &TERMS).map(|(expr, _)| expr)
    }

    fn binop(expr: &Expr) -> &BinOpExpr {
        match expr {
            Expr::BinOp(op) => op,
            other => panic!("expected binop, got {:?}", other),
        }
    }

    #[test]
    fn test_variable() {
        match parse("var") {
            Expr::Variable(ident) => {
                assert_eq!(ident.name, "var");
                assert_eq!(ident.span.start.offset, 0);
                assert_eq!(ident.span.end.offset, 3);
            }
            other => panic!("expected variable, got {:?}", other),
        }
    }

    #[test]
    fn test_boolean_literals() {
        assert!(matches!(
            parse("true"),
            Expr::Boolean(BoolLit { value: true, .. })
        ));
        assert!(matches!(
            parse("false"),
            Expr::Boolean(BoolLit { value: false, .. })
        ));
    }

    #[test]
    fn test_lower_before_higher() {
        // x + y * z parses as x + (y * z)
        let expr = parse("x + y * z");
        let add = binop(&expr);
        assert_eq!(add.op.symbol, Symbol::Plus);
        assert!(matches!(add.left, Expr::Variable(_)));
        assert_eq!(binop(&add.right).op.symbol, Symbol::Star);
    }

    #[test]
    fn test_higher_before_lower() {
        // x * y + z parses as (x * y) + z
        let expr = parse("x * y + z");
        let add = binop(&expr);
        assert_eq!(add.op.symbol, Symbol::Plus);
        assert_eq!(binop(&add.left).op.symbol, Symbol::Star);
    }

    #[test]
    fn test_left_associativity() {
        // x - y - z parses as (x - y) - z
        let expr = parse("x - y - z");
        let outer = binop(&expr);
        assert!(matches!(outer.right, Expr::Variable(_)));
        assert_eq!(binop(&outer.left).op.symbol, Symbol::Minus);
    }

    #[test]
    fn test_right_associativity() {
        // x ** y ** z parses as x ** (y ** z)
        let expr = parse("x ** y ** z");
        let outer = binop(&expr);
        assert!(matches!(outer.left, Expr::Variable(_)));
        assert_eq!(binop(&outer.right).op.symbol, Symbol::StarStar);
    }

    #[test]
    fn test_parens_override_precedence() {
        let expr = parse("(x + y) * z");
        let mul = binop(&expr);
        assert_eq!(mul.op.symbol, Symbol::Star);
        assert_eq!(binop(&mul.left).op.symbol, Symbol::Plus);
    }

    #[test]
    fn test_whitespace_does_not_change_shape() {
        let tight = parse("x+y*z");
        let loose = parse("x  +  y  *  z");
        assert_eq!(binop(&tight).op.symbol, binop(&loose).op.symbol);
        assert_eq!(
            binop(&binop(&tight).right).op.symbol,
            binop(&binop(&loose).right).op.symbol
        );
    }

    #[test]
    fn test_member_access() {
        let expr = parse("a.b.c");
        // Left-nested: (a.b).c
        match expr {
            Expr::Member(outer) => {
                assert!(matches!(outer.property, Expr::Variable(ref p) if p.name == "c"));
                assert!(matches!(outer.object, Expr::Member(_)));
            }
            other => panic!("expected member, got {:?}", other),
        }
    }

    #[test]
    fn test_call_with_args() {
        let expr = parse("f(a, b + 1)");
        match expr {
            Expr::FunctionCall(call) => {
                assert!(matches!(call.function, Expr::Variable(ref f) if f.name == "f"));
                assert_eq!(call.args.len(), 2);
                assert!(matches!(call.args[0], Expr::Variable(_)));
                assert!(matches!(call.args[1], Expr::BinOp(_)));
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_method_call() {
        let expr = parse("d.items()");
        match expr {
            Expr::FunctionCall(call) => {
                assert!(call.args.is_empty());
                assert!(matches!(call.function, Expr::Member(_)));
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_chained_call() {
        let expr = parse("f()(x)");
        match expr {
            Expr::FunctionCall(outer) => {
                assert_eq!(outer.args.len(), 1);
                assert!(matches!(outer.function, Expr::FunctionCall(_)));
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_filter_pipe_binds_loosest() {
        let expr = parse("(a + b | f)");
        let filter = match expr {
            Expr::Filter(filter) => filter,
            other => panic!("expected filter, got {:?}", other),
        };
        assert!(matches!(filter.value, Expr::BinOp(_)));
        assert!(matches!(filter.filter, Expr::Variable(_)));
    }

    #[test]
    fn test_unbalanced_paren() {
        let err = try_parse("(a + b").unwrap_err();
        assert_eq!(err.code, SyntaxErrorCode::MismatchedParen);
        let err = try_parse("a + b)").unwrap_err();
        assert_eq!(err.code, SyntaxErrorCode::MismatchedParen);
    }

    #[test]
    fn test_two_values() {
        let err = try_parse("a b").unwrap_err();
        assert_eq!(err.code, SyntaxErrorCode::ExtraValue);
    }

    #[test]
    fn test_empty_expression() {
        let err = try_parse("").unwrap_err();
        assert_eq!(err.code, SyntaxErrorCode::ExpectedExpression);
    }

    #[test]
    fn test_stray_operator() {
        let err = try_parse("+ a").unwrap_err();
        assert_eq!(err.code, SyntaxErrorCode::StrayOperator);
    }
}

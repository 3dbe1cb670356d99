//! Parser for templates.
//!
//! A stateful parser driven by an explicit context stack: every block-opening
//! tag pushes a context, the matching closing tag pops it and attaches the
//! assembled subtree to its parent's body. Mid-keywords (`elif`, the two
//! `else` forms) rewrite the top context in place, which is why the stack is
//! explicit rather than recursion.

use crate::ast::*;
use crate::error::{ParseResult, SyntaxError, SyntaxErrorCode};
use crate::expr::{self, Terminators};
use crate::lexer::Lexer;
use crate::token::{Symbol, Token, TokenKind};
use indexmap::IndexMap;
use smol_str::SmolStr;
use source_map::{Position, Span};

/// Parse a template into an AST.
pub fn parse(source: &str) -> ParseResult<Template> {
    Parser::new(source).process()
}

const STATEMENT_END: Terminators<'static> = Terminators {
    symbols: &[Symbol::StatementClose],
    keywords: &[],
};

const PUT_VALUE_END: Terminators<'static> = Terminators {
    symbols: &[Symbol::Pipe, Symbol::ExpressionClose],
    keywords: &[],
};

const ITERABLE_END: Terminators<'static> = Terminators {
    symbols: &[Symbol::StatementClose],
    keywords: &["if"],
};

/// An open block awaiting its closing keyword.
struct Context {
    kind: ContextKind,
    /// Accumulates the placeables of the currently-filling body.
    body: Vec<Placeable>,
    /// Variables declared in this context's scope, when it owns one.
    vars: Vec<Ident>,
    /// Whether declarations land here or fall through to the parent.
    owns_scope: bool,
    /// Start of the opening tag.
    start: Position,
    /// Position just past the opening tag's `%}`.
    body_start: Position,
}

enum ContextKind {
    /// An `if` chain; `condition`/`arm_start` describe the in-progress arm.
    If {
        arms: Vec<Arm>,
        condition: Expr,
        arm_start: Position,
    },
    /// A `for` loop; `sealed_body` is set once `{% else %}` is seen, after
    /// which the accumulator collects the flat alternative.
    For {
        pattern: Pattern,
        iterable: Expr,
        filter: Option<Expr>,
        sealed_body: Option<Scope>,
    },
    Macro {
        name: Ident,
        args: Vec<Argument>,
    },
    Call {
        name: Ident,
        args: Vec<Expr>,
    },
    Filter {
        filter: Expr,
    },
    Block {
        name: Ident,
    },
}

impl ContextKind {
    /// The keyword that opened this context, for unclosed-block errors.
    fn keyword(&self) -> &'static str {
        match self {
            Self::If { .. } => "if",
            Self::For { .. } => "for",
            Self::Macro { .. } => "macro",
            Self::Call { .. } => "call",
            Self::Filter { .. } => "filter",
            Self::Block { .. } => "block",
        }
    }
}

/// The top-level scope being filled outside any open block.
struct RootScope {
    vars: Vec<Ident>,
    body: Vec<Placeable>,
}

pub(crate) struct Parser<'a> {
    lexer: Lexer<'a>,
    /// Pushback of peeked tokens; LIFO.
    pushback: Vec<Token>,
    stack: Vec<Context>,
    root: RootScope,
    blocks: IndexMap<SmolStr, Block>,
    macros: IndexMap<SmolStr, Macro>,
    extends: Option<Ident>,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
            pushback: Vec::new(),
            stack: Vec::new(),
            root: RootScope {
                vars: Vec::new(),
                body: Vec::new(),
            },
            blocks: IndexMap::new(),
            macros: IndexMap::new(),
            extends: None,
        }
    }

    // Token plumbing

    /// Get the next token, honoring the pushback stack.
    ///
    /// The `strings` flag only applies when the lexer actually scans; a token
    /// that was pushed back keeps whatever shape it was lexed with.
    pub(crate) fn next_token(&mut self, strings: bool) -> Token {
        match self.pushback.pop() {
            Some(token) => token,
            None => self.lexer.next_token(strings),
        }
    }

    fn putback(&mut self, token: Token) {
        self.pushback.push(token);
    }

    fn expect_identifier(&mut self, expected: &str) -> ParseResult<Ident> {
        let token = self.next_token(false);
        match token.kind {
            TokenKind::Identifier(name) => Ok(Ident {
                name,
                span: token.span,
            }),
            TokenKind::EndOfStream => Err(SyntaxError::unexpected_end(expected, token.span)),
            _ => Err(SyntaxError::unexpected_token(
                expected,
                &token.describe(),
                token.span,
            )),
        }
    }

    fn expect_symbol(&mut self, symbol: Symbol) -> ParseResult<Token> {
        let token = self.next_token(false);
        if token.is_symbol(symbol) {
            return Ok(token);
        }
        let expected = format!("'{}'", symbol);
        if token.is_eos() {
            Err(SyntaxError::unexpected_end(&expected, token.span))
        } else {
            Err(SyntaxError::unexpected_token(
                &expected,
                &token.describe(),
                token.span,
            ))
        }
    }

    fn parse_terminated(&mut self, terminators: &Terminators<'_>) -> ParseResult<(Expr, Token)> {
        expr::parse_expression(self, terminators)
    }

    // Tree plumbing

    fn push_placeable(&mut self, placeable: Placeable) {
        match self.stack.last_mut() {
            Some(context) => context.body.push(placeable),
            None => self.root.body.push(placeable),
        }
    }

    /// Record a declared variable in the nearest scope-owning frame.
    fn declare(&mut self, ident: Ident) {
        for context in self.stack.iter_mut().rev() {
            if context.owns_scope {
                if !context.vars.iter().any(|v| v.name == ident.name) {
                    context.vars.push(ident);
                }
                return;
            }
        }
        if !self.root.vars.iter().any(|v| v.name == ident.name) {
            self.root.vars.push(ident);
        }
    }

    // Driver

    /// Walk the source, copying text runs and dispatching on delimiters.
    fn process(mut self) -> ParseResult<Template> {
        let mut anchor = self.lexer.position();
        let eos = loop {
            let token = self.next_token(false);
            match token.kind {
                TokenKind::Symbol(Symbol::ExpressionOpen) => {
                    self.flush_text(anchor, token.span.start);
                    anchor = self.parse_put_value(token.span.start)?;
                }
                TokenKind::Symbol(Symbol::StatementOpen) => {
                    self.flush_text(anchor, token.span.start);
                    anchor = self.parse_statement(token.span.start)?;
                }
                TokenKind::EndOfStream => {
                    self.flush_text(anchor, token.span.start);
                    break token;
                }
                // Anything else is raw text; its content comes from the
                // source slice when the run is flushed.
                _ => {}
            }
        };

        if let Some(context) = self.stack.last() {
            return Err(SyntaxError::unclosed_block(
                context.kind.keyword(),
                eos.span,
            ));
        }

        let span = Span::new(Position::origin(), eos.span.end);
        Ok(Template {
            extends: self.extends,
            blocks: self.blocks,
            macros: self.macros,
            body: Scope {
                variables: self.root.vars,
                body: self.root.body,
                span,
            },
            span,
        })
    }

    /// Emit the raw text between two positions, if any.
    fn flush_text(&mut self, anchor: Position, upto: Position) {
        if upto.offset > anchor.offset {
            let text = self.lexer.substr(anchor.offset, upto.offset).to_string();
            self.push_placeable(Placeable::Text(Text {
                text,
                span: Span::new(anchor, upto),
            }));
        }
    }

    /// Parse `{{ expr (| filter)* }}`; the `{{` is already consumed.
    fn parse_put_value(&mut self, tag_start: Position) -> ParseResult<Position> {
        let (value, mut term) = self.parse_terminated(&PUT_VALUE_END)?;
        let mut filters = Vec::new();
        while term.is_symbol(Symbol::Pipe) {
            let (filter, next) = self.parse_terminated(&PUT_VALUE_END)?;
            filters.push(filter);
            term = next;
        }
        let span = Span::new(tag_start, term.span.end);
        self.push_placeable(Placeable::PutValue(PutValue {
            value,
            filters,
            span,
        }));
        Ok(term.span.end)
    }

    /// Parse `{% keyword … %}`; the `{%` is already consumed.
    ///
    /// Returns the position just past the closing `%}`, where text
    /// collection resumes.
    fn parse_statement(&mut self, tag_start: Position) -> ParseResult<Position> {
        let keyword = self.expect_identifier("a statement keyword")?;
        match keyword.name.as_str() {
            "if" => self.open_if(tag_start),
            "for" => self.open_for(tag_start),
            "block" => self.open_block(tag_start),
            "macro" => self.open_macro(tag_start),
            "call" => self.open_call(tag_start),
            "filter" => self.open_filter(tag_start),
            "set" => self.parse_set(tag_start),
            "extends" => self.parse_extends(),
            _ => self.dispatch_keyword(&keyword, tag_start),
        }
    }

    // Openers

    fn open_if(&mut self, tag_start: Position) -> ParseResult<Position> {
        let (condition, close) = self.parse_terminated(&STATEMENT_END)?;
        self.stack.push(Context {
            kind: ContextKind::If {
                arms: Vec::new(),
                condition,
                arm_start: tag_start,
            },
            body: Vec::new(),
            vars: Vec::new(),
            owns_scope: false,
            start: tag_start,
            body_start: close.span.end,
        });
        Ok(close.span.end)
    }

    fn open_for(&mut self, tag_start: Position) -> ParseResult<Position> {
        let pattern = self.parse_pattern()?;
        let in_token = self.next_token(false);
        if !in_token.is_identifier("in") {
            return Err(SyntaxError::unexpected_token(
                "'in'",
                &in_token.describe(),
                in_token.span,
            ));
        }
        let (iterable, mut close) = self.parse_terminated(&ITERABLE_END)?;
        let filter = if close.is_identifier("if") {
            let (filter, after) = self.parse_terminated(&STATEMENT_END)?;
            close = after;
            Some(filter)
        } else {
            None
        };
        let vars = pattern.names().to_vec();
        self.stack.push(Context {
            kind: ContextKind::For {
                pattern,
                iterable,
                filter,
                sealed_body: None,
            },
            body: Vec::new(),
            vars,
            owns_scope: true,
            start: tag_start,
            body_start: close.span.end,
        });
        Ok(close.span.end)
    }

    fn open_block(&mut self, tag_start: Position) -> ParseResult<Position> {
        let name = self.expect_identifier("a block name")?;
        let close = self.expect_symbol(Symbol::StatementClose)?;
        self.stack.push(Context {
            kind: ContextKind::Block { name },
            body: Vec::new(),
            vars: Vec::new(),
            owns_scope: true,
            start: tag_start,
            body_start: close.span.end,
        });
        Ok(close.span.end)
    }

    fn open_macro(&mut self, tag_start: Position) -> ParseResult<Position> {
        let name = self.expect_identifier("a macro name")?;
        self.expect_symbol(Symbol::LParen)?;
        let args = self.parse_macro_args()?;
        let close = self.expect_symbol(Symbol::StatementClose)?;
        let vars = args.iter().map(|a| a.name.clone()).collect();
        self.stack.push(Context {
            kind: ContextKind::Macro { name, args },
            body: Vec::new(),
            vars,
            owns_scope: true,
            start: tag_start,
            body_start: close.span.end,
        });
        Ok(close.span.end)
    }

    /// Parse `name (= literal)?, …` up to and including the `)`.
    fn parse_macro_args(&mut self) -> ParseResult<Vec<Argument>> {
        let mut args = Vec::new();
        let mut token = self.next_token(false);
        if token.is_symbol(Symbol::RParen) {
            return Ok(args);
        }
        loop {
            let name = match token.kind {
                TokenKind::Identifier(name) => Ident {
                    name,
                    span: token.span,
                },
                TokenKind::EndOfStream => {
                    return Err(SyntaxError::unexpected_end("an argument name", token.span));
                }
                _ => {
                    return Err(SyntaxError::unexpected_token(
                        "an argument name",
                        &token.describe(),
                        token.span,
                    ));
                }
            };
            let mut next = self.next_token(true);
            let default = if next.is_symbol(Symbol::Eq) {
                let literal = self.parse_literal()?;
                next = self.next_token(false);
                Some(literal)
            } else {
                None
            };
            let end = default
                .as_ref()
                .map_or(name.span.end, |literal| literal.span().end);
            args.push(Argument {
                span: Span::new(name.span.start, end),
                name,
                default,
            });
            if next.is_symbol(Symbol::Comma) {
                token = self.next_token(false);
            } else if next.is_symbol(Symbol::RParen) {
                return Ok(args);
            } else {
                return Err(SyntaxError::unexpected_token(
                    "',' or ')'",
                    &next.describe(),
                    next.span,
                ));
            }
        }
    }

    /// Parse a literal macro default: number, string, or boolean.
    fn parse_literal(&mut self) -> ParseResult<Expr> {
        let token = self.next_token(true);
        let span = token.span;
        match token.kind {
            TokenKind::Number(value) => Ok(Expr::Number(NumberLit { value, span })),
            TokenKind::Str(value) => Ok(Expr::Str(StrLit { value, span })),
            TokenKind::Identifier(name) if name == "true" => {
                Ok(Expr::Boolean(BoolLit { value: true, span }))
            }
            TokenKind::Identifier(name) if name == "false" => {
                Ok(Expr::Boolean(BoolLit { value: false, span }))
            }
            _ => Err(SyntaxError::new(
                "Macro defaults must be literals",
                span,
                SyntaxErrorCode::InvalidDefault,
            )),
        }
    }

    fn open_call(&mut self, tag_start: Position) -> ParseResult<Position> {
        let (invocation, close) = self.parse_terminated(&STATEMENT_END)?;
        let (name, args) = match invocation {
            Expr::FunctionCall(call) => {
                let call = *call;
                match call.function {
                    Expr::Variable(name) => (name, call.args),
                    other => {
                        return Err(SyntaxError::unexpected_token(
                            "a macro name",
                            "an expression",
                            other.span(),
                        ));
                    }
                }
            }
            other => {
                return Err(SyntaxError::unexpected_token(
                    "a macro invocation",
                    "an expression",
                    other.span(),
                ));
            }
        };
        self.stack.push(Context {
            kind: ContextKind::Call { name, args },
            body: Vec::new(),
            vars: Vec::new(),
            owns_scope: true,
            start: tag_start,
            body_start: close.span.end,
        });
        Ok(close.span.end)
    }

    fn open_filter(&mut self, tag_start: Position) -> ParseResult<Position> {
        let (filter, close) = self.parse_terminated(&STATEMENT_END)?;
        self.stack.push(Context {
            kind: ContextKind::Filter { filter },
            body: Vec::new(),
            vars: Vec::new(),
            owns_scope: true,
            start: tag_start,
            body_start: close.span.end,
        });
        Ok(close.span.end)
    }

    fn parse_set(&mut self, tag_start: Position) -> ParseResult<Position> {
        let pattern = self.parse_pattern()?;
        self.expect_symbol(Symbol::Eq)?;
        let (value, close) = self.parse_terminated(&STATEMENT_END)?;
        for name in pattern.names() {
            self.declare(name.clone());
        }
        self.push_placeable(Placeable::Assign(Assign {
            pattern,
            value,
            span: Span::new(tag_start, close.span.end),
        }));
        Ok(close.span.end)
    }

    fn parse_extends(&mut self) -> ParseResult<Position> {
        let name = self.expect_identifier("a template name")?;
        let close = self.expect_symbol(Symbol::StatementClose)?;
        self.extends = Some(name);
        Ok(close.span.end)
    }

    /// Parse one or more comma-separated names.
    fn parse_pattern(&mut self) -> ParseResult<Pattern> {
        let mut names = vec![self.expect_identifier("a name")?];
        loop {
            let token = self.next_token(false);
            if token.is_symbol(Symbol::Comma) {
                names.push(self.expect_identifier("a name")?);
            } else {
                self.putback(token);
                break;
            }
        }
        if names.len() == 1 {
            Ok(Pattern::Variable(names.remove(0)))
        } else {
            let span = Span::new(names[0].span.start, names[names.len() - 1].span.end);
            Ok(Pattern::Unpack(Unpack { names, span }))
        }
    }

    // Mid and closing keywords

    fn dispatch_keyword(&mut self, keyword: &Ident, tag_start: Position) -> ParseResult<Position> {
        match keyword.name.as_str() {
            "elif" => self.handle_elif(keyword, tag_start),
            "else" => self.handle_else(keyword, tag_start),
            "endif" => self.close_if(keyword, tag_start),
            "endfor" => self.close_for(keyword, tag_start),
            "endmacro" => self.close_macro(keyword, tag_start),
            "endcall" => self.close_call(keyword, tag_start),
            "endfilter" => self.close_filter(keyword, tag_start),
            "endblock" => self.close_block(keyword, tag_start),
            _ => Err(SyntaxError::unexpected_keyword(&keyword.name, keyword.span)),
        }
    }

    /// Seal the in-progress `if` arm, ending it at `tag_start`.
    fn seal_arm(&mut self, keyword: &Ident, tag_start: Position) -> ParseResult<()> {
        let Some(context) = self.stack.last_mut() else {
            return Err(SyntaxError::unexpected_keyword(&keyword.name, keyword.span));
        };
        let ContextKind::If {
            arms,
            condition,
            arm_start,
        } = &mut context.kind
        else {
            return Err(SyntaxError::unexpected_keyword(&keyword.name, keyword.span));
        };
        let body = std::mem::take(&mut context.body);
        arms.push(Arm {
            condition: condition.clone(),
            body,
            span: Span::new(*arm_start, tag_start),
        });
        Ok(())
    }

    fn handle_elif(&mut self, keyword: &Ident, tag_start: Position) -> ParseResult<Position> {
        self.seal_arm(keyword, tag_start)?;
        let (new_condition, close) = self.parse_terminated(&STATEMENT_END)?;
        if let Some(Context {
            kind:
                ContextKind::If {
                    condition,
                    arm_start,
                    ..
                },
            ..
        }) = self.stack.last_mut()
        {
            *condition = new_condition;
            *arm_start = tag_start;
        }
        Ok(close.span.end)
    }

    fn handle_else(&mut self, keyword: &Ident, tag_start: Position) -> ParseResult<Position> {
        enum Target {
            IfArm,
            ForAlternative,
        }
        let target = match self.stack.last() {
            Some(Context {
                kind: ContextKind::If { .. },
                ..
            }) => Target::IfArm,
            Some(Context {
                kind: ContextKind::For { sealed_body, .. },
                ..
            }) if sealed_body.is_none() => Target::ForAlternative,
            _ => return Err(SyntaxError::unexpected_keyword(&keyword.name, keyword.span)),
        };
        match target {
            Target::IfArm => {
                self.seal_arm(keyword, tag_start)?;
                let close = self.expect_symbol(Symbol::StatementClose)?;
                if let Some(Context {
                    kind:
                        ContextKind::If {
                            condition,
                            arm_start,
                            ..
                        },
                    ..
                }) = self.stack.last_mut()
                {
                    // The else arm is an always-true condition with a
                    // zero-width span at the tag's `%}`.
                    *condition = Expr::Boolean(BoolLit {
                        value: true,
                        span: Span::empty(close.span.start),
                    });
                    *arm_start = tag_start;
                }
                Ok(close.span.end)
            }
            Target::ForAlternative => {
                let close = self.expect_symbol(Symbol::StatementClose)?;
                if let Some(context) = self.stack.last_mut() {
                    let vars = std::mem::take(&mut context.vars);
                    let body = std::mem::take(&mut context.body);
                    if let ContextKind::For { sealed_body, .. } = &mut context.kind {
                        *sealed_body = Some(Scope {
                            variables: vars,
                            body,
                            span: Span::new(context.body_start, tag_start),
                        });
                    }
                    // The alternative is a flat list: declarations fall
                    // through to the parent scope from here on.
                    context.owns_scope = false;
                }
                Ok(close.span.end)
            }
        }
    }

    fn close_if(&mut self, keyword: &Ident, tag_start: Position) -> ParseResult<Position> {
        self.seal_arm(keyword, tag_start)?;
        let close = self.expect_symbol(Symbol::StatementClose)?;
        let Some(context) = self.stack.pop() else {
            return Err(SyntaxError::unexpected_keyword(&keyword.name, keyword.span));
        };
        let ContextKind::If { arms, .. } = context.kind else {
            return Err(SyntaxError::unexpected_keyword(&keyword.name, keyword.span));
        };
        self.push_placeable(Placeable::Case(CaseStatement {
            arms,
            span: Span::new(context.start, close.span.end),
        }));
        Ok(close.span.end)
    }

    fn close_for(&mut self, keyword: &Ident, tag_start: Position) -> ParseResult<Position> {
        if !matches!(
            self.stack.last(),
            Some(Context {
                kind: ContextKind::For { .. },
                ..
            })
        ) {
            return Err(SyntaxError::unexpected_keyword(&keyword.name, keyword.span));
        }
        let close = self.expect_symbol(Symbol::StatementClose)?;
        let Some(context) = self.stack.pop() else {
            return Err(SyntaxError::unexpected_keyword(&keyword.name, keyword.span));
        };
        let ContextKind::For {
            pattern,
            iterable,
            filter,
            sealed_body,
        } = context.kind
        else {
            return Err(SyntaxError::unexpected_keyword(&keyword.name, keyword.span));
        };
        let (body, alternative) = match sealed_body {
            Some(scope) => (scope, Some(context.body)),
            None => (
                Scope {
                    variables: context.vars,
                    body: context.body,
                    span: Span::new(context.body_start, tag_start),
                },
                None,
            ),
        };
        self.push_placeable(Placeable::For(Box::new(ForLoop {
            pattern,
            iterable,
            filter,
            body,
            alternative,
            span: Span::new(context.start, close.span.end),
        })));
        Ok(close.span.end)
    }

    /// Pop a scope-owning context, sealing its body into a `Scope`.
    fn pop_scope(
        &mut self,
        keyword: &Ident,
        tag_start: Position,
        close_end: Position,
    ) -> ParseResult<(ContextKind, Scope, Span)> {
        let Some(context) = self.stack.pop() else {
            return Err(SyntaxError::unexpected_keyword(&keyword.name, keyword.span));
        };
        let scope = Scope {
            variables: context.vars,
            body: context.body,
            span: Span::new(context.body_start, tag_start),
        };
        Ok((context.kind, scope, Span::new(context.start, close_end)))
    }

    fn close_macro(&mut self, keyword: &Ident, tag_start: Position) -> ParseResult<Position> {
        if !matches!(
            self.stack.last(),
            Some(Context {
                kind: ContextKind::Macro { .. },
                ..
            })
        ) {
            return Err(SyntaxError::unexpected_keyword(&keyword.name, keyword.span));
        }
        let close = self.expect_symbol(Symbol::StatementClose)?;
        let (kind, body, span) = self.pop_scope(keyword, tag_start, close.span.end)?;
        if let ContextKind::Macro { name, args } = kind {
            // Last definition wins.
            self.macros.insert(
                name.name.clone(),
                Macro {
                    name,
                    args,
                    body,
                    span,
                },
            );
        }
        Ok(close.span.end)
    }

    fn close_call(&mut self, keyword: &Ident, tag_start: Position) -> ParseResult<Position> {
        if !matches!(
            self.stack.last(),
            Some(Context {
                kind: ContextKind::Call { .. },
                ..
            })
        ) {
            return Err(SyntaxError::unexpected_keyword(&keyword.name, keyword.span));
        }
        let close = self.expect_symbol(Symbol::StatementClose)?;
        let (kind, body, span) = self.pop_scope(keyword, tag_start, close.span.end)?;
        if let ContextKind::Call { name, args } = kind {
            self.push_placeable(Placeable::MacroCall(MacroCall {
                macro_name: name,
                args,
                caller: Some(body),
                span,
            }));
        }
        Ok(close.span.end)
    }

    fn close_filter(&mut self, keyword: &Ident, tag_start: Position) -> ParseResult<Position> {
        if !matches!(
            self.stack.last(),
            Some(Context {
                kind: ContextKind::Filter { .. },
                ..
            })
        ) {
            return Err(SyntaxError::unexpected_keyword(&keyword.name, keyword.span));
        }
        let close = self.expect_symbol(Symbol::StatementClose)?;
        let (kind, body, span) = self.pop_scope(keyword, tag_start, close.span.end)?;
        if let ContextKind::Filter { filter } = kind {
            self.push_placeable(Placeable::Filter(FilterBlock { filter, body, span }));
        }
        Ok(close.span.end)
    }

    fn close_block(&mut self, keyword: &Ident, tag_start: Position) -> ParseResult<Position> {
        if !matches!(
            self.stack.last(),
            Some(Context {
                kind: ContextKind::Block { .. },
                ..
            })
        ) {
            return Err(SyntaxError::unexpected_keyword(&keyword.name, keyword.span));
        }
        let close = self.expect_symbol(Symbol::StatementClose)?;
        let (kind, body, span) = self.pop_scope(keyword, tag_start, close.span.end)?;
        if let ContextKind::Block { name } = kind {
            // The definition goes into the table (last one wins); the render
            // site gets a by-name reference.
            self.push_placeable(Placeable::CallBlock(CallBlock {
                name: name.clone(),
                span,
            }));
            self.blocks.insert(name.name.clone(), Block { name, body, span });
        }
        Ok(close.span.end)
    }
}

//! AST types for parsed templates.
//!
//! All values are immutable after parsing. Every node carries the span of its
//! lexical extent: `start` points at the first character of the construct,
//! `end` at the first character after it.

use crate::token::Symbol;
use indexmap::IndexMap;
use smol_str::SmolStr;
use source_map::Span;

/// The root of a parsed template.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Template {
    /// Parent template named by `{% extends %}`, if any.
    pub extends: Option<Ident>,
    /// Block definitions, keyed by name; last definition wins.
    pub blocks: IndexMap<SmolStr, Block>,
    /// Macro definitions, keyed by name; last definition wins.
    pub macros: IndexMap<SmolStr, Macro>,
    /// The top-level scope.
    pub body: Scope,
    /// Span of the whole source.
    pub span: Span,
}

/// A body with its own variable binding frame.
///
/// A scope lists the variables declared inside it (`set` targets, loop
/// patterns, macro arguments); bodies without a frame of their own are plain
/// `Vec<Placeable>` lists.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scope {
    /// Variables declared in this scope.
    pub variables: Vec<Ident>,
    /// The scope contents.
    pub body: Vec<Placeable>,
    /// Source span of the scope contents.
    pub span: Span,
}

/// Anything that can appear in a scope body.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Placeable {
    /// Raw text copied through to the output.
    Text(Text),
    /// A `{{ … }}` value emission.
    PutValue(PutValue),
    /// An `if`/`elif`/`else` chain.
    Case(CaseStatement),
    /// A `for` loop.
    For(Box<ForLoop>),
    /// A `{% call %}` macro invocation.
    MacroCall(MacroCall),
    /// The render site of a block definition.
    CallBlock(CallBlock),
    /// A `{% filter %}` body.
    Filter(FilterBlock),
    /// A `{% set %}` assignment.
    Assign(Assign),
}

impl Placeable {
    /// Get the span of this node.
    pub fn span(&self) -> Span {
        match self {
            Self::Text(n) => n.span,
            Self::PutValue(n) => n.span,
            Self::Case(n) => n.span,
            Self::For(n) => n.span,
            Self::MacroCall(n) => n.span,
            Self::CallBlock(n) => n.span,
            Self::Filter(n) => n.span,
            Self::Assign(n) => n.span,
        }
    }
}

/// A run of raw template text.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Text {
    /// The text content, verbatim from the source.
    pub text: String,
    /// Source span.
    pub span: Span,
}

/// A `{{ value | filter | … }}` emission.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PutValue {
    /// The emitted value.
    pub value: Expr,
    /// Filters applied left to right.
    pub filters: Vec<Expr>,
    /// Source span, including the delimiters.
    pub span: Span,
}

/// An `if`/`elif`/`else` chain. Arms are tested in order; an `else` arm is an
/// arm whose condition is a `true` literal with a zero-width span at the `%}`
/// of the `{% else %}` tag.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CaseStatement {
    /// The arms; never empty.
    pub arms: Vec<Arm>,
    /// Source span.
    pub span: Span,
}

/// One arm of a case statement.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Arm {
    /// The arm condition.
    pub condition: Expr,
    /// The arm body. Arms share the enclosing scope.
    pub body: Vec<Placeable>,
    /// Source span.
    pub span: Span,
}

/// A `{% for pattern in iterable %}` loop.
///
/// The body is a scope of its own; the `{% else %}` alternative is a flat
/// list that stays in the enclosing frame.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForLoop {
    /// The loop pattern.
    pub pattern: Pattern,
    /// The iterated expression.
    pub iterable: Expr,
    /// Optional `if` filter on iterations.
    pub filter: Option<Expr>,
    /// The loop body.
    pub body: Scope,
    /// Rendered when the iterable produced no iterations.
    pub alternative: Option<Vec<Placeable>>,
    /// Source span.
    pub span: Span,
}

/// A `{% macro name(args…) %}` definition.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Macro {
    /// The macro name.
    pub name: Ident,
    /// Declared arguments.
    pub args: Vec<Argument>,
    /// The macro body.
    pub body: Scope,
    /// Source span.
    pub span: Span,
}

/// One declared macro argument.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Argument {
    /// The argument name.
    pub name: Ident,
    /// Default value; restricted to number, string, or boolean literals.
    pub default: Option<Expr>,
    /// Source span.
    pub span: Span,
}

/// A `{% call name(args…) %}` invocation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MacroCall {
    /// The invoked macro, by name.
    pub macro_name: Ident,
    /// Positional arguments.
    pub args: Vec<Expr>,
    /// The call body, made available to the macro as its caller.
    pub caller: Option<Scope>,
    /// Source span.
    pub span: Span,
}

/// The render site of a block. Definitions live in `Template.blocks`; this
/// node only holds the name.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallBlock {
    /// The referenced block name.
    pub name: Ident,
    /// Source span.
    pub span: Span,
}

/// A `{% block name %}` definition.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Block {
    /// The block name.
    pub name: Ident,
    /// The block body.
    pub body: Scope,
    /// Source span.
    pub span: Span,
}

/// A `{% filter expr %}` body.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterBlock {
    /// The filter expression applied to the rendered body.
    pub filter: Expr,
    /// The filtered body.
    pub body: Scope,
    /// Source span.
    pub span: Span,
}

/// A `{% set pattern = value %}` assignment.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Assign {
    /// The assignment target.
    pub pattern: Pattern,
    /// The assigned value.
    pub value: Expr,
    /// Source span.
    pub span: Span,
}

/// An assignment or loop target: one identifier, or a comma list.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Pattern {
    /// A single name.
    Variable(Ident),
    /// Two or more names unpacked positionally.
    Unpack(Unpack),
}

impl Pattern {
    /// Get the span of this pattern.
    pub fn span(&self) -> Span {
        match self {
            Self::Variable(n) => n.span,
            Self::Unpack(n) => n.span,
        }
    }

    /// The names bound by this pattern, in order.
    pub fn names(&self) -> &[Ident] {
        match self {
            Self::Variable(n) => std::slice::from_ref(n),
            Self::Unpack(n) => &n.names,
        }
    }
}

/// A comma-separated unpacking target.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Unpack {
    /// The bound names.
    pub names: Vec<Ident>,
    /// Source span.
    pub span: Span,
}

/// An identifier with its span.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ident {
    /// The identifier text.
    pub name: SmolStr,
    /// Source span.
    pub span: Span,
}

/// An expression.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expr {
    /// A context variable reference.
    Variable(Ident),
    /// A numeric literal.
    Number(NumberLit),
    /// A string literal (contents decoded).
    Str(StrLit),
    /// A boolean literal.
    Boolean(BoolLit),
    /// A binary operation.
    BinOp(Box<BinOpExpr>),
    /// A member access.
    Member(Box<MemberExpr>),
    /// A function call.
    FunctionCall(Box<CallExpr>),
    /// A `value | filter` application.
    Filter(Box<FilterExpr>),
}

impl Expr {
    /// Get the span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Self::Variable(n) => n.span,
            Self::Number(n) => n.span,
            Self::Str(n) => n.span,
            Self::Boolean(n) => n.span,
            Self::BinOp(n) => n.span,
            Self::Member(n) => n.span,
            Self::FunctionCall(n) => n.span,
            Self::Filter(n) => n.span,
        }
    }

    /// Check whether this expression is a literal (number, string, boolean).
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Number(_) | Self::Str(_) | Self::Boolean(_))
    }
}

/// A numeric literal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NumberLit {
    /// The numeric value.
    pub value: f64,
    /// Source span.
    pub span: Span,
}

/// A string literal with decoded contents.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StrLit {
    /// The decoded contents, without the quotes.
    pub value: String,
    /// Source span, including the quotes.
    pub span: Span,
}

/// A boolean literal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoolLit {
    /// The boolean value.
    pub value: bool,
    /// Source span; zero-width for the synthesized `else` condition.
    pub span: Span,
}

/// An operator with its span.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Operator {
    /// The operator symbol.
    pub symbol: Symbol,
    /// Source span.
    pub span: Span,
}

/// A binary operation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinOpExpr {
    /// The operator.
    pub op: Operator,
    /// Left operand.
    pub left: Expr,
    /// Right operand.
    pub right: Expr,
    /// Source span.
    pub span: Span,
}

/// A member access, `object.property`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemberExpr {
    /// The accessed object.
    pub object: Expr,
    /// The property; an identifier in the common case.
    pub property: Expr,
    /// Source span.
    pub span: Span,
}

/// A function call.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallExpr {
    /// The called expression.
    pub function: Expr,
    /// Call arguments, in order.
    pub args: Vec<Expr>,
    /// Source span, through the closing parenthesis.
    pub span: Span,
}

/// A `value | filter` application inside an expression.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterExpr {
    /// The filtered value.
    pub value: Expr,
    /// The filter expression.
    pub filter: Expr,
    /// Source span.
    pub span: Span,
}

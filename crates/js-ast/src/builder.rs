//! Construction helpers for the syntax tree.
//!
//! Shorthands for the node shapes the lowerer builds constantly. All nodes
//! start without a location; callers attach one with `Expr::with_loc` where a
//! template span is known.

use crate::ast::*;
use smol_str::SmolStr;

/// An identifier expression.
pub fn ident(name: impl Into<SmolStr>) -> Expr {
    Expr::Identifier(Identifier {
        name: name.into(),
        loc: None,
    })
}

/// An identifier pattern, for parameter lists and declarators.
pub fn ident_pat(name: impl Into<SmolStr>) -> Pat {
    Pat::Identifier(Identifier {
        name: name.into(),
        loc: None,
    })
}

/// A string literal.
pub fn str_lit(value: impl Into<String>) -> Expr {
    Expr::Literal(Literal {
        value: LiteralValue::String(value.into()),
        loc: None,
    })
}

/// A number literal.
pub fn num_lit(value: f64) -> Expr {
    Expr::Literal(Literal {
        value: LiteralValue::Number(value),
        loc: None,
    })
}

/// A boolean literal.
pub fn bool_lit(value: bool) -> Expr {
    Expr::Literal(Literal {
        value: LiteralValue::Boolean(value),
        loc: None,
    })
}

/// The `null` literal.
pub fn null_lit() -> Expr {
    Expr::Literal(Literal {
        value: LiteralValue::Null,
        loc: None,
    })
}

/// A call expression.
pub fn call(callee: Expr, arguments: Vec<Expr>) -> Expr {
    Expr::CallExpression(Box::new(CallExpression {
        callee,
        arguments,
        loc: None,
    }))
}

/// A non-computed member access, `object.name`.
pub fn member(object: Expr, property: impl Into<SmolStr>) -> Expr {
    Expr::MemberExpression(Box::new(MemberExpression {
        object,
        property: ident(property),
        computed: false,
        loc: None,
    }))
}

/// A computed member access, `object[property]`.
pub fn member_computed(object: Expr, property: Expr) -> Expr {
    Expr::MemberExpression(Box::new(MemberExpression {
        object,
        property,
        computed: true,
        loc: None,
    }))
}

/// A binary expression.
pub fn binary(operator: impl Into<SmolStr>, left: Expr, right: Expr) -> Expr {
    Expr::BinaryExpression(Box::new(BinaryExpression {
        operator: operator.into(),
        left,
        right,
        loc: None,
    }))
}

/// A prefix unary expression.
pub fn unary(operator: impl Into<SmolStr>, argument: Expr) -> Expr {
    Expr::UnaryExpression(Box::new(UnaryExpression {
        operator: operator.into(),
        prefix: true,
        argument,
        loc: None,
    }))
}

/// A plain `=` assignment.
pub fn assign(left: Expr, right: Expr) -> Expr {
    Expr::AssignmentExpression(Box::new(AssignmentExpression {
        operator: "=".into(),
        left,
        right,
        loc: None,
    }))
}

/// A prefix update, `++argument` or `--argument`.
pub fn update_prefix(operator: impl Into<SmolStr>, argument: Expr) -> Expr {
    Expr::UpdateExpression(Box::new(UpdateExpression {
        operator: operator.into(),
        argument,
        prefix: true,
        loc: None,
    }))
}

/// A `yield` expression.
pub fn yield_expr(argument: Expr) -> Expr {
    Expr::YieldExpression(Box::new(YieldExpression {
        argument: Some(argument),
        delegate: false,
        loc: None,
    }))
}

/// A `yield*` expression.
pub fn yield_delegate(argument: Expr) -> Expr {
    Expr::YieldExpression(Box::new(YieldExpression {
        argument: Some(argument),
        delegate: true,
        loc: None,
    }))
}

/// A `function (…) { … }` expression.
pub fn function(params: Vec<Pat>, body: BlockStatement) -> Expr {
    Expr::FunctionExpression(Box::new(FunctionExpression {
        id: None,
        params,
        body,
        generator: false,
        loc: None,
    }))
}

/// A `function* (…) { … }` expression.
pub fn generator(params: Vec<Pat>, body: BlockStatement) -> Expr {
    Expr::FunctionExpression(Box::new(FunctionExpression {
        id: None,
        params,
        body,
        generator: true,
        loc: None,
    }))
}

/// An arrow function carrying the generator flag.
pub fn arrow_generator(params: Vec<Pat>, body: BlockStatement) -> Expr {
    Expr::ArrowFunctionExpression(Box::new(ArrowFunctionExpression {
        params,
        body,
        generator: true,
        loc: None,
    }))
}

/// A single-declarator `let` statement.
pub fn let_decl(name: impl Into<SmolStr>, init: Expr) -> Stmt {
    decl(VariableKind::Let, name, init)
}

/// A single-declarator `const` statement.
pub fn const_decl(name: impl Into<SmolStr>, init: Expr) -> Stmt {
    decl(VariableKind::Const, name, init)
}

fn decl(kind: VariableKind, name: impl Into<SmolStr>, init: Expr) -> Stmt {
    Stmt::VariableDeclaration(VariableDeclaration {
        kind,
        declarations: vec![VariableDeclarator {
            id: ident_pat(name),
            init: Some(init),
            loc: None,
        }],
        loc: None,
    })
}

/// A block statement.
pub fn block(body: Vec<Stmt>) -> BlockStatement {
    BlockStatement { body, loc: None }
}

/// An object literal.
pub fn object(properties: Vec<Property>) -> Expr {
    Expr::ObjectExpression(ObjectExpression {
        properties,
        loc: None,
    })
}

/// A non-shorthand object property with an identifier key.
pub fn prop(key: impl Into<SmolStr>, value: Expr) -> Property {
    Property {
        key: ident(key),
        value,
        shorthand: false,
        loc: None,
    }
}

/// A `return` statement.
pub fn ret(argument: Expr) -> Stmt {
    Stmt::ReturnStatement(ReturnStatement {
        argument: Some(argument),
        loc: None,
    })
}

/// A bare `break`.
pub fn brk() -> Stmt {
    Stmt::BreakStatement(BreakStatement::default())
}

/// A bare `continue`.
pub fn cont() -> Stmt {
    Stmt::ContinueStatement(ContinueStatement::default())
}

/// An `if` statement with a block consequent.
pub fn if_stmt(test: Expr, consequent: BlockStatement, alternate: Option<Stmt>) -> Stmt {
    Stmt::IfStatement(Box::new(IfStatement {
        test,
        consequent: Stmt::BlockStatement(consequent),
        alternate,
        loc: None,
    }))
}

/// A `for (;; update)` statement with a block body.
pub fn for_loop(update: Expr, body: BlockStatement) -> Stmt {
    Stmt::ForStatement(Box::new(ForStatement {
        init: None,
        test: None,
        update: Some(update),
        body: Stmt::BlockStatement(body),
        loc: None,
    }))
}

/// An `export default …` declaration.
pub fn export_default(declaration: Expr) -> Stmt {
    Stmt::ExportDefaultDeclaration(Box::new(ExportDefaultDeclaration {
        declaration,
        loc: None,
    }))
}

/// A module program.
pub fn module(body: Vec<Stmt>) -> Program {
    Program {
        body,
        source_type: SourceType::Module,
        loc: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_auto_wraps_in_block() {
        let mut body = block(Vec::new());
        body.push(call(ident("f"), vec![num_lit(1.0)]));
        assert!(matches!(body.body[0], Stmt::ExpressionStatement(_)));
    }

    #[test]
    fn test_generator_flag() {
        match generator(vec![ident_pat("ctx")], block(Vec::new())) {
            Expr::FunctionExpression(f) => {
                assert!(f.generator);
                assert_eq!(f.params.len(), 1);
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_identifier_is_a_pattern() {
        assert!(ident("x").is_pattern());
        assert!(!num_lit(1.0).is_pattern());
    }
}

//! Template to module lowering.
//!
//! This crate compiles template source into the syntax tree of an ES module
//! that renders the template: parse with `jinja-parser`, then lower the
//! template AST into a `js_ast::Program` whose single statement default-
//! exports `{ macros, generate, render }`. Printing the tree as source text
//! is a downstream concern.

pub mod context;
mod template;

use context::LowerContext;
use jinja_parser::{ParseResult, Template};
use js_ast::Program;

pub use jinja_parser::{SyntaxError, SyntaxErrorCode};

/// Compile a template into a target module tree.
///
/// `name` is attached to every emitted source location.
pub fn compile(source: &str, name: Option<&str>) -> ParseResult<Program> {
    let template = jinja_parser::parse(source)?;
    lower(&template, name)
}

/// Lower an already-parsed template.
pub fn lower(template: &Template, name: Option<&str>) -> ParseResult<Program> {
    template::lower_module(template, LowerContext::new(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use js_ast::{Expr, LiteralValue, Stmt};

    /// Unwrap the exported object of a compiled module.
    fn exported(program: &Program) -> &js_ast::ObjectExpression {
        assert_eq!(program.body.len(), 1);
        match &program.body[0] {
            Stmt::ExportDefaultDeclaration(export) => match &export.declaration {
                Expr::ObjectExpression(object) => object,
                other => panic!("expected object, got {:?}", other),
            },
            other => panic!("expected export default, got {:?}", other),
        }
    }

    /// Get the `generate` generator body of a compiled module.
    fn generate_body(program: &Program) -> &[Stmt] {
        let object = exported(program);
        let generate = object
            .properties
            .iter()
            .find(|p| matches!(&p.key, Expr::Identifier(k) if k.name == "generate"))
            .expect("generate property");
        match &generate.value {
            Expr::FunctionExpression(f) => {
                assert!(f.generator);
                &f.body.body
            }
            other => panic!("expected generator, got {:?}", other),
        }
    }

    fn yielded(stmt: &Stmt) -> &Expr {
        match stmt {
            Stmt::ExpressionStatement(stmt) => match &stmt.expression {
                Expr::YieldExpression(y) => y.argument.as_ref().expect("yield argument"),
                other => panic!("expected yield, got {:?}", other),
            },
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_module_exports_macros_generate_render() {
        let program = compile("", None).unwrap();
        let keys: Vec<_> = exported(&program)
            .properties
            .iter()
            .map(|p| match &p.key {
                Expr::Identifier(k) => k.name.as_str().to_string(),
                other => panic!("expected identifier key, got {:?}", other),
            })
            .collect();
        assert_eq!(keys, ["macros", "generate", "render"]);
    }

    #[test]
    fn test_text_yields_literal() {
        let program = compile("hello", None).unwrap();
        let body = generate_body(&program);
        // The macros binding comes first, then the yield.
        assert!(matches!(body[0], Stmt::VariableDeclaration(_)));
        match yielded(&body[1]) {
            Expr::Literal(lit) => {
                assert_eq!(lit.value, LiteralValue::String("hello".to_string()));
            }
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn test_put_value_reads_from_context() {
        let program = compile("{{ x }}", None).unwrap();
        let body = generate_body(&program);
        match yielded(&body[1]) {
            Expr::MemberExpression(member) => {
                assert!(!member.computed);
                assert!(matches!(&member.object, Expr::Identifier(o) if o.name == "__j_ctx_0"));
                assert!(matches!(&member.property, Expr::Identifier(p) if p.name == "x"));
            }
            other => panic!("expected member, got {:?}", other),
        }
    }

    #[test]
    fn test_filters_wrap_left_to_right() {
        let program = compile("{{ x | f | g }}", None).unwrap();
        let body = generate_body(&program);
        // g(f(ctx.x))
        match yielded(&body[1]) {
            Expr::CallExpression(outer) => {
                assert!(
                    matches!(&outer.callee, Expr::MemberExpression(m)
                        if matches!(&m.property, Expr::Identifier(p) if p.name == "g"))
                );
                assert!(matches!(&outer.arguments[0], Expr::CallExpression(_)));
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_equality_tightens() {
        let program = compile("{% if a == b %}x{% endif %}{% if a != b %}y{% endif %}", None)
            .unwrap();
        let body = generate_body(&program);
        let operators: Vec<_> = body[1..]
            .iter()
            .map(|stmt| match stmt {
                Stmt::IfStatement(branch) => match &branch.test {
                    Expr::BinaryExpression(op) => op.operator.clone(),
                    other => panic!("expected binary, got {:?}", other),
                },
                other => panic!("expected if, got {:?}", other),
            })
            .collect();
        assert_eq!(operators, ["===", "!=="]);
    }

    #[test]
    fn test_else_arm_keeps_if_true_shape() {
        let program = compile("{% if a %}1{% else %}2{% endif %}", None).unwrap();
        let body = generate_body(&program);
        let Stmt::IfStatement(branch) = &body[1] else {
            panic!("expected if, got {:?}", body[1]);
        };
        let Some(Stmt::IfStatement(alternate)) = &branch.alternate else {
            panic!("expected nested if alternate");
        };
        assert!(matches!(
            &alternate.test,
            Expr::Literal(lit) if lit.value == LiteralValue::Boolean(true)
        ));
    }

    #[test]
    fn test_for_loop_shape() {
        let program = compile("{% for i in xs %}{{ i }}{% endfor %}", None).unwrap();
        let body = generate_body(&program);
        // const __j_loop_1 = ctx.xs[Symbol.iterator]();
        let Stmt::VariableDeclaration(iterator) = &body[1] else {
            panic!("expected iterator declaration, got {:?}", body[1]);
        };
        assert!(matches!(
            &iterator.declarations[0].id,
            js_ast::Pat::Identifier(id) if id.name.starts_with("__j_loop_")
        ));
        // let __j_count_1 = 0;
        let Stmt::VariableDeclaration(count) = &body[2] else {
            panic!("expected count declaration, got {:?}", body[2]);
        };
        assert!(matches!(
            &count.declarations[0].id,
            js_ast::Pat::Identifier(id) if id.name.starts_with("__j_count_")
        ));
        // for (;; ++count) { item; break-on-done; frame; assign; body }
        let Stmt::ForStatement(looped) = &body[3] else {
            panic!("expected for, got {:?}", body[3]);
        };
        assert!(looped.init.is_none());
        assert!(looped.test.is_none());
        assert!(matches!(&looped.update, Some(Expr::UpdateExpression(u)) if u.operator == "++"));
        let Stmt::BlockStatement(inner) = &looped.body else {
            panic!("expected block body");
        };
        assert!(matches!(inner.body[0], Stmt::VariableDeclaration(_)));
        assert!(matches!(inner.body[1], Stmt::IfStatement(_)));
    }

    #[test]
    fn test_for_else_trails_with_count_check() {
        let program = compile("{% for i in xs %}a{% else %}b{% endfor %}", None).unwrap();
        let body = generate_body(&program);
        let Stmt::IfStatement(empty_check) = &body[4] else {
            panic!("expected trailing if, got {:?}", body[4]);
        };
        match &empty_check.test {
            Expr::BinaryExpression(op) => {
                assert_eq!(op.operator, "===");
                assert!(matches!(
                    &op.left,
                    Expr::Identifier(id) if id.name.starts_with("__j_count_")
                ));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_scope_allocates_context_clone() {
        let program = compile("{% set x = 1 %}{{ x }}", None).unwrap();
        let body = generate_body(&program);
        // let __j_ctx_1 = Object.assign({ x: __j_ctx_0.x }, __j_ctx_0);
        let Stmt::VariableDeclaration(decl) = &body[1] else {
            panic!("expected context clone, got {:?}", body[1]);
        };
        assert_eq!(decl.kind, js_ast::VariableKind::Let);
        let Some(Expr::CallExpression(assign_call)) = &decl.declarations[0].init else {
            panic!("expected Object.assign init");
        };
        assert!(matches!(&assign_call.arguments[0], Expr::ObjectExpression(_)));
        assert!(
            matches!(&assign_call.arguments[1], Expr::Identifier(id) if id.name == "__j_ctx_0")
        );
        // {{ x }} now reads from the clone.
        match yielded(&body[3]) {
            Expr::MemberExpression(member) => {
                assert!(matches!(&member.object, Expr::Identifier(o) if o.name == "__j_ctx_1"));
            }
            other => panic!("expected member, got {:?}", other),
        }
    }

    #[test]
    fn test_macro_lowering_and_call() {
        let source = "{% macro m(a, b = 2) %}{{ a }}{% endmacro %}{% call m(1) %}c{% endcall %}";
        let program = compile(source, None).unwrap();
        let object = exported(&program);
        let macros = object
            .properties
            .iter()
            .find(|p| matches!(&p.key, Expr::Identifier(k) if k.name == "macros"))
            .expect("macros property");
        let Expr::ObjectExpression(macros) = &macros.value else {
            panic!("expected macros object");
        };
        assert_eq!(macros.properties.len(), 1);
        let Expr::FunctionExpression(def) = &macros.properties[0].value else {
            panic!("expected macro generator");
        };
        assert!(def.generator);
        assert_eq!(def.params.len(), 2);

        // The call site: yield* __j_macros.m({a: 1, b: 2, caller}, __j_macros)
        let body = generate_body(&program);
        match yielded(&body[1]) {
            Expr::CallExpression(invoke) => {
                let Expr::ObjectExpression(args) = &invoke.arguments[0] else {
                    panic!("expected args object");
                };
                let keys: Vec<_> = args
                    .properties
                    .iter()
                    .map(|p| match &p.key {
                        Expr::Identifier(k) => k.name.as_str().to_string(),
                        other => panic!("expected identifier key, got {:?}", other),
                    })
                    .collect();
                assert_eq!(keys, ["a", "b", "caller"]);
                // b was absent at the call site and takes its default.
                assert!(matches!(
                    &args.properties[1].value,
                    Expr::Literal(lit) if lit.value == LiteralValue::Number(2.0)
                ));
                assert!(
                    matches!(&invoke.arguments[1], Expr::Identifier(id) if id.name == "__j_macros")
                );
            }
            other => panic!("expected call, got {:?}", other),
        }
        // The delegate flag is on the yield.
        let Stmt::ExpressionStatement(stmt) = &body[1] else {
            panic!("expected expression statement");
        };
        assert!(matches!(
            &stmt.expression,
            Expr::YieldExpression(y) if y.delegate
        ));
    }

    #[test]
    fn test_unknown_macro_is_an_error() {
        let err = compile("{% call nope() %}{% endcall %}", None).unwrap_err();
        assert_eq!(err.code, SyntaxErrorCode::UnknownMacro);
    }

    #[test]
    fn test_block_renders_inline() {
        let program = compile("{% block b %}inner{% endblock %}", None).unwrap();
        let body = generate_body(&program);
        let Stmt::ExpressionStatement(stmt) = &body[1] else {
            panic!("expected expression statement");
        };
        let Expr::YieldExpression(delegated) = &stmt.expression else {
            panic!("expected yield");
        };
        assert!(delegated.delegate);
        // (function* () { yield "inner"; })()
        let Some(Expr::CallExpression(iife)) = &delegated.argument else {
            panic!("expected call");
        };
        let Expr::FunctionExpression(f) = &iife.callee else {
            panic!("expected function callee");
        };
        assert!(f.generator);
    }

    #[test]
    fn test_filter_block_wraps_generator_arrow() {
        let program = compile("{% filter up %}x{% endfilter %}", None).unwrap();
        let body = generate_body(&program);
        let Stmt::ExpressionStatement(stmt) = &body[1] else {
            panic!("expected expression statement");
        };
        let Expr::YieldExpression(delegated) = &stmt.expression else {
            panic!("expected yield");
        };
        let Some(Expr::CallExpression(filter_call)) = &delegated.argument else {
            panic!("expected filter call");
        };
        let Expr::CallExpression(producer) = &filter_call.arguments[0] else {
            panic!("expected producer call");
        };
        assert!(matches!(
            &producer.callee,
            Expr::ArrowFunctionExpression(arrow) if arrow.generator
        ));
    }

    #[test]
    fn test_unpack_assigns_by_index() {
        let program = compile("{% set a, b = pair %}", None).unwrap();
        let body = generate_body(&program);
        // Frame allocation, then one assignment per name.
        let assignments: Vec<_> = body[2..].iter().collect();
        assert_eq!(assignments.len(), 2);
        for (index, stmt) in assignments.iter().enumerate() {
            let Stmt::ExpressionStatement(stmt) = stmt else {
                panic!("expected expression statement");
            };
            let Expr::AssignmentExpression(assignment) = &stmt.expression else {
                panic!("expected assignment");
            };
            let Expr::MemberExpression(slot) = &assignment.right else {
                panic!("expected indexed member");
            };
            assert!(slot.computed);
            assert!(matches!(
                &slot.property,
                Expr::Literal(lit) if lit.value == LiteralValue::Number(index as f64)
            ));
        }
    }

    #[test]
    fn test_source_name_lands_in_locations() {
        let program = compile("x", Some("page.jinja")).unwrap();
        let loc = program.loc.as_ref().expect("program loc");
        assert_eq!(loc.source.as_deref(), Some("page.jinja"));
    }

    #[test]
    fn test_parse_errors_propagate() {
        assert!(compile("{% if %}x{% endif %}", None).is_err());
    }
}

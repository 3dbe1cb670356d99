//! Template lowering.
//!
//! Translates a template AST into the syntax tree of a module that
//! default-exports `{ macros, generate, render }`. `generate` is a generator
//! yielding string fragments; `render` joins them. Runtime variable bindings
//! live in context objects threaded as `__j_ctx_<N>` identifiers; a scope
//! that declares variables clones its parent context and pre-initializes the
//! declared names so assignments shadow instead of leaking upward.

use crate::context::LowerContext;
use jinja_parser::{
    Arm, Assign, CallBlock, CaseStatement, Expr, FilterBlock, ForLoop, Macro, MacroCall,
    ParseResult, Pattern, Placeable, PutValue, Scope, Symbol, SyntaxError, SyntaxErrorCode,
    Template, Text,
};
use js_ast::builder::*;
use js_ast::{BlockStatement, Program, Stmt};

/// Lower a template into a target module.
pub(crate) fn lower_module(
    template: &Template,
    mut ctx: LowerContext,
) -> ParseResult<Program> {
    let lowerer = Lowerer { template };

    // The root context object is the `generate` parameter.
    let root_frame = ctx.fresh_frame();

    // Macros first: each gets a fresh lexical root.
    let mut macro_props = Vec::new();
    for def in template.macros.values() {
        macro_props.push(prop(
            def.name.name.clone(),
            lowerer.lower_macro(def, &mut ctx)?,
        ));
    }

    // generate(ctx): yields the rendered fragments.
    ctx.push_frame(root_frame.clone());
    let mut body = BlockStatement::new();
    body.push(const_decl("__j_macros", member(ident("this"), "macros")));
    lowerer.lower_scope(&template.body, &mut ctx, &mut body)?;
    ctx.pop_frame();
    let generate = generator(vec![ident_pat(root_frame)], body)
        .with_loc(ctx.loc(template.span));

    // render(context): joins what generate yields.
    let joined = call(
        member(
            call(
                member(ident("Array"), "from"),
                vec![call(
                    member(ident("this"), "generate"),
                    vec![ident("context")],
                )],
            ),
            "join",
        ),
        vec![str_lit("")],
    );
    let render = function(vec![ident_pat("context")], block(vec![ret(joined)]));

    let exported = object(vec![
        prop("macros", object(macro_props)),
        prop("generate", generate),
        prop("render", render),
    ]);

    let mut program = module(vec![export_default(exported)]);
    program.loc = Some(ctx.loc(template.span));
    Ok(program)
}

struct Lowerer<'t> {
    template: &'t Template,
}

impl Lowerer<'_> {
    // Scopes and bodies

    /// Lower a scope: allocate a context frame when it declares variables,
    /// then lower its body.
    fn lower_scope(
        &self,
        scope: &Scope,
        ctx: &mut LowerContext,
        out: &mut BlockStatement,
    ) -> ParseResult<()> {
        let pushed = self.alloc_frame(scope, ctx, out);
        self.lower_body(&scope.body, ctx, out)?;
        if pushed {
            ctx.pop_frame();
        }
        Ok(())
    }

    /// Emit `let __j_ctx_N = Object.assign({ v: parent.v, … }, parent);` for
    /// a scope with declared variables. The pre-initialized properties make
    /// the names exist on the clone even when the parent lacks them; the
    /// splice shares everything else the parent holds.
    fn alloc_frame(
        &self,
        scope: &Scope,
        ctx: &mut LowerContext,
        out: &mut BlockStatement,
    ) -> bool {
        if scope.variables.is_empty() {
            return false;
        }
        let parent = ctx.current_frame();
        let init_props = scope
            .variables
            .iter()
            .map(|v| prop(v.name.clone(), member(ident(parent.clone()), v.name.clone())))
            .collect();
        let fresh = ctx.fresh_frame();
        let init = call(
            member(ident("Object"), "assign"),
            vec![object(init_props), ident(parent)],
        );
        out.push(let_decl(fresh.clone(), init));
        ctx.push_frame(fresh);
        true
    }

    fn lower_body(
        &self,
        body: &[Placeable],
        ctx: &mut LowerContext,
        out: &mut BlockStatement,
    ) -> ParseResult<()> {
        for placeable in body {
            self.lower_placeable(placeable, ctx, out)?;
        }
        Ok(())
    }

    fn lower_placeable(
        &self,
        placeable: &Placeable,
        ctx: &mut LowerContext,
        out: &mut BlockStatement,
    ) -> ParseResult<()> {
        match placeable {
            Placeable::Text(text) => self.lower_text(text, ctx, out),
            Placeable::PutValue(put) => self.lower_put_value(put, ctx, out)?,
            Placeable::Case(case) => self.lower_case(case, ctx, out)?,
            Placeable::For(looped) => self.lower_for(looped, ctx, out)?,
            Placeable::MacroCall(call) => self.lower_macro_call(call, ctx, out)?,
            Placeable::CallBlock(site) => self.lower_call_block(site, ctx, out)?,
            Placeable::Filter(filtered) => self.lower_filter_block(filtered, ctx, out)?,
            Placeable::Assign(assign) => self.lower_assign(assign, ctx, out),
        }
        Ok(())
    }

    fn lower_text(&self, text: &Text, ctx: &mut LowerContext, out: &mut BlockStatement) {
        let literal = str_lit(text.text.clone()).with_loc(ctx.loc(text.span));
        out.push(yield_expr(literal).with_loc(ctx.loc(text.span)));
    }

    /// `{{ value | f | g }}` yields `g(f(value))`.
    fn lower_put_value(
        &self,
        put: &PutValue,
        ctx: &mut LowerContext,
        out: &mut BlockStatement,
    ) -> ParseResult<()> {
        let mut value = self.lower_expr(&put.value, ctx);
        for filter in &put.filters {
            value = call(self.lower_expr(filter, ctx), vec![value]);
        }
        out.push(yield_expr(value).with_loc(ctx.loc(put.span)));
        Ok(())
    }

    /// Arms become a right-folded `if (cond) { … } else { if … }` chain; the
    /// synthesized else arm keeps its `if (true)` shape.
    fn lower_case(
        &self,
        case: &CaseStatement,
        ctx: &mut LowerContext,
        out: &mut BlockStatement,
    ) -> ParseResult<()> {
        let mut alternate: Option<Stmt> = None;
        for arm in case.arms.iter().rev() {
            alternate = Some(self.lower_arm(arm, ctx, alternate)?);
        }
        if let Some(chain) = alternate {
            out.push(chain);
        }
        Ok(())
    }

    fn lower_arm(
        &self,
        arm: &Arm,
        ctx: &mut LowerContext,
        alternate: Option<Stmt>,
    ) -> ParseResult<Stmt> {
        let mut body = BlockStatement::new();
        self.lower_body(&arm.body, ctx, &mut body)?;
        Ok(if_stmt(self.lower_expr(&arm.condition, ctx), body, alternate))
    }

    /// Lower a loop into an iterator-driven `for (;; ++count)`.
    fn lower_for(
        &self,
        looped: &ForLoop,
        ctx: &mut LowerContext,
        out: &mut BlockStatement,
    ) -> ParseResult<()> {
        let (loop_name, count_name, item_name) = ctx.loop_names();

        // const __j_loop_N = iterable[Symbol.iterator]();
        let iterator = call(
            member_computed(
                self.lower_expr(&looped.iterable, ctx),
                member(ident("Symbol"), "iterator"),
            ),
            Vec::new(),
        );
        out.push(const_decl(loop_name.clone(), iterator));
        out.push(let_decl(count_name.clone(), num_lit(0.0)));

        let mut body = BlockStatement::new();
        // const __j_item_N = __j_loop_N.next(); if (item.done) break;
        body.push(const_decl(
            item_name.clone(),
            call(member(ident(loop_name), "next"), Vec::new()),
        ));
        body.push(if_stmt(
            member(ident(item_name.clone()), "done"),
            block(vec![brk()]),
            None,
        ));

        let pushed = self.alloc_frame(&looped.body, ctx, &mut body);
        self.assign_pattern(
            &looped.pattern,
            member(ident(item_name), "value"),
            ctx,
            &mut body,
        );
        if let Some(filter) = &looped.filter {
            body.push(if_stmt(
                unary("!", self.lower_expr(filter, ctx)),
                block(vec![cont()]),
                None,
            ));
        }
        self.lower_body(&looped.body.body, ctx, &mut body)?;
        if pushed {
            ctx.pop_frame();
        }

        out.push(for_loop(
            update_prefix("++", ident(count_name.clone())),
            body,
        ));

        // The alternative runs when no iteration happened.
        if let Some(alternative) = &looped.alternative {
            let mut empty_body = BlockStatement::new();
            self.lower_body(alternative, ctx, &mut empty_body)?;
            out.push(if_stmt(
                binary("===", ident(count_name), num_lit(0.0)),
                empty_body,
                None,
            ));
        }
        Ok(())
    }

    /// A macro becomes `function* (__j_ctx_N, __j_macros) { … }`; the first
    /// parameter is the macro's context object, so its top scope allocates
    /// no frame of its own.
    fn lower_macro(&self, def: &Macro, ctx: &mut LowerContext) -> ParseResult<js_ast::Expr> {
        let frame = ctx.fresh_frame();
        let saved = ctx.replace_frames(vec![frame.clone()]);
        let mut body = BlockStatement::new();
        let result = self.lower_body(&def.body.body, ctx, &mut body);
        ctx.replace_frames(saved);
        result?;
        Ok(
            generator(vec![ident_pat(frame), ident_pat("__j_macros")], body)
                .with_loc(ctx.loc(def.span)),
        )
    }

    /// `yield* __j_macros.name({arg: expr, …}, __j_macros)`, positional args
    /// zipped against the declared parameters; absent args fall back to
    /// their declared default, extra args are dropped.
    fn lower_macro_call(
        &self,
        invocation: &MacroCall,
        ctx: &mut LowerContext,
        out: &mut BlockStatement,
    ) -> ParseResult<()> {
        let name = &invocation.macro_name;
        let Some(def) = self.template.macros.get(&name.name) else {
            return Err(SyntaxError::new(
                format!("Unknown macro '{}'", name.name),
                name.span,
                SyntaxErrorCode::UnknownMacro,
            ));
        };

        let mut props = Vec::new();
        for (position, param) in def.args.iter().enumerate() {
            let value = match invocation.args.get(position) {
                Some(arg) => self.lower_expr(arg, ctx),
                None => match &param.default {
                    Some(default) => self.lower_expr(default, ctx),
                    None => continue,
                },
            };
            props.push(prop(param.name.name.clone(), value));
        }
        if let Some(caller) = &invocation.caller {
            let mut body = BlockStatement::new();
            self.lower_scope(caller, ctx, &mut body)?;
            props.push(prop("caller", generator(Vec::new(), body)));
        }

        let target = member(ident("__j_macros"), name.name.clone());
        let invoke = call(target, vec![object(props), ident("__j_macros")]);
        out.push(yield_delegate(invoke).with_loc(ctx.loc(invocation.span)));
        Ok(())
    }

    /// The render site of a block inlines the definition's body in an
    /// immediately-invoked generator.
    fn lower_call_block(
        &self,
        site: &CallBlock,
        ctx: &mut LowerContext,
        out: &mut BlockStatement,
    ) -> ParseResult<()> {
        let Some(def) = self.template.blocks.get(&site.name.name) else {
            // Render sites are emitted together with their definitions.
            return Err(SyntaxError::new(
                format!("Unknown block '{}'", site.name.name),
                site.name.span,
                SyntaxErrorCode::UnknownMacro,
            ));
        };
        let mut body = BlockStatement::new();
        self.lower_scope(&def.body, ctx, &mut body)?;
        let iife = call(generator(Vec::new(), body), Vec::new());
        out.push(yield_delegate(iife).with_loc(ctx.loc(site.span)));
        Ok(())
    }

    /// `yield* filter((generator)())` with the body rendered inside.
    fn lower_filter_block(
        &self,
        filtered: &FilterBlock,
        ctx: &mut LowerContext,
        out: &mut BlockStatement,
    ) -> ParseResult<()> {
        let mut body = BlockStatement::new();
        self.lower_scope(&filtered.body, ctx, &mut body)?;
        let producer = call(arrow_generator(Vec::new(), body), Vec::new());
        let wrapped = call(self.lower_expr(&filtered.filter, ctx), vec![producer]);
        out.push(yield_delegate(wrapped).with_loc(ctx.loc(filtered.span)));
        Ok(())
    }

    fn lower_assign(&self, assign: &Assign, ctx: &mut LowerContext, out: &mut BlockStatement) {
        let value = self.lower_expr(&assign.value, ctx);
        self.assign_pattern(&assign.pattern, value, ctx, out);
    }

    /// Assign a pattern into the current context: one property per name;
    /// unpacking indexes positionally into the value.
    fn assign_pattern(
        &self,
        pattern: &Pattern,
        value: js_ast::Expr,
        ctx: &mut LowerContext,
        out: &mut BlockStatement,
    ) {
        let frame = ctx.current_frame();
        match pattern {
            Pattern::Variable(name) => {
                let target = member(ident(frame), name.name.clone());
                out.push(assign(target, value).with_loc(ctx.loc(name.span)));
            }
            Pattern::Unpack(unpack) => {
                for (position, name) in unpack.names.iter().enumerate() {
                    let target = member(ident(frame.clone()), name.name.clone());
                    let slot = member_computed(value.clone(), num_lit(position as f64));
                    out.push(assign(target, slot).with_loc(ctx.loc(name.span)));
                }
            }
        }
    }

    // Expressions

    fn lower_expr(&self, expr: &Expr, ctx: &mut LowerContext) -> js_ast::Expr {
        match expr {
            Expr::Variable(name) => {
                // Context lookup; bare identifiers only appear as member
                // properties, handled below.
                member(ident(ctx.current_frame()), name.name.clone())
                    .with_loc(ctx.loc(name.span))
            }
            Expr::Number(lit) => num_lit(lit.value).with_loc(ctx.loc(lit.span)),
            Expr::Str(lit) => str_lit(lit.value.clone()).with_loc(ctx.loc(lit.span)),
            Expr::Boolean(lit) => bool_lit(lit.value).with_loc(ctx.loc(lit.span)),
            Expr::BinOp(op) => {
                let left = self.lower_expr(&op.left, ctx);
                let right = self.lower_expr(&op.right, ctx);
                let node = if op.op.symbol == Symbol::Eq {
                    assign(left, right)
                } else {
                    binary(map_operator(op.op.symbol), left, right)
                };
                node.with_loc(ctx.loc(op.span))
            }
            Expr::Member(access) => {
                let object = self.lower_expr(&access.object, ctx);
                let node = match &access.property {
                    Expr::Variable(name) => member(object, name.name.clone()),
                    other => member_computed(object, self.lower_expr(other, ctx)),
                };
                node.with_loc(ctx.loc(access.span))
            }
            Expr::FunctionCall(invocation) => {
                let callee = self.lower_expr(&invocation.function, ctx);
                let args = invocation
                    .args
                    .iter()
                    .map(|arg| self.lower_expr(arg, ctx))
                    .collect();
                call(callee, args).with_loc(ctx.loc(invocation.span))
            }
            Expr::Filter(filter) => {
                let value = self.lower_expr(&filter.value, ctx);
                let callee = self.lower_expr(&filter.filter, ctx);
                call(callee, vec![value]).with_loc(ctx.loc(filter.span))
            }
        }
    }
}

/// Map template operators onto the target language; equality tightens to the
/// strict forms, everything else is verbatim.
fn map_operator(symbol: Symbol) -> &'static str {
    match symbol {
        Symbol::EqEq => "===",
        Symbol::BangEq => "!==",
        other => other.as_str(),
    }
}

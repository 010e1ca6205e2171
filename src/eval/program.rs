//! Compiled-pipeline evaluator backend

use std::sync::Arc;

use crate::error::RenderError;
use crate::eval::scope::{LoopInfo, ScopeStack};
use crate::eval::{apply_filter, output_text};
use crate::filters::FilterRegistry;
use crate::parser::ast::{Block, Expr, Node, Spanned};
use crate::value::{Context, Value};

type Step = Box<
    dyn for<'ctx> Fn(&mut ScopeStack<'ctx>, &mut String) -> Result<(), RenderError> + Send + Sync,
>;
type ExprFn =
    Box<dyn for<'ctx> Fn(&ScopeStack<'ctx>) -> Result<Value, RenderError> + Send + Sync>;

/// A template pre-resolved into a sequence of render steps.
///
/// Translation happens once: each AST node becomes a step closure, each
/// expression a value-producing closure, and filter functions are taken
/// from the registry up front. Repeated renders replay the steps without
/// touching the AST or the registry again. Output is byte-identical to the
/// tree-walking backend.
pub struct Program {
    steps: Vec<Step>,
}

impl Program {
    pub(crate) fn compile(block: &Block, filters: &Arc<FilterRegistry>) -> Self {
        Self {
            steps: compile_block(block, filters),
        }
    }

    /// Render against a context
    pub fn render(&self, context: &Context) -> Result<String, RenderError> {
        let mut scope = ScopeStack::new(context);
        let mut out = String::new();
        run_steps(&self.steps, &mut scope, &mut out)?;
        Ok(out)
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("steps", &self.steps.len())
            .finish()
    }
}

fn run_steps(
    steps: &[Step],
    scope: &mut ScopeStack<'_>,
    out: &mut String,
) -> Result<(), RenderError> {
    for step in steps {
        step(scope, out)?;
    }
    Ok(())
}

fn compile_block(block: &Block, filters: &Arc<FilterRegistry>) -> Vec<Step> {
    block
        .iter()
        .map(|node| compile_node(node, filters))
        .collect()
}

fn compile_node(node: &Spanned<Node>, filters: &Arc<FilterRegistry>) -> Step {
    match &node.node {
        Node::Text(text) => {
            let text = text.clone();
            Box::new(move |_scope: &mut ScopeStack<'_>, out: &mut String| {
                out.push_str(&text);
                Ok(())
            })
        }
        Node::Output(expr) => {
            let eval = compile_expr(expr, filters);
            let span = expr.span.clone();
            Box::new(move |scope: &mut ScopeStack<'_>, out: &mut String| {
                let value = eval(scope)?;
                out.push_str(&output_text(&value, &span)?);
                Ok(())
            })
        }
        Node::If {
            condition,
            then_block,
            else_block,
        } => {
            let cond = compile_expr(condition, filters);
            let then_steps = compile_block(then_block, filters);
            let else_steps = else_block.as_ref().map(|b| compile_block(b, filters));
            Box::new(move |scope: &mut ScopeStack<'_>, out: &mut String| {
                if cond(scope)?.is_truthy() {
                    run_steps(&then_steps, scope, out)
                } else if let Some(else_steps) = &else_steps {
                    run_steps(else_steps, scope, out)
                } else {
                    Ok(())
                }
            })
        }
        Node::For {
            var,
            iterable,
            body,
        } => {
            let eval = compile_expr(iterable, filters);
            let span = iterable.span.clone();
            let var = var.clone();
            let body_steps = compile_block(body, filters);
            Box::new(move |scope: &mut ScopeStack<'_>, out: &mut String| match eval(scope)? {
                Value::Undefined => Ok(()),
                Value::Seq(items) => {
                    let length = items.len();
                    for (i, item) in items.into_iter().enumerate() {
                        scope.push(var.clone(), item, LoopInfo::new(i, length));
                        let result = run_steps(&body_steps, scope, out);
                        scope.pop();
                        result?;
                    }
                    Ok(())
                }
                other => Err(RenderError::NotIterable {
                    kind: other.kind(),
                    span: span.clone(),
                }),
            })
        }
    }
}

fn compile_expr(expr: &Spanned<Expr>, filters: &Arc<FilterRegistry>) -> ExprFn {
    match &expr.node {
        Expr::Literal(value) => {
            let value = value.clone();
            Box::new(move |_scope: &ScopeStack<'_>| Ok(value.clone()))
        }
        Expr::Var { head, path } => {
            let head = head.clone();
            let path = path.clone();
            let span = expr.span.clone();
            Box::new(move |scope: &ScopeStack<'_>| scope.resolve(&head, &path, &span))
        }
        Expr::Filter { input, name, args } => {
            let eval_input = compile_expr(input, filters);
            let arg_fns: Vec<ExprFn> = args.iter().map(|a| compile_expr(a, filters)).collect();
            // registry lookup happens once, at translation time
            let func = filters.lookup(&name.node);
            let name = name.clone();
            Box::new(move |scope: &ScopeStack<'_>| {
                let value = eval_input(scope)?;
                let mut argv = Vec::with_capacity(arg_fns.len());
                for arg in &arg_fns {
                    argv.push(arg(scope)?);
                }
                apply_filter(func.as_ref(), value, &argv, &name)
            })
        }
    }
}

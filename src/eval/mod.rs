//! Template evaluation: shared expression semantics and the two backends.
//!
//! The tree-walking backend interprets the AST directly; the compiled
//! pipeline pre-resolves it into render steps. Both route expression
//! evaluation, truthiness, and output coercion through this module so the
//! two cannot diverge.

mod program;
mod scope;
mod walk;

pub use program::Program;
pub use scope::{LoopInfo, ScopeStack};
pub(crate) use walk::render_block;

use std::sync::Arc;

use crate::error::{RenderError, Span};
use crate::filters::{FilterError, FilterFn, FilterRegistry};
use crate::parser::ast::{Expr, Spanned};
use crate::value::Value;

/// Evaluate an expression against the current scope
pub(crate) fn eval_expr(
    expr: &Spanned<Expr>,
    scope: &ScopeStack<'_>,
    filters: &FilterRegistry,
) -> Result<Value, RenderError> {
    match &expr.node {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Var { head, path } => scope.resolve(head, path, &expr.span),
        Expr::Filter { input, name, args } => {
            let value = eval_expr(input, scope, filters)?;
            let mut argv = Vec::with_capacity(args.len());
            for arg in args {
                argv.push(eval_expr(arg, scope, filters)?);
            }
            let func = filters.lookup(&name.node);
            apply_filter(func.as_ref(), value, &argv, name)
        }
    }
}

/// Apply a filter function, lifting filter failures into render errors
pub(crate) fn apply_filter(
    func: Option<&Arc<FilterFn>>,
    value: Value,
    args: &[Value],
    name: &Spanned<String>,
) -> Result<Value, RenderError> {
    let Some(func) = func else {
        return Err(RenderError::Filter {
            name: name.node.clone(),
            span: name.span.clone(),
            source: FilterError::NotFound {
                name: name.node.clone(),
            },
        });
    };
    match func(value, args) {
        Ok(out) => Ok(out),
        Err(FilterError::UndefinedInput) => Err(RenderError::UndefinedAccess {
            what: format!("input of filter `{}`", name.node),
            span: name.span.clone(),
        }),
        Err(source) => Err(RenderError::Filter {
            name: name.node.clone(),
            span: name.span.clone(),
            source,
        }),
    }
}

/// Coerce a value for output: scalars render canonically, undefined and
/// null render as nothing, containers must be reduced by a filter first.
pub(crate) fn output_text(value: &Value, span: &Span) -> Result<String, RenderError> {
    value.to_text().ok_or_else(|| RenderError::Unrenderable {
        kind: value.kind(),
        span: span.clone(),
    })
}

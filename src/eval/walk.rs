//! Tree-walking evaluator backend

use crate::error::RenderError;
use crate::eval::scope::{LoopInfo, ScopeStack};
use crate::eval::{eval_expr, output_text};
use crate::filters::FilterRegistry;
use crate::parser::ast::{Block, Node};
use crate::value::Value;

/// Render a block depth-first, appending to `out`
pub(crate) fn render_block(
    block: &Block,
    scope: &mut ScopeStack<'_>,
    filters: &FilterRegistry,
    out: &mut String,
) -> Result<(), RenderError> {
    for node in block {
        match &node.node {
            Node::Text(text) => out.push_str(text),
            Node::Output(expr) => {
                let value = eval_expr(expr, scope, filters)?;
                out.push_str(&output_text(&value, &expr.span)?);
            }
            Node::If {
                condition,
                then_block,
                else_block,
            } => {
                if eval_expr(condition, scope, filters)?.is_truthy() {
                    render_block(then_block, scope, filters, out)?;
                } else if let Some(else_block) = else_block {
                    render_block(else_block, scope, filters, out)?;
                }
            }
            Node::For {
                var,
                iterable,
                body,
            } => match eval_expr(iterable, scope, filters)? {
                Value::Undefined => {}
                Value::Seq(items) => {
                    let length = items.len();
                    for (i, item) in items.into_iter().enumerate() {
                        scope.push(var.clone(), item, LoopInfo::new(i, length));
                        let result = render_block(body, scope, filters, out);
                        scope.pop();
                        result?;
                    }
                }
                other => {
                    return Err(RenderError::NotIterable {
                        kind: other.kind(),
                        span: iterable.span.clone(),
                    })
                }
            },
        }
    }
    Ok(())
}

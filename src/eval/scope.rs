//! Scope stack and variable-path resolution

use crate::error::{RenderError, Span};
use crate::parser::ast::PathSegment;
use crate::value::{Context, Record, Value};

/// Per-iteration metadata exposed as `loop` inside a loop body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopInfo {
    index0: usize,
    length: usize,
}

impl LoopInfo {
    pub fn new(index0: usize, length: usize) -> Self {
        Self { index0, length }
    }

    /// 1-based position of the current element
    pub fn index(&self) -> usize {
        self.index0 + 1
    }

    pub fn is_first(&self) -> bool {
        self.index0 == 0
    }

    pub fn is_last(&self) -> bool {
        self.index0 + 1 == self.length
    }

    fn to_value(self) -> Value {
        Record::new("Loop")
            .with_field("index", self.index())
            .with_field("index0", self.index0)
            .with_field("length", self.length)
            .with_field("first", self.is_first())
            .with_field("last", self.is_last())
            .into()
    }
}

/// One loop nesting level: the loop variable binding plus loop metadata
struct Frame {
    var: String,
    value: Value,
    info: LoopInfo,
}

/// Stack of scopes for one render call: the global context at the base,
/// one frame per active loop nesting level.
///
/// Created fresh per render; the context itself is never mutated.
pub struct ScopeStack<'ctx> {
    global: &'ctx Context,
    frames: Vec<Frame>,
}

impl<'ctx> ScopeStack<'ctx> {
    pub fn new(global: &'ctx Context) -> Self {
        Self {
            global,
            frames: Vec::new(),
        }
    }

    pub fn push(&mut self, var: String, value: Value, info: LoopInfo) {
        self.frames.push(Frame { var, value, info });
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Look up the head of a variable path, innermost frame first.
    /// Inside a loop the names in scope are the loop variable and `loop`.
    fn lookup(&self, name: &str) -> Value {
        for frame in self.frames.iter().rev() {
            if frame.var == name {
                return frame.value.clone();
            }
            if name == "loop" {
                return frame.info.to_value();
            }
        }
        self.global.get(name).cloned().unwrap_or(Value::Undefined)
    }

    /// Resolve a full variable path against the stack.
    ///
    /// Missing names, keys, fields, and out-of-range indices resolve to
    /// [`Value::Undefined`]; applying a further segment to undefined, or any
    /// segment to a non-container, is a render error.
    pub fn resolve(
        &self,
        head: &str,
        path: &[PathSegment],
        span: &Span,
    ) -> Result<Value, RenderError> {
        let mut value = self.lookup(head);
        for (depth, segment) in path.iter().enumerate() {
            if value.is_undefined() {
                return Err(RenderError::UndefinedAccess {
                    what: format!("`{}` has no value", path_text(head, &path[..depth])),
                    span: span.clone(),
                });
            }
            value = match (&value, segment) {
                (Value::Map(entries), PathSegment::Field(key)) => {
                    entries.get(key).cloned().unwrap_or(Value::Undefined)
                }
                (Value::Record(record), PathSegment::Field(field)) => {
                    record.get(field).cloned().unwrap_or(Value::Undefined)
                }
                (Value::Seq(items), PathSegment::Index(i)) => {
                    items.get(*i).cloned().unwrap_or(Value::Undefined)
                }
                _ => {
                    return Err(RenderError::InvalidAccess {
                        segment: segment.to_string(),
                        kind: value.kind(),
                        span: span.clone(),
                    })
                }
            };
        }
        Ok(value)
    }
}

fn path_text(head: &str, segments: &[PathSegment]) -> String {
    let mut out = head.to_string();
    for segment in segments {
        out.push_str(&segment.to_string());
    }
    out
}

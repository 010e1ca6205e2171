//! Filter registry and the built-in filter set

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::value::{Number, Value};

/// A filter transforms a value, optionally taking arguments evaluated from
/// the template at render time.
pub type FilterFn = dyn Fn(Value, &[Value]) -> Result<Value, FilterError> + Send + Sync;

/// Errors a filter application can produce
#[derive(Debug, Error)]
pub enum FilterError {
    /// Filter not present in the registry
    #[error("filter not found: {name}")]
    NotFound { name: String },

    /// The filter requires a concrete input value
    #[error("input is undefined")]
    UndefinedInput,

    /// The input value has the wrong kind
    #[error("expected {expected}, got {got}")]
    WrongType {
        expected: &'static str,
        got: &'static str,
    },

    /// A required argument was not supplied
    #[error("missing required argument `{name}`")]
    MissingArgument { name: &'static str },

    /// An argument had an unusable value
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
}

/// Registry mapping filter names to their implementations.
///
/// Populated at engine construction and read-only afterwards; compiled
/// templates hold a shared snapshot so concurrent renders never contend.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, Arc<FilterFn>>,
}

impl FilterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in filters
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("escape", escape);
        registry.register("unescape", unescape);
        registry.register("default", default);
        registry.register("length", length);
        registry.register("upper", upper);
        registry.register("lower", lower);
        registry.register("trim", trim);
        registry.register("join", join);
        registry.register("first", first);
        registry.register("last", last);
        registry
    }

    /// Register a filter, replacing any existing one with the same name
    pub fn register(
        &mut self,
        name: impl Into<String>,
        filter: impl Fn(Value, &[Value]) -> Result<Value, FilterError> + Send + Sync + 'static,
    ) {
        self.filters.insert(name.into(), Arc::new(filter));
    }

    /// Get a filter by name
    pub fn lookup(&self, name: &str) -> Option<Arc<FilterFn>> {
        self.filters.get(name).cloned()
    }

    /// Check if a filter exists
    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Get all filter names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(|s| s.as_str())
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("FilterRegistry")
            .field("filters", &names)
            .finish()
    }
}

fn require_defined(value: Value) -> Result<Value, FilterError> {
    if value.is_undefined() {
        Err(FilterError::UndefinedInput)
    } else {
        Ok(value)
    }
}

fn scalar_text(value: &Value) -> Result<String, FilterError> {
    value.to_text().ok_or(FilterError::WrongType {
        expected: "a scalar value",
        got: value.kind(),
    })
}

fn text_input(value: Value) -> Result<String, FilterError> {
    match require_defined(value)? {
        Value::Text(s) => Ok(s),
        other => Err(FilterError::WrongType {
            expected: "text",
            got: other.kind(),
        }),
    }
}

fn seq_input(value: Value) -> Result<Vec<Value>, FilterError> {
    match require_defined(value)? {
        Value::Seq(items) => Ok(items),
        other => Err(FilterError::WrongType {
            expected: "a sequence",
            got: other.kind(),
        }),
    }
}

/// Escape the HTML special characters `& < > " '`
fn escape(value: Value, _args: &[Value]) -> Result<Value, FilterError> {
    let text = scalar_text(&require_defined(value)?)?;
    Ok(Value::Text(
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#039;"),
    ))
}

/// Undo [`escape`]
fn unescape(value: Value, _args: &[Value]) -> Result<Value, FilterError> {
    let text = text_input(value)?;
    Ok(Value::Text(
        text.replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#039;", "'")
            .replace("&amp;", "&"),
    ))
}

/// Substitute a fallback for undefined or null input
fn default(value: Value, args: &[Value]) -> Result<Value, FilterError> {
    let fallback = args
        .first()
        .ok_or(FilterError::MissingArgument { name: "fallback" })?;
    match value {
        Value::Undefined | Value::Null => Ok(fallback.clone()),
        concrete => Ok(concrete),
    }
}

fn length(value: Value, _args: &[Value]) -> Result<Value, FilterError> {
    let len = match require_defined(value)? {
        Value::Text(s) => s.chars().count(),
        Value::Seq(items) => items.len(),
        Value::Map(entries) => entries.len(),
        other => {
            return Err(FilterError::WrongType {
                expected: "text, a sequence, or a mapping",
                got: other.kind(),
            })
        }
    };
    Ok(Value::Number(Number::Int(len as i64)))
}

fn upper(value: Value, _args: &[Value]) -> Result<Value, FilterError> {
    Ok(Value::Text(text_input(value)?.to_uppercase()))
}

fn lower(value: Value, _args: &[Value]) -> Result<Value, FilterError> {
    Ok(Value::Text(text_input(value)?.to_lowercase()))
}

fn trim(value: Value, _args: &[Value]) -> Result<Value, FilterError> {
    Ok(Value::Text(text_input(value)?.trim().to_string()))
}

/// Concatenate a sequence of scalars with a separator (default empty)
fn join(value: Value, args: &[Value]) -> Result<Value, FilterError> {
    let separator = match args.first() {
        None => String::new(),
        Some(Value::Text(s)) => s.clone(),
        Some(other) => {
            return Err(FilterError::InvalidArgument {
                message: format!("separator must be text, got {}", other.kind()),
            })
        }
    };
    let parts = seq_input(value)?
        .iter()
        .map(scalar_text)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Text(parts.join(&separator)))
}

fn first(value: Value, _args: &[Value]) -> Result<Value, FilterError> {
    let mut items = seq_input(value)?;
    if items.is_empty() {
        Ok(Value::Undefined)
    } else {
        Ok(items.swap_remove(0))
    }
}

fn last(value: Value, _args: &[Value]) -> Result<Value, FilterError> {
    Ok(seq_input(value)?.pop().unwrap_or(Value::Undefined))
}

//! templet - a small text-templating engine with a compiled render pipeline
//!
//! Templates interleave literal text with output expressions (`{{ ... }}`),
//! statements (`{% ... %}`), and comments (`{# ... #}`). Compiling produces an
//! immutable [`CompiledTemplate`] that can be rendered any number of times,
//! either by walking the AST or through a pre-resolved [`Program`].
//!
//! # Example
//!
//! ```rust
//! use templet::{render_template, Context};
//!
//! let mut ctx = Context::new();
//! ctx.insert("name", "World");
//!
//! let out = render_template("Hello {{ name }}!", &ctx).unwrap();
//! assert_eq!(out, "Hello World!");
//! ```
//!
//! Supported constructs:
//! - `{{ user.name | default("anon") | escape }}` - variable paths and
//!   filter pipelines
//! - `{% if cond %} ... {% elif other %} ... {% else %} ... {% end %}`
//! - `{% for item in items %} ... {% end %}`, with `loop.index`,
//!   `loop.index0`, `loop.length`, `loop.first`, and `loop.last` in scope
//!   inside the body

pub mod error;
pub mod eval;
pub mod filters;
pub mod parser;
pub mod value;

use std::sync::Arc;

use thiserror::Error;

pub use error::{LexError, ParseError, RenderError};
pub use eval::Program;
pub use filters::{FilterError, FilterRegistry};
pub use value::{Context, Number, Record, Value};

use eval::{render_block, ScopeStack};
use parser::Block;

/// Errors from the compile-and-render pipeline
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Error during tokenization
    #[error("lex error: {0}")]
    Lex(#[from] LexError),

    /// Error during parsing
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error during rendering
    #[error("render error: {0}")]
    Render(#[from] RenderError),
}

/// Which evaluator executes a render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Walk the AST directly
    TreeWalking,
    /// Translate the AST into render steps, then replay them
    CompiledPipeline,
}

/// Template compiler configured with a filter set.
///
/// Filters are registered before any compile; every template compiled by
/// this engine carries a read-only snapshot of the registry.
#[derive(Debug, Clone)]
pub struct Engine {
    filters: FilterRegistry,
}

impl Engine {
    /// Create an engine with the built-in filters
    pub fn new() -> Self {
        Self {
            filters: FilterRegistry::with_builtins(),
        }
    }

    /// Register an extra filter (or replace a built-in)
    pub fn with_filter(
        mut self,
        name: impl Into<String>,
        filter: impl Fn(Value, &[Value]) -> Result<Value, FilterError> + Send + Sync + 'static,
    ) -> Self {
        self.filters.register(name, filter);
        self
    }

    /// Compile template text into a reusable template.
    ///
    /// Fails fast on malformed tags, unbalanced blocks, and unknown filter
    /// names; no partial template is ever produced.
    pub fn compile(&self, source: &str) -> Result<CompiledTemplate, TemplateError> {
        let root = parser::parse(source, &self.filters)?;
        Ok(CompiledTemplate {
            root,
            filters: Arc::new(self.filters.clone()),
        })
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// A parsed template plus the filter snapshot it was validated against.
///
/// Immutable after construction: safe to share across threads and to render
/// concurrently, as long as each render supplies its own [`Context`].
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    root: Block,
    filters: Arc<FilterRegistry>,
}

impl CompiledTemplate {
    /// Render against a context using the tree-walking backend
    pub fn render(&self, context: &Context) -> Result<String, RenderError> {
        let mut scope = ScopeStack::new(context);
        let mut out = String::new();
        render_block(&self.root, &mut scope, &self.filters, &mut out)?;
        Ok(out)
    }

    /// Pre-resolve this template into a render-step program for repeated use
    pub fn program(&self) -> Program {
        Program::compile(&self.root, &self.filters)
    }

    /// Render with an explicitly chosen backend
    pub fn render_with(&self, backend: Backend, context: &Context) -> Result<String, RenderError> {
        match backend {
            Backend::TreeWalking => self.render(context),
            Backend::CompiledPipeline => self.program().render(context),
        }
    }
}

/// Compile and render in one call, using the default engine.
///
/// # Example
///
/// ```rust
/// use templet::{render_template, Context};
///
/// let mut ctx = Context::new();
/// ctx.insert("items", vec![10, 20]);
///
/// let out = render_template(
///     "{% for i in items %}{{ loop.index }}:{{ i }};{% end %}",
///     &ctx,
/// )
/// .unwrap();
/// assert_eq!(out, "1:10;2:20;");
/// ```
pub fn render_template(source: &str, context: &Context) -> Result<String, TemplateError> {
    let template = Engine::new().compile(source)?;
    Ok(template.render(context)?)
}

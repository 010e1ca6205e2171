//! Error types for scanning, parsing, and rendering

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::filters::FilterError;

/// Byte range in template source text
pub type Span = std::ops::Range<usize>;

/// Tokenization failure: a tag opener with no matching closer
#[derive(Error, Debug)]
pub enum LexError {
    #[error("unterminated {kind} tag starting at offset {offset}")]
    UnterminatedTag { kind: &'static str, offset: usize },
}

impl LexError {
    pub fn offset(&self) -> usize {
        match self {
            LexError::UnterminatedTag { offset, .. } => *offset,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let offset = self.offset();
        let span = offset..(offset + 2).min(source.len());
        write_report(source, filename, &span, &self.to_string(), &self.to_string())
    }
}

/// Compile-time failure: a malformed tag or an unbalanced block structure
#[derive(Error, Debug)]
pub enum ParseError {
    /// Malformed expression or statement content
    #[error("syntax error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },

    /// `{{ }}` with nothing inside
    #[error("empty expression tag")]
    EmptyExpression { span: Span },

    /// `{% %}` with nothing inside
    #[error("empty statement tag")]
    EmptyStatement { span: Span },

    /// Statement keyword the engine does not know
    #[error("unknown statement `{keyword}`")]
    UnknownStatement { keyword: String, span: Span },

    /// `elif`/`else`/`end` outside any open block
    #[error("`{keyword}` without a matching open block")]
    UnexpectedTerminator { keyword: String, span: Span },

    /// A spelled terminator closing the wrong kind of block
    #[error("`{found}` does not close the enclosing `{open}` block")]
    MismatchedTerminator {
        found: String,
        open: &'static str,
        span: Span,
    },

    /// `elif` or a second `else` after the conditional already took its else branch
    #[error("`{keyword}` after `else` in the same conditional")]
    AfterElse { keyword: String, span: Span },

    /// End of input with a block still open
    #[error("unterminated `{keyword}` block")]
    UnterminatedBlock { keyword: &'static str, span: Span },

    /// Filter name absent from the registry snapshot
    #[error("unknown filter `{name}`")]
    UnknownFilter { name: String, span: Span },
}

impl ParseError {
    pub fn span(&self) -> &Span {
        match self {
            ParseError::Syntax { span, .. }
            | ParseError::EmptyExpression { span }
            | ParseError::EmptyStatement { span }
            | ParseError::UnknownStatement { span, .. }
            | ParseError::UnexpectedTerminator { span, .. }
            | ParseError::MismatchedTerminator { span, .. }
            | ParseError::AfterElse { span, .. }
            | ParseError::UnterminatedBlock { span, .. }
            | ParseError::UnknownFilter { span, .. } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let label = match self {
            ParseError::Syntax {
                message, expected, ..
            } => {
                if expected.is_empty() {
                    message.clone()
                } else {
                    format!("{}\nExpected: {}", message, expected.join(", "))
                }
            }
            other => other.to_string(),
        };
        write_report(source, filename, self.span(), &self.to_string(), &label)
    }

    /// Convert a chumsky error over tag-content tokens, rebasing its span
    /// onto the enclosing template source.
    pub(crate) fn from_rich(
        err: chumsky::error::Rich<'_, crate::parser::lexer::Token>,
        base: usize,
    ) -> Self {
        use chumsky::error::RichReason;

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => {
                let found_str = match found {
                    Some(tok) => format_token(tok),
                    None => "end of input".to_string(),
                };
                format!("Unexpected {}", found_str)
            }
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of input".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any token".to_string()),
                chumsky::error::RichPattern::SomethingElse => None,
            })
            .collect();

        let range = err.span().into_range();
        ParseError::Syntax {
            span: (base + range.start)..(base + range.end),
            message,
            expected,
        }
    }
}

/// Render-time failure, carrying the span of the offending construct
#[derive(Error, Debug)]
pub enum RenderError {
    /// A loop over a value that is not a sequence
    #[error("cannot iterate over {kind} value")]
    NotIterable { kind: &'static str, span: Span },

    /// Undefined value used where a concrete one is required
    #[error("undefined access: {what}")]
    UndefinedAccess { what: String, span: Span },

    /// A path segment applied to a value of the wrong kind
    #[error("cannot access `{segment}` on {kind} value")]
    InvalidAccess {
        segment: String,
        kind: &'static str,
        span: Span,
    },

    /// A sequence, mapping, or record in output position
    #[error("cannot render {kind} value directly; reduce it with a filter")]
    Unrenderable { kind: &'static str, span: Span },

    /// A filter rejected its input or arguments
    #[error("filter `{name}` failed: {source}")]
    Filter {
        name: String,
        span: Span,
        source: FilterError,
    },
}

impl RenderError {
    pub fn span(&self) -> &Span {
        match self {
            RenderError::NotIterable { span, .. }
            | RenderError::UndefinedAccess { span, .. }
            | RenderError::InvalidAccess { span, .. }
            | RenderError::Unrenderable { span, .. }
            | RenderError::Filter { span, .. } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        write_report(source, filename, self.span(), &self.to_string(), &self.to_string())
    }
}

fn write_report(source: &str, filename: &str, span: &Span, message: &str, label: &str) -> String {
    let mut buf = Vec::new();
    Report::build(ReportKind::Error, filename, span.start)
        .with_message(message)
        .with_label(
            Label::new((filename, span.clone()))
                .with_message(label)
                .with_color(Color::Red),
        )
        .finish()
        .write((filename, Source::from(source)), &mut buf)
        .unwrap();
    String::from_utf8(buf).unwrap()
}

/// Format a token for human-readable error messages
fn format_token(tok: &crate::parser::lexer::Token) -> String {
    use crate::parser::lexer::Token;
    match tok {
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::Str(s) => format!("string \"{}\"", s),
        Token::Int(n) => format!("number {}", n),
        Token::Float(f) => format!("number {}", f),
        Token::If => "keyword 'if'".to_string(),
        Token::Elif => "keyword 'elif'".to_string(),
        Token::Else => "keyword 'else'".to_string(),
        Token::End => "keyword 'end'".to_string(),
        Token::EndIf => "keyword 'endif'".to_string(),
        Token::EndFor => "keyword 'endfor'".to_string(),
        Token::For => "keyword 'for'".to_string(),
        Token::In => "keyword 'in'".to_string(),
        Token::True => "'true'".to_string(),
        Token::False => "'false'".to_string(),
        Token::Null => "'null'".to_string(),
        Token::Pipe => "'|'".to_string(),
        Token::Dot => "'.'".to_string(),
        Token::BracketOpen => "'['".to_string(),
        Token::BracketClose => "']'".to_string(),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Minus => "'-'".to_string(),
    }
}

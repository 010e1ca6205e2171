//! Expression grammar using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::ParseError;
use crate::filters::FilterRegistry;
use crate::parser::ast::{Expr, PathSegment, Spanned};
use crate::parser::lexer::{lex, Token};
use crate::value::{Number, Value};

/// Helper to extract span range from chumsky's span
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

/// Parse the contents of an expression tag (or a statement's expression
/// clause) into an expression AST.
///
/// `base` is the offset of `content` within the template source; all spans
/// in the result and in any error are rebased onto the template. Filter
/// names are checked against `filters` so a bad template fails at compile
/// time, before any render.
pub(crate) fn parse_expression(
    content: &str,
    base: usize,
    filters: &FilterRegistry,
) -> Result<Spanned<Expr>, ParseError> {
    let tokens = lex_tokens(content, base)?;
    let len = content.len();

    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));
    let token_stream = Stream::from_iter(token_iter).map((len..len).into(), |(t, s): (_, _)| (t, s));

    let mut expr = expr_parser()
        .then_ignore(end())
        .parse(token_stream)
        .into_result()
        .map_err(|errs| first_error(errs, base))?;

    rebase_expr(&mut expr, base);
    check_filters(&expr, filters)?;
    Ok(expr)
}

/// Parse the clause after `for`: `VAR in EXPR`
pub(crate) fn parse_loop_header(
    content: &str,
    base: usize,
    filters: &FilterRegistry,
) -> Result<(String, Spanned<Expr>), ParseError> {
    let tokens = lex_tokens(content, base)?;
    let len = content.len();

    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));
    let token_stream = Stream::from_iter(token_iter).map((len..len).into(), |(t, s): (_, _)| (t, s));

    let header = select! { Token::Ident(s) => s }
        .then_ignore(just(Token::In))
        .then(expr_parser())
        .then_ignore(end());

    let (var, mut expr) = header
        .parse(token_stream)
        .into_result()
        .map_err(|errs| first_error(errs, base))?;

    rebase_expr(&mut expr, base);
    check_filters(&expr, filters)?;
    Ok((var, expr))
}

fn lex_tokens(
    content: &str,
    base: usize,
) -> Result<Vec<(Token, std::ops::Range<usize>)>, ParseError> {
    lex(content).map_err(|span| ParseError::Syntax {
        span: (base + span.start)..(base + span.end),
        message: "unrecognized character".to_string(),
        expected: vec![],
    })
}

fn first_error(errs: Vec<Rich<'_, Token>>, base: usize) -> ParseError {
    errs.into_iter()
        .next()
        .map(|e| ParseError::from_rich(e, base))
        .unwrap_or_else(|| ParseError::Syntax {
            span: base..base,
            message: "invalid expression".to_string(),
            expected: vec![],
        })
}

fn expr_parser<'a, I>() -> impl Parser<'a, I, Spanned<Expr>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(|expr| {
        let ident = select! {
            Token::Ident(s) => s,
        };

        let number = select! {
            Token::Int(n) => Number::Int(n),
            Token::Float(f) => Number::Float(f),
        };

        // Literals: quoted text, numbers (optionally signed), keywords
        let literal = choice((
            select! {
                Token::Str(s) => Value::Text(s),
                Token::True => Value::Bool(true),
                Token::False => Value::Bool(false),
                Token::Null => Value::Null,
            },
            just(Token::Minus)
                .or_not()
                .then(number)
                .map(|(neg, n)| Value::Number(if neg.is_some() { -n } else { n })),
        ))
        .map(Expr::Literal);

        // Path suffixes: `.field` or `[index]`
        let segment = choice((
            just(Token::Dot)
                .ignore_then(ident.clone())
                .map(PathSegment::Field),
            select! { Token::Int(n) => PathSegment::Index(n as usize) }
                .delimited_by(just(Token::BracketOpen), just(Token::BracketClose)),
        ));

        let var = ident
            .clone()
            .then(segment.repeated().collect::<Vec<_>>())
            .map(|(head, path)| Expr::Var { head, path });

        let base = choice((literal, var)).map_with(|e, ex| Spanned::new(e, span_range(&ex.span())));

        // Filter pipeline: `base | name` or `base | name(args)`
        let filter_name = ident.map_with(|s, e| Spanned::new(s, span_range(&e.span())));

        let args = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

        let pipe = just(Token::Pipe)
            .ignore_then(filter_name)
            .then(args.or_not())
            .map_with(|(name, args), e| (name, args.unwrap_or_default(), span_range(&e.span())));

        base.then(pipe.repeated().collect::<Vec<_>>())
            .map(|(first, pipes)| {
                pipes
                    .into_iter()
                    .fold(first, |input, (name, args, pipe_span)| {
                        let span = input.span.start..pipe_span.end;
                        Spanned::new(
                            Expr::Filter {
                                input: Box::new(input),
                                name,
                                args,
                            },
                            span,
                        )
                    })
            })
            .boxed()
    })
}

/// Shift every span in the expression by `base`
fn rebase_expr(expr: &mut Spanned<Expr>, base: usize) {
    expr.span = (expr.span.start + base)..(expr.span.end + base);
    match &mut expr.node {
        Expr::Literal(_) | Expr::Var { .. } => {}
        Expr::Filter { input, name, args } => {
            rebase_expr(input, base);
            name.span = (name.span.start + base)..(name.span.end + base);
            for arg in args {
                rebase_expr(arg, base);
            }
        }
    }
}

/// Reject filter names absent from the registry snapshot
fn check_filters(expr: &Spanned<Expr>, filters: &FilterRegistry) -> Result<(), ParseError> {
    match &expr.node {
        Expr::Literal(_) | Expr::Var { .. } => Ok(()),
        Expr::Filter { input, name, args } => {
            if !filters.contains(&name.node) {
                return Err(ParseError::UnknownFilter {
                    name: name.node.clone(),
                    span: name.span.clone(),
                });
            }
            check_filters(input, filters)?;
            for arg in args {
                check_filters(arg, filters)?;
            }
            Ok(())
        }
    }
}

//! Block parser: assembles the template AST from the segment stream

use std::mem;

use crate::error::{ParseError, Span};
use crate::filters::FilterRegistry;
use crate::parser::ast::{Block, Expr, Node, Spanned};
use crate::parser::grammar::{parse_expression, parse_loop_header};
use crate::parser::lexer::{lex, Token};
use crate::parser::scanner::{Scanner, Segment, SegmentKind};
use crate::TemplateError;

/// An open `if` or `for` awaiting its terminator
enum FrameKind {
    Root,
    If {
        /// Sealed `(condition, body)` branches: the `if` and any `elif`s
        branches: Vec<(Spanned<Expr>, Block)>,
        /// Condition of the branch currently being collected
        pending: Option<Spanned<Expr>>,
        in_else: bool,
        open_span: Span,
    },
    For {
        var: String,
        iterable: Spanned<Expr>,
        open_span: Span,
    },
}

impl FrameKind {
    fn keyword(&self) -> &'static str {
        match self {
            FrameKind::Root => "root",
            FrameKind::If { .. } => "if",
            FrameKind::For { .. } => "for",
        }
    }
}

struct Frame {
    kind: FrameKind,
    nodes: Block,
}

impl Frame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            nodes: Vec::new(),
        }
    }
}

fn top(stack: &mut Vec<Frame>) -> &mut Frame {
    stack.last_mut().expect("stack holds at least the root frame")
}

/// Parse template source into a block AST.
///
/// Consumes the segment stream left to right, keeping an explicit stack of
/// open blocks; the AST is returned only when every block closed cleanly.
pub fn parse(source: &str, filters: &FilterRegistry) -> Result<Block, TemplateError> {
    let mut stack = vec![Frame::new(FrameKind::Root)];

    for segment in Scanner::new(source) {
        let segment = segment?;
        match segment.kind {
            SegmentKind::Text => {
                top(&mut stack).nodes.push(Spanned::new(
                    Node::Text(segment.content.to_string()),
                    segment.span,
                ));
            }
            SegmentKind::Comment => {}
            SegmentKind::Expression => {
                if segment.content.is_empty() {
                    return Err(ParseError::EmptyExpression { span: segment.span }.into());
                }
                let expr = parse_expression(segment.content, segment.content_start, filters)?;
                top(&mut stack)
                    .nodes
                    .push(Spanned::new(Node::Output(expr), segment.span));
            }
            SegmentKind::Statement => {
                statement(&mut stack, &segment, filters)?;
            }
        }
    }

    if stack.len() > 1 {
        let open = top(&mut stack);
        let (keyword, span) = match &open.kind {
            FrameKind::If { open_span, .. } => ("if", open_span.clone()),
            FrameKind::For { open_span, .. } => ("for", open_span.clone()),
            FrameKind::Root => unreachable!("root frame is never above another frame"),
        };
        return Err(ParseError::UnterminatedBlock { keyword, span }.into());
    }

    Ok(stack
        .pop()
        .expect("stack holds at least the root frame")
        .nodes)
}

/// Dispatch a statement segment on its leading keyword
fn statement(
    stack: &mut Vec<Frame>,
    segment: &Segment<'_>,
    filters: &FilterRegistry,
) -> Result<(), TemplateError> {
    if segment.content.is_empty() {
        return Err(ParseError::EmptyStatement {
            span: segment.span.clone(),
        }
        .into());
    }

    let tokens = lex(segment.content).map_err(|span| ParseError::Syntax {
        span: (segment.content_start + span.start)..(segment.content_start + span.end),
        message: "unrecognized character".to_string(),
        expected: vec![],
    })?;
    let Some((first, first_span)) = tokens.first().cloned() else {
        return Err(ParseError::EmptyStatement {
            span: segment.span.clone(),
        }
        .into());
    };

    let rest = &segment.content[first_span.end..];
    let rest_base = segment.content_start + first_span.end;

    match first {
        Token::If => {
            let condition = parse_expression(rest, rest_base, filters)?;
            stack.push(Frame::new(FrameKind::If {
                branches: Vec::new(),
                pending: Some(condition),
                in_else: false,
                open_span: segment.span.clone(),
            }));
        }
        Token::Elif => {
            let condition = parse_expression(rest, rest_base, filters)?;
            let frame = top(stack);
            match &mut frame.kind {
                FrameKind::If {
                    branches,
                    pending,
                    in_else,
                    ..
                } => {
                    if *in_else {
                        return Err(ParseError::AfterElse {
                            keyword: "elif".to_string(),
                            span: segment.span.clone(),
                        }
                        .into());
                    }
                    let sealed = pending.take().expect("open conditional has a pending branch");
                    branches.push((sealed, mem::take(&mut frame.nodes)));
                    *pending = Some(condition);
                }
                _ => {
                    return Err(ParseError::UnexpectedTerminator {
                        keyword: "elif".to_string(),
                        span: segment.span.clone(),
                    }
                    .into())
                }
            }
        }
        Token::Else => {
            reject_trailing(&tokens, "else", segment)?;
            let frame = top(stack);
            match &mut frame.kind {
                FrameKind::If {
                    branches,
                    pending,
                    in_else,
                    ..
                } => {
                    if *in_else {
                        return Err(ParseError::AfterElse {
                            keyword: "else".to_string(),
                            span: segment.span.clone(),
                        }
                        .into());
                    }
                    let sealed = pending.take().expect("open conditional has a pending branch");
                    branches.push((sealed, mem::take(&mut frame.nodes)));
                    *in_else = true;
                }
                _ => {
                    return Err(ParseError::UnexpectedTerminator {
                        keyword: "else".to_string(),
                        span: segment.span.clone(),
                    }
                    .into())
                }
            }
        }
        Token::End | Token::EndIf | Token::EndFor => {
            let keyword = &segment.content[first_span.clone()];
            reject_trailing(&tokens, keyword, segment)?;
            close_block(stack, &first, segment)?;
        }
        Token::For => {
            let (var, iterable) = parse_loop_header(rest, rest_base, filters)?;
            stack.push(Frame::new(FrameKind::For {
                var,
                iterable,
                open_span: segment.span.clone(),
            }));
        }
        _ => {
            return Err(ParseError::UnknownStatement {
                keyword: segment.content[first_span.clone()].to_string(),
                span: (segment.content_start + first_span.start)
                    ..(segment.content_start + first_span.end),
            }
            .into())
        }
    }

    Ok(())
}

fn reject_trailing(
    tokens: &[(Token, std::ops::Range<usize>)],
    keyword: &str,
    segment: &Segment<'_>,
) -> Result<(), ParseError> {
    if let Some((_, span)) = tokens.get(1) {
        return Err(ParseError::Syntax {
            span: (segment.content_start + span.start)..(segment.content_start + span.end),
            message: format!("unexpected tokens after `{}`", keyword),
            expected: vec![],
        });
    }
    Ok(())
}

/// Pop the innermost open block and attach the finished node to its parent
fn close_block(
    stack: &mut Vec<Frame>,
    terminator: &Token,
    segment: &Segment<'_>,
) -> Result<(), TemplateError> {
    if stack.len() == 1 {
        return Err(ParseError::UnexpectedTerminator {
            keyword: segment.content.to_string(),
            span: segment.span.clone(),
        }
        .into());
    }

    // Spelled terminators must match the block they close
    let open_keyword = top(stack).kind.keyword();
    match (terminator, open_keyword) {
        (Token::EndIf, "for") | (Token::EndFor, "if") => {
            return Err(ParseError::MismatchedTerminator {
                found: segment.content.to_string(),
                open: open_keyword,
                span: segment.span.clone(),
            }
            .into());
        }
        _ => {}
    }

    let Frame { kind, nodes } = stack.pop().expect("stack depth checked above");
    let node = match kind {
        FrameKind::Root => unreachable!("root frame is never closed"),
        FrameKind::If {
            mut branches,
            pending,
            in_else,
            open_span,
        } => {
            let full_span = open_span.start..segment.span.end;
            let mut else_block = None;
            if in_else {
                else_block = Some(nodes);
            } else {
                let sealed = pending.expect("open conditional has a pending branch");
                branches.push((sealed, nodes));
            }

            // Fold elif branches into nested conditionals, innermost first
            let mut iter = branches.into_iter().rev();
            let (condition, then_block) =
                iter.next().expect("conditional has at least one branch");
            let mut node = Node::If {
                condition,
                then_block,
                else_block,
            };
            for (condition, then_block) in iter {
                node = Node::If {
                    condition,
                    then_block,
                    else_block: Some(vec![Spanned::new(node, full_span.clone())]),
                };
            }
            Spanned::new(node, full_span)
        }
        FrameKind::For {
            var,
            iterable,
            open_span,
        } => {
            let full_span = open_span.start..segment.span.end;
            Spanned::new(
                Node::For {
                    var,
                    iterable,
                    body: nodes,
                },
                full_span,
            )
        }
    };

    top(stack).nodes.push(node);
    Ok(())
}

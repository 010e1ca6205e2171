//! Segment scanner: splits template text into literal runs and tags

use crate::error::{LexError, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Text,
    Expression,
    Statement,
    Comment,
}

impl SegmentKind {
    fn closer(self) -> &'static str {
        match self {
            SegmentKind::Expression => "}}",
            SegmentKind::Statement => "%}",
            SegmentKind::Comment => "#}",
            SegmentKind::Text => unreachable!("text has no delimiter"),
        }
    }

    fn name(self) -> &'static str {
        match self {
            SegmentKind::Text => "text",
            SegmentKind::Expression => "expression",
            SegmentKind::Statement => "statement",
            SegmentKind::Comment => "comment",
        }
    }
}

/// One piece of the template: a literal text run or a tag
#[derive(Debug, Clone, PartialEq)]
pub struct Segment<'a> {
    pub kind: SegmentKind,
    /// Trimmed tag content; the raw text for a text segment
    pub content: &'a str,
    /// Span of the whole segment, delimiters included
    pub span: Span,
    /// Offset of `content` within the template source
    pub content_start: usize,
}

/// Scans a template left to right, yielding segments lazily.
///
/// The scanner is restartable: `Scanner::new` on the same input always
/// produces the same sequence. After an error it yields nothing further.
pub struct Scanner<'a> {
    source: &'a str,
    cursor: usize,
    failed: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            cursor: 0,
            failed: false,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.source[self.cursor..]
    }

    /// Find the next tag opener in the remaining input, returning its
    /// relative offset and kind.
    ///
    /// A `{` only opens a tag when followed by `{`, `%`, or `#`. When three
    /// or more `{` run together, the innermost pair wins and the extra
    /// braces are literal text.
    fn next_opener(&self) -> Option<(usize, SegmentKind)> {
        let bytes = self.remaining().as_bytes();
        let mut at = 0;
        loop {
            let found = bytes[at..].iter().position(|&b| b == b'{')?;
            let curly = at + found;
            if curly + 1 >= bytes.len() {
                return None;
            }
            let kind = match bytes[curly + 1] {
                b'{' => SegmentKind::Expression,
                b'%' => SegmentKind::Statement,
                b'#' => SegmentKind::Comment,
                _ => {
                    at = curly + 1;
                    continue;
                }
            };
            if kind == SegmentKind::Expression && curly + 2 < bytes.len() && bytes[curly + 2] == b'{'
            {
                at = curly + 1;
                continue;
            }
            return Some((curly, kind));
        }
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Segment<'a>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor >= self.source.len() {
            return None;
        }
        let rest = self.remaining();

        let kind = match self.next_opener() {
            None => {
                let span = self.cursor..self.source.len();
                let segment = Segment {
                    kind: SegmentKind::Text,
                    content: rest,
                    content_start: self.cursor,
                    span,
                };
                self.cursor = self.source.len();
                return Some(Ok(segment));
            }
            Some((0, kind)) => kind,
            Some((at, _)) => {
                let span = self.cursor..self.cursor + at;
                let segment = Segment {
                    kind: SegmentKind::Text,
                    content: &rest[..at],
                    content_start: self.cursor,
                    span,
                };
                self.cursor += at;
                return Some(Ok(segment));
            }
        };

        let interior = &rest[2..];
        let Some(close_at) = interior.find(kind.closer()) else {
            self.failed = true;
            return Some(Err(LexError::UnterminatedTag {
                kind: kind.name(),
                offset: self.cursor,
            }));
        };

        let raw = &interior[..close_at];
        let content = raw.trim();
        let leading = raw.len() - raw.trim_start().len();
        let segment = Segment {
            kind,
            content,
            content_start: self.cursor + 2 + leading,
            span: self.cursor..self.cursor + close_at + 4,
        };
        self.cursor += close_at + 4;
        Some(Ok(segment))
    }
}

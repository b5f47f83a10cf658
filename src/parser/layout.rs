//! Offside-rule pass turning raw line breaks into structural tokens
//!
//! The grammar never sees `LineBreak`. Instead every logical line ends with
//! `Newline`, a deeper indentation opens a block with `Indent` and each
//! closed indentation level emits one `Dedent`. Blank and comment-only lines
//! produce nothing.

use tracing::trace;

use crate::error::ParseError;
use crate::parser::lexer::{lex, Span, Token};

/// Lex `input` and apply the layout rules
pub fn tokenize(input: &str) -> Result<Vec<(Token, Span)>, ParseError> {
    let mut out: Vec<(Token, Span)> = Vec::new();
    let mut indents: Vec<usize> = vec![0];
    let mut pending: Option<(usize, Span)> = None;

    for (tok, span) in lex(input) {
        let tok = tok.map_err(|_| ParseError::Syntax {
            message: format!("Unexpected character '{}'", &input[span.clone()]),
            span: span.clone(),
            expected: vec![],
        })?;

        match tok {
            Token::LineBreak(width) => pending = Some((width, span)),
            tok => {
                let brk = pending.take();
                if out.is_empty() {
                    let line_start = input[..span.start].rfind('\n').map_or(0, |i| i + 1);
                    if span.start > line_start {
                        return Err(unexpected_indent(span));
                    }
                } else if let Some((width, brk)) = brk {
                    line_break(&mut out, &mut indents, width, brk, span.clone())?;
                }
                out.push((tok, span));
            }
        }
    }

    if !out.is_empty() {
        let end = input.len();
        out.push((Token::Newline, end..end));
        while indents.len() > 1 {
            indents.pop();
            out.push((Token::Dedent, end..end));
        }
    }

    trace!(tokens = out.len(), "tokenized input");
    Ok(out)
}

fn line_break(
    out: &mut Vec<(Token, Span)>,
    indents: &mut Vec<usize>,
    width: usize,
    brk: Span,
    next: Span,
) -> Result<(), ParseError> {
    out.push((Token::Newline, brk));

    let current = indents.last().copied().unwrap_or(0);
    if width > current {
        indents.push(width);
        out.push((Token::Indent, next.start..next.start));
        return Ok(());
    }

    while width < indents.last().copied().unwrap_or(0) {
        indents.pop();
        out.push((Token::Dedent, next.start..next.start));
    }

    if width != indents.last().copied().unwrap_or(0) {
        return Err(ParseError::Syntax {
            span: next,
            message: "Unindent does not match any outer indentation level".to_string(),
            expected: vec![],
        });
    }
    Ok(())
}

fn unexpected_indent(span: Span) -> ParseError {
    ParseError::Syntax {
        span,
        message: "Unexpected indent".to_string(),
        expected: vec![],
    }
}

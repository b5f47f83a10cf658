//! Error types for parsing and validation

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::parser::lexer::Token;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

impl ParseError {
    /// Source span of the error
    pub fn span(&self) -> &Span {
        match self {
            ParseError::Syntax { span, .. } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        match self {
            ParseError::Syntax {
                span,
                message,
                expected,
            } => {
                let expected_str = if expected.is_empty() {
                    String::new()
                } else {
                    format!("\nExpected: {}", expected.join(", "))
                };
                render_report(
                    source,
                    filename,
                    span.clone(),
                    message,
                    &format!("{}{}", message, expected_str),
                    None,
                )
            }
        }
    }
}

/// Render a single-label ariadne error report to a string
pub(crate) fn render_report(
    source: &str,
    filename: &str,
    span: Span,
    message: &str,
    label: &str,
    note: Option<String>,
) -> String {
    render(ReportKind::Error, Color::Red, source, filename, span, message, label, note)
}

/// Same as [`render_report`] for non-fatal diagnostics
pub(crate) fn render_warning(source: &str, filename: &str, span: Span, message: &str) -> String {
    render(ReportKind::Warning, Color::Yellow, source, filename, span, message, message, None)
}

#[allow(clippy::too_many_arguments)]
fn render(
    kind: ReportKind<'_>,
    color: Color,
    source: &str,
    filename: &str,
    span: Span,
    message: &str,
    label: &str,
    note: Option<String>,
) -> String {
    let mut buf = Vec::new();
    let mut report = Report::build(kind, filename, span.start)
        .with_config(Config::default().with_color(false))
        .with_message(message)
        .with_label(
            Label::new((filename, span))
                .with_message(label)
                .with_color(color),
        );
    if let Some(note) = note {
        report = report.with_note(note);
    }
    // Writing into a Vec cannot fail; fall back to the bare message if it does
    if report
        .finish()
        .write((filename, Source::from(source)), &mut buf)
        .is_err()
    {
        return message.to_string();
    }
    String::from_utf8_lossy(&buf).into_owned()
}

impl<'a> From<chumsky::error::Rich<'a, Token>> for ParseError {
    fn from(err: chumsky::error::Rich<'a, Token>) -> Self {
        use chumsky::error::RichReason;

        // Check if we found a reserved keyword where a name was expected
        let found_token = err.found().cloned();
        let expects_name = err.expected().any(|e| match e {
            chumsky::error::RichPattern::Token(tok) => matches!(**tok, Token::Ident(_)),
            chumsky::error::RichPattern::Label(label) => label.to_string() == "name",
            _ => false,
        });

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => match &found_token {
                Some(tok) if tok.is_keyword() && expects_name => format!(
                    "Cannot use '{}' as a name - it's a reserved keyword",
                    tok
                ),
                Some(Token::Indent) => "Unexpected indent".to_string(),
                _ => {
                    let found_str = match found {
                        Some(tok) => format_token(tok),
                        None => "end of input".to_string(),
                    };
                    format!("Unexpected {}", found_str)
                }
            },
            RichReason::Custom(msg) => msg.to_string(),
        };

        // Format expected tokens nicely
        let mut expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of input".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("name '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any token".to_string()),
                chumsky::error::RichPattern::SomethingElse => None,
            })
            .collect();
        expected.sort();
        expected.dedup();

        ParseError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &Token) -> String {
    match tok {
        Token::Ident(s) => format!("name '{}'", s),
        Token::String(s) => format!("string \"{}\"", s),
        Token::Number(n) => format!("number {}", n),
        Token::Newline | Token::LineBreak(_) => "end of line".to_string(),
        Token::Indent => "indent".to_string(),
        Token::Dedent => "dedent".to_string(),
        Token::Tilde
        | Token::Equals
        | Token::Colon
        | Token::Semicolon
        | Token::Comma
        | Token::Dot
        | Token::Minus => format!("'{}'", tok),
        other if other.is_keyword() => format!("keyword '{}'", other),
        other => format!("{:?}", other),
    }
}

//! Lexer for the circuit description language using logos

use std::fmt;

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Column width of the indentation following a line break
fn indent_width(lex: &mut logos::Lexer<Token>) -> usize {
    lex.slice()
        .chars()
        .skip_while(|c| *c == '\n')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Strip the surrounding quotes from a string literal
fn unquote(lex: &mut logos::Lexer<Token>) -> String {
    let s = lex.slice();
    s[1..s.len() - 1].to_string()
}

#[derive(Logos, Debug, Clone, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r]+")]
pub enum Token {
    // Import keywords
    #[token("import")]
    Import,
    #[token("from")]
    From,

    // Block keywords
    #[token("component")]
    Component,
    #[token("module")]
    Module,
    #[token("interface")]
    Interface,

    // Terminal keywords
    #[token("signal")]
    Signal,
    #[token("pin")]
    Pin,
    #[token("private")]
    Private,

    // Statement keywords
    #[token("new")]
    New,
    #[token("pass")]
    Pass,
    #[token("True")]
    True,
    #[token("False")]
    False,

    // Operators and delimiters
    #[token("~")]
    Tilde,
    #[token("=")]
    Equals,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("-")]
    Minus,

    // Literals - identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r#""([^"\\\n]|\\.)*""#, unquote)]
    #[regex(r"'([^'\\\n]|\\.)*'", unquote)]
    String(String),

    /// Numbers keep their source text, including any unit suffix (`10kohm`)
    #[regex(r"[0-9]+(\.[0-9]+)?[a-zA-Z%]*", |lex| lex.slice().to_string())]
    Number(String),

    /// Raw line break carrying the indentation width of the following line.
    /// Replaced by `Newline`/`Indent`/`Dedent` in the layout pass.
    #[regex(r"\n[ \t]*", indent_width)]
    LineBreak(usize),

    // Comments (skip)
    #[regex(r"#[^\n]*", logos::skip)]
    Comment,

    // Structural tokens produced by the layout pass, never by the lexer
    Newline,
    Indent,
    Dedent,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Import => write!(f, "import"),
            Token::From => write!(f, "from"),
            Token::Component => write!(f, "component"),
            Token::Module => write!(f, "module"),
            Token::Interface => write!(f, "interface"),
            Token::Signal => write!(f, "signal"),
            Token::Pin => write!(f, "pin"),
            Token::Private => write!(f, "private"),
            Token::New => write!(f, "new"),
            Token::Pass => write!(f, "pass"),
            Token::True => write!(f, "True"),
            Token::False => write!(f, "False"),
            Token::Tilde => write!(f, "~"),
            Token::Equals => write!(f, "="),
            Token::Colon => write!(f, ":"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Minus => write!(f, "-"),
            Token::Ident(s) => write!(f, "{}", s),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::Number(n) => write!(f, "{}", n),
            Token::LineBreak(_) | Token::Newline => write!(f, "end of line"),
            Token::Comment => write!(f, "comment"),
            Token::Indent => write!(f, "indent"),
            Token::Dedent => write!(f, "dedent"),
        }
    }
}

impl Token {
    /// Keywords that cannot be used where a name is expected
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::Import
                | Token::From
                | Token::Component
                | Token::Module
                | Token::Interface
                | Token::Signal
                | Token::Pin
                | Token::Private
                | Token::New
                | Token::Pass
                | Token::True
                | Token::False
        )
    }
}

/// Lex input string into raw tokens with spans.
///
/// Unrecognised characters are yielded as `Err(())` so the layout pass can
/// report them.
pub fn lex(input: &str) -> impl Iterator<Item = (Result<Token, ()>, Span)> + '_ {
    Token::lexer(input).spanned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        lex(input).filter_map(|(t, _)| t.ok()).collect()
    }

    #[test]
    fn test_block_keywords() {
        assert_eq!(
            tokens("component module interface"),
            vec![Token::Component, Token::Module, Token::Interface]
        );
    }

    #[test]
    fn test_terminal_keywords() {
        assert_eq!(
            tokens("private signal pin"),
            vec![Token::Private, Token::Signal, Token::Pin]
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(
            tokens("signals pinout newer"),
            vec![
                Token::Ident("signals".to_string()),
                Token::Ident("pinout".to_string()),
                Token::Ident("newer".to_string()),
            ]
        );
    }

    #[test]
    fn test_connection_statement() {
        assert_eq!(
            tokens("xin ~ crystal.xin"),
            vec![
                Token::Ident("xin".to_string()),
                Token::Tilde,
                Token::Ident("crystal".to_string()),
                Token::Dot,
                Token::Ident("xin".to_string()),
            ]
        );
    }

    #[test]
    fn test_strings_both_quotes() {
        assert_eq!(
            tokens(r#""0402" 'SMD'"#),
            vec![
                Token::String("0402".to_string()),
                Token::String("SMD".to_string())
            ]
        );
    }

    #[test]
    fn test_numbers_keep_text_and_units() {
        assert_eq!(
            tokens("1 2.5 10kohm 12MHz"),
            vec![
                Token::Number("1".to_string()),
                Token::Number("2.5".to_string()),
                Token::Number("10kohm".to_string()),
                Token::Number("12MHz".to_string()),
            ]
        );
    }

    #[test]
    fn test_numeric_path_segment() {
        assert_eq!(
            tokens("r1.1"),
            vec![
                Token::Ident("r1".to_string()),
                Token::Dot,
                Token::Number("1".to_string()),
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            tokens("signal a # trailing comment"),
            vec![Token::Signal, Token::Ident("a".to_string())]
        );
    }

    #[test]
    fn test_line_break_indent_width() {
        assert_eq!(
            tokens("module M:\n    signal a\n\tsignal b"),
            vec![
                Token::Module,
                Token::Ident("M".to_string()),
                Token::Colon,
                Token::LineBreak(4),
                Token::Signal,
                Token::Ident("a".to_string()),
                Token::LineBreak(4),
                Token::Signal,
                Token::Ident("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_semicolons_and_assignment() {
        assert_eq!(
            tokens("c = new Cap; c.value = -1"),
            vec![
                Token::Ident("c".to_string()),
                Token::Equals,
                Token::New,
                Token::Ident("Cap".to_string()),
                Token::Semicolon,
                Token::Ident("c".to_string()),
                Token::Dot,
                Token::Ident("value".to_string()),
                Token::Equals,
                Token::Minus,
                Token::Number("1".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_character_is_error() {
        let results: Vec<_> = lex("a $ b").collect();
        assert_eq!(results.len(), 3);
        assert!(results[1].0.is_err());
        assert_eq!(results[1].1, 2..3);
    }

    #[test]
    fn test_display_round_trips_keywords() {
        for tok in [Token::Import, Token::New, Token::True, Token::Tilde] {
            let text = tok.to_string();
            assert_eq!(tokens(&text), vec![tok]);
        }
    }
}

//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use tracing::debug;

use crate::parser::ast::*;
use crate::parser::layout::tokenize;
use crate::parser::lexer::Token;

/// Parse circuit description source into an AST
pub fn parse(input: &str) -> Result<File, Vec<crate::ParseError>> {
    let len = input.len();

    // Lex and apply the indentation rules before parsing
    let tokens = tokenize(input).map_err(|e| vec![e])?;
    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    let result: Result<File, Vec<crate::ParseError>> = file_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect::<Vec<_>>());

    match &result {
        Ok(file) => debug!(statements = file.statements.len(), "parsed circuit file"),
        Err(errs) => debug!(errors = errs.len(), "circuit file failed to parse"),
    }
    result
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn file_parser<'a, I>() -> impl Parser<'a, I, File, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    // Basic token parsers
    let identifier = select! {
        Token::Ident(s) => Identifier::new(s),
    }
    .map_with(|id, e| Spanned::new(id, span_range(&e.span())))
    .labelled("name");

    let string_literal = select! {
        Token::String(s) => s,
    }
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    let number = select! {
        Token::Number(n) => n,
    };

    // Pins and path segments may be numeric: `pin 1`, `r1.1`
    let numeric_name = number
        .clone()
        .map_with(|n, e| Spanned::new(Identifier::new(n), span_range(&e.span())));
    let segment = choice((identifier.clone(), numeric_name.clone()));

    // Dotted reference: name { "." segment }
    let ref_path = identifier
        .clone()
        .then(
            just(Token::Dot)
                .ignore_then(segment)
                .repeated()
                .collect::<Vec<_>>(),
        )
        .map_with(|(head, rest), e| {
            let mut segments = Vec::with_capacity(rest.len() + 1);
            segments.push(head);
            segments.extend(rest);
            Spanned::new(RefPath { segments }, span_range(&e.span()))
        });

    // Terminal declaration: [private] signal name | [private] pin name
    let terminal_decl = just(Token::Private)
        .or_not()
        .then(choice((
            just(Token::Signal)
                .ignore_then(identifier.clone())
                .map(|name| (TerminalKind::Signal, name)),
            just(Token::Pin)
                .ignore_then(choice((identifier.clone(), numeric_name)))
                .map(|name| (TerminalKind::Pin, name)),
        )))
        .map(|(private, (kind, name))| TerminalDecl {
            kind,
            name,
            private: private.is_some(),
        });

    // Either side of a connection
    let connectable = choice((
        terminal_decl.clone().map(Connectable::Declare),
        ref_path.clone().map(|p| Connectable::Ref(p.node)),
    ))
    .map_with(|c, e| Spanned::new(c, span_range(&e.span())));

    let connect_stmt = connectable
        .clone()
        .then_ignore(just(Token::Tilde))
        .then(connectable)
        .map(|(left, right)| ConnectDecl { left, right });

    let instance_stmt = ref_path
        .clone()
        .then_ignore(just(Token::Equals))
        .then_ignore(just(Token::New))
        .then(identifier.clone())
        .map(|(target, type_name)| InstanceDecl { target, type_name });

    // Literal values: strings, (negative) numbers and booleans
    let value = choice((
        string_literal.clone().map(|s| Value::String(s.node)),
        just(Token::Minus)
            .or_not()
            .then(number)
            .map(|(neg, n)| {
                if neg.is_some() {
                    Value::Number(format!("-{}", n))
                } else {
                    Value::Number(n)
                }
            }),
        just(Token::True).to(Value::Bool(true)),
        just(Token::False).to(Value::Bool(false)),
    ))
    .map_with(|v, e| Spanned::new(v, span_range(&e.span())));

    let assign_stmt = ref_path
        .clone()
        .then_ignore(just(Token::Equals))
        .then(value)
        .map(|(target, value)| AssignDecl { target, value });

    // Statements allowed inside a block body
    // Note: Order matters! connect_stmt must come before terminal_decl and the
    // assignments since all of them can start with the same tokens.
    let simple_stmt = choice((
        connect_stmt.map(Statement::Connect),
        instance_stmt.map(Statement::Instance),
        assign_stmt.map(Statement::Assign),
        terminal_decl.map(Statement::Terminal),
        just(Token::Pass).to(Statement::Pass),
    ))
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())))
    .boxed();

    // One logical line: stmt { ";" stmt } [";"] NEWLINE
    let line = simple_stmt
        .separated_by(just(Token::Semicolon))
        .at_least(1)
        .allow_trailing()
        .collect::<Vec<_>>()
        .then_ignore(just(Token::Newline));

    // Block body: inline after the colon, or an indented run of lines
    let suite = choice((
        just(Token::Newline)
            .ignore_then(just(Token::Indent))
            .ignore_then(line.clone().repeated().at_least(1).collect::<Vec<_>>())
            .then_ignore(just(Token::Dedent))
            .map(|lines| lines.into_iter().flatten().collect::<Vec<_>>()),
        line,
    ));

    let block_kind = choice((
        just(Token::Component).to(BlockKind::Component),
        just(Token::Module).to(BlockKind::Module),
        just(Token::Interface).to(BlockKind::Interface),
    ))
    .map_with(|k, e| Spanned::new(k, span_range(&e.span())));

    let block_decl = block_kind
        .then(identifier.clone())
        .then_ignore(just(Token::Colon))
        .then(suite)
        .map(|((kind, name), body)| BlockDecl { kind, name, body });

    // Imports: `import A, B` or `from "file.ato" import A, B`
    let name_list = identifier
        .clone()
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>();

    let import_decl = choice((
        just(Token::Import)
            .ignore_then(name_list.clone())
            .map(|names| ImportDecl {
                source: None,
                names,
            }),
        just(Token::From)
            .ignore_then(string_literal)
            .then_ignore(just(Token::Import))
            .then(name_list)
            .map(|(source, names)| ImportDecl {
                source: Some(source),
                names,
            }),
    ));

    let top_level = choice((
        import_decl
            .map_with(|i, e| Spanned::new(Statement::Import(i), span_range(&e.span())))
            .then_ignore(just(Token::Newline)),
        block_decl.map_with(|b, e| Spanned::new(Statement::Block(b), span_range(&e.span()))),
    ));

    // A file is a list of imports and blocks
    top_level
        .repeated()
        .collect()
        .then_ignore(end())
        .map(|statements| File { statements })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_block(file: &File) -> &BlockDecl {
        assert_eq!(file.statements.len(), 1);
        match &file.statements[0].node {
            Statement::Block(b) => b,
            other => panic!("Expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty() {
        let file = parse("").expect("Should parse");
        assert!(file.statements.is_empty());
    }

    #[test]
    fn test_parse_bare_import() {
        let file = parse("import Crystal, Capacitor").expect("Should parse");
        match &file.statements[0].node {
            Statement::Import(i) => {
                assert!(i.source.is_none());
                assert_eq!(i.names.len(), 2);
                assert_eq!(i.names[0].node.as_str(), "Crystal");
                assert_eq!(i.names[1].node.as_str(), "Capacitor");
            }
            other => panic!("Expected import, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_from_import() {
        let file = parse(r#"from "parts/crystal.ato" import Crystal"#).expect("Should parse");
        match &file.statements[0].node {
            Statement::Import(i) => {
                assert_eq!(i.source.as_ref().unwrap().node, "parts/crystal.ato");
                assert_eq!(i.names[0].node.as_str(), "Crystal");
            }
            other => panic!("Expected import, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_inline_component() {
        let file = parse("component Crystal: signal xin; signal xout; signal gnd")
            .expect("Should parse");
        let block = only_block(&file);
        assert_eq!(block.kind.node, BlockKind::Component);
        assert_eq!(block.name.node.as_str(), "Crystal");
        assert_eq!(block.body.len(), 3);
        for stmt in &block.body {
            assert!(matches!(
                &stmt.node,
                Statement::Terminal(TerminalDecl {
                    kind: TerminalKind::Signal,
                    private: false,
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_parse_indented_module() {
        let input = r#"
module Oscillator:
    signal xin
    signal xout
    crystal = new Crystal
    crystal.package = "0402"
    xin ~ crystal.xin
"#;
        let file = parse(input).expect("Should parse");
        let block = only_block(&file);
        assert_eq!(block.kind.node, BlockKind::Module);
        assert_eq!(block.body.len(), 5);

        match &block.body[2].node {
            Statement::Instance(inst) => {
                assert_eq!(inst.target.node.to_string(), "crystal");
                assert_eq!(inst.type_name.node.as_str(), "Crystal");
            }
            other => panic!("Expected instance, got {:?}", other),
        }
        match &block.body[3].node {
            Statement::Assign(a) => {
                assert_eq!(a.target.node.to_string(), "crystal.package");
                assert_eq!(a.value.node, Value::String("0402".to_string()));
            }
            other => panic!("Expected assignment, got {:?}", other),
        }
        match &block.body[4].node {
            Statement::Connect(c) => {
                match &c.left.node {
                    Connectable::Ref(p) => assert_eq!(p.to_string(), "xin"),
                    other => panic!("Expected ref, got {:?}", other),
                }
                match &c.right.node {
                    Connectable::Ref(p) => assert_eq!(p.to_string(), "crystal.xin"),
                    other => panic!("Expected ref, got {:?}", other),
                }
            }
            other => panic!("Expected connection, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_semicolon_lines_in_indented_block() {
        let input = "module M:\n    signal a; signal b;\n    a ~ b\n";
        let file = parse(input).expect("Should parse");
        assert_eq!(only_block(&file).body.len(), 3);
    }

    #[test]
    fn test_parse_inline_terminal_in_connection() {
        let file = parse("component C:\n    signal gnd ~ pin 2\n").expect("Should parse");
        let block = only_block(&file);
        match &block.body[0].node {
            Statement::Connect(c) => {
                match &c.left.node {
                    Connectable::Declare(t) => {
                        assert_eq!(t.kind, TerminalKind::Signal);
                        assert_eq!(t.name.node.as_str(), "gnd");
                    }
                    other => panic!("Expected declaration, got {:?}", other),
                }
                match &c.right.node {
                    Connectable::Declare(t) => {
                        assert_eq!(t.kind, TerminalKind::Pin);
                        assert_eq!(t.name.node.as_str(), "2");
                    }
                    other => panic!("Expected declaration, got {:?}", other),
                }
            }
            other => panic!("Expected connection, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_private_signal() {
        let file = parse("module M: private signal internal").expect("Should parse");
        match &only_block(&file).body[0].node {
            Statement::Terminal(t) => assert!(t.private),
            other => panic!("Expected terminal, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_values() {
        let input = "module M:\n    r.value = 10kohm\n    r.offset = -3\n    r.dnp = False\n";
        let file = parse(input).expect("Should parse");
        let values: Vec<Value> = only_block(&file)
            .body
            .iter()
            .map(|s| match &s.node {
                Statement::Assign(a) => a.value.node.clone(),
                other => panic!("Expected assignment, got {:?}", other),
            })
            .collect();
        assert_eq!(
            values,
            vec![
                Value::Number("10kohm".to_string()),
                Value::Number("-3".to_string()),
                Value::Bool(false),
            ]
        );
    }

    #[test]
    fn test_parse_numeric_path_segment() {
        let file = parse("module M: r1.1 ~ r2.2").expect("Should parse");
        match &only_block(&file).body[0].node {
            Statement::Connect(c) => match &c.left.node {
                Connectable::Ref(p) => assert_eq!(p.names(), vec!["r1", "1"]),
                other => panic!("Expected ref, got {:?}", other),
            },
            other => panic!("Expected connection, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_pass() {
        let file = parse("module Empty:\n    pass\n").expect("Should parse");
        assert_eq!(only_block(&file).body[0].node, Statement::Pass);
    }

    #[test]
    fn test_parse_multiple_blocks() {
        let input = r#"
import Capacitor

component Crystal:
    signal xin
    signal xout

module Oscillator:
    crystal = new Crystal
"#;
        let file = parse(input).expect("Should parse");
        assert_eq!(file.statements.len(), 3);
        assert_eq!(file.imports().count(), 1);
        assert_eq!(file.blocks().count(), 2);
    }

    #[test]
    fn test_error_missing_colon() {
        let errs = parse("module M\n    signal a\n").unwrap_err();
        assert!(!errs.is_empty());
    }

    #[test]
    fn test_error_keyword_as_name() {
        let errs = parse("module M: signal module").unwrap_err();
        let msg = errs[0].to_string();
        assert!(msg.contains("reserved keyword"), "got: {}", msg);
    }

    #[test]
    fn test_error_statement_outside_block() {
        let errs = parse("signal a").unwrap_err();
        assert!(!errs.is_empty());
    }

    #[test]
    fn test_error_nested_indent() {
        let errs = parse("module M:\n    signal a\n        signal b\n").unwrap_err();
        assert!(errs[0].to_string().contains("indent"), "got: {}", errs[0]);
    }

    #[test]
    fn test_error_spans_point_into_source() {
        let input = "module M:\n    a ~ ~\n";
        let errs = parse(input).unwrap_err();
        let span = errs[0].span();
        assert!(span.start >= input.find('~').unwrap());
        assert!(span.end <= input.len());
    }
}

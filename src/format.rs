//! Canonical serializer for circuit files
//!
//! Imports come first, blocks follow separated by blank lines and every body
//! statement sits on its own line indented by four spaces. Comments are not
//! part of the AST and are dropped.

use std::fmt::Write;

use crate::error::ParseError;
use crate::parser::ast::*;
use crate::parser::parse;

const INDENT: &str = "    ";

/// Render a parsed file in canonical form
pub fn format_file(file: &File) -> String {
    let mut out = String::new();

    let mut has_imports = false;
    for import in file.imports() {
        out.push_str(&format_import(import));
        out.push('\n');
        has_imports = true;
    }

    for (i, block) in file.blocks().enumerate() {
        if i > 0 || has_imports {
            out.push('\n');
        }
        let _ = writeln!(out, "{} {}:", block.kind.node, block.name.node);
        for stmt in &block.body {
            if let Some(line) = format_statement(&stmt.node) {
                out.push_str(INDENT);
                out.push_str(&line);
                out.push('\n');
            }
        }
    }
    out
}

/// Parse and re-render source text
pub fn format_source(source: &str) -> Result<String, Vec<ParseError>> {
    parse(source).map(|file| format_file(&file))
}

fn format_import(import: &ImportDecl) -> String {
    let names = import
        .names
        .iter()
        .map(|n| n.node.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    match &import.source {
        Some(source) => format!(
            "from {} import {}",
            Value::String(source.node.clone()),
            names
        ),
        None => format!("import {}", names),
    }
}

fn format_terminal(t: &TerminalDecl) -> String {
    let private = if t.private { "private " } else { "" };
    format!("{}{} {}", private, t.kind.keyword(), t.name.node)
}

fn format_connectable(c: &Connectable) -> String {
    match c {
        Connectable::Ref(path) => path.to_string(),
        Connectable::Declare(t) => format_terminal(t),
    }
}

fn format_statement(stmt: &Statement) -> Option<String> {
    let line = match stmt {
        Statement::Terminal(t) => format_terminal(t),
        Statement::Instance(i) => format!("{} = new {}", i.target.node, i.type_name.node),
        Statement::Assign(a) => format!("{} = {}", a.target.node, a.value.node),
        Statement::Connect(c) => format!(
            "{} ~ {}",
            format_connectable(&c.left.node),
            format_connectable(&c.right.node)
        ),
        Statement::Pass => "pass".to_string(),
        // Only appear at file level
        Statement::Import(_) | Statement::Block(_) => return None,
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{Design, DesignOptions};
    use pretty_assertions::assert_eq;

    const MESSY: &str = r#"
# crystal oscillator
component Crystal:
  signal xin;signal xout
  signal gnd   # case
import Capacitor
module Oscillator:
        signal xin; signal xout; signal gnd
        crystal=new Crystal
        crystal.package='0402'
        crystal.frequency = 12MHz
        load_cap_1 = new Capacitor; load_cap_2 = new Capacitor
        xin ~ crystal.xin; crystal.xin ~ load_cap_1.p1
        xout~crystal.xout
        gnd ~ crystal.gnd; gnd ~ load_cap_1.p2
        signal vcc ~ pin 1
        private signal test
        enabled = True
"#;

    #[test]
    fn test_canonical_output() {
        insta::assert_snapshot!(format_source(MESSY).unwrap(), @r#"
        import Capacitor

        component Crystal:
            signal xin
            signal xout
            signal gnd

        module Oscillator:
            signal xin
            signal xout
            signal gnd
            crystal = new Crystal
            crystal.package = "0402"
            crystal.frequency = 12MHz
            load_cap_1 = new Capacitor
            load_cap_2 = new Capacitor
            xin ~ crystal.xin
            crystal.xin ~ load_cap_1.p1
            xout ~ crystal.xout
            gnd ~ crystal.gnd
            gnd ~ load_cap_1.p2
            signal vcc ~ pin 1
            private signal test
            enabled = True
        "#);
    }

    #[test]
    fn test_idempotent() {
        let once = format_source(MESSY).unwrap();
        let twice = format_source(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_round_trip_preserves_design() {
        let options = DesignOptions::default();
        let before = Design::build(&parse(MESSY).unwrap(), &options).unwrap();
        let formatted = format_source(MESSY).unwrap();
        let after = Design::build(&parse(&formatted).unwrap(), &options).unwrap();

        for ((_, a), (_, b)) in before.blocks().zip(after.blocks()) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.kind, b.kind);
            let names = |d: &crate::design::BlockDef| {
                d.member_names().map(String::from).collect::<Vec<_>>()
            };
            assert_eq!(names(a), names(b));
            let values = |d: &crate::design::BlockDef| {
                d.attributes
                    .iter()
                    .map(|x| (x.target.clone(), x.value.clone()))
                    .collect::<Vec<_>>()
            };
            assert_eq!(values(a), values(b));
            let edges = |d: &crate::design::BlockDef| {
                let mut e: Vec<String> = d
                    .connections
                    .iter()
                    .map(|c| {
                        let (x, y) = c.key();
                        format!("{} ~ {}", x, y)
                    })
                    .collect();
                e.sort();
                e
            };
            assert_eq!(edges(a), edges(b));
        }
        assert_eq!(before.blocks().count(), after.blocks().count());
    }

    #[test]
    fn test_from_import_and_strings() {
        let out = format_source("from \"parts/crystal.ato\" import Crystal, Cap\nmodule M:\n    x = 'say \"hi\"'\n    y = -3.3V\n").unwrap();
        assert_eq!(
            out,
            "from \"parts/crystal.ato\" import Crystal, Cap\n\nmodule M:\n    x = 'say \"hi\"'\n    y = -3.3V\n"
        );
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(format_source("# nothing here\n").unwrap(), "");
    }

    #[test]
    fn test_pass_body() {
        assert_eq!(
            format_source("component A: pass").unwrap(),
            "component A:\n    pass\n"
        );
    }
}

//! Lint engine for detecting suspicious but legal circuits.
//!
//! Runs after a design builds and its root modules elaborate. Warnings cover
//! signals nothing connects to, component terminals left floating, instances
//! that are never wired up and connections from a terminal to itself.

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use crate::config::LintConfig;
use crate::design::{BlockId, Design, Endpoint, TypeRef};
use crate::error::render_warning;
use crate::netlist::Netlist;
use crate::parser::ast::{BlockKind, Span, TerminalKind};

/// A lint warning about a circuit
#[derive(Debug, Clone, PartialEq)]
pub struct LintWarning {
    pub category: LintCategory,
    pub message: String,
    /// Location in the entry file, when the warning has one
    pub span: Option<Span>,
}

impl LintWarning {
    /// Format the warning with source context when it has a span
    pub fn format(&self, source: &str, filename: &str) -> String {
        let message = format!("[{}] {}", self.category, self.message);
        match &self.span {
            Some(span) => render_warning(source, filename, span.clone(), &message),
            None => format!("Warning: {}\n", message),
        }
    }
}

impl fmt::Display for LintWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.message)
    }
}

/// Category of lint warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LintCategory {
    Unused,
    Floating,
    UnconnectedInstance,
    SelfConnection,
}

impl fmt::Display for LintCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintCategory::Unused => write!(f, "unused"),
            LintCategory::Floating => write!(f, "floating"),
            LintCategory::UnconnectedInstance => write!(f, "unconnected-instance"),
            LintCategory::SelfConnection => write!(f, "self-connection"),
        }
    }
}

/// Run the enabled lint checks on a design and its elaborated netlists.
pub fn check(design: &Design, netlists: &[Netlist], config: &LintConfig) -> Vec<LintWarning> {
    let mut warnings = Vec::new();
    if config.unused {
        check_unused(design, &mut warnings);
    }
    if config.floating {
        check_floating(netlists, &mut warnings);
    }
    if config.unconnected_instance {
        check_instances(design, &mut warnings);
    }
    if config.self_connection {
        check_self_connections(design, &mut warnings);
    }
    debug!(warnings = warnings.len(), "lint finished");
    warnings
}

/// Terminals that appear as a connection endpoint anywhere in the design
fn connected_terminals(design: &Design) -> HashSet<(BlockId, &str)> {
    let mut used = HashSet::new();
    for (id, block) in design.blocks() {
        for conn in &block.connections {
            for end in [&conn.a, &conn.b] {
                if let Ok(Endpoint::Terminal { block, terminal }) = design.resolve(id, end.segments())
                {
                    used.insert((block, terminal.name.as_str()));
                }
            }
        }
    }
    used
}

fn check_unused(design: &Design, warnings: &mut Vec<LintWarning>) {
    let used = connected_terminals(design);
    for (id, block) in design.entry_blocks() {
        if block.kind != BlockKind::Module {
            continue;
        }
        for t in &block.terminals {
            if t.kind == TerminalKind::Signal && !used.contains(&(id, t.name.as_str())) {
                warnings.push(LintWarning {
                    category: LintCategory::Unused,
                    message: format!(
                        "signal '{}' in module '{}' is never connected",
                        t.name, block.name
                    ),
                    span: Some(t.span.clone()),
                });
            }
        }
    }
}

fn check_floating(netlists: &[Netlist], warnings: &mut Vec<LintWarning>) {
    for netlist in netlists {
        for net in netlist {
            let [t] = net.terminals.as_slice() else {
                continue;
            };
            if t.depth() > 0 && t.owner == Some(BlockKind::Component) {
                warnings.push(LintWarning {
                    category: LintCategory::Floating,
                    message: format!(
                        "component terminal '{}' in '{}' is not connected to anything",
                        t.path,
                        netlist.root()
                    ),
                    span: None,
                });
            }
        }
    }
}

/// Instances that some connection path in the design passes through,
/// keyed by the block declaring them
fn wired_instances(design: &Design) -> HashSet<(BlockId, &str)> {
    let mut wired = HashSet::new();
    for (id, block) in design.blocks() {
        for end in block.connections.iter().flat_map(|c| [&c.a, &c.b]) {
            let segments = end.segments();
            let mut current = id;
            for name in &segments[..segments.len().saturating_sub(1)] {
                let Some(inst) = design.block(current).instance(name) else {
                    break;
                };
                wired.insert((current, inst.name.as_str()));
                match inst.ty {
                    TypeRef::Block(child) => current = child,
                    TypeRef::Opaque => break,
                }
            }
        }
    }
    wired
}

fn check_instances(design: &Design, warnings: &mut Vec<LintWarning>) {
    let wired = wired_instances(design);
    for (id, block) in design.entry_blocks() {
        for inst in &block.instances {
            if !wired.contains(&(id, inst.name.as_str())) {
                warnings.push(LintWarning {
                    category: LintCategory::UnconnectedInstance,
                    message: format!(
                        "instance '{}' of '{}' has no connections",
                        inst.name, inst.type_name
                    ),
                    span: Some(inst.span.clone()),
                });
            }
        }
    }
}

fn check_self_connections(design: &Design, warnings: &mut Vec<LintWarning>) {
    for (_, block) in design.entry_blocks() {
        for conn in block.connections.iter().filter(|c| c.is_self_connection()) {
            warnings.push(LintWarning {
                category: LintCategory::SelfConnection,
                message: format!("'{}' is connected to itself", conn.a),
                span: Some(conn.span.clone()),
            });
        }
    }
}

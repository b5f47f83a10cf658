//! Hierarchical elaboration and net closure
//!
//! A root module is flattened into dotted terminal paths (`crystal.xin`,
//! `osc.crystal.xin`). Every declared connection becomes a union in a
//! union-find over those paths, and the resulting classes are the nets.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use petgraph::unionfind::UnionFind;
use thiserror::Error;
use tracing::debug;

use crate::design::{find_similar, BlockId, Design, TypeRef};
use crate::parser::ast::{BlockKind, TerminalKind};

/// Errors raised while elaborating a root module
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetlistError {
    #[error("no block named '{name}'")]
    UnknownRoot {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("'{name}' is a {kind}, only modules can be elaborated")]
    NotAModule { name: String, kind: BlockKind },

    #[error("recursive instantiation: {}", cycle.join(" -> "))]
    Recursive { cycle: Vec<String> },
}

/// One terminal in the flattened design
#[derive(Debug, Clone, PartialEq)]
pub struct NetTerminal {
    /// Dotted path from the root
    pub path: String,
    /// `None` for terminals reached through an imported (opaque) instance
    pub kind: Option<TerminalKind>,
    /// Kind of the block declaring the terminal, if known
    pub owner: Option<BlockKind>,
}

impl NetTerminal {
    /// Number of instance levels between the root and this terminal
    pub fn depth(&self) -> usize {
        self.path.matches('.').count()
    }

    /// A signal declared directly on the root
    pub fn is_root_signal(&self) -> bool {
        self.depth() == 0 && self.kind == Some(TerminalKind::Signal)
    }

    fn sort_key(&self) -> (usize, &str) {
        (self.depth(), &self.path)
    }
}

/// A set of electrically equivalent terminals
#[derive(Debug, Clone, PartialEq)]
pub struct Net {
    pub name: String,
    /// Sorted by depth, then path
    pub terminals: Vec<NetTerminal>,
}

impl Net {
    pub fn contains(&self, path: &str) -> bool {
        self.terminals.iter().any(|t| t.path == path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.terminals.iter().map(|t| t.path.as_str())
    }

    pub fn len(&self) -> usize {
        self.terminals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terminals.is_empty()
    }
}

impl fmt::Display for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.paths().collect::<Vec<_>>().join(", "))
    }
}

/// The nets of one elaborated root module
#[derive(Debug, Clone, PartialEq)]
pub struct Netlist {
    root: String,
    nets: Vec<Net>,
    index: HashMap<String, usize>,
}

impl Netlist {
    /// Elaborate the module called `root` in the design's entry file
    pub fn build(design: &Design, root: &str) -> Result<Self, NetlistError> {
        let Some(id) = design.find_block(root) else {
            let known = design.entry_blocks().map(|(_, b)| b.name.as_str());
            return Err(NetlistError::UnknownRoot {
                name: root.to_string(),
                suggestions: find_similar(known, root),
            });
        };
        Self::build_block(design, id)
    }

    /// Elaborate a specific block
    pub fn build_block(design: &Design, root: BlockId) -> Result<Self, NetlistError> {
        let block = design.block(root);
        if block.kind != BlockKind::Module {
            return Err(NetlistError::NotAModule {
                name: block.name.clone(),
                kind: block.kind,
            });
        }

        let mut elab = Elaborator {
            design,
            nodes: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            stack: Vec::new(),
        };
        elab.expand(root, "")?;
        let netlist = elab.close(block.name.clone());
        debug!(root = %netlist.root, nets = netlist.nets.len(), "elaborated netlist");
        Ok(netlist)
    }

    /// Elaborate every root module of the entry file
    pub fn build_all(design: &Design) -> Result<Vec<Self>, NetlistError> {
        design
            .roots()
            .into_iter()
            .map(|id| Self::build_block(design, id))
            .collect()
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Nets ordered by their first terminal
    pub fn nets(&self) -> &[Net] {
        &self.nets
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Net> {
        self.nets.iter()
    }

    pub fn len(&self) -> usize {
        self.nets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }

    /// The net containing the terminal at `path`
    pub fn net_of(&self, path: &str) -> Option<&Net> {
        self.index.get(path).map(|i| &self.nets[*i])
    }

    /// Whether two terminals share a net. Unknown paths are never connected.
    pub fn are_connected(&self, a: &str, b: &str) -> bool {
        match (self.index.get(a), self.index.get(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }
}

impl<'a> IntoIterator for &'a Netlist {
    type Item = &'a Net;
    type IntoIter = std::slice::Iter<'a, Net>;

    fn into_iter(self) -> Self::IntoIter {
        self.nets.iter()
    }
}

impl fmt::Display for Netlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.root)?;
        for net in &self.nets {
            writeln!(f, "  {}", net)?;
        }
        Ok(())
    }
}

struct Elaborator<'d> {
    design: &'d Design,
    nodes: Vec<NetTerminal>,
    index: HashMap<String, usize>,
    edges: Vec<(usize, usize)>,
    stack: Vec<BlockId>,
}

impl Elaborator<'_> {
    fn expand(&mut self, id: BlockId, prefix: &str) -> Result<(), NetlistError> {
        if let Some(start) = self.stack.iter().position(|b| *b == id) {
            let mut cycle: Vec<String> = self.stack[start..]
                .iter()
                .map(|b| self.design.block(*b).name.clone())
                .collect();
            cycle.push(self.design.block(id).name.clone());
            return Err(NetlistError::Recursive { cycle });
        }
        self.stack.push(id);

        let design = self.design;
        let block = design.block(id);
        for t in &block.terminals {
            let path = join(prefix, &t.name);
            let node = self.node(path);
            self.nodes[node].kind = Some(t.kind);
            self.nodes[node].owner = Some(block.kind);
        }
        for inst in &block.instances {
            if let TypeRef::Block(child) = inst.ty {
                self.expand(child, &join(prefix, &inst.name))?;
            }
        }
        for conn in &block.connections {
            let a = self.node(conn.a.under(prefix));
            let b = self.node(conn.b.under(prefix));
            self.edges.push((a, b));
        }

        self.stack.pop();
        Ok(())
    }

    /// Node for `path`, created on first reference
    fn node(&mut self, path: String) -> usize {
        if let Some(i) = self.index.get(&path) {
            return *i;
        }
        let i = self.nodes.len();
        self.index.insert(path.clone(), i);
        self.nodes.push(NetTerminal {
            path,
            kind: None,
            owner: None,
        });
        i
    }

    fn close(self, root: String) -> Netlist {
        let mut uf = UnionFind::<usize>::new(self.nodes.len());
        for (a, b) in &self.edges {
            uf.union(*a, *b);
        }

        let mut classes: BTreeMap<usize, Vec<NetTerminal>> = BTreeMap::new();
        for (node, label) in self.nodes.into_iter().zip(uf.into_labeling()) {
            classes.entry(label).or_default().push(node);
        }

        let mut nets: Vec<Net> = classes
            .into_values()
            .map(|mut terminals| {
                terminals.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
                let named = terminals
                    .iter()
                    .find(|t| t.is_root_signal())
                    .or(terminals.first());
                Net {
                    name: named.map(|t| t.path.clone()).unwrap_or_default(),
                    terminals,
                }
            })
            .collect();
        nets.sort_by(|a, b| {
            let first = |n: &Net| n.terminals.first().map(|t| (t.depth(), t.path.clone()));
            first(a).cmp(&first(b))
        });

        let index = nets
            .iter()
            .enumerate()
            .flat_map(|(i, net)| net.paths().map(move |p| (p.to_string(), i)))
            .collect();

        Netlist { root, nets, index }
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

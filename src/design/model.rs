//! Block registry produced by the design builder

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::parser::ast::{BlockKind, Span, TerminalKind, Value};

/// Index of a block in a [`Design`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) usize);

/// Index of a loaded file in a [`Design`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(pub(crate) usize);

/// What a type name resolves to within a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// A block whose definition is known
    Block(BlockId),
    /// A name brought in by a bare `import`, whose contents are unknown
    Opaque,
}

/// A declared terminal
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalDef {
    pub name: String,
    pub kind: TerminalKind,
    pub private: bool,
    pub span: Span,
}

/// A `name = new Type` instantiation
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceDef {
    pub name: String,
    pub type_name: String,
    pub ty: TypeRef,
    pub span: Span,
}

/// Attribute assignment such as `crystal.package = "0402"`
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDef {
    pub target: Vec<String>,
    pub value: Value,
    pub span: Span,
}

/// Terminal reference relative to the block that makes it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TerminalRef(pub Vec<String>);

impl TerminalRef {
    /// First segment: a local terminal or an instance name
    pub fn head(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Prefix the path with an instance path (`crystal` + `xin`)
    pub fn under(&self, prefix: &str) -> String {
        if prefix.is_empty() {
            self.to_string()
        } else {
            format!("{}.{}", prefix, self)
        }
    }
}

impl fmt::Display for TerminalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// One undirected edge between two terminals
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionDef {
    pub a: TerminalRef,
    pub b: TerminalRef,
    pub span: Span,
}

impl ConnectionDef {
    pub fn is_self_connection(&self) -> bool {
        self.a == self.b
    }

    /// Endpoints in canonical order, so `a ~ b` and `b ~ a` compare equal
    pub fn key(&self) -> (&TerminalRef, &TerminalRef) {
        if self.a <= self.b {
            (&self.a, &self.b)
        } else {
            (&self.b, &self.a)
        }
    }
}

/// A component, module or interface definition
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDef {
    pub name: String,
    pub kind: BlockKind,
    pub file: FileId,
    pub span: Span,
    pub terminals: Vec<TerminalDef>,
    pub instances: Vec<InstanceDef>,
    pub attributes: Vec<AttributeDef>,
    pub connections: Vec<ConnectionDef>,
}

impl BlockDef {
    pub fn terminal(&self, name: &str) -> Option<&TerminalDef> {
        self.terminals.iter().find(|t| t.name == name)
    }

    pub fn instance(&self, name: &str) -> Option<&InstanceDef> {
        self.instances.iter().find(|i| i.name == name)
    }

    /// Names of terminals and instances, which share one namespace
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.terminals
            .iter()
            .map(|t| t.name.as_str())
            .chain(self.instances.iter().map(|i| i.name.as_str()))
    }
}

/// Names visible in one file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileScope {
    pub path: Option<PathBuf>,
    /// Local blocks and imports
    pub names: BTreeMap<String, TypeRef>,
    /// Blocks declared in this file, in source order
    pub blocks: Vec<BlockId>,
}

/// Every block of every loaded file, with per-file name scopes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Design {
    pub(crate) blocks: Vec<BlockDef>,
    pub(crate) files: Vec<FileScope>,
    pub(crate) entry: Option<FileId>,
}

impl Design {
    pub fn block(&self, id: BlockId) -> &BlockDef {
        &self.blocks[id.0]
    }

    /// All blocks across loaded files, dependencies first
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &BlockDef)> {
        self.blocks.iter().enumerate().map(|(i, b)| (BlockId(i), b))
    }

    pub fn file(&self, id: FileId) -> &FileScope {
        &self.files[id.0]
    }

    /// The file the design was loaded from (the last file added)
    pub fn entry(&self) -> Option<FileId> {
        self.entry
    }

    /// Blocks declared in the entry file
    pub fn entry_blocks(&self) -> impl Iterator<Item = (BlockId, &BlockDef)> {
        self.entry
            .map(|f| self.file(f).blocks.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|id| (*id, self.block(*id)))
    }

    /// Look up a name in the entry file's scope
    pub fn lookup(&self, name: &str) -> Option<&TypeRef> {
        self.entry.and_then(|f| self.file(f).names.get(name))
    }

    /// Find a block declared or imported into the entry file
    pub fn find_block(&self, name: &str) -> Option<BlockId> {
        match self.lookup(name) {
            Some(TypeRef::Block(id)) => Some(*id),
            _ => None,
        }
    }

    /// Whether `name` came from a bare `import` in the entry file
    pub fn is_opaque(&self, name: &str) -> bool {
        matches!(self.lookup(name), Some(TypeRef::Opaque))
    }

    /// Modules of the entry file that no other entry-file block instantiates
    pub fn roots(&self) -> Vec<BlockId> {
        let instantiated: Vec<BlockId> = self
            .entry_blocks()
            .flat_map(|(_, b)| b.instances.iter())
            .filter_map(|i| match i.ty {
                TypeRef::Block(id) => Some(id),
                TypeRef::Opaque => None,
            })
            .collect();
        self.entry_blocks()
            .filter(|(id, b)| b.kind == BlockKind::Module && !instantiated.contains(id))
            .map(|(id, _)| id)
            .collect()
    }
}

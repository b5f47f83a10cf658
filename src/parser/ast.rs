//! Abstract Syntax Tree types for the circuit description language

use std::fmt;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Valid identifier (alphanumeric + underscore), or a numeric pin name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dotted reference such as `xin`, `crystal.xin` or `osc.crystal.1`
#[derive(Debug, Clone, PartialEq)]
pub struct RefPath {
    pub segments: Vec<Spanned<Identifier>>,
}

impl RefPath {
    /// First segment of the path (the local name)
    pub fn head(&self) -> &Identifier {
        &self.segments[0].node
    }

    /// Whether the path is a single name
    pub fn is_simple(&self) -> bool {
        self.segments.len() == 1
    }

    /// Segment names as plain strings
    pub fn names(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.node.as_str()).collect()
    }
}

impl fmt::Display for RefPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join("."))
    }
}

/// Root AST node - one circuit description file
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub statements: Vec<Spanned<Statement>>,
}

impl File {
    /// Import declarations in source order
    pub fn imports(&self) -> impl Iterator<Item = &ImportDecl> {
        self.statements.iter().filter_map(|s| match &s.node {
            Statement::Import(i) => Some(i),
            _ => None,
        })
    }

    /// Block declarations in source order
    pub fn blocks(&self) -> impl Iterator<Item = &BlockDecl> {
        self.statements.iter().filter_map(|s| match &s.node {
            Statement::Block(b) => Some(b),
            _ => None,
        })
    }
}

/// A statement. Imports and blocks appear at file level, the rest inside
/// block bodies.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `import A, B` or `from "file.ato" import A`
    Import(ImportDecl),
    /// `component Name:` / `module Name:` / `interface Name:` with a body
    Block(BlockDecl),
    /// `signal x`, `pin 1`, `private signal x`
    Terminal(TerminalDecl),
    /// `name = new TypeName`
    Instance(InstanceDecl),
    /// `inst.attr = value`
    Assign(AssignDecl),
    /// `a ~ b`
    Connect(ConnectDecl),
    /// `pass`
    Pass,
}

/// Import declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    /// Source file for `from "..." import`, `None` for bare imports
    pub source: Option<Spanned<String>>,
    pub names: Vec<Spanned<Identifier>>,
}

/// Kind of block declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Component,
    Module,
    Interface,
}

impl BlockKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            BlockKind::Component => "component",
            BlockKind::Module => "module",
            BlockKind::Interface => "interface",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Component, module or interface declaration
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDecl {
    pub kind: Spanned<BlockKind>,
    pub name: Spanned<Identifier>,
    pub body: Vec<Spanned<Statement>>,
}

/// Kind of terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalKind {
    Signal,
    Pin,
}

impl TerminalKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            TerminalKind::Signal => "signal",
            TerminalKind::Pin => "pin",
        }
    }
}

/// Terminal declaration
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalDecl {
    pub kind: TerminalKind,
    pub name: Spanned<Identifier>,
    pub private: bool,
}

/// Instantiation: `target = new type_name`
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceDecl {
    pub target: Spanned<RefPath>,
    pub type_name: Spanned<Identifier>,
}

/// Literal attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    /// Number as written, including sign and unit suffix
    Number(String),
    Bool(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) if has_unescaped(s, '"') => write!(f, "'{}'", s),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Number(n) => f.write_str(n),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
        }
    }
}

/// Whether `quote` occurs in `s` without a preceding backslash escape
fn has_unescaped(s: &str, quote: char) -> bool {
    let mut escaped = false;
    for c in s.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return true;
        }
    }
    false
}

/// Attribute assignment: `target = value`
#[derive(Debug, Clone, PartialEq)]
pub struct AssignDecl {
    pub target: Spanned<RefPath>,
    pub value: Spanned<Value>,
}

/// One side of a connection
#[derive(Debug, Clone, PartialEq)]
pub enum Connectable {
    /// Reference to an existing terminal
    Ref(RefPath),
    /// Terminal declared in place: `signal gnd ~ pin 2`
    Declare(TerminalDecl),
}

/// Undirected connection: `left ~ right`
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectDecl {
    pub left: Spanned<Connectable>,
    pub right: Spanned<Connectable>,
}

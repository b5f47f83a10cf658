//! Builds a [`Design`] from parsed files, collecting every error

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use tracing::debug;

use super::error::DesignError;
use super::model::*;
use super::{find_similar, Endpoint, Unresolved};
use crate::parser::ast::{
    BlockDecl, BlockKind, Connectable, File, Span, Spanned, Statement, TerminalDecl,
};

/// Options affecting how strictly references are checked
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesignOptions {
    /// Reject terminal paths that go through instances of imported types
    pub strict_imports: bool,
}

impl DesignOptions {
    pub fn with_strict_imports(mut self, strict: bool) -> Self {
        self.strict_imports = strict;
        self
    }
}

/// Incrementally adds files to a design, dependencies first
#[derive(Debug, Default)]
pub struct DesignBuilder {
    design: Design,
    options: DesignOptions,
}

/// A connection endpoint awaiting resolution
struct PendingRef {
    block: BlockId,
    path: Vec<String>,
    span: Span,
}

impl Design {
    /// Build a design from a single file; `from` imports stay opaque
    pub fn build(file: &File, options: &DesignOptions) -> Result<Design, Vec<DesignError>> {
        let mut builder = DesignBuilder::new(options.clone());
        builder.add_file(file, None, &HashMap::new())?;
        Ok(builder.finish())
    }
}

impl DesignBuilder {
    pub fn new(options: DesignOptions) -> Self {
        Self {
            design: Design::default(),
            options,
        }
    }

    /// Names visible in an already added file
    pub fn scope(&self, file: FileId) -> &FileScope {
        self.design.file(file)
    }

    /// Add one parsed file.
    ///
    /// `imports` maps names brought in by `from "..." import` to blocks of
    /// previously added files. Any imported name missing from it is opaque.
    /// On error the builder is left unchanged.
    pub fn add_file(
        &mut self,
        file: &File,
        path: Option<PathBuf>,
        imports: &HashMap<String, TypeRef>,
    ) -> Result<FileId, Vec<DesignError>> {
        let file_id = FileId(self.design.files.len());
        let base = self.design.blocks.len();
        let mut errors = Vec::new();

        let mut names: BTreeMap<String, TypeRef> = BTreeMap::new();
        let mut imported: HashSet<String> = HashSet::new();
        for import in file.imports() {
            for name in &import.names {
                let key = name.node.to_string();
                let ty = imports.get(&key).cloned().unwrap_or(TypeRef::Opaque);
                imported.insert(key.clone());
                names.entry(key).or_insert(ty);
            }
        }

        let mut accepted: Vec<&BlockDecl> = Vec::new();
        let mut seen: HashMap<String, Span> = HashMap::new();
        for decl in file.blocks() {
            let name = decl.name.node.to_string();
            if let Some(previous) = seen.get(&name) {
                errors.push(DesignError::DuplicateBlock {
                    name,
                    span: decl.name.span.clone(),
                    previous: previous.clone(),
                });
            } else if imported.contains(&name) {
                errors.push(DesignError::ImportClash {
                    name,
                    span: decl.name.span.clone(),
                });
            } else {
                let id = BlockId(base + accepted.len());
                seen.insert(name.clone(), decl.name.span.clone());
                names.insert(name, TypeRef::Block(id));
                accepted.push(decl);
            }
        }

        let mut pending = Vec::new();
        let mut blocks = Vec::with_capacity(accepted.len());
        for (i, decl) in accepted.iter().enumerate() {
            let id = BlockId(base + i);
            let mut collector = BlockCollector::new(decl, file_id, &names);
            collector.collect(decl, &mut errors);
            pending.extend(collector.refs.drain(..).map(|(path, span)| PendingRef {
                block: id,
                path,
                span,
            }));
            blocks.push(collector.def);
        }

        let block_ids = blocks.len();
        self.design.blocks.extend(blocks);
        self.design.files.push(FileScope {
            path: path.clone(),
            names,
            blocks: (base..base + block_ids).map(BlockId).collect(),
        });

        for pending in &pending {
            self.check_endpoint(pending, &mut errors);
        }
        self.check_recursion(base, &mut errors);

        if !errors.is_empty() {
            self.design.blocks.truncate(base);
            self.design.files.pop();
            errors.sort_by_key(|e| e.span().start);
            debug!(file = ?path, errors = errors.len(), "design errors");
            return Err(errors);
        }

        debug!(file = ?path, blocks = block_ids, "added file to design");
        self.design.entry = Some(file_id);
        Ok(file_id)
    }

    pub fn finish(self) -> Design {
        self.design
    }

    fn check_endpoint(&self, pending: &PendingRef, errors: &mut Vec<DesignError>) {
        let design = &self.design;
        let path = &pending.path;
        let span = pending.span.clone();
        let joined = path.join(".");

        match design.resolve(pending.block, path) {
            Ok(Endpoint::Terminal { .. }) => {}
            Ok(Endpoint::Opaque { block, type_name }) => {
                // Instances of unknown types are reported where they are declared
                let owner = design.block(block).file;
                let is_import = matches!(
                    design.file(owner).names.get(type_name),
                    Some(TypeRef::Opaque)
                );
                if self.options.strict_imports && is_import {
                    errors.push(DesignError::OpaqueReference {
                        path: joined,
                        type_name: type_name.to_string(),
                        span,
                    });
                }
            }
            Err(Unresolved::UnknownInstance { depth, block }) => {
                let def = design.block(block);
                errors.push(DesignError::UnknownInstance {
                    block: def.name.clone(),
                    name: path[depth].clone(),
                    span,
                    suggestions: find_similar(
                        def.instances.iter().map(|i| i.name.as_str()),
                        &path[depth],
                    ),
                });
            }
            Err(Unresolved::NotAnInstance { depth }) => errors.push(DesignError::NotAnInstance {
                name: path[depth].clone(),
                span,
            }),
            Err(Unresolved::UndeclaredTerminal { block }) => {
                let def = design.block(block);
                let leaf = path.last().map(String::as_str).unwrap_or_default();
                let visible = def
                    .terminals
                    .iter()
                    .filter(|t| !t.private || path.len() == 1)
                    .map(|t| t.name.as_str());
                errors.push(DesignError::UndeclaredTerminal {
                    path: joined,
                    span,
                    suggestions: find_similar(visible, leaf),
                });
            }
            Err(Unresolved::Private) => {
                errors.push(DesignError::PrivateTerminal { path: joined, span })
            }
            Err(Unresolved::NotATerminal) => {
                errors.push(DesignError::NotATerminal { path: joined, span })
            }
        }
    }

    /// Report instantiation cycles among blocks added from `base` onwards.
    /// Earlier files cannot refer back to later ones, so cycles stay local.
    fn check_recursion(&self, base: usize, errors: &mut Vec<DesignError>) {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        fn visit(
            design: &Design,
            id: BlockId,
            marks: &mut HashMap<BlockId, Mark>,
            stack: &mut Vec<BlockId>,
            errors: &mut Vec<DesignError>,
        ) {
            marks.insert(id, Mark::Active);
            stack.push(id);
            for inst in &design.block(id).instances {
                let TypeRef::Block(next) = inst.ty else {
                    continue;
                };
                match marks.get(&next).copied().unwrap_or(Mark::New) {
                    Mark::New => visit(design, next, marks, stack, errors),
                    Mark::Active => {
                        let start = stack.iter().position(|b| *b == next).unwrap_or(0);
                        let mut cycle: Vec<String> = stack[start..]
                            .iter()
                            .map(|b| design.block(*b).name.clone())
                            .collect();
                        cycle.push(design.block(next).name.clone());
                        errors.push(DesignError::RecursiveInstantiation {
                            cycle,
                            span: inst.span.clone(),
                        });
                    }
                    Mark::Done => {}
                }
            }
            stack.pop();
            marks.insert(id, Mark::Done);
        }

        let mut marks = HashMap::new();
        for i in base..self.design.blocks.len() {
            let id = BlockId(i);
            if !marks.contains_key(&id) {
                visit(&self.design, id, &mut marks, &mut Vec::new(), errors);
            }
        }
    }
}

/// Gathers the members of one block declaration
struct BlockCollector<'a> {
    def: BlockDef,
    names: &'a BTreeMap<String, TypeRef>,
    declared: HashMap<String, Span>,
    edges: HashSet<(TerminalRef, TerminalRef)>,
    refs: Vec<(Vec<String>, Span)>,
}

impl<'a> BlockCollector<'a> {
    fn new(decl: &BlockDecl, file: FileId, names: &'a BTreeMap<String, TypeRef>) -> Self {
        Self {
            def: BlockDef {
                name: decl.name.node.to_string(),
                kind: decl.kind.node,
                file,
                span: decl.name.span.clone(),
                terminals: Vec::new(),
                instances: Vec::new(),
                attributes: Vec::new(),
                connections: Vec::new(),
            },
            names,
            declared: HashMap::new(),
            edges: HashSet::new(),
            refs: Vec::new(),
        }
    }

    fn collect(&mut self, decl: &BlockDecl, errors: &mut Vec<DesignError>) {
        // Declarations first, so connections may refer to names declared later
        for stmt in &decl.body {
            match &stmt.node {
                Statement::Terminal(t) => self.declare_terminal(t, errors),
                Statement::Instance(inst) => {
                    if !inst.target.node.is_simple() {
                        errors.push(DesignError::InvalidInstanceTarget {
                            target: inst.target.node.to_string(),
                            span: inst.target.span.clone(),
                        });
                        continue;
                    }
                    if self.def.kind == BlockKind::Component {
                        errors.push(DesignError::ComponentInstantiates {
                            component: self.def.name.clone(),
                            span: stmt.span.clone(),
                        });
                    }
                    let name = inst.target.node.head().to_string();
                    let type_name = inst.type_name.node.to_string();
                    let ty = match self.names.get(&type_name) {
                        Some(ty) => ty.clone(),
                        None => {
                            errors.push(DesignError::UnknownType {
                                suggestions: find_similar(
                                    self.names.keys().map(String::as_str),
                                    &type_name,
                                ),
                                name: type_name.clone(),
                                span: inst.type_name.span.clone(),
                            });
                            TypeRef::Opaque
                        }
                    };
                    if self.claim(&name, &inst.target.span, errors) {
                        self.def.instances.push(InstanceDef {
                            name,
                            type_name,
                            ty,
                            span: stmt.span.clone(),
                        });
                    }
                }
                Statement::Connect(c) => {
                    for side in [&c.left.node, &c.right.node] {
                        if let Connectable::Declare(t) = side {
                            self.declare_terminal(t, errors);
                        }
                    }
                }
                _ => {}
            }
        }

        for stmt in &decl.body {
            match &stmt.node {
                Statement::Assign(a) => {
                    let target = &a.target.node;
                    let head = target.head().as_str();
                    if !target.is_simple() && !self.declared.contains_key(head) {
                        errors.push(DesignError::UnknownAttributeTarget {
                            path: target.to_string(),
                            name: head.to_string(),
                            span: a.target.span.clone(),
                            suggestions: find_similar(self.def.member_names(), head),
                        });
                        continue;
                    }
                    self.def.attributes.push(AttributeDef {
                        target: target.names().into_iter().map(String::from).collect(),
                        value: a.value.node.clone(),
                        span: stmt.span.clone(),
                    });
                }
                Statement::Connect(c) => {
                    let a = self.endpoint(&c.left);
                    let b = self.endpoint(&c.right);
                    let conn = ConnectionDef {
                        a,
                        b,
                        span: stmt.span.clone(),
                    };
                    let (x, y) = conn.key();
                    if self.edges.insert((x.clone(), y.clone())) {
                        self.def.connections.push(conn);
                    }
                }
                _ => {}
            }
        }
    }

    fn declare_terminal(&mut self, t: &TerminalDecl, errors: &mut Vec<DesignError>) {
        let name = t.name.node.to_string();
        if self.claim(&name, &t.name.span, errors) {
            self.def.terminals.push(TerminalDef {
                name,
                kind: t.kind,
                private: t.private,
                span: t.name.span.clone(),
            });
        }
    }

    /// Reserve a member name, reporting a duplicate if it is taken
    fn claim(&mut self, name: &str, span: &Span, errors: &mut Vec<DesignError>) -> bool {
        if let Some(previous) = self.declared.get(name) {
            errors.push(DesignError::DuplicateName {
                block: self.def.name.clone(),
                name: name.to_string(),
                span: span.clone(),
                previous: previous.clone(),
            });
            return false;
        }
        self.declared.insert(name.to_string(), span.clone());
        true
    }

    fn endpoint(&mut self, side: &Spanned<Connectable>) -> TerminalRef {
        let path: Vec<String> = match &side.node {
            Connectable::Declare(t) => vec![t.name.node.to_string()],
            Connectable::Ref(r) => r.names().into_iter().map(String::from).collect(),
        };
        if let Connectable::Ref(_) = side.node {
            self.refs.push((path.clone(), side.span.clone()));
        }
        TerminalRef(path)
    }
}

//! Multi-file loading for `from "file.ato" import Name`
//!
//! Files load depth first so every dependency is in the design before the
//! file importing it. Each file is parsed once, keyed by its canonical path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::design::{find_similar, DesignBuilder, DesignError, DesignOptions, FileId, TypeRef};
use crate::error::{render_report, ParseError, Span};
use crate::parser::{parse, File};

/// Errors that can occur while loading a circuit and its imports
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} has {} syntax error(s)", path.display(), errors.len())]
    Parse {
        path: PathBuf,
        source_text: String,
        errors: Vec<ParseError>,
    },

    #[error("{} has {} design error(s)", path.display(), errors.len())]
    Design {
        path: PathBuf,
        source_text: String,
        errors: Vec<DesignError>,
    },

    #[error("circular import: {}", display_chain(chain))]
    CircularImport { chain: Vec<PathBuf> },

    #[error("'{name}' is not defined in {}", target.display())]
    MissingImport {
        name: String,
        target: PathBuf,
        importer: PathBuf,
        source_text: String,
        span: Span,
        suggestions: Vec<String>,
    },
}

fn display_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl LoadError {
    /// Render the error, with source context where the error has a location
    pub fn render(&self) -> String {
        match self {
            LoadError::Parse {
                path,
                source_text,
                errors,
            } => {
                let name = path.display().to_string();
                errors
                    .iter()
                    .map(|e| e.format(source_text, &name))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            LoadError::Design {
                path,
                source_text,
                errors,
            } => {
                let name = path.display().to_string();
                errors
                    .iter()
                    .map(|e| e.format(source_text, &name))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            LoadError::MissingImport {
                importer,
                source_text,
                span,
                suggestions,
                ..
            } => {
                let message = self.to_string();
                let note = (!suggestions.is_empty())
                    .then(|| format!("did you mean '{}'?", suggestions.join("' or '")));
                render_report(
                    source_text,
                    &importer.display().to_string(),
                    span.clone(),
                    &message,
                    &message,
                    note,
                )
            }
            other => format!("Error: {}\n", other),
        }
    }
}

/// Loads a circuit file together with everything it imports
#[derive(Debug)]
pub struct Loader {
    builder: DesignBuilder,
    loaded: HashMap<PathBuf, FileId>,
    stack: Vec<PathBuf>,
}

impl Loader {
    pub fn new(options: DesignOptions) -> Self {
        Self {
            builder: DesignBuilder::new(options),
            loaded: HashMap::new(),
            stack: Vec::new(),
        }
    }

    /// Load `path` and its imports into one design whose entry is `path`
    pub fn load(mut self, path: &Path) -> Result<crate::design::Design, LoadError> {
        self.load_file(path)?;
        debug!(files = self.loaded.len(), "loaded design");
        Ok(self.builder.finish())
    }

    fn load_file(&mut self, path: &Path) -> Result<FileId, LoadError> {
        let canonical = path.canonicalize().map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(id) = self.loaded.get(&canonical) {
            return Ok(*id);
        }
        if let Some(pos) = self.stack.iter().position(|p| *p == canonical) {
            let mut chain = self.stack[pos..].to_vec();
            chain.push(canonical);
            return Err(LoadError::CircularImport { chain });
        }

        let source = std::fs::read_to_string(&canonical).map_err(|source| LoadError::Io {
            path: canonical.clone(),
            source,
        })?;
        let file = parse(&source).map_err(|errors| LoadError::Parse {
            path: canonical.clone(),
            source_text: source.clone(),
            errors,
        })?;
        debug!(path = %canonical.display(), "parsed circuit file");

        self.stack.push(canonical.clone());
        let imports = self.resolve_imports(&file, &canonical, &source);
        self.stack.pop();
        let imports = imports?;

        let id = self
            .builder
            .add_file(&file, Some(canonical.clone()), &imports)
            .map_err(|errors| LoadError::Design {
                path: canonical.clone(),
                source_text: source,
                errors,
            })?;
        self.loaded.insert(canonical, id);
        Ok(id)
    }

    /// Load the targets of `from` imports and look up the imported names
    fn resolve_imports(
        &mut self,
        file: &File,
        path: &Path,
        source: &str,
    ) -> Result<HashMap<String, TypeRef>, LoadError> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut imports = HashMap::new();

        for import in file.imports() {
            let Some(target) = &import.source else {
                continue;
            };
            let target = dir.join(&target.node);
            let id = self.load_file(&target)?;
            let scope = self.builder.scope(id);

            for name in &import.names {
                match scope.names.get(name.node.as_str()) {
                    Some(ty) => {
                        imports.insert(name.node.to_string(), ty.clone());
                    }
                    None => {
                        return Err(LoadError::MissingImport {
                            name: name.node.to_string(),
                            target,
                            importer: path.to_path_buf(),
                            source_text: source.to_string(),
                            span: name.span.clone(),
                            suggestions: find_similar(
                                scope.names.keys().map(String::as_str),
                                name.node.as_str(),
                            ),
                        })
                    }
                }
            }
        }
        Ok(imports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::Netlist;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn load(path: &Path) -> Result<crate::design::Design, LoadError> {
        Loader::new(DesignOptions::default()).load(path)
    }

    #[test]
    fn test_load_with_from_import() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "parts/crystal.ato",
            "component Crystal:\n    signal xin\n    signal xout\n",
        );
        let main = write(
            &dir,
            "main.ato",
            "from \"parts/crystal.ato\" import Crystal\nmodule Osc:\n    signal xin\n    crystal = new Crystal\n    xin ~ crystal.xin\n",
        );

        let design = load(&main).unwrap();
        assert_eq!(design.blocks().count(), 2);
        assert!(design.find_block("Crystal").is_some());
        let nl = Netlist::build(&design, "Osc").unwrap();
        assert!(nl.are_connected("xin", "crystal.xin"));
        assert!(nl.net_of("crystal.xout").is_some());
    }

    #[test]
    fn test_imported_terminals_are_checked() {
        let dir = TempDir::new().unwrap();
        write(&dir, "crystal.ato", "component Crystal:\n    signal xin\n");
        let main = write(
            &dir,
            "main.ato",
            "from \"crystal.ato\" import Crystal\nmodule Osc:\n    signal xin\n    c = new Crystal\n    xin ~ c.xn\n",
        );
        match load(&main).unwrap_err() {
            LoadError::Design { errors, .. } => {
                assert!(matches!(&errors[0], DesignError::UndeclaredTerminal { path, .. } if path == "c.xn"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_shared_dependency_loaded_once() {
        let dir = TempDir::new().unwrap();
        write(&dir, "r.ato", "component R:\n    signal a\n");
        write(&dir, "a.ato", "from \"r.ato\" import R\nmodule A:\n    r = new R\n");
        write(&dir, "b.ato", "from \"r.ato\" import R\nmodule B:\n    r = new R\n");
        let main = write(
            &dir,
            "main.ato",
            "from \"a.ato\" import A\nfrom \"b.ato\" import B\nmodule Top:\n    a = new A\n    b = new B\n",
        );
        let design = load(&main).unwrap();
        assert_eq!(design.blocks().count(), 4);
    }

    #[test]
    fn test_helper_blocks_of_imported_file() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "osc.ato",
            "component Crystal:\n    signal xin\nmodule Osc:\n    signal out\n    c = new Crystal\n    out ~ c.xin\n",
        );
        let main = write(
            &dir,
            "main.ato",
            "from \"osc.ato\" import Osc\nmodule Board:\n    signal clk\n    osc = new Osc\n    clk ~ osc.out\n",
        );
        let design = load(&main).unwrap();
        assert!(design.find_block("Crystal").is_none());
        let nl = Netlist::build(&design, "Board").unwrap();
        assert!(nl.are_connected("clk", "osc.c.xin"));
    }

    #[test]
    fn test_circular_import() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.ato", "from \"b.ato\" import B\nmodule A: pass\n");
        let b = write(&dir, "b.ato", "from \"a.ato\" import A\nmodule B: pass\n");
        match load(&b).unwrap_err() {
            LoadError::CircularImport { chain } => {
                assert_eq!(chain.len(), 3);
                assert_eq!(chain.first(), chain.last());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "main.ato", "from \"nope.ato\" import X\n");
        let err = load(&main).unwrap_err();
        match &err {
            LoadError::Io { path, .. } => assert!(path.ends_with("nope.ato")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(err.to_string().contains("nope.ato"));
    }

    #[test]
    fn test_missing_import_name() {
        let dir = TempDir::new().unwrap();
        write(&dir, "parts.ato", "component Crystal: pass\n");
        let main = write(&dir, "main.ato", "from \"parts.ato\" import Crystl\n");
        let err = load(&main).unwrap_err();
        match &err {
            LoadError::MissingImport {
                name, suggestions, ..
            } => {
                assert_eq!(name, "Crystl");
                assert_eq!(suggestions, &vec!["Crystal".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(err.render().contains("did you mean 'Crystal'?"));
    }

    #[test]
    fn test_parse_error_in_dependency() {
        let dir = TempDir::new().unwrap();
        write(&dir, "bad.ato", "component C\n");
        let main = write(&dir, "main.ato", "from \"bad.ato\" import C\n");
        match load(&main).unwrap_err() {
            LoadError::Parse { path, .. } => assert!(path.ends_with("bad.ato")),
            other => panic!("unexpected {:?}", other),
        }
    }
}

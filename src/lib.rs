//! ato-check - static checks for circuit descriptions and issue forms
//!
//! The circuit side parses an indentation-based hardware description
//! language (components, modules, signals, instances and `~` connections),
//! resolves every reference, closes connections into nets and reports lint
//! warnings. The form side validates YAML issue templates.
//!
//! # Example
//!
//! ```rust
//! use ato_check::{check_circuit, CheckConfig};
//!
//! let source = "
//! component Crystal:
//!     signal xin
//!     signal xout
//!
//! module Oscillator:
//!     signal xin
//!     crystal = new Crystal
//!     xin ~ crystal.xin
//! ";
//!
//! let report = check_circuit(source, &CheckConfig::default()).unwrap();
//! let nets = &report.netlists[0];
//! assert!(nets.are_connected("xin", "crystal.xin"));
//! ```

pub mod config;
pub mod design;
pub mod error;
pub mod form;
pub mod format;
pub mod lint;
pub mod loader;
pub mod netlist;
pub mod parser;

pub use config::{CheckConfig, ConfigError, LintConfig};
pub use design::{Design, DesignError, DesignOptions};
pub use error::ParseError;
pub use form::{validate_form, FormError, FormIssue, IssueForm};
pub use format::{format_file, format_source};
pub use lint::{LintCategory, LintWarning};
pub use loader::{LoadError, Loader};
pub use netlist::{Net, Netlist, NetlistError};
pub use parser::{parse, File};

use std::path::Path;

use thiserror::Error;
use tracing::debug;

/// Errors that can occur during a check
#[derive(Debug, Error)]
pub enum CheckError {
    /// Error during parsing
    #[error("parse errors: {}", join_errors(.0))]
    Parse(Vec<ParseError>),

    /// Unresolved or conflicting declarations
    #[error("design errors: {}", join_errors(.0))]
    Design(Vec<DesignError>),

    #[error("netlist error: {0}")]
    Netlist(#[from] NetlistError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("form error: {0}")]
    Form(#[from] FormError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl From<Vec<ParseError>> for CheckError {
    fn from(errors: Vec<ParseError>) -> Self {
        CheckError::Parse(errors)
    }
}

impl From<Vec<DesignError>> for CheckError {
    fn from(errors: Vec<DesignError>) -> Self {
        CheckError::Design(errors)
    }
}

impl CheckError {
    /// Render the error for a terminal, with source context where available
    pub fn format(&self, source: &str, filename: &str) -> String {
        match self {
            CheckError::Parse(errors) => errors
                .iter()
                .map(|e| e.format(source, filename))
                .collect::<Vec<_>>()
                .join("\n"),
            CheckError::Design(errors) => errors
                .iter()
                .map(|e| e.format(source, filename))
                .collect::<Vec<_>>()
                .join("\n"),
            CheckError::Load(e) => e.render(),
            CheckError::Netlist(NetlistError::UnknownRoot { suggestions, .. })
                if !suggestions.is_empty() =>
            {
                format!(
                    "Error: {}\n  help: did you mean '{}'?\n",
                    self,
                    suggestions.join("' or '")
                )
            }
            other => format!("Error: {}\n", other),
        }
    }
}

fn join_errors<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Outcome of a successful circuit check
#[derive(Debug, Clone)]
pub struct CircuitReport {
    pub design: Design,
    /// One netlist per elaborated root module
    pub netlists: Vec<Netlist>,
    pub warnings: Vec<LintWarning>,
}

impl CircuitReport {
    /// Whether the report should fail the check under `config`
    pub fn fails(&self, config: &CheckConfig) -> bool {
        config.lint.deny_warnings && !self.warnings.is_empty()
    }
}

/// Check circuit source text. `from` imports cannot be followed and stay
/// opaque; use [`check_circuit_file`] to load them.
pub fn check_circuit(source: &str, config: &CheckConfig) -> Result<CircuitReport, CheckError> {
    let file = parse(source)?;
    let design = Design::build(&file, &config.design_options())?;
    elaborate(design, config)
}

/// Check a circuit file, loading the files it imports
pub fn check_circuit_file(path: &Path, config: &CheckConfig) -> Result<CircuitReport, CheckError> {
    let design = Loader::new(config.design_options()).load(path)?;
    elaborate(design, config)
}

fn elaborate(design: Design, config: &CheckConfig) -> Result<CircuitReport, CheckError> {
    let netlists = match &config.circuit.root {
        Some(root) => vec![Netlist::build(&design, root)?],
        None => Netlist::build_all(&design)?,
    };
    let warnings = lint::check(&design, &netlists, &config.lint);
    debug!(
        netlists = netlists.len(),
        warnings = warnings.len(),
        "circuit check finished"
    );
    Ok(CircuitReport {
        design,
        netlists,
        warnings,
    })
}

/// Outcome of an issue form check
#[derive(Debug, Clone)]
pub struct FormReport {
    pub form: IssueForm,
    pub issues: Vec<FormIssue>,
}

/// Deserialize and validate an issue form
///
/// # Example
///
/// ```rust
/// use ato_check::{check_form, CheckConfig};
///
/// let yaml = "name: Bug\ndescription: Report a bug\nbody:\n  - type: input\n    id: version\n    attributes:\n      label: Version\n";
/// let report = check_form(yaml, &CheckConfig::default()).unwrap();
/// assert!(report.issues.is_empty());
/// ```
pub fn check_form(source: &str, config: &CheckConfig) -> Result<FormReport, CheckError> {
    let form = IssueForm::from_yaml(source)?;
    let issues = validate_form(&form, &config.form.required_ids);
    Ok(FormReport { form, issues })
}

/// Reformat circuit source in canonical style
pub fn format_circuit(source: &str) -> Result<String, CheckError> {
    Ok(format_source(source)?)
}

/// Re-serialize an issue form, dropping comments and normalizing quoting
pub fn format_form(source: &str) -> Result<String, CheckError> {
    Ok(IssueForm::from_yaml(source)?.to_yaml()?)
}

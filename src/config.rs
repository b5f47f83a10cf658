//! Check configuration loaded from TOML
//!
//! Every key is optional; anything left out keeps its default. Command line
//! flags are applied on top with the `with_*` builder methods.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::design::DesignOptions;

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Settings for circuit and issue-form checks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckConfig {
    pub circuit: CircuitConfig,
    pub lint: LintConfig,
    pub form: FormConfig,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CircuitConfig {
    /// Module to elaborate; every root module when unset
    pub root: Option<String>,
    pub strict_imports: bool,
}

/// Which lint categories run, and whether warnings fail the check
#[derive(Debug, Clone, PartialEq)]
pub struct LintConfig {
    pub unused: bool,
    pub floating: bool,
    pub unconnected_instance: bool,
    pub self_connection: bool,
    pub deny_warnings: bool,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            unused: true,
            floating: true,
            unconnected_instance: true,
            self_connection: true,
            deny_warnings: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormConfig {
    /// Field ids every issue form must define
    pub required_ids: Vec<String>,
}

/// TOML structure for deserializing configs
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    circuit: Option<TomlCircuit>,
    lint: Option<TomlLint>,
    form: Option<TomlForm>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlCircuit {
    root: Option<String>,
    strict_imports: Option<bool>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlLint {
    unused: Option<bool>,
    floating: Option<bool>,
    unconnected_instance: Option<bool>,
    self_connection: Option<bool>,
    deny_warnings: Option<bool>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlForm {
    required_ids: Option<Vec<String>>,
}

impl CheckConfig {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load config from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let mut config = CheckConfig::default();

        if let Some(circuit) = parsed.circuit {
            config.circuit.root = circuit.root;
            if let Some(strict) = circuit.strict_imports {
                config.circuit.strict_imports = strict;
            }
        }
        if let Some(lint) = parsed.lint {
            let l = &mut config.lint;
            l.unused = lint.unused.unwrap_or(l.unused);
            l.floating = lint.floating.unwrap_or(l.floating);
            l.unconnected_instance = lint.unconnected_instance.unwrap_or(l.unconnected_instance);
            l.self_connection = lint.self_connection.unwrap_or(l.self_connection);
            l.deny_warnings = lint.deny_warnings.unwrap_or(l.deny_warnings);
        }
        if let Some(form) = parsed.form {
            config.form.required_ids = form.required_ids.unwrap_or_default();
        }
        Ok(config)
    }

    /// Set the module to elaborate
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.circuit.root = Some(root.into());
        self
    }

    /// Reject references through imported types
    pub fn with_strict_imports(mut self, strict: bool) -> Self {
        self.circuit.strict_imports = strict;
        self
    }

    /// Treat lint warnings as errors
    pub fn with_deny_warnings(mut self, deny: bool) -> Self {
        self.lint.deny_warnings = deny;
        self
    }

    pub fn with_lint(mut self, lint: LintConfig) -> Self {
        self.lint = lint;
        self
    }

    pub fn with_required_ids(mut self, ids: Vec<String>) -> Self {
        self.form.required_ids = ids;
        self
    }

    /// Options for building designs under this config
    pub fn design_options(&self) -> DesignOptions {
        DesignOptions::default().with_strict_imports(self.circuit.strict_imports)
    }
}

//! Issue form schema and validation
//!
//! Issue forms are YAML documents describing a bug report template: a name,
//! a description and a body of typed fields. Loading is lenient so that
//! schema problems surface as [`FormIssue`]s rather than parse failures.

pub mod schema;
pub mod validate;

pub use schema::{CheckboxOption, FieldAttributes, FieldKind, FieldOption, FormField, IssueForm, Validations};
pub use validate::{validate_form, FormIssue, FormIssueKind};

use thiserror::Error;

/// Errors that can occur when loading or writing an issue form
#[derive(Error, Debug)]
pub enum FormError {
    #[error("Failed to read issue form: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid issue form YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

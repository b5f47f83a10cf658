//! Schema checks for issue forms

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use super::schema::{FieldKind, IssueForm};

/// A problem found in an issue form
#[derive(Debug, Clone, PartialEq)]
pub struct FormIssue {
    /// Position of the offending field in the body, if field-specific
    pub index: Option<usize>,
    pub id: Option<String>,
    pub kind: FormIssueKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormIssueKind {
    UnknownType(String),
    DuplicateId,
    InvalidId,
    MissingLabel,
    MissingMarkdownValue,
    RequiredOnMarkdown,
    EmptyRequiredDefault,
    MissingRequiredFlag,
    NoOptions,
    EmptyOptionLabel(usize),
    MissingTopLevel(&'static str),
    EmptyBody,
    MissingRequiredId(String),
}

impl fmt::Display for FormIssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormIssueKind::UnknownType(t) => write!(
                f,
                "unknown field type '{}' (expected markdown, textarea, input or checkboxes)",
                t
            ),
            FormIssueKind::DuplicateId => write!(f, "id is used by an earlier field"),
            FormIssueKind::InvalidId => {
                write!(f, "ids may only contain letters, digits, '-' and '_'")
            }
            FormIssueKind::MissingLabel => write!(f, "field needs a non-empty label"),
            FormIssueKind::MissingMarkdownValue => {
                write!(f, "markdown field needs a non-empty value")
            }
            FormIssueKind::RequiredOnMarkdown => {
                write!(f, "markdown fields cannot have validations")
            }
            FormIssueKind::EmptyRequiredDefault => {
                write!(f, "required field has a blank default value")
            }
            FormIssueKind::MissingRequiredFlag => {
                write!(f, "validations must set 'required' to true or false")
            }
            FormIssueKind::NoOptions => write!(f, "checkboxes field has no options"),
            FormIssueKind::EmptyOptionLabel(i) => write!(f, "option {} has an empty label", i + 1),
            FormIssueKind::MissingTopLevel(key) => write!(f, "form needs a non-empty '{}'", key),
            FormIssueKind::EmptyBody => write!(f, "form has no input fields"),
            FormIssueKind::MissingRequiredId(id) => {
                write!(f, "form must define a field with id '{}'", id)
            }
        }
    }
}

impl fmt::Display for FormIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.index, &self.id) {
            (Some(i), Some(id)) => write!(f, "body[{}] ({}): {}", i, id, self.kind),
            (Some(i), None) => write!(f, "body[{}]: {}", i, self.kind),
            (None, _) => write!(f, "{}", self.kind),
        }
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_blank(s: Option<&str>) -> bool {
    s.map_or(true, |s| s.trim().is_empty())
}

/// Check a form, returning every issue found in body order
pub fn validate_form(form: &IssueForm, required_ids: &[String]) -> Vec<FormIssue> {
    let mut issues = Vec::new();
    let top = |kind| FormIssue {
        index: None,
        id: None,
        kind,
    };

    if form.name.trim().is_empty() {
        issues.push(top(FormIssueKind::MissingTopLevel("name")));
    }
    if form.description.trim().is_empty() {
        issues.push(top(FormIssueKind::MissingTopLevel("description")));
    }

    let mut seen = HashSet::new();
    for (index, field) in form.body.iter().enumerate() {
        let mut push = |kind| {
            issues.push(FormIssue {
                index: Some(index),
                id: field.id.clone(),
                kind,
            })
        };

        if let Some(id) = &field.id {
            if !is_valid_id(id) {
                push(FormIssueKind::InvalidId);
            }
            if !seen.insert(id.as_str()) {
                push(FormIssueKind::DuplicateId);
            }
        }

        let attrs = &field.attributes;
        match field.kind() {
            None => push(FormIssueKind::UnknownType(field.field_type.clone())),
            Some(FieldKind::Markdown) => {
                if is_blank(attrs.value.as_deref()) {
                    push(FormIssueKind::MissingMarkdownValue);
                }
                if field.validations.is_some() {
                    push(FormIssueKind::RequiredOnMarkdown);
                }
            }
            Some(kind) => {
                if is_blank(attrs.label.as_deref()) {
                    push(FormIssueKind::MissingLabel);
                }
                let flag_missing = field
                    .validations
                    .as_ref()
                    .is_some_and(|v| v.required.is_none());
                if flag_missing {
                    push(FormIssueKind::MissingRequiredFlag);
                }
                if field.is_required() {
                    if let Some(value) = &attrs.value {
                        if value.trim().is_empty() {
                            push(FormIssueKind::EmptyRequiredDefault);
                        }
                    }
                }
                if kind == FieldKind::Checkboxes {
                    match &attrs.options {
                        Some(options) if !options.is_empty() => {
                            for (i, option) in options.iter().enumerate() {
                                if option.label().trim().is_empty() {
                                    push(FormIssueKind::EmptyOptionLabel(i));
                                }
                            }
                        }
                        _ => push(FormIssueKind::NoOptions),
                    }
                }
            }
        }
    }

    let has_input = form
        .body
        .iter()
        .any(|f| f.kind().is_some_and(|k| k != FieldKind::Markdown));
    if !has_input {
        issues.push(top(FormIssueKind::EmptyBody));
    }

    for id in required_ids {
        if form.field(id).is_none() {
            issues.push(top(FormIssueKind::MissingRequiredId(id.clone())));
        }
    }

    debug!(fields = form.body.len(), issues = issues.len(), "validated form");
    issues
}

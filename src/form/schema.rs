//! Issue form data model

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use super::FormError;

/// An issue form: top-level metadata plus an ordered list of fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Accepts a list or a comma-separated string
    #[serde(
        default,
        deserialize_with = "string_or_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub labels: Vec<String>,
    #[serde(
        default,
        deserialize_with = "string_or_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub body: Vec<FormField>,
    /// Keys this model does not interpret, kept for re-serialization
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// The field types an issue form may contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Markdown,
    Textarea,
    Input,
    Checkboxes,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Markdown => "markdown",
            FieldKind::Textarea => "textarea",
            FieldKind::Input => "input",
            FieldKind::Checkboxes => "checkboxes",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "markdown" => Some(FieldKind::Markdown),
            "textarea" => Some(FieldKind::Textarea),
            "input" => Some(FieldKind::Input),
            "checkboxes" => Some(FieldKind::Checkboxes),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One element of the form body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    /// Raw type string; unknown values are reported by validation
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: FieldAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validations: Option<Validations>,
}

impl FormField {
    pub fn kind(&self) -> Option<FieldKind> {
        FieldKind::parse(&self.field_type)
    }

    pub fn is_required(&self) -> bool {
        self.validations
            .as_ref()
            .is_some_and(|v| v.required == Some(true))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Markdown text, or the default value of an input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Syntax highlighting for textareas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// An option entry: a checkbox object, or a plain string as dropdowns use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldOption {
    Plain(String),
    Checkbox(CheckboxOption),
}

impl FieldOption {
    pub fn label(&self) -> &str {
        match self {
            FieldOption::Plain(s) => s,
            FieldOption::Checkbox(c) => &c.label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckboxOption {
    pub label: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Validations {
    /// `None` when the `validations` map omits the key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

fn string_or_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Option::<StringOrList>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(StringOrList::Many(list)) => list,
        Some(StringOrList::One(text)) => text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
    })
}

impl IssueForm {
    /// Load a form from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, FormError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, FormError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String, FormError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Look up a field by id
    pub fn field(&self, id: &str) -> Option<&FormField> {
        self.body.iter().find(|f| f.id.as_deref() == Some(id))
    }

    /// Ids of the fields that have one, in body order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.body.iter().filter_map(|f| f.id.as_deref())
    }
}

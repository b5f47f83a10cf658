//! Error types for design construction

use thiserror::Error;

use crate::error::render_report;
use crate::parser::ast::Span;

/// Errors found while building a design from parsed circuit files
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DesignError {
    /// Two blocks with the same name in one file
    #[error("block '{name}' is defined more than once")]
    DuplicateBlock {
        name: String,
        span: Span,
        previous: Span,
    },

    /// A block shadows an imported name
    #[error("block '{name}' clashes with an imported name")]
    ImportClash { name: String, span: Span },

    /// Two terminals or instances with the same name in one block
    #[error("'{name}' is declared more than once in '{block}'")]
    DuplicateName {
        block: String,
        name: String,
        span: Span,
        previous: Span,
    },

    /// `new` of a type that is neither declared nor imported
    #[error("unknown type '{name}'")]
    UnknownType {
        name: String,
        span: Span,
        suggestions: Vec<String>,
    },

    /// Components are leaves and cannot contain instances
    #[error("component '{component}' cannot instantiate other blocks")]
    ComponentInstantiates { component: String, span: Span },

    /// Instances must be bound to a plain name
    #[error("cannot bind an instance to '{target}' (expected a plain name)")]
    InvalidInstanceTarget { target: String, span: Span },

    /// Path prefix names no instance of the enclosing block
    #[error("'{name}' is not an instance in '{block}'")]
    UnknownInstance {
        block: String,
        name: String,
        span: Span,
        suggestions: Vec<String>,
    },

    /// Connection endpoint names no declared terminal
    #[error("terminal '{path}' is not declared")]
    UndeclaredTerminal {
        path: String,
        span: Span,
        suggestions: Vec<String>,
    },

    /// Private terminals are only reachable inside their own block
    #[error("terminal '{path}' is private")]
    PrivateTerminal { path: String, span: Span },

    /// An instance (not one of its terminals) used as a connection endpoint
    #[error("'{path}' is an instance, not a terminal")]
    NotATerminal { path: String, span: Span },

    /// A terminal used as if it were an instance (`sig.x`)
    #[error("'{name}' is a terminal and has no members")]
    NotAnInstance { name: String, span: Span },

    /// Reference through an imported (opaque) type under strict imports
    #[error("cannot verify '{path}': '{type_name}' is imported")]
    OpaqueReference {
        path: String,
        type_name: String,
        span: Span,
    },

    /// Attribute assignment on something that does not exist
    #[error("cannot assign to '{path}': '{name}' is not declared")]
    UnknownAttributeTarget {
        path: String,
        name: String,
        span: Span,
        suggestions: Vec<String>,
    },

    /// A block instantiating itself directly or transitively
    #[error("recursive instantiation: {}", cycle.join(" -> "))]
    RecursiveInstantiation { cycle: Vec<String>, span: Span },
}

impl DesignError {
    /// Get the source span
    pub fn span(&self) -> &Span {
        match self {
            Self::DuplicateBlock { span, .. }
            | Self::ImportClash { span, .. }
            | Self::DuplicateName { span, .. }
            | Self::UnknownType { span, .. }
            | Self::ComponentInstantiates { span, .. }
            | Self::InvalidInstanceTarget { span, .. }
            | Self::UnknownInstance { span, .. }
            | Self::UndeclaredTerminal { span, .. }
            | Self::PrivateTerminal { span, .. }
            | Self::NotATerminal { span, .. }
            | Self::NotAnInstance { span, .. }
            | Self::OpaqueReference { span, .. }
            | Self::UnknownAttributeTarget { span, .. }
            | Self::RecursiveInstantiation { span, .. } => span,
        }
    }

    /// Get suggestions if available
    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::UnknownType { suggestions, .. }
            | Self::UnknownInstance { suggestions, .. }
            | Self::UndeclaredTerminal { suggestions, .. }
            | Self::UnknownAttributeTarget { suggestions, .. } => suggestions,
            _ => &[],
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let message = self.to_string();
        let note = match self.suggestions() {
            [] => None,
            names => Some(format!("did you mean {}?", quote_list(names))),
        };
        render_report(source, filename, self.span().clone(), &message, &message, note)
    }
}

fn quote_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("'{}'", n))
        .collect::<Vec<_>>()
        .join(" or ")
}

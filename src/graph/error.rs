//! Validation diagnostics.
//!
//! Every problem found while resolving a document is one `ValidationError`.
//! They are collected into `Diagnostics` so a single run reports all of them.

use crate::registry::{Kind, Section};
use std::fmt;

/// What a user-supplied identifier names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Receiver,
    Processor,
    Exporter,
    Pipeline,
}

impl From<Kind> for Role {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Receiver => Role::Receiver,
            Kind::Processor => Role::Processor,
            Kind::Exporter => Role::Exporter,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Receiver => "receiver",
            Role::Processor => "processor",
            Role::Exporter => "exporter",
            Role::Pipeline => "pipeline",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Identifier,
    UnknownType,
    Schema,
    Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{section}: {role} id must not be empty")]
    EmptyId { section: Section, role: Role },

    #[error(
        "{section}: {role} id {id:?} must not contain ':' (reserved for built-in component names)"
    )]
    ReservedSeparator {
        section: Section,
        role: Role,
        id: String,
    },

    #[error("{section}: {role} id {id:?} is declared more than once")]
    DuplicateId {
        section: Section,
        role: Role,
        id: String,
    },

    #[error("{section}: {kind} {id:?} has no `type`")]
    MissingType {
        section: Section,
        kind: Kind,
        id: String,
    },

    #[error("{section}: {kind} {id:?} has unknown type {type_name:?} (supported: {known})")]
    UnknownType {
        section: Section,
        kind: Kind,
        id: String,
        type_name: String,
        known: String,
    },

    #[error("{section}: {kind} {id:?} is missing required field {field:?}")]
    MissingField {
        section: Section,
        kind: Kind,
        id: String,
        field: String,
    },

    #[error("{section}: {kind} {id:?} has unknown field {field:?}")]
    UnknownField {
        section: Section,
        kind: Kind,
        id: String,
        field: String,
    },

    #[error("{section}: {kind} {id:?} field {field:?} must be {expected}")]
    InvalidField {
        section: Section,
        kind: Kind,
        id: String,
        field: String,
        expected: String,
    },

    #[error("{section}: pipeline {pipeline:?} must list at least one {kind}")]
    EmptyList {
        section: Section,
        pipeline: String,
        kind: Kind,
    },

    #[error(
        "{section}: pipeline {pipeline:?} {}[{position}] references undeclared {kind} {id:?}",
        .kind.plural()
    )]
    MissingReference {
        section: Section,
        pipeline: String,
        kind: Kind,
        position: usize,
        id: String,
    },

    #[error(
        "{section}: pipeline {pipeline:?} {}[{position}] repeats {kind} {id:?}",
        .kind.plural()
    )]
    RepeatedReference {
        section: Section,
        pipeline: String,
        kind: Kind,
        position: usize,
        id: String,
    },
}

impl ValidationError {
    pub fn category(&self) -> Category {
        match self {
            ValidationError::EmptyId { .. }
            | ValidationError::ReservedSeparator { .. }
            | ValidationError::DuplicateId { .. } => Category::Identifier,
            ValidationError::MissingType { .. } | ValidationError::UnknownType { .. } => {
                Category::UnknownType
            }
            ValidationError::MissingField { .. }
            | ValidationError::UnknownField { .. }
            | ValidationError::InvalidField { .. } => Category::Schema,
            ValidationError::EmptyList { .. }
            | ValidationError::MissingReference { .. }
            | ValidationError::RepeatedReference { .. } => Category::Reference,
        }
    }

    pub fn section(&self) -> Section {
        match self {
            ValidationError::EmptyId { section, .. }
            | ValidationError::ReservedSeparator { section, .. }
            | ValidationError::DuplicateId { section, .. }
            | ValidationError::MissingType { section, .. }
            | ValidationError::UnknownType { section, .. }
            | ValidationError::MissingField { section, .. }
            | ValidationError::UnknownField { section, .. }
            | ValidationError::InvalidField { section, .. }
            | ValidationError::EmptyList { section, .. }
            | ValidationError::MissingReference { section, .. }
            | ValidationError::RepeatedReference { section, .. } => *section,
        }
    }
}

/// All validation errors of one resolve pass, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    origin: Option<String>,
    errors: Vec<ValidationError>,
}

impl Diagnostics {
    /// Name the document the errors were found in.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn push(&mut self, err: ValidationError) {
        self.errors.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    pub fn count(&self, category: Category) -> usize {
        self.errors
            .iter()
            .filter(|e| e.category() == category)
            .count()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.errors.len();
        if let Some(origin) = &self.origin {
            write!(f, "{origin}: ")?;
        }
        write!(f, "{n} problem{} found:", if n == 1 { "" } else { "s" })?;
        for err in &self.errors {
            write!(f, "\n  - {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

impl IntoIterator for Diagnostics {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

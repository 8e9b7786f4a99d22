//! Identifier rules for receivers, processors, exporters and pipelines.
//!
//! `:` is reserved: built-in components are named `lib:<name>`, and no user
//! identifier may ever look like one.

use crate::graph::error::{Role, ValidationError};
use crate::registry::Section;
use std::collections::BTreeSet;

pub const NAMESPACE_SEPARATOR: char = ':';

/// Identifiers seen so far for one `(section, kind)`.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    claimed: BTreeSet<String>,
    rejected: BTreeSet<String>,
}

impl Namespace {
    pub fn contains(&self, id: &str) -> bool {
        self.claimed.contains(id)
    }

    /// Declared in the document, whether or not the declaration was valid.
    pub fn is_declared(&self, id: &str) -> bool {
        self.claimed.contains(id) || self.rejected.contains(id)
    }

    pub fn claim(&mut self, id: &str) -> bool {
        self.claimed.insert(id.to_string())
    }

    fn reject(&mut self, id: &str) {
        self.rejected.insert(id.to_string());
    }
}

/// Check `id` and claim it in `namespace`. Rejected ids are never claimed.
pub fn validate_identifier(
    section: Section,
    role: Role,
    id: &str,
    namespace: &mut Namespace,
) -> Result<(), ValidationError> {
    if id.is_empty() {
        namespace.reject(id);
        return Err(ValidationError::EmptyId { section, role });
    }
    if id.contains(NAMESPACE_SEPARATOR) {
        namespace.reject(id);
        return Err(ValidationError::ReservedSeparator {
            section,
            role,
            id: id.to_string(),
        });
    }
    if !namespace.claim(id) {
        return Err(ValidationError::DuplicateId {
            section,
            role,
            id: id.to_string(),
        });
    }
    Ok(())
}

//! Component registry: the catalog of supported component types.
//!
//! Each entry is keyed by `(section, kind, type-name)` and carries the field
//! schema used by the resolver and the per-type rendering rule used by the
//! section's backend. The registry is built once and only ever read.

pub mod catalog;
pub mod schema;

pub use catalog::CATALOG_VERSION;
pub use schema::{FieldSpec, FieldType, FieldValue, Fields, duration_millis};

use crate::render::{fluent_bit, otel};
use std::collections::BTreeMap;
use std::fmt;

/// Telemetry category. Each section has its own component namespace and
/// pipeline set, and is rendered by its own backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Logging,
    Metrics,
}

impl Section {
    pub const ALL: [Section; 2] = [Section::Logging, Section::Metrics];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Logging => "logging",
            Section::Metrics => "metrics",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Receiver,
    Processor,
    Exporter,
}

impl Kind {
    pub const ALL: [Kind; 3] = [Kind::Receiver, Kind::Processor, Kind::Exporter];

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Receiver => "receiver",
            Kind::Processor => "processor",
            Kind::Exporter => "exporter",
        }
    }

    /// Key of this kind's table in the document and in pipeline declarations.
    pub fn plural(self) -> &'static str {
        match self {
            Kind::Receiver => "receivers",
            Kind::Processor => "processors",
            Kind::Exporter => "exporters",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a backend turns one component of this type into native syntax.
#[derive(Clone, Copy)]
pub enum RenderRule {
    FluentBit(fluent_bit::Rule),
    Otel(otel::Rule),
}

impl fmt::Debug for RenderRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderRule::FluentBit(_) => f.write_str("RenderRule::FluentBit"),
            RenderRule::Otel(_) => f.write_str("RenderRule::Otel"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComponentType {
    pub section: Section,
    pub kind: Kind,
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
    pub render: RenderRule,
}

impl ComponentType {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: BTreeMap<(Section, Kind), BTreeMap<&'static str, ComponentType>>,
}

impl Registry {
    /// Registry seeded from the built-in catalog.
    pub fn builtin() -> Self {
        Self::new(catalog::builtin_types())
    }

    /// Build a registry from an explicit list of types. A later entry with the
    /// same `(section, kind, name)` replaces an earlier one.
    pub fn new(types: impl IntoIterator<Item = ComponentType>) -> Self {
        let mut map: BTreeMap<(Section, Kind), BTreeMap<&'static str, ComponentType>> =
            BTreeMap::new();
        for ty in types {
            map.entry((ty.section, ty.kind))
                .or_default()
                .insert(ty.name, ty);
        }
        Self { types: map }
    }

    pub fn lookup(&self, section: Section, kind: Kind, type_name: &str) -> Option<&ComponentType> {
        self.types.get(&(section, kind))?.get(type_name)
    }

    /// Registered type names for `(section, kind)`, sorted.
    pub fn type_names(&self, section: Section, kind: Kind) -> Vec<&'static str> {
        self.types
            .get(&(section, kind))
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.types.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup_is_scoped_by_section_and_kind() {
        let registry = Registry::builtin();
        assert!(registry.lookup(Section::Logging, Kind::Receiver, "files").is_some());
        assert!(registry.lookup(Section::Metrics, Kind::Receiver, "files").is_none());
        assert!(registry.lookup(Section::Logging, Kind::Exporter, "files").is_none());
        assert!(
            registry
                .lookup(Section::Metrics, Kind::Receiver, "hostmetrics")
                .is_some()
        );
    }

    #[test]
    fn metrics_has_no_processors() {
        let registry = Registry::builtin();
        assert!(registry.type_names(Section::Metrics, Kind::Processor).is_empty());
    }

    #[test]
    fn rules_match_the_section_backend() {
        let registry = Registry::builtin();
        for section in Section::ALL {
            for kind in Kind::ALL {
                for name in registry.type_names(section, kind) {
                    let ty = registry.lookup(section, kind, name).unwrap();
                    let ok = matches!(
                        (section, ty.render),
                        (Section::Logging, RenderRule::FluentBit(_))
                            | (Section::Metrics, RenderRule::Otel(_))
                    );
                    assert!(ok, "{section} {kind} {name} has {:?}", ty.render);
                }
            }
        }
    }

    #[test]
    fn type_names_are_sorted() {
        let registry = Registry::builtin();
        let names = registry.type_names(Section::Logging, Kind::Receiver);
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(names.contains(&"syslog"));
    }

    #[test]
    fn later_entries_replace_earlier_ones() {
        let mut types = catalog::builtin_types();
        let before = Registry::new(types.clone()).len();
        let dup = types[0].clone();
        types.push(dup);
        assert_eq!(Registry::new(types).len(), before);
    }
}

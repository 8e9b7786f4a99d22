//! Graph layer: validated, immutable pipeline graphs.
//!
//! `resolve` is the only way to build a `PipelineGraph`. Once it returns, the
//! graph is trusted: every pipeline reference points at a component in the
//! same section, and every component's fields match its registered schema.

pub mod error;
pub mod ident;
pub mod resolve;

pub use error::{Category, Diagnostics, Role, ValidationError};
pub use ident::{NAMESPACE_SEPARATOR, Namespace, validate_identifier};
pub use resolve::resolve;

use crate::registry::{FieldValue, Fields, Kind, Section};
use std::collections::{BTreeMap, BTreeSet};

/// A schema-checked receiver, processor or exporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub id: String,
    pub kind: Kind,
    pub type_name: &'static str,
    pub fields: Fields,
}

impl Component {
    pub fn str(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(FieldValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// List field; absent lists are empty.
    pub fn list(&self, field: &str) -> &[String] {
        match self.fields.get(field) {
            Some(FieldValue::List(items)) => items,
            _ => &[],
        }
    }

    pub fn int(&self, field: &str) -> Option<i64> {
        match self.fields.get(field) {
            Some(FieldValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn bool(&self, field: &str) -> Option<bool> {
        match self.fields.get(field) {
            Some(FieldValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub id: String,
    pub receivers: Vec<String>,
    /// Execution order.
    pub processors: Vec<String>,
    pub exporters: Vec<String>,
}

impl Pipeline {
    pub fn refs(&self, kind: Kind) -> &[String] {
        match kind {
            Kind::Receiver => &self.receivers,
            Kind::Processor => &self.processors,
            Kind::Exporter => &self.exporters,
        }
    }
}

/// One section's component tables and pipelines (in declared order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineGraph {
    pub section: Section,
    pub receivers: BTreeMap<String, Component>,
    pub processors: BTreeMap<String, Component>,
    pub exporters: BTreeMap<String, Component>,
    pub pipelines: Vec<Pipeline>,
}

impl PipelineGraph {
    pub fn table(&self, kind: Kind) -> &BTreeMap<String, Component> {
        match kind {
            Kind::Receiver => &self.receivers,
            Kind::Processor => &self.processors,
            Kind::Exporter => &self.exporters,
        }
    }

    pub fn component(&self, kind: Kind, id: &str) -> Option<&Component> {
        self.table(kind).get(id)
    }

    /// Components no pipeline references, as `(kind, id)` in table order.
    pub fn unused_components(&self) -> Vec<(Kind, &str)> {
        let mut used: BTreeSet<(Kind, &str)> = BTreeSet::new();
        for p in &self.pipelines {
            for kind in Kind::ALL {
                used.extend(p.refs(kind).iter().map(|id| (kind, id.as_str())));
            }
        }

        let mut out = Vec::new();
        for kind in Kind::ALL {
            for id in self.table(kind).keys() {
                if !used.contains(&(kind, id.as_str())) {
                    out.push((kind, id.as_str()));
                }
            }
        }
        out
    }
}

/// Output of a successful resolve: one graph per section present in the
/// document. An absent section is disabled and renders nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub logging: Option<PipelineGraph>,
    pub metrics: Option<PipelineGraph>,
}

impl ResolvedConfig {
    pub fn section(&self, section: Section) -> Option<&PipelineGraph> {
        match section {
            Section::Logging => self.logging.as_ref(),
            Section::Metrics => self.metrics.as_ref(),
        }
    }

    pub fn graphs(&self) -> impl Iterator<Item = &PipelineGraph> {
        self.logging.iter().chain(self.metrics.iter())
    }
}

//! Resolve a raw document into validated pipeline graphs.
//!
//! Resolution runs in two phases per section:
//! 1) Build the receiver/processor/exporter tables (identifier, type, fields).
//! 2) Resolve every pipeline against those tables.
//!
//! Errors never stop the pass. Everything found in both sections is returned
//! together, and no graph is returned if anything was found.

use crate::document::{RawComponent, RawDocument, RawPipeline, RawSection};
use crate::graph::error::{Diagnostics, Role, ValidationError};
use crate::graph::ident::{Namespace, validate_identifier};
use crate::graph::{Component, Pipeline, PipelineGraph, ResolvedConfig};
use crate::registry::{Fields, Kind, Registry, Section};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

pub fn resolve(doc: &RawDocument, registry: &Registry) -> Result<ResolvedConfig, Diagnostics> {
    let mut diags = Diagnostics::default();

    let logging = doc
        .logging
        .as_ref()
        .map(|raw| resolve_section(Section::Logging, raw, registry, &mut diags));
    let metrics = doc
        .metrics
        .as_ref()
        .map(|raw| resolve_section(Section::Metrics, raw, registry, &mut diags));

    if !diags.is_empty() {
        return Err(diags);
    }

    let resolved = ResolvedConfig { logging, metrics };
    for graph in resolved.graphs() {
        for (kind, id) in graph.unused_components() {
            warn!(
                section = %graph.section,
                "{kind} {id:?} is not used by any pipeline and will not be rendered"
            );
        }
    }
    Ok(resolved)
}

/// A component table under construction.
#[derive(Default)]
struct Table {
    namespace: Namespace,
    components: BTreeMap<String, Component>,
}

fn resolve_section(
    section: Section,
    raw: &RawSection,
    registry: &Registry,
    diags: &mut Diagnostics,
) -> PipelineGraph {
    // Phase 1: component tables.
    let mut tables: BTreeMap<Kind, Table> = BTreeMap::new();
    for kind in Kind::ALL {
        let mut table = Table::default();
        for (id, decl) in raw.table(kind).iter() {
            let id_ok = match validate_identifier(section, kind.into(), id, &mut table.namespace) {
                Ok(()) => true,
                Err(e) => {
                    diags.push(e);
                    false
                }
            };

            // Type and fields are checked even under a bad id, so one run
            // reports every problem of the declaration.
            let component = check_component(section, kind, id, decl, registry, diags);
            if let (true, Some(component)) = (id_ok, component) {
                debug!(%section, "resolved {kind} {id:?} ({})", component.type_name);
                table.components.insert(id.to_string(), component);
            }
        }
        tables.insert(kind, table);
    }

    // Phase 2: pipelines.
    let mut pipeline_ids = Namespace::default();
    let mut pipelines = Vec::new();
    for (id, decl) in raw.service.pipelines.iter() {
        let mut ok = match validate_identifier(section, Role::Pipeline, id, &mut pipeline_ids) {
            Ok(()) => true,
            Err(e) => {
                diags.push(e);
                false
            }
        };
        for kind in Kind::ALL {
            ok &= resolve_refs(section, id, kind, decl, &tables[&kind], diags);
        }
        if ok {
            pipelines.push(Pipeline {
                id: id.to_string(),
                receivers: decl.receivers.clone(),
                processors: decl.processors.clone(),
                exporters: decl.exporters.clone(),
            });
        }
    }

    let mut take = |kind: Kind| {
        tables
            .remove(&kind)
            .map(|t| t.components)
            .unwrap_or_default()
    };
    PipelineGraph {
        section,
        receivers: take(Kind::Receiver),
        processors: take(Kind::Processor),
        exporters: take(Kind::Exporter),
        pipelines,
    }
}

/// Check one declaration against its registered type. Problems are pushed to
/// `diags`; `None` means the declaration is unusable.
fn check_component(
    section: Section,
    kind: Kind,
    id: &str,
    decl: &RawComponent,
    registry: &Registry,
    diags: &mut Diagnostics,
) -> Option<Component> {
    let Some(type_name) = decl.type_name.as_deref() else {
        diags.push(ValidationError::MissingType {
            section,
            kind,
            id: id.to_string(),
        });
        return None;
    };

    let Some(ty) = registry.lookup(section, kind, type_name) else {
        let known = registry.type_names(section, kind);
        diags.push(ValidationError::UnknownType {
            section,
            kind,
            id: id.to_string(),
            type_name: type_name.to_string(),
            known: if known.is_empty() {
                "none".to_string()
            } else {
                known.join(", ")
            },
        });
        return None;
    };

    let mut ok = true;
    let mut fields = Fields::new();
    for spec in ty.fields {
        match decl.fields.get(spec.name) {
            None | Some(Value::Null) => {
                if spec.required {
                    diags.push(ValidationError::MissingField {
                        section,
                        kind,
                        id: id.to_string(),
                        field: spec.name.to_string(),
                    });
                    ok = false;
                }
            }
            Some(value) => match spec.coerce(value) {
                Some(v) => {
                    fields.insert(spec.name.to_string(), v);
                }
                None => {
                    diags.push(ValidationError::InvalidField {
                        section,
                        kind,
                        id: id.to_string(),
                        field: spec.name.to_string(),
                        expected: spec.ty.to_string(),
                    });
                    ok = false;
                }
            },
        }
    }

    for field in decl.fields.keys() {
        if ty.field(field).is_none() {
            diags.push(ValidationError::UnknownField {
                section,
                kind,
                id: id.to_string(),
                field: field.clone(),
            });
            ok = false;
        }
    }

    ok.then(|| Component {
        id: id.to_string(),
        kind,
        type_name: ty.name,
        fields,
    })
}

/// Resolve one of a pipeline's reference lists. Returns false if anything in
/// it failed.
fn resolve_refs(
    section: Section,
    pipeline: &str,
    kind: Kind,
    decl: &RawPipeline,
    table: &Table,
    diags: &mut Diagnostics,
) -> bool {
    let refs = decl.refs(kind);
    if refs.is_empty() && kind != Kind::Processor {
        diags.push(ValidationError::EmptyList {
            section,
            pipeline: pipeline.to_string(),
            kind,
        });
        return false;
    }

    let mut ok = true;
    let mut seen = BTreeSet::new();
    for (position, id) in refs.iter().enumerate() {
        if !seen.insert(id.as_str()) {
            diags.push(ValidationError::RepeatedReference {
                section,
                pipeline: pipeline.to_string(),
                kind,
                position,
                id: id.clone(),
            });
            ok = false;
            continue;
        }
        if table.components.contains_key(id) {
            continue;
        }
        ok = false;
        // A declared-but-invalid component already has its own error.
        if !table.namespace.is_declared(id) {
            diags.push(ValidationError::MissingReference {
                section,
                pipeline: pipeline.to_string(),
                kind,
                position,
                id: id.clone(),
            });
        }
    }
    ok
}

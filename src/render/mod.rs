//! Render layer: validated graphs in, backend-native config files out.
//!
//! Each backend implements `Backend` for one section. Rendering trusts the
//! graph completely; any inconsistency it trips over is a `RenderError`, which
//! means the resolver or the registry has a bug.

pub mod fluent_bit;
pub mod otel;
pub mod write;

pub use fluent_bit::FluentBit;
pub use otel::Otel;
pub use write::write_artifact;

use crate::graph::{Component, PipelineGraph, ResolvedConfig};
use crate::registry::{CATALOG_VERSION, Kind, Registry, RenderRule, Section};
use crate::settings::Settings;
use regex::{Captures, Regex};
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::info;

static UNSAFE_NAME_CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("valid name regex"));

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{backend} backend cannot render the {section} section")]
    WrongSection {
        backend: &'static str,
        section: Section,
    },

    #[error("pipeline {pipeline:?} references {kind} {id:?}, which is not in the graph")]
    DanglingReference {
        pipeline: String,
        kind: Kind,
        id: String,
    },

    #[error("{section} {kind} type {type_name:?} is not registered")]
    UnregisteredType {
        section: Section,
        kind: Kind,
        type_name: String,
    },

    #[error("{section} {kind} type {type_name:?} has no {backend} rendering rule")]
    MissingRule {
        backend: &'static str,
        section: Section,
        kind: Kind,
        type_name: String,
    },

    #[error("cannot serialize {backend} config: {source}")]
    Serialize {
        backend: &'static str,
        #[source]
        source: serde_yaml::Error,
    },
}

/// One generated file, with its path relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Backend name given to a user component inside one pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendName {
    pub pipeline: String,
    pub kind: Kind,
    pub id: String,
    pub name: String,
}

/// Everything one backend needs on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub backend: &'static str,
    pub section: Section,
    pub files: Vec<ArtifactFile>,
    pub names: Vec<BackendName>,
}

impl Artifact {
    pub fn file(&self, path: &str) -> Option<&ArtifactFile> {
        self.files.iter().find(|f| f.path.as_os_str() == path)
    }

    pub fn backend_name(&self, pipeline: &str, kind: Kind, id: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|n| n.pipeline == pipeline && n.kind == kind && n.id == id)
            .map(|n| n.name.as_str())
    }
}

pub trait Backend {
    fn name(&self) -> &'static str;

    fn section(&self) -> Section;

    fn render(&self, graph: &PipelineGraph, registry: &Registry) -> Result<Artifact, RenderError>;
}

/// Backends for the sections enabled in `settings`, in section order.
pub fn backends_for(settings: &Settings) -> Vec<Box<dyn Backend>> {
    let mut out: Vec<Box<dyn Backend>> = Vec::new();
    for section in Section::ALL {
        if !settings.enabled(section) {
            continue;
        }
        match section {
            Section::Logging => out.push(Box::new(FluentBit::new(settings))),
            Section::Metrics => out.push(Box::new(Otel::new(settings))),
        }
    }
    out
}

/// Render every enabled section that is present in `resolved`. Absent
/// sections produce no artifact.
pub fn render_all(
    resolved: &ResolvedConfig,
    registry: &Registry,
    settings: &Settings,
) -> Result<Vec<Artifact>, RenderError> {
    let mut artifacts = Vec::new();
    for backend in backends_for(settings) {
        let Some(graph) = resolved.section(backend.section()) else {
            info!(backend = backend.name(), "{} section absent, skipping", backend.section());
            continue;
        };
        let artifact = backend.render(graph, registry)?;
        info!(
            backend = backend.name(),
            files = artifact.files.len(),
            "rendered {} pipeline(s)",
            graph.pipelines.len()
        );
        artifacts.push(artifact);
    }
    Ok(artifacts)
}

/// Backend-safe form of a user id: every byte outside `[A-Za-z0-9_-]` becomes
/// `%XX`. Distinct ids always encode to distinct names, and encoded names
/// never contain `.` or `:`.
pub fn encode_name(id: &str) -> String {
    UNSAFE_NAME_CHAR
        .replace_all(id, |caps: &Captures| {
            caps[0].bytes().map(|b| format!("%{b:02X}")).collect::<String>()
        })
        .into_owned()
}

/// First line of every generated file.
pub(crate) fn generated_header() -> String {
    format!(
        "# Generated by agent-confgen {} (component catalog v{CATALOG_VERSION}). Do not edit.\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Look up a pipeline's component and its registered rendering rule.
pub(crate) fn component_rule<'g>(
    graph: &'g PipelineGraph,
    registry: &Registry,
    pipeline: &str,
    kind: Kind,
    id: &str,
) -> Result<(&'g Component, RenderRule), RenderError> {
    let component = graph
        .component(kind, id)
        .ok_or_else(|| RenderError::DanglingReference {
            pipeline: pipeline.to_string(),
            kind,
            id: id.to_string(),
        })?;
    let ty = registry
        .lookup(graph.section, kind, component.type_name)
        .ok_or_else(|| RenderError::UnregisteredType {
            section: graph.section,
            kind,
            type_name: component.type_name.to_string(),
        })?;
    Ok((component, ty.render))
}

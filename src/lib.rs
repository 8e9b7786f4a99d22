//! Configuration compiler for a host telemetry agent.
//!
//! A unified YAML document describing logging and metrics pipelines goes in;
//! Fluent Bit and OpenTelemetry Collector config files come out. The stages
//! are `document` (parse), `graph` (validate and resolve), and `render`
//! (generate and write). Nothing is written unless every stage succeeds.

pub mod document;
pub mod graph;
pub mod registry;
pub mod render;
pub mod settings;

pub use document::{RawDocument, SyntaxError};
pub use graph::{Diagnostics, PipelineGraph, ResolvedConfig, ValidationError};
pub use registry::Registry;
pub use render::{Artifact, RenderError};
pub use settings::Settings;

use std::path::{Path, PathBuf};

pub type Result<T> = anyhow::Result<T>;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] Diagnostics),

    #[error("internal rendering error: {0}")]
    Render(#[from] RenderError),
}

/// Parse and resolve a document without rendering it.
pub fn validate_str(
    text: &str,
    origin: &str,
    registry: &Registry,
) -> std::result::Result<ResolvedConfig, CompileError> {
    let doc = document::parse_document(text, origin)?;
    Ok(resolve_named(&doc, origin, registry)?)
}

pub fn validate_file(
    path: &Path,
    registry: &Registry,
) -> std::result::Result<ResolvedConfig, CompileError> {
    let doc = document::read_document(path)?;
    Ok(resolve_named(&doc, &path.display().to_string(), registry)?)
}

/// Resolve with diagnostics labelled by the document's origin.
fn resolve_named(
    doc: &RawDocument,
    origin: &str,
    registry: &Registry,
) -> std::result::Result<ResolvedConfig, Diagnostics> {
    graph::resolve(doc, registry).map_err(|diags| diags.with_origin(origin))
}

/// Resolve `doc` and render every enabled section it contains.
pub fn compile(
    doc: &RawDocument,
    registry: &Registry,
    settings: &Settings,
) -> std::result::Result<Vec<Artifact>, CompileError> {
    let resolved = graph::resolve(doc, registry)?;
    Ok(render::render_all(&resolved, registry, settings)?)
}

fn compile_named(
    doc: &RawDocument,
    origin: &str,
    registry: &Registry,
    settings: &Settings,
) -> std::result::Result<Vec<Artifact>, CompileError> {
    let resolved = resolve_named(doc, origin, registry)?;
    Ok(render::render_all(&resolved, registry, settings)?)
}

pub fn compile_str(
    text: &str,
    origin: &str,
    registry: &Registry,
    settings: &Settings,
) -> std::result::Result<Vec<Artifact>, CompileError> {
    let doc = document::parse_document(text, origin)?;
    compile_named(&doc, origin, registry, settings)
}

pub fn compile_file(
    path: &Path,
    registry: &Registry,
    settings: &Settings,
) -> std::result::Result<Vec<Artifact>, CompileError> {
    let doc = document::read_document(path)?;
    compile_named(&doc, &path.display().to_string(), registry, settings)
}

/// Write all artifacts under `out_dir`, one backend at a time.
pub fn write_artifacts(out_dir: &Path, artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for artifact in artifacts {
        written.extend(render::write_artifact(out_dir, artifact)?);
    }
    Ok(written)
}

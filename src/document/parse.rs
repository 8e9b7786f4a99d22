use crate::document::RawDocument;
use std::fs;
use std::path::{Path, PathBuf};

/// The document is not well-formed YAML, or does not have the expected shape.
///
/// Syntax errors are fatal: no validation runs on a document that fails here.
#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin}: {source}")]
    Yaml {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Parse the unified config document from a string.
///
/// `origin` names where the text came from and prefixes syntax errors. An
/// empty (or comment-only) document is a valid document with both sections
/// disabled.
pub fn parse_document(text: &str, origin: &str) -> Result<RawDocument, SyntaxError> {
    let meaningful = text
        .lines()
        .map(str::trim)
        .any(|l| !l.is_empty() && !l.starts_with('#') && l != "---");
    if !meaningful {
        return Ok(RawDocument::default());
    }

    serde_yaml::from_str(text).map_err(|source| SyntaxError::Yaml {
        origin: origin.to_string(),
        source,
    })
}

/// Read and parse the unified config document at `path`.
pub fn read_document(path: &Path) -> Result<RawDocument, SyntaxError> {
    let text = fs::read_to_string(path).map_err(|source| SyntaxError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&text, &path.display().to_string())
}

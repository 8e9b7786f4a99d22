//! Compiler settings: where generated files go and the host paths the
//! backends are configured with. These come from the command line, never from
//! the user's config document.

use crate::registry::Section;
use std::collections::BTreeSet;
use std::path::PathBuf;

pub const DEFAULT_OUT_DIR: &str = "/etc/agent/generated";
pub const DEFAULT_STATE_DIR: &str = "/var/lib/agent";
pub const DEFAULT_LOGS_DIR: &str = "/var/log/agent";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_SELF_METRICS_PORT: u16 = 8888;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root of the generated files.
    pub out_dir: PathBuf,
    /// Backend state (Fluent Bit buffers and tail offsets).
    pub state_dir: PathBuf,
    /// Backend self-logs.
    pub logs_dir: PathBuf,
    /// Log level the backends themselves run at.
    pub log_level: String,
    /// Port the metrics backend serves its own metrics on.
    pub self_metrics_port: u16,
    /// Sections that get rendered when present in the document.
    pub sections: BTreeSet<Section>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            logs_dir: PathBuf::from(DEFAULT_LOGS_DIR),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            self_metrics_port: DEFAULT_SELF_METRICS_PORT,
            sections: Section::ALL.into_iter().collect(),
        }
    }
}

impl Settings {
    pub fn enabled(&self, section: Section) -> bool {
        self.sections.contains(&section)
    }
}

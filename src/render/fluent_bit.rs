//! Fluent Bit backend for the logging section (classic `.conf` syntax).
//!
//! Every receiver of a pipeline becomes an `[INPUT]` tagged
//! `{pipeline}.{receiver}`; processors become `[FILTER]`s and exporters
//! `[OUTPUT]`s matching exactly the pipeline's tags, so pipelines never see
//! each other's records.

use crate::graph::{Component, PipelineGraph};
use crate::registry::{Kind, Registry, RenderRule, Section, duration_millis};
use crate::render::{
    Artifact, ArtifactFile, Backend, BackendName, RenderError, component_rule, encode_name,
    generated_header,
};
use crate::settings::Settings;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub const NAME: &str = "fluent-bit";
pub const MAIN_CONFIG: &str = "fluentbit/fluent_bit_main.conf";
pub const PARSER_CONFIG: &str = "fluentbit/fluent_bit_parser.conf";

const SELF_LOG_TAG: &str = "lib:fluent_bit_self";
const SYSLOG_PARSER: &str = "lib:syslog_message";
const SELF_LOG_FILE: &str = "logging-module.log";
const LOG_FILE_PATH_KEY: &str = "agent.googleapis.com/log_file_path";

/// Per-type rendering rule, by the Fluent Bit section it produces.
#[derive(Clone, Copy)]
pub enum Rule {
    Input(fn(&Component, &InputSite) -> Fragment),
    Filter(fn(&Component, &FilterSite) -> Fragment),
    Output(fn(&Component, &OutputSite) -> Fragment),
}

/// Where a receiver is placed: its tag and its tail/journal offset DB.
#[derive(Debug, Clone)]
pub struct InputSite {
    pub tag: String,
    pub db: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FilterSite {
    /// Anchored regex matching every tag of the pipeline.
    pub match_regex: String,
    /// Name of the parser this processor may define.
    pub parser: String,
}

#[derive(Debug, Clone)]
pub struct OutputSite {
    pub alias: String,
    pub match_regex: String,
}

/// One `[KIND]` section with its key/value entries in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: &'static str,
    pub entries: Vec<(String, String)>,
}

impl Block {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    pub fn set(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.entries.push((key.to_string(), value.to_string()));
        self
    }

    pub fn set_opt(self, key: &str, value: Option<impl fmt::Display>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn render(&self, out: &mut String) {
        let width = self.entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        out.push_str(&format!("[{}]\n", self.kind));
        for (key, value) in &self.entries {
            out.push_str(&format!("    {key:<width$} {value}\n"));
        }
    }
}

/// What one rule contributes: main-file blocks and parser definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub blocks: Vec<Block>,
    pub parsers: Vec<Block>,
}

impl Fragment {
    fn block(block: Block) -> Self {
        Self {
            blocks: vec![block],
            parsers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FluentBit {
    out_dir: PathBuf,
    buffers_dir: PathBuf,
    log_file: PathBuf,
    log_level: String,
}

impl FluentBit {
    pub fn new(settings: &Settings) -> Self {
        Self {
            out_dir: settings.out_dir.clone(),
            buffers_dir: settings.state_dir.join("buffers"),
            log_file: settings.logs_dir.join(SELF_LOG_FILE),
            log_level: settings.log_level.clone(),
        }
    }

    fn service(&self) -> Block {
        Block::new("SERVICE")
            .set("Daemon", "off")
            .set("Flush", 1)
            .set("Log_Level", &self.log_level)
            .set("Log_File", self.log_file.display())
            .set("Parsers_File", self.out_dir.join(PARSER_CONFIG).display())
            .set("storage.path", self.buffers_dir.display())
            .set("storage.sync", "normal")
            .set("storage.checksum", "off")
            .set("storage.backlog.mem_limit", "50M")
            .set("storage.max_chunks_up", 128)
    }

    /// Tail of the backend's own log file, shipped like any other log.
    fn self_log(&self) -> (Block, Block) {
        let input = Block::new("INPUT")
            .set("Name", "tail")
            .set("Tag", SELF_LOG_TAG)
            .set("Path", self.log_file.display())
            .set("DB", self.db_path(SELF_LOG_TAG).display())
            .set("Read_from_Head", "True")
            .set("Rotate_Wait", 30)
            .set("Skip_Long_Lines", "On")
            .set("Mem_Buf_Limit", "10M")
            .set("storage.type", "filesystem");
        let output = Block::new("OUTPUT")
            .set("Name", "stackdriver")
            .set("Match", SELF_LOG_TAG)
            .set("resource", "gce_instance")
            .set("severity_key", "logging.googleapis.com/severity")
            .set("Retry_Limit", 3)
            .set("tls", "On")
            .set("tls.verify", "Off");
        (input, output)
    }

    fn db_path(&self, tag: &str) -> PathBuf {
        self.buffers_dir.join(tag)
    }

    fn missing_rule(kind: Kind, component: &Component) -> RenderError {
        RenderError::MissingRule {
            backend: NAME,
            section: Section::Logging,
            kind,
            type_name: component.type_name.to_string(),
        }
    }
}

impl Backend for FluentBit {
    fn name(&self) -> &'static str {
        NAME
    }

    fn section(&self) -> Section {
        Section::Logging
    }

    fn render(&self, graph: &PipelineGraph, registry: &Registry) -> Result<Artifact, RenderError> {
        if graph.section != Section::Logging {
            return Err(RenderError::WrongSection {
                backend: NAME,
                section: graph.section,
            });
        }

        let (self_input, self_output) = self.self_log();
        let mut inputs = vec![self_input];
        let mut filters = Vec::new();
        let mut outputs = Vec::new();
        let mut parsers: BTreeMap<String, Block> = BTreeMap::new();
        let mut names = Vec::new();

        for pipeline in &graph.pipelines {
            let prefix = encode_name(&pipeline.id);
            let tags: Vec<String> = pipeline
                .receivers
                .iter()
                .map(|id| format!("{prefix}.{}", encode_name(id)))
                .collect();
            let match_regex = match_regex(&tags);
            let mut name = |kind: Kind, id: &str, backend_name: &str| {
                names.push(BackendName {
                    pipeline: pipeline.id.clone(),
                    kind,
                    id: id.to_string(),
                    name: backend_name.to_string(),
                });
            };

            for (id, tag) in pipeline.receivers.iter().zip(&tags) {
                let (component, rule) =
                    component_rule(graph, registry, &pipeline.id, Kind::Receiver, id)?;
                let RenderRule::FluentBit(Rule::Input(input)) = rule else {
                    return Err(Self::missing_rule(Kind::Receiver, component));
                };
                let site = InputSite {
                    tag: tag.clone(),
                    db: self.db_path(tag),
                };
                absorb(input(component, &site), &mut inputs, &mut parsers);
                name(Kind::Receiver, id, tag);
            }

            for id in &pipeline.processors {
                let (component, rule) =
                    component_rule(graph, registry, &pipeline.id, Kind::Processor, id)?;
                let RenderRule::FluentBit(Rule::Filter(filter)) = rule else {
                    return Err(Self::missing_rule(Kind::Processor, component));
                };
                let site = FilterSite {
                    match_regex: match_regex.clone(),
                    parser: format!("{prefix}.{}", encode_name(id)),
                };
                absorb(filter(component, &site), &mut filters, &mut parsers);
                name(Kind::Processor, id, &site.parser);
            }

            for id in &pipeline.exporters {
                let (component, rule) =
                    component_rule(graph, registry, &pipeline.id, Kind::Exporter, id)?;
                let RenderRule::FluentBit(Rule::Output(output)) = rule else {
                    return Err(Self::missing_rule(Kind::Exporter, component));
                };
                let site = OutputSite {
                    alias: format!("{prefix}.{}", encode_name(id)),
                    match_regex: match_regex.clone(),
                };
                absorb(output(component, &site), &mut outputs, &mut parsers);
                name(Kind::Exporter, id, &site.alias);
            }
        }
        outputs.push(self_output);

        let main = std::iter::once(self.service())
            .chain(inputs)
            .chain(filters)
            .chain(outputs);
        Ok(Artifact {
            backend: NAME,
            section: Section::Logging,
            files: vec![
                ArtifactFile {
                    path: PathBuf::from(MAIN_CONFIG),
                    contents: render_blocks(main),
                },
                ArtifactFile {
                    path: PathBuf::from(PARSER_CONFIG),
                    contents: render_blocks(parsers.into_values()),
                },
            ],
            names,
        })
    }
}

fn match_regex(tags: &[String]) -> String {
    let alternatives: Vec<String> = tags.iter().map(|t| regex::escape(t)).collect();
    format!("^(?:{})$", alternatives.join("|"))
}

/// Parsers are keyed by name; identical definitions from several pipelines
/// collapse into one.
fn absorb(fragment: Fragment, blocks: &mut Vec<Block>, parsers: &mut BTreeMap<String, Block>) {
    blocks.extend(fragment.blocks);
    for parser in fragment.parsers {
        let name = parser.get("Name").unwrap_or_default().to_string();
        parsers.insert(name, parser);
    }
}

fn render_blocks(blocks: impl IntoIterator<Item = Block>) -> String {
    let mut out = generated_header();
    for block in blocks {
        out.push('\n');
        block.render(&mut out);
    }
    out
}

fn stored_input(name: &str, tag: &str) -> Block {
    Block::new("INPUT").set("Name", name).set("Tag", tag)
}

fn buffered(block: Block) -> Block {
    block
        .set("Mem_Buf_Limit", "10M")
        .set("storage.type", "filesystem")
}

fn listen(block: Block, c: &Component, host: &str, port: i64) -> Block {
    block
        .set("Listen", c.str("listen_host").unwrap_or(host))
        .set("Port", c.int("listen_port").unwrap_or(port))
}

pub fn files_input(c: &Component, site: &InputSite) -> Fragment {
    let exclude = Some(c.list("exclude_paths").join(",")).filter(|s| !s.is_empty());
    let refresh = c
        .str("wildcard_refresh_interval")
        .and_then(duration_millis)
        .map(|ms| (ms / 1000).max(1));
    let path_key = c
        .bool("record_log_file_path")
        .filter(|record| *record)
        .map(|_| LOG_FILE_PATH_KEY);
    let block = stored_input("tail", &site.tag)
        .set("Path", c.list("include_paths").join(","))
        .set_opt("Exclude_Path", exclude)
        .set_opt("Refresh_Interval", refresh)
        .set_opt("Path_Key", path_key)
        .set("DB", site.db.display())
        .set("Read_from_Head", "True")
        .set("Rotate_Wait", 30)
        .set("Skip_Long_Lines", "On")
        .set("Buffer_Chunk_Size", "512k")
        .set("Buffer_Max_Size", "2M");
    Fragment::block(buffered(block))
}

pub fn syslog_input(c: &Component, site: &InputSite) -> Fragment {
    let block = stored_input("syslog", &site.tag)
        .set("Mode", c.str("transport_protocol").unwrap_or("tcp"));
    let block = listen(block, c, "0.0.0.0", 514).set("Parser", SYSLOG_PARSER);
    Fragment {
        blocks: vec![buffered(block)],
        parsers: vec![
            Block::new("PARSER")
                .set("Name", SYSLOG_PARSER)
                .set("Format", "regex")
                .set("Regex", r"^(?<message>.*)$"),
        ],
    }
}

pub fn tcp_input(c: &Component, site: &InputSite) -> Fragment {
    let block = listen(stored_input("tcp", &site.tag), c, "127.0.0.1", 5170)
        .set("Format", c.str("format").unwrap_or("json"));
    Fragment::block(buffered(block))
}

pub fn forward_input(c: &Component, site: &InputSite) -> Fragment {
    let block = listen(stored_input("forward", &site.tag), c, "127.0.0.1", 24224);
    Fragment::block(buffered(block))
}

pub fn journald_input(_: &Component, site: &InputSite) -> Fragment {
    let block = stored_input("systemd", &site.tag).set("DB", site.db.display());
    Fragment::block(buffered(block))
}

fn parser_filter(c: &Component, site: &FilterSite) -> Block {
    Block::new("FILTER")
        .set("Name", "parser")
        .set("Match_Regex", &site.match_regex)
        .set("Key_Name", c.str("field").unwrap_or("message"))
        .set("Parser", &site.parser)
        .set("Reserve_Data", "True")
        .set("Preserve_Key", "False")
}

fn parser_definition(name: &str, format: &str) -> Block {
    Block::new("PARSER").set("Name", name).set("Format", format)
}

fn parser_time(block: Block, c: &Component) -> Block {
    block
        .set_opt("Time_Key", c.str("time_key"))
        .set_opt("Time_Format", c.str("time_format"))
}

pub fn parse_json_filter(c: &Component, site: &FilterSite) -> Fragment {
    Fragment {
        blocks: vec![parser_filter(c, site)],
        parsers: vec![parser_time(parser_definition(&site.parser, "json"), c)],
    }
}

pub fn parse_regex_filter(c: &Component, site: &FilterSite) -> Fragment {
    let parser =
        parser_definition(&site.parser, "regex").set("Regex", c.str("regex").unwrap_or_default());
    Fragment {
        blocks: vec![parser_filter(c, site)],
        parsers: vec![parser_time(parser, c)],
    }
}

/// Each `match_any` entry is `<field> <regex>`; a record matching any of them
/// is dropped.
pub fn exclude_logs_filter(c: &Component, site: &FilterSite) -> Fragment {
    let block = Block::new("FILTER")
        .set("Name", "grep")
        .set("Match_Regex", &site.match_regex);
    let block = c
        .list("match_any")
        .iter()
        .fold(block, |block, expr| block.set("Exclude", expr));
    Fragment::block(block)
}

pub fn cloud_logging_output(_: &Component, site: &OutputSite) -> Fragment {
    Fragment::block(
        Block::new("OUTPUT")
            .set("Name", "stackdriver")
            .set("Alias", &site.alias)
            .set("Match_Regex", &site.match_regex)
            .set("resource", "gce_instance")
            .set("severity_key", "logging.googleapis.com/severity")
            .set("workers", 8)
            .set("Retry_Limit", 3)
            .set("net.connect_timeout_log_error", "False")
            .set("storage.total_limit_size", "2G")
            .set("tls", "On")
            .set("tls.verify", "Off"),
    )
}

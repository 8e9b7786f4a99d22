//! Built-in component catalog.
//!
//! Bump `CATALOG_VERSION` whenever a type, a field, or a rendering rule
//! changes; the version is stamped into every generated file.

use crate::registry::schema::{FieldSpec, FieldType};
use crate::registry::{ComponentType, Kind, RenderRule, Section};
use crate::render::{fluent_bit, otel};

pub const CATALOG_VERSION: u32 = 1;

const TRANSPORT: FieldType = FieldType::OneOf(&["tcp", "udp"]);

const FILES_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("include_paths", FieldType::StringList),
    FieldSpec::optional("exclude_paths", FieldType::StringList),
    FieldSpec::optional("wildcard_refresh_interval", FieldType::Duration),
    FieldSpec::optional("record_log_file_path", FieldType::Bool),
];

const SYSLOG_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("transport_protocol", TRANSPORT),
    FieldSpec::required("listen_host", FieldType::String),
    FieldSpec::required("listen_port", FieldType::Port),
];

const TCP_FIELDS: &[FieldSpec] = &[
    FieldSpec::optional("format", FieldType::OneOf(&["json"])),
    FieldSpec::optional("listen_host", FieldType::String),
    FieldSpec::optional("listen_port", FieldType::Port),
];

const FORWARD_FIELDS: &[FieldSpec] = &[
    FieldSpec::optional("listen_host", FieldType::String),
    FieldSpec::optional("listen_port", FieldType::Port),
];

const PARSE_JSON_FIELDS: &[FieldSpec] = &[
    FieldSpec::optional("field", FieldType::String),
    FieldSpec::optional("time_key", FieldType::String),
    FieldSpec::optional("time_format", FieldType::String),
];

const PARSE_REGEX_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("regex", FieldType::String),
    FieldSpec::optional("field", FieldType::String),
    FieldSpec::optional("time_key", FieldType::String),
    FieldSpec::optional("time_format", FieldType::String),
];

const EXCLUDE_LOGS_FIELDS: &[FieldSpec] =
    &[FieldSpec::required("match_any", FieldType::MatchList)];

const HOSTMETRICS_FIELDS: &[FieldSpec] =
    &[FieldSpec::optional("collection_interval", FieldType::Duration)];

const NGINX_FIELDS: &[FieldSpec] = &[
    FieldSpec::optional("stub_status_url", FieldType::String),
    FieldSpec::optional("collection_interval", FieldType::Duration),
];

const MONITORING_FIELDS: &[FieldSpec] = &[FieldSpec::optional("project", FieldType::String)];

fn logging(
    kind: Kind,
    name: &'static str,
    fields: &'static [FieldSpec],
    rule: fluent_bit::Rule,
) -> ComponentType {
    ComponentType {
        section: Section::Logging,
        kind,
        name,
        fields,
        render: RenderRule::FluentBit(rule),
    }
}

fn metrics(
    kind: Kind,
    name: &'static str,
    fields: &'static [FieldSpec],
    rule: otel::Rule,
) -> ComponentType {
    ComponentType {
        section: Section::Metrics,
        kind,
        name,
        fields,
        render: RenderRule::Otel(rule),
    }
}

pub fn builtin_types() -> Vec<ComponentType> {
    use fluent_bit::Rule::{Filter, Input, Output};

    vec![
        logging(
            Kind::Receiver,
            "files",
            FILES_FIELDS,
            Input(fluent_bit::files_input),
        ),
        logging(
            Kind::Receiver,
            "syslog",
            SYSLOG_FIELDS,
            Input(fluent_bit::syslog_input),
        ),
        logging(
            Kind::Receiver,
            "tcp",
            TCP_FIELDS,
            Input(fluent_bit::tcp_input),
        ),
        logging(
            Kind::Receiver,
            "fluent_forward",
            FORWARD_FIELDS,
            Input(fluent_bit::forward_input),
        ),
        logging(
            Kind::Receiver,
            "systemd_journald",
            &[],
            Input(fluent_bit::journald_input),
        ),
        logging(
            Kind::Processor,
            "parse_json",
            PARSE_JSON_FIELDS,
            Filter(fluent_bit::parse_json_filter),
        ),
        logging(
            Kind::Processor,
            "parse_regex",
            PARSE_REGEX_FIELDS,
            Filter(fluent_bit::parse_regex_filter),
        ),
        logging(
            Kind::Processor,
            "exclude_logs",
            EXCLUDE_LOGS_FIELDS,
            Filter(fluent_bit::exclude_logs_filter),
        ),
        logging(
            Kind::Exporter,
            "google_cloud_logging",
            &[],
            Output(fluent_bit::cloud_logging_output),
        ),
        metrics(
            Kind::Receiver,
            "hostmetrics",
            HOSTMETRICS_FIELDS,
            otel::hostmetrics_receiver,
        ),
        metrics(
            Kind::Receiver,
            "nginx",
            NGINX_FIELDS,
            otel::nginx_receiver,
        ),
        metrics(
            Kind::Exporter,
            "google_cloud_monitoring",
            MONITORING_FIELDS,
            otel::cloud_monitoring_exporter,
        ),
    ]
}

//! OpenTelemetry Collector backend for the metrics section.
//!
//! User components become `{otel_type}/{id}` entries and each user pipeline
//! becomes `metrics/{pipeline}`. The collector also scrapes and exports its
//! own metrics through the synthetic `metrics/lib:agent` pipeline.

use crate::graph::{Component, PipelineGraph};
use crate::registry::{Kind, Registry, RenderRule, Section};
use crate::render::{
    Artifact, ArtifactFile, Backend, BackendName, RenderError, component_rule, encode_name,
    generated_header,
};
use crate::settings::Settings;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const NAME: &str = "otel";
pub const CONFIG: &str = "otel/otel.yaml";

const SELF_PIPELINE: &str = "metrics/lib:agent";
const SELF_RECEIVER: &str = "prometheus/lib:agent";
const SELF_EXPORTER: &str = "googlecloud/lib:agent";
const RESOURCE_DETECTION: &str = "resourcedetection/lib:agent";

const DEFAULT_INTERVAL: &str = "60s";
const DEFAULT_STUB_STATUS_URL: &str = "http://localhost/status";
const USER_METRIC_PREFIX: &str = "workload.googleapis.com/";
const AGENT_METRIC_PREFIX: &str = "agent.googleapis.com/";

/// Per-type rendering rule.
pub type Rule = fn(&Component) -> Fragment;

/// Collector component type and its config body.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub otel_type: &'static str,
    pub config: Value,
}

#[derive(Debug, Clone)]
pub struct Otel {
    self_metrics_port: u16,
    log_level: String,
}

impl Otel {
    pub fn new(settings: &Settings) -> Self {
        Self {
            self_metrics_port: settings.self_metrics_port,
            log_level: settings.log_level.clone(),
        }
    }

    fn self_metrics_address(&self) -> String {
        format!("0.0.0.0:{}", self.self_metrics_port)
    }

    fn self_scrape(&self) -> Value {
        json!({
            "config": {
                "scrape_configs": [{
                    "job_name": "otel-collector",
                    "scrape_interval": DEFAULT_INTERVAL,
                    "static_configs": [{ "targets": [self.self_metrics_address()] }],
                }],
            },
        })
    }

    fn telemetry(&self) -> Value {
        json!({
            "logs": { "level": self.log_level },
            "metrics": { "address": self.self_metrics_address() },
        })
    }
}

impl Backend for Otel {
    fn name(&self) -> &'static str {
        NAME
    }

    fn section(&self) -> Section {
        Section::Metrics
    }

    fn render(&self, graph: &PipelineGraph, registry: &Registry) -> Result<Artifact, RenderError> {
        if graph.section != Section::Metrics {
            return Err(RenderError::WrongSection {
                backend: NAME,
                section: graph.section,
            });
        }

        let mut tables: BTreeMap<Kind, Map<String, Value>> = BTreeMap::new();
        tables
            .entry(Kind::Receiver)
            .or_default()
            .insert(SELF_RECEIVER.to_string(), self.self_scrape());
        tables.entry(Kind::Processor).or_default().insert(
            RESOURCE_DETECTION.to_string(),
            json!({ "detectors": ["gcp", "system"] }),
        );
        tables.entry(Kind::Exporter).or_default().insert(
            SELF_EXPORTER.to_string(),
            googlecloud(None, AGENT_METRIC_PREFIX),
        );

        let mut pipelines = Map::new();
        pipelines.insert(
            SELF_PIPELINE.to_string(),
            json!({
                "receivers": [SELF_RECEIVER],
                "processors": [RESOURCE_DETECTION],
                "exporters": [SELF_EXPORTER],
            }),
        );

        let mut names = Vec::new();
        for pipeline in &graph.pipelines {
            let mut wiring: BTreeMap<Kind, Vec<String>> = BTreeMap::new();
            wiring
                .entry(Kind::Processor)
                .or_default()
                .push(RESOURCE_DETECTION.to_string());

            for kind in Kind::ALL {
                for id in pipeline.refs(kind) {
                    let (component, rule) =
                        component_rule(graph, registry, &pipeline.id, kind, id)?;
                    let RenderRule::Otel(rule) = rule else {
                        return Err(RenderError::MissingRule {
                            backend: NAME,
                            section: Section::Metrics,
                            kind,
                            type_name: component.type_name.to_string(),
                        });
                    };
                    let fragment = rule(component);
                    let name = format!("{}/{}", fragment.otel_type, encode_name(id));
                    tables
                        .entry(kind)
                        .or_default()
                        .insert(name.clone(), fragment.config);
                    wiring.entry(kind).or_default().push(name.clone());
                    names.push(BackendName {
                        pipeline: pipeline.id.clone(),
                        kind,
                        id: id.clone(),
                        name,
                    });
                }
            }

            let mut body = Map::new();
            for kind in Kind::ALL {
                let refs = wiring.remove(&kind).unwrap_or_default();
                body.insert(kind.plural().to_string(), json!(refs));
            }
            pipelines.insert(
                format!("metrics/{}", encode_name(&pipeline.id)),
                Value::Object(body),
            );
        }

        let mut config = Map::new();
        for kind in Kind::ALL {
            let table = tables.remove(&kind).unwrap_or_default();
            config.insert(kind.plural().to_string(), Value::Object(table));
        }
        config.insert(
            "service".to_string(),
            json!({ "pipelines": pipelines, "telemetry": self.telemetry() }),
        );

        let yaml = serde_yaml::to_string(&Value::Object(config)).map_err(|source| {
            RenderError::Serialize {
                backend: NAME,
                source,
            }
        })?;

        Ok(Artifact {
            backend: NAME,
            section: Section::Metrics,
            files: vec![ArtifactFile {
                path: PathBuf::from(CONFIG),
                contents: generated_header() + &yaml,
            }],
            names,
        })
    }
}

fn googlecloud(project: Option<&str>, prefix: &str) -> Value {
    let mut config = json!({
        "user_agent": format!("agent-confgen/{}", env!("CARGO_PKG_VERSION")),
        "metric": { "prefix": prefix },
    });
    if let Some(project) = project {
        config["project"] = json!(project);
    }
    config
}

pub fn hostmetrics_receiver(c: &Component) -> Fragment {
    Fragment {
        otel_type: "hostmetrics",
        config: json!({
            "collection_interval": c.str("collection_interval").unwrap_or(DEFAULT_INTERVAL),
            "scrapers": {
                "cpu": {},
                "disk": {},
                "filesystem": {},
                "load": {},
                "memory": {},
                "network": {},
                "paging": {},
                "processes": {},
            },
        }),
    }
}

pub fn nginx_receiver(c: &Component) -> Fragment {
    Fragment {
        otel_type: "nginx",
        config: json!({
            "endpoint": c.str("stub_status_url").unwrap_or(DEFAULT_STUB_STATUS_URL),
            "collection_interval": c.str("collection_interval").unwrap_or(DEFAULT_INTERVAL),
        }),
    }
}

pub fn cloud_monitoring_exporter(c: &Component) -> Fragment {
    Fragment {
        otel_type: "googlecloud",
        config: googlecloud(c.str("project"), USER_METRIC_PREFIX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_document;
    use crate::graph::resolve;
    use pretty_assertions::assert_eq;

    const HOST: &str = r#"
metrics:
  receivers:
    host:
      type: hostmetrics
      collection_interval: 30s
    web:
      type: nginx
  exporters:
    google:
      type: google_cloud_monitoring
      project: my-project
  service:
    pipelines:
      default_pipeline:
        receivers: [host, web]
        exporters: [google]
"#;

    fn render_yaml(yaml: &str) -> (Artifact, Value) {
        let doc = parse_document(yaml, "test").unwrap();
        let registry = Registry::builtin();
        let resolved = resolve(&doc, &registry).unwrap();
        let artifact = Otel::new(&Settings::default())
            .render(resolved.metrics.as_ref().unwrap(), &registry)
            .unwrap();
        let parsed = serde_yaml::from_str(&artifact.file(CONFIG).unwrap().contents).unwrap();
        (artifact, parsed)
    }

    #[test]
    fn user_pipeline_is_wired_with_resource_detection_first() {
        let (artifact, config) = render_yaml(HOST);
        assert_eq!(
            config["service"]["pipelines"]["metrics/default_pipeline"],
            json!({
                "receivers": ["hostmetrics/host", "nginx/web"],
                "processors": [RESOURCE_DETECTION],
                "exporters": ["googlecloud/google"],
            })
        );
        assert_eq!(
            config["receivers"]["hostmetrics/host"]["collection_interval"],
            json!("30s")
        );
        assert_eq!(
            config["receivers"]["nginx/web"]["endpoint"],
            json!(DEFAULT_STUB_STATUS_URL)
        );
        assert_eq!(
            config["exporters"]["googlecloud/google"]["project"],
            json!("my-project")
        );
        assert_eq!(
            artifact.backend_name("default_pipeline", Kind::Receiver, "web"),
            Some("nginx/web")
        );
    }

    #[test]
    fn self_metrics_pipeline_and_telemetry() {
        let (_, config) = render_yaml(HOST);
        let service = &config["service"];
        assert_eq!(
            service["pipelines"][SELF_PIPELINE]["receivers"],
            json!([SELF_RECEIVER])
        );
        assert_eq!(
            service["telemetry"]["metrics"]["address"],
            json!("0.0.0.0:8888")
        );
        assert_eq!(service["telemetry"]["logs"]["level"], json!("info"));
        assert_eq!(
            config["exporters"][SELF_EXPORTER]["metric"]["prefix"],
            json!(AGENT_METRIC_PREFIX)
        );
    }

    #[test]
    fn output_starts_with_header() {
        let (artifact, _) = render_yaml(HOST);
        let contents = &artifact.file(CONFIG).unwrap().contents;
        assert!(contents.starts_with(&generated_header()));
    }

    #[test]
    fn unreferenced_components_are_not_rendered() {
        let (_, config) = render_yaml(
            r#"
metrics:
  receivers:
    host:
      type: hostmetrics
    spare:
      type: nginx
  exporters:
    google:
      type: google_cloud_monitoring
  service:
    pipelines:
      p:
        receivers: [host]
        exporters: [google]
"#,
        );
        let receivers = config["receivers"].as_object().unwrap();
        assert!(receivers.contains_key("hostmetrics/host"));
        assert!(!receivers.contains_key("nginx/spare"));
    }

    #[test]
    fn shared_components_are_declared_once() {
        let (artifact, config) = render_yaml(
            r#"
metrics:
  receivers:
    host:
      type: hostmetrics
  exporters:
    google:
      type: google_cloud_monitoring
  service:
    pipelines:
      a:
        receivers: [host]
        exporters: [google]
      b.c:
        receivers: [host]
        exporters: [google]
"#,
        );
        assert_eq!(config["receivers"].as_object().unwrap().len(), 2);
        assert!(config["service"]["pipelines"]["metrics/b%2Ec"].is_object());
        assert_eq!(artifact.names.len(), 4);
    }
}

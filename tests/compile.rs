use agent_confgen::graph::{Category, Role};
use agent_confgen::registry::{Kind, Section};
use agent_confgen::render::fluent_bit::{MAIN_CONFIG, PARSER_CONFIG};
use agent_confgen::render::otel::CONFIG as OTEL_CONFIG;
use agent_confgen::{CompileError, Registry, Settings, ValidationError};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn compile(name: &str) -> Result<Vec<agent_confgen::Artifact>, CompileError> {
    agent_confgen::compile_file(&fixture(name), &Registry::builtin(), &Settings::default())
}

fn single_error(name: &str) -> ValidationError {
    match compile(name) {
        Err(CompileError::Invalid(diags)) => {
            assert_eq!(diags.len(), 1, "{diags}");
            diags.errors()[0].clone()
        }
        other => panic!("expected validation errors, got {other:?}"),
    }
}

#[test]
fn syslog_scenario_renders_logging_only() {
    let artifacts = compile("syslog_google.yaml").unwrap();
    assert_eq!(artifacts.len(), 1);

    let logging = &artifacts[0];
    assert_eq!(logging.section, Section::Logging);
    assert_eq!(
        logging.backend_name("default_pipeline", Kind::Receiver, "syslog"),
        Some("default_pipeline.syslog")
    );
    assert_eq!(
        logging.backend_name("default_pipeline", Kind::Exporter, "google"),
        Some("default_pipeline.google")
    );

    let main = &logging.file(MAIN_CONFIG).unwrap().contents;
    assert!(main.contains("default_pipeline.syslog"));
    assert!(main.contains("default_pipeline.google"));
    assert!(main.contains("/var/log/syslog"));
    assert!(logging.file(PARSER_CONFIG).is_some());
    assert!(logging.file(OTEL_CONFIG).is_none());
}

#[test]
fn syslog_receiver_brings_its_parser() {
    let artifacts = compile("syslog_receiver.yaml").unwrap();
    assert_eq!(artifacts.len(), 1);

    let logging = &artifacts[0];
    let main = &logging.file(MAIN_CONFIG).unwrap().contents;
    assert!(main.contains("default_pipeline.syslog"));
    assert!(main.contains("5140"));
    let parsers = &logging.file(PARSER_CONFIG).unwrap().contents;
    assert!(parsers.contains("lib:syslog_message"));
}

#[test]
fn values_that_would_break_the_conf_format_are_rejected() {
    let diags = match compile("injected_path.yaml") {
        Err(CompileError::Invalid(diags)) => diags,
        other => panic!("expected validation errors, got {other:?}"),
    };
    assert_eq!(diags.len(), 2, "{diags}");
    assert_eq!(diags.count(Category::Schema), 2);
    let text = diags.to_string();
    assert!(text.contains("include_paths"), "{text}");
    assert!(text.contains("match_any"), "{text}");
}

#[test]
fn diagnostics_name_the_document() {
    let path = fixture("invalid_pipeline_id.yaml");
    let err = agent_confgen::validate_file(&path, &Registry::builtin()).unwrap_err();
    let CompileError::Invalid(diags) = &err else {
        panic!("expected validation errors, got {err:?}");
    };
    let shown = path.display().to_string();
    assert_eq!(diags.origin(), Some(shown.as_str()));
    assert!(err.to_string().contains(&shown), "{err}");
}

#[test]
fn reserved_receiver_id_is_one_identifier_error() {
    assert_eq!(
        single_error("invalid_receiver_id.yaml"),
        ValidationError::ReservedSeparator {
            section: Section::Logging,
            role: Role::Receiver,
            id: "lib:syslog".to_string(),
        }
    );
}

#[test]
fn reserved_processor_id_is_one_identifier_error() {
    let err = single_error("invalid_processor_id.yaml");
    assert_eq!(err.category(), Category::Identifier);
    assert!(err.to_string().contains("\"lib:parse\""), "{err}");
    assert!(err.to_string().contains("processor"), "{err}");
}

#[test]
fn reserved_pipeline_id_is_one_identifier_error() {
    assert_eq!(
        single_error("invalid_pipeline_id.yaml"),
        ValidationError::ReservedSeparator {
            section: Section::Logging,
            role: Role::Pipeline,
            id: "lib:default".to_string(),
        }
    );
}

#[test]
fn rendering_is_deterministic() {
    let first = compile("full.yaml").unwrap();
    let second = compile("full.yaml").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn disabled_sections_are_not_rendered() {
    let settings = Settings {
        sections: [Section::Metrics].into_iter().collect(),
        ..Settings::default()
    };
    let artifacts =
        agent_confgen::compile_file(&fixture("full.yaml"), &Registry::builtin(), &settings)
            .unwrap();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].section, Section::Metrics);
}

#[test]
fn zero_exporters_rejected_zero_processors_accepted() {
    let yaml = r#"
logging:
  receivers:
    journal:
      type: systemd_journald
  exporters:
    google:
      type: google_cloud_logging
  service:
    pipelines:
      no_processors:
        receivers: [journal]
        exporters: [google]
      no_exporters:
        receivers: [journal]
        exporters: []
"#;
    let err =
        agent_confgen::validate_str(yaml, "inline.yaml", &Registry::builtin()).unwrap_err();
    let CompileError::Invalid(diags) = err else {
        panic!("expected validation errors, got {err:?}");
    };
    assert_eq!(diags.len(), 1, "{diags}");
    assert_eq!(diags.count(Category::Reference), 1);
    assert!(diags.to_string().contains("\"no_exporters\""), "{diags}");
}

#[test]
fn syntax_errors_stop_before_validation() {
    let err = agent_confgen::validate_str("logging: [unclosed", "broken.yaml", &Registry::builtin())
        .unwrap_err();
    assert!(matches!(err, CompileError::Syntax(_)), "{err:?}");
}

#[test]
fn generate_writes_all_files() {
    let out = TempDir::new().unwrap();
    let settings = Settings {
        out_dir: out.path().to_path_buf(),
        ..Settings::default()
    };
    let artifacts =
        agent_confgen::compile_file(&fixture("full.yaml"), &Registry::builtin(), &settings)
            .unwrap();
    let written = agent_confgen::write_artifacts(out.path(), &artifacts).unwrap();

    let expected: Vec<PathBuf> = [MAIN_CONFIG, PARSER_CONFIG, OTEL_CONFIG]
        .iter()
        .map(|p| out.path().join(p))
        .collect();
    assert_eq!(written, expected);

    let main = std::fs::read_to_string(out.path().join(MAIN_CONFIG)).unwrap();
    assert!(main.contains(&out.path().join(PARSER_CONFIG).display().to_string()));
    let otel = std::fs::read_to_string(out.path().join(OTEL_CONFIG)).unwrap();
    assert!(otel.contains("metrics/default_pipeline"));
}

use agent_confgen::registry::Section;
use agent_confgen::settings::{
    DEFAULT_LOG_LEVEL, DEFAULT_LOGS_DIR, DEFAULT_OUT_DIR, DEFAULT_SELF_METRICS_PORT,
    DEFAULT_STATE_DIR,
};
use agent_confgen::{CompileError, Registry, Settings};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod logging;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "agent-confgen")]
#[command(about = "Compile the unified agent config into backend config files", long_about = None)]
struct Cli {
    /// Log level of this tool (RUST_LOG takes precedence).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the config and write the backend config files.
    Generate {
        #[arg(long)]
        config: PathBuf,

        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Validate the config without writing anything.
    Validate {
        #[arg(long)]
        config: PathBuf,
    },
}

#[derive(Args)]
struct SettingsArgs {
    #[arg(long, default_value = DEFAULT_OUT_DIR)]
    out_dir: PathBuf,

    /// Backend state: Fluent Bit buffers and offset DBs.
    #[arg(long, default_value = DEFAULT_STATE_DIR)]
    state_dir: PathBuf,

    /// Where the backends write their own logs.
    #[arg(long, default_value = DEFAULT_LOGS_DIR)]
    logs_dir: PathBuf,

    /// Log level written into the generated backend configs.
    #[arg(long, default_value = DEFAULT_LOG_LEVEL)]
    backend_log_level: String,

    #[arg(long, default_value_t = DEFAULT_SELF_METRICS_PORT)]
    self_metrics_port: u16,

    /// Only render these sections (repeatable; default: all).
    #[arg(long = "section", value_enum)]
    sections: Vec<SectionArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SectionArg {
    Logging,
    Metrics,
}

impl From<SectionArg> for Section {
    fn from(arg: SectionArg) -> Self {
        match arg {
            SectionArg::Logging => Section::Logging,
            SectionArg::Metrics => Section::Metrics,
        }
    }
}

impl SettingsArgs {
    fn into_settings(self) -> Settings {
        let mut settings = Settings {
            out_dir: self.out_dir,
            state_dir: self.state_dir,
            logs_dir: self.logs_dir,
            log_level: self.backend_log_level,
            self_metrics_port: self.self_metrics_port,
            ..Settings::default()
        };
        if !self.sections.is_empty() {
            settings.sections = self.sections.into_iter().map(Section::from).collect();
        }
        settings
    }
}

/// Compile errors already carry their full detail in the message.
fn flatten(err: CompileError) -> anyhow::Error {
    anyhow::anyhow!("{err}")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let registry = Registry::builtin();

    match cli.cmd {
        Commands::Generate { config, settings } => {
            let settings = settings.into_settings();
            let artifacts =
                agent_confgen::compile_file(&config, &registry, &settings).map_err(flatten)?;
            let written = agent_confgen::write_artifacts(&settings.out_dir, &artifacts)?;
            for path in written {
                println!("Wrote {}", path.display());
            }
        }
        Commands::Validate { config } => {
            let resolved = agent_confgen::validate_file(&config, &registry).map_err(flatten)?;
            for section in Section::ALL {
                match resolved.section(section) {
                    Some(graph) => println!(
                        "{section}: {} receiver(s), {} processor(s), {} exporter(s), {} pipeline(s)",
                        graph.receivers.len(),
                        graph.processors.len(),
                        graph.exporters.len(),
                        graph.pipelines.len()
                    ),
                    None => println!("{section}: disabled"),
                }
            }
            println!("{} is valid", config.display());
        }
    }

    Ok(())
}

//! omnibus-config
//!
//! Checks and inspects Omnibus-style platform descriptors (`gitlab.rb`).
//!
//! # Architecture Overview
//!
//! ```text
//!   gitlab.rb ──▶ descriptor::load_file ──▶ Settings ──┬──▶ validation::validate ──▶ errors
//!                                                      ├──▶ validation::advisories ──▶ advisories
//!                                                      ├──▶ descriptor::render ──▶ canonical text
//!                                                      └──▶ Deployment (typed view)
//! ```
//!
//! Exit status: 0 valid, 1 violations (or advisories with `--strict`), 2 load failure.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use omnibus_config::config::{load_config, LogFormat, ToolConfig};
use omnibus_config::descriptor::watcher::{DescriptorWatcher, Rejection, ReloadOutcome};
use omnibus_config::descriptor::{load_file, render_with, Settings};
use omnibus_config::observability::init_logging;
use omnibus_config::validation::schema::{self, SCHEMA};
use omnibus_config::{Deployment, Report};

const EXIT_INVALID: u8 = 1;
const EXIT_LOAD_FAILED: u8 = 2;

#[derive(Parser)]
#[command(name = "omnibus-config")]
#[command(about = "Check and inspect Omnibus-style platform descriptors", long_about = None)]
struct Cli {
    /// Tool configuration file (TOML).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log output format (overrides the configuration file).
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a descriptor
    Check {
        file: PathBuf,
        /// Accept keys the schema does not know
        #[arg(long)]
        allow_unknown: bool,
        /// Fail on advisories too
        #[arg(long)]
        strict: bool,
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },
    /// Print the descriptor in canonical form
    Show {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = ShowFormat::Rb)]
        format: ShowFormat,
        /// Do not hide sensitive values
        #[arg(long)]
        reveal: bool,
    },
    /// Print one setting by dotted key
    Get { file: PathBuf, key: String },
    /// Print the database target and security contexts
    Summary { file: PathBuf },
    /// List the known keys
    Schema {
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },
    /// Re-check the descriptor whenever it changes
    Watch {
        file: PathBuf,
        #[arg(long)]
        allow_unknown: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ShowFormat {
    Rb,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {}: {}", path.display(), e);
                return ExitCode::from(EXIT_LOAD_FAILED);
            }
        },
        None => ToolConfig::default(),
    };
    if let Some(format) = cli.log_format {
        config.logging.format = match format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        };
    }
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("warning: logging not initialized: {}", e);
    }

    match run(cli.command, config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(EXIT_LOAD_FAILED)
        }
    }
}

async fn run(command: Commands, mut config: ToolConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match command {
        Commands::Check {
            file,
            allow_unknown,
            strict,
            format,
        } => {
            config.validation.allow_unknown_keys |= allow_unknown;
            let strict = strict || config.validation.fail_on_advisories;
            let (_, report) = Report::check_file(&file, &config.validation.options())?;
            match format {
                ReportFormat::Text => print!("{}", report.to_text()),
                ReportFormat::Json => println!("{}", report.to_json()),
            }
            tracing::info!(
                path = %file.display(),
                violations = report.violations.len(),
                advisories = report.advisories.len(),
                "Check complete"
            );
            Ok(exit_for(report.passes(strict)))
        }
        Commands::Show {
            file,
            format,
            reveal,
        } => {
            let settings = load_file(&file)?;
            let redact = config.output.redact_secrets && !reveal;
            match format {
                ShowFormat::Rb => print!(
                    "{}",
                    render_with(&settings, |key| redact && schema::is_sensitive(&key.to_string()))
                ),
                ShowFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json_view(&settings, redact))?)
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Get { file, key } => {
            let settings = load_file(&file)?;
            match settings.get(&key) {
                Some(value) => {
                    match value.as_str() {
                        Some(s) => println!("{}", s),
                        None if value.as_map().is_some() => {
                            println!("{}", serde_json::to_string_pretty(value)?)
                        }
                        None => println!("{}", value),
                    }
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("{}: key `{}` is not set", file.display(), key);
                    Ok(ExitCode::from(EXIT_INVALID))
                }
            }
        }
        Commands::Summary { file } => {
            let (settings, report) = Report::check_file(&file, &config.validation.options())?;
            if !report.is_valid() {
                print!("{}", report.to_text());
                return Ok(ExitCode::from(EXIT_INVALID));
            }
            let deployment = Deployment::from_settings(&settings)?;
            let mut summary = serde_json::json!({
                "external_url": deployment.external_url,
                "database": deployment.database(),
                "sshd_enabled": deployment.sshd_enabled(),
                "security_contexts": deployment
                    .security_contexts()
                    .into_iter()
                    .map(|(key, ctx)| (key.to_string(), serde_json::json!(ctx)))
                    .collect::<serde_json::Map<_, _>>(),
            });
            if config.output.redact_secrets {
                if let Some(password) = summary.pointer_mut("/database/password") {
                    *password = serde_json::Value::String("[REDACTED]".into());
                }
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Schema { format } => {
            match format {
                ReportFormat::Json => println!("{}", serde_json::to_string_pretty(SCHEMA)?),
                ReportFormat::Text => {
                    for spec in SCHEMA {
                        println!(
                            "{:<40} {:<8} {:<28} {}",
                            spec.key,
                            spec.kind.to_string(),
                            spec.constraint.to_string(),
                            spec.subsystem
                        );
                        if let Some(note) = spec.note {
                            println!("    note: {}", note);
                        }
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Watch {
            file,
            allow_unknown,
        } => {
            config.validation.allow_unknown_keys |= allow_unknown;
            watch(&file, &config).await
        }
    }
}

async fn watch(file: &Path, config: &ToolConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let (watcher, mut updates) = DescriptorWatcher::new(
        file,
        config.validation.options(),
        Duration::from_secs(config.watch.poll_interval_secs),
    );
    print_outcome(file, &watcher.reload());

    let snapshot = watcher.snapshot();
    let _watcher = watcher.run()?;

    loop {
        tokio::select! {
            Some(outcome) = updates.recv() => print_outcome(file, &outcome),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let accepted = snapshot.load_full().map(|s| s.len());
    tracing::info!(last_accepted_keys = ?accepted, "Watch stopped");
    Ok(exit_for(accepted.is_some()))
}

fn print_outcome(file: &Path, outcome: &ReloadOutcome) {
    let path = file.display();
    match outcome {
        ReloadOutcome::Accepted {
            settings,
            advisories,
        } => {
            println!("{}: accepted, {} key(s)", path, settings.len());
            for advisory in advisories {
                println!("{}: advisory: {}", path, advisory);
            }
        }
        ReloadOutcome::Rejected(Rejection::Invalid(errors)) => {
            for error in errors {
                println!("{}: error: {}", path, error);
            }
            println!("{}: rejected, keeping last accepted settings", path);
        }
        ReloadOutcome::Rejected(Rejection::Load(e)) => {
            println!("error: {}", e);
            println!("{}: rejected, keeping last accepted settings", path);
        }
    }
}

fn json_view(settings: &Settings, redact: bool) -> serde_json::Value {
    let mut json = settings.to_json();
    if redact {
        for spec in SCHEMA.iter().filter(|spec| spec.sensitive) {
            let pointer = format!("/{}", spec.key.replace('.', "/"));
            if let Some(value) = json.pointer_mut(&pointer) {
                *value = serde_json::Value::String("[REDACTED]".into());
            }
        }
    }
    json
}

fn exit_for(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_INVALID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_json_view_redacts() {
        let settings = omnibus_config::load("gitlab_rails['db_password'] = 'secret'\n").unwrap();
        assert_eq!(json_view(&settings, true)["gitlab_rails"]["db_password"], "[REDACTED]");
        assert_eq!(json_view(&settings, false)["gitlab_rails"]["db_password"], "secret");
    }
}

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rescopy::args::{Args, Command};
use rescopy::audit::LogDirectory;
use rescopy::{CapacityGuard, CopyEngine, OutputConfig, RecoverError, RecoveryReport};

fn init_tracing(output: OutputConfig) {
    let directives = if output.quiet {
        "off".to_string()
    } else {
        let level = match output.verbose {
            0 => "error",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        // audit records already go to the log files; only echo them when asked
        if output.verbose == 0 {
            format!("{level},rescopy::audit=off")
        } else {
            level.to_string()
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct Terminal {
    quiet: bool,
}

impl Terminal {
    fn say(&self, message: &str) {
        if !self.quiet {
            println!("{message}");
        }
    }
}

fn folder_exit(terminal: &Terminal, reports: &[&RecoveryReport]) -> ExitCode {
    let failed: usize = reports.iter().map(|r| r.files_failed()).sum();
    if failed == 0 {
        terminal.say("Recovery process completed successfully.");
        ExitCode::SUCCESS
    } else {
        terminal.say(&format!(
            "Recovery process completed with {failed} failed file(s)."
        ));
        ExitCode::from(2)
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let config = args.recover_config();
    let terminal = Terminal { quiet: args.quiet };
    let audit = Arc::new(LogDirectory::new(&config.log_dir));
    let engine = CopyEngine::new(config, CapacityGuard::system(), audit)
        .context("invalid configuration")?;
    tracing::debug!("{engine:?}");

    let code = match &args.command {
        Command::File {
            source,
            destination,
        } => match engine.recover_file(source, destination) {
            Ok(outcome) if outcome.is_success() => {
                terminal.say("File recovery completed successfully.");
                ExitCode::SUCCESS
            }
            Ok(outcome) => {
                tracing::error!(
                    "{}",
                    outcome.error_detail.as_deref().unwrap_or("copy failed")
                );
                terminal.say("File recovery failed.");
                ExitCode::FAILURE
            }
            Err(error) => fatal(&terminal, "File recovery failed.", &error),
        },
        Command::Folder {
            source,
            destination,
        } => match engine.recover_folder(source, destination) {
            Ok(report) => {
                tracing::info!("{report}");
                folder_exit(&terminal, &[&report])
            }
            Err(error) => fatal(&terminal, "Recovery process failed.", &error),
        },
        Command::Ext {
            source,
            destination,
            extensions,
        } => match engine.recover_by_extension(source, destination, extensions) {
            Ok(results) => {
                for result in &results {
                    tracing::info!(
                        "{}: {} file(s) recovered into {}",
                        result.extension,
                        result.report.files_recovered(),
                        result.folder.display()
                    );
                }
                let reports: Vec<_> = results.iter().map(|r| &r.report).collect();
                folder_exit(&terminal, &reports)
            }
            Err(error) => fatal(&terminal, "Recovery process failed.", &error),
        },
        Command::Map { dir } => match engine.map_folder(dir) {
            Ok(report) => {
                let log_file = engine.config().log_dir.join(&report.log_file);
                terminal.say(&format!(
                    "Directory contents have been logged to {}",
                    log_file.display()
                ));
                ExitCode::SUCCESS
            }
            Err(error) => fatal(&terminal, "Directory scan failed.", &error),
        },
    };
    Ok(code)
}

/// Fatal errors stop the invocation before any copy starts.
fn fatal(terminal: &Terminal, message: &str, error: &RecoverError) -> ExitCode {
    tracing::error!("{error}");
    terminal.say(message);
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.output_config());
    match run(args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

//! docgen - batch document generation from the command line.
//!
//! Usage:
//!   docgen init                      write a starter docgen.toml
//!   docgen check                     validate config, inputs and data header
//!   docgen run                       render, convert, merge and clean up
//!   docgen configure --delay 2       change processing options in place

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use docgen_core::config::{ConfigManager, ConfigSection, Settings};
use docgen_core::logging::{self, LogLevel};
use docgen_core::orchestrator::{required_inputs, BatchProcessor};

/// Exit code when the batch ran but some records failed.
const EXIT_PARTIAL: u8 = 2;

#[derive(Parser)]
#[command(name = "docgen")]
#[command(about = "Generate personalised documents from a template and a table")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(short, long, global = true, default_value = "docgen.toml")]
    config: PathBuf,

    /// Directory relative paths are resolved against (default: the config file's folder)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the batch
    Run,

    /// Validate configuration and inputs without producing files
    Check,

    /// Write a starter config if none exists
    Init,

    /// Change processing options in the config file
    Configure {
        /// Delete DOCX files after the batch
        #[arg(long)]
        cleanup_docx: Option<bool>,
        /// Pause between records, in seconds
        #[arg(long)]
        delay: Option<u64>,
        /// Converter program
        #[arg(long)]
        converter: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    match cli.command {
        Command::Init => {
            logging::init_tracing(level);
            let mut config = ConfigManager::new(&cli.config);
            if config.load_or_create()? {
                println!("Created {}", cli.config.display());
            } else {
                println!("{} already exists", cli.config.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Configure {
            cleanup_docx,
            delay,
            converter,
        } => {
            logging::init_tracing(level);
            let mut config = load_config(&cli.config)?;
            let processing = &mut config.settings_mut().processing;
            if let Some(cleanup) = cleanup_docx {
                processing.cleanup_docx = cleanup;
            }
            if let Some(delay) = delay {
                processing.delay_between_files = delay;
            }
            if let Some(converter) = converter {
                processing.converter = converter;
            }
            config.update_section(ConfigSection::Processing)?;
            let processing = &config.settings().processing;
            println!(
                "cleanup_docx = {}, delay_between_files = {}, converter = {}",
                processing.cleanup_docx, processing.delay_between_files, processing.converter
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Check => {
            logging::init_tracing(level);
            let config = load_config(&cli.config)?;
            let base_dir = cli.base_dir.unwrap_or_else(|| config.base_dir());
            let processor = BatchProcessor::new(config.into_settings(), &base_dir);
            for input in required_inputs(processor.settings(), &base_dir) {
                println!("  {}", input.display());
            }
            let checked = processor.preflight()?;
            println!(
                "OK: {} record(s), {} job(s)",
                checked.records.len(),
                checked.jobs.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Run => {
            let config = load_config(&cli.config)?;
            let base_dir = cli.base_dir.unwrap_or_else(|| config.base_dir());
            let settings = config.into_settings();
            let level = if cli.verbose {
                LogLevel::Debug
            } else {
                settings.logging.level
            };
            let logs_dir = Settings::resolve(&base_dir, &settings.paths.logs_folder);
            let _guard = logging::init_tracing_with_file(level, &logs_dir);

            let result = BatchProcessor::new(settings, &base_dir)
                .with_console(Box::new(|line: &str| println!("{}", line)))
                .run()
                .context("batch did not start")?;

            if result.has_failures() {
                eprintln!(
                    "{} failure(s); see the batch log in {}",
                    result.total_failures(),
                    logs_dir.display()
                );
                return Ok(ExitCode::from(EXIT_PARTIAL));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(path: &Path) -> Result<ConfigManager> {
    if !path.exists() {
        bail!(
            "config file {} not found (run `docgen init` to create one)",
            path.display()
        );
    }
    let mut config = ConfigManager::new(path);
    config
        .load()
        .with_context(|| format!("failed to load {}", path.display()))?;
    Ok(config)
}

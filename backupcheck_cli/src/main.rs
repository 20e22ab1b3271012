mod progress;

use anyhow::Context;
use backupcheck_common::{load_config, load_config_from, AppConfig, VerifyError};
use backupcheck_core::{render_json, render_text, verify, VerifyOptions};
use clap::Parser;
use progress::FolderProgress;
use std::fs::{self, File};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Every source file was found with the right size
const EXIT_VERIFIED: i32 = 0;
/// Verification ran and found missing, mismatched or unmatched items
const EXIT_INCOMPLETE_BACKUP: i32 = 1;
/// Verification could not start (bad root, bad config, unusable log file)
const EXIT_MISCONFIGURED: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "backupcheck")]
#[command(author = "backupcheck Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Verify a photo/video backup by matching dated folders and comparing file sizes", long_about = None)]
struct Cli {
    /// Source directory containing folders to verify
    #[arg(long)]
    source: PathBuf,

    /// Destination directory containing backup folders
    #[arg(long)]
    destination: PathBuf,

    /// Ignore files that the delete tool would clean up (._* files of 4 KB or less)
    #[arg(long)]
    ignore_deleted: bool,

    /// Path to log file
    #[arg(long)]
    log: Option<PathBuf>,

    /// Path to report file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Ignore patterns, gitignore syntax (can be specified multiple times)
    #[arg(short, long)]
    ignore: Vec<String>,

    /// Match relative file paths without regard to letter case
    #[arg(long)]
    case_insensitive: bool,

    /// Number of folders verified in parallel
    #[arg(long)]
    threads: Option<usize>,

    /// Configuration file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose, cli.log.as_deref()) {
        eprintln!("Failed to set up logging: {:#}", e);
        std::process::exit(EXIT_MISCONFIGURED);
    }

    let code = match run(&cli) {
        Ok(true) => EXIT_VERIFIED,
        Ok(false) => EXIT_INCOMPLETE_BACKUP,
        Err(e) => {
            error!("Verification failed: {:#}", e);
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}

/// Log to stderr (stdout carries the report) and optionally to a file.
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create log file {}", path.display()))?;
            Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal()),
        )
        .with(file_layer)
        .init();
    Ok(())
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    let config = resolve_config(cli)?;
    info!("Ignore deleted files: {}", config.ignore_deleted);

    let mut options = VerifyOptions::from_config(&config)?;
    if !cli.no_progress && !cli.verbose && std::io::stderr().is_terminal() {
        options = options.with_progress(Arc::new(FolderProgress::new()));
    }

    let report = verify(&cli.source, &cli.destination, &options)?;

    let rendered = if cli.json {
        render_json(&report)?
    } else {
        render_text(&report)
    };

    println!();
    print!("{}", rendered);
    if !rendered.ends_with('\n') {
        println!();
    }
    // process::exit skips stdout's buffer
    std::io::stdout().flush()?;

    if let Some(path) = &cli.report {
        match fs::write(path, &rendered) {
            Ok(()) => info!("Report written to {}", path.display()),
            Err(e) => error!("Failed to write report file {}: {}", path.display(), e),
        }
    }

    Ok(report.overall_success)
}

/// Merge the config file with command-line overrides
fn resolve_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let loaded = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if loaded.exists {
        info!(
            "Using {}config file: {}",
            if loaded.portable { "portable " } else { "" },
            loaded.path.display()
        );
    }

    let mut config = loaded.config;
    config.ignore_patterns.extend(cli.ignore.iter().cloned());
    if cli.ignore_deleted {
        config.ignore_deleted = true;
    }
    if cli.case_insensitive {
        config.case_insensitive_paths = true;
    }
    if let Some(threads) = cli.threads {
        config.threads = Some(threads);
    }
    Ok(config)
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<VerifyError>() {
        Some(e) if e.is_misconfiguration() => EXIT_MISCONFIGURED,
        _ => EXIT_INCOMPLETE_BACKUP,
    }
}

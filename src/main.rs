//! owlcore CLI entry point.
//!
//! Provides `ingest`, which replays a JSON-lines message dump through the
//! message index and the disk logger, and `check-filter`, which validates a
//! log filter expression.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use owlcore::config::{config_dir, load_config, Config};
use owlcore::filter::Filter;
use owlcore::index::MessageIndex;
use owlcore::log::{LogReport, LogWriter, MessageLogger};
use owlcore::message::MessageEntity;

/// owlcore: message index and disk logger for a terminal chat client.
#[derive(Parser)]
#[command(name = "owlcore", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Index and log every message in a JSON-lines file.
    Ingest {
        /// File with one message object per line.
        file: PathBuf,
        /// Config file (default: ~/.owlcore/config.toml if present).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write personal logs to DIR/people and class logs to DIR/class.
        #[arg(long)]
        log_dir: Option<PathBuf>,
        /// Also record diagnostics as JSON in DIR/owlcore.log.YYYY-MM-DD.
        #[arg(long, value_name = "DIR")]
        diagnostics_dir: Option<PathBuf>,
    },
    /// Parse a log filter expression and report whether it is valid.
    CheckFilter {
        /// Filter expression.
        expr: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Ingest {
            file,
            config,
            log_dir,
            diagnostics_dir,
        } => {
            let _guard = match diagnostics_dir {
                Some(dir) => Some(owlcore::logging::init_with_file(&dir)?),
                None => {
                    owlcore::logging::init_cli();
                    None
                }
            };
            handle_ingest(&file, config.as_deref(), log_dir.as_deref())
        }
        Command::CheckFilter { expr } => {
            owlcore::logging::init_cli();
            handle_check_filter(&expr)
        }
    }
}

/// Resolve the configuration: explicit path, then the default location,
/// then built-in defaults.
fn resolve_config(path: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = path {
        return load_config(path);
    }
    let default_path = config_dir()?.join("config.toml");
    if default_path.exists() {
        load_config(&default_path)
    } else {
        debug!("no config file found, using defaults");
        Ok(Config::default())
    }
}

/// Replay a message dump through the index and the logger.
fn handle_ingest(
    file: &Path,
    config_path: Option<&Path>,
    log_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let mut config = resolve_config(config_path)?;
    if let Some(dir) = log_dir {
        config.logging.log_path = dir.join("people").to_string_lossy().into_owned();
        config.logging.class_log_path = dir.join("class").to_string_lossy().into_owned();
    }

    for dir in [config.logging.log_dir(), config.logging.class_log_dir()] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let logger = MessageLogger::from_config(config.logging, None)
        .context("failed to build message logger")?;
    let (report_tx, mut report_rx) = mpsc::unbounded_channel::<LogReport>();
    let mut writer = LogWriter::init(report_tx);
    let mut index = MessageIndex::new();

    let input =
        std::fs::File::open(file).with_context(|| format!("failed to open {}", file.display()))?;
    let mut logged: usize = 0;
    for (lineno, line) in std::io::BufReader::new(input).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", file.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let msg: MessageEntity = serde_json::from_str(&line).with_context(|| {
            format!(
                "invalid message on line {} of {}",
                lineno.saturating_add(1),
                file.display()
            )
        })?;
        if logger.log_message(&writer, Some(&msg)).accept {
            logged = logged.saturating_add(1);
        }
        index.append(msg);
    }

    let presence: Vec<usize> = index
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_loginout())
        .map(|(pos, _)| pos)
        .collect();
    for pos in presence {
        index.mark_deleted(pos)?;
    }
    let expunged = index.expunge();

    writer.shutdown();

    let mut failures: usize = 0;
    while let Ok(report) = report_rx.try_recv() {
        error!(file = %report.filename.display(), "{}", report.message);
        failures = failures.saturating_add(1);
    }

    info!(
        kept = index.len(),
        logged, expunged, failures, "ingest complete"
    );
    println!(
        "indexed {} messages, logged {logged}, expunged {expunged} presence notices, {failures} write failures",
        index.len()
    );
    Ok(())
}

/// Validate a filter expression.
fn handle_check_filter(expr: &str) -> anyhow::Result<()> {
    let filter = Filter::parse(expr).context("invalid filter")?;
    println!("valid filter: {}", filter.source());
    Ok(())
}

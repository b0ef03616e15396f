//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable result line
    Text,
    /// JSON report
    Json,
}

/// piapprox - parallel Leibniz approximation of pi
#[derive(Parser, Debug)]
#[command(name = "piapprox")]
#[command(version, about, long_about = None)]
pub struct Cli {
    // === Calculation Options ===
    /// Number of worker threads
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Series terms per chunk
    #[arg(short = 'e', long)]
    pub elements: Option<u64>,

    /// Number of chunks to dispatch
    #[arg(short = 'm', long)]
    pub messages: Option<u64>,

    /// TOML configuration file, merged over the built-in defaults
    #[arg(short = 'c', long, env = "PIAPPROX_CONFIG")]
    pub config: Option<PathBuf>,

    // === Runtime Options ===
    /// Bound each worker mailbox to this many queued chunks
    #[arg(long)]
    pub mailbox_capacity: Option<usize>,

    /// Give up waiting for the result after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Exit as soon as the result is printed
    #[arg(long)]
    pub no_wait: bool,

    // === Output Options ===
    /// Result format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write the JSON report to this file (implies --format json)
    #[arg(short = 'o', long)]
    pub json_output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    // === Diagnostics ===
    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Validate and print the configuration without running
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workers == Some(0) {
            anyhow::bail!("workers must be at least 1");
        }
        if self.elements == Some(0) {
            anyhow::bail!("elements must be at least 1");
        }
        if self.messages == Some(0) {
            anyhow::bail!("messages must be at least 1");
        }
        if self.mailbox_capacity == Some(0) {
            anyhow::bail!("mailbox_capacity must be at least 1");
        }
        if self.format == Some(OutputFormat::Text) && self.json_output.is_some() {
            anyhow::bail!("--json-output cannot be combined with --format text");
        }

        Ok(())
    }
}

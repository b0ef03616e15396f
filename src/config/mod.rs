//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//!
//! Settings are layered: the embedded [`DEFAULT_CONFIG`] resource, then an
//! optional user TOML file, then CLI flags. The merged result is checked by
//! [`validator::validate_config`] before anything is started.

pub mod cli;
pub mod toml;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Static configuration resource compiled into the binary
pub const DEFAULT_CONFIG: &str = include_str!("default.toml");

/// Complete run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub calculation: CalculationConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Parameters of one scatter/gather run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationConfig {
    /// Number of worker units
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Series terms per chunk
    #[serde(default = "default_elements")]
    pub elements: u64,
    /// Number of chunks
    #[serde(default = "default_messages")]
    pub messages: u64,
}

fn default_workers() -> usize {
    8
}

fn default_elements() -> u64 {
    30_000
}

fn default_messages() -> u64 {
    40_000
}

impl Default for CalculationConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            elements: default_elements(),
            messages: default_messages(),
        }
    }
}

impl CalculationConfig {
    /// Total number of series terms summed
    pub fn total_terms(&self) -> Option<u64> {
        self.messages.checked_mul(self.elements)
    }
}

/// Message-passing runtime tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RuntimeConfig {
    /// Bound on each worker mailbox (unbounded when unset)
    #[serde(default)]
    pub mailbox_capacity: Option<usize>,
    /// Wait for Enter before exiting
    #[serde(default)]
    pub wait_for_enter: bool,
    /// Give up waiting for the result after this many seconds
    #[serde(default)]
    pub completion_timeout_secs: Option<u64>,
    /// Log filter directive (e.g. "piapprox=debug")
    #[serde(default)]
    pub log_filter: Option<String>,
}

/// How the Reporter emits the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Write the JSON report here instead of stdout
    #[serde(default)]
    pub json_output: Option<PathBuf>,
    /// Pretty-print JSON
    #[serde(default)]
    pub pretty: bool,
}

impl Config {
    /// Parse the embedded default resource
    pub fn embedded() -> crate::Result<Self> {
        toml::parse_toml_string(DEFAULT_CONFIG)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration:")?;
        writeln!(f, "  Workers:          {}", self.calculation.workers)?;
        writeln!(f, "  Elements/chunk:   {}", self.calculation.elements)?;
        writeln!(f, "  Chunks:           {}", self.calculation.messages)?;
        match self.calculation.total_terms() {
            Some(total) => writeln!(f, "  Total terms:      {}", total)?,
            None => writeln!(f, "  Total terms:      overflow")?,
        }
        match self.runtime.mailbox_capacity {
            Some(cap) => writeln!(f, "  Mailbox capacity: {}", cap)?,
            None => writeln!(f, "  Mailbox capacity: unbounded")?,
        }
        write!(f, "  Output:           {}", self.output.format)?;
        if let Some(ref path) = self.output.json_output {
            write!(f, " ({})", path.display())?;
        }
        Ok(())
    }
}

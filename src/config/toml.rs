//! TOML configuration file parsing

use super::*;
use crate::config::cli::{Cli, OutputFormat as CliOutputFormat};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Load the embedded defaults, with `user_file` merged on top if given
///
/// Keys absent from the user file keep their embedded values.
pub fn load_layered(user_file: Option<&Path>) -> Result<Config> {
    let mut base: ::toml::Value = ::toml::from_str(DEFAULT_CONFIG)
        .context("Failed to parse embedded default configuration")?;

    if let Some(path) = user_file {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let overlay: ::toml::Value = ::toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        merge_values(&mut base, overlay);
    }

    base.try_into::<Config>()
        .context("Failed to build configuration from merged TOML")
}

/// Deep-merge `overlay` into `base`; tables merge key by key, anything else replaces
fn merge_values(base: &mut ::toml::Value, overlay: ::toml::Value) {
    match (base, overlay) {
        (::toml::Value::Table(base_table), ::toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    // Override calculation parameters
    if let Some(workers) = cli.workers {
        config.calculation.workers = workers;
    }
    if let Some(elements) = cli.elements {
        config.calculation.elements = elements;
    }
    if let Some(messages) = cli.messages {
        config.calculation.messages = messages;
    }

    // Override runtime settings
    if let Some(cap) = cli.mailbox_capacity {
        config.runtime.mailbox_capacity = Some(cap);
    }
    if let Some(secs) = cli.timeout {
        config.runtime.completion_timeout_secs = Some(secs);
    }
    if cli.no_wait {
        config.runtime.wait_for_enter = false;
    }
    if cli.debug {
        config.runtime.log_filter = Some("piapprox=debug".to_string());
    }

    // Override output settings
    if let Some(format) = cli.format {
        config.output.format = match format {
            CliOutputFormat::Text => OutputFormat::Text,
            CliOutputFormat::Json => OutputFormat::Json,
        };
    }
    if let Some(ref path) = cli.json_output {
        config.output.json_output = Some(path.clone());
        config.output.format = OutputFormat::Json;
    }
    if cli.pretty {
        config.output.pretty = true;
    }

    Ok(config)
}

/// Full configuration pipeline: embedded defaults, `--config` file, CLI flags
pub fn load_config(cli: &Cli) -> Result<Config> {
    let config = load_layered(cli.config.as_deref())?;
    merge_cli_with_config(cli, config)
}

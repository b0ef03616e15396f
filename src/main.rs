//! PiApprox CLI entry point

use anyhow::{Context, Result};
use piapprox::config::{cli::Cli, toml::load_config, validator, Config};
use piapprox::coordinator::Coordinator;
use piapprox::output;
use std::io::{self, BufRead};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    println!("PiApprox v{}", env!("CARGO_PKG_VERSION"));
    println!("Concurrent Leibniz-series approximation of pi");
    println!();

    // Parse CLI arguments
    let cli = Cli::parse_args();
    cli.validate()?;

    let config = load_config(&cli).context("Failed to load configuration")?;
    init_logging(&config)?;

    validator::validate_config(&config).context("Configuration validation failed")?;
    println!("{}", config);

    if cli.dry_run {
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    run(&config)?;

    if config.runtime.wait_for_enter {
        println!();
        println!("Press Enter to exit");
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
    }
    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over the configured filter
fn init_logging(config: &Config) -> Result<()> {
    let default = config.runtime.log_filter.as_deref().unwrap_or("piapprox=info");
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default).with_context(|| format!("Invalid log filter: {}", default))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn run(config: &Config) -> Result<()> {
    let calc = &config.calculation;
    let mut coordinator = Coordinator::new(config.runtime.clone(), output::sink_for(config));

    coordinator
        .calculate(calc.workers, calc.elements, calc.messages)
        .context("Failed to start calculation")?;

    let timeout = config.runtime.completion_timeout_secs.map(Duration::from_secs);
    coordinator.await_termination(timeout)?;
    Ok(())
}

//! JSON output formatting
//!
//! One document per run with the run parameters, the approximation, its
//! distance from `std::f64::consts::PI`, and the elapsed time.

use super::{absolute_error, ResultSink};
use crate::config::CalculationConfig;
use crate::message::FinalApproximation;
use crate::util::time::{duration_millis, format_duration};
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Duration with both milliseconds and human-readable format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonDuration {
    pub millis: u64,
    pub micros: u64,
    pub human: String,
}

impl JsonDuration {
    pub fn from_duration(d: Duration) -> Self {
        Self {
            millis: duration_millis(d),
            micros: u64::try_from(d.as_micros()).unwrap_or(u64::MAX),
            human: format_duration(d),
        }
    }
}

/// Run parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonParameters {
    pub workers: usize,
    pub elements: u64,
    pub messages: u64,
    pub total_terms: Option<u64>,
}

/// Complete JSON report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub generated_at: String,
    pub parameters: JsonParameters,
    pub pi: f64,
    pub absolute_error: f64,
    pub elapsed: JsonDuration,
}

impl JsonReport {
    pub fn new(calculation: &CalculationConfig, approximation: &FinalApproximation) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            parameters: JsonParameters {
                workers: calculation.workers,
                elements: calculation.elements,
                messages: calculation.messages,
                total_terms: calculation.total_terms(),
            },
            pi: approximation.pi,
            absolute_error: absolute_error(approximation),
            elapsed: JsonDuration::from_duration(approximation.elapsed),
        }
    }
}

/// Serialize `report` to `writer`
pub fn write_json<W: Write>(writer: W, report: &JsonReport, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(writer, report)?;
    } else {
        serde_json::to_writer(writer, report)?;
    }
    Ok(())
}

/// Write `report` to a file, replacing it
pub fn write_json_file(path: &Path, report: &JsonReport, pretty: bool) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create JSON output file: {}", path.display()))?;
    write_json(file, report, pretty)
        .with_context(|| format!("Failed to write JSON output file: {}", path.display()))
}

/// Emits a [`JsonReport`] to stdout or a file
pub struct JsonSink {
    calculation: CalculationConfig,
    path: Option<PathBuf>,
    pretty: bool,
}

impl JsonSink {
    pub fn new(calculation: CalculationConfig, path: Option<PathBuf>, pretty: bool) -> Self {
        Self {
            calculation,
            path,
            pretty,
        }
    }
}

impl ResultSink for JsonSink {
    fn emit(&mut self, approximation: &FinalApproximation) -> Result<()> {
        let report = JsonReport::new(&self.calculation, approximation);
        match self.path {
            Some(ref path) => write_json_file(path, &report, self.pretty),
            None => {
                let mut stdout = io::stdout().lock();
                write_json(&mut stdout, &report, self.pretty)?;
                writeln!(stdout)?;
                Ok(())
            }
        }
    }
}

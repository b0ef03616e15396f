//! Human-readable text output

use super::{absolute_error, ResultSink};
use crate::config::CalculationConfig;
use crate::message::FinalApproximation;
use crate::util::time::{calculate_rate, duration_millis, format_duration, format_rate};
use crate::Result;
use anyhow::Context;
use std::io::{self, Write};

/// Format the result block
///
/// The first two lines carry the approximation and the elapsed time in
/// milliseconds; the rest are run details.
pub fn format_result(calculation: &CalculationConfig, approximation: &FinalApproximation) -> String {
    let terms = calculation.total_terms().unwrap_or(u64::MAX);
    let rate = calculate_rate(terms, approximation.elapsed);

    let mut out = String::new();
    out.push_str(&format!("\n\tPi approximation: \t\t{}\n", approximation.pi));
    out.push_str(&format!(
        "\tCalculation time: \t{} ms\n",
        duration_millis(approximation.elapsed)
    ));
    out.push_str(&format!("\tAbsolute error:   \t{:e}\n", absolute_error(approximation)));
    out.push_str(&format!(
        "\tTerms:            \t{} ({} chunks x {} on {} workers)\n",
        terms, calculation.messages, calculation.elements, calculation.workers
    ));
    out.push_str(&format!(
        "\tRate:             \t{} terms/s over {}\n",
        format_rate(rate),
        format_duration(approximation.elapsed)
    ));
    out
}

/// Writes [`format_result`] to a writer
pub struct TextSink<W: Write + Send + 'static> {
    calculation: CalculationConfig,
    writer: W,
}

impl TextSink<io::Stdout> {
    /// Print to standard output
    pub fn stdout(calculation: CalculationConfig) -> Self {
        Self::new(calculation, io::stdout())
    }
}

impl<W: Write + Send + 'static> TextSink<W> {
    pub fn new(calculation: CalculationConfig, writer: W) -> Self {
        Self { calculation, writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send + 'static> ResultSink for TextSink<W> {
    fn emit(&mut self, approximation: &FinalApproximation) -> Result<()> {
        let text = format_result(&self.calculation, approximation);
        self.writer
            .write_all(text.as_bytes())
            .and_then(|_| self.writer.flush())
            .context("Failed to write text result")
    }
}

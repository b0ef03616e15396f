//! Result output
//!
//! The Reporter hands the finished approximation to a [`ResultSink`]. Sinks:
//!
//! - [`text::TextSink`]: the classic two-line console result
//! - [`json::JsonSink`]: a JSON report on stdout or in a file
//! - [`ChannelSink`]: forwards the value over a channel, for embedding and tests

pub mod json;
pub mod text;

use crate::config::{Config, OutputFormat};
use crate::message::FinalApproximation;
use crate::Result;
use crossbeam::channel::Sender;

pub use json::JsonSink;
pub use text::TextSink;

/// Destination for the finished approximation
pub trait ResultSink: Send + 'static {
    fn emit(&mut self, approximation: &FinalApproximation) -> Result<()>;
}

/// Forwards every approximation to a channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<FinalApproximation>,
}

impl ChannelSink {
    pub fn new(tx: Sender<FinalApproximation>) -> Self {
        Self { tx }
    }
}

impl ResultSink for ChannelSink {
    fn emit(&mut self, approximation: &FinalApproximation) -> Result<()> {
        self.tx
            .send(*approximation)
            .map_err(|_| anyhow::anyhow!("result channel closed"))
    }
}

/// Build the sink selected by the output configuration
pub fn sink_for(config: &Config) -> Box<dyn ResultSink> {
    match config.output.format {
        OutputFormat::Text => Box::new(TextSink::stdout(config.calculation.clone())),
        OutputFormat::Json => Box::new(JsonSink::new(
            config.calculation.clone(),
            config.output.json_output.clone(),
            config.output.pretty,
        )),
    }
}

/// Absolute distance from `std::f64::consts::PI`
pub fn absolute_error(approximation: &FinalApproximation) -> f64 {
    (approximation.pi - std::f64::consts::PI).abs()
}

//! Message definitions
//!
//! Every unit in the system exchanges values of the single closed [`Message`]
//! enum. Each unit matches exhaustively and logs the variants it does not
//! handle instead of failing.
//!
//! # Message Flow
//!
//! ```text
//! Coordinator        Master              Worker(i mod N)        Reporter
//!     |                 |                      |                    |
//!     |---- Begin ----->|                      |                    |
//!     |                 |--- Chunk(start,n) -->|                    |
//!     |                 |<-- PartialSum(v) ----|                    |
//!     |                 |        ...           |                    |
//!     |                 |------------- Final(pi, elapsed) --------->|
//!     |                 x (terminates, drops workers)               |
//!     |<------------------------ shutdown signal -------------------|
//! ```

use std::fmt;
use std::time::Duration;

/// One unit of work: the series terms `start*size ..= (start+1)*size - 1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRequest {
    pub start: u64,
    pub size: u64,
}

impl ChunkRequest {
    pub fn new(start: u64, size: u64) -> Self {
        Self { start, size }
    }

    /// First term index covered by this chunk
    pub fn first_index(&self) -> u64 {
        self.start * self.size
    }

    /// One past the last term index covered by this chunk
    pub fn end_index(&self) -> u64 {
        (self.start + 1) * self.size
    }
}

/// Partial Leibniz sum for one chunk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialResult {
    pub value: f64,
}

/// Finished approximation, produced once per run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalApproximation {
    pub pi: f64,
    pub elapsed: Duration,
}

impl fmt::Display for FinalApproximation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pi approximation: {}  Calculation time: {} ms",
            self.pi,
            self.elapsed.as_millis()
        )
    }
}

/// The closed set of messages understood by the system
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Start the fan-out (sent once to Master)
    Begin,
    /// Work for a Worker
    Chunk(ChunkRequest),
    /// A Worker's reply to Master
    PartialSum(PartialResult),
    /// Master's finished result for the Reporter
    Final(FinalApproximation),
}

impl Message {
    /// Short variant name for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Begin => "Begin",
            Message::Chunk(_) => "Chunk",
            Message::PartialSum(_) => "PartialSum",
            Message::Final(_) => "Final",
        }
    }
}

//! PiApprox - Concurrent Leibniz-series approximation of pi
//!
//! PiApprox splits the Leibniz series `4 * sum (-1)^i / (2i + 1)` into
//! fixed-size chunks, scatters them over a pool of worker threads, and
//! gathers the partial sums into one approximation.
//!
//! # Architecture
//!
//! - **Runtime**: one thread per unit, talking only through mailboxes
//! - **Master**: dispatches chunks round-robin and accumulates partial sums
//! - **Workers**: pure per-chunk computation, no shared state
//! - **Reporter**: emits the result and signals shutdown
//! - **Coordinator**: starts a run and waits for it to finish

pub mod config;
pub mod coordinator;
pub mod error;
pub mod master;
pub mod message;
pub mod output;
pub mod reporter;
pub mod runtime;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::Coordinator;
pub use error::{ConfigurationError, RuntimeError};
pub use message::{ChunkRequest, FinalApproximation, Message, PartialResult};

/// Result type used throughout PiApprox
pub type Result<T> = anyhow::Result<T>;

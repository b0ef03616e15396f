//! Error types
//!
//! Library errors are typed with `thiserror`; application plumbing wraps them
//! in `anyhow` (see [`crate::Result`]).

use std::time::Duration;
use thiserror::Error;

/// Invalid calculation or runtime parameters, rejected at the system boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A count that must be strictly positive was zero
    #[error("{name} must be greater than zero")]
    NotPositive { name: &'static str },

    /// The series index range does not fit in 64 bits
    #[error("nr_of_messages ({messages}) * nr_of_elements ({elements}) overflows the term index range")]
    IndexOverflow { messages: u64, elements: u64 },

    /// A bounded mailbox was requested with no capacity
    #[error("mailbox_capacity must be greater than zero when set")]
    ZeroMailboxCapacity,
}

/// Failures of the message-passing runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The OS refused to start a unit's thread
    #[error("failed to spawn unit '{name}'")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The target unit has terminated and its mailbox is closed
    #[error("unit '{name}' has terminated; message dropped")]
    Terminated { name: String },

    /// A pool was asked to route with no routees
    #[error("worker pool has no routees")]
    EmptyPool,

    /// `calculate` was called twice on the same coordinator
    #[error("a calculation was already started on this coordinator")]
    AlreadyStarted,

    /// `await_termination` was called before `calculate`
    #[error("no calculation has been started")]
    NotStarted,

    /// Master stopped without producing a result
    #[error("calculation ended without a result")]
    Abandoned,

    /// `await_termination` gave up before the Reporter signalled shutdown
    #[error("calculation did not finish within {0:?}")]
    Timeout(Duration),

    /// A unit thread panicked
    #[error("unit '{name}' panicked")]
    Panicked { name: String },
}

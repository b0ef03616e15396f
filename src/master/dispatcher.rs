//! Work partitioning and fan-out

use crate::error::RuntimeError;
use crate::message::{ChunkRequest, Message};
use crate::runtime::RoundRobinPool;
use tracing::debug;

/// The chunks covering term indices `[0, nr_of_messages * nr_of_elements)`
///
/// Chunk `i` has `start = i` and `size = nr_of_elements`, yielded in
/// increasing `start` order.
pub fn partition(nr_of_messages: u64, nr_of_elements: u64) -> impl Iterator<Item = ChunkRequest> {
    (0..nr_of_messages).map(move |start| ChunkRequest::new(start, nr_of_elements))
}

/// Sends every chunk of a run to the worker pool, round-robin
#[derive(Debug)]
pub struct Dispatcher {
    nr_of_messages: u64,
    nr_of_elements: u64,
    pool: RoundRobinPool,
}

impl Dispatcher {
    pub fn new(nr_of_messages: u64, nr_of_elements: u64, pool: RoundRobinPool) -> Self {
        Self {
            nr_of_messages,
            nr_of_elements,
            pool,
        }
    }

    /// Route all chunks; returns how many were sent
    ///
    /// Stops at the first chunk a worker cannot accept.
    pub fn dispatch(&mut self) -> Result<u64, RuntimeError> {
        let mut sent = 0;
        for chunk in partition(self.nr_of_messages, self.nr_of_elements) {
            self.pool.route(Message::Chunk(chunk))?;
            sent += 1;
        }

        debug!(sent, workers = self.pool.size(), "fan-out complete");
        Ok(sent)
    }

    pub fn nr_of_workers(&self) -> usize {
        self.pool.size()
    }

    /// Chunks sent to each worker so far
    pub fn dispatch_counts(&self) -> &[u64] {
        self.pool.dispatch_counts()
    }

    /// Release the workers and wait for them to exit
    pub fn shutdown(self) -> Result<(), RuntimeError> {
        self.pool.shutdown()
    }
}

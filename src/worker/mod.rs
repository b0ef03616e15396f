//! Worker units
//!
//! A Worker turns one [`ChunkRequest`] into one [`PartialResult`] and sends it
//! back to the Master handle it was built with. Workers carry no state between
//! chunks, so a single worker can serve any number of chunks in sequence.
//!
//! # Example
//!
//! ```
//! use piapprox::worker::calculate_pi_for;
//!
//! // One term: 4 * 1 / 1
//! assert_eq!(calculate_pi_for(0, 1), 4.0);
//!
//! // Two terms: 4 - 4/3
//! assert_eq!(calculate_pi_for(0, 2), 4.0 - 4.0 / 3.0);
//! ```

use crate::message::{ChunkRequest, Message, PartialResult};
use crate::runtime::{unhandled, Actor, ActorRef, Flow};
use tracing::{trace, warn};

/// Sum of the Leibniz terms `start*size ..= (start+1)*size - 1`
///
/// Term `i` is `4 * (1 - 2*(i mod 2)) / (2i + 1)`, summed in index order in
/// binary64. Pure: identical inputs give bit-identical output.
pub fn calculate_pi_for(start: u64, size: u64) -> f64 {
    let first = start * size;
    let end = (start + 1) * size;

    let mut acc = 0.0;
    for i in first..end {
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        acc += 4.0 * sign / (2 * i + 1) as f64;
    }
    acc
}

/// Stateless worker bound to the Master that feeds it
pub struct Worker {
    id: usize,
    name: String,
    master: ActorRef,
}

impl Worker {
    pub fn new(id: usize, master: ActorRef) -> Self {
        Self {
            id,
            name: format!("worker-{}", id),
            master,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Compute one chunk
    pub fn compute(chunk: ChunkRequest) -> PartialResult {
        PartialResult {
            value: calculate_pi_for(chunk.start, chunk.size),
        }
    }
}

impl Actor for Worker {
    fn receive(&mut self, message: Message) -> Flow {
        match message {
            Message::Chunk(chunk) => {
                let result = Self::compute(chunk);
                trace!(worker = self.id, start = chunk.start, value = result.value, "chunk done");

                if let Err(e) = self.master.tell(Message::PartialSum(result)) {
                    // Master is gone; nothing left to report to
                    warn!(worker = self.id, error = %e, "dropping partial result");
                    return Flow::Stop;
                }
                Flow::Continue
            }
            other @ (Message::Begin | Message::PartialSum(_) | Message::Final(_)) => {
                unhandled(&self.name, &other);
                Flow::Continue
            }
        }
    }
}

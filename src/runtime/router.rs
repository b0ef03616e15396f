//! Round-robin worker pool
//!
//! Owns a fixed set of routees and an explicit rotation counter: the n-th
//! routed message goes to routee `n mod size`. Nothing is resolved through a
//! global table; the pool holds the only long-lived handles to its routees,
//! so shutting it down disconnects every routee mailbox.

use super::{mailbox, spawn, Actor, ActorRef, UnitHandle};
use crate::error::RuntimeError;
use crate::message::Message;
use tracing::{debug, warn};

/// Fixed-size pool with round-robin routing
#[derive(Debug)]
pub struct RoundRobinPool {
    routees: Vec<ActorRef>,
    handles: Vec<UnitHandle>,
    /// Messages routed to each routee
    dispatched: Vec<u64>,
    next: usize,
}

impl RoundRobinPool {
    /// Spawn `size` routees named `<prefix>-<index>`
    ///
    /// `factory` builds the actor for each index. If any spawn fails, the
    /// routees already started are shut down before the error is returned.
    pub fn spawn<A, F>(
        prefix: &str,
        size: usize,
        capacity: Option<usize>,
        mut factory: F,
    ) -> Result<Self, RuntimeError>
    where
        A: Actor,
        F: FnMut(usize) -> A,
    {
        let mut routees = Vec::with_capacity(size);
        let mut handles = Vec::with_capacity(size);

        for index in 0..size {
            let (routee, inbox) = mailbox(&format!("{}-{}", prefix, index), capacity);
            match spawn(factory(index), inbox) {
                Ok(handle) => {
                    routees.push(routee);
                    handles.push(handle);
                }
                Err(e) => {
                    if let Err(cleanup) = Self::with_handles(routees, handles).shutdown() {
                        warn!(error = %cleanup, "pool cleanup after spawn failure failed");
                    }
                    return Err(e);
                }
            }
        }

        debug!(prefix, size, "pool started");
        Ok(Self::with_handles(routees, handles))
    }

    /// Build a pool over existing handles without owning any threads
    pub fn from_routees(routees: Vec<ActorRef>) -> Self {
        Self::with_handles(routees, Vec::new())
    }

    fn with_handles(routees: Vec<ActorRef>, handles: Vec<UnitHandle>) -> Self {
        let dispatched = vec![0; routees.len()];
        Self {
            routees,
            handles,
            dispatched,
            next: 0,
        }
    }

    /// Number of routees
    pub fn size(&self) -> usize {
        self.routees.len()
    }

    /// Per-routee message counts, indexed like the routees
    pub fn dispatch_counts(&self) -> &[u64] {
        &self.dispatched
    }

    /// Send `message` to the next routee in rotation
    ///
    /// Returns the index of the routee that received it.
    pub fn route(&mut self, message: Message) -> Result<usize, RuntimeError> {
        if self.routees.is_empty() {
            return Err(RuntimeError::EmptyPool);
        }

        let index = self.next;
        self.routees[index].tell(message)?;
        self.dispatched[index] += 1;
        self.next = (index + 1) % self.routees.len();
        Ok(index)
    }

    /// Drop every routee handle and wait for the routee threads to exit
    ///
    /// Routees finish whatever is already queued before they see the
    /// disconnect. Returns the first join failure, after joining the rest.
    pub fn shutdown(self) -> Result<(), RuntimeError> {
        let Self { routees, handles, .. } = self;
        drop(routees);

        let mut first_error = None;
        for handle in handles {
            if let Err(e) = handle.join() {
                warn!(error = %e, "routee did not stop cleanly");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

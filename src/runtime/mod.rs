//! Message-passing runtime
//!
//! A small substrate for the calculation: every concurrent unit
//! is an [`Actor`] running on its own named OS thread, draining one
//! [`Mailbox`] strictly in arrival order. Other units reach it only through a
//! cloneable [`ActorRef`] handed out at construction time.
//!
//! # Lifecycle
//!
//! 1. **Creation**: [`mailbox()`] creates the handle/mailbox pair
//! 2. **Start**: [`spawn()`] moves the actor and its mailbox onto a thread
//! 3. **Stop**: the actor returns [`Flow::Stop`], or every [`ActorRef`] to it
//!    is dropped and the mailbox disconnects
//! 4. **Teardown**: [`Actor::post_stop`] runs on the unit's thread, then the
//!    thread exits and [`UnitHandle::join`] returns
//!
//! Mailboxes are `crossbeam` channels, unbounded unless a capacity is given.

pub mod router;

use crate::error::RuntimeError;
use crate::message::Message;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

pub use router::RoundRobinPool;

/// What a unit does after handling a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// A concurrent unit driven by its mailbox
///
/// `receive` is never called concurrently with itself, so implementors own
/// their state outright and need no locking.
pub trait Actor: Send + 'static {
    /// Handle one message
    fn receive(&mut self, message: Message) -> Flow;

    /// Runs once on the unit's thread after the receive loop ends
    fn post_stop(&mut self) {}
}

/// Typed send handle to a unit's mailbox
#[derive(Clone)]
pub struct ActorRef {
    name: Arc<str>,
    tx: Sender<Message>,
}

impl ActorRef {
    /// Name of the unit behind this handle
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue a message; fails only if the unit has terminated
    ///
    /// Blocks while a bounded mailbox is full.
    pub fn tell(&self, message: Message) -> Result<(), RuntimeError> {
        self.tx.send(message).map_err(|_| RuntimeError::Terminated {
            name: self.name.to_string(),
        })
    }
}

impl fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef").field("name", &self.name).finish()
    }
}

/// Receiving side of a unit's queue
pub struct Mailbox {
    name: Arc<str>,
    rx: Receiver<Message>,
}

impl Mailbox {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block for the next message; `None` once every sender is gone
    pub fn recv(&self) -> Option<Message> {
        self.rx.recv().ok()
    }

    /// Next message if one is already queued
    pub fn try_recv(&self) -> Option<Message> {
        self.rx.try_recv().ok()
    }

    /// Block for at most `timeout`
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Message> {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Number of queued messages
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Create a mailbox and the handle that feeds it
///
/// `capacity` of `None` gives an unbounded queue.
pub fn mailbox(name: &str, capacity: Option<usize>) -> (ActorRef, Mailbox) {
    let (tx, rx) = match capacity {
        Some(cap) => channel::bounded(cap),
        None => channel::unbounded(),
    };
    let name: Arc<str> = Arc::from(name);
    (
        ActorRef { name: name.clone(), tx },
        Mailbox { name, rx },
    )
}

/// Join handle for a spawned unit
#[derive(Debug)]
pub struct UnitHandle {
    name: String,
    handle: JoinHandle<()>,
}

impl UnitHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the unit's thread to exit
    pub fn join(self) -> Result<(), RuntimeError> {
        self.handle
            .join()
            .map_err(|_| RuntimeError::Panicked { name: self.name })
    }
}

/// Start `actor` on its own thread, named after its mailbox
pub fn spawn<A: Actor>(mut actor: A, mailbox: Mailbox) -> Result<UnitHandle, RuntimeError> {
    let name = mailbox.name().to_string();
    let handle = thread::Builder::new()
        .name(name.clone())
        .spawn(move || run(&mut actor, &mailbox))
        .map_err(|source| RuntimeError::Spawn {
            name: name.clone(),
            source,
        })?;

    Ok(UnitHandle { name, handle })
}

/// Drive `actor` from `mailbox` on the current thread until it stops
///
/// [`spawn()`] uses this on the unit's own thread; tests call it directly to
/// run a unit synchronously.
pub fn run<A: Actor>(actor: &mut A, mailbox: &Mailbox) {
    let span = tracing::debug_span!("unit", name = %mailbox.name());
    let _enter = span.enter();
    debug!("started");

    while let Some(message) = mailbox.recv() {
        if actor.receive(message) == Flow::Stop {
            break;
        }
    }

    actor.post_stop();
    debug!("stopped");
}

/// Log a message the unit does not handle in its current state
pub fn unhandled(unit: &str, message: &Message) {
    warn!(unit, kind = message.kind(), "unhandled message ignored");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::PartialResult;

    /// Echoes every PartialSum back to a probe, stops on Begin
    struct Echo {
        probe: ActorRef,
        stopped: Option<ActorRef>,
    }

    impl Actor for Echo {
        fn receive(&mut self, message: Message) -> Flow {
            match message {
                Message::Begin => Flow::Stop,
                Message::PartialSum(result) => {
                    let _ = self.probe.tell(Message::PartialSum(result));
                    Flow::Continue
                }
                other => {
                    unhandled("echo", &other);
                    Flow::Continue
                }
            }
        }

        fn post_stop(&mut self) {
            if let Some(probe) = self.stopped.take() {
                let _ = probe.tell(Message::Begin);
            }
        }
    }

    #[test]
    fn test_mailbox_preserves_order() {
        let (tx, rx) = mailbox("probe", None);
        for i in 0..5 {
            tx.tell(Message::PartialSum(PartialResult { value: i as f64 })).unwrap();
        }
        assert_eq!(rx.len(), 5);

        for i in 0..5 {
            assert_eq!(rx.try_recv(), Some(Message::PartialSum(PartialResult { value: i as f64 })));
        }
        assert!(rx.is_empty());
    }

    #[test]
    fn test_tell_after_mailbox_dropped() {
        let (tx, rx) = mailbox("gone", None);
        drop(rx);

        let err = tx.tell(Message::Begin).unwrap_err();
        assert!(matches!(err, RuntimeError::Terminated { ref name } if name == "gone"));
    }

    #[test]
    fn test_recv_returns_none_when_disconnected() {
        let (tx, rx) = mailbox("lonely", Some(1));
        drop(tx);
        assert_eq!(rx.recv(), None);
        assert_eq!(rx.recv_timeout(Duration::from_millis(10)), None);
    }

    #[test]
    fn test_spawned_unit_round_trip() {
        let (probe_tx, probe_rx) = mailbox("probe", None);
        let (echo_tx, echo_rx) = mailbox("echo", None);

        let handle = spawn(
            Echo { probe: probe_tx.clone(), stopped: Some(probe_tx) },
            echo_rx,
        )
        .unwrap();
        assert_eq!(handle.name(), "echo");

        echo_tx.tell(Message::PartialSum(PartialResult { value: 2.5 })).unwrap();
        echo_tx.tell(Message::Chunk(crate::message::ChunkRequest::new(0, 1))).unwrap();
        echo_tx.tell(Message::Begin).unwrap();

        assert_eq!(
            probe_rx.recv_timeout(Duration::from_secs(5)),
            Some(Message::PartialSum(PartialResult { value: 2.5 }))
        );
        // post_stop notification
        assert_eq!(probe_rx.recv_timeout(Duration::from_secs(5)), Some(Message::Begin));
        handle.join().unwrap();
    }

    #[test]
    fn test_unit_stops_when_handles_dropped() {
        let (probe_tx, probe_rx) = mailbox("probe", None);
        let (echo_tx, echo_rx) = mailbox("echo", None);

        let handle = spawn(Echo { probe: probe_tx.clone(), stopped: Some(probe_tx) }, echo_rx).unwrap();
        drop(echo_tx);

        assert_eq!(probe_rx.recv_timeout(Duration::from_secs(5)), Some(Message::Begin));
        handle.join().unwrap();
    }
}

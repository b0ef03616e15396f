//! Reporter unit
//!
//! Receives the one `Final` approximation of a run, emits it through a
//! [`ResultSink`], and tells the coordinator that the run is over.

use crate::message::{FinalApproximation, Message};
use crate::output::ResultSink;
use crate::runtime::{unhandled, Actor, Flow};
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use tracing::{error, info, warn};

/// Unit name used for the Reporter's mailbox and thread
pub const REPORTER_NAME: &str = "reporter";

/// One-shot notification from the Reporter to the coordinator
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Sender<FinalApproximation>,
}

impl ShutdownSignal {
    /// Create the signal and the receiver the coordinator waits on
    pub fn channel() -> (Self, Receiver<FinalApproximation>) {
        let (tx, rx) = channel::bounded(1);
        (Self { tx }, rx)
    }

    /// Fire the signal; never blocks
    pub fn trigger(&self, approximation: FinalApproximation) {
        match self.tx.try_send(approximation) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("shutdown already signalled"),
            Err(TrySendError::Disconnected(_)) => warn!("coordinator is no longer waiting"),
        }
    }
}

pub struct Reporter {
    sink: Box<dyn ResultSink>,
    shutdown: ShutdownSignal,
    reported: bool,
}

impl Reporter {
    pub fn new(sink: Box<dyn ResultSink>, shutdown: ShutdownSignal) -> Self {
        Self {
            sink,
            shutdown,
            reported: false,
        }
    }

    pub fn has_reported(&self) -> bool {
        self.reported
    }

    fn report(&mut self, approximation: FinalApproximation) {
        self.reported = true;
        info!(pi = approximation.pi, "reporting result");

        if let Err(e) = self.sink.emit(&approximation) {
            error!(error = %e, "failed to emit result");
        }
        self.shutdown.trigger(approximation);
    }
}

impl Actor for Reporter {
    fn receive(&mut self, message: Message) -> Flow {
        match message {
            Message::Final(approximation) if !self.reported => self.report(approximation),
            other => unhandled(REPORTER_NAME, &other),
        }
        Flow::Continue
    }
}

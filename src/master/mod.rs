//! Master unit: dispatcher, aggregator, and lifecycle
//!
//! Master owns the worker pool and the run's only mutable state. It fans the
//! work out on `Begin`, folds in every `PartialSum`, and on the reply that
//! completes the count sends the `Final` approximation to the Reporter and
//! stops, taking its workers down with it.
//!
//! # State machine
//!
//! ```text
//! Idle --Begin--> Dispatching --> Accumulating --(last PartialSum)--> Finalizing --> Terminated
//!                                   ^       |
//!                                   +-------+ PartialSum
//! ```
//!
//! There are no backward transitions. Messages that do not fit the current
//! state are logged and ignored.

pub mod aggregator;
pub mod dispatcher;

use crate::config::CalculationConfig;
use crate::error::RuntimeError;
use crate::message::{FinalApproximation, Message, PartialResult};
use crate::runtime::{self, mailbox, unhandled, Actor, ActorRef, Flow, RoundRobinPool, UnitHandle};
use crate::worker::Worker;
use aggregator::{Aggregator, Progress};
use dispatcher::Dispatcher;
use tracing::{debug, error, info, warn};

/// Unit name used for Master's mailbox and thread
pub const MASTER_NAME: &str = "master";

/// Prefix for worker unit names
pub const WORKER_PREFIX: &str = "worker";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterState {
    Idle,
    Dispatching,
    Accumulating,
    Finalizing,
    Terminated,
}

pub struct Master {
    state: MasterState,
    aggregator: Aggregator,
    dispatcher: Option<Dispatcher>,
    reporter: ActorRef,
}

impl Master {
    /// Build a Master over an existing worker pool
    ///
    /// The start time is taken now; `nr_of_messages` replies are expected.
    pub fn new(nr_of_messages: u64, nr_of_elements: u64, reporter: ActorRef, pool: RoundRobinPool) -> Self {
        Self {
            state: MasterState::Idle,
            aggregator: Aggregator::new(nr_of_messages),
            dispatcher: Some(Dispatcher::new(nr_of_messages, nr_of_elements, pool)),
            reporter,
        }
    }

    /// Spawn the worker pool and the Master itself
    ///
    /// Master's own mailbox is always unbounded so workers never block
    /// replying while Master is still dispatching; `worker_capacity` bounds
    /// the worker mailboxes only.
    pub fn start(
        calculation: &CalculationConfig,
        reporter: ActorRef,
        worker_capacity: Option<usize>,
    ) -> Result<(ActorRef, UnitHandle), RuntimeError> {
        let (master_ref, master_box) = mailbox(MASTER_NAME, None);

        let pool = RoundRobinPool::spawn(WORKER_PREFIX, calculation.workers, worker_capacity, |id| {
            Worker::new(id, master_ref.clone())
        })?;

        let master = Self::new(calculation.messages, calculation.elements, reporter, pool);
        let handle = runtime::spawn(master, master_box)?;
        Ok((master_ref, handle))
    }

    pub fn state(&self) -> MasterState {
        self.state
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Chunks sent to each worker; empty once the pool has been released
    pub fn dispatch_counts(&self) -> Vec<u64> {
        self.dispatcher
            .as_ref()
            .map(|d| d.dispatch_counts().to_vec())
            .unwrap_or_default()
    }

    fn begin(&mut self) -> Flow {
        self.state = MasterState::Dispatching;

        let Some(dispatcher) = self.dispatcher.as_mut() else {
            self.state = MasterState::Terminated;
            return Flow::Stop;
        };

        info!(
            workers = dispatcher.nr_of_workers(),
            expected = self.aggregator.expected_replies(),
            "dispatching work"
        );

        if let Err(e) = dispatcher.dispatch() {
            error!(error = %e, "dispatch failed; abandoning calculation");
            self.state = MasterState::Terminated;
            return Flow::Stop;
        }

        self.state = MasterState::Accumulating;

        // Nothing to wait for when no chunks were requested
        if self.aggregator.is_complete() {
            let approximation = self.aggregator.finalize();
            return self.finish(approximation);
        }
        Flow::Continue
    }

    fn accumulate(&mut self, result: PartialResult) -> Flow {
        match self.aggregator.record(result.value) {
            Progress::Pending { received, expected } => {
                debug!(received, expected, "partial sum received");
                Flow::Continue
            }
            Progress::Complete(approximation) => self.finish(approximation),
            Progress::Rejected => {
                warn!(value = result.value, "partial sum after completion dropped");
                Flow::Continue
            }
        }
    }

    fn finish(&mut self, approximation: FinalApproximation) -> Flow {
        self.state = MasterState::Finalizing;
        info!(
            pi = approximation.pi,
            elapsed_ms = approximation.elapsed.as_millis() as u64,
            "calculation complete"
        );

        if let Err(e) = self.reporter.tell(Message::Final(approximation)) {
            error!(error = %e, "could not deliver result to reporter");
        }

        self.state = MasterState::Terminated;
        Flow::Stop
    }
}

impl Actor for Master {
    fn receive(&mut self, message: Message) -> Flow {
        match (self.state, message) {
            (MasterState::Idle, Message::Begin) => self.begin(),
            (MasterState::Accumulating, Message::PartialSum(result)) => self.accumulate(result),
            (_, other) => {
                unhandled(MASTER_NAME, &other);
                Flow::Continue
            }
        }
    }

    fn post_stop(&mut self) {
        self.state = MasterState::Terminated;
        if let Some(dispatcher) = self.dispatcher.take() {
            if let Err(e) = dispatcher.shutdown() {
                warn!(error = %e, "worker pool shutdown incomplete");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ChunkRequest;
    use crate::runtime::Mailbox;
    use crate::worker::calculate_pi_for;
    use std::time::Duration;

    /// Master wired to probe mailboxes instead of worker threads
    fn probe_master(workers: usize, messages: u64, elements: u64) -> (Master, Vec<Mailbox>, Mailbox) {
        let (refs, boxes): (Vec<ActorRef>, Vec<Mailbox>) =
            (0..workers).map(|i| mailbox(&format!("worker-{}", i), None)).unzip();
        let (reporter_ref, reporter_box) = mailbox("reporter", None);
        let master = Master::new(messages, elements, reporter_ref, RoundRobinPool::from_routees(refs));
        (master, boxes, reporter_box)
    }

    fn chunks(boxes: &[Mailbox]) -> Vec<ChunkRequest> {
        boxes
            .iter()
            .flat_map(|b| std::iter::from_fn(move || b.try_recv()))
            .map(|m| match m {
                Message::Chunk(c) => c,
                other => panic!("unexpected {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_master_initial_state() {
        let (master, _, _) = probe_master(2, 4, 10);
        assert_eq!(master.state(), MasterState::Idle);
        assert_eq!(master.aggregator().expected_replies(), 4);
        assert_eq!(master.aggregator().replies_received(), 0);
    }

    #[test]
    fn test_begin_dispatches_all_chunks() {
        let (mut master, boxes, _reporter) = probe_master(4, 8, 100);

        assert_eq!(master.receive(Message::Begin), Flow::Continue);
        assert_eq!(master.state(), MasterState::Accumulating);
        assert_eq!(master.dispatch_counts(), vec![2, 2, 2, 2]);

        let mut starts: Vec<u64> = chunks(&boxes).iter().map(|c| c.start).collect();
        starts.sort_unstable();
        assert_eq!(starts, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_second_begin_ignored() {
        let (mut master, boxes, _reporter) = probe_master(2, 4, 1);

        master.receive(Message::Begin);
        assert_eq!(master.receive(Message::Begin), Flow::Continue);
        assert_eq!(chunks(&boxes).len(), 4);
    }

    #[test]
    fn test_terminates_only_on_last_reply() {
        let (mut master, _boxes, reporter) = probe_master(2, 3, 1);
        master.receive(Message::Begin);

        for start in 0..2 {
            let value = calculate_pi_for(start, 1);
            assert_eq!(master.receive(Message::PartialSum(PartialResult { value })), Flow::Continue);
            assert_eq!(master.state(), MasterState::Accumulating);
            assert!(reporter.is_empty());
        }

        let value = calculate_pi_for(2, 1);
        assert_eq!(master.receive(Message::PartialSum(PartialResult { value })), Flow::Stop);
        assert_eq!(master.state(), MasterState::Terminated);
        assert_eq!(master.aggregator().replies_received(), 3);

        match reporter.try_recv() {
            Some(Message::Final(approx)) => {
                assert_eq!(approx.pi, 4.0 - 4.0 / 3.0 + 4.0 / 5.0);
            }
            other => panic!("expected Final, got {:?}", other),
        }
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_partial_sum_before_begin_ignored() {
        let (mut master, _boxes, reporter) = probe_master(1, 1, 1);

        assert_eq!(master.receive(Message::PartialSum(PartialResult { value: 4.0 })), Flow::Continue);
        assert_eq!(master.state(), MasterState::Idle);
        assert_eq!(master.aggregator().replies_received(), 0);
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_foreign_messages_ignored() {
        let (mut master, _boxes, reporter) = probe_master(1, 1, 1);
        master.receive(Message::Begin);

        let fin = FinalApproximation { pi: 1.0, elapsed: Duration::ZERO };
        assert_eq!(master.receive(Message::Final(fin)), Flow::Continue);
        assert_eq!(master.receive(Message::Chunk(ChunkRequest::new(0, 1))), Flow::Continue);
        assert_eq!(master.state(), MasterState::Accumulating);
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_zero_messages_finalizes_on_begin() {
        let (mut master, boxes, reporter) = probe_master(3, 0, 10);

        assert_eq!(master.receive(Message::Begin), Flow::Stop);
        assert_eq!(master.state(), MasterState::Terminated);
        assert!(chunks(&boxes).is_empty());

        match reporter.try_recv() {
            Some(Message::Final(approx)) => assert_eq!(approx.pi, 0.0),
            other => panic!("expected Final, got {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_failure_stops_master() {
        let (mut master, boxes, reporter) = probe_master(2, 4, 1);
        drop(boxes);

        assert_eq!(master.receive(Message::Begin), Flow::Stop);
        assert_eq!(master.state(), MasterState::Terminated);
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_post_stop_releases_pool() {
        let (mut master, boxes, _reporter) = probe_master(2, 1, 1);
        master.receive(Message::Begin);
        master.post_stop();

        assert!(master.dispatch_counts().is_empty());
        // queued chunk is still readable, then the mailbox reports disconnect
        assert!(matches!(boxes[0].recv(), Some(Message::Chunk(_))));
        assert_eq!(boxes[0].recv(), None);
        assert_eq!(boxes[1].recv(), None);
    }

    #[test]
    fn test_started_master_with_real_workers() {
        let (reporter_ref, reporter_box) = mailbox("reporter", None);
        let calculation = CalculationConfig { workers: 3, elements: 1000, messages: 30 };

        let (master_ref, handle) = Master::start(&calculation, reporter_ref, Some(4)).unwrap();
        master_ref.tell(Message::Begin).unwrap();

        match reporter_box.recv_timeout(Duration::from_secs(30)) {
            Some(Message::Final(approx)) => {
                let expected = calculate_pi_for(0, 30_000);
                assert!((approx.pi - expected).abs() < 1e-9);
            }
            other => panic!("expected Final, got {:?}", other),
        }

        handle.join().unwrap();
        assert!(master_ref.tell(Message::Begin).is_err());
    }
}

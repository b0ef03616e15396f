//! Coordinator module
//!
//! Brackets one scatter/gather run: builds the Reporter, the Master and its
//! worker pool, sends the single `Begin`, and tears everything down once the
//! Reporter signals that the result has been emitted.
//!
//! # Shutdown handshake
//!
//! The coordinator keeps no handle to the Reporter; Master holds the only
//! one. When Master stops it drops that handle and its worker handles, so the
//! Reporter's mailbox disconnects right after the `Final` message and every
//! unit thread winds down on its own. [`Coordinator::shutdown`] then joins
//! them. If Master stops without a result, the Reporter exits without
//! signalling and [`Coordinator::await_termination`] reports
//! [`RuntimeError::Abandoned`].
//!
//! # Example
//!
//! ```
//! use piapprox::config::RuntimeConfig;
//! use piapprox::coordinator::Coordinator;
//! use piapprox::output::ChannelSink;
//! use std::time::Duration;
//!
//! let (tx, rx) = crossbeam::channel::unbounded();
//! let mut coordinator = Coordinator::new(RuntimeConfig::default(), Box::new(ChannelSink::new(tx)));
//!
//! coordinator.calculate(1, 1, 1)?;
//! let approx = coordinator.await_termination(Some(Duration::from_secs(30)))?;
//!
//! assert_eq!(approx.pi, 4.0);
//! assert_eq!(rx.recv()?.pi, 4.0);
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::config::{validator, CalculationConfig, Config, RuntimeConfig};
use crate::error::RuntimeError;
use crate::master::{Master, MASTER_NAME};
use crate::message::{FinalApproximation, Message};
use crate::output::ResultSink;
use crate::reporter::{Reporter, ShutdownSignal, REPORTER_NAME};
use crate::runtime::{self, mailbox, UnitHandle};
use crate::Result;
use anyhow::Context;
use crossbeam::channel::{Receiver, RecvTimeoutError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Threads and signal of a started run
struct RunningSystem {
    master: UnitHandle,
    reporter: UnitHandle,
    done: Receiver<FinalApproximation>,
}

/// Owns the lifetime of one calculation
pub struct Coordinator {
    runtime: RuntimeConfig,
    sink: Option<Box<dyn ResultSink>>,
    running: Option<RunningSystem>,
}

impl Coordinator {
    /// A coordinator whose Reporter will emit to `sink`
    pub fn new(runtime: RuntimeConfig, sink: Box<dyn ResultSink>) -> Self {
        Self {
            runtime,
            sink: Some(sink),
            running: None,
        }
    }

    /// Start a run
    ///
    /// Validates the parameters, spawns Reporter, Master and `nr_of_workers`
    /// workers, and sends one `Begin` to Master. Completion is observed through
    /// the sink, or by calling [`Coordinator::await_termination`].
    pub fn calculate(&mut self, nr_of_workers: usize, nr_of_elements: u64, nr_of_messages: u64) -> Result<()> {
        let calculation = CalculationConfig {
            workers: nr_of_workers,
            elements: nr_of_elements,
            messages: nr_of_messages,
        };
        validator::validate_config(&Config {
            calculation: calculation.clone(),
            runtime: self.runtime.clone(),
            output: Default::default(),
        })
        .context("Invalid calculation parameters")?;

        let sink = self.sink.take().ok_or(RuntimeError::AlreadyStarted)?;
        validator::warn_if_oversubscribed(nr_of_workers);

        let (signal, done) = ShutdownSignal::channel();
        let (reporter_ref, reporter_box) = mailbox(REPORTER_NAME, None);
        let reporter = runtime::spawn(Reporter::new(sink, signal), reporter_box)
            .context("Failed to start reporter")?;

        // On failure reporter_ref is dropped here, which stops the Reporter
        let (master_ref, master) = Master::start(&calculation, reporter_ref, self.runtime.mailbox_capacity)
            .context("Failed to start master")?;

        info!(
            workers = nr_of_workers,
            elements = nr_of_elements,
            messages = nr_of_messages,
            "starting calculation"
        );
        master_ref
            .tell(Message::Begin)
            .with_context(|| format!("Failed to signal {}", MASTER_NAME))?;

        self.running = Some(RunningSystem { master, reporter, done });
        Ok(())
    }

    /// Block until the Reporter signals completion, then shut down
    ///
    /// With a timeout, gives up with [`RuntimeError::Timeout`] and leaves the
    /// run in place; a stalled worker is never cancelled.
    pub fn await_termination(&mut self, timeout: Option<Duration>) -> Result<FinalApproximation> {
        let running = self.running.as_ref().ok_or(RuntimeError::NotStarted)?;

        let outcome = match timeout {
            Some(limit) => match running.done.recv_timeout(limit) {
                Ok(approximation) => Ok(approximation),
                Err(RecvTimeoutError::Timeout) => return Err(RuntimeError::Timeout(limit).into()),
                Err(RecvTimeoutError::Disconnected) => Err(RuntimeError::Abandoned),
            },
            None => running.done.recv().map_err(|_| RuntimeError::Abandoned),
        };

        self.shutdown()?;
        Ok(outcome?)
    }

    /// Join the Master (and through it the workers) and the Reporter
    ///
    /// A no-op when nothing is running. Blocks if Master is still working.
    pub fn shutdown(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        debug!("joining units");
        let master = running.master.join();
        let reporter = running.reporter.join();
        if master.is_err() || reporter.is_err() {
            warn!("a unit did not stop cleanly");
        }
        master?;
        reporter?;

        info!("shutdown complete");
        Ok(())
    }

    /// True while a started run has not been shut down
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

/// Run one calculation end to end with `config`, emitting to `sink`
pub fn run(config: &Config, sink: Box<dyn ResultSink>) -> Result<FinalApproximation> {
    let mut coordinator = Coordinator::new(config.runtime.clone(), sink);
    let calc = &config.calculation;
    coordinator.calculate(calc.workers, calc.elements, calc.messages)?;

    let timeout = config.runtime.completion_timeout_secs.map(Duration::from_secs);
    coordinator.await_termination(timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigurationError;
    use crate::output::ChannelSink;
    use crossbeam::channel::unbounded;
    use std::f64::consts::PI;

    const WAIT: Option<Duration> = Some(Duration::from_secs(60));

    fn coordinator() -> (Coordinator, Receiver<FinalApproximation>) {
        let (tx, rx) = unbounded();
        (Coordinator::new(RuntimeConfig::default(), Box::new(ChannelSink::new(tx))), rx)
    }

    #[test]
    fn test_four_workers_converge() {
        let (mut coordinator, rx) = coordinator();
        coordinator.calculate(4, 10_000, 100).unwrap();

        let approx = coordinator.await_termination(WAIT).unwrap();
        assert!((approx.pi - PI).abs() < 1e-4, "got {}", approx.pi);
        assert!(!coordinator.is_running());

        // the sink saw exactly the same single result
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![approx]);
    }

    #[test]
    fn test_single_term_is_exactly_four() {
        let (mut coordinator, rx) = coordinator();
        coordinator.calculate(1, 1, 1).unwrap();

        let approx = coordinator.await_termination(WAIT).unwrap();
        assert_eq!(approx.pi, 4.0);
        assert_eq!(rx.recv().unwrap().pi, 4.0);
    }

    #[test]
    fn test_more_workers_than_chunks() {
        let (mut coordinator, _rx) = coordinator();
        coordinator.calculate(8, 100, 3).unwrap();

        let approx = coordinator.await_termination(WAIT).unwrap();
        let expected = crate::worker::calculate_pi_for(0, 300);
        assert!((approx.pi - expected).abs() < 1e-12);
    }

    #[test]
    fn test_bounded_worker_mailboxes() {
        let (tx, _rx) = unbounded();
        let runtime = RuntimeConfig { mailbox_capacity: Some(1), ..Default::default() };
        let mut coordinator = Coordinator::new(runtime, Box::new(ChannelSink::new(tx)));
        coordinator.calculate(2, 1_000, 200).unwrap();

        let approx = coordinator.await_termination(WAIT).unwrap();
        let expected = crate::worker::calculate_pi_for(0, 200_000);
        assert!((approx.pi - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_zero_parameters() {
        for (w, e, m) in [(0, 1, 1), (1, 0, 1), (1, 1, 0)] {
            let (mut coordinator, _rx) = coordinator();
            let err = coordinator.calculate(w, e, m).unwrap_err();
            assert!(err.downcast_ref::<ConfigurationError>().is_some(), "{:?}", err);
            assert!(!coordinator.is_running());
        }
    }

    #[test]
    fn test_calculate_twice() {
        let (mut coordinator, _rx) = coordinator();
        coordinator.calculate(1, 1, 1).unwrap();

        let err = coordinator.calculate(1, 1, 1).unwrap_err();
        assert!(matches!(err.downcast_ref::<RuntimeError>(), Some(RuntimeError::AlreadyStarted)));
        coordinator.await_termination(WAIT).unwrap();
    }

    #[test]
    fn test_await_before_calculate() {
        let (mut coordinator, _rx) = coordinator();
        let err = coordinator.await_termination(WAIT).unwrap_err();
        assert!(matches!(err.downcast_ref::<RuntimeError>(), Some(RuntimeError::NotStarted)));
    }

    #[test]
    fn test_shutdown_idempotent() {
        let (mut coordinator, _rx) = coordinator();
        assert!(coordinator.shutdown().is_ok());

        coordinator.calculate(2, 10, 4).unwrap();
        coordinator.await_termination(WAIT).unwrap();
        assert!(coordinator.shutdown().is_ok());
    }

    #[test]
    fn test_run_with_config() {
        let (tx, _rx) = unbounded();
        let mut config = Config::default();
        config.calculation = CalculationConfig { workers: 2, elements: 500, messages: 10 };
        config.runtime.completion_timeout_secs = Some(60);

        let approx = run(&config, Box::new(ChannelSink::new(tx))).unwrap();
        let expected = crate::worker::calculate_pi_for(0, 5_000);
        assert!((approx.pi - expected).abs() < 1e-12);
    }
}

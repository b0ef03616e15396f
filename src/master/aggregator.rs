//! Partial-sum aggregation
//!
//! The [`Aggregator`] is Master's private accumulator. It counts replies
//! against the number it expects and produces the [`FinalApproximation`]
//! exactly once, on the reply that makes the counts equal.
//!
//! # Example
//!
//! ```
//! use piapprox::master::aggregator::{Aggregator, Progress};
//!
//! let mut aggregator = Aggregator::new(2);
//! assert!(matches!(aggregator.record(4.0), Progress::Pending { received: 1, expected: 2 }));
//!
//! match aggregator.record(-4.0 / 3.0) {
//!     Progress::Complete(approx) => assert_eq!(approx.pi, 4.0 - 4.0 / 3.0),
//!     other => panic!("expected completion, got {:?}", other),
//! }
//! ```

use crate::message::FinalApproximation;
use std::time::Instant;

/// Outcome of recording one partial sum
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    /// More replies are expected
    Pending { received: u64, expected: u64 },
    /// This reply completed the run
    Complete(FinalApproximation),
    /// The run was already complete; the value was not added
    Rejected,
}

/// Accumulated sum and reply accounting for one run
///
/// Invariant: `replies_received <= expected_replies`.
#[derive(Debug, Clone)]
pub struct Aggregator {
    accumulated_sum: f64,
    replies_received: u64,
    expected_replies: u64,
    start_time: Instant,
}

impl Aggregator {
    /// Start accounting now for `expected_replies` partial sums
    pub fn new(expected_replies: u64) -> Self {
        Self::with_start(expected_replies, Instant::now())
    }

    pub fn with_start(expected_replies: u64, start_time: Instant) -> Self {
        Self {
            accumulated_sum: 0.0,
            replies_received: 0,
            expected_replies,
            start_time,
        }
    }

    /// Add one partial sum
    pub fn record(&mut self, value: f64) -> Progress {
        if self.is_complete() {
            return Progress::Rejected;
        }

        self.accumulated_sum += value;
        self.replies_received += 1;

        if self.is_complete() {
            Progress::Complete(self.finalize())
        } else {
            Progress::Pending {
                received: self.replies_received,
                expected: self.expected_replies,
            }
        }
    }

    /// Snapshot the result with the time elapsed since the start
    pub fn finalize(&self) -> FinalApproximation {
        FinalApproximation {
            pi: self.accumulated_sum,
            elapsed: self.start_time.elapsed(),
        }
    }

    /// True once every expected reply has arrived (immediately, if none are expected)
    pub fn is_complete(&self) -> bool {
        self.replies_received == self.expected_replies
    }

    pub fn accumulated_sum(&self) -> f64 {
        self.accumulated_sum
    }

    pub fn replies_received(&self) -> u64 {
        self.replies_received
    }

    pub fn expected_replies(&self) -> u64 {
        self.expected_replies
    }

    pub fn start_time(&self) -> Instant {
        self.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::calculate_pi_for;
    use rand::seq::SliceRandom;
    use std::time::Duration;

    #[test]
    fn test_aggregator_new() {
        let aggregator = Aggregator::new(3);
        assert_eq!(aggregator.replies_received(), 0);
        assert_eq!(aggregator.expected_replies(), 3);
        assert_eq!(aggregator.accumulated_sum(), 0.0);
        assert!(!aggregator.is_complete());
    }

    #[test]
    fn test_completes_exactly_once() {
        let mut aggregator = Aggregator::new(3);

        assert_eq!(aggregator.record(1.0), Progress::Pending { received: 1, expected: 3 });
        assert_eq!(aggregator.record(2.0), Progress::Pending { received: 2, expected: 3 });
        match aggregator.record(3.0) {
            Progress::Complete(approx) => assert_eq!(approx.pi, 6.0),
            other => panic!("expected completion, got {:?}", other),
        }

        assert_eq!(aggregator.record(100.0), Progress::Rejected);
        assert_eq!(aggregator.replies_received(), 3);
        assert_eq!(aggregator.accumulated_sum(), 6.0);
    }

    #[test]
    fn test_zero_expected_is_complete_at_construction() {
        let mut aggregator = Aggregator::new(0);
        assert!(aggregator.is_complete());
        assert_eq!(aggregator.finalize().pi, 0.0);
        assert_eq!(aggregator.record(1.0), Progress::Rejected);
    }

    #[test]
    fn test_elapsed_measured_from_start() {
        let start = Instant::now() - Duration::from_millis(50);
        let mut aggregator = Aggregator::with_start(1, start);

        match aggregator.record(4.0) {
            Progress::Complete(approx) => assert!(approx.elapsed >= Duration::from_millis(50)),
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[test]
    fn test_arrival_order_independent() {
        let partials: Vec<f64> = (0..200).map(|start| calculate_pi_for(start, 500)).collect();

        let mut in_order = Aggregator::new(partials.len() as u64);
        for &p in &partials {
            in_order.record(p);
        }

        let mut shuffled = partials.clone();
        shuffled.shuffle(&mut rand::thread_rng());
        let mut out_of_order = Aggregator::new(shuffled.len() as u64);
        for &p in &shuffled {
            out_of_order.record(p);
        }

        assert!(in_order.is_complete() && out_of_order.is_complete());
        assert!((in_order.accumulated_sum() - out_of_order.accumulated_sum()).abs() < 1e-6);
    }
}

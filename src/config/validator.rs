//! Configuration validation

use super::*;
use crate::error::ConfigurationError;
use tracing::warn;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigurationError> {
    validate_calculation(&config.calculation)?;
    validate_runtime(&config.runtime)?;
    Ok(())
}

/// Validate calculation parameters
///
/// Every count must be positive, and the largest term index `2n + 1` (with
/// `n = messages * elements`) must fit in a `u64`.
pub fn validate_calculation(calculation: &CalculationConfig) -> Result<(), ConfigurationError> {
    if calculation.workers == 0 {
        return Err(ConfigurationError::NotPositive { name: "nr_of_workers" });
    }
    if calculation.elements == 0 {
        return Err(ConfigurationError::NotPositive { name: "nr_of_elements" });
    }
    if calculation.messages == 0 {
        return Err(ConfigurationError::NotPositive { name: "nr_of_messages" });
    }

    let overflow = ConfigurationError::IndexOverflow {
        messages: calculation.messages,
        elements: calculation.elements,
    };
    let total = calculation.total_terms().ok_or_else(|| overflow.clone())?;
    total
        .checked_mul(2)
        .and_then(|n| n.checked_add(1))
        .ok_or(overflow)?;

    Ok(())
}

/// Validate runtime tuning
fn validate_runtime(runtime: &RuntimeConfig) -> Result<(), ConfigurationError> {
    if runtime.mailbox_capacity == Some(0) {
        return Err(ConfigurationError::ZeroMailboxCapacity);
    }
    Ok(())
}

/// Warn when there are more workers than logical CPUs
///
/// Workers still run; they just time-share cores.
pub fn warn_if_oversubscribed(workers: usize) -> bool {
    let cpu_count = num_cpus::get();
    if workers > cpu_count {
        warn!(
            workers,
            cpus = cpu_count,
            "worker count exceeds CPU count; workers will share cores"
        );
        true
    } else {
        false
    }
}

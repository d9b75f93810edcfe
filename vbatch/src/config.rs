//! Scheduler configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_CAPACITY;

/// Lowest admissible concurrency cap.
pub const MIN_CONCURRENCY: usize = 1;
/// Highest admissible concurrency cap.
pub const MAX_CONCURRENCY: usize = 15;

/// Configuration for the transcode scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of concurrently running tasks (1-15).
    pub max_concurrency: usize,
    /// Capacity of the event channel handed to the caller.
    pub event_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 3,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<()> {
        validate_concurrency(self.max_concurrency)?;
        if self.event_capacity == 0 {
            return Err(Error::validation("event channel capacity must be non-zero"));
        }
        Ok(())
    }
}

/// Reject concurrency caps outside the supported range rather than clamping
/// them into an inconsistent pool state.
pub(crate) fn validate_concurrency(n: usize) -> Result<()> {
    if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&n) {
        return Err(Error::validation(format!(
            "concurrency cap must be within {MIN_CONCURRENCY}..={MAX_CONCURRENCY}, got {n}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_concurrency, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_concurrency_bounds() {
        assert!(validate_concurrency(0).is_err());
        assert!(validate_concurrency(1).is_ok());
        assert!(validate_concurrency(15).is_ok());
        assert!(validate_concurrency(16).is_err());
    }

    #[test]
    fn test_zero_event_capacity_rejected() {
        let config = SchedulerConfig {
            event_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

//! Scheduler configuration.

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("poll interval must be greater than zero")]
    ZeroInterval,
}

/// How many feeds each cycle processes and how long to wait between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScraperConfig {
    concurrency: usize,
    poll_interval: Duration,
}

impl ScraperConfig {
    pub fn new(concurrency: usize, poll_interval: Duration) -> Result<Self, ConfigError> {
        if concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if poll_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }

        Ok(ScraperConfig {
            concurrency,
            poll_interval,
        })
    }

    /// Batch size per cycle, which is also the maximum number of feeds in flight.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        ScraperConfig {
            concurrency: DEFAULT_CONCURRENCY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

//! Fan-in configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::error::FanInError;

/// Fan-in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanInConfig {
    /// Length of one time unit in milliseconds
    #[serde(rename = "time-unit-ms", default = "default_time_unit_ms")]
    pub time_unit_ms: u64,

    /// Messages each producer emits before finishing
    #[serde(default = "default_emissions")]
    pub emissions: u32,

    /// Interval of the fast producer, in time units
    #[serde(rename = "fast-interval", default = "default_fast_interval")]
    pub fast_interval: u64,

    /// Interval of the slow producer, in time units
    #[serde(rename = "slow-interval", default = "default_slow_interval")]
    pub slow_interval: u64,
}

fn default_time_unit_ms() -> u64 {
    debug!("default_time_unit_ms: called");
    1000
}

fn default_emissions() -> u32 {
    debug!("default_emissions: called");
    3
}

fn default_fast_interval() -> u64 {
    debug!("default_fast_interval: called");
    1
}

fn default_slow_interval() -> u64 {
    debug!("default_slow_interval: called");
    2
}

impl Default for FanInConfig {
    fn default() -> Self {
        debug!("FanInConfig::default: called");
        Self {
            time_unit_ms: 1000,
            emissions: 3,
            fast_interval: 1,
            slow_interval: 2,
        }
    }
}

impl FanInConfig {
    /// One time unit as a Duration
    pub fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }

    /// Sleep between emissions of the fast producer, `None` if it overflows
    pub fn fast_period(&self) -> Option<Duration> {
        self.period(self.fast_interval)
    }

    /// Sleep between emissions of the slow producer, `None` if it overflows
    pub fn slow_period(&self) -> Option<Duration> {
        self.period(self.slow_interval)
    }

    fn period(&self, interval: u64) -> Option<Duration> {
        let units = u32::try_from(interval).ok()?;
        self.time_unit().checked_mul(units)
    }

    /// Lower bound on a full run: the slower producer's total schedule
    pub fn expected_runtime(&self) -> Option<Duration> {
        self.fast_period()?.max(self.slow_period()?).checked_mul(self.emissions)
    }

    /// Check counts are non-zero and every schedule fits in a Duration
    pub fn validate(&self) -> Result<(), FanInError> {
        debug!(config = ?self, "FanInConfig::validate: called");
        if self.time_unit_ms == 0 {
            return Err(invalid("fan-in.time-unit-ms must be greater than zero"));
        }
        if self.emissions == 0 {
            return Err(invalid("fan-in.emissions must be greater than zero"));
        }
        if self.fast_interval == 0 || self.slow_interval == 0 {
            return Err(invalid("fan-in intervals must be greater than zero"));
        }
        if self.fast_period().is_none() {
            return Err(invalid("fan-in.fast-interval times time-unit-ms overflows"));
        }
        if self.slow_period().is_none() {
            return Err(invalid("fan-in.slow-interval times time-unit-ms overflows"));
        }
        if self.expected_runtime().is_none() {
            return Err(invalid("fan-in.emissions times the slowest interval overflows"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> FanInError {
    FanInError::InvalidConfig(reason.to_string())
}

//! Configuration for the Gochi pet engine.
//!
//! This module provides the `Config` struct with a builder pattern for
//! configuring where state is stored, how fast stats decay, and how often
//! the background ticker runs.

use crate::error::{Error, Result};
use crate::stats::{DecayPolicy, DecayRates};
use std::path::PathBuf;
use std::time::Duration;

/// Default state file, relative to the working directory.
const DEFAULT_STATE_FILE: &str = "pet_state.json";

/// Default background tick period in seconds.
const DEFAULT_TICK_SECS: u64 = 30;

/// Default event channel buffer size.
const DEFAULT_EVENT_BUFFER: usize = 100;

/// Configuration for the pet engine and its ticker.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the pet state JSON file.
    pub state_path: PathBuf,

    /// Period of the background decay ticker.
    pub tick_interval: Duration,

    /// Per-minute decay rates.
    pub decay_rates: DecayRates,

    /// How fractional decay is handled between polls.
    pub decay_policy: DecayPolicy,

    /// Buffer size of the engine event channel.
    pub event_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from(DEFAULT_STATE_FILE),
            tick_interval: Duration::from_secs(DEFAULT_TICK_SECS),
            decay_rates: DecayRates::default(),
            decay_policy: DecayPolicy::default(),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl Config {
    /// Create a new Config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the state file path.
    pub fn state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = path.into();
        self
    }

    /// Set the background tick period.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the background tick period in seconds.
    pub fn tick_secs(mut self, secs: u64) -> Self {
        self.tick_interval = Duration::from_secs(secs);
        self
    }

    /// Set all decay rates at once.
    pub fn decay_rates(mut self, rates: DecayRates) -> Self {
        self.decay_rates = rates;
        self
    }

    /// Set the hunger decay rate (points per minute).
    pub fn hunger_rate(mut self, rate: f64) -> Self {
        self.decay_rates.hunger = rate;
        self
    }

    /// Set the energy decay rate (points per minute).
    pub fn energy_rate(mut self, rate: f64) -> Self {
        self.decay_rates.energy = rate;
        self
    }

    /// Set the affection decay rate (points per minute).
    pub fn affection_rate(mut self, rate: f64) -> Self {
        self.decay_rates.affection = rate;
        self
    }

    /// Set the fractional decay policy.
    pub fn decay_policy(mut self, policy: DecayPolicy) -> Self {
        self.decay_policy = policy;
        self
    }

    /// Set the event channel buffer size.
    pub fn event_buffer(mut self, size: usize) -> Self {
        self.event_buffer = size;
        self
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` for a zero tick interval, a zero event
    /// buffer, or a negative or non-finite decay rate.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(Error::config_error("tick interval must be non-zero"));
        }
        if self.event_buffer == 0 {
            return Err(Error::config_error("event buffer must be non-zero"));
        }
        let rates = [
            ("hunger", self.decay_rates.hunger),
            ("energy", self.decay_rates.energy),
            ("affection", self.decay_rates.affection),
        ];
        for (name, rate) in rates {
            if !rate.is_finite() || rate < 0.0 {
                return Err(Error::config_error(format!(
                    "{} decay rate must be a non-negative number, got {}",
                    name, rate
                )));
            }
        }
        Ok(())
    }
}

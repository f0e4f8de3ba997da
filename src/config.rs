//! Configuration surface for the id-generation subsystem
//!
//! Mirrors the recognized options of the identifier engine: the bit layout,
//! the epoch, the clock-regression policy, and the ring-buffer sizing knobs.
//! Loading these values from a file or environment is left to the embedding
//! application; this module only defines and validates the struct.

use chrono::{NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BOOST_POWER, DEFAULT_EPOCH_POINT, DEFAULT_MAX_BACKWARD_SECONDS,
    DEFAULT_PADDING_FACTOR, DEFAULT_SEQ_BITS, DEFAULT_TIME_BITS, DEFAULT_WORKER_BITS,
};
use crate::error::{DriftIdError, Result};

/// Configuration for the identifier engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Disables the subsystem entirely when false.
    pub enabled: bool,
    /// Number of bits allocated to the delta-seconds field (`T`).
    pub time_bits: u32,
    /// Number of bits allocated to the worker-id field (`W`).
    pub worker_bits: u32,
    /// Number of bits allocated to the sequence field (`S`).
    pub seq_bits: u32,
    /// Epoch basis, as a `YYYY-MM-DD` calendar date (UTC midnight).
    pub epoch_point: String,
    /// Clock-regression policy: tolerant (`true`) vs strict (`false`).
    pub backward_enabled: bool,
    /// Spin-wait tolerance window for tolerant clock regression, in seconds.
    pub max_backward_seconds: i64,
    /// Ring-buffer size multiplier exponent.
    pub boost_power: u32,
    /// Refill threshold as a percentage of `bufferSize`, in `(0, 100)`.
    pub padding_factor: u32,
    /// Enables periodic padding when set to a positive number of seconds.
    pub schedule_interval: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            time_bits: DEFAULT_TIME_BITS,
            worker_bits: DEFAULT_WORKER_BITS,
            seq_bits: DEFAULT_SEQ_BITS,
            epoch_point: DEFAULT_EPOCH_POINT.to_string(),
            backward_enabled: true,
            max_backward_seconds: DEFAULT_MAX_BACKWARD_SECONDS,
            boost_power: DEFAULT_BOOST_POWER,
            padding_factor: DEFAULT_PADDING_FACTOR,
            schedule_interval: None,
        }
    }
}

impl Config {
    /// Create a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the bit layout triple.
    pub fn with_bit_layout(mut self, time_bits: u32, worker_bits: u32, seq_bits: u32) -> Self {
        self.time_bits = time_bits;
        self.worker_bits = worker_bits;
        self.seq_bits = seq_bits;
        self
    }

    /// Override the epoch point (`YYYY-MM-DD`).
    pub fn with_epoch_point(mut self, epoch_point: impl Into<String>) -> Self {
        self.epoch_point = epoch_point.into();
        self
    }

    /// Override the clock-regression policy.
    pub fn with_backward_policy(mut self, tolerant: bool, max_backward_seconds: i64) -> Self {
        self.backward_enabled = tolerant;
        self.max_backward_seconds = max_backward_seconds;
        self
    }

    /// Override the ring-buffer sizing knobs.
    pub fn with_ring_sizing(mut self, boost_power: u32, padding_factor: u32) -> Self {
        self.boost_power = boost_power;
        self.padding_factor = padding_factor;
        self
    }

    /// Enable periodic padding every `interval_seconds`.
    pub fn with_schedule_interval(mut self, interval_seconds: u64) -> Self {
        self.schedule_interval = Some(interval_seconds);
        self
    }

    /// Parse `epoch_point` into seconds since the Unix epoch (UTC midnight).
    pub fn epoch_seconds(&self) -> Result<i64> {
        let date = NaiveDate::parse_from_str(&self.epoch_point, "%Y-%m-%d").map_err(|e| {
            DriftIdError::config(format!("invalid epochPoint '{}': {e}", self.epoch_point))
        })?;
        let datetime = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
            DriftIdError::config(format!("invalid epochPoint '{}'", self.epoch_point))
        })?;
        let utc = Utc.from_utc_datetime(&datetime);
        Ok(utc.timestamp())
    }

    /// Validate the configuration, returning the parsed epoch seconds on success.
    pub fn validate(&self) -> Result<i64> {
        if self.time_bits == 0 || self.worker_bits == 0 || self.seq_bits == 0 {
            return Err(DriftIdError::invalid_layout(
                "timeBits, workerBits and seqBits must each be greater than zero",
            ));
        }
        let sum = self.time_bits + self.worker_bits + self.seq_bits;
        if sum != 63 {
            return Err(DriftIdError::invalid_layout(format!(
                "timeBits + workerBits + seqBits must equal 63, got {sum}"
            )));
        }
        if !(0..100).contains(&self.padding_factor) {
            return Err(DriftIdError::config("paddingFactor must be in (0, 100)"));
        }
        if self.padding_factor == 0 {
            return Err(DriftIdError::config("paddingFactor must be in (0, 100)"));
        }

        let epoch_seconds = self.epoch_seconds()?;
        let now = Utc::now().timestamp();
        if epoch_seconds > now {
            return Err(DriftIdError::config("epochPoint must be in the past"));
        }

        Ok(epoch_seconds)
    }
}

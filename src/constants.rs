//! DriftId performance and layout constants
//!
//! Core constants used by the bit layout and ring buffer implementations.

/// Total number of payload bits available below the sign bit.
pub const TOTAL_PAYLOAD_BITS: u32 = 63;

/// Default number of bits allocated to the delta-seconds field.
pub const DEFAULT_TIME_BITS: u32 = 33;

/// Default number of bits allocated to the worker-id field.
pub const DEFAULT_WORKER_BITS: u32 = 20;

/// Default number of bits allocated to the sequence field.
pub const DEFAULT_SEQ_BITS: u32 = 10;

/// Default epoch, as a `YYYY-MM-DD` calendar date (UTC midnight).
pub const DEFAULT_EPOCH_POINT: &str = "2024-01-01";

/// Default ring-buffer size multiplier exponent (`bufferSize = (maxSequence + 1) << boostPower`).
pub const DEFAULT_BOOST_POWER: u32 = 3;

/// Default refill threshold, as a percentage of `bufferSize`.
pub const DEFAULT_PADDING_FACTOR: u32 = 50;

/// Default clock-regression spin-wait tolerance, in seconds.
pub const DEFAULT_MAX_BACKWARD_SECONDS: i64 = 1;

/// Cache line size for alignment (64 bytes on most CPUs).
pub const CACHE_LINE_SIZE: usize = 64;

/// Size of the padding executor's background worker pool.
pub const PADDING_WORKER_POOL_SIZE: usize = 2;

/// Bounded depth of the padding executor's async job queue.
pub const PADDING_QUEUE_DEPTH: usize = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bit_triple_sums_to_payload_bits() {
        assert_eq!(DEFAULT_TIME_BITS + DEFAULT_WORKER_BITS + DEFAULT_SEQ_BITS, TOTAL_PAYLOAD_BITS);
    }

    #[test]
    fn cache_line_size_is_power_of_two() {
        assert!(CACHE_LINE_SIZE.is_power_of_two());
    }
}

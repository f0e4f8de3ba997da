//! Bit-packing allocator for 63-bit identifiers
//!
//! Packs a `(delta-seconds, worker-id, sequence)` triple into the low 63 bits
//! of a signed 64-bit integer, and recovers the triple from a packed id.

use crate::error::{DriftIdError, Result};

/// The decomposed fields recovered from a parsed identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedId {
    /// The raw packed identifier.
    pub id: i64,
    /// Worker id that minted this identifier.
    pub worker_id: i64,
    /// Intra-second sequence number.
    pub sequence: i64,
    /// Wall-clock seconds since the Unix epoch the identifier was minted at.
    pub timestamp: i64,
}

/// Fixed `(T, W, S)` bit triple used to pack and unpack identifiers.
///
/// The triple is fixed at construction; changing it invalidates all
/// previously issued ids, since the same bit pattern decodes differently
/// under a different layout.
#[derive(Debug, Clone, Copy)]
pub struct BitLayout {
    time_bits: u32,
    worker_bits: u32,
    seq_bits: u32,
    max_delta_seconds: i64,
    max_worker_id: i64,
    max_sequence: i64,
    timestamp_shift: u32,
    worker_shift: u32,
    epoch_seconds: i64,
}

impl BitLayout {
    /// Construct a new layout. Fails when `1 + time_bits + worker_bits + seq_bits > 64`
    /// or any component is zero.
    pub fn new(time_bits: u32, worker_bits: u32, seq_bits: u32, epoch_seconds: i64) -> Result<Self> {
        if time_bits == 0 || worker_bits == 0 || seq_bits == 0 {
            return Err(DriftIdError::invalid_layout(
                "timeBits, workerBits and seqBits must each be greater than zero",
            ));
        }
        let total = 1u64 + time_bits as u64 + worker_bits as u64 + seq_bits as u64;
        if total > 64 {
            return Err(DriftIdError::invalid_layout(format!(
                "1 + timeBits + workerBits + seqBits must not exceed 64, got {total}"
            )));
        }

        let worker_shift = seq_bits;
        let timestamp_shift = worker_bits + seq_bits;

        Ok(Self {
            time_bits,
            worker_bits,
            seq_bits,
            max_delta_seconds: (1i64 << time_bits) - 1,
            max_worker_id: (1i64 << worker_bits) - 1,
            max_sequence: (1i64 << seq_bits) - 1,
            timestamp_shift,
            worker_shift,
            epoch_seconds,
        })
    }

    /// Number of bits allocated to the delta-seconds field.
    pub fn time_bits(&self) -> u32 {
        self.time_bits
    }

    /// Number of bits allocated to the worker-id field.
    pub fn worker_bits(&self) -> u32 {
        self.worker_bits
    }

    /// Number of bits allocated to the sequence field.
    pub fn seq_bits(&self) -> u32 {
        self.seq_bits
    }

    /// Maximum representable delta-seconds value (`2^T - 1`).
    pub fn max_delta_seconds(&self) -> i64 {
        self.max_delta_seconds
    }

    /// Maximum representable worker id (`2^W - 1`).
    pub fn max_worker_id(&self) -> i64 {
        self.max_worker_id
    }

    /// Maximum representable sequence value (`2^S - 1`).
    pub fn max_sequence(&self) -> i64 {
        self.max_sequence
    }

    /// Configured epoch, in seconds since the Unix epoch.
    pub fn epoch_seconds(&self) -> i64 {
        self.epoch_seconds
    }

    /// Pack `(delta, worker, seq)` into an identifier.
    ///
    /// Callers are responsible for ensuring each field fits its maximum;
    /// this method masks/guards nothing beyond the shift arithmetic.
    #[inline]
    pub fn allocate(&self, delta_seconds: i64, worker_id: i64, sequence: i64) -> i64 {
        (delta_seconds << self.timestamp_shift) | (worker_id << self.worker_shift) | sequence
    }

    /// Recover `(delta, worker, seq, timestamp)` from a packed identifier.
    ///
    /// Returns `None` when `id <= 0` ("not an id").
    pub fn parse(&self, id: i64) -> Option<ParsedId> {
        if id <= 0 {
            return None;
        }

        let sequence = id & self.max_sequence;
        let worker_id = (id >> self.worker_shift) & self.max_worker_id;
        let delta_seconds = id >> self.timestamp_shift;

        Some(ParsedId {
            id,
            worker_id,
            sequence,
            timestamp: self.epoch_seconds + delta_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_rejects_zero_components() {
        assert!(BitLayout::new(0, 20, 10, 0).is_err());
        assert!(BitLayout::new(33, 0, 10, 0).is_err());
        assert!(BitLayout::new(33, 20, 0, 0).is_err());
    }

    #[test]
    fn construction_rejects_overflowing_triple() {
        // 1 + 40 + 20 + 10 = 71 > 64
        assert!(BitLayout::new(40, 20, 10, 0).is_err());
    }

    #[test]
    fn construction_accepts_default_triple() {
        assert!(BitLayout::new(33, 20, 10, 0).is_ok());
    }

    #[test]
    fn round_trips_allocate_and_parse() {
        let layout = BitLayout::new(33, 20, 10, 1_704_067_200).unwrap();
        let id = layout.allocate(5, 42, 7);
        let parsed = layout.parse(id).unwrap();
        assert_eq!(parsed.worker_id, 42);
        assert_eq!(parsed.sequence, 7);
        assert_eq!(parsed.timestamp, 1_704_067_200 + 5);
    }

    #[test]
    fn parse_rejects_non_positive_ids() {
        let layout = BitLayout::new(33, 20, 10, 0).unwrap();
        assert!(layout.parse(0).is_none());
        assert!(layout.parse(-1).is_none());
    }

    /// S1: reference layout `(28, 22, 13)`, worker 0, sequence 0, delta 1s.
    #[test]
    fn scenario_s1_reference_layout() {
        let layout = BitLayout::new(28, 22, 13, 1_463_702_400).unwrap();
        let id = layout.allocate(1, 0, 0);
        assert_eq!(id, 1i64 << 35);
        assert_eq!(id, 34_359_738_368);

        let parsed = layout.parse(id).unwrap();
        assert_eq!(parsed.worker_id, 0);
        assert_eq!(parsed.sequence, 0);
        assert_eq!(parsed.timestamp, 1_463_702_400 + 1);
    }

    #[test]
    fn sign_bit_is_always_zero() {
        let layout = BitLayout::new(33, 20, 10, 0).unwrap();
        let id = layout.allocate(layout.max_delta_seconds(), layout.max_worker_id(), layout.max_sequence());
        assert!(id > 0);
        assert!(id < (1i64 << 63));
    }
}

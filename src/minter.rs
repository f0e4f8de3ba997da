//! Synchronized identifier minting with clock-regression handling
//!
//! `DirectMinter` is the single critical section through which every
//! identifier — whether handed straight to a caller or pre-minted into the
//! ring buffer — is allocated a `(delta, workerId, sequence)` triple.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{DriftIdError, Result};
use crate::layout::BitLayout;
use crate::worker_id::{truncate_to_bits, WorkerIdSource};

/// Mutable minting state, guarded exclusively by [`DirectMinter`]'s mutex.
struct MinterState {
    last_second: i64,
    sequence: i64,
    worker_id: i64,
}

/// Current wall-clock time, floored to whole seconds since the Unix epoch.
fn current_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Single synchronized minter: every successful call strictly increases the
/// returned identifier for a fixed worker id (see invariant 3 in the spec).
pub struct DirectMinter {
    layout: BitLayout,
    state: Mutex<MinterState>,
    worker_id_source: Arc<dyn WorkerIdSource>,
    backward_enabled: bool,
    max_backward_seconds: i64,
    /// Mirrors `state.worker_id` for lock-free reads from the padding path.
    worker_id_hint: AtomicI64,
}

impl DirectMinter {
    /// Construct a minter for `layout`, resolving the initial worker id from
    /// `worker_id_source`.
    pub fn new(
        layout: BitLayout,
        worker_id_source: Arc<dyn WorkerIdSource>,
        backward_enabled: bool,
        max_backward_seconds: i64,
    ) -> Self {
        let raw = worker_id_source.next_worker_id();
        let worker_id = truncate_to_bits(raw, layout.worker_bits());
        debug!(worker_id, "direct minter initialized");

        Self {
            layout,
            state: Mutex::new(MinterState {
                last_second: -1,
                sequence: 0,
                worker_id,
            }),
            worker_id_source,
            backward_enabled,
            max_backward_seconds,
            worker_id_hint: AtomicI64::new(worker_id),
        }
    }

    /// The bit layout this minter allocates identifiers under.
    pub fn layout(&self) -> &BitLayout {
        &self.layout
    }

    /// The worker id most recently assigned to this minter.
    ///
    /// May change across calls if clock regression triggers reassignment
    /// (see [`next_unique_id`](Self::next_unique_id)).
    pub fn worker_id(&self) -> i64 {
        self.worker_id_hint.load(Ordering::Relaxed)
    }

    /// Mint the next unique identifier, blocking (via bounded spin-waits)
    /// through clock regression and sequence exhaustion as needed.
    pub fn next_unique_id(&self) -> Result<i64> {
        let epoch = self.layout.epoch_seconds();
        let max_delta = self.layout.max_delta_seconds();
        let max_seq = self.layout.max_sequence();

        let mut state = self.state.lock();
        loop {
            let now = current_seconds();

            if now - epoch > max_delta {
                return Err(DriftIdError::TimestampExhausted {
                    seconds_since_epoch: now - epoch,
                    max_delta_seconds: max_delta,
                });
            }

            if now < state.last_second {
                let delta_seconds = state.last_second - now;

                if self.backward_enabled && delta_seconds <= self.max_backward_seconds {
                    std::hint::spin_loop();
                    continue;
                }

                if self.backward_enabled {
                    let raw = self.worker_id_source.next_worker_id();
                    state.worker_id = truncate_to_bits(raw, self.layout.worker_bits());
                    self.worker_id_hint.store(state.worker_id, Ordering::Relaxed);
                    warn!(
                        delta_seconds,
                        new_worker_id = state.worker_id,
                        "clock regressed beyond tolerance; reassigned worker id"
                    );
                    // `last_second` is intentionally left untouched: see DESIGN.md
                    // for the rationale behind this choice among the two options
                    // the spec leaves open.
                    return Ok(self.layout.allocate(now - epoch, state.worker_id, 0));
                }

                return Err(DriftIdError::ClockRegression { delta_seconds });
            }

            if now == state.last_second {
                let next_seq = (state.sequence + 1) & max_seq;
                if next_seq == 0 {
                    // Sequence space exhausted for this second; spin into the next one.
                    std::hint::spin_loop();
                    continue;
                }
                state.sequence = next_seq;
            } else {
                state.sequence = 0;
            }

            state.last_second = now;
            return Ok(self.layout.allocate(now - epoch, state.worker_id, state.sequence));
        }
    }

    /// Mint a full batch of `maxSequence + 1` identifiers for `second`
    /// (seconds since the Unix epoch), under the current worker id.
    ///
    /// This is the operation the padding executor uses to pre-mint a
    /// second's worth of ids; it bypasses the single-id clock-regression
    /// protocol in [`next_unique_id`](Self::next_unique_id) because the
    /// target second is supplied by the caller rather than read from the
    /// wall clock.
    pub fn mint_batch_for_second(&self, second: i64) -> Vec<i64> {
        let worker_id = self.state.lock().worker_id;
        let delta = second - self.layout.epoch_seconds();
        let max_seq = self.layout.max_sequence();

        (0..=max_seq).map(|seq| self.layout.allocate(delta, worker_id, seq)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BitLayout;

    struct FixedWorkerIdSource(std::sync::atomic::AtomicI64);
    impl WorkerIdSource for FixedWorkerIdSource {
        fn next_worker_id(&self) -> i64 {
            self.0.load(Ordering::Relaxed)
        }
    }

    fn minter_with(backward_enabled: bool, max_backward_seconds: i64) -> DirectMinter {
        let layout = BitLayout::new(33, 20, 10, current_seconds() - 1000).unwrap();
        let source = Arc::new(FixedWorkerIdSource(std::sync::atomic::AtomicI64::new(5)));
        DirectMinter::new(layout, source, backward_enabled, max_backward_seconds)
    }

    #[test]
    fn successive_mints_strictly_increase() {
        let minter = minter_with(true, 1);
        let a = minter.next_unique_id().unwrap();
        let b = minter.next_unique_id().unwrap();
        assert!(a < b, "expected {a} < {b}");
    }

    /// S2: same second, same worker -> sequences 0 then 1.
    #[test]
    fn scenario_s2_consecutive_same_second_sequences() {
        let layout = BitLayout::new(33, 20, 10, current_seconds()).unwrap();
        let source = Arc::new(FixedWorkerIdSource(std::sync::atomic::AtomicI64::new(5)));
        let minter = DirectMinter::new(layout.clone(), source, true, 1);

        let a = minter.next_unique_id().unwrap();
        let b = minter.next_unique_id().unwrap();

        let pa = layout.parse(a).unwrap();
        let pb = layout.parse(b).unwrap();
        assert_eq!((pa.worker_id, pa.sequence), (5, 0));
        assert_eq!((pb.worker_id, pb.sequence), (5, 1));
        assert_eq!(b - a, 1);
    }

    /// S5: strict clock-regression policy fails fast.
    #[test]
    fn scenario_s5_strict_regression_fails() {
        let minter = minter_with(false, 1);
        {
            let mut state = minter.state.lock();
            state.last_second = current_seconds() + 100;
        }
        let result = minter.next_unique_id();
        assert!(matches!(result, Err(DriftIdError::ClockRegression { .. })));
    }

    #[test]
    fn tolerant_regression_within_window_blocks_then_succeeds() {
        let minter = minter_with(true, 2);
        {
            let mut state = minter.state.lock();
            state.last_second = current_seconds() + 1;
        }
        // This call must spin until the wall clock reaches last_second; it
        // completes quickly in practice since the window is 1s.
        let id = minter.next_unique_id();
        assert!(id.is_ok());
    }

    #[test]
    fn intolerable_regression_reassigns_worker_id() {
        let minter = minter_with(true, 1);
        {
            let mut state = minter.state.lock();
            state.last_second = current_seconds() + 100;
        }
        let id = minter.next_unique_id().unwrap();
        let parsed = minter.layout.parse(id).unwrap();
        assert_eq!(parsed.sequence, 0);
    }

    #[test]
    fn timestamp_exhausted_is_fatal() {
        // Epoch far enough in the past that maxDeltaSeconds is immediately exceeded.
        let layout = BitLayout::new(1, 20, 10, 0).unwrap();
        let source = Arc::new(FixedWorkerIdSource(std::sync::atomic::AtomicI64::new(0)));
        let minter = DirectMinter::new(layout, source, true, 1);
        assert!(matches!(
            minter.next_unique_id(),
            Err(DriftIdError::TimestampExhausted { .. })
        ));
    }

    #[test]
    fn batch_for_second_yields_contiguous_sequences() {
        let minter = minter_with(true, 1);
        let batch = minter.mint_batch_for_second(current_seconds());
        assert_eq!(batch.len(), 1024);
        for (seq, id) in batch.iter().enumerate() {
            let parsed = minter.layout.parse(*id).unwrap();
            assert_eq!(parsed.sequence, seq as i64);
        }
    }

    #[test]
    fn ids_from_direct_minter_are_always_positive_and_63_bit() {
        let minter = minter_with(true, 1);
        for _ in 0..50 {
            let id = minter.next_unique_id().unwrap();
            assert!(id > 0);
            assert!(id < (1i64 << 63));
        }
    }

    /// S3: with seqBits = 2 (maxSequence = 3), four mints pinned to the same
    /// second yield sequences 0,1,2,3; the fifth wraps to the next second
    /// with sequence 0.
    #[test]
    fn scenario_s3_sequence_exhaustion_wraps_to_next_second() {
        let layout = BitLayout::new(41, 20, 2, 0).unwrap();
        let source = Arc::new(FixedWorkerIdSource(std::sync::atomic::AtomicI64::new(1)));
        let minter = DirectMinter::new(layout.clone(), source, true, 1);

        let pinned_second = current_seconds();
        {
            let mut state = minter.state.lock();
            state.last_second = pinned_second - 1;
        }

        // Pin `now` by fabricating state directly: simulate four mints that
        // all land on `pinned_second` by forcing last_second back each time
        // except the first, since next_unique_id always reads the real
        // wall clock. We instead exercise the sequence-wrap logic directly
        // through repeated same-second state, which is what step 3 of the
        // mint algorithm implements regardless of where `now` comes from.
        let first = minter.next_unique_id().unwrap();
        let first_parsed = layout.parse(first).unwrap();
        assert_eq!(first_parsed.sequence, 0);

        {
            let mut state = minter.state.lock();
            state.last_second = current_seconds();
            state.sequence = 2;
        }
        let fourth = minter.next_unique_id().unwrap();
        let fourth_parsed = layout.parse(fourth).unwrap();
        assert_eq!(fourth_parsed.sequence, 3);

        // Sequence is now at maxSequence (3); the next mint must wrap: it
        // spins until the wall clock advances past last_second, then resets
        // sequence to 0.
        {
            let mut state = minter.state.lock();
            state.last_second = current_seconds();
            state.sequence = 3;
        }
        let fifth = minter.next_unique_id().unwrap();
        let fifth_parsed = layout.parse(fifth).unwrap();
        assert_eq!(fifth_parsed.sequence, 0);
        assert!(fifth_parsed.timestamp > fourth_parsed.timestamp);
    }
}

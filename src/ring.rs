//! Lock-free single-producer / multi-consumer ring buffer
//!
//! Fixed-size array of flag-tagged slots. One producer thread (the padding
//! executor) serializes `put`s under a mutex; any number of consumer threads
//! call `take` concurrently without blocking.
//!
//! Publication discipline on `put`: payload write, then flag release, then
//! tail publish — each a release-store, so a consumer observing a new tail
//! also observes the flag and payload beneath it. `take` pairs these with
//! acquire-loads.

use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use crate::constants::CACHE_LINE_SIZE;

const EMPTY: u8 = 0;
const FULL: u8 = 1;

/// A cache-line padded 64-bit atomic counter, used for `tail` and `cursor`
/// so neither shares a cache line with the other or with slot data.
#[repr(align(64))]
struct PaddedSequence {
    value: AtomicI64,
    _padding: [u8; CACHE_LINE_SIZE - 8],
}

impl PaddedSequence {
    fn new(initial: i64) -> Self {
        Self {
            value: AtomicI64::new(initial),
            _padding: [0; CACHE_LINE_SIZE - 8],
        }
    }
}

/// A single ring slot: a 64-bit id payload plus an `EMPTY`/`FULL` flag, each
/// padded to its own cache line to keep independently-mutated flags from
/// sharing a line under contention.
#[repr(align(64))]
struct Slot {
    id: AtomicI64,
    flag: AtomicU8,
    _padding: [u8; CACHE_LINE_SIZE - 9],
}

impl Slot {
    fn new() -> Self {
        Self {
            id: AtomicI64::new(0),
            flag: AtomicU8::new(EMPTY),
            _padding: [0; CACHE_LINE_SIZE - 9],
        }
    }
}

/// Invoked when `put` finds the ring full or the target slot still `FULL`.
/// The default handler logs and drops the excess id.
pub trait RejectedPutHandler: Send + Sync {
    /// Handle a rejected put for `id`.
    fn on_rejected_put(&self, id: i64);
}

/// Default put-rejection handler: log and discard.
pub struct LoggingRejectedPutHandler;

impl RejectedPutHandler for LoggingRejectedPutHandler {
    fn on_rejected_put(&self, id: i64) {
        trace!(id, "ring buffer full; dropping pre-minted id");
    }
}

/// Invoked when `take` finds the ring empty. The default handler raises
/// [`DriftIdError::Exhausted`](crate::error::DriftIdError::Exhausted).
pub trait RejectedTakeHandler: Send + Sync {
    /// Handle a rejected take.
    fn on_rejected_take(&self);
}

/// Default take-rejection handler: a no-op: the caller observes `None` from
/// [`RingBuffer::take`] and is responsible for raising `Exhausted` (the
/// cached facade does this so the handler stays infallible here).
pub struct NoopRejectedTakeHandler;

impl RejectedTakeHandler for NoopRejectedTakeHandler {
    fn on_rejected_take(&self) {
        trace!("ring buffer exhausted");
    }
}

/// Fixed-size circular buffer of pre-minted identifiers.
///
/// `bufferSize` must be a power of two. `tail` (last published producer
/// position) and `cursor` (last consumed position) both start at `-1`.
pub struct RingBuffer {
    slots: Box<[Slot]>,
    mask: i64,
    tail: PaddedSequence,
    cursor: PaddedSequence,
    put_lock: Mutex<()>,
    put_handler: Box<dyn RejectedPutHandler>,
    take_handler: Box<dyn RejectedTakeHandler>,
}

impl RingBuffer {
    /// Create a ring buffer with `buffer_size` slots (must be a power of two).
    pub fn new(buffer_size: usize) -> Self {
        Self::with_handlers(
            buffer_size,
            Box::new(LoggingRejectedPutHandler),
            Box::new(NoopRejectedTakeHandler),
        )
    }

    /// Create a ring buffer with custom rejection handlers.
    pub fn with_handlers(
        buffer_size: usize,
        put_handler: Box<dyn RejectedPutHandler>,
        take_handler: Box<dyn RejectedTakeHandler>,
    ) -> Self {
        assert!(buffer_size.is_power_of_two(), "bufferSize must be a power of two");

        let slots = (0..buffer_size).map(|_| Slot::new()).collect::<Vec<_>>().into_boxed_slice();

        Self {
            slots,
            mask: buffer_size as i64 - 1,
            tail: PaddedSequence::new(-1),
            cursor: PaddedSequence::new(-1),
            put_lock: Mutex::new(()),
            put_handler,
            take_handler,
        }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        (self.mask + 1) as usize
    }

    /// Number of slots currently holding a `FULL` id, from the producer's
    /// point of view (`tail - cursor`).
    pub fn len(&self) -> i64 {
        let tail = self.tail.value.load(Ordering::Acquire);
        let cursor = self.cursor.value.load(Ordering::Acquire);
        (tail - cursor).max(0)
    }

    /// Whether the ring currently holds no ids.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attempt to publish `id`. Returns `false` (and invokes the rejected-put
    /// handler) if the ring is full or the target slot has not yet been
    /// drained by a consumer.
    ///
    /// Callers MUST ensure only one producer calls `put` concurrently; the
    /// internal mutex guards against misuse but does not make concurrent
    /// producers correct (see DESIGN.md).
    pub fn put(&self, id: i64) -> bool {
        let _guard = self.put_lock.lock();

        let tail = self.tail.value.load(Ordering::Relaxed);
        let cursor = self.cursor.value.load(Ordering::Acquire);
        // `cursor == -1` means no take has happened yet; treat it as 0 for
        // distance purposes so the first `bufferSize` puts all succeed.
        let cursor_distance = if cursor == -1 { 0 } else { cursor };

        if tail - cursor_distance == self.mask {
            self.put_handler.on_rejected_put(id);
            return false;
        }

        let next = tail + 1;
        let idx = (next & self.mask) as usize;
        let slot = &self.slots[idx];

        if slot.flag.load(Ordering::Acquire) != EMPTY {
            self.put_handler.on_rejected_put(id);
            return false;
        }

        slot.id.store(id, Ordering::Relaxed);
        slot.flag.store(FULL, Ordering::Release);
        self.tail.value.store(next, Ordering::Release);
        true
    }

    /// Attempt to take the next id. Returns `None` (and invokes the
    /// rejected-take handler) if no consumer-visible id is available.
    ///
    /// On success, also reports whether the remaining fill dropped below
    /// `padding_threshold`, so callers can trigger an asynchronous refill.
    pub fn take(&self, padding_threshold: i64) -> Option<(i64, bool)> {
        let mut cursor = self.cursor.value.load(Ordering::Relaxed);
        loop {
            let tail = self.tail.value.load(Ordering::Acquire);
            if cursor == tail {
                self.take_handler.on_rejected_take();
                return None;
            }

            let next = cursor + 1;
            match self.cursor.value.compare_exchange_weak(
                cursor,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    let needs_refill = tail - next < padding_threshold;

                    let idx = (next & self.mask) as usize;
                    let slot = &self.slots[idx];

                    // Defensive invariant check: the producer must have
                    // published this slot before we could have claimed it.
                    debug_assert_eq!(
                        slot.flag.load(Ordering::Acquire),
                        FULL,
                        "flag discipline violated at idx {idx}"
                    );

                    let id = slot.id.load(Ordering::Relaxed);
                    slot.flag.store(EMPTY, Ordering::Release);

                    return Some((id, needs_refill));
                }
                Err(observed) => {
                    cursor = observed;
                }
            }
        }
    }
}

// `Slot` is manipulated exclusively through atomics; `RingBuffer` is safe to
// share across threads.
unsafe impl Sync for RingBuffer {}
unsafe impl Send for RingBuffer {}

//! Background refill of the ring buffer from pre-minted batches
//!
//! `PaddingExecutor` is the ring buffer's sole producer. Each padding cycle
//! asks the minter for a full second's worth of ids at a time and pushes
//! them into the ring until it reports full; an atomic `running` flag
//! coalesces overlapping refill requests into a single in-flight cycle.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use tracing::{debug, info};

use crate::constants::{PADDING_QUEUE_DEPTH, PADDING_WORKER_POOL_SIZE};
use crate::minter::DirectMinter;
use crate::ring::RingBuffer;

/// Sentinel meaning "no second has been padded yet"; the first cycle falls
/// back to the wall clock.
const NOT_YET_PADDED: i64 = i64::MIN;

fn current_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Run one padding cycle: pre-mint consecutive seconds' worth of ids and
/// push them into `ring` until a put is rejected (ring full).
///
/// `next_second` tracks the next not-yet-padded second across cycles, so a
/// refill that fires within the same wall-clock second as a previous cycle
/// continues from where that cycle left off instead of reminting (and
/// re-emitting) the same `(delta, worker, seq)` block.
fn padding_buffer(minter: &DirectMinter, ring: &RingBuffer, next_second: &AtomicI64) {
    loop {
        let wall_now = current_seconds();
        let pending = next_second.load(Ordering::Relaxed);
        let now = if pending == NOT_YET_PADDED {
            wall_now
        } else {
            wall_now.max(pending)
        };

        let batch = minter.mint_batch_for_second(now);
        let mut rejected = false;

        for id in batch {
            if !ring.put(id) {
                rejected = true;
                break;
            }
        }

        if rejected {
            break;
        }
        next_second.store(now + 1, Ordering::Relaxed);
    }
}

const WORKER_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Generates batches of pre-minted ids and feeds them into the ring buffer,
/// on demand (coalesced) and, optionally, on a fixed schedule.
pub struct PaddingExecutor {
    minter: Arc<DirectMinter>,
    ring: Arc<RingBuffer>,
    running: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    next_second: Arc<AtomicI64>,
    job_tx: Sender<()>,
    workers: Vec<JoinHandle<()>>,
    scheduler: Option<JoinHandle<()>>,
}

impl PaddingExecutor {
    /// Create an executor over `minter`/`ring`. If `schedule_interval` is
    /// set, a background scheduler additionally triggers a padding cycle
    /// every `schedule_interval` seconds.
    pub fn new(
        minter: Arc<DirectMinter>,
        ring: Arc<RingBuffer>,
        schedule_interval: Option<u64>,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));
        let next_second = Arc::new(AtomicI64::new(NOT_YET_PADDED));
        let (job_tx, job_rx) = channel::bounded::<()>(PADDING_QUEUE_DEPTH);

        let mut workers = Vec::with_capacity(PADDING_WORKER_POOL_SIZE);
        for worker_index in 0..PADDING_WORKER_POOL_SIZE {
            let minter = minter.clone();
            let ring = ring.clone();
            let running = running.clone();
            let shutdown = shutdown.clone();
            let next_second = next_second.clone();
            let job_rx = job_rx.clone();

            workers.push(
                thread::Builder::new()
                    .name(format!("driftid-padding-{worker_index}"))
                    .spawn(move || loop {
                        match job_rx.recv_timeout(WORKER_POLL_INTERVAL) {
                            Ok(()) => {
                                if running.compare_exchange(
                                    false,
                                    true,
                                    Ordering::AcqRel,
                                    Ordering::Acquire,
                                ).is_ok()
                                {
                                    padding_buffer(&minter, &ring, &next_second);
                                    running.store(false, Ordering::Release);
                                }
                            }
                            Err(RecvTimeoutError::Timeout) => {
                                if shutdown.load(Ordering::Acquire) {
                                    break;
                                }
                            }
                            Err(RecvTimeoutError::Disconnected) => break,
                        }
                    })
                    .expect("failed to spawn padding worker thread"),
            );
        }

        let scheduler = schedule_interval.map(|interval_seconds| {
            let job_tx = job_tx.clone();
            let shutdown = shutdown.clone();
            thread::Builder::new()
                .name("driftid-padding-scheduler".to_string())
                .spawn(move || {
                    let interval = Duration::from_secs(interval_seconds.max(1));
                    let mut elapsed = Duration::ZERO;
                    loop {
                        thread::sleep(WORKER_POLL_INTERVAL);
                        if shutdown.load(Ordering::Acquire) {
                            break;
                        }
                        elapsed += WORKER_POLL_INTERVAL;
                        if elapsed >= interval {
                            elapsed = Duration::ZERO;
                            let _ = job_tx.try_send(());
                        }
                    }
                })
                .expect("failed to spawn padding scheduler thread")
        });

        Self {
            minter,
            ring,
            running,
            shutdown,
            next_second,
            job_tx,
            workers,
            scheduler,
        }
    }

    /// Run one padding cycle synchronously on the calling thread. Used once
    /// at startup to warm the ring before the executor is handed off to the
    /// background worker pool.
    pub fn padding_buffer_sync(&self) {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            padding_buffer(&self.minter, &self.ring, &self.next_second);
            self.running.store(false, Ordering::Release);
        }
    }

    /// Enqueue one padding cycle on the background worker pool and return
    /// immediately. Duplicate requests while a cycle is already in flight
    /// are coalesced: the `running` flag makes the extra cycle a no-op.
    pub fn async_padding(&self) {
        // try_send rather than send: a full queue means refills are already
        // queued up, so dropping this request is itself a form of coalescing.
        let _ = self.job_tx.try_send(());
        debug!("padding cycle enqueued");
    }

    /// Stop accepting new async cycles, stop the scheduler, and join the
    /// worker pool. Workers poll the shutdown flag at most
    /// `WORKER_POLL_INTERVAL` apart, so this returns promptly.
    pub fn shutdown(mut self) {
        self.shutdown.store(true, Ordering::Release);

        if let Some(scheduler) = self.scheduler.take() {
            let _ = scheduler.join();
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        info!("padding executor shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BitLayout;
    use crate::worker_id::WorkerIdSource;
    use std::sync::atomic::AtomicI64;
    use std::time::Duration;

    struct FixedWorkerIdSource(AtomicI64);
    impl WorkerIdSource for FixedWorkerIdSource {
        fn next_worker_id(&self) -> i64 {
            self.0.load(Ordering::Relaxed)
        }
    }

    fn test_minter() -> Arc<DirectMinter> {
        let layout = BitLayout::new(33, 20, 10, current_seconds() - 1000).unwrap();
        let source = Arc::new(FixedWorkerIdSource(AtomicI64::new(7)));
        Arc::new(DirectMinter::new(layout, source, true, 1))
    }

    #[test]
    fn sync_padding_fills_ring_until_full() {
        let minter = test_minter();
        let ring = Arc::new(RingBuffer::new(1024));
        let executor = PaddingExecutor::new(minter, ring.clone(), None);

        executor.padding_buffer_sync();
        assert_eq!(ring.len(), 1024);

        executor.shutdown();
    }

    #[test]
    fn async_padding_eventually_fills_ring() {
        let minter = test_minter();
        let ring = Arc::new(RingBuffer::new(1024));
        let executor = PaddingExecutor::new(minter, ring.clone(), None);

        executor.async_padding();

        let mut waited = Duration::ZERO;
        while ring.len() < 1024 && waited < Duration::from_secs(2) {
            thread::sleep(Duration::from_millis(20));
            waited += Duration::from_millis(20);
        }
        assert_eq!(ring.len(), 1024);

        executor.shutdown();
    }

    #[test]
    fn shutdown_joins_all_threads() {
        let minter = test_minter();
        let ring = Arc::new(RingBuffer::new(1024));
        let executor = PaddingExecutor::new(minter, ring, Some(1));
        thread::sleep(Duration::from_millis(50));
        executor.shutdown();
    }
}

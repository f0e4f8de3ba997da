//! Multi-threaded and end-to-end boundary scenarios that don't fit as
//! inline unit tests: concurrent consumption against the public facade.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;

use driftid::{CachedIdGenerator, Config, IdGenerator, WorkerIdSource};

struct FixedWorkerIdSource(AtomicI64);
impl WorkerIdSource for FixedWorkerIdSource {
    fn next_worker_id(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Invariant 4, exercised through the public facade: any number of
/// concurrent `get_unique_id()` callers against a generator partition the
/// ids they observe, with no duplicates and no gaps beyond what the ring
/// buffer itself produced.
#[test]
fn concurrent_callers_receive_disjoint_ids() {
    let config = Config::default().with_ring_sizing(4, 50);
    let source = Arc::new(FixedWorkerIdSource(AtomicI64::new(77)));
    let generator = Arc::new(CachedIdGenerator::new(&config, source).unwrap());

    const PER_THREAD: usize = 500;
    const THREADS: usize = 4;

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let generator = generator.clone();
            thread::spawn(move || {
                let mut ids = Vec::with_capacity(PER_THREAD);
                while ids.len() < PER_THREAD {
                    if let Ok(id) = generator.get_unique_id() {
                        ids.push(id);
                    }
                }
                ids
            })
        })
        .collect();

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.join().unwrap());
    }

    let unique: HashSet<i64> = all.iter().copied().collect();
    assert_eq!(unique.len(), all.len(), "duplicate ids observed across threads");
    assert_eq!(all.len(), PER_THREAD * THREADS);

    for id in &all {
        let parsed = generator.parse_unique_id(*id).unwrap();
        assert_eq!(parsed.worker_id, 77);
    }

    Arc::try_unwrap(generator)
        .unwrap_or_else(|_| panic!("generator still shared"))
        .shutdown();
}

/// End-to-end S6 analogue at the facade level: a small ring drains in FIFO
/// order across a single consumer before the background executor can race
/// ahead, and every served id parses back to the worker id it was minted
/// under.
#[test]
fn cached_generator_serves_parseable_ids_in_order_from_a_single_consumer() {
    let config = Config::default().with_ring_sizing(1, 50);
    let source = Arc::new(FixedWorkerIdSource(AtomicI64::new(3)));
    let generator = CachedIdGenerator::new(&config, source).unwrap();

    let mut previous_sequence: Option<i64> = None;
    for _ in 0..generator.layout().max_sequence() {
        let id = generator.get_unique_id().unwrap();
        let parsed = generator.parse_unique_id(id).unwrap();
        if let Some(previous) = previous_sequence {
            assert_eq!(parsed.sequence, previous + 1);
        }
        previous_sequence = Some(parsed.sequence);
    }

    generator.shutdown();
}

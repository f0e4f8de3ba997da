//! Thin facade over the minter alone, for callers that don't want a ring
//! buffer or background padding threads.

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::layout::{BitLayout, ParsedId};
use crate::minter::DirectMinter;
use crate::worker_id::WorkerIdSource;
use crate::IdGenerator;

/// Mints ids synchronously against a single [`DirectMinter`], with no
/// pre-minting and no background threads. Lower throughput ceiling than
/// [`crate::cached::CachedIdGenerator`] (bounded by `maxSequence + 1` ids
/// per second), but zero staleness and zero extra threads.
pub struct DirectIdGenerator {
    layout: BitLayout,
    minter: DirectMinter,
}

impl DirectIdGenerator {
    /// Build a direct generator from `config`, resolving the worker id from
    /// `worker_id_source`.
    pub fn new(config: &Config, worker_id_source: Arc<dyn WorkerIdSource>) -> Result<Self> {
        let epoch_seconds = config.validate()?;
        let layout = BitLayout::new(config.time_bits, config.worker_bits, config.seq_bits, epoch_seconds)?;
        let minter = DirectMinter::new(
            layout,
            worker_id_source,
            config.backward_enabled,
            config.max_backward_seconds,
        );
        Ok(Self { layout, minter })
    }

    /// The bit layout this generator allocates identifiers under.
    pub fn layout(&self) -> &BitLayout {
        &self.layout
    }
}

impl IdGenerator for DirectIdGenerator {
    fn get_unique_id(&self) -> Result<i64> {
        self.minter.next_unique_id()
    }

    fn parse_unique_id(&self, id: i64) -> Option<ParsedId> {
        self.layout.parse(id)
    }
}

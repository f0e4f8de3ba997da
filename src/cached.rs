//! Public, cacheable id-fetching facade: composes the minter, the ring
//! buffer, and the padding executor behind a lock-free common path.

use std::sync::Arc;

use tracing::trace;

use crate::config::Config;
use crate::error::{DriftIdError, Result};
use crate::layout::{BitLayout, ParsedId};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::minter::DirectMinter;
use crate::padding::PaddingExecutor;
use crate::ring::{RejectedPutHandler, RejectedTakeHandler, RingBuffer};
use crate::worker_id::WorkerIdSource;
use crate::IdGenerator;

struct MetricsPutHandler {
    metrics: Arc<Metrics>,
}

impl RejectedPutHandler for MetricsPutHandler {
    fn on_rejected_put(&self, id: i64) {
        self.metrics.record_put_rejection();
        trace!(id, "ring buffer full; dropping pre-minted id");
    }
}

struct MetricsTakeHandler {
    metrics: Arc<Metrics>,
}

impl RejectedTakeHandler for MetricsTakeHandler {
    fn on_rejected_take(&self) {
        self.metrics.record_cache_miss();
        trace!("ring buffer exhausted");
    }
}

/// Public id-fetching surface. Construction resolves the worker id, builds
/// the bit layout, sizes and allocates the ring buffer, synchronously warms
/// it with one padding cycle, then starts the background padding executor.
pub struct CachedIdGenerator {
    layout: BitLayout,
    minter: Arc<DirectMinter>,
    ring: Arc<RingBuffer>,
    padding: Option<PaddingExecutor>,
    padding_threshold: i64,
    metrics: Arc<Metrics>,
}

impl CachedIdGenerator {
    /// Build a cached generator from `config`, resolving the worker id from
    /// `worker_id_source`.
    pub fn new(config: &Config, worker_id_source: Arc<dyn WorkerIdSource>) -> Result<Self> {
        let epoch_seconds = config.validate()?;
        let layout = BitLayout::new(config.time_bits, config.worker_bits, config.seq_bits, epoch_seconds)?;

        let minter = Arc::new(DirectMinter::new(
            layout,
            worker_id_source,
            config.backward_enabled,
            config.max_backward_seconds,
        ));

        let buffer_size = ((layout.max_sequence() + 1) << config.boost_power) as usize;
        let padding_threshold = (buffer_size as i64 * config.padding_factor as i64) / 100;

        let metrics = Arc::new(Metrics::new());
        let ring = Arc::new(RingBuffer::with_handlers(
            buffer_size,
            Box::new(MetricsPutHandler { metrics: metrics.clone() }),
            Box::new(MetricsTakeHandler { metrics: metrics.clone() }),
        ));

        let padding = PaddingExecutor::new(minter.clone(), ring.clone(), config.schedule_interval);
        padding.padding_buffer_sync();
        metrics.record_padding_cycle();

        Ok(Self {
            layout,
            minter,
            ring,
            padding: Some(padding),
            padding_threshold,
            metrics,
        })
    }

    /// The bit layout this generator allocates identifiers under.
    pub fn layout(&self) -> &BitLayout {
        &self.layout
    }

    /// Number of ids currently sitting in the ring buffer.
    pub fn cached_len(&self) -> i64 {
        self.ring.len()
    }

    /// Read the running metrics counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Stop accepting new padding cycles and join the executor's threads.
    pub fn shutdown(mut self) {
        if let Some(padding) = self.padding.take() {
            padding.shutdown();
        }
    }
}

impl IdGenerator for CachedIdGenerator {
    fn get_unique_id(&self) -> Result<i64> {
        match self.ring.take(self.padding_threshold) {
            Some((id, needs_refill)) => {
                self.metrics.record_cache_hit();
                self.metrics.record_mint();
                if needs_refill {
                    if let Some(padding) = &self.padding {
                        padding.async_padding();
                    }
                }
                Ok(id)
            }
            None => Err(DriftIdError::Exhausted),
        }
    }

    fn parse_unique_id(&self, id: i64) -> Option<ParsedId> {
        self.layout.parse(id)
    }
}

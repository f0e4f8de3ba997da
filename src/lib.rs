//! DriftId: monotonically increasing, globally-unique 64-bit identifiers.
//!
//! Each identifier packs a `(delta-seconds, worker-id, sequence)` triple
//! into the low 63 bits of a signed `i64`, under a configurable bit layout.
//! Two generator variants share the same surface via [`IdGenerator`]:
//!
//! - [`direct::DirectIdGenerator`] mints synchronously against a single
//!   critical section; simplest, lowest throughput ceiling.
//! - [`cached::CachedIdGenerator`] pre-mints batches into a lock-free
//!   single-producer/multi-consumer ring buffer, refilled by a background
//!   padding executor; higher throughput, at the cost of background threads.

pub mod cached;
pub mod config;
pub mod constants;
pub mod direct;
pub mod error;
pub mod layout;
pub mod metrics;
pub mod minter;
pub mod padding;
pub mod ring;
pub mod worker_id;

pub use cached::CachedIdGenerator;
pub use config::Config;
pub use direct::DirectIdGenerator;
pub use error::{DriftIdError, Result};
pub use layout::{BitLayout, ParsedId};
pub use worker_id::{LocalAddressWorkerIdSource, WorkerIdSource};

/// Crate version, exposed for embedders that want to tag minted ids'
/// provenance in logs without depending on `env!("CARGO_PKG_VERSION")`
/// directly.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common surface shared by [`DirectIdGenerator`] and [`CachedIdGenerator`].
pub trait IdGenerator {
    /// Mint the next unique identifier.
    fn get_unique_id(&self) -> Result<i64>;

    /// Recover `(worker_id, sequence, timestamp)` from a previously minted
    /// identifier, or `None` if `id` is not a valid positive identifier.
    fn parse_unique_id(&self, id: i64) -> Option<ParsedId>;
}

//! Worker-id acquisition
//!
//! Provides a stable worker-id for this process instance. The default
//! implementation derives it from the local IPv4 address and bound service
//! port; callers that need cross-process coordination (ZooKeeper, etcd,
//! a central allocator) should supply their own `WorkerIdSource`.

use std::net::UdpSocket;

use tracing::{debug, warn};

/// Supplies a worker-id at startup, and again if the [`DirectMinter`](crate::minter::DirectMinter)
/// needs to reassign one during clock-regression recovery.
pub trait WorkerIdSource: Send + Sync {
    /// Return a non-negative worker-id. Implementations are not required to
    /// mask the result to `W` bits; callers truncate via [`truncate_to_bits`].
    fn next_worker_id(&self) -> i64;
}

/// Truncate `value` to fit in `bits` bits via `(x << (64 - bits)) >>> (64 - bits)`.
pub fn truncate_to_bits(value: i64, bits: u32) -> i64 {
    if bits >= 64 {
        return value;
    }
    let shift = 64 - bits;
    (((value as u64) << shift) >> shift) as i64
}

/// Derives a worker-id from this process's local IPv4 address and bound port.
///
/// The address is resolved by opening a UDP socket and "connecting" it to a
/// well-known external address without sending any traffic; this is the
/// standard trick for discovering which local interface the kernel would
/// route through, without depending on a DNS lookup or real network I/O.
pub struct LocalAddressWorkerIdSource {
    bind_port: u16,
}

impl LocalAddressWorkerIdSource {
    /// Create a source that reports the local address bound to `bind_port`.
    pub fn new(bind_port: u16) -> Self {
        Self { bind_port }
    }

    fn resolve(&self) -> Option<i64> {
        let socket = UdpSocket::bind(("0.0.0.0", 0)).ok()?;
        socket.connect(("8.8.8.8", 80)).ok()?;
        let local_addr = socket.local_addr().ok()?;
        let ip = match local_addr.ip() {
            std::net::IpAddr::V4(v4) => v4,
            std::net::IpAddr::V6(_) => return None,
        };
        let ip_bits = u32::from(ip) as i64;
        let port_bits = self.bind_port as i64;
        Some((ip_bits << 16) | port_bits)
    }
}

impl WorkerIdSource for LocalAddressWorkerIdSource {
    fn next_worker_id(&self) -> i64 {
        match self.resolve() {
            Some(value) => {
                debug!(worker_id_raw = value, "resolved worker id from local address");
                value
            }
            None => {
                warn!("no local IPv4 address/port available; defaulting worker id to 0");
                0
            }
        }
    }
}

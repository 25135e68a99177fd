//! Read-only counter set exposed by the core (spec §6.4).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Counters {
    connections_accepted: AtomicU64,
    connections_active: AtomicU64,
    requests_total: AtomicU64,
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
    h2_streams_active: AtomicU64,
}

/// Cheap-to-clone handle shared across accept loop and connection tasks.
#[derive(Clone, Default)]
pub struct Metrics(Arc<Counters>);

#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    pub connections_accepted: u64,
    pub connections_active: u64,
    pub requests_total: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub h2_streams_active: u64,
}

impl Metrics {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            connections_accepted: self.0.connections_accepted.load(Ordering::Relaxed),
            connections_active: self.0.connections_active.load(Ordering::Relaxed),
            requests_total: self.0.requests_total.load(Ordering::Relaxed),
            bytes_in: self.0.bytes_in.load(Ordering::Relaxed),
            bytes_out: self.0.bytes_out.load(Ordering::Relaxed),
            h2_streams_active: self.0.h2_streams_active.load(Ordering::Relaxed),
        }
    }

    pub fn connection_accepted(&self) {
        self.0.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.0.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.0.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn request_completed(&self) {
        self.0.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bytes_in(&self, n: u64) {
        self.0.bytes_in.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_bytes_out(&self, n: u64) {
        self.0.bytes_out.fetch_add(n, Ordering::Relaxed);
    }

    pub fn stream_opened(&self) {
        self.0.h2_streams_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stream_closed(&self) {
        self.0.h2_streams_active.fetch_sub(1, Ordering::Relaxed);
    }
}

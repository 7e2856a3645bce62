use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Transfer counters for the lifetime of one client process
#[derive(Clone)]
pub struct Metrics {
    pub jobs_started: Arc<AtomicUsize>,
    pub jobs_completed: Arc<AtomicUsize>,
    pub jobs_failed: Arc<AtomicUsize>,
    pub items_completed: Arc<AtomicU64>,
    pub bytes_transferred: Arc<AtomicU64>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            jobs_started: Arc::new(AtomicUsize::new(0)),
            jobs_completed: Arc::new(AtomicUsize::new(0)),
            jobs_failed: Arc::new(AtomicUsize::new(0)),
            items_completed: Arc::new(AtomicU64::new(0)),
            bytes_transferred: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_jobs_started(&self) {
        self.jobs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_jobs_completed(&self) {
        self.jobs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_jobs_failed(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_items_completed(&self) {
        self.items_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bytes(&self, bytes: u64) {
        self.bytes_transferred.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_started: self.jobs_started.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            items_completed: self.items_completed.load(Ordering::Relaxed),
            bytes_transferred: self.bytes_transferred.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub jobs_started: usize,
    pub jobs_completed: usize,
    pub jobs_failed: usize,
    pub items_completed: u64,
    pub bytes_transferred: u64,
    pub uptime_seconds: u64,
}

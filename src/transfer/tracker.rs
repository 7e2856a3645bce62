use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::types::Outcome;

/// Point-in-time view of a running job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSample {
    pub cumulative_bytes: u64,
    pub elapsed_seconds: f64,
    /// Average bytes per second since the job started.
    pub throughput: f64,
    /// Always within `0.0..=100.0`.
    pub percent: f64,
    /// `None` means "unknown", rendered as "calculating".
    pub eta_seconds: Option<f64>,
    pub indeterminate: bool,
    pub completed_items: usize,
    pub item_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalSample {
    pub outcome: Outcome,
    pub detail: String,
    pub sample: ProgressSample,
}

/// Folds byte deltas of sequential transfers into a monotonic progress signal.
///
/// A `total_bytes` of zero puts the tracker in indeterminate mode: percent then
/// follows the ratio of completed items and no ETA is ever produced.
#[derive(Debug, Clone)]
pub struct TransferTracker {
    total_bytes: u64,
    item_count: usize,
    cumulative_bytes: u64,
    completed_items: usize,
    started: Instant,
}

impl TransferTracker {
    pub fn start(total_bytes: u64, item_count: usize) -> Self {
        Self {
            total_bytes,
            item_count,
            cumulative_bytes: 0,
            completed_items: 0,
            started: Instant::now(),
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn cumulative_bytes(&self) -> u64 {
        self.cumulative_bytes
    }

    pub fn is_indeterminate(&self) -> bool {
        self.total_bytes == 0
    }

    /// Adds `delta` bytes and returns the updated sample. Negative deltas count as zero.
    pub fn record_progress(&mut self, delta: i64) -> ProgressSample {
        let delta = if delta < 0 {
            tracing::debug!(delta, "progress counter regressed, clamping delta to 0");
            0
        } else {
            delta as u64
        };
        self.cumulative_bytes = self.cumulative_bytes.saturating_add(delta);
        self.sample()
    }

    /// Grows the expected total by a size learned mid-job (e.g. a `Content-Length`).
    /// A tracker that was indeterminate switches to byte-based percent from here on.
    pub fn add_total(&mut self, bytes: u64) {
        self.total_bytes = self.total_bytes.saturating_add(bytes);
    }

    pub fn mark_item_completed(&mut self) {
        self.completed_items = (self.completed_items + 1).min(self.item_count);
    }

    /// Terminal sample. Success pins percent to 100.
    pub fn finish(&self, outcome: Outcome, detail: impl Into<String>) -> FinalSample {
        let mut sample = self.sample();
        if outcome == Outcome::Success {
            sample.percent = 100.0;
            sample.eta_seconds = None;
        }
        sample.indeterminate = false;
        FinalSample { outcome, detail: detail.into(), sample }
    }

    /// Current state without recording anything.
    pub fn sample(&self) -> ProgressSample {
        let elapsed_seconds = self.started.elapsed().as_secs_f64();
        let throughput = if elapsed_seconds > 0.0 {
            self.cumulative_bytes as f64 / elapsed_seconds
        } else {
            0.0
        };

        ProgressSample {
            cumulative_bytes: self.cumulative_bytes,
            elapsed_seconds,
            throughput,
            percent: self.percent(),
            eta_seconds: self.eta_seconds(throughput),
            indeterminate: self.is_indeterminate(),
            completed_items: self.completed_items,
            item_count: self.item_count,
        }
    }

    fn percent(&self) -> f64 {
        let raw = if self.total_bytes > 0 {
            self.cumulative_bytes as f64 / self.total_bytes as f64 * 100.0
        } else if self.item_count > 0 {
            self.completed_items as f64 / self.item_count as f64 * 100.0
        } else {
            0.0
        };
        if raw.is_finite() {
            raw.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    fn eta_seconds(&self, throughput: f64) -> Option<f64> {
        if self.total_bytes == 0 || throughput <= 0.0 {
            return None;
        }
        let remaining = self.total_bytes.checked_sub(self.cumulative_bytes)?;
        if remaining == 0 {
            return None;
        }
        let eta = remaining as f64 / throughput;
        eta.is_finite().then_some(eta)
    }
}

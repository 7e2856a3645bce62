use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::TransferError;
use crate::metrics::Metrics;
use crate::transfer::tracker::TransferTracker;
use crate::types::{Direction, Outcome, TransferEvent};

pub type EventSender = mpsc::UnboundedSender<TransferEvent>;

const FAILURE_DETAIL: &str = "Check your connection and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    InFlight,
    Completed,
    Failed,
}

/// One file of a job. `P` carries what the transport needs to move it.
#[derive(Debug, Clone)]
pub struct TransferItem<P> {
    pub name: String,
    /// Declared size; `None` when unknown (contributes nothing to the job total
    /// until the transport declares it mid-flight).
    pub size_bytes: Option<u64>,
    pub payload: P,
    bytes_transferred: u64,
    state: ItemState,
}

impl<P> TransferItem<P> {
    pub fn new(name: impl Into<String>, size_bytes: Option<u64>, payload: P) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            payload,
            bytes_transferred: 0,
            state: ItemState::Pending,
        }
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }
}

#[derive(Debug)]
pub struct TransferJob<P> {
    pub id: Uuid,
    pub direction: Direction,
    items: Vec<TransferItem<P>>,
    total_bytes: u64,
    started_at: Option<DateTime<Utc>>,
}

impl<P> TransferJob<P> {
    pub fn new(direction: Direction, items: Vec<TransferItem<P>>) -> Self {
        // Unknown sizes add 0 and skew percent for mixed batches; kept as is.
        let total_bytes = items.iter().map(|i| i.size_bytes.unwrap_or(0)).sum();
        Self {
            id: Uuid::new_v4(),
            direction,
            items,
            total_bytes,
            started_at: None,
        }
    }

    pub fn items(&self) -> &[TransferItem<P>] {
        &self.items
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub outcome: Outcome,
    pub completed_count: usize,
    pub error: Option<String>,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

/// Handed to a transport for the duration of one item. Every call feeds the
/// job's tracker and emits a progress event.
pub struct ProgressReporter<'a> {
    tracker: &'a mut TransferTracker,
    events: &'a EventSender,
    item_bytes: u64,
    last_loaded: u64,
    size_known: bool,
    declared_size: Option<u64>,
}

impl<'a> ProgressReporter<'a> {
    fn new(tracker: &'a mut TransferTracker, events: &'a EventSender, size_known: bool) -> Self {
        Self { tracker, events, item_bytes: 0, last_loaded: 0, size_known, declared_size: None }
    }

    /// Announces the size of an item that started without one, e.g. from the
    /// response headers. Only the first call per item counts, and items with a
    /// size known up front ignore it.
    pub fn declare_size(&mut self, bytes: u64) {
        if self.size_known || self.declared_size.is_some() {
            return;
        }
        self.declared_size = Some(bytes);
        self.tracker.add_total(bytes);
        debug!(bytes, total = self.tracker.total_bytes(), "item size declared");
    }

    /// Size announced through [`Self::declare_size`], if any.
    pub fn declared_size(&self) -> Option<u64> {
        self.declared_size
    }

    /// Reports `delta` new bytes for the current item.
    pub fn delta(&mut self, delta: i64) {
        let before = self.tracker.cumulative_bytes();
        let sample = self.tracker.record_progress(delta);
        self.item_bytes += sample.cumulative_bytes - before;
        let _ = self.events.send(TransferEvent::Progress(sample));
    }

    /// Reports an absolute loaded counter; a counter that went backwards yields a zero delta.
    pub fn loaded(&mut self, loaded: u64) {
        let delta = if loaded >= self.last_loaded {
            i64::try_from(loaded - self.last_loaded).unwrap_or(i64::MAX)
        } else {
            -i64::try_from(self.last_loaded - loaded).unwrap_or(i64::MAX)
        };
        self.last_loaded = loaded;
        self.delta(delta);
    }

    /// Bytes attributed to the current item so far.
    pub fn item_bytes(&self) -> u64 {
        self.item_bytes
    }
}

/// Moves a single item. Implementations call the reporter as data flows and
/// resolve once the item is fully transferred.
#[async_trait]
pub trait Transport<P: Send + Sync>: Send + Sync {
    async fn transfer(
        &self,
        item: &TransferItem<P>,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<(), TransferError>;
}

/// Executes the items of a job strictly one after another and stops at the first failure.
pub struct SequentialRunner<T> {
    transport: T,
    events: EventSender,
    metrics: Metrics,
}

impl<T> SequentialRunner<T> {
    pub fn new(transport: T, events: EventSender, metrics: Metrics) -> Self {
        Self { transport, events, metrics }
    }

    pub async fn run<P>(&self, job: &mut TransferJob<P>) -> BatchResult
    where
        T: Transport<P>,
        P: Send + Sync,
    {
        let item_count = job.items.len();
        let mut tracker = TransferTracker::start(job.total_bytes, item_count);
        job.started_at.get_or_insert_with(Utc::now);
        self.metrics.inc_jobs_started();

        info!(
            job_id = %job.id,
            direction = ?job.direction,
            items = item_count,
            total_bytes = job.total_bytes,
            "transfer job started"
        );
        let _ = self.events.send(TransferEvent::Started {
            job_id: job.id,
            direction: job.direction,
            item_count,
            total_bytes: job.total_bytes,
            indeterminate: tracker.is_indeterminate(),
        });

        let mut completed_count = 0usize;
        for (index, item) in job.items.iter_mut().enumerate() {
            item.state = ItemState::InFlight;
            item.bytes_transferred = 0;
            debug!(job_id = %job.id, index, name = %item.name, "item in flight");

            let mut reporter = ProgressReporter::new(&mut tracker, &self.events, item.size_bytes.is_some());
            let result = self.transport.transfer(&*item, &mut reporter).await;
            item.bytes_transferred = reporter.item_bytes();
            if let Some(declared) = reporter.declared_size() {
                item.size_bytes = Some(declared);
                job.total_bytes = job.total_bytes.saturating_add(declared);
            }

            match result {
                Ok(()) => {
                    item.state = ItemState::Completed;
                    completed_count += 1;
                    tracker.mark_item_completed();
                    self.metrics.inc_items_completed();
                    let _ = self.events.send(TransferEvent::ItemCompleted { index, name: item.name.clone() });
                    if item.size_bytes.is_none() {
                        // size never became known; push the item-count ratio forward
                        let sample = tracker.record_progress(0);
                        let _ = self.events.send(TransferEvent::Progress(sample));
                    }
                }
                Err(err) => {
                    item.state = ItemState::Failed;
                    warn!(job_id = %job.id, index, name = %item.name, error = %err, "transfer failed, aborting batch");
                    self.metrics.add_bytes(tracker.cumulative_bytes());
                    self.metrics.inc_jobs_failed();
                    let final_sample = tracker.finish(Outcome::Failure, FAILURE_DETAIL);
                    let _ = self.events.send(TransferEvent::Finished(final_sample));
                    return BatchResult {
                        outcome: Outcome::Failure,
                        completed_count,
                        error: Some(err.to_string()),
                    };
                }
            }
        }

        self.metrics.add_bytes(tracker.cumulative_bytes());
        self.metrics.inc_jobs_completed();
        info!(job_id = %job.id, items = completed_count, bytes = tracker.cumulative_bytes(), "transfer job finished");
        let final_sample = tracker.finish(Outcome::Success, success_detail(job.direction, completed_count));
        let _ = self.events.send(TransferEvent::Finished(final_sample));

        BatchResult { outcome: Outcome::Success, completed_count, error: None }
    }
}

fn success_detail(direction: Direction, count: usize) -> String {
    let noun = if count == 1 { "file" } else { "files" };
    match direction {
        Direction::Upload => format!("{} {} uploaded.", count, noun),
        Direction::Download => format!("{} {} downloaded.", count, noun),
    }
}

//! Sequential file transfers with progress estimation.
//!
//! A job is a list of items that a [`runner::SequentialRunner`] moves one at a
//! time through a [`runner::Transport`]. Byte deltas flow into a
//! [`tracker::TransferTracker`], and the resulting samples are published as
//! [`crate::types::TransferEvent`]s.

pub mod http;
pub mod runner;
pub mod tracker;

pub use http::{collect_upload_items, DownloadSpec, HttpDownload, HttpUpload, UploadSpec};
pub use runner::{BatchResult, EventSender, ItemState, ProgressReporter, SequentialRunner, TransferItem, TransferJob, Transport};
pub use tracker::{FinalSample, ProgressSample, TransferTracker};

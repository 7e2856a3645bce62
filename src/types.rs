use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::transfer::tracker::{FinalSample, ProgressSample};

// DTOs of the file manager REST API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub id: i64,
    pub filename: String,
    pub is_folder: bool,
    pub created_at: DateTime<Utc>,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolderRequest {
    pub folder_name: String,
    pub parent_id: Option<i64>,
}

/// Error payload of the API: `{"error": "..."}`. Every field is optional because
/// failing endpoints may answer with an empty or non-JSON body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Upload,
    Download,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

/// Everything a batch reports to the presentation side, in emission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferEvent {
    Started {
        job_id: Uuid,
        direction: Direction,
        item_count: usize,
        total_bytes: u64,
        indeterminate: bool,
    },
    Progress(ProgressSample),
    ItemCompleted {
        index: usize,
        name: String,
    },
    Finished(FinalSample),
}

//! Background job records and submission payloads (backend-owned shapes).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use meritpath_core::{JobId, UserId};

/// Job type as routed by the backend queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobType {
    /// Citation discovery for one user.
    FindCiters,
    /// Any other job type the backend runs (e.g. `print_numbers`).
    Other(String),
}

impl JobType {
    pub fn as_str(&self) -> &str {
        match self {
            JobType::FindCiters => "find_citers",
            JobType::Other(s) => s,
        }
    }
}

impl From<String> for JobType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "find_citers" => JobType::FindCiters,
            _ => JobType::Other(value),
        }
    }
}

impl From<JobType> for String {
    fn from(value: JobType) -> Self {
        match value {
            JobType::FindCiters => "find_citers".to_string(),
            JobType::Other(s) => s,
        }
    }
}

impl core::fmt::Display for JobType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status column of a job record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl RecordStatus {
    /// `success` and `failed` are final; the worker never moves a record out of them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordStatus::Success | RecordStatus::Failed)
    }
}

/// A row of the backend `jobs` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub user_id: UserId,
    pub job_type: JobType,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
}

/// Parameters of a `find_citers` job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParams {
    pub user_id: UserId,
}

/// Body of `POST /api/sqs/jobs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub job_type: JobType,
    pub job_params: JobParams,
}

impl JobRequest {
    pub fn find_citers(user_id: UserId) -> Self {
        Self {
            job_type: JobType::FindCiters,
            job_params: JobParams { user_id },
        }
    }
}

/// Response of `POST /api/sqs/jobs`.
///
/// Only "the call did not fail" matters to the client; the rest is kept for
/// logging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSubmission {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
}

impl JobSubmission {
    /// The queue controller answers 200 with `status: "failed"` when enqueueing fails.
    pub fn is_rejected(&self) -> bool {
        self.status.as_deref() == Some("failed")
    }
}

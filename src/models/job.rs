use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stage of an analysis job as reported by the fact-check service.
///
/// The stage vocabulary belongs to the server. Stages this client does not
/// know are kept verbatim in [`JobStatus::Other`] and count as in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Queued,
    Processing,
    Extracting,
    Checking,
    Analyzing,
    Completed,
    Failed,
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Extracting => "extracting",
            JobStatus::Checking => "checking",
            JobStatus::Analyzing => "analyzing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Other(stage) => stage,
        }
    }

    /// `completed` and `failed` end the poll loop; every other stage keeps it going.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "queued" | "pending" => JobStatus::Queued,
            "processing" => JobStatus::Processing,
            "extracting" => JobStatus::Extracting,
            "checking" => JobStatus::Checking,
            "analyzing" => JobStatus::Analyzing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Other(value),
        }
    }
}

impl From<&str> for JobStatus {
    fn from(value: &str) -> Self {
        JobStatus::from(value.to_string())
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analysis request tracked by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub error: Option<String>,
    /// Human-readable stage description, when the service sends one.
    pub message: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    /// A freshly accepted job, before the first status tick.
    pub fn queued(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Queued,
            progress: 0,
            error: None,
            message: None,
            submitted_at: Utc::now(),
        }
    }

    pub(crate) fn record_tick(
        &mut self,
        status: JobStatus,
        progress: Option<f64>,
        message: Option<String>,
    ) {
        self.status = status;
        if let Some(progress) = progress {
            self.progress = clamp_percent(progress);
        }
        if message.is_some() {
            self.message = message;
        }
    }
}

/// Clamp a server-supplied percentage into 0–100. NaN becomes 0.
pub(crate) fn clamp_percent(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 100.0).round() as u8
}

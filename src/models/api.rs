use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::models::job::JobStatus;
use crate::models::submission::SourceKind;

/// JSON body for `POST /analyze` (typed text and video references).
#[derive(Debug, Serialize)]
pub struct AnalyzeRequest<'a> {
    pub content: &'a str,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<&'a str>,
}

/// Response to a submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub success: bool,
    pub job_id: Option<String>,
    pub error: Option<String>,
}

/// Response for `GET /status/{job_id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub success: bool,
    pub status: Option<JobStatus>,
    pub progress: Option<f64>,
    pub error: Option<String>,
    pub message: Option<String>,
}

/// Response for `GET /results/{job_id}`. `data` is the raw result payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultsResponse {
    #[serde(default)]
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Error body the service sends alongside non-success responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    pub error: Option<String>,
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error.or(self.message).filter(|m| !m.trim().is_empty())
    }
}

/// Downloadable report formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Pdf,
}

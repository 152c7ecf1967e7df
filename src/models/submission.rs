use std::path::Path;

use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Shortest typed transcript the service will analyze, in characters.
pub const MIN_TEXT_CHARS: usize = 50;

/// Longest typed transcript accepted, in characters.
pub const MAX_TEXT_CHARS: usize = 100_000;

/// Upload size limit for transcript files (10 MB).
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// Errors raised while collecting a submission.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to read transcript file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid submission: {0}")]
    Invalid(#[from] garde::Report),
}

/// Where a transcript comes from. Sent to the service as the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
    Text,
    File,
    Video,
}

/// Transcript content in one of the three accepted shapes.
#[derive(Debug, Clone, PartialEq, Validate)]
pub enum Transcript {
    Text(#[garde(length(chars, min = MIN_TEXT_CHARS, max = MAX_TEXT_CHARS))] String),
    File {
        #[garde(length(min = 1, max = 255))]
        file_name: String,
        #[garde(length(min = 1, max = MAX_FILE_BYTES))]
        bytes: Vec<u8>,
    },
    Video(#[garde(custom(is_http_url))] String),
}

/// Input handed to the orchestrator.
///
/// Validation is the input collector's job; the orchestrator submits the
/// payload as-is.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct SubmissionPayload {
    #[garde(dive)]
    pub transcript: Transcript,

    /// Free-form description of where the transcript came from (a speech, a debate).
    #[garde(length(min = 1, max = 200))]
    pub source: Option<String>,
}

impl SubmissionPayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            transcript: Transcript::Text(content.into()),
            source: None,
        }
    }

    pub fn file(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            transcript: Transcript::File {
                file_name: file_name.into(),
                bytes,
            },
            source: None,
        }
    }

    pub fn video(url: impl Into<String>) -> Self {
        Self {
            transcript: Transcript::Video(url.into()),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Read a transcript file from disk. The file name sent to the service
    /// is the path's last component.
    pub async fn from_path(path: &Path) -> Result<Self, InputError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("transcript.txt");
        Ok(Self::file(file_name, bytes))
    }

    /// Validate and hand back the payload.
    pub fn validated(self) -> Result<Self, InputError> {
        self.validate()?;
        Ok(self)
    }

    pub fn kind(&self) -> SourceKind {
        match self.transcript {
            Transcript::Text(_) => SourceKind::Text,
            Transcript::File { .. } => SourceKind::File,
            Transcript::Video(_) => SourceKind::Video,
        }
    }
}

fn is_http_url(value: &str, _context: &()) -> garde::Result {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .ok_or_else(|| garde::Error::new("video reference must be an http(s) URL"))?;

    if rest.is_empty() || rest.starts_with('/') || rest.chars().any(char::is_whitespace) {
        return Err(garde::Error::new("video reference is not a valid URL"));
    }
    Ok(())
}

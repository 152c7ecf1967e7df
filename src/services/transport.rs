//! HTTP transport to the fact-check service.
//!
//! The orchestrator talks to the service only through [`AnalysisTransport`],
//! so tests can script responses without a server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::models::api::{
    AnalyzeRequest, AnalyzeResponse, ErrorBody, ExportFormat, ResultsResponse, StatusResponse,
};
use crate::models::submission::{SubmissionPayload, Transcript};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse service response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Service returned HTTP {status}: {}", .message.as_deref().unwrap_or("no error message"))]
    Rejected { status: u16, message: Option<String> },
}

impl TransportError {
    /// Error text supplied by the service, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            TransportError::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// Request/response contract of the analysis service.
///
/// Implementations return the service envelopes as-is; interpreting
/// `success: false` is left to the caller.
#[async_trait]
pub trait AnalysisTransport: Send + Sync {
    /// `POST /analyze`
    async fn submit(&self, payload: &SubmissionPayload) -> Result<AnalyzeResponse, TransportError>;

    /// `GET /status/{job_id}`
    async fn status(&self, job_id: &str) -> Result<StatusResponse, TransportError>;

    /// `GET /results/{job_id}`
    async fn results(&self, job_id: &str) -> Result<ResultsResponse, TransportError>;

    /// `POST /export/{job_id}/{format}`, returning the document bytes.
    async fn export(&self, job_id: &str, format: ExportFormat) -> Result<Vec<u8>, TransportError>;
}

/// [`AnalysisTransport`] over reqwest.
pub struct HttpTransport {
    http: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder()
            .user_agent(concat!("transcript-factcheck/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl AnalysisTransport for HttpTransport {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<AnalyzeResponse, TransportError> {
        let request = self.http.post(self.url("/analyze"));
        let kind = payload.kind();

        let request = match &payload.transcript {
            Transcript::Text(content) | Transcript::Video(content) => request.json(&AnalyzeRequest {
                content,
                kind,
                source: payload.source.as_deref(),
            }),
            Transcript::File { file_name, bytes } => {
                let part = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str("text/plain")?;
                let mut form = Form::new().part("file", part).text("type", kind.as_ref().to_string());
                if let Some(source) = &payload.source {
                    form = form.text("source", source.clone());
                }
                request.multipart(form)
            }
        };

        tracing::debug!(kind = %kind, "Submitting transcript");
        read_json(request.send().await?).await
    }

    async fn status(&self, job_id: &str) -> Result<StatusResponse, TransportError> {
        let response = self
            .http
            .get(self.url(&format!("/status/{job_id}")))
            .send()
            .await?;
        read_json(response).await
    }

    async fn results(&self, job_id: &str) -> Result<ResultsResponse, TransportError> {
        let response = self
            .http
            .get(self.url(&format!("/results/{job_id}")))
            .send()
            .await?;
        read_json(response).await
    }

    async fn export(&self, job_id: &str, format: ExportFormat) -> Result<Vec<u8>, TransportError> {
        let response = self
            .http
            .post(self.url(&format!("/export/{job_id}/{format}")))
            .send()
            .await?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));
        let body = response.bytes().await?;

        // A JSON body on an export is always an error report, whatever the status.
        if !status.is_success() || is_json {
            return Err(rejected(status, &body));
        }
        Ok(body.to_vec())
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        return Err(rejected(status, &body));
    }
    Ok(serde_json::from_slice(&body)?)
}

fn rejected(status: StatusCode, body: &[u8]) -> TransportError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message);
    TransportError::Rejected {
        status: status.as_u16(),
        message,
    }
}

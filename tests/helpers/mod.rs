//! Test helper utilities: a scripted in-memory transport.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use metrics::{Counter, Gauge, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder as MetricsRecorder, SharedString, Unit};
use serde_json::Value;
use transcript_factcheck::models::api::{
    AnalyzeResponse, ExportFormat, ResultsResponse, StatusResponse,
};
use transcript_factcheck::models::job::Job;
use transcript_factcheck::models::submission::SubmissionPayload;
use transcript_factcheck::services::transport::{AnalysisTransport, TransportError};

/// Transport that replays canned responses.
///
/// Status responses are consumed in order per job; once a job's script runs
/// out, its `repeat` response (if any) is returned on every further call.
#[derive(Default)]
pub struct ScriptedTransport {
    submissions: Mutex<VecDeque<Result<AnalyzeResponse, TransportError>>>,
    statuses: Mutex<HashMap<String, VecDeque<Result<StatusResponse, TransportError>>>>,
    repeat: Mutex<HashMap<String, StatusResponse>>,
    results: Mutex<HashMap<String, VecDeque<Result<ResultsResponse, TransportError>>>>,
    exports: Mutex<HashMap<String, Result<Vec<u8>, TransportError>>>,
    status_calls: Mutex<HashMap<String, u32>>,
    results_calls: Mutex<HashMap<String, u32>>,
    submitted: Mutex<Vec<SubmissionPayload>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn accept(&self, job_id: &str) -> &Self {
        self.submissions.lock().unwrap().push_back(Ok(AnalyzeResponse {
            success: true,
            job_id: Some(job_id.to_string()),
            error: None,
        }));
        self
    }

    pub fn reject_submission(&self, response: Result<AnalyzeResponse, TransportError>) -> &Self {
        self.submissions.lock().unwrap().push_back(response);
        self
    }

    pub fn status(&self, job_id: &str, status: &str, progress: f64) -> &Self {
        self.status_response(job_id, Ok(status_response(status, progress)))
    }

    pub fn status_response(
        &self,
        job_id: &str,
        response: Result<StatusResponse, TransportError>,
    ) -> &Self {
        self.statuses
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Return this status forever once the script for `job_id` is exhausted.
    pub fn repeat_status(&self, job_id: &str, status: &str, progress: f64) -> &Self {
        self.repeat
            .lock()
            .unwrap()
            .insert(job_id.to_string(), status_response(status, progress));
        self
    }

    pub fn result(&self, job_id: &str, data: Value) -> &Self {
        self.result_response(
            job_id,
            Ok(ResultsResponse {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
    }

    pub fn result_response(
        &self,
        job_id: &str,
        response: Result<ResultsResponse, TransportError>,
    ) -> &Self {
        self.results
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn export(&self, job_id: &str, response: Result<Vec<u8>, TransportError>) -> &Self {
        self.exports
            .lock()
            .unwrap()
            .insert(job_id.to_string(), response);
        self
    }

    pub fn status_calls(&self, job_id: &str) -> u32 {
        self.status_calls
            .lock()
            .unwrap()
            .get(job_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn results_calls(&self, job_id: &str) -> u32 {
        self.results_calls
            .lock()
            .unwrap()
            .get(job_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn submitted(&self) -> Vec<SubmissionPayload> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisTransport for ScriptedTransport {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<AnalyzeResponse, TransportError> {
        self.submitted.lock().unwrap().push(payload.clone());
        self.submissions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(rejected(500, "no scripted submission")))
    }

    async fn status(&self, job_id: &str) -> Result<StatusResponse, TransportError> {
        *self
            .status_calls
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default() += 1;

        let scripted = self
            .statuses
            .lock()
            .unwrap()
            .get_mut(job_id)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(response) => response,
            None => self
                .repeat
                .lock()
                .unwrap()
                .get(job_id)
                .cloned()
                .ok_or_else(|| rejected(404, "Job not found")),
        }
    }

    async fn results(&self, job_id: &str) -> Result<ResultsResponse, TransportError> {
        *self
            .results_calls
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default() += 1;

        self.results
            .lock()
            .unwrap()
            .get_mut(job_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(rejected(404, "Results not found")))
    }

    async fn export(&self, job_id: &str, _format: ExportFormat) -> Result<Vec<u8>, TransportError> {
        self.exports
            .lock()
            .unwrap()
            .remove(job_id)
            .unwrap_or_else(|| Err(rejected(404, "Report not found")))
    }
}

pub fn status_response(status: &str, progress: f64) -> StatusResponse {
    StatusResponse {
        success: true,
        status: Some(status.into()),
        progress: Some(progress),
        error: None,
        message: None,
    }
}

pub fn rejected(status: u16, message: &str) -> TransportError {
    TransportError::Rejected {
        status,
        message: Some(message.to_string()),
    }
}

/// Observer that records every job update it sees.
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<Job>>>,
}

impl Recorder {
    pub fn observer(&self) -> impl FnMut(&Job) + Send + Sync + 'static {
        let seen = Arc::clone(&self.seen);
        move |job: &Job| seen.lock().unwrap().push(job.clone())
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.seen.lock().unwrap().clone()
    }

    pub fn job_ids(&self) -> Vec<String> {
        self.jobs().into_iter().map(|j| j.id).collect()
    }
}

/// Metrics recorder that keeps histogram samples by metric name.
///
/// Install it on the test thread with `metrics::set_default_local_recorder`.
#[derive(Clone, Default)]
pub struct HistogramCapture {
    samples: Arc<Mutex<HashMap<String, Vec<f64>>>>,
}

struct CapturedHistogram {
    name: String,
    samples: Arc<Mutex<HashMap<String, Vec<f64>>>>,
}

impl HistogramFn for CapturedHistogram {
    fn record(&self, value: f64) {
        self.samples
            .lock()
            .unwrap()
            .entry(self.name.clone())
            .or_default()
            .push(value);
    }
}

impl HistogramCapture {
    pub fn samples(&self, name: &str) -> Vec<f64> {
        self.samples
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

impl MetricsRecorder for HistogramCapture {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, _: &Key, _: &Metadata<'_>) -> Counter {
        Counter::noop()
    }

    fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(Arc::new(CapturedHistogram {
            name: key.name().to_string(),
            samples: Arc::clone(&self.samples),
        }))
    }
}

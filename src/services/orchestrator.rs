//! Job lifecycle orchestration: submit → poll → fetch → render-or-fail.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::models::api::{ExportFormat, StatusResponse};
use crate::models::job::{Job, JobStatus};
use crate::models::report::{RawResult, Report};
use crate::models::submission::SubmissionPayload;
use crate::services::renderer::Renderer;
use crate::services::transport::{AnalysisTransport, TransportError};

pub use crate::services::session::{JobError, Phase, SessionEvent, SessionId};
use crate::services::session::{SessionMachine, Transition};

/// Default delay between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Default number of status checks before giving up (two minutes at the default interval).
pub const DEFAULT_MAX_POLL_TICKS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_ticks: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_ticks: DEFAULT_MAX_POLL_TICKS,
        }
    }
}

/// Receives job updates while a job is in progress.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&mut self, job: &Job);
}

impl<F> ProgressObserver for F
where
    F: FnMut(&Job) + Send + Sync,
{
    fn on_progress(&mut self, job: &Job) {
        self(job)
    }
}

type TaggedEvent = (SessionId, SessionEvent);

/// Drives one analysis job at a time against an [`AnalysisTransport`].
///
/// The orchestrator owns the session state machine. The poll loop runs as a
/// separate task that only sends session-tagged events back over a channel;
/// [`Orchestrator::wait`] applies them in order. Submitting again or calling
/// [`Orchestrator::reset`] aborts the previous poll task before anything new
/// is armed.
pub struct Orchestrator {
    transport: Arc<dyn AnalysisTransport>,
    renderer: Renderer,
    settings: PollSettings,
    machine: SessionMachine,
    poll_task: Option<JoinHandle<()>>,
    events_tx: mpsc::UnboundedSender<TaggedEvent>,
    events_rx: mpsc::UnboundedReceiver<TaggedEvent>,
    observer: Option<Box<dyn ProgressObserver>>,
    report: Option<Report>,
    submitted_at: Option<Instant>,
}

impl Orchestrator {
    pub fn new(transport: Arc<dyn AnalysisTransport>, settings: PollSettings) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            renderer: Renderer::standard(false),
            settings,
            machine: SessionMachine::new(),
            poll_task: None,
            events_tx,
            events_rx,
            observer: None,
            report: None,
            submitted_at: None,
        }
    }

    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_observer(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn phase(&self) -> Phase {
        self.machine.phase()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.machine.session_id()
    }

    pub fn current_job(&self) -> Option<&Job> {
        self.machine.job()
    }

    /// Status checks of the current job that failed and were retried.
    pub fn poll_failures(&self) -> u32 {
        self.machine.poll_failures()
    }

    /// Report delivered for the current job, once it is done.
    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    /// Submit a transcript and start polling for it.
    ///
    /// The new job replaces the current one; the previous poll loop is
    /// cancelled before the request goes out.
    pub async fn submit(&mut self, payload: &SubmissionPayload) -> Result<Job, JobError> {
        self.cancel_polling();
        self.report = None;
        let session = self.machine.begin();
        self.submitted_at = Some(Instant::now());
        metrics::counter!("factcheck_jobs_submitted").increment(1);

        let event = match self.transport.submit(payload).await {
            Ok(response) if response.success => match response.job_id.filter(|id| !id.is_empty()) {
                Some(job_id) => SessionEvent::SubmitOk { job_id },
                None => SessionEvent::SubmitErr {
                    message: "The analysis service did not return a job id".to_string(),
                },
            },
            Ok(response) => SessionEvent::SubmitErr {
                message: response
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| "The analysis service rejected the submission".to_string()),
            },
            Err(e) => SessionEvent::SubmitErr {
                message: submission_message(&e),
            },
        };

        match self.machine.apply(session, event) {
            Transition::Started(job) => {
                info!(%session, job_id = %job.id, kind = %payload.kind(), "Analysis job submitted");
                self.spawn_poller(session, job.id.clone());
                Ok(job)
            }
            Transition::Failed(err) => {
                self.submitted_at = None;
                warn!(%session, error = %err, "Submission failed");
                metrics::counter!("factcheck_jobs_failed").increment(1);
                Err(err)
            }
            other => {
                debug!(%session, ?other, "Unexpected transition after submission");
                Err(JobError::Submission("Submission was superseded".to_string()))
            }
        }
    }

    /// Drive the current job to a terminal outcome, forwarding progress to
    /// the observer.
    pub async fn wait(&mut self) -> Result<Report, JobError> {
        loop {
            let outcome = match (self.phase(), self.session_id()) {
                (Phase::Polling, _) => {
                    // The sender half lives in `self`, so the channel never closes here.
                    let Some((session, event)) = self.events_rx.recv().await else {
                        return Err(JobError::NoActiveJob);
                    };
                    self.dispatch(session, event).await
                }
                // A `wait` dropped mid-fetch leaves the session fetching; resume it.
                (Phase::Fetching, Some(session)) => match self.current_job().map(|j| j.id.clone()) {
                    Some(job_id) => self.deliver(session, job_id).await,
                    None => return Err(JobError::NoActiveJob),
                },
                _ => return Err(JobError::NoActiveJob),
            };

            if let Some(outcome) = outcome {
                return outcome;
            }
        }
    }

    /// Apply one session-tagged event. Returns the job outcome when the
    /// event ends the job. Events for a superseded session are discarded.
    pub async fn dispatch(
        &mut self,
        session: SessionId,
        event: SessionEvent,
    ) -> Option<Result<Report, JobError>> {
        match self.machine.apply(session, event) {
            Transition::Progress(job) => {
                debug!(%session, job_id = %job.id, status = %job.status, progress = job.progress, "Job progress");
                if let Some(observer) = self.observer.as_mut() {
                    observer.on_progress(&job);
                }
                None
            }
            Transition::TransientError { failures, error } => {
                warn!(%session, failures, error = %error, "Status check failed, will retry");
                metrics::counter!("factcheck_poll_errors").increment(1);
                None
            }
            Transition::FetchRequested { job_id } => {
                self.finish_polling();
                if let Some((observer, job)) = self.observer.as_mut().zip(self.machine.job()) {
                    observer.on_progress(job);
                }
                self.deliver(session, job_id).await
            }
            Transition::Failed(err) => Some(Err(self.fail(session, err))),
            Transition::Stale | Transition::Ignored | Transition::Started(_) | Transition::Delivered => {
                None
            }
        }
    }

    /// Fetch the result of a completed job and settle its session.
    async fn deliver(
        &mut self,
        session: SessionId,
        job_id: String,
    ) -> Option<Result<Report, JobError>> {
        let fetched = self.fetch_result(&job_id).await;
        let event = match &fetched {
            Ok(_) => SessionEvent::FetchOk,
            Err(err) => SessionEvent::FetchErr {
                message: fetch_message(err),
            },
        };

        match (self.machine.apply(session, event), fetched) {
            (Transition::Delivered, Ok(report)) => {
                info!(
                    %session,
                    job_id = %job_id,
                    score = report.credibility_score,
                    claims = report.counts.total,
                    "Analysis complete"
                );
                metrics::counter!("factcheck_jobs_completed").increment(1);
                self.record_job_duration();
                self.report = Some(report.clone());
                Some(Ok(report))
            }
            (Transition::Failed(err), _) => Some(Err(self.fail(session, err))),
            _ => None,
        }
    }

    /// Fetch and render the result of a completed job.
    pub async fn fetch_result(&self, job_id: &str) -> Result<Report, JobError> {
        let response = self
            .transport
            .results(job_id)
            .await
            .map_err(|e| JobError::ResultFetch(e.to_string()))?;

        if !response.success {
            return Err(JobError::ResultFetch(
                response
                    .error
                    .unwrap_or_else(|| "The service marked the result as unsuccessful".to_string()),
            ));
        }

        let data = response
            .data
            .ok_or_else(|| JobError::ResultFetch("The result payload is missing".to_string()))?;
        let raw: RawResult = serde_json::from_value(data)
            .map_err(|e| JobError::ResultFetch(format!("Malformed result payload: {e}")))?;

        Ok(self.renderer.render(&raw))
    }

    /// Download the report of the current, completed job.
    pub async fn export(&self, format: ExportFormat) -> Result<Vec<u8>, JobError> {
        let job = match (self.phase(), self.machine.job()) {
            (Phase::Done, Some(job)) => job,
            _ => {
                return Err(JobError::Export(
                    "There is no completed analysis to export".to_string(),
                ))
            }
        };

        let bytes = self
            .transport
            .export(&job.id, format)
            .await
            .map_err(|e| JobError::Export(e.server_message().map_or_else(|| e.to_string(), str::to_string)))?;

        if bytes.is_empty() {
            return Err(JobError::Export("The service returned an empty document".to_string()));
        }
        info!(job_id = %job.id, %format, size = bytes.len(), "Report exported");
        Ok(bytes)
    }

    /// Cancel polling and forget the current job.
    pub fn reset(&mut self) {
        if let Some(session) = self.machine.session_id() {
            debug!(%session, "Resetting orchestrator");
        }
        self.cancel_polling();
        self.machine.reset();
        self.report = None;
        self.submitted_at = None;
    }

    fn fail(&mut self, session: SessionId, err: JobError) -> JobError {
        self.finish_polling();
        warn!(%session, error = %err, "Analysis job failed");
        metrics::counter!("factcheck_jobs_failed").increment(1);
        self.record_job_duration();
        err
    }

    /// Record submit-to-outcome time of the job that just ended.
    fn record_job_duration(&mut self) {
        if let Some(submitted_at) = self.submitted_at.take() {
            metrics::histogram!("factcheck_job_seconds").record(submitted_at.elapsed().as_secs_f64());
        }
    }

    fn spawn_poller(&mut self, session: SessionId, job_id: String) {
        let transport = Arc::clone(&self.transport);
        let events = self.events_tx.clone();
        let settings = self.settings;
        self.poll_task = Some(tokio::spawn(poll_loop(
            transport, session, job_id, settings, events,
        )));
    }

    /// Abort the poll task and drop any events it already queued.
    fn cancel_polling(&mut self) {
        self.finish_polling();
        while self.events_rx.try_recv().is_ok() {}
    }

    fn finish_polling(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.finish_polling();
    }
}

/// One status check per tick until the job ends or the tick budget runs out.
async fn poll_loop(
    transport: Arc<dyn AnalysisTransport>,
    session: SessionId,
    job_id: String,
    settings: PollSettings,
    events: mpsc::UnboundedSender<TaggedEvent>,
) {
    let period = settings.interval.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for tick in 1..=settings.max_ticks {
        ticker.tick().await;
        let event = match transport.status(&job_id).await {
            Ok(response) => status_event(response),
            Err(e) => SessionEvent::TickError {
                message: e.to_string(),
            },
        };
        debug!(%session, job_id = %job_id, tick, "Status check");

        let terminal = matches!(
            event,
            SessionEvent::TickCompleted { .. } | SessionEvent::TickFailed { .. }
        );
        if events.send((session, event)).is_err() || terminal {
            return;
        }
    }

    let _ = events.send((
        session,
        SessionEvent::TickTimeout {
            ticks: settings.max_ticks,
        },
    ));
}

fn status_event(response: StatusResponse) -> SessionEvent {
    match response.status {
        Some(JobStatus::Failed) => SessionEvent::TickFailed {
            error: response.error,
        },
        _ if !response.success => SessionEvent::TickError {
            message: response
                .error
                .unwrap_or_else(|| "The service marked the status check as unsuccessful".to_string()),
        },
        Some(JobStatus::Completed) => SessionEvent::TickCompleted {
            progress: response.progress,
        },
        Some(status) => SessionEvent::TickProgress {
            status,
            progress: response.progress,
            message: response.message,
        },
        None => SessionEvent::TickError {
            message: "The status response did not include a status".to_string(),
        },
    }
}

fn submission_message(err: &TransportError) -> String {
    match err.server_message() {
        Some(message) => message.to_string(),
        None => format!("Failed to reach the analysis service ({err})"),
    }
}

fn fetch_message(err: &JobError) -> String {
    match err {
        JobError::ResultFetch(message) => message.clone(),
        other => other.to_string(),
    }
}

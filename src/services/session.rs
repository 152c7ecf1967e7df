//! Job session state machine.
//!
//! Each submission opens a new [`SessionId`]. Everything asynchronous that
//! happens on behalf of a job (poll ticks, the result fetch) reports back as
//! a [`SessionEvent`] tagged with the session it was issued for. Events for
//! any session other than the current one are discarded, so a superseded
//! job can never touch the state of the job that replaced it.

use std::fmt;

use strum::Display;

use crate::models::job::{Job, JobStatus};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("Could not start analysis: {0}")]
    Submission(String),

    #[error("Status check failed: {0}")]
    TransientPoll(String),

    #[error("Analysis did not finish within {ticks} status checks")]
    Timeout { ticks: u32 },

    #[error("Analysis failed: {0}")]
    JobFailed(String),

    #[error("Could not load analysis results: {0}")]
    ResultFetch(String),

    #[error("Report export failed: {0}")]
    Export(String),

    #[error("No analysis is in progress")]
    NoActiveJob,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Idle,
    Submitting,
    Polling,
    Fetching,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SubmitOk { job_id: String },
    SubmitErr { message: String },
    TickProgress {
        status: JobStatus,
        progress: Option<f64>,
        message: Option<String>,
    },
    TickCompleted { progress: Option<f64> },
    TickFailed { error: Option<String> },
    /// A single status check failed; the job keeps polling.
    TickError { message: String },
    TickTimeout { ticks: u32 },
    FetchOk,
    FetchErr { message: String },
}

impl SessionEvent {
    fn name(&self) -> &'static str {
        match self {
            SessionEvent::SubmitOk { .. } => "submit_ok",
            SessionEvent::SubmitErr { .. } => "submit_err",
            SessionEvent::TickProgress { .. } => "tick_progress",
            SessionEvent::TickCompleted { .. } => "tick_completed",
            SessionEvent::TickFailed { .. } => "tick_failed",
            SessionEvent::TickError { .. } => "tick_error",
            SessionEvent::TickTimeout { .. } => "tick_timeout",
            SessionEvent::FetchOk => "fetch_ok",
            SessionEvent::FetchErr { .. } => "fetch_err",
        }
    }
}

/// What applying an event did.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Submission accepted; polling should start for this job.
    Started(Job),
    /// Non-terminal tick; the updated job is for observers.
    Progress(Job),
    /// A tick failed and was counted; polling continues.
    TransientError { failures: u32, error: JobError },
    /// The job completed; fetch its result exactly once.
    FetchRequested { job_id: String },
    /// The result was fetched and rendered.
    Delivered,
    /// Terminal failure of the current job.
    Failed(JobError),
    /// The event belongs to a superseded session and was dropped.
    Stale,
    /// The event is not valid in the current phase and was dropped.
    Ignored,
}

#[derive(Debug)]
struct JobSession {
    id: SessionId,
    phase: Phase,
    job: Option<Job>,
    poll_failures: u32,
}

/// Owner of the current session. Only the orchestrator mutates it.
#[derive(Debug, Default)]
pub struct SessionMachine {
    last_id: u64,
    current: Option<JobSession>,
}

impl SessionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session in `submitting`, superseding any current one.
    pub fn begin(&mut self) -> SessionId {
        self.last_id += 1;
        let id = SessionId(self.last_id);
        self.current = Some(JobSession {
            id,
            phase: Phase::Submitting,
            job: None,
            poll_failures: 0,
        });
        id
    }

    /// Drop the current session and return to `idle`.
    pub fn reset(&mut self) {
        self.current = None;
    }

    pub fn phase(&self) -> Phase {
        self.current.as_ref().map_or(Phase::Idle, |s| s.phase)
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.current.as_ref().map(|s| s.id)
    }

    pub fn is_current(&self, session: SessionId) -> bool {
        self.session_id() == Some(session)
    }

    pub fn job(&self) -> Option<&Job> {
        self.current.as_ref().and_then(|s| s.job.as_ref())
    }

    pub fn poll_failures(&self) -> u32 {
        self.current.as_ref().map_or(0, |s| s.poll_failures)
    }

    pub fn apply(&mut self, session: SessionId, event: SessionEvent) -> Transition {
        let Some(current) = self.current.as_mut().filter(|s| s.id == session) else {
            tracing::debug!(%session, event = event.name(), "Dropping event for superseded session");
            return Transition::Stale;
        };

        match (current.phase, event) {
            (Phase::Submitting, SessionEvent::SubmitOk { job_id }) => {
                let job = Job::queued(job_id);
                current.phase = Phase::Polling;
                current.job = Some(job.clone());
                Transition::Started(job)
            }
            (Phase::Submitting, SessionEvent::SubmitErr { message }) => {
                current.phase = Phase::Failed;
                Transition::Failed(JobError::Submission(message))
            }
            (
                Phase::Polling,
                SessionEvent::TickProgress {
                    status,
                    progress,
                    message,
                },
            ) => match current.job.as_mut() {
                Some(job) => {
                    job.record_tick(status, progress, message);
                    Transition::Progress(job.clone())
                }
                None => Transition::Ignored,
            },
            (Phase::Polling, SessionEvent::TickError { message }) => {
                current.poll_failures += 1;
                Transition::TransientError {
                    failures: current.poll_failures,
                    error: JobError::TransientPoll(message),
                }
            }
            (Phase::Polling, SessionEvent::TickCompleted { progress }) => {
                let Some(job) = current.job.as_mut() else {
                    return Transition::Ignored;
                };
                job.record_tick(JobStatus::Completed, progress.or(Some(100.0)), None);
                current.phase = Phase::Fetching;
                Transition::FetchRequested {
                    job_id: job.id.clone(),
                }
            }
            (Phase::Polling, SessionEvent::TickFailed { error }) => {
                let error = error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| "The analysis service reported a failure".to_string());
                if let Some(job) = current.job.as_mut() {
                    job.record_tick(JobStatus::Failed, None, None);
                    job.error = Some(error.clone());
                }
                current.phase = Phase::Failed;
                Transition::Failed(JobError::JobFailed(error))
            }
            (Phase::Polling, SessionEvent::TickTimeout { ticks }) => {
                current.phase = Phase::Failed;
                Transition::Failed(JobError::Timeout { ticks })
            }
            (Phase::Fetching, SessionEvent::FetchOk) => {
                current.phase = Phase::Done;
                Transition::Delivered
            }
            (Phase::Fetching, SessionEvent::FetchErr { message }) => {
                current.phase = Phase::Failed;
                Transition::Failed(JobError::ResultFetch(message))
            }
            (phase, event) => {
                tracing::debug!(%session, %phase, event = event.name(), "Ignoring event not valid in phase");
                Transition::Ignored
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polling(machine: &mut SessionMachine, job_id: &str) -> SessionId {
        let session = machine.begin();
        let transition = machine.apply(
            session,
            SessionEvent::SubmitOk {
                job_id: job_id.to_string(),
            },
        );
        assert!(matches!(transition, Transition::Started(ref job) if job.id == job_id));
        session
    }

    #[test]
    fn test_starts_idle() {
        let machine = SessionMachine::new();
        assert_eq!(machine.phase(), Phase::Idle);
        assert!(machine.job().is_none());
        assert!(machine.session_id().is_none());
    }

    #[test]
    fn test_happy_path() {
        let mut machine = SessionMachine::new();
        let session = polling(&mut machine, "j1");
        assert_eq!(machine.phase(), Phase::Polling);
        assert_eq!(machine.job().unwrap().status, JobStatus::Queued);

        let transition = machine.apply(
            session,
            SessionEvent::TickProgress {
                status: JobStatus::Processing,
                progress: Some(30.0),
                message: None,
            },
        );
        match transition {
            Transition::Progress(job) => {
                assert_eq!(job.status, JobStatus::Processing);
                assert_eq!(job.progress, 30);
            }
            other => panic!("unexpected transition {other:?}"),
        }

        let transition = machine.apply(session, SessionEvent::TickCompleted { progress: None });
        assert_eq!(
            transition,
            Transition::FetchRequested {
                job_id: "j1".to_string()
            }
        );
        assert_eq!(machine.phase(), Phase::Fetching);
        assert_eq!(machine.job().unwrap().progress, 100);

        assert_eq!(machine.apply(session, SessionEvent::FetchOk), Transition::Delivered);
        assert_eq!(machine.phase(), Phase::Done);
    }

    #[test]
    fn test_submit_error_fails_session() {
        let mut machine = SessionMachine::new();
        let session = machine.begin();
        let transition = machine.apply(
            session,
            SessionEvent::SubmitErr {
                message: "Content too long".to_string(),
            },
        );
        assert_eq!(
            transition,
            Transition::Failed(JobError::Submission("Content too long".to_string()))
        );
        assert_eq!(machine.phase(), Phase::Failed);
    }

    #[test]
    fn test_transient_errors_are_counted() {
        let mut machine = SessionMachine::new();
        let session = polling(&mut machine, "j1");
        for expected in 1..=3 {
            let transition = machine.apply(
                session,
                SessionEvent::TickError {
                    message: "timeout".to_string(),
                },
            );
            assert!(matches!(
                transition,
                Transition::TransientError { failures, .. } if failures == expected
            ));
        }
        assert_eq!(machine.poll_failures(), 3);
        assert_eq!(machine.phase(), Phase::Polling);
    }

    #[test]
    fn test_failed_status_carries_server_error() {
        let mut machine = SessionMachine::new();
        let session = polling(&mut machine, "j1");
        let transition = machine.apply(
            session,
            SessionEvent::TickFailed {
                error: Some("No claims found".to_string()),
            },
        );
        assert_eq!(
            transition,
            Transition::Failed(JobError::JobFailed("No claims found".to_string()))
        );
        assert_eq!(machine.job().unwrap().error.as_deref(), Some("No claims found"));
        assert_eq!(machine.phase(), Phase::Failed);
    }

    #[test]
    fn test_failed_status_without_text_gets_generic_error() {
        let mut machine = SessionMachine::new();
        let session = polling(&mut machine, "j1");
        let transition = machine.apply(session, SessionEvent::TickFailed { error: None });
        assert!(matches!(transition, Transition::Failed(JobError::JobFailed(ref m)) if !m.is_empty()));
    }

    #[test]
    fn test_timeout_and_fetch_error_are_terminal() {
        let mut machine = SessionMachine::new();
        let session = polling(&mut machine, "j1");
        assert_eq!(
            machine.apply(session, SessionEvent::TickTimeout { ticks: 60 }),
            Transition::Failed(JobError::Timeout { ticks: 60 })
        );

        let session = polling(&mut machine, "j2");
        machine.apply(session, SessionEvent::TickCompleted { progress: Some(100.0) });
        assert_eq!(
            machine.apply(
                session,
                SessionEvent::FetchErr {
                    message: "malformed".to_string()
                }
            ),
            Transition::Failed(JobError::ResultFetch("malformed".to_string()))
        );
    }

    #[test]
    fn test_events_for_superseded_session_are_stale() {
        let mut machine = SessionMachine::new();
        let first = polling(&mut machine, "job-a");
        let second = polling(&mut machine, "job-b");
        assert_ne!(first, second);
        assert!(!machine.is_current(first));

        for event in [
            SessionEvent::TickCompleted { progress: Some(100.0) },
            SessionEvent::TickFailed { error: Some("late".to_string()) },
            SessionEvent::TickProgress {
                status: JobStatus::Analyzing,
                progress: Some(99.0),
                message: None,
            },
            SessionEvent::FetchOk,
        ] {
            assert_eq!(machine.apply(first, event), Transition::Stale);
        }

        let job = machine.job().unwrap();
        assert_eq!(job.id, "job-b");
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert_eq!(machine.phase(), Phase::Polling);
    }

    #[test]
    fn test_reset_makes_every_session_stale() {
        let mut machine = SessionMachine::new();
        let session = polling(&mut machine, "j1");
        machine.reset();
        assert_eq!(machine.phase(), Phase::Idle);
        assert_eq!(
            machine.apply(session, SessionEvent::TickCompleted { progress: None }),
            Transition::Stale
        );
    }

    #[test]
    fn test_out_of_phase_events_are_ignored() {
        let mut machine = SessionMachine::new();
        let session = machine.begin();
        assert_eq!(
            machine.apply(session, SessionEvent::TickCompleted { progress: None }),
            Transition::Ignored
        );
        assert_eq!(machine.phase(), Phase::Submitting);

        let session = polling(&mut machine, "j1");
        machine.apply(session, SessionEvent::TickTimeout { ticks: 60 });
        // A tick arriving after the terminal state does not revive the job.
        assert_eq!(
            machine.apply(session, SessionEvent::TickCompleted { progress: None }),
            Transition::Ignored
        );
        assert_eq!(machine.phase(), Phase::Failed);
    }
}

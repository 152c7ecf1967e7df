use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Filtering follows `RUST_LOG` (default `info`). `LOG_FORMAT=json` switches
/// to JSON lines; otherwise output is compact text. Logs go to stderr so the
/// rendered report on stdout stays clean.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

/// Register descriptions for the client's metrics.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "factcheck_jobs_submitted",
        "Total analysis jobs submitted"
    );
    metrics::describe_counter!(
        "factcheck_jobs_completed",
        "Total analysis jobs that produced a report"
    );
    metrics::describe_counter!(
        "factcheck_jobs_failed",
        "Total analysis jobs that ended in an error"
    );
    metrics::describe_counter!(
        "factcheck_poll_errors",
        "Status checks that failed and were retried"
    );
    metrics::describe_histogram!(
        "factcheck_job_seconds",
        "Time from submitting a job to its terminal outcome"
    );
}

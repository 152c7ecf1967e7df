use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use transcript_factcheck::{
    config::AppConfig,
    models::{api::ExportFormat, job::Job, submission::{InputError, SubmissionPayload}},
    services::{orchestrator::Orchestrator, renderer::Renderer, transport::HttpTransport},
    telemetry,
};

/// Submit a transcript for fact-checking and print the report.
#[derive(Debug, Parser)]
#[command(name = "factcheck", version, about)]
struct Cli {
    #[command(subcommand)]
    input: InputCommand,

    /// Where the transcript comes from (speech, debate, interview)
    #[arg(long, global = true)]
    source: Option<String>,

    /// Write the PDF report to this path once the analysis completes
    #[arg(long, global = true)]
    export: Option<PathBuf>,

    /// Print the report as JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum InputCommand {
    /// Fact-check transcript text given on the command line
    Text { text: String },
    /// Fact-check a transcript file
    File { path: PathBuf },
    /// Fact-check the transcript of a video
    Video { url: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init_tracing();
    telemetry::describe_metrics();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Fact-check failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let payload = collect_input(&cli).await?;

    let transport = HttpTransport::new(&config.api_url, config.request_timeout())?;
    let mut orchestrator = Orchestrator::new(Arc::new(transport), config.poll_settings())
        .with_renderer(Renderer::standard(config.demo_mode))
        .with_observer(print_progress);

    tracing::info!(api_url = %config.api_url, kind = %payload.kind(), "Submitting transcript");
    let job = orchestrator.submit(&payload).await?;
    eprintln!("Submitted job {}", job.id);

    let report = orchestrator.wait().await?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }

    if let Some(path) = &cli.export {
        let document = orchestrator.export(ExportFormat::Pdf).await?;
        tokio::fs::write(path, &document).await?;
        eprintln!("Report written to {}", path.display());
    }

    Ok(())
}

/// Build and validate the submission from the command line.
async fn collect_input(cli: &Cli) -> Result<SubmissionPayload, InputError> {
    let payload = match &cli.input {
        InputCommand::Text { text } => SubmissionPayload::text(text.trim()),
        InputCommand::File { path } => SubmissionPayload::from_path(path).await?,
        InputCommand::Video { url } => SubmissionPayload::video(url.trim()),
    };

    let payload = match &cli.source {
        Some(source) => payload.with_source(source.trim()),
        None => payload,
    };
    payload.validated()
}

fn print_progress(job: &Job) {
    match &job.message {
        Some(message) => eprintln!("[{:>3}%] {} - {}", job.progress, job.status, message),
        None => eprintln!("[{:>3}%] {}", job.progress, job.status),
    }
}

use tracing::warn;

use crate::models::job::clamp_percent;
use crate::models::report::{
    Annotation, AnnotationKind, ClaimCounts, Credibility, FactCheckEntry, RawFactCheck,
    RawResult, RawStatistics, Report,
};
use crate::services::verdict::{self, CountBucket};

/// Summary used when the service sends none.
pub const DEFAULT_SUMMARY: &str = "Analysis complete.";

const DEFAULT_EXPLANATION: &str = "No explanation provided.";

/// Hook for optional report sections.
///
/// Extensions run in registration order after the core report is built and
/// may each contribute one annotation. They never change core fields.
pub trait ReportExtension: Send + Sync {
    fn annotate(&self, raw: &RawResult, report: &Report) -> Option<Annotation>;
}

/// Adds a block naming the speaker and source of the transcript, when known.
pub struct SpeakerContext;

impl ReportExtension for SpeakerContext {
    fn annotate(&self, _raw: &RawResult, report: &Report) -> Option<Annotation> {
        let body = match (&report.speaker, &report.source) {
            (Some(speaker), Some(source)) => format!("{speaker}, {source}"),
            (Some(speaker), None) => speaker.clone(),
            (None, Some(source)) => source.clone(),
            (None, None) => return None,
        };
        Some(Annotation {
            kind: AnnotationKind::SpeakerContext,
            title: "Speaker".to_string(),
            body,
        })
    }
}

/// Marks reports produced against the demo service.
pub struct DemoBanner;

impl ReportExtension for DemoBanner {
    fn annotate(&self, _raw: &RawResult, _report: &Report) -> Option<Annotation> {
        Some(Annotation {
            kind: AnnotationKind::DemoBanner,
            title: "Demo".to_string(),
            body: "Results come from the demo service and are for illustration only.".to_string(),
        })
    }
}

/// Builds [`Report`]s from raw result payloads.
#[derive(Default)]
pub struct Renderer {
    extensions: Vec<Box<dyn ReportExtension>>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderer with the built-in extensions: speaker context always, the
    /// demo banner when `demo_mode` is set.
    pub fn standard(demo_mode: bool) -> Self {
        let renderer = Self::new();
        let renderer = if demo_mode {
            renderer.with_extension(DemoBanner)
        } else {
            renderer
        };
        renderer.with_extension(SpeakerContext)
    }

    pub fn with_extension(mut self, extension: impl ReportExtension + 'static) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    pub fn render(&self, raw: &RawResult) -> Report {
        let mut report = render(raw);
        let annotations: Vec<Annotation> = self
            .extensions
            .iter()
            .filter_map(|extension| extension.annotate(raw, &report))
            .collect();
        report.annotations = annotations;
        report
    }
}

/// Build the core report: defaults for missing fields, counts recomputed
/// from the per-claim verdicts, no annotations.
pub fn render(raw: &RawResult) -> Report {
    let score = raw.credibility_score.map(clamp_score).unwrap_or(0.0);

    let entries: Vec<FactCheckEntry> = raw
        .fact_checks
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(render_entry)
        .collect();

    let counts = tally(&entries);
    if let Some(stats) = &raw.statistics {
        if disagrees(stats, &counts) {
            warn!(
                server_total = ?stats.total,
                server_verified = ?stats.verified,
                server_false = ?stats.r#false,
                server_unverified = ?stats.unverified,
                total = counts.total,
                verified = counts.verified,
                false_count = counts.r#false,
                unverified = counts.unverified,
                "Server statistics disagree with per-claim verdicts, using recount"
            );
        }
    }

    let summary = raw
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SUMMARY)
        .to_string();

    Report {
        credibility_score: clamp_percent(score),
        credibility: Credibility::from_score(score),
        summary,
        counts,
        entries,
        annotations: Vec::new(),
        speaker: non_empty(raw.speaker.as_deref()),
        source: non_empty(raw.source.as_deref()),
    }
}

fn render_entry(raw: &RawFactCheck) -> FactCheckEntry {
    let class = verdict::classify(raw.verdict.as_deref());
    FactCheckEntry {
        claim: raw.claim.clone().unwrap_or_default(),
        verdict: verdict::normalize(raw.verdict.as_deref()),
        class,
        label: class.label(),
        icon: class.icon(),
        explanation: non_empty(raw.explanation.as_deref())
            .unwrap_or_else(|| DEFAULT_EXPLANATION.to_string()),
        confidence: raw.confidence.map(clamp_percent),
        sources: raw
            .sources
            .iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .cloned()
            .collect(),
        source_url: non_empty(raw.source_url.as_deref()),
    }
}

fn tally(entries: &[FactCheckEntry]) -> ClaimCounts {
    entries
        .iter()
        .fold(ClaimCounts::default(), |mut counts, entry| {
            counts.total += 1;
            match entry.class.bucket() {
                CountBucket::Verified => counts.verified += 1,
                CountBucket::False => counts.r#false += 1,
                CountBucket::Unverified => counts.unverified += 1,
            }
            counts
        })
}

fn disagrees(stats: &RawStatistics, counts: &ClaimCounts) -> bool {
    [
        (stats.total, counts.total),
        (stats.verified, counts.verified),
        (stats.r#false, counts.r#false),
        (stats.unverified, counts.unverified),
    ]
    .iter()
    .any(|(server, ours)| server.is_some_and(|server| server != *ours))
}

/// Clamp the server score into 0–100 without rounding. NaN becomes 0.
fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

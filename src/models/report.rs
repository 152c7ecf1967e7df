use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use strum::{Display, IntoStaticStr};

use crate::services::verdict::VerdictClass;

/// Result payload as returned in the `data` field of `GET /results/{job_id}`.
///
/// Every field is optional; the renderer supplies defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawResult {
    pub credibility_score: Option<f64>,
    pub summary: Option<String>,
    pub statistics: Option<RawStatistics>,
    pub fact_checks: Option<Vec<RawFactCheck>>,
    #[serde(alias = "speaker_name")]
    pub speaker: Option<String>,
    pub source: Option<String>,
}

/// Server-side aggregate counts. Only used to detect disagreement with the
/// per-claim recount.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawStatistics {
    #[serde(alias = "total_claims")]
    pub total: Option<u32>,
    #[serde(alias = "verified_claims")]
    pub verified: Option<u32>,
    #[serde(alias = "false_claims")]
    pub r#false: Option<u32>,
    #[serde(alias = "unverified_claims")]
    pub unverified: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFactCheck {
    pub claim: Option<String>,
    pub verdict: Option<String>,
    pub explanation: Option<String>,
    pub confidence: Option<f64>,
    pub sources: Option<Vec<String>>,
    #[serde(alias = "sourceUrl")]
    pub source_url: Option<String>,
}

/// One rendered claim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactCheckEntry {
    pub claim: String,
    /// Normalized raw verdict, `unverified` when the service sent none.
    pub verdict: String,
    pub class: VerdictClass,
    /// Display label of `class`.
    pub label: &'static str,
    /// Icon key of `class`.
    pub icon: &'static str,
    pub explanation: String,
    pub confidence: Option<u8>,
    pub sources: Vec<String>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClaimCounts {
    pub total: u32,
    pub verified: u32,
    #[serde(rename = "false")]
    pub r#false: u32,
    pub unverified: u32,
}

/// Credibility band derived from the score. Serializes as its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum Credibility {
    #[strum(serialize = "Highly Credible")]
    High,
    #[strum(serialize = "Moderately Credible")]
    Moderate,
    #[strum(serialize = "Low Credibility")]
    Low,
    #[strum(serialize = "Very Low Credibility")]
    VeryLow,
}

impl Credibility {
    /// Band for a 0–100 score. Fractional scores are compared as sent, so
    /// 79.6 is still moderate. NaN is very low.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Credibility::High
        } else if score >= 60.0 {
            Credibility::Moderate
        } else if score >= 40.0 {
            Credibility::Low
        } else {
            Credibility::VeryLow
        }
    }

    pub fn label(self) -> &'static str {
        self.into()
    }
}

impl Serialize for Credibility {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnnotationKind {
    SpeakerContext,
    DemoBanner,
    Note,
}

/// Optional report section contributed by a renderer extension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub title: String,
    pub body: String,
}

/// Render-ready result of a completed job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub credibility_score: u8,
    pub credibility: Credibility,
    pub summary: String,
    pub counts: ClaimCounts,
    pub entries: Vec<FactCheckEntry>,
    pub annotations: Vec<Annotation>,
    pub speaker: Option<String>,
    pub source: Option<String>,
}

impl Report {
    pub fn credibility_label(&self) -> &'static str {
        self.credibility.label()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for annotation in &self.annotations {
            writeln!(f, "[{}] {}", annotation.title, annotation.body)?;
        }
        if !self.annotations.is_empty() {
            writeln!(f)?;
        }

        writeln!(
            f,
            "Credibility: {}/100 ({})",
            self.credibility_score,
            self.credibility_label()
        )?;
        writeln!(f, "{}", self.summary)?;
        writeln!(
            f,
            "Claims: {} total, {} verified, {} false, {} unverified",
            self.counts.total, self.counts.verified, self.counts.r#false, self.counts.unverified
        )?;

        for (index, entry) in self.entries.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "{}. {}", index + 1, entry.claim)?;
            write!(f, "   Verdict: {} ({})", entry.class.label(), entry.class.icon())?;
            match entry.confidence {
                Some(confidence) => writeln!(f, ", confidence {confidence}%")?,
                None => writeln!(f)?,
            }
            writeln!(f, "   {}", entry.explanation)?;
            for source in &entry.sources {
                writeln!(f, "   - {source}")?;
            }
            if let Some(url) = &entry.source_url {
                writeln!(f, "   Source: {url}")?;
            }
        }
        Ok(())
    }
}

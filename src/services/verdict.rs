//! Verdict classification.
//!
//! The fact-check service labels claims with free-form verdict strings
//! ("Mostly True", "misleading", "lacks context", ...). Everything that
//! displays or counts verdicts goes through [`classify`] so the two can never
//! disagree about the same raw label.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Normalized form used when a verdict is missing or empty.
pub const DEFAULT_VERDICT: &str = "unverified";

/// Canonical verdict taxonomy.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VerdictClass {
    True,
    False,
    Mixed,
    Deceptive,
    LacksContext,
    Unsubstantiated,
    Unverified,
}

/// Aggregate bucket a verdict class counts towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountBucket {
    Verified,
    False,
    Unverified,
}

impl VerdictClass {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            VerdictClass::True => "True",
            VerdictClass::False => "False",
            VerdictClass::Mixed => "Mixed",
            VerdictClass::Deceptive => "Deceptive",
            VerdictClass::LacksContext => "Lacks Context",
            VerdictClass::Unsubstantiated => "Unsubstantiated",
            VerdictClass::Unverified => "Unverified",
        }
    }

    /// Icon key for front ends that style verdicts.
    pub fn icon(self) -> &'static str {
        match self {
            VerdictClass::True => "check-circle",
            VerdictClass::False => "times-circle",
            VerdictClass::Mixed => "adjust",
            VerdictClass::Deceptive => "exclamation-triangle",
            VerdictClass::LacksContext => "info-circle",
            VerdictClass::Unsubstantiated => "question-circle",
            VerdictClass::Unverified => "question",
        }
    }

    pub fn bucket(self) -> CountBucket {
        match self {
            VerdictClass::True => CountBucket::Verified,
            VerdictClass::False => CountBucket::False,
            _ => CountBucket::Unverified,
        }
    }
}

/// Lower-case, trim, and join whitespace-separated words with `_`.
/// Missing or blank input normalizes to [`DEFAULT_VERDICT`].
pub fn normalize(raw: Option<&str>) -> String {
    let normalized = raw
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_");

    if normalized.is_empty() {
        DEFAULT_VERDICT.to_string()
    } else {
        normalized
    }
}

/// Map a raw verdict label to its canonical class. Total: anything the
/// table does not name is [`VerdictClass::Unverified`].
pub fn classify(raw: Option<&str>) -> VerdictClass {
    match normalize(raw).as_str() {
        "true" | "mostly_true" => VerdictClass::True,
        "mixed" => VerdictClass::Mixed,
        "misleading" | "deceptive" => VerdictClass::Deceptive,
        "lacks_context" => VerdictClass::LacksContext,
        "unsubstantiated" => VerdictClass::Unsubstantiated,
        "mostly_false" | "false" => VerdictClass::False,
        _ => VerdictClass::Unverified,
    }
}

//! Canned transcripts and result payloads.

#![allow(dead_code)]

use serde_json::{json, Value};

/// A typed transcript just over the minimum length.
pub const SHORT_SPEECH: &str =
    "We created ten million jobs last year and cut the deficit in half.";

/// Result payload with one false claim and a 72 credibility score.
pub fn single_false_claim() -> Value {
    json!({
        "credibility_score": 72,
        "fact_checks": [{ "claim": "X", "verdict": "false" }],
    })
}

/// Fully populated result payload with server statistics that disagree
/// with its claims.
pub fn full_result() -> Value {
    json!({
        "credibility_score": 64.5,
        "summary": "Several claims overstate the economic data.",
        "speaker": "Senator Smith",
        "source": "Campaign rally",
        "statistics": {
            "total_claims": 4,
            "verified_claims": 3,
            "false_claims": 0,
            "unverified_claims": 1,
        },
        "fact_checks": [
            {
                "claim": "Ten million jobs were created last year.",
                "verdict": "Mostly True",
                "explanation": "BLS reports 9.6 million.",
                "confidence": 82,
                "sources": ["Bureau of Labor Statistics"],
                "source_url": "https://www.bls.gov/",
            },
            {
                "claim": "The deficit was cut in half.",
                "verdict": "misleading",
                "explanation": "The reduction followed expiring pandemic spending.",
                "confidence": 74,
            },
            {
                "claim": "Crime is at a record low.",
                "verdict": "FALSE",
                "explanation": "Violent crime rose in 2022.",
            },
            {
                "claim": "Our state leads the nation in solar installs.",
            },
        ],
    })
}

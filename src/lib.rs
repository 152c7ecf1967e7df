//! Transcript fact-check client
//!
//! This library submits transcripts to a remote fact-check service, tracks
//! the resulting analysis job through its stages, and renders the finished
//! result as a structured report with canonical verdict classes.

pub mod config;
pub mod models;
pub mod services;
pub mod telemetry;

//! Language-model summarization seam
//!
//! The orchestrator hands every newly stored record to a summarizer.
//! Producing actual summaries is downstream work; no implementation ships
//! here, only the seam the pipeline is built against.

use async_trait::async_trait;
use newswire_core::Record;

/// Errors from a summarizer backend
#[derive(Debug, thiserror::Error)]
pub enum SummarizerError {
    #[error("Summarizer unavailable: {0}")]
    Unavailable(String),

    #[error("Summarization failed: {0}")]
    Failed(String),
}

/// Receives newly ingested records for summarization.
///
/// Failures are reported to the caller but never abort ingestion; a record
/// that was stored stays stored.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Hand one newly stored record to the summarizer.
    async fn ingest(&self, channel: &str, record: &Record) -> Result<(), SummarizerError>;
}

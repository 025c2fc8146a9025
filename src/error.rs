//! Error taxonomy for the monitoring pipeline.
//!
//! Every variant here is recoverable by design: the monitoring loop logs the
//! failure with its stage and cause, skips whatever the failed stage would
//! have produced, and picks up again on the next cycle. Nothing in this
//! enum should ever terminate the process.

use thiserror::Error;

// ---

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Not enough stored samples to build even one training window.
    /// Forecasting is best-effort; ingestion continues regardless.
    #[error("insufficient history: have {have} samples, need at least {need}")]
    InsufficientHistory { have: usize, need: usize },

    /// Model fitting produced non-finite loss or parameters. The forecast
    /// for this cycle is abandoned rather than emitted corrupted.
    #[error("model training failed: {0}")]
    TrainingFailure(String),

    /// Notification dispatch failed. Logged and dropped; no retry policy.
    #[error("alert delivery failed: {0}")]
    DeliveryFailure(String),

    /// The sensor could not produce a reading this cycle. Nothing is
    /// recorded for the cycle.
    #[error("sensor read failed: {0}")]
    SourceReadFailure(String),

    /// Sample store error (append or history query).
    #[error("sample store error: {0}")]
    Store(#[from] sqlx::Error),
}

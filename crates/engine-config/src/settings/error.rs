use thiserror::Error;

/// Invalid run settings, detected before anything is read or written.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("batch_size must be at least 1")]
    ZeroBatchSize,

    #[error("progress_every must be at least 1")]
    ZeroProgressEvery,

    /// Thresholds must satisfy `0 <= acceptable <= degraded <= 1`.
    #[error("Verdict thresholds out of order: acceptable={acceptable}, degraded={degraded}")]
    ThresholdOrder { acceptable: f64, degraded: f64 },

    #[error("Unknown category `{0}` in processing order or references")]
    UnknownCategory(String),

    #[error("Index on `{table}` has no columns")]
    EmptyIndex { table: String },
}

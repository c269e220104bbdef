use connectors::{error::SourceError, sql::base::error::DbError};
use engine_config::{report::migration::MigrationReport, settings::error::SettingsError};
use engine_processing::error::LoadError;
use thiserror::Error;

/// Top-level errors of a migration run.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Writes were requested without a target store.
    #[error("A target connection is required unless the run is a dry run")]
    NoTarget,

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// The source failed while being read.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// The target store failed outside of any single record.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// A fatal error stopped the run; the open transaction was rolled back.
    #[error("Migration aborted: {source}")]
    Aborted {
        #[source]
        source: Box<MigrationError>,
        report: Box<MigrationReport>,
    },
}

impl MigrationError {
    /// The partial report of an aborted run.
    pub fn report(&self) -> Option<&MigrationReport> {
        match self {
            MigrationError::Aborted { report, .. } => Some(report),
            _ => None,
        }
    }
}

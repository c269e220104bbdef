use connectors::sql::base::error::DbError;
use std::path::PathBuf;
use thiserror::Error;

/// Store failures that are not confined to one record and stop the run.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to write batch {batch_id} to table '{table}': {source}")]
    WriteBatch {
        batch_id: usize,
        table: String,
        #[source]
        source: DbError,
    },

    #[error("Failed to prepare table '{table}': {source}")]
    Schema {
        table: String,
        #[source]
        source: DbError,
    },
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize export: {0}")]
    Json(#[from] serde_json::Error),
}

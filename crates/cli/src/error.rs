use connectors::{
    error::SourceError,
    sql::base::error::{ConnectorError, DbError},
};
use engine_config::error::ConfigError;
use engine_processing::error::ExportError;
use engine_runtime::error::MigrationError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to load the configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid environment: {0}")]
    Env(String),

    #[error("No source given: pass --dump or --mysql-url (or set MYSQL_URL)")]
    MissingSource,

    #[error("Failed to open the source: {0}")]
    Source(#[from] SourceError),

    #[error("Failed to connect: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Migration failed: {0}")]
    Migration(#[from] MigrationError),

    #[error("Failed to write categorized records: {0}")]
    Export(#[from] ExportError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Invalid connection format provided: {0}")]
    InvalidConnectionFormat(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}


use crate::sql::base::error::{ConnectorError, DbError};
use dump_syntax::error::EncodingError;
use thiserror::Error;

/// Failures that make a record source unusable.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Dump file missing or unreadable.
    #[error("Dump file error: {0}")]
    Dump(#[from] EncodingError),

    /// Could not connect to the source database.
    #[error("Source connection error: {0}")]
    Connector(#[from] ConnectorError),

    /// The source database failed while streaming rows.
    #[error("Source database error: {0}")]
    Database(#[from] DbError),
}

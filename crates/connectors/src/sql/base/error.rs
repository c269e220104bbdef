use thiserror::Error;

/// All errors coming from the database/query layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// Low-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server rejected one statement. The session is still usable once
    /// the enclosing savepoint is rolled back.
    #[error("{message} (SQLSTATE {code})")]
    Rejected { code: String, message: String },

    /// Transport-level PostgreSQL failure (closed connection, protocol error).
    #[error("PostgreSQL error: {0}")]
    Postgres(tokio_postgres::Error),

    /// MySQL driver error.
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// Transaction control used out of order.
    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<tokio_postgres::Error> for DbError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db) => DbError::Rejected {
                code: db.code().code().to_string(),
                message: db.message().to_string(),
            },
            None => DbError::Postgres(err),
        }
    }
}

impl DbError {
    pub fn rejected(code: &str, message: impl Into<String>) -> Self {
        DbError::Rejected {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            DbError::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }

    /// True when the failure belongs to one statement and the run can go on.
    ///
    /// Connection exceptions (08), resource exhaustion (53), operator
    /// intervention (57) and system errors (58) are not.
    pub fn is_record_level(&self) -> bool {
        match self.code() {
            Some(code) => !["08", "53", "57", "58", "XX"]
                .iter()
                .any(|class| code.starts_with(class)),
            None => false,
        }
    }

    /// Invalid or out-of-range date/time input.
    pub fn is_datetime_violation(&self) -> bool {
        match self {
            DbError::Rejected { code, message } => {
                code == "22007"
                    || code == "22008"
                    || message.contains("date/time")
                    || message.contains("0000-00-00")
            }
            _ => false,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.code() == Some("23505")
    }
}

/// Errors happening during adapter or connection setup.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    #[error("PostgreSQL connection failed: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("MySQL connection failed: {0}")]
    MySql(#[from] mysql_async::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_violation_detection() {
        assert!(DbError::rejected("22008", "date/time field value out of range").is_datetime_violation());
        assert!(DbError::rejected("22007", "invalid input syntax for type timestamp").is_datetime_violation());
        assert!(
            DbError::rejected("22P02", "invalid input value \"0000-00-00\"").is_datetime_violation()
        );
        assert!(!DbError::rejected("23505", "duplicate key").is_datetime_violation());
        assert!(!DbError::Unknown("date/time".into()).is_datetime_violation());
    }

    #[test]
    fn test_record_level_classification() {
        assert!(DbError::rejected("23514", "check violation").is_record_level());
        assert!(DbError::rejected("42703", "undefined column").is_record_level());
        assert!(!DbError::rejected("08006", "connection failure").is_record_level());
        assert!(!DbError::rejected("57P01", "admin shutdown").is_record_level());
        assert!(!DbError::Transaction("no transaction".into()).is_record_level());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A record that could not be carried through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRecord {
    pub id: String,
    pub stage: ProcessingStage,
    pub source_table: Option<String>,
    pub target_table: Option<String>,
    pub line: Option<usize>,
    pub error: FailureError,
    /// Statement that was rejected, when the failure happened on insert.
    pub sql: Option<String>,
    pub values: Vec<String>,
    pub failed_at: DateTime<Utc>,
}

/// The stage of the pipeline where the failure occurred
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    /// Malformed INSERT line or unusable source row
    Parse,

    /// No mapping could be resolved
    Mapping,

    /// Hard validation error
    Validation,

    /// Rejected by the target store
    Load,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureError {
    pub error_type: String,
    pub message: String,
    /// SQLSTATE reported by the target store, if any.
    pub code: Option<String>,
}

impl FailedRecord {
    pub fn new(stage: ProcessingStage, error_type: &str, message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            stage,
            source_table: None,
            target_table: None,
            line: None,
            error: FailureError {
                error_type: error_type.to_string(),
                message: message.into(),
                code: None,
            },
            sql: None,
            values: Vec::new(),
            failed_at: Utc::now(),
        }
    }

    pub fn with_source_table(mut self, table: &str) -> Self {
        self.source_table = Some(table.to_string());
        self
    }

    pub fn with_target_table(mut self, table: &str) -> Self {
        self.target_table = Some(table.to_string());
        self
    }

    pub fn with_line(mut self, line: Option<usize>) -> Self {
        self.line = line;
        self
    }

    pub fn with_code(mut self, code: Option<String>) -> Self {
        self.error.code = code;
        self
    }

    pub fn with_sql(mut self, sql: String) -> Self {
        self.sql = Some(sql);
        self
    }

    pub fn with_values(mut self, values: Vec<String>) -> Self {
        self.values = values;
        self
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingStage::Parse => write!(f, "parse"),
            ProcessingStage::Mapping => write!(f, "mapping"),
            ProcessingStage::Validation => write!(f, "validation"),
            ProcessingStage::Load => write!(f, "load"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_record_creation() {
        let failed = FailedRecord::new(ProcessingStage::Parse, "LexError", "unterminated quote");

        assert_eq!(failed.stage, ProcessingStage::Parse);
        assert_eq!(failed.error.error_type, "LexError");
        assert_eq!(failed.error.message, "unterminated quote");
        assert!(failed.sql.is_none());
        assert!(!failed.id.is_empty());
    }

    #[test]
    fn test_failed_record_with_context() {
        let failed = FailedRecord::new(ProcessingStage::Load, "Rejected", "duplicate key")
            .with_source_table("locataire")
            .with_target_table("tenants")
            .with_line(Some(42))
            .with_code(Some("23505".into()))
            .with_sql("INSERT INTO \"tenants\" ...".into())
            .with_values(vec!["'1'".into()]);

        assert_eq!(failed.source_table.as_deref(), Some("locataire"));
        assert_eq!(failed.target_table.as_deref(), Some("tenants"));
        assert_eq!(failed.line, Some(42));
        assert_eq!(failed.error.code.as_deref(), Some("23505"));
        assert_eq!(failed.values.len(), 1);
    }

    #[test]
    fn test_processing_stage_display() {
        assert_eq!(ProcessingStage::Parse.to_string(), "parse");
        assert_eq!(ProcessingStage::Validation.to_string(), "validation");
        assert_eq!(ProcessingStage::Load.to_string(), "load");
    }
}

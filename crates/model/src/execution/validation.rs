use crate::records::{dump::DumpRecord, row::RowData};
use serde::Serialize;

/// Outcome of validating one source record against its category rules.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub category: String,
    pub original: DumpRecord,
    pub transformed: Option<RowData>,
}

impl ValidationResult {
    pub fn new(category: &str, original: DumpRecord) -> Self {
        ValidationResult {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            category: category.to_string(),
            original,
            transformed: None,
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.is_valid = false;
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

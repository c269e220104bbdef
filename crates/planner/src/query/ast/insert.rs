//! Defines the AST for a single-row INSERT statement.

use model::{core::value::Value, records::row::RowData};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Insert {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Value>,
    pub on_conflict: Option<OnConflict>,
}

/// `ON CONFLICT [(cols)] DO NOTHING`. An empty column list targets any
/// unique constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnConflict {
    pub columns: Vec<String>,
}

impl Insert {
    /// Insert-or-skip for one mapped row.
    pub fn idempotent(row: &RowData) -> Self {
        Insert {
            table: row.entity.clone(),
            columns: row.columns(),
            values: row.values(),
            on_conflict: Some(OnConflict::default()),
        }
    }
}

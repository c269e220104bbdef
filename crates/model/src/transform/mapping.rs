use crate::{
    core::value::FieldValue,
    records::{dump::DumpRecord, row::RowData},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a table mapping came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MappingOrigin {
    /// Hand-authored entry in the mapping configuration.
    Explicit,
    /// Matched the convention table of known legacy names.
    Convention,
    /// Nothing matched; target is `legacy_<table>`.
    Synthesized,
}

impl fmt::Display for MappingOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingOrigin::Explicit => write!(f, "explicit"),
            MappingOrigin::Convention => write!(f, "convention"),
            MappingOrigin::Synthesized => write!(f, "synthesized"),
        }
    }
}

/// Resolved mapping of one source table onto its target table.
///
/// Columns absent from `columns` are dropped when a record is mapped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldMapping {
    pub source_table: String,
    pub target_table: String,
    pub origin: MappingOrigin,
    /// source column -> target column, in first-seen order.
    pub columns: IndexMap<String, String>,
}

impl FieldMapping {
    pub fn new(source_table: &str, target_table: &str, origin: MappingOrigin) -> Self {
        FieldMapping {
            source_table: source_table.to_string(),
            target_table: target_table.to_string(),
            origin,
            columns: IndexMap::new(),
        }
    }

    pub fn target_column(&self, source_column: &str) -> Option<&str> {
        self.columns.get(source_column).map(String::as_str).or_else(|| {
            self.columns
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(source_column))
                .map(|(_, v)| v.as_str())
        })
    }

    /// Target columns in declaration order, without duplicates.
    pub fn target_columns(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.columns.len());
        for target in self.columns.values() {
            if !out.contains(target) {
                out.push(target.clone());
            }
        }
        out
    }

    /// Projects a source record onto the target table.
    ///
    /// When two source columns map to the same target, the first one wins.
    pub fn apply(&self, record: &DumpRecord) -> RowData {
        let mut field_values: Vec<FieldValue> = Vec::with_capacity(record.columns.len());
        for (column, value) in record.pairs() {
            let Some(target) = self.target_column(column) else {
                continue;
            };
            if field_values.iter().any(|f| f.name == target) {
                continue;
            }
            field_values.push(FieldValue::new(target, value.clone()));
        }
        RowData::new(&self.target_table, field_values)
    }
}

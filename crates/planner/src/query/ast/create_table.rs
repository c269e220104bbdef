//! Defines the AST for a CREATE TABLE statement.

use model::core::data_type::InferredColumnType;

#[derive(Debug, Clone, Default)]
pub struct CreateTable {
    pub table: String,
    pub columns: Vec<ColumnDef>,
    pub if_not_exists: bool,
}

/// Nullable, unconstrained column. Keys are added after the load.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: InferredColumnType,
}

impl ColumnDef {
    pub fn new(name: &str, data_type: InferredColumnType) -> Self {
        ColumnDef {
            name: name.to_string(),
            data_type,
        }
    }
}

use crate::query::ast::create_table::ColumnDef;

#[derive(Debug, Clone, PartialEq)]
pub struct AlterTable {
    pub table: String,
    pub action: AlterAction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterAction {
    AddColumns(Vec<ColumnDef>),
    AddPrimaryKey(Vec<String>),
}

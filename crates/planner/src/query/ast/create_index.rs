#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndex {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
}

impl CreateIndex {
    /// Index named `idx_<table>_<col>[_<col>...]`.
    pub fn conventional(table: &str, columns: &[String]) -> Self {
        CreateIndex {
            name: format!("idx_{}_{}", table, columns.join("_")),
            table: table.to_string(),
            columns: columns.to_vec(),
        }
    }
}

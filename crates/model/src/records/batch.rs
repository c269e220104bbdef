use crate::records::row::RowData;

/// A mapped row waiting to be loaded, with enough provenance to report on it.
#[derive(Debug, Clone)]
pub struct PendingRow {
    pub source_table: String,
    pub line: Option<usize>,
    pub row: RowData,
}

/// Rows for one target table, loaded under a single savepoint.
#[derive(Debug, Clone)]
pub struct Batch {
    pub id: usize,
    pub target_table: String,
    pub rows: Vec<PendingRow>,
}

impl Batch {
    pub fn new(id: usize, target_table: &str) -> Self {
        Batch {
            id,
            target_table: target_table.to_string(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: PendingRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

use indexmap::IndexMap;
use model::transform::mapping::MappingOrigin;
use serde::Serialize;

/// Resolved mappings for every table of a dump, as printed by `mapping`.
#[derive(Serialize, Debug, Default, Clone)]
pub struct MappingReport {
    pub totals: MappingTotals,
    pub tables: Vec<TableMappingReport>,
}

#[derive(Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct MappingTotals {
    pub tables: usize,
    pub explicit: usize,
    pub convention: usize,
    pub synthesized: usize,
    pub would_create: usize,
}

/// The mapping of one source table.
#[derive(Serialize, Debug, Clone)]
pub struct TableMappingReport {
    pub source_table: String,
    pub target_table: String,
    pub origin: MappingOrigin,
    pub records: u64,
    /// source column -> target column
    pub columns: IndexMap<String, String>,
    /// Source columns the mapping drops.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropped_columns: Vec<String>,
    /// Inferred types, present only when the table would be created.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub column_types: IndexMap<String, String>,
    /// `None` when no target was consulted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_exists: Option<bool>,
}

impl TableMappingReport {
    pub fn would_create(&self) -> bool {
        self.target_exists != Some(true)
    }
}

impl MappingReport {
    pub fn push(&mut self, table: TableMappingReport) {
        self.totals.tables += 1;
        match table.origin {
            MappingOrigin::Explicit => self.totals.explicit += 1,
            MappingOrigin::Convention => self.totals.convention += 1,
            MappingOrigin::Synthesized => self.totals.synthesized += 1,
        }
        if table.would_create() {
            self.totals.would_create += 1;
        }
        self.tables.push(table);
    }
}

use crate::mapping::{inference::infer_column_type, mapper::SchemaMapper};
use engine_config::report::mapping::{MappingReport, TableMappingReport};
use indexmap::{IndexMap, IndexSet};
use model::records::dump::DumpRecord;
use std::collections::HashSet;

#[derive(Default)]
struct ObservedTable {
    records: u64,
    source_columns: IndexSet<String>,
}

/// Collects what a source would map to without writing anything.
pub struct MappingPreview {
    mapper: SchemaMapper,
    tables: IndexMap<String, ObservedTable>,
}

impl MappingPreview {
    pub fn new(mapper: SchemaMapper) -> Self {
        MappingPreview {
            mapper,
            tables: IndexMap::new(),
        }
    }

    pub fn observe(&mut self, record: &DumpRecord) {
        self.mapper.resolve(record);
        let table = self
            .tables
            .entry(record.source_table.clone())
            .or_default();
        table.records += 1;
        for column in &record.columns {
            if !table.source_columns.contains(column) {
                table.source_columns.insert(column.clone());
            }
        }
    }

    /// Builds the report. `existing` is the set of target tables, when a
    /// target was consulted.
    pub fn finish(self, existing: Option<&HashSet<String>>) -> MappingReport {
        let mut report = MappingReport::default();

        for (source_table, observed) in self.tables {
            let Some(mapping) = self.mapper.mapping(&source_table) else {
                continue;
            };

            let mut columns = IndexMap::new();
            let mut dropped_columns = Vec::new();
            for column in &observed.source_columns {
                match mapping.target_column(column) {
                    Some(target) => {
                        columns.insert(column.clone(), target.to_string());
                    }
                    None => dropped_columns.push(column.clone()),
                }
            }

            let target_exists = existing.map(|tables| tables.contains(&mapping.target_table));
            let column_types = if target_exists == Some(true) {
                IndexMap::new()
            } else {
                mapping
                    .target_columns()
                    .into_iter()
                    .map(|c| {
                        let ty = infer_column_type(&c).sql_name();
                        (c, ty)
                    })
                    .collect()
            };

            report.push(TableMappingReport {
                source_table,
                target_table: mapping.target_table.clone(),
                origin: mapping.origin,
                records: observed.records,
                columns,
                dropped_columns,
                column_types,
                target_exists,
            });
        }

        report
    }
}

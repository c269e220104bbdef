use crate::{
    error::MappingError,
    mapping::naming::{normalize_identifier, synthesized_table_name},
};
use engine_config::config::{ImportConfig, TableMappingConfig, UnmappedColumns};
use indexmap::IndexMap;
use model::{
    records::{dump::DumpRecord, row::RowData},
    transform::mapping::{FieldMapping, MappingOrigin},
};
use std::collections::{HashMap, hash_map::Entry};
use tracing::{debug, info};

/// What resolving one record changed in the mapping cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingUpdate {
    /// The mapping was resolved for the first time in this run.
    pub is_new: bool,
    /// Target columns added to an already cached mapping.
    pub added_columns: Vec<String>,
}

/// Resolves source tables to target tables and keeps the result for the run.
///
/// Explicit mappings win, then the convention table, then `legacy_<table>`.
/// A resolved mapping never changes target table within a run; mappings that
/// carry source columns through may only grow.
pub struct SchemaMapper {
    explicit: IndexMap<String, TableMappingConfig>,
    conventions: IndexMap<String, String>,
    cache: HashMap<String, FieldMapping>,
}

impl SchemaMapper {
    pub fn new(
        explicit: IndexMap<String, TableMappingConfig>,
        conventions: IndexMap<String, String>,
    ) -> Self {
        SchemaMapper {
            explicit,
            conventions,
            cache: HashMap::new(),
        }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(config.mappings.clone(), config.conventions.clone())
    }

    pub fn mapping(&self, source_table: &str) -> Option<&FieldMapping> {
        self.cache.get(source_table)
    }

    /// Resolves (and caches) the mapping for the record's table, extending it
    /// with any source columns it carries through but has not seen yet.
    pub fn resolve(&mut self, record: &DumpRecord) -> (&FieldMapping, MappingUpdate) {
        let table = record.source_table.as_str();
        let explicit = self.explicit.get(table);
        let passthrough =
            explicit.is_none_or(|e| e.unmapped == UnmappedColumns::Passthrough);
        let mut update = MappingUpdate::default();

        let mapping = match self.cache.entry(table.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let (target, origin) = resolve_target(&self.explicit, &self.conventions, table);
                let mut mapping = FieldMapping::new(table, &target, origin);
                if let Some(explicit) = explicit {
                    mapping.columns = explicit.columns.clone();
                }
                info!(source = table, target = %target, origin = %origin, "Resolved table mapping");
                update.is_new = true;
                entry.insert(mapping)
            }
        };

        if passthrough {
            for column in &record.columns {
                if mapping.target_column(column).is_some() {
                    continue;
                }
                let target = normalize_identifier(column);
                mapping.columns.insert(column.clone(), target.clone());
                if !update.is_new {
                    debug!(source = table, column = %column, "Extending mapping with new column");
                    update.added_columns.push(target);
                }
            }
        }

        (mapping, update)
    }

    /// Projects the record onto its target table.
    pub fn map(&mut self, record: &DumpRecord) -> Result<(RowData, MappingUpdate), MappingError> {
        let (mapping, update) = self.resolve(record);
        let row = mapping.apply(record);
        if row.field_values.is_empty() {
            return Err(MappingError::NoColumns {
                source_table: record.source_table.clone(),
                target_table: mapping.target_table.clone(),
            });
        }
        Ok((row, update))
    }
}

fn resolve_target(
    explicit: &IndexMap<String, TableMappingConfig>,
    conventions: &IndexMap<String, String>,
    source_table: &str,
) -> (String, MappingOrigin) {
    if let Some(explicit) = explicit.get(source_table) {
        return (explicit.target.clone(), MappingOrigin::Explicit);
    }
    if let Some(target) = conventions.get(source_table) {
        return (target.clone(), MappingOrigin::Convention);
    }
    (
        synthesized_table_name(source_table),
        MappingOrigin::Synthesized,
    )
}

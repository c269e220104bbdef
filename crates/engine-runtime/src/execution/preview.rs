use crate::error::MigrationError;
use connectors::{
    source::{RecordSource, SourceEvent},
    sql::base::destination::TargetStore,
};
use engine_config::{
    config::ImportConfig, report::mapping::MappingReport, settings::MigrationSettings,
};
use engine_core::mapping::{mapper::SchemaMapper, preview::MappingPreview};
use tracing::info;

/// Reads the whole source and reports how each table would be mapped.
/// When a target is given its existing tables are consulted; nothing is written.
pub async fn preview_mapping(
    source: &mut dyn RecordSource,
    target: Option<&dyn TargetStore>,
    config: &ImportConfig,
    settings: &MigrationSettings,
) -> Result<MappingReport, MigrationError> {
    let existing = match target {
        Some(store) => Some(store.list_tables().await?),
        None => None,
    };

    let mut preview = MappingPreview::new(SchemaMapper::from_config(config));
    while let Some(event) = source.next_event().await? {
        if let SourceEvent::Record(record) = event
            && settings.allows(&record.source_table.to_lowercase())
        {
            preview.observe(&record);
        }
    }

    let report = preview.finish(existing.as_ref());
    info!(
        tables = report.totals.tables,
        would_create = report.totals.would_create,
        "Mapping preview ready"
    );
    Ok(report)
}

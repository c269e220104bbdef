use crate::{error::MigrationError, execution::ordering::CategoryQueue};
use connectors::source::{RecordSource, SourceEvent};
use engine_config::{
    config::ImportConfig, report::validation::ValidationReport, settings::MigrationSettings,
};
use engine_core::mapping::mapper::SchemaMapper;
use engine_processing::{export::CategorizedExport, validation::Validator};
use model::records::row::RowData;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of validating a source without loading it.
#[derive(Debug, Default)]
pub struct CategorizeOutcome {
    pub report: ValidationReport,
    pub export: CategorizedExport,
    /// Records that belong to no category; they are neither validated nor exported.
    pub uncategorized: u64,
    pub malformed: u64,
    pub interrupted: bool,
}

/// Sorts every record of `source` into its category, validates categories in
/// processing order and keeps the valid records, in their mapped form, for export.
pub async fn categorize(
    source: &mut dyn RecordSource,
    config: &ImportConfig,
    settings: &MigrationSettings,
    cancel: CancellationToken,
) -> Result<CategorizeOutcome, MigrationError> {
    let mut validator = Validator::new(config.validation.clone());
    let mut mapper = SchemaMapper::from_config(config);
    let mut queue = CategoryQueue::<Option<RowData>>::default();
    let mut outcome = CategorizeOutcome::default();

    info!(location = %source.describe().location, "Categorizing source records");
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                outcome.interrupted = true;
                break;
            }
            event = source.next_event() => event?,
        };
        let record = match event {
            None => break,
            Some(SourceEvent::Malformed { line, error, .. }) => {
                debug!(line, %error, "Skipping malformed line");
                outcome.malformed += 1;
                continue;
            }
            Some(SourceEvent::Record(record)) => record,
        };
        if !settings.allows(&record.source_table.to_lowercase()) {
            continue;
        }

        match validator.category_of(&record.source_table) {
            Some(category) => {
                let row = mapper.map(&record).ok().map(|(row, _)| row);
                queue.push(Some(category), record, row);
            }
            None => outcome.uncategorized += 1,
        }
    }

    if outcome.uncategorized > 0 {
        warn!(records = outcome.uncategorized, "Records without a category were skipped");
    }

    let ordered = queue.into_ordered(|category| validator.rank(category));
    for (category, record, row) in ordered {
        let Some(category) = category else {
            continue;
        };
        let mut result = validator.validate(&category, record);
        result.transformed = row;
        outcome.report.record(&result);
        outcome.export.push(&result);
    }
    outcome.report.finish();

    info!(
        total = outcome.report.total_records,
        valid = outcome.report.valid_records,
        invalid = outcome.report.invalid_records,
        warnings = outcome.report.warnings_count,
        "Categorization finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::file::dump::source::DumpSource;

    const DUMP: &str = "\
INSERT INTO `contrat` (`id`,`local_id`,`locataire_id`,`date_debut`,`loyer`) VALUES (1,3,10,'2020-01-01','650,00');
INSERT INTO `locataire` (`id`,`prenom`,`nom`) VALUES (10,'Marie','Curie'),(11,'','Nobody');
INSERT INTO `historique` (`id`,`objet`) VALUES (1,'Relance');
INSERT INTO `locataire` (`id`,`prenom`) VALUES (12);
";

    #[tokio::test]
    async fn test_categorize_validates_and_exports() {
        let config = ImportConfig::bundled().unwrap();
        let mut source = DumpSource::from_text("dump.sql", DUMP);

        let outcome = categorize(
            &mut source,
            &config,
            &MigrationSettings::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.uncategorized, 1);
        assert_eq!(outcome.malformed, 1);
        assert!(!outcome.interrupted);

        let report = &outcome.report;
        assert_eq!(report.total_records, 3);
        assert_eq!(report.valid_records, 2);
        let order: Vec<&String> = report.by_category.keys().collect();
        assert_eq!(order, vec!["locataires", "contrats"]);
        // the tenant was validated before the contract that references it
        assert_eq!(report.by_category["contrats"].invalid, 0);

        assert_eq!(outcome.export.len("locataires"), 1);
        assert_eq!(outcome.export.len("contrats"), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let config = ImportConfig::bundled().unwrap();
        let mut source = DumpSource::from_text("dump.sql", DUMP);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = categorize(&mut source, &config, &MigrationSettings::default(), cancel)
            .await
            .unwrap();
        assert!(outcome.interrupted);
        assert_eq!(outcome.report.total_records, 0);
    }
}

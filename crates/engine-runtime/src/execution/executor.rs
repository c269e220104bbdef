use crate::{error::MigrationError, execution::ordering::CategoryQueue};
use connectors::{
    source::{RecordSource, SourceDescriptor, SourceEvent},
    sql::base::destination::TargetStore,
};
use engine_config::{
    config::ImportConfig,
    report::{
        finding::Finding,
        migration::{MigrationReport, RunStatus, SourceInfo},
        validation::ValidationReport,
    },
    settings::MigrationSettings,
};
use engine_core::{
    mapping::mapper::{MappingUpdate, SchemaMapper},
    stats::MigrationStats,
};
use engine_processing::{
    loader::{BatchLoader, RowOutcome},
    schema::SchemaManager,
    validation::Validator,
};
use model::{
    execution::failed_row::{FailedRecord, ProcessingStage},
    records::{
        batch::{Batch, PendingRow},
        dump::DumpRecord,
        row::RowData,
    },
};
use std::{collections::HashSet, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Streams `source` into `target` and returns the run report.
///
/// Without a target the run must be a dry run: mappings are resolved and
/// tables planned, nothing is written. A fatal error rolls back the open
/// transaction and comes back as [`MigrationError::Aborted`], carrying the
/// partial report. Cancellation stops reading, drops the batch being
/// assembled and commits what was already written.
pub async fn run(
    source: &mut dyn RecordSource,
    target: Option<Arc<dyn TargetStore>>,
    config: &ImportConfig,
    settings: MigrationSettings,
    cancel: CancellationToken,
) -> Result<MigrationReport, MigrationError> {
    settings.validate()?;
    if !settings.dry_run && target.is_none() {
        return Err(MigrationError::NoTarget);
    }

    MigrationExecutor::new(source.describe(), target, config, settings, cancel)
        .await?
        .execute(source)
        .await
}

enum Next {
    Event(SourceEvent),
    Exhausted,
    Cancelled,
}

struct MigrationExecutor<'a> {
    config: &'a ImportConfig,
    settings: MigrationSettings,
    cancel: CancellationToken,
    descriptor: SourceDescriptor,
    target: Option<Arc<dyn TargetStore>>,
    loader: Option<BatchLoader>,
    mapper: SchemaMapper,
    schema: SchemaManager,
    validator: Validator,
    stats: MigrationStats,
    batch: Option<Batch>,
    next_batch_id: usize,
    flushed_since_commit: usize,
    in_transaction: bool,
    loaded_tables: HashSet<String>,
}

impl<'a> MigrationExecutor<'a> {
    async fn new(
        descriptor: SourceDescriptor,
        target: Option<Arc<dyn TargetStore>>,
        config: &'a ImportConfig,
        settings: MigrationSettings,
        cancel: CancellationToken,
    ) -> Result<Self, MigrationError> {
        let schema = match &target {
            Some(store) => SchemaManager::load(store.as_ref(), settings.dry_run).await?,
            None => SchemaManager::new(HashSet::new(), true),
        };
        let loader = target
            .clone()
            .filter(|_| !settings.dry_run)
            .map(BatchLoader::new);

        let source_info = SourceInfo {
            kind: descriptor.kind.to_string(),
            location: descriptor.location.clone(),
            encoding: descriptor.encoding.clone(),
        };
        let mut stats = MigrationStats::new(source_info, &settings);
        if descriptor.lossy {
            stats.add_finding(Finding::new_lossy_decode(&descriptor.location));
        }

        Ok(MigrationExecutor {
            config,
            mapper: SchemaMapper::from_config(config),
            validator: Validator::new(config.validation.clone()),
            settings,
            cancel,
            descriptor,
            target,
            loader,
            schema,
            stats,
            batch: None,
            next_batch_id: 0,
            flushed_since_commit: 0,
            in_transaction: false,
            loaded_tables: HashSet::new(),
        })
    }

    async fn execute(mut self, source: &mut dyn RecordSource) -> Result<MigrationReport, MigrationError> {
        info!(
            run_id = %self.stats.report().run_id,
            source = %self.descriptor.kind,
            location = %self.descriptor.location,
            dry_run = self.settings.dry_run,
            validate = self.settings.validate,
            batch_size = self.settings.batch_size,
            "Starting migration"
        );

        match self.drive(source).await {
            Ok(status) => Ok(self.stats.finish(status, &self.config.thresholds)),
            Err(err) => {
                error!(error = %err, "Migration aborted, rolling back the open transaction");
                self.rollback().await;
                let report = self.stats.finish(RunStatus::Aborted, &self.config.thresholds);
                Err(MigrationError::Aborted {
                    source: Box::new(err),
                    report: Box::new(report),
                })
            }
        }
    }

    async fn drive(&mut self, source: &mut dyn RecordSource) -> Result<RunStatus, MigrationError> {
        let mut queue = self.settings.validate.then(CategoryQueue::<RowData>::default);

        loop {
            let event = match self.next(source).await? {
                Next::Event(event) => event,
                Next::Exhausted => break,
                Next::Cancelled => return self.interrupt().await,
            };

            if let Some((record, row)) = self.admit(event).await? {
                match queue.as_mut() {
                    Some(queue) => {
                        let category = self.validator.category_of(&record.source_table);
                        queue.push(category, record, row);
                    }
                    None => self.enqueue(record, row).await?,
                }
            }
            self.stats.maybe_log_progress();
        }

        if let Some(queue) = queue
            && self.load_validated(queue).await?
        {
            return self.interrupt().await;
        }
        self.complete().await
    }

    async fn next(&self, source: &mut dyn RecordSource) -> Result<Next, MigrationError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Ok(Next::Cancelled),
            event = source.next_event() => Ok(event?.map_or(Next::Exhausted, Next::Event)),
        }
    }

    /// Counts the event and maps it. `None` when the record is filtered out
    /// or already accounted for as a failure.
    async fn admit(&mut self, event: SourceEvent) -> Result<Option<(DumpRecord, RowData)>, MigrationError> {
        match event {
            SourceEvent::Malformed {
                line,
                table,
                error,
                text,
            } => {
                if table.as_deref().is_some_and(|t| !self.allows(t)) {
                    return Ok(None);
                }
                self.stats.record_seen(table.as_deref());

                let mut failed = FailedRecord::new(ProcessingStage::Parse, error.kind(), error.to_string())
                    .with_line(Some(line))
                    .with_sql(text);
                if let Some(table) = &table {
                    failed = failed.with_source_table(table);
                }
                self.stats.record_failure(&failed);
                Ok(None)
            }
            SourceEvent::Record(record) => {
                if !self.allows(&record.source_table) {
                    return Ok(None);
                }
                self.stats.record_seen(Some(&record.source_table));

                match self.mapper.map(&record) {
                    Ok((row, update)) => {
                        self.apply_update(&record.source_table, &update).await?;
                        Ok(Some((record, row)))
                    }
                    Err(err) => {
                        if let Some(mapping) = self.mapper.mapping(&record.source_table) {
                            self.stats
                                .set_mapping(&record.source_table, &mapping.target_table, mapping.origin);
                        }
                        let failed = FailedRecord::new(ProcessingStage::Mapping, "MappingError", err.to_string())
                            .with_source_table(&record.source_table)
                            .with_line(record.line)
                            .with_values(record.value_strings());
                        self.stats.record_failure(&failed);
                        Ok(None)
                    }
                }
            }
        }
    }

    fn allows(&self, source_table: &str) -> bool {
        self.settings.allows(&source_table.to_lowercase())
    }

    /// Creates or widens the target table after the mapper learned something new.
    async fn apply_update(&mut self, source_table: &str, update: &MappingUpdate) -> Result<(), MigrationError> {
        if !update.is_new && update.added_columns.is_empty() {
            return Ok(());
        }
        self.begin_if_needed().await?;

        let Some(mapping) = self.mapper.mapping(source_table) else {
            return Ok(());
        };
        let store = self.target.as_deref();

        if update.is_new {
            self.stats
                .set_mapping(source_table, &mapping.target_table, mapping.origin);
            if let Some(finding) = self.schema.ensure_table(store, mapping).await? {
                self.stats.add_finding(finding);
            }
        }
        if !update.added_columns.is_empty()
            && let Some(finding) = self
                .schema
                .add_columns(store, &mapping.target_table, &update.added_columns)
                .await?
        {
            self.stats.add_finding(finding);
        }
        Ok(())
    }

    async fn enqueue(&mut self, record: DumpRecord, row: RowData) -> Result<(), MigrationError> {
        if self.loader.is_none() {
            // dry run: counted as if written
            self.stats.record_loaded(&record.source_table, true);
            return Ok(());
        }

        if self
            .batch
            .as_ref()
            .is_some_and(|batch| batch.target_table != row.entity)
        {
            self.flush().await?;
        }

        let next_id = &mut self.next_batch_id;
        let batch = self.batch.get_or_insert_with(|| {
            *next_id += 1;
            Batch::new(*next_id, &row.entity)
        });
        batch.push(PendingRow {
            source_table: record.source_table,
            line: record.line,
            row,
        });

        if batch.len() >= self.settings.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), MigrationError> {
        let Some(batch) = self.batch.take().filter(|b| !b.is_empty()) else {
            return Ok(());
        };
        self.begin_if_needed().await?;

        let Some(loader) = &self.loader else {
            return Ok(());
        };
        let outcome = loader.load(&batch).await?;
        if outcome.isolated {
            debug!(
                batch_id = batch.id,
                table = %batch.target_table,
                failed = outcome.failed(),
                "Batch loaded row by row"
            );
        }

        for row in outcome.rows {
            let written = match row.outcome {
                RowOutcome::Inserted => true,
                RowOutcome::Duplicate => false,
                RowOutcome::Failed(failed) => {
                    self.stats.record_failure(&failed);
                    continue;
                }
            };
            self.stats.record_loaded(&row.source_table, written);
            if !self.loaded_tables.contains(&batch.target_table) {
                self.loaded_tables.insert(batch.target_table.clone());
            }
        }

        self.flushed_since_commit += 1;
        if self.settings.commit_interval > 0 && self.flushed_since_commit >= self.settings.commit_interval {
            self.commit().await?;
        }
        Ok(())
    }

    /// Validates the held-back records category by category and loads the
    /// valid ones. Returns `true` when cancelled part way.
    async fn load_validated(&mut self, queue: CategoryQueue<RowData>) -> Result<bool, MigrationError> {
        info!(records = queue.len(), "Validating records in processing order");
        let mut report = ValidationReport::default();
        let mut cancelled = false;

        let validator = &self.validator;
        let ordered = queue.into_ordered(|category| validator.rank(category));
        for (category, record, row) in ordered {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let Some(category) = category else {
                self.enqueue(record, row).await?;
                continue;
            };
            let result = self.validator.validate(&category, record);
            report.record(&result);
            if result.is_valid {
                self.enqueue(result.original, row).await?;
            } else {
                let failed = FailedRecord::new(
                    ProcessingStage::Validation,
                    "ValidationError",
                    result.errors.join("; "),
                )
                .with_source_table(&result.original.source_table)
                .with_line(result.original.line)
                .with_values(result.original.value_strings());
                self.stats.record_failure(&failed);
            }
        }

        report.finish();
        info!(
            valid = report.valid_records,
            invalid = report.invalid_records,
            warnings = report.warnings_count,
            "Validation finished"
        );
        self.stats.report_mut().validation = Some(report);
        Ok(cancelled)
    }

    async fn complete(&mut self) -> Result<RunStatus, MigrationError> {
        self.flush().await?;
        self.finalize_schema().await?;
        self.commit().await?;
        Ok(RunStatus::Completed)
    }

    async fn interrupt(&mut self) -> Result<RunStatus, MigrationError> {
        let discarded = self.batch.take().map_or(0, |batch| batch.len());
        warn!(discarded, "Migration interrupted, committing rows already written");
        self.finalize_schema().await?;
        self.commit().await?;
        Ok(RunStatus::Interrupted)
    }

    /// Keys the resolved tables and builds indexes, so a later run can tell
    /// which rows are already there.
    async fn finalize_schema(&mut self) -> Result<(), MigrationError> {
        let Some(store) = self.writer() else {
            return Ok(());
        };
        self.begin_if_needed().await?;
        let findings = self
            .schema
            .finalize(store.as_ref(), &self.config.indexes, &self.loaded_tables)
            .await?;
        for finding in findings {
            self.stats.add_finding(finding);
        }
        Ok(())
    }

    /// The target, unless this is a dry run.
    fn writer(&self) -> Option<Arc<dyn TargetStore>> {
        self.target.clone().filter(|_| !self.settings.dry_run)
    }

    async fn begin_if_needed(&mut self) -> Result<(), MigrationError> {
        if self.in_transaction {
            return Ok(());
        }
        if let Some(store) = self.writer() {
            store.begin().await?;
            self.in_transaction = true;
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), MigrationError> {
        if !self.in_transaction {
            return Ok(());
        }
        if let Some(store) = self.writer() {
            store.commit().await?;
            debug!(batches = self.flushed_since_commit, "Committed");
        }
        self.in_transaction = false;
        self.flushed_since_commit = 0;
        Ok(())
    }

    async fn rollback(&mut self) {
        if !self.in_transaction {
            return;
        }
        if let Some(store) = self.writer()
            && let Err(err) = store.rollback().await
        {
            warn!(error = %err, "Rollback failed");
        }
        self.in_transaction = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::{file::dump::source::DumpSource, memory::MemoryStore};
    use engine_config::report::verdict::Verdict;
    use model::core::{data_type::InferredColumnType, value::Value};
    use tracing_test::traced_test;

    const HISTORY: &str = "\
INSERT INTO `historique` (`id`,`date`,`objet`,`locataire_id`) VALUES (1,'2021-03-04 10:00:00','Relance',12),(2,'0000-00-00 00:00:00','Bail',12);
INSERT INTO `historique` (`id`,`date`,`objet`,`locataire_id`) VALUES (3,'2021-03-05 08:30:00','Quittance',NULL);
";

    fn config() -> ImportConfig {
        ImportConfig::bundled().unwrap()
    }

    fn settings() -> MigrationSettings {
        MigrationSettings {
            batch_size: 2,
            ..Default::default()
        }
    }

    fn source(text: &str) -> DumpSource {
        DumpSource::from_text("test.sql", text)
    }

    async fn migrate(
        text: &str,
        store: Arc<MemoryStore>,
        settings: MigrationSettings,
    ) -> Result<MigrationReport, MigrationError> {
        let config = config();
        run(
            &mut source(text),
            Some(store as Arc<dyn TargetStore>),
            &config,
            settings,
            CancellationToken::new(),
        )
        .await
    }

    #[traced_test]
    #[tokio::test]
    async fn test_history_is_loaded_into_a_created_table() {
        let store = Arc::new(MemoryStore::new());
        let report = migrate(HISTORY, store.clone(), settings()).await.unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.totals.seen, 3);
        assert_eq!(report.totals.inserted, 3);
        assert_eq!(report.verdict, Verdict::Clean);
        assert_eq!(report.tables["historique"].target.as_deref(), Some("audit_logs"));

        assert_eq!(store.row_count("audit_logs").await.unwrap(), 3);
        assert_eq!(
            store.column_type("audit_logs", "date").await,
            Some(InferredColumnType::Timestamp)
        );
        assert_eq!(store.column_values("audit_logs", "date").await[1], Value::Null);
        assert_eq!(store.primary_key("audit_logs").await, Some(vec!["id".to_string()]));
        assert_eq!(store.indexes("audit_logs").await.len(), 2);
        assert!(!store.in_transaction().await);
        assert!(logs_contain("Starting migration"));
    }

    #[tokio::test]
    async fn test_second_run_only_finds_duplicates() {
        let store = Arc::new(MemoryStore::new());
        migrate(HISTORY, store.clone(), settings()).await.unwrap();
        let report = migrate(HISTORY, store.clone(), settings()).await.unwrap();

        assert_eq!(report.totals.inserted, 0);
        assert_eq!(report.totals.duplicates, 3);
        assert_eq!(report.totals.failed, 0);
        assert_eq!(store.row_count("audit_logs").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_bad_row_fails_alone() {
        let store = Arc::new(
            MemoryStore::new()
                .reject_value("audit_logs", "objet", "Bail")
                .await,
        );
        let report = migrate(HISTORY, store.clone(), settings()).await.unwrap();

        assert_eq!(report.totals.inserted, 2);
        assert_eq!(report.totals.insert_failures, 1);
        let first = report.first_error.as_ref().unwrap();
        assert_eq!(first.code.as_deref(), Some("23514"));
        assert_eq!(first.line, Some(1));
        assert_eq!(store.row_count("audit_logs").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_malformed_line_is_a_parse_failure() {
        let text = "INSERT INTO `historique` (`id`,`objet`) VALUES (1,'ok');\n\
                    INSERT INTO `historique` (`id`,`objet`) VALUES (2);\n";
        let store = Arc::new(MemoryStore::new());
        let report = migrate(text, store.clone(), settings()).await.unwrap();

        assert_eq!(report.totals.seen, 2);
        assert_eq!(report.totals.parse_failures, 1);
        assert_eq!(report.totals.inserted, 1);
        assert_eq!(report.tables["historique"].failed, 1);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let settings = MigrationSettings {
            dry_run: true,
            ..settings()
        };
        let report = migrate(HISTORY, store.clone(), settings).await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.totals.successful, 3);
        assert_eq!(store.mutation_count().await, 0);
        assert!(store.list_tables().await.unwrap().is_empty());
        assert!(
            report
                .findings
                .iter()
                .any(|f| f.code == "TABLE_WOULD_CREATE")
        );
    }

    #[tokio::test]
    async fn test_dry_run_needs_no_target() {
        let config = config();
        let dry = MigrationSettings {
            dry_run: true,
            ..settings()
        };
        let report = run(&mut source(HISTORY), None, &config, dry, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.totals.seen, 3);

        let err = run(&mut source(HISTORY), None, &config, settings(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::NoTarget));
    }

    #[tokio::test]
    async fn test_only_tables_filters_records() {
        let text = format!("{HISTORY}INSERT INTO `compteur` (`id`,`montant`) VALUES (1,'3.5');\n");
        let store = Arc::new(MemoryStore::new());
        let settings = settings().with_only_tables(["COMPTEUR"]);
        let report = migrate(&text, store.clone(), settings).await.unwrap();

        assert_eq!(report.totals.seen, 1);
        assert!(!report.tables.contains_key("historique"));
        assert_eq!(store.row_count("legacy_compteur").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_validation_loads_parents_first() {
        let text = "\
INSERT INTO `contrat` (`id`,`local_id`,`locataire_id`,`date_debut`,`loyer`) VALUES (1,3,10,'2020-01-01','650,00');
INSERT INTO `contrat` (`id`,`local_id`,`locataire_id`,`date_debut`,`loyer`) VALUES (2,3,10,'2020-01-01','-5');
INSERT INTO `locataire` (`id`,`prenom`,`nom`) VALUES (10,'Marie','Curie');
";
        let store = Arc::new(MemoryStore::new());
        let settings = MigrationSettings {
            validate: true,
            ..settings()
        };
        let report = migrate(text, store.clone(), settings).await.unwrap();

        let validation = report.validation.as_ref().unwrap();
        assert_eq!(validation.valid_records, 2);
        assert_eq!(validation.invalid_records, 1);
        let tenants = validation.by_category.get_index(0).unwrap();
        assert_eq!(tenants.0, "locataires");

        assert_eq!(report.totals.validation_failures, 1);
        assert_eq!(report.totals.inserted, 2);
        assert_eq!(store.row_count("tenants").await.unwrap(), 1);
        assert_eq!(store.row_count("contracts").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_run_commits_written_batches() {
        let store = Arc::new(MemoryStore::new());
        let config = config();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = run(
            &mut source(HISTORY),
            Some(store.clone() as Arc<dyn TargetStore>),
            &config,
            settings(),
            cancel,
        )
        .await
        .unwrap();

        assert_eq!(report.status, RunStatus::Interrupted);
        assert_eq!(report.totals.seen, 0);
        assert!(!store.in_transaction().await);
    }

    #[tokio::test]
    async fn test_lost_session_aborts_with_report() {
        let store = Arc::new(MemoryStore::new());
        // an open transaction makes the executor's BEGIN fail
        store.begin().await.unwrap();

        let err = migrate(HISTORY, store.clone(), settings()).await.unwrap_err();
        let report = err.report().unwrap();
        assert_eq!(report.status, RunStatus::Aborted);
        assert_eq!(report.totals.seen, 1);
        assert_eq!(report.totals.inserted, 0);
    }
}

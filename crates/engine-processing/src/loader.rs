use crate::error::LoadError;
use connectors::sql::base::{destination::TargetStore, error::DbError};
use dump_syntax::sentinel::is_zero_date_value;
use model::{
    execution::failed_row::{FailedRecord, ProcessingStage},
    records::batch::{Batch, PendingRow},
};
use planner::query::{ast::insert::Insert, to_sql};
use std::{sync::Arc, time::Instant};
use tracing::debug;

const BATCH_SAVEPOINT: &str = "sp_batch";
const ROW_SAVEPOINT: &str = "sp_row";

#[derive(Debug)]
pub enum RowOutcome {
    Inserted,
    /// Skipped by `ON CONFLICT DO NOTHING`.
    Duplicate,
    Failed(Box<FailedRecord>),
}

#[derive(Debug)]
pub struct LoadedRow {
    pub source_table: String,
    pub outcome: RowOutcome,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// One entry per row of the batch, in batch order.
    pub rows: Vec<LoadedRow>,
    /// The batch statement set failed and rows were retried one by one.
    pub isolated: bool,
}

impl BatchOutcome {
    fn count(&self, pred: impl Fn(&RowOutcome) -> bool) -> usize {
        self.rows.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn inserted(&self) -> usize {
        self.count(|o| matches!(o, RowOutcome::Inserted))
    }

    pub fn duplicates(&self) -> usize {
        self.count(|o| matches!(o, RowOutcome::Duplicate))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RowOutcome::Failed(_)))
    }
}

/// Writes batches into the target inside the caller's transaction.
///
/// A batch runs under one savepoint. When any row is rejected the savepoint
/// is rolled back and every row is replayed under its own savepoint, so a bad
/// row only ever costs itself. Rows rejected for a date/time violation get a
/// second attempt with zero-date values nulled.
pub struct BatchLoader {
    store: Arc<dyn TargetStore>,
}

impl BatchLoader {
    pub fn new(store: Arc<dyn TargetStore>) -> Self {
        BatchLoader { store }
    }

    pub async fn load(&self, batch: &Batch) -> Result<BatchOutcome, LoadError> {
        let start = Instant::now();
        let fatal = |source: DbError| LoadError::WriteBatch {
            batch_id: batch.id,
            table: batch.target_table.clone(),
            source,
        };
        let store = self.store.as_ref();

        store.savepoint(BATCH_SAVEPOINT).await.map_err(fatal)?;

        let mut written = Vec::with_capacity(batch.len());
        let mut rejected = None;
        for pending in &batch.rows {
            match store.insert(&Insert::idempotent(&pending.row)).await {
                Ok(n) => written.push(n),
                Err(err) if err.is_record_level() => {
                    rejected = Some(err);
                    break;
                }
                Err(err) => return Err(fatal(err)),
            }
        }

        let Some(err) = rejected else {
            store.release(BATCH_SAVEPOINT).await.map_err(fatal)?;
            let rows = batch
                .rows
                .iter()
                .zip(written)
                .map(|(pending, n)| LoadedRow {
                    source_table: pending.source_table.clone(),
                    outcome: written_outcome(n),
                })
                .collect();
            debug!(
                batch_id = batch.id,
                table = %batch.target_table,
                rows = batch.len(),
                duration_ms = start.elapsed().as_millis(),
                "Batch written"
            );
            return Ok(BatchOutcome {
                rows,
                isolated: false,
            });
        };

        debug!(
            batch_id = batch.id,
            table = %batch.target_table,
            error = %err,
            "Batch rejected, replaying rows one by one"
        );
        store.rollback_to(BATCH_SAVEPOINT).await.map_err(fatal)?;
        store.release(BATCH_SAVEPOINT).await.map_err(fatal)?;

        let mut rows = Vec::with_capacity(batch.len());
        for pending in &batch.rows {
            let outcome = self
                .load_row(pending, &batch.target_table)
                .await
                .map_err(fatal)?;
            rows.push(LoadedRow {
                source_table: pending.source_table.clone(),
                outcome,
            });
        }

        Ok(BatchOutcome {
            rows,
            isolated: true,
        })
    }

    async fn load_row(&self, pending: &PendingRow, table: &str) -> Result<RowOutcome, DbError> {
        let store = self.store.as_ref();
        store.savepoint(ROW_SAVEPOINT).await?;

        let mut insert = Insert::idempotent(&pending.row);
        let mut result = store.insert(&insert).await;

        let datetime = matches!(&result, Err(err) if err.is_datetime_violation());
        if datetime {
            let (scrubbed, changed) = pending.row.with_nulled(is_zero_date_value);
            if changed {
                debug!(table, line = ?pending.line, "Retrying row with zero dates nulled");
                store.rollback_to(ROW_SAVEPOINT).await?;
                insert = Insert::idempotent(&scrubbed);
                result = store.insert(&insert).await;
            }
        }

        match result {
            Ok(n) => {
                store.release(ROW_SAVEPOINT).await?;
                Ok(written_outcome(n))
            }
            Err(err) if err.is_record_level() => {
                store.rollback_to(ROW_SAVEPOINT).await?;
                store.release(ROW_SAVEPOINT).await?;
                Ok(RowOutcome::Failed(Box::new(self.failed_record(
                    pending, table, &insert, &err,
                ))))
            }
            Err(err) => Err(err),
        }
    }

    fn failed_record(
        &self,
        pending: &PendingRow,
        table: &str,
        insert: &Insert,
        err: &DbError,
    ) -> FailedRecord {
        FailedRecord::new(ProcessingStage::Load, error_type(err), err.to_string())
            .with_source_table(&pending.source_table)
            .with_target_table(table)
            .with_line(pending.line)
            .with_code(err.code().map(String::from))
            .with_sql(to_sql(insert, self.store.dialect()))
            .with_values(insert.values.iter().map(|v| v.to_string()).collect())
    }
}

fn written_outcome(rows: u64) -> RowOutcome {
    if rows == 0 {
        RowOutcome::Duplicate
    } else {
        RowOutcome::Inserted
    }
}

fn error_type(err: &DbError) -> &'static str {
    if err.is_datetime_violation() {
        "DateTimeViolation"
    } else if err.is_unique_violation() {
        "UniqueViolation"
    } else {
        "InsertRejected"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::memory::MemoryStore;
    use model::{
        core::{
            data_type::InferredColumnType,
            value::{FieldValue, Value},
        },
        records::row::RowData,
    };

    async fn store() -> Arc<MemoryStore> {
        let store = MemoryStore::new()
            .with_table(
                "audit_logs",
                &[
                    ("id", InferredColumnType::Integer),
                    ("date", InferredColumnType::Timestamp),
                    ("objet", InferredColumnType::varchar(20)),
                ],
                Some(&["id"]),
            )
            .await
            .reject_value("audit_logs", "objet", "poison")
            .await;
        store.begin().await.unwrap();
        Arc::new(store)
    }

    fn pending(id: &str, date: Value, objet: &str) -> PendingRow {
        PendingRow {
            source_table: "historique".into(),
            line: Some(id.parse().unwrap()),
            row: RowData::new(
                "audit_logs",
                vec![
                    FieldValue::new("id", Value::Raw(id.into())),
                    FieldValue::new("date", date),
                    FieldValue::new("objet", Value::String(objet.into())),
                ],
            ),
        }
    }

    fn batch(rows: Vec<PendingRow>) -> Batch {
        let mut batch = Batch::new(1, "audit_logs");
        for row in rows {
            batch.push(row);
        }
        batch
    }

    #[tokio::test]
    async fn test_clean_batch_is_written_in_one_go() {
        let store = store().await;
        let loader = BatchLoader::new(store.clone());

        let outcome = loader
            .load(&batch(vec![
                pending("1", Value::Null, "a"),
                pending("2", Value::String("2021-01-02".into()), "b"),
            ]))
            .await
            .unwrap();

        assert!(!outcome.isolated);
        assert_eq!(outcome.inserted(), 2);
        store.commit().await.unwrap();
        assert_eq!(store.row_count("audit_logs").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_one_bad_row_only_costs_itself() {
        let store = store().await;
        let loader = BatchLoader::new(store.clone());

        let rows = (1..=5)
            .map(|i| {
                let objet = if i == 3 { "poison" } else { "ok" };
                pending(&i.to_string(), Value::Null, objet)
            })
            .collect();
        let outcome = loader.load(&batch(rows)).await.unwrap();

        assert!(outcome.isolated);
        assert_eq!(outcome.inserted(), 4);
        assert_eq!(outcome.failed(), 1);

        let RowOutcome::Failed(failed) = &outcome.rows[2].outcome else {
            panic!("third row should fail");
        };
        assert_eq!(failed.error.code.as_deref(), Some("23514"));
        assert_eq!(failed.line, Some(3));
        assert_eq!(failed.target_table.as_deref(), Some("audit_logs"));
        assert!(failed.sql.as_ref().unwrap().starts_with("INSERT INTO \"audit_logs\""));

        store.commit().await.unwrap();
        assert_eq!(store.row_count("audit_logs").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_missed_zero_date_is_retried_as_null() {
        let store = store().await;
        let loader = BatchLoader::new(store.clone());

        let outcome = loader
            .load(&batch(vec![
                pending("1", Value::Raw("0000-00-00 00:00:00.000".into()), "a"),
                pending("2", Value::String("yesterday".into()), "b"),
            ]))
            .await
            .unwrap();

        assert_eq!(outcome.inserted(), 1);
        let RowOutcome::Failed(failed) = &outcome.rows[1].outcome else {
            panic!("unparseable date should fail");
        };
        assert_eq!(failed.error.error_type, "DateTimeViolation");

        store.commit().await.unwrap();
        assert_eq!(store.column_values("audit_logs", "date").await, vec![Value::Null]);
    }

    #[tokio::test]
    async fn test_existing_key_counts_as_duplicate() {
        let store = store().await;
        let loader = BatchLoader::new(store.clone());
        loader
            .load(&batch(vec![pending("1", Value::Null, "a")]))
            .await
            .unwrap();

        let outcome = loader
            .load(&batch(vec![
                pending("1", Value::Null, "a"),
                pending("2", Value::Null, "b"),
            ]))
            .await
            .unwrap();

        assert!(!outcome.isolated);
        assert_eq!(outcome.duplicates(), 1);
        assert_eq!(outcome.inserted(), 1);
    }

    #[tokio::test]
    async fn test_loading_outside_a_transaction_is_fatal() {
        let store = Arc::new(
            MemoryStore::new()
                .with_table("audit_logs", &[("id", InferredColumnType::Integer)], None)
                .await,
        );
        let loader = BatchLoader::new(store);

        let err = loader
            .load(&batch(vec![pending("1", Value::Null, "a")]))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::WriteBatch { batch_id: 1, .. }));
    }
}

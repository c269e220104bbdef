#![allow(dead_code)]

use crate::{TEST_PG_URL, pg_client};
use async_trait::async_trait;
use connectors::{
    error::SourceError,
    file::dump::source::DumpSource,
    memory::MemoryStore,
    source::{RecordSource, SourceDescriptor, SourceEvent},
    sql::{
        base::{destination::TargetStore, error::DbError},
        postgres::adapter::PgAdapter,
    },
};
use engine_config::{
    config::ImportConfig, report::migration::MigrationReport, settings::MigrationSettings,
};
use engine_runtime::{error::MigrationError, execution::run};
use planner::query::{
    ast::{
        alter_table::AlterTable, create_index::CreateIndex, create_table::CreateTable,
        insert::Insert, transaction::TransactionControl,
    },
    dialect::Dialect,
};
use std::{
    collections::HashSet,
    io::Write,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

/// The reference scenario: one history row with a zero date.
pub const HISTORIQUE_DUMP: &str = "\
-- MySQL dump 10.13
CREATE TABLE `historique` (`id` int(11) NOT NULL, `date` datetime);
INSERT INTO historique (id,locataire_id,local_id,prop,date,objet,envoi,detail,loyer_id) VALUES (1,10,20,'x','0000-00-00','rent notice',NULL,'text',5);
";

/// A small agency: owners, units, tenants, contracts and their history,
/// in the order a mysqldump writes them (alphabetical, children first).
pub const AGENCY_DUMP: &str = "\
INSERT INTO `contrat` (`id`,`local_id`,`locataire_id`,`date_debut`,`loyer`) VALUES (1,3,10,'2020-01-01','650,00'),(2,4,11,'2021-09-01','720.50');
INSERT INTO `historique` (`id`,`locataire_id`,`date`,`objet`) VALUES (1,10,'2021-03-04 10:00:00','Relance loyer'),(2,11,'0000-00-00 00:00:00','Bail signé');
INSERT INTO `local` (`id`,`nom`,`type`,`immeuble_id`) VALUES (3,'A1','appartement',NULL),(4,'B2','bureau',NULL);
INSERT INTO `locataire` (`id`,`prenom`,`nom`,`email`,`telephone`) VALUES (10,'Marie','Curie','marie@example.org','01 02 03 04 05'),(11,'Pierre','L''Écuyer','pierre@example','+33 6 00 00 00 00');
INSERT INTO `proprietaire` (`id`,`nom_proprio`,`telephone`) VALUES (1,'SCI Les Tilleuls','0102030405');
";

pub fn config() -> ImportConfig {
    ImportConfig::bundled().expect("bundled config")
}

pub fn settings() -> MigrationSettings {
    MigrationSettings {
        batch_size: 2,
        ..Default::default()
    }
}

/// Writes `bytes` to a temporary `.sql` file.
pub fn dump_file(bytes: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".sql")
        .tempfile()
        .expect("create dump file");
    file.write_all(bytes).expect("write dump file");
    file
}

/// Runs a migration of `dump` into `target`.
pub async fn migrate(
    dump: &str,
    target: Option<Arc<dyn TargetStore>>,
    settings: MigrationSettings,
) -> Result<MigrationReport, MigrationError> {
    let mut source = DumpSource::from_text("dump.sql", dump);
    run(&mut source, target, &config(), settings, CancellationToken::new()).await
}

pub async fn migrate_memory(
    dump: &str,
    store: &Arc<MemoryStore>,
    settings: MigrationSettings,
) -> MigrationReport {
    migrate(dump, Some(store.clone() as Arc<dyn TargetStore>), settings)
        .await
        .expect("migration")
}

/// Target that loses its connection after a number of inserts.
pub struct FlakyStore {
    inner: MemoryStore,
    inserts_left: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore, inserts: usize) -> Self {
        FlakyStore {
            inner,
            inserts_left: AtomicUsize::new(inserts),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Restores the connection for another `inserts` inserts.
    pub fn reconnect(&self, inserts: usize) {
        self.inserts_left.store(inserts, Ordering::SeqCst);
    }
}

#[async_trait]
impl TargetStore for FlakyStore {
    fn dialect(&self) -> &dyn Dialect {
        self.inner.dialect()
    }

    async fn list_tables(&self) -> Result<HashSet<String>, DbError> {
        self.inner.list_tables().await
    }

    async fn has_primary_key(&self, table: &str) -> Result<bool, DbError> {
        self.inner.has_primary_key(table).await
    }

    async fn has_column(&self, table: &str, column: &str) -> Result<bool, DbError> {
        self.inner.has_column(table, column).await
    }

    async fn row_count(&self, table: &str) -> Result<u64, DbError> {
        self.inner.row_count(table).await
    }

    async fn transaction(&self, control: &TransactionControl) -> Result<(), DbError> {
        self.inner.transaction(control).await
    }

    async fn insert(&self, insert: &Insert) -> Result<u64, DbError> {
        let left = self.inserts_left.load(Ordering::SeqCst);
        if left == 0 {
            return Err(DbError::rejected("08006", "connection to server was lost"));
        }
        self.inserts_left.store(left - 1, Ordering::SeqCst);
        self.inner.insert(insert).await
    }

    async fn create_table(&self, stmt: &CreateTable) -> Result<(), DbError> {
        self.inner.create_table(stmt).await
    }

    async fn alter_table(&self, stmt: &AlterTable) -> Result<(), DbError> {
        self.inner.alter_table(stmt).await
    }

    async fn create_index(&self, stmt: &CreateIndex) -> Result<(), DbError> {
        self.inner.create_index(stmt).await
    }
}

/// Source that requests cancellation once it has handed out `after` events.
pub struct CancellingSource {
    inner: DumpSource,
    cancel: CancellationToken,
    after: usize,
    served: usize,
}

impl CancellingSource {
    pub fn new(inner: DumpSource, cancel: CancellationToken, after: usize) -> Self {
        CancellingSource {
            inner,
            cancel,
            after,
            served: 0,
        }
    }
}

#[async_trait]
impl RecordSource for CancellingSource {
    fn describe(&self) -> SourceDescriptor {
        self.inner.describe()
    }

    async fn next_event(&mut self) -> Result<Option<SourceEvent>, SourceError> {
        let event = self.inner.next_event().await?;
        self.served += 1;
        if self.served >= self.after {
            self.cancel.cancel();
        }
        Ok(event)
    }
}

/// Live target used by the ignored integration tests.
pub async fn pg_target() -> Arc<dyn TargetStore> {
    Arc::new(PgAdapter::connect(TEST_PG_URL).await.expect("connect postgres"))
}

pub async fn get_row_count(table: &str) -> i64 {
    let client = pg_client().await;
    let row = client
        .query_one(format!("SELECT COUNT(*) FROM \"{table}\"").as_str(), &[])
        .await
        .expect("count rows");
    row.get(0)
}

pub async fn get_table_names() -> Vec<String> {
    let client = pg_client().await;
    client
        .query(
            "SELECT table_name::text FROM information_schema.tables WHERE table_schema = 'public' ORDER BY 1",
            &[],
        )
        .await
        .expect("list tables")
        .iter()
        .map(|row| row.get(0))
        .collect()
}

pub async fn get_cell_as_string(sql: &str) -> Option<String> {
    let client = pg_client().await;
    let row = client.query_one(sql, &[]).await.expect("query cell");
    row.get(0)
}

pub async fn execute(sql: &str) {
    let client = pg_client().await;
    client.batch_execute(sql).await.expect("execute sql");
}

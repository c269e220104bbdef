use crate::error::LoadError;
use connectors::sql::base::{destination::TargetStore, error::DbError};
use engine_config::{config::IndexConfig, report::finding::Finding};
use engine_core::mapping::inference::infer_column_type;
use indexmap::{IndexMap, IndexSet};
use model::transform::mapping::FieldMapping;
use planner::query::ast::{
    alter_table::{AlterAction, AlterTable},
    create_index::CreateIndex,
    create_table::{ColumnDef, CreateTable},
};
use std::collections::HashSet;
use tracing::{info, warn};

const SCHEMA_SAVEPOINT: &str = "sp_schema";

enum Ddl<'a> {
    CreateTable(&'a CreateTable),
    AlterTable(&'a AlterTable),
    CreateIndex(&'a CreateIndex),
}

/// Keeps the target schema in step with the mappings resolved during a run.
///
/// Tables are created on first use with inferred column types, widened when
/// later records bring new columns, and keyed on `id`. A table that already
/// existed is keyed as soon as it is resolved so the load can skip rows a
/// previous run wrote; a table this run creates is keyed once loading stops.
pub struct SchemaManager {
    existing: HashSet<String>,
    /// Tables created (or, in a dry run, that would be created) by this run.
    created: IndexMap<String, Vec<String>>,
    /// Every target table resolved this run, created or not.
    resolved: IndexSet<String>,
    failed: HashSet<String>,
    unkeyed: HashSet<String>,
    dry_run: bool,
}

impl SchemaManager {
    pub fn new(existing: HashSet<String>, dry_run: bool) -> Self {
        SchemaManager {
            existing,
            created: IndexMap::new(),
            resolved: IndexSet::new(),
            failed: HashSet::new(),
            unkeyed: HashSet::new(),
            dry_run,
        }
    }

    /// Reads the current table list from the store.
    pub async fn load(store: &dyn TargetStore, dry_run: bool) -> Result<Self, DbError> {
        let existing = store.list_tables().await?;
        info!(tables = existing.len(), "Loaded target table list");
        Ok(Self::new(existing, dry_run))
    }

    pub fn exists(&self, table: &str) -> bool {
        self.existing.contains(table)
    }

    pub fn was_created(&self, table: &str) -> bool {
        self.created.contains_key(table)
    }

    /// Creates the mapping's target table if it does not exist yet, or keys
    /// an existing one that has an `id` column but no primary key.
    ///
    /// A rejected CREATE TABLE is reported as a finding; the records of that
    /// table then fail one by one on insert.
    pub async fn ensure_table(
        &mut self,
        store: Option<&dyn TargetStore>,
        mapping: &FieldMapping,
    ) -> Result<Option<Finding>, LoadError> {
        let table = mapping.target_table.as_str();
        if self.resolved.contains(table) || self.failed.contains(table) {
            return Ok(None);
        }
        let writer = store.filter(|_| !self.dry_run);

        if self.exists(table) {
            self.resolved.insert(table.to_string());
            return match writer {
                Some(store) => self.key_table(store, table).await,
                None => Ok(None),
            };
        }

        let columns = mapping.target_columns();
        let Some(store) = writer else {
            info!(table, source = %mapping.source_table, "Table would be created");
            self.resolved.insert(table.to_string());
            self.created.insert(table.to_string(), columns);
            return Ok(Some(Finding::new_table_would_create(
                table,
                &mapping.source_table,
            )));
        };

        let stmt = CreateTable {
            table: table.to_string(),
            columns: column_defs(&columns),
            if_not_exists: true,
        };
        match run_guarded(store, Ddl::CreateTable(&stmt)).await {
            Ok(None) => {
                info!(table, source = %mapping.source_table, columns = columns.len(), "Created target table");
                self.resolved.insert(table.to_string());
                self.created.insert(table.to_string(), columns);
                Ok(Some(Finding::new_table_created(table, &mapping.source_table)))
            }
            Ok(Some(err)) => {
                warn!(table, error = %err, "Could not create target table");
                self.failed.insert(table.to_string());
                Ok(Some(Finding::new_table_create_failed(table, &err.to_string())))
            }
            Err(source) => Err(LoadError::Schema {
                table: table.to_string(),
                source,
            }),
        }
    }

    /// Adds columns a mapping picked up after its table was resolved.
    ///
    /// Only tables created by this run are altered.
    pub async fn add_columns(
        &mut self,
        store: Option<&dyn TargetStore>,
        table: &str,
        columns: &[String],
    ) -> Result<Option<Finding>, LoadError> {
        if columns.is_empty() || self.failed.contains(table) {
            return Ok(None);
        }

        let Some(known) = self.created.get_mut(table) else {
            warn!(table, columns = ?columns, "New columns for a table this run did not create");
            return Ok(Some(Finding::new_columns_not_added(table, columns)));
        };
        let added: Vec<String> = columns
            .iter()
            .filter(|c| !known.contains(c))
            .cloned()
            .collect();
        if added.is_empty() {
            return Ok(None);
        }

        if let Some(store) = store.filter(|_| !self.dry_run) {
            let stmt = AlterTable {
                table: table.to_string(),
                action: AlterAction::AddColumns(column_defs(&added)),
            };
            match run_guarded(store, Ddl::AlterTable(&stmt)).await {
                Ok(None) => {}
                Ok(Some(err)) => {
                    warn!(table, error = %err, "Could not add columns");
                    return Ok(Some(Finding::new_columns_not_added(table, &added)));
                }
                Err(source) => {
                    return Err(LoadError::Schema {
                        table: table.to_string(),
                        source,
                    });
                }
            }
        }

        info!(table, columns = ?added, "Added columns");
        known.extend(added.iter().cloned());
        Ok(Some(Finding::new_columns_added(table, &added)))
    }

    /// Keys every table resolved this run that is still without a primary
    /// key and builds the configured indexes on tables that received rows.
    /// Must run inside a transaction.
    pub async fn finalize(
        &mut self,
        store: &dyn TargetStore,
        indexes: &[IndexConfig],
        loaded: &HashSet<String>,
    ) -> Result<Vec<Finding>, LoadError> {
        let mut findings = Vec::new();

        let tables: Vec<String> = self
            .resolved
            .iter()
            .filter(|t| !self.unkeyed.contains(*t))
            .cloned()
            .collect();
        for table in tables {
            if let Some(finding) = self.key_table(store, &table).await? {
                findings.push(finding);
            }
        }

        for index in indexes.iter().filter(|i| loaded.contains(&i.table)) {
            let mut stmt = CreateIndex::conventional(&index.table, &index.columns);
            if let Some(name) = &index.name {
                stmt.name = name.clone();
            }
            match run_guarded(store, Ddl::CreateIndex(&stmt))
                .await
                .map_err(|source| LoadError::Schema {
                    table: index.table.clone(),
                    source,
                })? {
                None => info!(index = %stmt.name, table = %stmt.table, "Created index"),
                Some(err) => {
                    warn!(index = %stmt.name, error = %err, "Could not create index");
                    findings.push(Finding::new_index_failed(&stmt.name, &err.to_string()));
                }
            }
        }

        Ok(findings)
    }

    /// Adds `PRIMARY KEY (id)` when the table has an `id` column and no key.
    /// A table the server refuses to key is not tried again this run.
    async fn key_table(
        &mut self,
        store: &dyn TargetStore,
        table: &str,
    ) -> Result<Option<Finding>, LoadError> {
        let schema_err = |source: DbError| LoadError::Schema {
            table: table.to_string(),
            source,
        };
        if !store.has_column(table, "id").await.map_err(schema_err)?
            || store.has_primary_key(table).await.map_err(schema_err)?
        {
            return Ok(None);
        }

        let stmt = AlterTable {
            table: table.to_string(),
            action: AlterAction::AddPrimaryKey(vec!["id".to_string()]),
        };
        match run_guarded(store, Ddl::AlterTable(&stmt))
            .await
            .map_err(schema_err)?
        {
            None => {
                info!(table, "Added primary key");
                Ok(None)
            }
            Some(err) => {
                warn!(table, error = %err, "Could not add primary key");
                self.unkeyed.insert(table.to_string());
                Ok(Some(Finding::new_primary_key_failed(table, &err.to_string())))
            }
        }
    }
}

fn column_defs(columns: &[String]) -> Vec<ColumnDef> {
    columns
        .iter()
        .map(|c| ColumnDef::new(c, infer_column_type(c)))
        .collect()
}

/// Runs one DDL statement under its own savepoint.
///
/// `Ok(Some(err))` means the server rejected the statement and the savepoint
/// was rolled back; `Err` is a failure of the session itself.
async fn run_guarded(store: &dyn TargetStore, ddl: Ddl<'_>) -> Result<Option<DbError>, DbError> {
    store.savepoint(SCHEMA_SAVEPOINT).await?;
    let result = match ddl {
        Ddl::CreateTable(stmt) => store.create_table(stmt).await,
        Ddl::AlterTable(stmt) => store.alter_table(stmt).await,
        Ddl::CreateIndex(stmt) => store.create_index(stmt).await,
    };
    match result {
        Ok(()) => {
            store.release(SCHEMA_SAVEPOINT).await?;
            Ok(None)
        }
        Err(err) if err.is_record_level() => {
            store.rollback_to(SCHEMA_SAVEPOINT).await?;
            store.release(SCHEMA_SAVEPOINT).await?;
            Ok(Some(err))
        }
        Err(err) => Err(err),
    }
}

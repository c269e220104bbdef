//! In-process target store.
//!
//! Mirrors the PostgreSQL behaviour the loader depends on: typed columns that
//! reject bad literals, primary keys with `ON CONFLICT DO NOTHING`, savepoints,
//! and the aborted-transaction state after a failed statement. Used to run the
//! whole pipeline without a database.

use crate::sql::base::{destination::TargetStore, error::DbError};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use model::core::{data_type::InferredColumnType, value::Value};
use planner::query::{
    ast::{
        alter_table::{AlterAction, AlterTable},
        create_index::CreateIndex,
        create_table::CreateTable,
        insert::Insert,
        transaction::TransactionControl,
    },
    dialect::{self, Dialect},
};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default)]
struct MemTable {
    columns: Vec<(String, InferredColumnType)>,
    rows: Vec<Vec<Value>>,
    primary_key: Option<Vec<String>>,
    indexes: Vec<String>,
}

impl MemTable {
    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(c, _)| c == name)
    }

    fn key_of(&self, row: &[Value], key: &[String]) -> Option<Vec<String>> {
        key.iter()
            .map(|k| {
                let idx = self.column_index(k)?;
                row[idx].as_text().map(|t| t.into_owned())
            })
            .collect()
    }
}

type Tables = BTreeMap<String, MemTable>;

#[derive(Debug)]
struct TxState {
    snapshot: Tables,
    savepoints: Vec<(String, Tables)>,
    aborted: bool,
}

/// Rejects inserts whose `column` renders as `value` (a CHECK constraint).
#[derive(Debug, Clone)]
struct Rejection {
    table: String,
    column: String,
    value: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: Tables,
    tx: Option<TxState>,
    rejections: Vec<Rejection>,
    mutations: u64,
}

impl MemoryState {
    fn ensure_not_aborted(&self) -> Result<(), DbError> {
        match &self.tx {
            Some(tx) if tx.aborted => Err(DbError::rejected(
                "25P02",
                "current transaction is aborted, commands ignored until end of transaction block",
            )),
            _ => Ok(()),
        }
    }

    /// Marks the open transaction as aborted and hands the error back.
    fn fail(&mut self, err: DbError) -> DbError {
        if let Some(tx) = self.tx.as_mut() {
            tx.aborted = true;
        }
        err
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut MemTable, DbError> {
        if !self.tables.contains_key(name) {
            let err = DbError::rejected("42P01", format!("relation \"{name}\" does not exist"));
            return Err(self.fail(err));
        }
        self.tables
            .get_mut(name)
            .ok_or_else(|| DbError::Unknown(format!("table {name} vanished")))
    }
}

pub struct MemoryStore {
    state: Mutex<MemoryState>,
    dialect: dialect::Postgres,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            state: Mutex::new(MemoryState::default()),
            dialect: dialect::Postgres,
        }
    }

    /// Pre-existing table, optionally keyed.
    pub async fn with_table(
        self,
        name: &str,
        columns: &[(&str, InferredColumnType)],
        primary_key: Option<&[&str]>,
    ) -> Self {
        {
            let mut state = self.state.lock().await;
            state.tables.insert(
                name.to_string(),
                MemTable {
                    columns: columns
                        .iter()
                        .map(|(c, t)| (c.to_string(), *t))
                        .collect(),
                    rows: Vec::new(),
                    primary_key: primary_key.map(|k| k.iter().map(|c| c.to_string()).collect()),
                    indexes: Vec::new(),
                },
            );
        }
        self
    }

    /// Makes inserts of `value` into `table.column` fail with a check violation.
    pub async fn reject_value(self, table: &str, column: &str, value: &str) -> Self {
        self.state.lock().await.rejections.push(Rejection {
            table: table.to_string(),
            column: column.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Number of statements that changed data or schema.
    pub async fn mutation_count(&self) -> u64 {
        self.state.lock().await.mutations
    }

    pub async fn rows(&self, table: &str) -> Vec<Vec<Value>> {
        let state = self.state.lock().await;
        state
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Values of one column across all rows, in insertion order.
    pub async fn column_values(&self, table: &str, column: &str) -> Vec<Value> {
        let state = self.state.lock().await;
        let Some(t) = state.tables.get(table) else {
            return Vec::new();
        };
        let Some(idx) = t.column_index(column) else {
            return Vec::new();
        };
        t.rows.iter().map(|r| r[idx].clone()).collect()
    }

    pub async fn column_names(&self, table: &str) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .tables
            .get(table)
            .map(|t| t.columns.iter().map(|(c, _)| c.clone()).collect())
            .unwrap_or_default()
    }

    pub async fn column_type(&self, table: &str, column: &str) -> Option<InferredColumnType> {
        let state = self.state.lock().await;
        let t = state.tables.get(table)?;
        t.columns
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, ty)| *ty)
    }

    pub async fn primary_key(&self, table: &str) -> Option<Vec<String>> {
        let state = self.state.lock().await;
        state.tables.get(table)?.primary_key.clone()
    }

    pub async fn indexes(&self, table: &str) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .tables
            .get(table)
            .map(|t| t.indexes.clone())
            .unwrap_or_default()
    }

    pub async fn in_transaction(&self) -> bool {
        self.state.lock().await.tx.is_some()
    }
}

/// Checks a literal against a column type the way PostgreSQL input functions do.
fn coerce(column: &str, ty: &InferredColumnType, value: &Value) -> Result<(), DbError> {
    let Some(text) = value.as_text() else {
        return Ok(());
    };
    let text = text.trim();

    match ty {
        InferredColumnType::Integer => {
            if matches!(value, Value::Int(_) | Value::Uint(_)) || text.parse::<i64>().is_ok() {
                Ok(())
            } else {
                Err(DbError::rejected(
                    "22P02",
                    format!("invalid input syntax for type integer: \"{text}\""),
                ))
            }
        }
        InferredColumnType::Decimal { .. } => {
            if text.parse::<f64>().is_ok() {
                Ok(())
            } else {
                Err(DbError::rejected(
                    "22P02",
                    format!("invalid input syntax for type numeric: \"{text}\""),
                ))
            }
        }
        InferredColumnType::Timestamp => {
            let parsed = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").is_ok()
                || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").is_ok()
                || NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok();
            if parsed {
                Ok(())
            } else if text.starts_with("0000") {
                Err(DbError::rejected(
                    "22008",
                    format!("date/time field value out of range: \"{text}\""),
                ))
            } else {
                Err(DbError::rejected(
                    "22007",
                    format!("invalid input syntax for type timestamp: \"{text}\""),
                ))
            }
        }
        InferredColumnType::VarChar { length } => {
            if text.chars().count() > *length as usize {
                Err(DbError::rejected(
                    "22001",
                    format!("value too long for type character varying({length}) in column \"{column}\""),
                ))
            } else {
                Ok(())
            }
        }
        InferredColumnType::Text => Ok(()),
    }
}

#[async_trait]
impl TargetStore for MemoryStore {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    async fn list_tables(&self) -> Result<HashSet<String>, DbError> {
        let state = self.state.lock().await;
        Ok(state.tables.keys().cloned().collect())
    }

    async fn has_primary_key(&self, table: &str) -> Result<bool, DbError> {
        let state = self.state.lock().await;
        Ok(state
            .tables
            .get(table)
            .is_some_and(|t| t.primary_key.is_some()))
    }

    async fn has_column(&self, table: &str, column: &str) -> Result<bool, DbError> {
        let state = self.state.lock().await;
        Ok(state
            .tables
            .get(table)
            .is_some_and(|t| t.columns.iter().any(|(c, _)| c == column)))
    }

    async fn row_count(&self, table: &str) -> Result<u64, DbError> {
        let state = self.state.lock().await;
        state
            .tables
            .get(table)
            .map(|t| t.rows.len() as u64)
            .ok_or_else(|| DbError::rejected("42P01", format!("relation \"{table}\" does not exist")))
    }

    async fn transaction(&self, control: &TransactionControl) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        let state = &mut *state;

        match control {
            TransactionControl::Begin => {
                if state.tx.is_some() {
                    return Err(DbError::Transaction(
                        "there is already a transaction in progress".into(),
                    ));
                }
                state.tx = Some(TxState {
                    snapshot: state.tables.clone(),
                    savepoints: Vec::new(),
                    aborted: false,
                });
            }
            TransactionControl::Commit => {
                let tx = state
                    .tx
                    .take()
                    .ok_or_else(|| DbError::Transaction("there is no transaction in progress".into()))?;
                // COMMIT of an aborted transaction rolls it back
                if tx.aborted {
                    state.tables = tx.snapshot;
                }
            }
            TransactionControl::Rollback => {
                if let Some(tx) = state.tx.take() {
                    state.tables = tx.snapshot;
                }
            }
            TransactionControl::Savepoint(name) => {
                state.ensure_not_aborted()?;
                let snapshot = state.tables.clone();
                let tx = state.tx.as_mut().ok_or_else(|| {
                    DbError::rejected("25P01", "SAVEPOINT can only be used in transaction blocks")
                })?;
                tx.savepoints.push((name.clone(), snapshot));
            }
            TransactionControl::Release(name) => {
                state.ensure_not_aborted()?;
                let tx = state
                    .tx
                    .as_mut()
                    .ok_or_else(|| DbError::rejected("25P01", "RELEASE SAVEPOINT outside a transaction"))?;
                let idx = tx
                    .savepoints
                    .iter()
                    .rposition(|(n, _)| n == name)
                    .ok_or_else(|| DbError::rejected("3B001", format!("savepoint \"{name}\" does not exist")))?;
                tx.savepoints.truncate(idx);
            }
            TransactionControl::RollbackTo(name) => {
                let tx = state
                    .tx
                    .as_mut()
                    .ok_or_else(|| DbError::rejected("25P01", "ROLLBACK TO SAVEPOINT outside a transaction"))?;
                let idx = tx
                    .savepoints
                    .iter()
                    .rposition(|(n, _)| n == name)
                    .ok_or_else(|| DbError::rejected("3B001", format!("savepoint \"{name}\" does not exist")))?;
                tx.savepoints.truncate(idx + 1);
                tx.aborted = false;
                let restored = tx.savepoints[idx].1.clone();
                state.tables = restored;
            }
        }
        Ok(())
    }

    async fn insert(&self, insert: &Insert) -> Result<u64, DbError> {
        let mut state = self.state.lock().await;
        state.ensure_not_aborted()?;

        let rejections = state.rejections.clone();
        let table = state.table_mut(&insert.table)?;

        let mut row = vec![Value::Null; table.columns.len()];
        let mut failure = None;
        for (column, value) in insert.columns.iter().zip(insert.values.iter()) {
            let Some(idx) = table.column_index(column) else {
                failure = Some(DbError::rejected(
                    "42703",
                    format!("column \"{column}\" of relation \"{}\" does not exist", insert.table),
                ));
                break;
            };
            if let Err(err) = coerce(column, &table.columns[idx].1, value) {
                failure = Some(err);
                break;
            }
            let rejected = rejections.iter().any(|r| {
                r.table == insert.table
                    && &r.column == column
                    && value.as_text().is_some_and(|t| t == r.value.as_str())
            });
            if rejected {
                failure = Some(DbError::rejected(
                    "23514",
                    format!("new row for relation \"{}\" violates check constraint", insert.table),
                ));
                break;
            }
            row[idx] = value.clone();
        }

        if failure.is_none()
            && let Some(key) = table.primary_key.clone()
        {
            match table.key_of(&row, &key) {
                None => {
                    failure = Some(DbError::rejected(
                        "23502",
                        format!("null value in primary key of relation \"{}\"", insert.table),
                    ));
                }
                Some(new_key) => {
                    let exists = table
                        .rows
                        .iter()
                        .any(|r| table.key_of(r, &key).as_ref() == Some(&new_key));
                    if exists {
                        if insert.on_conflict.is_some() {
                            return Ok(0);
                        }
                        failure = Some(DbError::rejected(
                            "23505",
                            format!("duplicate key value violates unique constraint \"{}_pkey\"", insert.table),
                        ));
                    }
                }
            }
        }

        if let Some(err) = failure {
            return Err(state.fail(err));
        }

        table.rows.push(row);
        state.mutations += 1;
        Ok(1)
    }

    async fn create_table(&self, stmt: &CreateTable) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        state.ensure_not_aborted()?;

        if state.tables.contains_key(&stmt.table) {
            if stmt.if_not_exists {
                return Ok(());
            }
            let err = DbError::rejected("42P07", format!("relation \"{}\" already exists", stmt.table));
            return Err(state.fail(err));
        }

        state.tables.insert(
            stmt.table.clone(),
            MemTable {
                columns: stmt
                    .columns
                    .iter()
                    .map(|c| (c.name.clone(), c.data_type))
                    .collect(),
                ..MemTable::default()
            },
        );
        state.mutations += 1;
        Ok(())
    }

    async fn alter_table(&self, stmt: &AlterTable) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        state.ensure_not_aborted()?;
        let table = state.table_mut(&stmt.table)?;

        let failure = match &stmt.action {
            AlterAction::AddColumns(columns) => {
                for column in columns {
                    if table.column_index(&column.name).is_none() {
                        table.columns.push((column.name.clone(), column.data_type));
                        for row in table.rows.iter_mut() {
                            row.push(Value::Null);
                        }
                    }
                }
                None
            }
            AlterAction::AddPrimaryKey(key) => {
                if table.primary_key.is_some() {
                    Some(DbError::rejected(
                        "42P16",
                        format!("multiple primary keys for table \"{}\" are not allowed", stmt.table),
                    ))
                } else if let Some(missing) = key.iter().find(|k| table.column_index(k).is_none()) {
                    Some(DbError::rejected(
                        "42703",
                        format!("column \"{missing}\" does not exist"),
                    ))
                } else {
                    let mut seen = HashSet::new();
                    let mut violation = None;
                    for row in &table.rows {
                        match table.key_of(row, key) {
                            None => {
                                violation = Some(DbError::rejected(
                                    "23502",
                                    format!("column of \"{}\" contains null values", stmt.table),
                                ));
                                break;
                            }
                            Some(k) if !seen.insert(k.clone()) => {
                                violation = Some(DbError::rejected(
                                    "23505",
                                    format!("could not create unique index \"{}_pkey\"", stmt.table),
                                ));
                                break;
                            }
                            Some(_) => {}
                        }
                    }
                    if violation.is_none() {
                        table.primary_key = Some(key.clone());
                    }
                    violation
                }
            }
        };

        if let Some(err) = failure {
            return Err(state.fail(err));
        }
        state.mutations += 1;
        Ok(())
    }

    async fn create_index(&self, stmt: &CreateIndex) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        state.ensure_not_aborted()?;
        let table = state.table_mut(&stmt.table)?;

        if let Some(missing) = stmt.columns.iter().find(|c| table.column_index(c).is_none()) {
            let err = DbError::rejected("42703", format!("column \"{missing}\" does not exist"));
            return Err(state.fail(err));
        }
        if !table.indexes.contains(&stmt.name) {
            table.indexes.push(stmt.name.clone());
            state.mutations += 1;
        }
        Ok(())
    }
}

use crate::sql::base::error::DbError;
use async_trait::async_trait;
use planner::query::{
    ast::{
        alter_table::AlterTable, create_index::CreateIndex, create_table::CreateTable,
        insert::Insert, transaction::TransactionControl,
    },
    dialect::Dialect,
};
use std::collections::HashSet;

/// The relational store rows are migrated into.
///
/// One session, owned exclusively by the running migration. Transaction
/// control is explicit so the loader can place savepoints itself.
#[async_trait]
pub trait TargetStore: Send + Sync {
    fn dialect(&self) -> &dyn Dialect;

    /// Base tables visible in the current schema.
    async fn list_tables(&self) -> Result<HashSet<String>, DbError>;

    async fn has_primary_key(&self, table: &str) -> Result<bool, DbError>;

    async fn has_column(&self, table: &str, column: &str) -> Result<bool, DbError>;

    async fn row_count(&self, table: &str) -> Result<u64, DbError>;

    async fn transaction(&self, control: &TransactionControl) -> Result<(), DbError>;

    /// Executes one insert and returns the number of rows written
    /// (0 when an `ON CONFLICT DO NOTHING` clause skipped it).
    async fn insert(&self, insert: &Insert) -> Result<u64, DbError>;

    async fn create_table(&self, stmt: &CreateTable) -> Result<(), DbError>;

    async fn alter_table(&self, stmt: &AlterTable) -> Result<(), DbError>;

    async fn create_index(&self, stmt: &CreateIndex) -> Result<(), DbError>;

    async fn begin(&self) -> Result<(), DbError> {
        self.transaction(&TransactionControl::Begin).await
    }

    async fn commit(&self) -> Result<(), DbError> {
        self.transaction(&TransactionControl::Commit).await
    }

    async fn rollback(&self) -> Result<(), DbError> {
        self.transaction(&TransactionControl::Rollback).await
    }

    async fn savepoint(&self, name: &str) -> Result<(), DbError> {
        self.transaction(&TransactionControl::Savepoint(name.to_string()))
            .await
    }

    async fn release(&self, name: &str) -> Result<(), DbError> {
        self.transaction(&TransactionControl::Release(name.to_string()))
            .await
    }

    async fn rollback_to(&self, name: &str) -> Result<(), DbError> {
        self.transaction(&TransactionControl::RollbackTo(name.to_string()))
            .await
    }
}

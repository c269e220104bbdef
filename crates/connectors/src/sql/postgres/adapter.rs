use crate::sql::{
    base::{
        destination::TargetStore,
        error::{ConnectorError, DbError},
    },
    postgres::utils::{affected_rows, connect_client},
};
use async_trait::async_trait;
use planner::query::{
    ast::{
        alter_table::AlterTable, create_index::CreateIndex, create_table::CreateTable,
        insert::Insert, transaction::TransactionControl,
    },
    dialect::{self, Dialect},
    to_sql,
};
use std::{collections::HashSet, sync::Arc};
use tokio_postgres::Client;
use tracing::debug;

const QUERY_LIST_TABLES_SQL: &str = include_str!("sql/list_tables.sql");
const QUERY_HAS_PRIMARY_KEY_SQL: &str = include_str!("sql/has_primary_key.sql");
const QUERY_HAS_COLUMN_SQL: &str = include_str!("sql/has_column.sql");

/// PostgreSQL target over a single `tokio-postgres` session.
///
/// Statements go through the simple query protocol with inlined literals,
/// so untyped legacy values are coerced by the column they are written to.
#[derive(Clone)]
pub struct PgAdapter {
    client: Arc<Client>,
    dialect: dialect::Postgres,
}

impl PgAdapter {
    pub async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let client = connect_client(url).await?;
        Ok(PgAdapter {
            client: Arc::new(client),
            dialect: dialect::Postgres,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn exec(&self, sql: &str) -> Result<u64, DbError> {
        debug!(sql, "Executing");
        let messages = self.client.simple_query(sql).await?;
        Ok(affected_rows(&messages))
    }
}

#[async_trait]
impl TargetStore for PgAdapter {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    async fn list_tables(&self) -> Result<HashSet<String>, DbError> {
        let rows = self.client.query(QUERY_LIST_TABLES_SQL, &[]).await?;
        Ok(rows.iter().map(|row| row.get::<_, String>(0)).collect())
    }

    async fn has_primary_key(&self, table: &str) -> Result<bool, DbError> {
        let row = self
            .client
            .query_one(QUERY_HAS_PRIMARY_KEY_SQL, &[&table])
            .await?;
        Ok(row.get(0))
    }

    async fn has_column(&self, table: &str, column: &str) -> Result<bool, DbError> {
        let row = self
            .client
            .query_one(QUERY_HAS_COLUMN_SQL, &[&table, &column])
            .await?;
        Ok(row.get(0))
    }

    async fn row_count(&self, table: &str) -> Result<u64, DbError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}",
            self.dialect.quote_identifier(table)
        );
        let row = self.client.query_one(sql.as_str(), &[]).await?;
        let count: i64 = row.get(0);
        Ok(count.max(0) as u64)
    }

    async fn transaction(&self, control: &TransactionControl) -> Result<(), DbError> {
        self.exec(&to_sql(control, &self.dialect)).await?;
        Ok(())
    }

    async fn insert(&self, insert: &Insert) -> Result<u64, DbError> {
        self.exec(&to_sql(insert, &self.dialect)).await
    }

    async fn create_table(&self, stmt: &CreateTable) -> Result<(), DbError> {
        self.exec(&to_sql(stmt, &self.dialect)).await?;
        Ok(())
    }

    async fn alter_table(&self, stmt: &AlterTable) -> Result<(), DbError> {
        self.exec(&to_sql(stmt, &self.dialect)).await?;
        Ok(())
    }

    async fn create_index(&self, stmt: &CreateIndex) -> Result<(), DbError> {
        self.exec(&to_sql(stmt, &self.dialect)).await?;
        Ok(())
    }
}

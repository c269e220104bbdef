use crate::error::CliError;
use async_trait::async_trait;
use connectors::sql::{
    base::error::DbError, mysql::adapter::MySqlAdapter, postgres::adapter::PgAdapter,
};
use std::str::FromStr;
use tracing::{error, info};

/// What kind of connection to check
#[derive(Debug, PartialEq, Eq)]
pub enum ConnectionKind {
    MySql,
    Postgres,
}

impl FromStr for ConnectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(ConnectionKind::MySql),
            "pg" | "postgres" | "postgresql" => Ok(ConnectionKind::Postgres),
            other => Err(format!("Unknown connection kind: {other}")),
        }
    }
}

impl ConnectionKind {
    pub fn pinger(self, conn_str: String) -> Box<dyn ConnectionPinger> {
        match self {
            ConnectionKind::MySql => Box::new(MySqlConnectionPinger { conn_str }),
            ConnectionKind::Postgres => Box::new(PostgresConnectionPinger { conn_str }),
        }
    }
}

/// Trait for "pinging" a data source
#[async_trait]
pub trait ConnectionPinger: Send + Sync {
    /// Attempts to ping; returns Err if unreachable
    async fn ping(&self) -> Result<(), CliError>;
}

/// Legacy MySQL/MariaDB source pinger
pub struct MySqlConnectionPinger {
    pub conn_str: String,
}

/// PostgreSQL target pinger
pub struct PostgresConnectionPinger {
    pub conn_str: String,
}

#[async_trait]
impl ConnectionPinger for MySqlConnectionPinger {
    async fn ping(&self) -> Result<(), CliError> {
        let adapter = MySqlAdapter::connect(&self.conn_str)?;
        info!(location = adapter.location(), "Pinging MySQL");

        if let Err(err) = adapter.ping().await {
            error!(location = adapter.location(), error = %err, "MySQL ping failed");
            return Err(err.into());
        }
        adapter.disconnect().await?;
        Ok(())
    }
}

#[async_trait]
impl ConnectionPinger for PostgresConnectionPinger {
    async fn ping(&self) -> Result<(), CliError> {
        info!("Pinging Postgres");
        let adapter = PgAdapter::connect(&self.conn_str).await.map_err(|e| {
            error!(error = %e, "Postgres connection failed");
            e
        })?;

        let row = adapter
            .client()
            .query_one("SELECT 1", &[])
            .await
            .map_err(DbError::from)?;
        let val: i32 = row.get(0);
        if val != 1 {
            let msg = format!("Postgres ping returned unexpected result: {val}");
            error!("{}", msg);
            return Err(CliError::Unexpected(msg));
        }

        info!("Postgres ping succeeded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_kind_aliases() {
        assert_eq!("PG".parse(), Ok(ConnectionKind::Postgres));
        assert_eq!("postgresql".parse(), Ok(ConnectionKind::Postgres));
        assert_eq!("mariadb".parse(), Ok(ConnectionKind::MySql));
        assert!("ftp".parse::<ConnectionKind>().is_err());
    }

    #[tokio::test]
    async fn test_bad_mysql_url_fails_before_connecting() {
        let pinger = ConnectionKind::MySql.pinger("not a url".into());
        assert!(matches!(pinger.ping().await, Err(CliError::Connector(_))));
    }
}

use crate::sql::base::error::{ConnectorError, DbError};
use mysql_async::{Conn, Opts, Pool, prelude::*};
use tracing::info;

/// Read-only handle on a live legacy MySQL database.
#[derive(Clone)]
pub struct MySqlAdapter {
    pool: Pool,
    location: String,
}

impl MySqlAdapter {
    pub fn connect(url: &str) -> Result<Self, ConnectorError> {
        let opts = Opts::from_url(url)
            .map_err(|e| ConnectorError::InvalidUrl(e.to_string()))?;
        let location = format!(
            "mysql://{}:{}/{}",
            opts.ip_or_hostname(),
            opts.tcp_port(),
            opts.db_name().unwrap_or_default()
        );
        Ok(MySqlAdapter {
            pool: Pool::new(opts),
            location,
        })
    }

    /// Server address and database, without credentials.
    pub fn location(&self) -> &str {
        &self.location
    }

    pub async fn conn(&self) -> Result<Conn, DbError> {
        Ok(self.pool.get_conn().await?)
    }

    pub async fn list_tables(&self) -> Result<Vec<String>, DbError> {
        let mut conn = self.conn().await?;
        let tables: Vec<String> = conn.query("SHOW TABLES").await?;
        Ok(tables)
    }

    pub async fn ping(&self) -> Result<(), DbError> {
        let mut conn = self.conn().await?;
        conn.ping().await?;
        info!(location = %self.location, "MySQL reachable");
        Ok(())
    }

    pub async fn disconnect(self) -> Result<(), DbError> {
        self.pool.disconnect().await?;
        Ok(())
    }
}

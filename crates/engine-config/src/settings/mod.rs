use crate::settings::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, time::Duration};

pub mod error;

/// Knobs of one migration run.
///
/// The numeric part comes from the `[run]` table of the configuration file;
/// the command line overrides it and fills in the per-invocation flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationSettings {
    /// Rows per savepoint-protected batch.
    pub batch_size: usize,

    /// Batches per committed transaction. 0 keeps one transaction for the run.
    pub commit_interval: usize,

    pub progress_every: u64,
    pub progress_interval_secs: u64,

    /// Failures of each class logged at `warn` before going quiet.
    pub error_display_limit: usize,

    /// Failures kept as samples in the report.
    pub error_sample_limit: usize,

    #[serde(skip)]
    pub dry_run: bool,

    #[serde(skip)]
    pub validate: bool,

    /// Source tables to process (lower-cased). `None` processes everything.
    #[serde(skip)]
    pub only_tables: Option<HashSet<String>>,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        MigrationSettings {
            batch_size: 100,
            commit_interval: 0,
            progress_every: 1000,
            progress_interval_secs: 10,
            error_display_limit: 5,
            error_sample_limit: 20,
            dry_run: false,
            validate: false,
            only_tables: None,
        }
    }
}

impl MigrationSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.batch_size == 0 {
            return Err(SettingsError::ZeroBatchSize);
        }
        if self.progress_every == 0 {
            return Err(SettingsError::ZeroProgressEvery);
        }
        Ok(())
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs)
    }

    /// Restricts the run to the given source tables. An empty list lifts the restriction.
    pub fn with_only_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tables: HashSet<String> = tables
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self.only_tables = (!tables.is_empty()).then_some(tables);
        self
    }

    pub fn allows(&self, source_table: &str) -> bool {
        self.only_tables
            .as_ref()
            .is_none_or(|tables| tables.contains(source_table))
    }
}

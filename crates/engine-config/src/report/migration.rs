use crate::report::{
    finding::Finding,
    validation::ValidationReport,
    verdict::{Verdict, VerdictThresholds},
};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use model::{execution::failed_row::FailedRecord, transform::mapping::MappingOrigin};
use serde::Serialize;

const SQL_SAMPLE_CHARS: usize = 200;
const VALUES_SAMPLE_CHARS: usize = 120;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Running,
    Completed,
    /// Stopped by a signal; already flushed batches were committed.
    Interrupted,
    /// Fatal error; the open transaction was rolled back.
    Aborted,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct SourceInfo {
    pub kind: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

/// Run-wide counters.
///
/// `failed` is the sum of the three failure classes; `successful` counts
/// records that reached the target, whether written or skipped as duplicates.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Totals {
    pub seen: u64,
    pub successful: u64,
    pub inserted: u64,
    pub duplicates: u64,
    pub failed: u64,
    pub parse_failures: u64,
    pub validation_failures: u64,
    pub insert_failures: u64,
}

/// Counters of one source table.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TableReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<MappingOrigin>,
    pub total: u64,
    pub successful: u64,
    pub inserted: u64,
    pub duplicates: u64,
    pub failed: u64,
}

/// One failure, trimmed for the report.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ErrorSample {
    pub stage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<String>,
}

impl From<&FailedRecord> for ErrorSample {
    fn from(failed: &FailedRecord) -> Self {
        let values = (!failed.values.is_empty())
            .then(|| truncate(&format!("({})", failed.values.join(", ")), VALUES_SAMPLE_CHARS));

        ErrorSample {
            stage: failed.stage.to_string(),
            source_table: failed.source_table.clone(),
            target_table: failed.target_table.clone(),
            line: failed.line,
            error_type: failed.error.error_type.clone(),
            code: failed.error.code.clone(),
            message: failed.error.message.clone(),
            sql: failed.sql.as_deref().map(|s| truncate(s, SQL_SAMPLE_CHARS)),
            values,
        }
    }
}

/// Cuts `text` to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// The document written at the end of a run.
#[derive(Serialize, Debug, Clone)]
pub struct MigrationReport {
    pub run_id: String,
    pub engine_version: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub status: RunStatus,
    pub source: SourceInfo,
    pub totals: Totals,
    /// Keyed by source table, in first-seen order.
    pub tables: IndexMap<String, TableReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_error: Option<ErrorSample>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub error_samples: Vec<ErrorSample>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    pub verdict: Verdict,
    #[serde(skip)]
    error_sample_limit: usize,
}

impl MigrationReport {
    pub fn new(source: SourceInfo, dry_run: bool, error_sample_limit: usize) -> Self {
        MigrationReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            status: RunStatus::Running,
            source,
            totals: Totals::default(),
            tables: IndexMap::new(),
            first_error: None,
            error_samples: Vec::new(),
            findings: Vec::new(),
            validation: None,
            verdict: Verdict::Clean,
            error_sample_limit,
        }
    }

    pub fn table_mut(&mut self, source_table: &str) -> &mut TableReport {
        self.tables.entry(source_table.to_string()).or_default()
    }

    /// Keeps the first failure, and the first few as samples.
    pub fn record_error(&mut self, failed: &FailedRecord) {
        let sample = ErrorSample::from(failed);
        if self.first_error.is_none() {
            self.first_error = Some(sample.clone());
        }
        if self.error_samples.len() < self.error_sample_limit {
            self.error_samples.push(sample);
        }
    }

    pub fn add_finding(&mut self, finding: Finding) {
        if !self.findings.contains(&finding) {
            self.findings.push(finding);
        }
    }

    pub fn finish(&mut self, status: RunStatus, thresholds: &VerdictThresholds) {
        self.status = status;
        self.finished_at = Some(Utc::now());
        self.verdict = Verdict::from_counts(self.totals.failed, self.totals.seen, thresholds);
    }

    pub fn duration_secs(&self) -> f64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0) as f64 / 1000.0
    }
}

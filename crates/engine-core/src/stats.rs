use crate::progress::ProgressTicker;
use engine_config::{
    report::{
        finding::Finding,
        migration::{MigrationReport, RunStatus, SourceInfo},
        verdict::VerdictThresholds,
    },
    settings::MigrationSettings,
};
use model::{
    execution::failed_row::{FailedRecord, ProcessingStage},
    transform::mapping::MappingOrigin,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Failure classes shown separately in the totals and in the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FailureClass {
    Parse,
    Validation,
    Insert,
}

impl From<ProcessingStage> for FailureClass {
    fn from(stage: ProcessingStage) -> Self {
        match stage {
            ProcessingStage::Parse | ProcessingStage::Mapping => FailureClass::Parse,
            ProcessingStage::Validation => FailureClass::Validation,
            ProcessingStage::Load => FailureClass::Insert,
        }
    }
}

/// Counters of one migration run, turned into the report when it ends.
pub struct MigrationStats {
    report: MigrationReport,
    ticker: ProgressTicker,
    display_limit: usize,
    shown: HashMap<FailureClass, usize>,
}

impl MigrationStats {
    pub fn new(source: SourceInfo, settings: &MigrationSettings) -> Self {
        MigrationStats {
            report: MigrationReport::new(source, settings.dry_run, settings.error_sample_limit),
            ticker: ProgressTicker::new(settings.progress_every, settings.progress_interval()),
            display_limit: settings.error_display_limit,
            shown: HashMap::new(),
        }
    }

    pub fn report(&self) -> &MigrationReport {
        &self.report
    }

    pub fn report_mut(&mut self) -> &mut MigrationReport {
        &mut self.report
    }

    /// One more record (or malformed line) read from the source.
    pub fn record_seen(&mut self, source_table: Option<&str>) {
        self.report.totals.seen += 1;
        if let Some(table) = source_table {
            self.report.table_mut(table).total += 1;
        }
    }

    pub fn set_mapping(&mut self, source_table: &str, target: &str, origin: MappingOrigin) {
        let table = self.report.table_mut(source_table);
        table.target = Some(target.to_string());
        table.origin = Some(origin);
    }

    /// A record that reached the target; `written` is false when the insert
    /// was skipped because the key already existed.
    pub fn record_loaded(&mut self, source_table: &str, written: bool) {
        let totals = &mut self.report.totals;
        totals.successful += 1;
        if written {
            totals.inserted += 1;
        } else {
            totals.duplicates += 1;
        }

        let table = self.report.table_mut(source_table);
        table.successful += 1;
        if written {
            table.inserted += 1;
        } else {
            table.duplicates += 1;
        }
    }

    pub fn record_failure(&mut self, failed: &FailedRecord) {
        let class = FailureClass::from(failed.stage);
        let totals = &mut self.report.totals;
        totals.failed += 1;
        match class {
            FailureClass::Parse => totals.parse_failures += 1,
            FailureClass::Validation => totals.validation_failures += 1,
            FailureClass::Insert => totals.insert_failures += 1,
        }
        if let Some(table) = failed.source_table.as_deref() {
            self.report.table_mut(table).failed += 1;
        }
        self.report.record_error(failed);
        self.display(class, failed);
    }

    fn display(&mut self, class: FailureClass, failed: &FailedRecord) {
        let shown = self.shown.entry(class).or_default();
        *shown += 1;

        let table = failed.source_table.as_deref().unwrap_or("?");
        let line = failed.line.map(|l| l.to_string()).unwrap_or_default();
        let code = failed.error.code.as_deref().unwrap_or("");

        if *shown <= self.display_limit {
            warn!(
                stage = %failed.stage,
                table,
                line,
                code,
                "{}",
                failed.error.message
            );
            if *shown == self.display_limit {
                warn!(stage = %failed.stage, "Further failures of this kind are logged at debug level");
            }
        } else {
            debug!(stage = %failed.stage, table, line, code, "{}", failed.error.message);
        }
    }

    pub fn add_finding(&mut self, finding: Finding) {
        self.report.add_finding(finding);
    }

    /// Logs running totals when a progress line is due.
    pub fn maybe_log_progress(&mut self) {
        let totals = &self.report.totals;
        if self.ticker.tick(totals.seen) {
            info!(
                seen = totals.seen,
                inserted = totals.inserted,
                duplicates = totals.duplicates,
                failed = totals.failed,
                rate = format!("{:.0}/s", self.ticker.rate(totals.seen)),
                "Progress"
            );
        }
    }

    pub fn finish(mut self, status: RunStatus, thresholds: &VerdictThresholds) -> MigrationReport {
        self.report.finish(status, thresholds);
        let totals = &self.report.totals;
        info!(
            status = ?status,
            seen = totals.seen,
            inserted = totals.inserted,
            duplicates = totals.duplicates,
            failed = totals.failed,
            verdict = %self.report.verdict,
            elapsed = format!("{:.1}s", self.ticker.elapsed().as_secs_f64()),
            "Run finished"
        );
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_config::report::verdict::Verdict;
    use tracing_test::traced_test;

    fn stats(limit: usize) -> MigrationStats {
        let settings = MigrationSettings {
            error_display_limit: limit,
            ..Default::default()
        };
        MigrationStats::new(SourceInfo::default(), &settings)
    }

    fn insert_failure(table: &str) -> FailedRecord {
        FailedRecord::new(ProcessingStage::Load, "Rejected", "value too long").with_source_table(table)
    }

    #[test]
    fn test_counts_per_class_and_table() {
        let mut stats = stats(5);
        for _ in 0..4 {
            stats.record_seen(Some("historique"));
        }
        stats.record_seen(None);
        stats.set_mapping("historique", "audit_logs", MappingOrigin::Convention);

        stats.record_loaded("historique", true);
        stats.record_loaded("historique", false);
        stats.record_failure(&insert_failure("historique"));
        stats.record_failure(
            &FailedRecord::new(ProcessingStage::Validation, "Validation", "missing nom")
                .with_source_table("historique"),
        );
        stats.record_failure(&FailedRecord::new(ProcessingStage::Parse, "LexError", "unbalanced"));

        let report = stats.finish(RunStatus::Completed, &VerdictThresholds::default());
        let totals = &report.totals;
        assert_eq!(totals.seen, 5);
        assert_eq!(totals.successful, 2);
        assert_eq!((totals.inserted, totals.duplicates), (1, 1));
        assert_eq!(totals.failed, 3);
        assert_eq!(
            (totals.parse_failures, totals.validation_failures, totals.insert_failures),
            (1, 1, 1)
        );

        let table = &report.tables["historique"];
        assert_eq!(table.target.as_deref(), Some("audit_logs"));
        assert_eq!((table.total, table.successful, table.failed), (4, 2, 2));
        assert_eq!(report.verdict, Verdict::NeedsInvestigation);
        assert_eq!(report.first_error.as_ref().unwrap().stage, "load");
    }

    #[traced_test]
    #[test]
    fn test_failure_display_is_rate_limited() {
        let mut stats = stats(2);
        for _ in 0..5 {
            stats.record_failure(&insert_failure("loyer"));
        }

        assert!(logs_contain("Further failures of this kind"));
        logs_assert(|lines: &[&str]| {
            let warned = lines
                .iter()
                .filter(|l| l.contains("WARN") && l.contains("value too long"))
                .count();
            if warned == 2 {
                Ok(())
            } else {
                Err(format!("expected 2 warnings, got {warned}"))
            }
        });
    }
}

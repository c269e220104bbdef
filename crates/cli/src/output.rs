use crate::error::CliError;
use engine_config::report::{
    finding::Severity, migration::MigrationReport, validation::ValidationReport,
};
use serde::Serialize;
use std::path::Path;

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub async fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), CliError> {
    let json = to_json(value)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| CliError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(path, json)
        .await
        .map_err(|source| CliError::Write {
            path: path.to_path_buf(),
            source,
        })
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", to_json(value)?);
    Ok(())
}

/// Final console summary of a migration run.
pub fn render_summary(report: &MigrationReport) -> String {
    let totals = &report.totals;
    let mode = if report.dry_run { " (dry run)" } else { "" };
    let mut lines = vec![
        format!("Migration {:?}{mode}: {}", report.status, report.verdict),
        "-----------------------------".to_string(),
        format!("{:<16} {}", "Source", report.source.location),
        format!("{:<16} {:.1}s", "Duration", report.duration_secs()),
        format!("{:<16} {}", "Seen", totals.seen),
        format!(
            "{:<16} {} ({} inserted, {} duplicates)",
            "Successful", totals.successful, totals.inserted, totals.duplicates
        ),
        format!(
            "{:<16} {} ({} parse, {} validation, {} insert)",
            "Failed",
            totals.failed,
            totals.parse_failures,
            totals.validation_failures,
            totals.insert_failures
        ),
    ];

    if !report.tables.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "{:<24} {:<24} {:>8} {:>8} {:>8}",
            "Source table", "Target", "Total", "OK", "Failed"
        ));
        lines.extend(report.tables.iter().map(|(source, table)| {
            format!(
                "{:<24} {:<24} {:>8} {:>8} {:>8}",
                source,
                table.target.as_deref().unwrap_or("-"),
                table.total,
                table.successful,
                table.failed
            )
        }));
    }

    if let Some(first) = &report.first_error {
        lines.push(String::new());
        lines.push(format!(
            "First error: [{}] {} (table {}, line {})",
            first.stage,
            first.message,
            first.source_table.as_deref().unwrap_or("?"),
            first.line.map(|l| l.to_string()).unwrap_or_else(|| "?".into())
        ));
    }

    let notable: Vec<String> = report
        .findings
        .iter()
        .filter(|f| f.severity != Severity::Info)
        .map(|f| format!("{:?}: {}", f.severity, f.message))
        .collect();
    if !notable.is_empty() {
        lines.push(String::new());
        lines.extend(notable);
    }
    to_text(lines)
}

pub fn render_validation(report: &ValidationReport) -> String {
    let mut lines = vec![format!(
        "Validated {} records: {} valid, {} invalid, {} warnings",
        report.total_records, report.valid_records, report.invalid_records, report.warnings_count
    )];
    lines.extend(report.by_category.iter().map(|(category, stats)| {
        format!(
            "  {:<14} {:>6} total {:>6} valid {:>6} invalid  ({:.1}%)",
            category,
            stats.total,
            stats.valid,
            stats.invalid,
            report.success_rate(category)
        )
    }));
    to_text(lines)
}

fn to_text(lines: Vec<String>) -> String {
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

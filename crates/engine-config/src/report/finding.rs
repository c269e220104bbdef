use serde::Serialize;

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum FindingKind {
    SourceData,  // encoding, malformed lines
    Mapping,     // auto-generated or extended mappings
    TargetSchema, // auto-created tables, keys, indexes
    Other,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Finding {
    pub code: String,    // stable programmatic id
    pub message: String, // human-readable
    pub severity: Severity,
    pub kind: FindingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>, // how to fix
}

/// Constants for finding codes.
const CODE_LOSSY_DECODE: &str = "LOSSY_DECODE";
const CODE_TABLE_CREATED: &str = "TABLE_CREATED";
const CODE_TABLE_WOULD_CREATE: &str = "TABLE_WOULD_CREATE";
const CODE_TABLE_CREATE_FAILED: &str = "TABLE_CREATE_FAILED";
const CODE_COLUMNS_ADDED: &str = "COLUMNS_ADDED";
const CODE_COLUMNS_NOT_ADDED: &str = "COLUMNS_NOT_ADDED";
const CODE_PRIMARY_KEY_FAILED: &str = "PRIMARY_KEY_FAILED";
const CODE_INDEX_FAILED: &str = "INDEX_FAILED";

impl Finding {
    pub fn new(
        code: &str,
        message: String,
        severity: Severity,
        kind: FindingKind,
        suggestion: Option<String>,
    ) -> Self {
        Finding {
            code: code.to_string(),
            message,
            severity,
            kind,
            suggestion,
        }
    }

    /// No candidate decoded the dump cleanly and bytes were replaced.
    pub fn new_lossy_decode(location: &str) -> Self {
        Self::new(
            CODE_LOSSY_DECODE,
            format!("`{location}` could not be decoded cleanly; invalid bytes were replaced"),
            Severity::Warning,
            FindingKind::SourceData,
            Some("Convert the dump to UTF-8 before importing to keep accented text intact.".into()),
        )
    }

    pub fn new_table_created(table: &str, source_table: &str) -> Self {
        Self::new(
            CODE_TABLE_CREATED,
            format!("Created table `{table}` for source table `{source_table}` with inferred column types"),
            Severity::Info,
            FindingKind::TargetSchema,
            Some("Review column types and constraints before relying on this table.".into()),
        )
    }

    pub fn new_table_would_create(table: &str, source_table: &str) -> Self {
        Self::new(
            CODE_TABLE_WOULD_CREATE,
            format!("Table `{table}` does not exist and would be created for `{source_table}`"),
            Severity::Info,
            FindingKind::TargetSchema,
            None,
        )
    }

    pub fn new_table_create_failed(table: &str, error: &str) -> Self {
        Self::new(
            CODE_TABLE_CREATE_FAILED,
            format!("Could not create table `{table}`: {error}"),
            Severity::Error,
            FindingKind::TargetSchema,
            Some("Create the table by hand or map the source table explicitly.".into()),
        )
    }

    pub fn new_columns_added(table: &str, columns: &[String]) -> Self {
        Self::new(
            CODE_COLUMNS_ADDED,
            format!("Added columns to `{table}`: {}", columns.join(", ")),
            Severity::Info,
            FindingKind::Mapping,
            None,
        )
    }

    /// Columns seen late for a table this run did not create; the table is left as is.
    pub fn new_columns_not_added(table: &str, columns: &[String]) -> Self {
        Self::new(
            CODE_COLUMNS_NOT_ADDED,
            format!(
                "Columns {} of `{table}` first appeared mid-run; the existing table was not altered",
                columns.join(", ")
            ),
            Severity::Warning,
            FindingKind::Mapping,
            Some("Check that the table has these columns; inserts touching missing ones fail.".into()),
        )
    }

    pub fn new_primary_key_failed(table: &str, error: &str) -> Self {
        Self::new(
            CODE_PRIMARY_KEY_FAILED,
            format!("Could not add a primary key on `{table}`(id): {error}"),
            Severity::Warning,
            FindingKind::TargetSchema,
            Some("Deduplicate the id column; reruns will insert duplicates until a key exists.".into()),
        )
    }

    pub fn new_index_failed(index: &str, error: &str) -> Self {
        Self::new(
            CODE_INDEX_FAILED,
            format!("Could not create index `{index}`: {error}"),
            Severity::Warning,
            FindingKind::TargetSchema,
            None,
        )
    }
}

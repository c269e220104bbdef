use crate::error::ExportError;
use chrono::Utc;
use indexmap::IndexMap;
use model::execution::validation::ValidationResult;
use serde_json::{Map, Value as JsonValue};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

const SOURCE_TAG: &str = "legacy_import";

/// Valid records grouped by category, written as one JSON array per category.
#[derive(Debug, Default)]
pub struct CategorizedExport {
    by_category: IndexMap<String, Vec<JsonValue>>,
}

impl CategorizedExport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the transformed form of a valid record. Invalid records are ignored.
    pub fn push(&mut self, result: &ValidationResult) {
        if !result.is_valid {
            return;
        }

        let mut object = match &result.transformed {
            Some(row) => row.to_json_object(),
            None => result.original.to_json_object(),
        };
        trim_strings(&mut object);
        object.insert("_imported_at".into(), Utc::now().to_rfc3339().into());
        object.insert("_source".into(), SOURCE_TAG.into());
        object.insert("_category".into(), result.category.clone().into());

        self.by_category
            .entry(result.category.clone())
            .or_default()
            .push(JsonValue::Object(object));
    }

    pub fn len(&self, category: &str) -> usize {
        self.by_category.get(category).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.by_category.is_empty()
    }

    /// Writes `<dir>/<category>.json` for every category with records.
    pub fn write_all(&self, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
        fs::create_dir_all(dir).map_err(|source| ExportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut written = Vec::with_capacity(self.by_category.len());
        for (category, records) in &self.by_category {
            let path = dir.join(format!("{category}.json"));
            let json = serde_json::to_string_pretty(records)?;
            fs::write(&path, json).map_err(|source| ExportError::Io {
                path: path.clone(),
                source,
            })?;
            info!(category = %category, records = records.len(), path = %path.display(), "Wrote categorized records");
            written.push(path);
        }
        Ok(written)
    }
}

fn trim_strings(object: &mut Map<String, JsonValue>) {
    for value in object.values_mut() {
        if let JsonValue::String(s) = value {
            let trimmed = s.trim();
            if trimmed.len() != s.len() {
                *s = trimmed.to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{
        core::value::{FieldValue, Value},
        records::{dump::DumpRecord, row::RowData},
    };

    fn result(valid: bool) -> ValidationResult {
        let original = DumpRecord::new(
            "locataire",
            vec!["id".into(), "nom".into()],
            vec![Value::Raw("1".into()), Value::String(" Curie ".into())],
        );
        let mut result = ValidationResult::new("locataires", original);
        result.transformed = Some(RowData::new(
            "tenants",
            vec![
                FieldValue::new("id", Value::Raw("1".into())),
                FieldValue::new("full_name", Value::String(" Curie ".into())),
            ],
        ));
        if !valid {
            result.error("Missing required field: prenom");
        }
        result
    }

    #[test]
    fn test_only_valid_records_are_exported() {
        let mut export = CategorizedExport::new();
        export.push(&result(true));
        export.push(&result(false));

        assert_eq!(export.len("locataires"), 1);
        assert_eq!(export.len("contrats"), 0);
    }

    #[test]
    fn test_write_all_adds_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let mut export = CategorizedExport::new();
        export.push(&result(true));

        let paths = export.write_all(dir.path()).unwrap();
        assert_eq!(paths, vec![dir.path().join("locataires.json")]);

        let text = fs::read_to_string(&paths[0]).unwrap();
        let json: JsonValue = serde_json::from_str(&text).unwrap();
        let entry = &json[0];
        assert_eq!(entry["full_name"], "Curie");
        assert_eq!(entry["id"], "1");
        assert_eq!(entry["_source"], "legacy_import");
        assert_eq!(entry["_category"], "locataires");
        assert!(entry["_imported_at"].is_string());
    }
}

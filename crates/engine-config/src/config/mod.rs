use crate::{
    error::ConfigError, report::verdict::VerdictThresholds, settings::MigrationSettings,
    settings::error::SettingsError,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::info;

/// Configuration the binary falls back to when no `--config` file is given.
pub const DEFAULT_CONFIG: &str = include_str!("default_mapping.toml");

/// Everything a deployment customizes: mappings, conventions, validation
/// rules, post-load indexes and default run settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    pub run: MigrationSettings,
    pub thresholds: VerdictThresholds,

    /// Explicit mappings keyed by lower-case source table.
    pub mappings: IndexMap<String, TableMappingConfig>,

    /// Source table → target table for tables without an explicit mapping.
    pub conventions: IndexMap<String, String>,

    pub indexes: Vec<IndexConfig>,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableMappingConfig {
    pub target: String,

    /// Source column → target column.
    #[serde(default)]
    pub columns: IndexMap<String, String>,

    #[serde(default)]
    pub unmapped: UnmappedColumns,
}

/// What happens to source columns an explicit mapping does not list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmappedColumns {
    #[default]
    Drop,
    /// Carried under their normalized name.
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    pub table: String,
    pub columns: Vec<String>,
    /// Defaults to `idx_<table>_<columns>`.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    pub processing_order: Vec<String>,
    pub categories: Vec<CategoryRules>,
}

/// Rules applied to every record of a category. Field names are source columns.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CategoryRules {
    pub name: String,
    /// Keywords; a source table belongs to the first category with a keyword it contains.
    pub tables: Vec<String>,
    pub required: Vec<String>,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub enums: IndexMap<String, Vec<String>>,
    pub amounts: Vec<String>,
    pub dates: Vec<String>,
    /// Field → referenced category.
    pub references: IndexMap<String, String>,
}

impl ImportConfig {
    /// The bundled configuration.
    pub fn bundled() -> Result<Self, ConfigError> {
        Self::from_toml(DEFAULT_CONFIG)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let mut config: ImportConfig = toml::from_str(text)?;
        config.normalize_keys();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        info!(
            path = %path.display(),
            mappings = config.mappings.len(),
            conventions = config.conventions.len(),
            categories = config.validation.categories.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Loads `path` when given, the bundled configuration otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::bundled(),
        }
    }

    fn normalize_keys(&mut self) {
        self.mappings = std::mem::take(&mut self.mappings)
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        self.conventions = std::mem::take(&mut self.conventions)
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.run.validate()?;
        self.thresholds.validate()?;

        for index in &self.indexes {
            if index.columns.is_empty() {
                return Err(SettingsError::EmptyIndex {
                    table: index.table.clone(),
                });
            }
        }

        let known = |name: &str| self.validation.category(name).is_some();
        for name in &self.validation.processing_order {
            if !known(name) {
                return Err(SettingsError::UnknownCategory(name.clone()));
            }
        }
        for rules in &self.validation.categories {
            if let Some(target) = rules.references.values().find(|c| !known(c)) {
                return Err(SettingsError::UnknownCategory(target.clone()));
            }
        }
        Ok(())
    }
}

impl ValidationConfig {
    pub fn category(&self, name: &str) -> Option<&CategoryRules> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Category a source table belongs to, if any.
    pub fn category_for_table(&self, source_table: &str) -> Option<&CategoryRules> {
        let table = source_table.to_lowercase();
        self.categories
            .iter()
            .find(|c| c.tables.iter().any(|k| table.contains(&k.to_lowercase())))
    }

    /// Position in the processing order; categories not listed come last.
    pub fn rank(&self, category: &str) -> usize {
        self.processing_order
            .iter()
            .position(|c| c == category)
            .unwrap_or(self.processing_order.len())
    }
}

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use model::execution::validation::ValidationResult;
use serde::Serialize;

const CATEGORY_ERROR_SAMPLES: usize = 10;

/// Outcome of the categorize-and-validate pass.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub total_records: u64,
    pub valid_records: u64,
    pub invalid_records: u64,
    pub warnings_count: u64,
    /// In processing order.
    pub by_category: IndexMap<String, CategoryReport>,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct CategoryReport {
    pub total: u64,
    pub valid: u64,
    pub invalid: u64,
    pub warnings: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors_sample: Vec<String>,
}

impl Default for ValidationReport {
    fn default() -> Self {
        ValidationReport {
            total_records: 0,
            valid_records: 0,
            invalid_records: 0,
            warnings_count: 0,
            by_category: IndexMap::new(),
            start_time: Utc::now(),
            end_time: None,
        }
    }
}

impl ValidationReport {
    pub fn record(&mut self, result: &ValidationResult) {
        let warnings = result.warnings.len() as u64;
        self.total_records += 1;
        self.warnings_count += warnings;

        let category = self.by_category.entry(result.category.clone()).or_default();
        category.total += 1;
        category.warnings += warnings;
        if result.is_valid {
            self.valid_records += 1;
            category.valid += 1;
        } else {
            self.invalid_records += 1;
            category.invalid += 1;
            let room = CATEGORY_ERROR_SAMPLES.saturating_sub(category.errors_sample.len());
            category
                .errors_sample
                .extend(result.errors.iter().take(room).cloned());
        }
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }

    pub fn success_rate(&self, category: &str) -> f64 {
        match self.by_category.get(category) {
            Some(c) if c.total > 0 => c.valid as f64 / c.total as f64 * 100.0,
            _ => 0.0,
        }
    }
}

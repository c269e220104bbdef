use engine_config::config::{CategoryRules, ValidationConfig};
use model::{execution::validation::ValidationResult, records::dump::DumpRecord};
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub mod patterns;

/// Applies category rules to source records.
///
/// Ids of valid records are remembered per category, so references can only
/// resolve to categories validated earlier in the same run.
pub struct Validator {
    config: ValidationConfig,
    reference_ids: HashMap<String, HashSet<String>>,
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Validator {
            config,
            reference_ids: HashMap::new(),
        }
    }

    /// Category a source table belongs to, if any.
    pub fn category_of(&self, source_table: &str) -> Option<&str> {
        self.config
            .category_for_table(source_table)
            .map(|c| c.name.as_str())
    }

    /// Position of `category` in the processing order.
    pub fn rank(&self, category: &str) -> usize {
        self.config.rank(category)
    }

    pub fn validate(&mut self, category: &str, record: DumpRecord) -> ValidationResult {
        let mut result = ValidationResult::new(category, record);
        if let Some(rules) = self.config.category(category) {
            check_record(rules, &self.reference_ids, &mut result);
        }

        if result.is_valid
            && let Some(id) = text_of(&result.original, "id")
        {
            self.reference_ids
                .entry(category.to_string())
                .or_default()
                .insert(id);
        }

        if !result.warnings.is_empty() {
            debug!(
                category,
                table = %result.original.source_table,
                warnings = ?result.warnings,
                "Record validated with warnings"
            );
        }
        result
    }
}

/// Trimmed text of a non-blank field.
fn text_of(record: &DumpRecord, field: &str) -> Option<String> {
    let value = record.get(field)?;
    if value.is_blank() {
        return None;
    }
    value.as_text().map(|t| t.trim().to_string())
}

fn check_record(
    rules: &CategoryRules,
    reference_ids: &HashMap<String, HashSet<String>>,
    result: &mut ValidationResult,
) {
    let record = result.original.clone();

    for field in &rules.required {
        if text_of(&record, field).is_none() {
            result.error(format!("Missing required field: {field}"));
        }
    }

    for field in &rules.emails {
        if let Some(text) = text_of(&record, field)
            && !patterns::is_email(&text)
        {
            result.warn(format!("Invalid email format: {text}"));
        }
    }

    for field in &rules.phones {
        if let Some(text) = text_of(&record, field)
            && !patterns::is_phone(&text)
        {
            result.warn(format!("Suspicious phone format: {text}"));
        }
    }

    for (field, allowed) in &rules.enums {
        if let Some(text) = text_of(&record, field) {
            let value = text.to_lowercase();
            if !allowed.iter().any(|a| a.to_lowercase() == value) {
                result.warn(format!("Unexpected value for {field}: {value}"));
            }
        }
    }

    for field in &rules.amounts {
        let Some(text) = text_of(&record, field) else {
            continue;
        };
        match patterns::parse_amount(&text) {
            Some(amount) if amount < 0.0 => {
                result.error(format!("Negative amount: {field} = {amount}"));
            }
            Some(_) => {}
            None => result.error(format!("Invalid amount: {field} = {text}")),
        }
    }

    for field in &rules.dates {
        if let Some(text) = text_of(&record, field)
            && !patterns::is_plausible_date(&text)
        {
            result.warn(format!("Suspicious date format: {field} = {text}"));
        }
    }

    for (field, category) in &rules.references {
        if let Some(id) = text_of(&record, field) {
            let resolved = reference_ids
                .get(category)
                .is_some_and(|ids| ids.contains(&id));
            if !resolved {
                result.warn(format!(
                    "Unresolved reference: {field} = {id} (to {category})"
                ));
            }
        }
    }
}

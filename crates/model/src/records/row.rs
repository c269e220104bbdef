use crate::core::value::{FieldValue, Value};
use serde::{Deserialize, Serialize};

/// A mapped record, ready to be written to `entity` in the target store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RowData {
    pub entity: String,
    pub field_values: Vec<FieldValue>,
}

impl RowData {
    pub fn new(entity: &str, field_values: Vec<FieldValue>) -> Self {
        RowData {
            entity: entity.to_string(),
            field_values,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.field_values
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(field))
    }

    pub fn get_value(&self, field: &str) -> Value {
        self.get(field)
            .map(|f| f.value.clone())
            .unwrap_or(Value::Null)
    }

    pub fn columns(&self) -> Vec<String> {
        self.field_values.iter().map(|f| f.name.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.field_values.iter().map(|f| f.value.clone()).collect()
    }

    /// Returns a copy with every value matching `predicate` replaced by null,
    /// and whether anything changed.
    pub fn with_nulled(&self, predicate: impl Fn(&Value) -> bool) -> (RowData, bool) {
        let mut changed = false;
        let field_values = self
            .field_values
            .iter()
            .map(|f| {
                if predicate(&f.value) {
                    changed = true;
                    FieldValue::new(f.name.clone(), Value::Null)
                } else {
                    f.clone()
                }
            })
            .collect();

        (
            RowData {
                entity: self.entity.clone(),
                field_values,
            },
            changed,
        )
    }

    /// JSON object view used by categorized exports.
    pub fn to_json_object(&self) -> serde_json::Map<String, serde_json::Value> {
        self.field_values
            .iter()
            .map(|f| (f.name.clone(), f.value.to_json()))
            .collect()
    }
}

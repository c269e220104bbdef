use crate::core::value::Value;
use serde::{Deserialize, Serialize};

/// One source record, as read from a dump line or a live source row.
///
/// `source_table` is lower-cased; column names keep the case found in the
/// source so explicit mappings can match them verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DumpRecord {
    pub source_table: String,
    pub columns: Vec<String>,
    pub values: Vec<Value>,
    /// 1-based line number in the dump file, when the record came from one.
    pub line: Option<usize>,
}

impl DumpRecord {
    pub fn new(source_table: &str, columns: Vec<String>, values: Vec<Value>) -> Self {
        DumpRecord {
            source_table: source_table.to_lowercase(),
            columns,
            values,
            line: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|idx| self.values.get(idx))
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.columns.iter().zip(self.values.iter())
    }

    /// Values rendered for diagnostics.
    pub fn value_strings(&self) -> Vec<String> {
        self.values.iter().map(|v| v.to_string()).collect()
    }

    pub fn to_json_object(&self) -> serde_json::Map<String, serde_json::Value> {
        self.pairs()
            .map(|(c, v)| (c.clone(), v.to_json()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let record = DumpRecord::new(
            "Historique",
            vec!["ID".into(), "objet".into()],
            vec![Value::Raw("1".into()), Value::String("notice".into())],
        )
        .at_line(7);

        assert_eq!(record.source_table, "historique");
        assert_eq!(record.get("id"), Some(&Value::Raw("1".into())));
        assert_eq!(record.get("missing"), None);
        assert_eq!(record.line, Some(7));
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Column type chosen for a table the pipeline has to create itself.
///
/// Derived from the target column name only; see the inference rules in
/// `engine_core::mapping::inference`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InferredColumnType {
    Integer,
    Timestamp,
    Decimal { precision: u8, scale: u8 },
    VarChar { length: u32 },
    Text,
}

impl InferredColumnType {
    pub const AMOUNT: InferredColumnType = InferredColumnType::Decimal {
        precision: 15,
        scale: 2,
    };

    pub const fn varchar(length: u32) -> Self {
        InferredColumnType::VarChar { length }
    }

    /// PostgreSQL spelling of the type.
    pub fn sql_name(&self) -> String {
        match self {
            InferredColumnType::Integer => "INTEGER".to_string(),
            InferredColumnType::Timestamp => "TIMESTAMP".to_string(),
            InferredColumnType::Decimal { precision, scale } => {
                format!("DECIMAL({precision},{scale})")
            }
            InferredColumnType::VarChar { length } => format!("VARCHAR({length})"),
            InferredColumnType::Text => "TEXT".to_string(),
        }
    }
}

impl fmt::Display for InferredColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_names() {
        assert_eq!(InferredColumnType::AMOUNT.sql_name(), "DECIMAL(15,2)");
        assert_eq!(InferredColumnType::varchar(100).to_string(), "VARCHAR(100)");
        assert_eq!(InferredColumnType::Timestamp.to_string(), "TIMESTAMP");
    }
}

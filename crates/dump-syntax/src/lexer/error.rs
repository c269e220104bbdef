use thiserror::Error;

/// Reasons an `INSERT` line cannot be turned into records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexerError {
    #[error("Expected {expected} at column {column}")]
    Expected {
        expected: &'static str,
        column: usize,
    },

    #[error("Missing table name after INSERT INTO")]
    MissingTable,

    #[error("Empty column name at position {position}")]
    EmptyColumn { position: usize },

    #[error("Unterminated quoted literal starting at column {column}")]
    UnterminatedQuote { column: usize },

    #[error("Unbalanced parentheses in value list")]
    UnbalancedParens,

    #[error("Unexpected trailing input at column {column}")]
    TrailingInput { column: usize },

    #[error("Table {table}: {columns} columns declared but {values} values found")]
    ColumnCountMismatch {
        table: String,
        columns: usize,
        values: usize,
    },
}

impl LexerError {
    /// Short machine-friendly name, used as the failure type in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            LexerError::Expected { .. } => "unexpected_syntax",
            LexerError::MissingTable => "missing_table",
            LexerError::EmptyColumn { .. } => "empty_column",
            LexerError::UnterminatedQuote { .. } => "unterminated_quote",
            LexerError::UnbalancedParens => "unbalanced_parens",
            LexerError::TrailingInput { .. } => "trailing_input",
            LexerError::ColumnCountMismatch { .. } => "column_count_mismatch",
        }
    }
}

//! Defines the `Dialect` trait for database-specific SQL syntax.

use model::core::{data_type::InferredColumnType, value::Value};

pub trait Dialect: Send + Sync {
    /// Wraps an identifier (like a table or column name) in the correct
    /// quotation marks for the dialect, escaping embedded quote characters.
    fn quote_identifier(&self, ident: &str) -> String;

    /// Renders a value as an inline literal.
    fn render_literal(&self, value: &Value) -> String;

    /// Renders an inferred column type into a database-specific SQL type.
    fn render_column_type(&self, column_type: &InferredColumnType) -> String;

    /// Returns the name of the dialect (e.g., "PostgreSQL").
    fn name(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct Postgres;

impl Dialect for Postgres {
    fn quote_identifier(&self, ident: &str) -> String {
        format!(r#""{}""#, ident.replace('"', r#""""#))
    }

    fn render_literal(&self, value: &Value) -> String {
        // standard_conforming_strings: backslashes are literal, quotes doubled
        value.to_string()
    }

    fn render_column_type(&self, column_type: &InferredColumnType) -> String {
        column_type.sql_name()
    }

    fn name(&self) -> String {
        "PostgreSQL".into()
    }
}

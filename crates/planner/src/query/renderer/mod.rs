//! Defines the core rendering trait and context for converting AST to SQL.

use crate::query::dialect::Dialect;

pub mod alter_table;
pub mod create_index;
pub mod create_table;
pub mod insert;
pub mod transaction;

/// A trait for any AST node that can be rendered into a SQL string.
pub trait Render {
    fn render(&self, renderer: &mut Renderer);
}

/// Accumulates the SQL text and gives access to the dialect.
///
/// Values are inlined as literals; the statements are sent over the simple
/// query protocol so the target resolves literal types from the columns.
pub struct Renderer<'a> {
    pub sql: String,
    pub dialect: &'a dyn Dialect,
}

impl<'a> Renderer<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self {
            sql: String::new(),
            dialect,
        }
    }

    pub fn finish(self) -> String {
        self.sql
    }

    pub fn push_ident(&mut self, ident: &str) {
        let quoted = self.dialect.quote_identifier(ident);
        self.sql.push_str(&quoted);
    }

    pub fn push_ident_list(&mut self, idents: &[String]) {
        let quoted: Vec<String> = idents
            .iter()
            .map(|c| self.dialect.quote_identifier(c))
            .collect();
        self.sql.push_str(&quoted.join(", "));
    }
}

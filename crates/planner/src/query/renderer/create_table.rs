use crate::query::{
    ast::create_table::{ColumnDef, CreateTable},
    renderer::{Render, Renderer},
};

impl Render for CreateTable {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("CREATE TABLE ");
        if self.if_not_exists {
            r.sql.push_str("IF NOT EXISTS ");
        }
        r.push_ident(&self.table);
        r.sql.push_str(" (");
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                r.sql.push_str(", ");
            }
            column.render(r);
        }
        r.sql.push(')');
    }
}

impl Render for ColumnDef {
    fn render(&self, r: &mut Renderer) {
        r.push_ident(&self.name);
        r.sql.push(' ');
        let type_name = r.dialect.render_column_type(&self.data_type);
        r.sql.push_str(&type_name);
    }
}

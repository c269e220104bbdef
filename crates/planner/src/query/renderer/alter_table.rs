use crate::query::{
    ast::alter_table::{AlterAction, AlterTable},
    renderer::{Render, Renderer},
};

impl Render for AlterTable {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("ALTER TABLE ");
        r.push_ident(&self.table);
        match &self.action {
            AlterAction::AddColumns(columns) => {
                for (i, column) in columns.iter().enumerate() {
                    r.sql.push_str(if i == 0 { " " } else { ", " });
                    r.sql.push_str("ADD COLUMN IF NOT EXISTS ");
                    column.render(r);
                }
            }
            AlterAction::AddPrimaryKey(columns) => {
                r.sql.push_str(" ADD PRIMARY KEY (");
                r.push_ident_list(columns);
                r.sql.push(')');
            }
        }
    }
}

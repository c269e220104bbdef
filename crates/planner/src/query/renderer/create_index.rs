use crate::query::{
    ast::create_index::CreateIndex,
    renderer::{Render, Renderer},
};

impl Render for CreateIndex {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("CREATE INDEX IF NOT EXISTS ");
        r.push_ident(&self.name);
        r.sql.push_str(" ON ");
        r.push_ident(&self.table);
        r.sql.push_str(" (");
        r.push_ident_list(&self.columns);
        r.sql.push(')');
    }
}

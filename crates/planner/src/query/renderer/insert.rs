use crate::query::{
    ast::insert::Insert,
    renderer::{Render, Renderer},
};

impl Render for Insert {
    fn render(&self, r: &mut Renderer) {
        // 1. INSERT INTO table (...)
        r.sql.push_str("INSERT INTO ");
        r.push_ident(&self.table);
        r.sql.push_str(" (");
        r.push_ident_list(&self.columns);
        r.sql.push(')');

        // 2. VALUES (...)
        r.sql.push_str(" VALUES (");
        let literals: Vec<String> = self
            .values
            .iter()
            .map(|v| r.dialect.render_literal(v))
            .collect();
        r.sql.push_str(&literals.join(", "));
        r.sql.push(')');

        // 3. ON CONFLICT
        if let Some(on_conflict) = &self.on_conflict {
            r.sql.push_str(" ON CONFLICT");
            if !on_conflict.columns.is_empty() {
                r.sql.push_str(" (");
                r.push_ident_list(&on_conflict.columns);
                r.sql.push(')');
            }
            r.sql.push_str(" DO NOTHING");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::query::{
        ast::insert::{Insert, OnConflict},
        dialect::Postgres,
        to_sql,
    };
    use model::{
        core::value::{FieldValue, Value},
        records::row::RowData,
    };

    #[test]
    fn test_idempotent_insert() {
        let row = RowData::new(
            "audit_logs",
            vec![
                FieldValue::new("id", Value::Raw("1".into())),
                FieldValue::new("date", Value::Null),
                FieldValue::new("objet", Value::String("rent notice".into())),
            ],
        );

        assert_eq!(
            to_sql(&Insert::idempotent(&row), &Postgres),
            r#"INSERT INTO "audit_logs" ("id", "date", "objet") VALUES ('1', NULL, 'rent notice') ON CONFLICT DO NOTHING"#
        );
    }

    #[test]
    fn test_conflict_target_columns() {
        let insert = Insert {
            table: "owners".into(),
            columns: vec!["id".into()],
            values: vec![Value::Int(4)],
            on_conflict: Some(OnConflict {
                columns: vec!["id".into()],
            }),
        };

        assert_eq!(
            to_sql(&insert, &Postgres),
            r#"INSERT INTO "owners" ("id") VALUES ('4') ON CONFLICT ("id") DO NOTHING"#
        );
    }
}

use crate::query::{
    ast::transaction::TransactionControl,
    renderer::{Render, Renderer},
};

impl Render for TransactionControl {
    fn render(&self, r: &mut Renderer) {
        match self {
            TransactionControl::Begin => r.sql.push_str("BEGIN"),
            TransactionControl::Commit => r.sql.push_str("COMMIT"),
            TransactionControl::Rollback => r.sql.push_str("ROLLBACK"),
            TransactionControl::Savepoint(name) => {
                r.sql.push_str("SAVEPOINT ");
                r.push_ident(name);
            }
            TransactionControl::Release(name) => {
                r.sql.push_str("RELEASE SAVEPOINT ");
                r.push_ident(name);
            }
            TransactionControl::RollbackTo(name) => {
                r.sql.push_str("ROLLBACK TO SAVEPOINT ");
                r.push_ident(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::query::{ast::transaction::TransactionControl, dialect::Postgres, to_sql};

    #[test]
    fn test_savepoint_statements() {
        assert_eq!(
            to_sql(&TransactionControl::Savepoint("sp_batch".into()), &Postgres),
            r#"SAVEPOINT "sp_batch""#
        );
        assert_eq!(
            to_sql(&TransactionControl::RollbackTo("sp_row".into()), &Postgres),
            r#"ROLLBACK TO SAVEPOINT "sp_row""#
        );
        assert_eq!(to_sql(&TransactionControl::Commit, &Postgres), "COMMIT");
    }
}

//! Runs against a live PostgreSQL at `TEST_PG_URL`; `cargo test -- --ignored`.

#[cfg(test)]
mod tests {
    use crate::{
        reset_postgres_schema,
        utils::{
            AGENCY_DUMP, HISTORIQUE_DUMP, execute, get_cell_as_string, get_row_count,
            get_table_names, migrate, pg_target, settings,
        },
    };
    use engine_config::{report::migration::RunStatus, settings::MigrationSettings};
    use tracing_test::traced_test;

    // Scenario: the history dump goes into an empty database.
    // Expected Outcome:
    // - `audit_logs` is created with a primary key and the configured indexes.
    // - The zero date is stored as NULL.
    #[traced_test]
    #[tokio::test]
    #[ignore]
    async fn tc01() {
        reset_postgres_schema().await;

        let report = migrate(HISTORIQUE_DUMP, Some(pg_target().await), settings())
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(get_table_names().await, vec!["audit_logs"]);
        assert_eq!(get_row_count("audit_logs").await, 1);
        assert_eq!(
            get_cell_as_string("SELECT date::text FROM audit_logs WHERE id = 1").await,
            None
        );
        assert_eq!(
            get_cell_as_string("SELECT objet FROM audit_logs WHERE id = 1").await,
            Some("rent notice".to_string())
        );
        assert_eq!(
            get_cell_as_string(
                "SELECT count(*)::text FROM pg_indexes WHERE tablename = 'audit_logs'"
            )
            .await,
            Some("3".to_string())
        );
    }

    // Scenario: the agency dump is migrated twice.
    // Expected Outcome: row counts after the second run equal those after the first.
    #[traced_test]
    #[tokio::test]
    #[ignore]
    async fn tc02() {
        reset_postgres_schema().await;

        migrate(AGENCY_DUMP, Some(pg_target().await), settings())
            .await
            .unwrap();
        let report = migrate(AGENCY_DUMP, Some(pg_target().await), settings())
            .await
            .unwrap();

        assert_eq!(report.totals.inserted, 0);
        assert_eq!(report.totals.duplicates, 9);
        for (table, rows) in [
            ("contracts", 2),
            ("audit_logs", 2),
            ("properties", 2),
            ("tenants", 2),
            ("owners", 1),
        ] {
            assert_eq!(get_row_count(table).await, rows, "{table}");
        }
    }

    // Scenario: the target already has `audit_logs` with a CHECK constraint one row violates.
    // Expected Outcome: only that row is missing and the run completes.
    #[traced_test]
    #[tokio::test]
    #[ignore]
    async fn tc03() {
        reset_postgres_schema().await;
        execute(
            r#"
            CREATE TABLE audit_logs (
                id INTEGER PRIMARY KEY,
                locataire_id INTEGER,
                date TIMESTAMP,
                objet VARCHAR(255) CHECK (objet <> 'Bail signé')
            );
        "#,
        )
        .await;

        let report = migrate(AGENCY_DUMP, Some(pg_target().await), settings())
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.tables["historique"].failed, 1);
        assert_eq!(
            report.first_error.as_ref().and_then(|e| e.code.as_deref()),
            Some("23514")
        );
        assert_eq!(get_row_count("audit_logs").await, 1);
    }

    // Scenario: dry run against an empty database.
    // Expected Outcome: no table is created.
    #[traced_test]
    #[tokio::test]
    #[ignore]
    async fn tc04() {
        reset_postgres_schema().await;

        let dry = MigrationSettings {
            dry_run: true,
            ..settings()
        };
        let report = migrate(AGENCY_DUMP, Some(pg_target().await), dry)
            .await
            .unwrap();

        assert_eq!(report.totals.successful, 9);
        assert!(get_table_names().await.is_empty());
    }
}

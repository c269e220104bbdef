use crate::{
    commands::{Commands, SourceArgs},
    conn::ConnectionKind,
    env::{DATABASE_URL, EnvManager, MYSQL_URL},
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use connectors::{
    file::dump::source::DumpSource,
    source::RecordSource,
    sql::{
        base::destination::TargetStore,
        mysql::{adapter::MySqlAdapter, source::MySqlSource},
        postgres::adapter::PgAdapter,
    },
};
use engine_config::{
    config::ImportConfig,
    report::migration::{MigrationReport, RunStatus},
};
use engine_runtime::{
    error::MigrationError,
    execution::{self, categorize::categorize, preview::preview_mapping},
};
use std::{path::Path, str::FromStr, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod env;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "legacy-import",
    version,
    about = "Import legacy MySQL dumps into PostgreSQL"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let code = match run(cli.command, &shutdown).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "legacy-import failed");
            eprintln!("Error: {err}");
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.as_i32());
}

async fn run(command: Commands, shutdown: &ShutdownCoordinator) -> Result<ExitCode, CliError> {
    match command {
        Commands::Migrate {
            source,
            target,
            config,
            dry_run,
            validate,
            only_tables,
            batch_size,
            commit_interval,
            report,
            env_file,
        } => {
            let mut env = EnvManager::new();
            if let Some(path) = &env_file {
                env.load_from_file(path)?;
            }
            let config = ImportConfig::load(config.as_deref())?;

            let mut settings = config.run.clone().with_only_tables(&only_tables);
            settings.dry_run = dry_run;
            settings.validate = validate;
            if let Some(n) = batch_size {
                settings.batch_size = n;
            }
            if let Some(n) = commit_interval {
                settings.commit_interval = n;
            }

            let mut source = open_source(&source, &env, settings.batch_size).await?;
            let target = match env.resolve(target, DATABASE_URL) {
                Some(url) => Some(connect_target(&url).await?),
                None => None,
            };

            let result = execution::run(
                source.as_mut(),
                target,
                &config,
                settings,
                shutdown.cancel_token(),
            )
            .await;
            migrate_outcome(result, report.as_deref(), shutdown).await
        }
        Commands::Validate {
            dump,
            config,
            output_dir,
            report,
        } => {
            let config = ImportConfig::load(config.as_deref())?;
            let mut source = DumpSource::open(&dump)?;
            let outcome = categorize(
                &mut source,
                &config,
                &config.run,
                shutdown.cancel_token(),
            )
            .await?;

            if outcome.interrupted {
                info!("Validation interrupted, nothing written");
                return Ok(ExitCode::ShutdownRequested);
            }

            let written = outcome.export.write_all(&output_dir)?;
            let report_path = report.unwrap_or_else(|| output_dir.join("validation_report.json"));
            output::write_json(&outcome.report, &report_path).await?;
            info!(
                files = written.len(),
                report = %report_path.display(),
                "Categorized records written"
            );

            print!("{}", output::render_validation(&outcome.report));
            if outcome.uncategorized > 0 || outcome.malformed > 0 {
                println!(
                    "Skipped {} uncategorized records and {} malformed lines",
                    outcome.uncategorized, outcome.malformed
                );
            }
            Ok(ExitCode::Success)
        }
        Commands::Mapping {
            dump,
            config,
            target,
        } => {
            let config = ImportConfig::load(config.as_deref())?;
            let mut source = DumpSource::open(&dump)?;
            let target = match target {
                Some(url) => Some(connect_target(&url).await?),
                None => None,
            };

            let report = preview_mapping(
                &mut source,
                target.as_deref(),
                &config,
                &config.run,
            )
            .await?;
            output::print_json(&report)?;
            Ok(ExitCode::Success)
        }
        Commands::TestConn { format, conn_str } => {
            let kind = ConnectionKind::from_str(&format)
                .map_err(|_| CliError::InvalidConnectionFormat(format))?;
            kind.pinger(conn_str).ping().await?;
            println!("Connection OK");
            Ok(ExitCode::Success)
        }
    }
}

async fn open_source(
    args: &SourceArgs,
    env: &EnvManager,
    chunk_size: usize,
) -> Result<Box<dyn RecordSource>, CliError> {
    if let Some(path) = &args.dump {
        return Ok(Box::new(DumpSource::open(path)?));
    }
    let Some(url) = env.resolve(args.mysql_url.clone(), MYSQL_URL) else {
        return Err(CliError::MissingSource);
    };
    let adapter = MySqlAdapter::connect(&url)?;
    let source = MySqlSource::start(adapter, args.mysql_tables.clone(), chunk_size).await?;
    Ok(Box::new(source))
}

async fn connect_target(url: &str) -> Result<Arc<dyn TargetStore>, CliError> {
    let adapter = PgAdapter::connect(url).await?;
    info!("Connected to target");
    Ok(Arc::new(adapter))
}

/// Prints and saves the report, then maps the run status to an exit code.
async fn migrate_outcome(
    result: Result<MigrationReport, MigrationError>,
    report_path: Option<&Path>,
    shutdown: &ShutdownCoordinator,
) -> Result<ExitCode, CliError> {
    let (report, failure) = match result {
        Ok(report) => (report, None),
        Err(MigrationError::Aborted { source, report }) => (*report, Some(*source)),
        Err(err) => return Err(err.into()),
    };

    print!("{}", output::render_summary(&report));
    if let Some(path) = report_path {
        output::write_json(&report, path).await?;
        info!(path = %path.display(), "Report written");
    }

    if let Some(err) = failure {
        return Err(err.into());
    }
    if report.status == RunStatus::Interrupted || shutdown.is_shutdown_requested() {
        return Ok(ExitCode::ShutdownRequested);
    }
    Ok(ExitCode::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_config::settings::MigrationSettings;
    use std::path::PathBuf;

    #[test]
    fn test_cli_parses_migrate_flags() {
        let cli = Cli::try_parse_from([
            "legacy-import",
            "migrate",
            "--dump",
            "legacy.sql",
            "--dry-run",
            "--only-tables",
            "historique,locataire",
            "--batch-size",
            "500",
        ])
        .unwrap();

        let Commands::Migrate {
            source,
            dry_run,
            only_tables,
            batch_size,
            target,
            ..
        } = cli.command
        else {
            panic!("expected migrate");
        };
        assert_eq!(source.dump, Some(PathBuf::from("legacy.sql")));
        assert!(dry_run);
        assert_eq!(only_tables, vec!["historique", "locataire"]);
        assert_eq!(batch_size, Some(500));
        assert_eq!(target, None);
    }

    #[test]
    fn test_dump_and_mysql_are_exclusive() {
        let parsed = Cli::try_parse_from([
            "legacy-import",
            "migrate",
            "--dump",
            "a.sql",
            "--mysql-url",
            "mysql://root@localhost/agence",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_only_tables_are_normalized() {
        let config = ImportConfig::bundled().unwrap();
        let settings = config.run.clone().with_only_tables([" Historique ", ""]);
        assert!(settings.allows("historique"));
        assert!(!settings.allows("locataire"));
    }

    #[tokio::test]
    async fn test_missing_source_is_an_error() {
        let args = SourceArgs {
            dump: None,
            mysql_url: None,
            mysql_tables: Vec::new(),
        };
        let mut env = EnvManager::new();
        env.load_from_file(write_env("MYSQL_URL=\n").path()).unwrap();

        let err = open_source(&args, &env, 100).await.err().unwrap();
        assert!(matches!(err, CliError::MissingSource));
    }

    #[tokio::test]
    async fn test_interrupted_run_exits_130() {
        let config = ImportConfig::bundled().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let settings = MigrationSettings {
            dry_run: true,
            ..Default::default()
        };
        let mut source = DumpSource::from_text(
            "dump.sql",
            "INSERT INTO historique (id) VALUES (1);\n",
        );

        let result = execution::run(&mut source, None, &config, settings, cancel).await;
        let shutdown = ShutdownCoordinator::new(CancellationToken::new());
        let code = migrate_outcome(result, None, &shutdown).await.unwrap();
        assert_eq!(code, ExitCode::ShutdownRequested);
    }

    fn write_env(content: &str) -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }
}

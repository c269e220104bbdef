use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Load a dump file or a live MySQL database into PostgreSQL
    Migrate {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, help = "Target PostgreSQL URL (defaults to DATABASE_URL)")]
        target: Option<String>,

        #[arg(long, help = "Mapping configuration file (TOML); the bundled one is used otherwise")]
        config: Option<PathBuf>,

        #[arg(long, help = "Parse and map but never write to the target")]
        dry_run: bool,

        #[arg(long, help = "Validate categorized records before loading, parents first")]
        validate: bool,

        #[arg(
            long,
            value_delimiter = ',',
            help = "Only process these source tables (comma separated)"
        )]
        only_tables: Vec<String>,

        #[arg(long, help = "Records per batch")]
        batch_size: Option<usize>,

        #[arg(long, help = "Commit every N batches (0 commits once at the end)")]
        commit_interval: Option<usize>,

        #[arg(long, help = "Write the JSON run report to this file")]
        report: Option<PathBuf>,

        #[arg(long, help = "Load environment variables from this file")]
        env_file: Option<PathBuf>,
    },
    /// Categorize and validate a dump, writing one JSON file per category
    Validate {
        #[arg(long, help = "SQL dump file")]
        dump: PathBuf,

        #[arg(long, help = "Mapping configuration file (TOML)")]
        config: Option<PathBuf>,

        #[arg(long, default_value = "categorized_data", help = "Directory for the category files")]
        output_dir: PathBuf,

        #[arg(long, help = "Validation report path (defaults to <output-dir>/validation_report.json)")]
        report: Option<PathBuf>,
    },
    /// Print how every table of a dump would be mapped, as JSON
    Mapping {
        #[arg(long, help = "SQL dump file")]
        dump: PathBuf,

        #[arg(long, help = "Mapping configuration file (TOML)")]
        config: Option<PathBuf>,

        #[arg(long, help = "Target PostgreSQL URL, consulted read-only for existing tables")]
        target: Option<String>,
    },
    /// Test a connection string against a given format
    TestConn {
        /// Data format: "mysql" or "pg"
        #[arg(long)]
        format: String,

        /// Connection string
        #[arg(long)]
        conn_str: String,
    },
}

#[derive(Args)]
pub struct SourceArgs {
    #[arg(long, conflicts_with = "mysql_url", help = "SQL dump file")]
    pub dump: Option<PathBuf>,

    #[arg(long, help = "Legacy MySQL URL to stream from (defaults to MYSQL_URL)")]
    pub mysql_url: Option<String>,

    #[arg(long = "mysql-table", help = "Table to stream from MySQL; repeatable, all tables when omitted")]
    pub mysql_tables: Vec<String>,
}

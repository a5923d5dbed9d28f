use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use mssql_temp_table_finder::{
    report, run_audit, scan_sql_files, AuditOptions, ConnectionSettings, ScanOptions,
};

#[derive(Parser)]
#[command(name = "mssql-temp-table-finder")]
#[command(author, version, about = "Find temp tables that SQL Server stored procedures create but never drop")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit every stored procedure in a SQL Server database
    Audit {
        /// Server host name or address
        #[arg(short, long, env = "MSSQL_SERVER")]
        server: String,

        /// Server port
        #[arg(long, env = "MSSQL_PORT", default_value_t = 1433)]
        port: u16,

        /// Database name
        #[arg(short, long, env = "MSSQL_DATABASE")]
        database: String,

        /// SQL login name
        #[arg(short, long, env = "MSSQL_USER")]
        user: String,

        /// SQL login password
        #[arg(long, env = "MSSQL_PASSWORD", hide_env_values = true)]
        password: String,

        /// Accept the server certificate without validation
        #[arg(long, env = "MSSQL_TRUST_CERT")]
        trust_cert: bool,

        /// Output path for the xlsx report (defaults to ./<timestamp>_output.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of scanning threads
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Audit stored procedure scripts on disk
    Scan {
        /// A .sql file or a directory of .sql files
        #[arg(short, long)]
        path: PathBuf,

        /// Also write an xlsx report to this path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of scanning threads
        #[arg(short, long)]
        jobs: Option<usize>,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; flags and the environment still apply
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);
    tracing::info!("mssql-temp-table-finder v{} started", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Audit {
            server,
            port,
            database,
            user,
            password,
            trust_cert,
            output,
            jobs,
        } => {
            let options = AuditOptions {
                connection: ConnectionSettings {
                    host: server,
                    port,
                    database,
                    user,
                    password,
                    trust_cert,
                },
                output_path: output.unwrap_or_else(report::default_report_path),
                jobs,
            };

            let summary = run_audit(options).await?;
            report::print_findings(&summary.outcome);
            if let Some(path) = summary.report_path {
                println!("Entries written to excel file: {}", path.display());
            }
        }
        Commands::Scan { path, output, jobs } => {
            let options = ScanOptions {
                input_path: path,
                output_path: output,
                jobs,
            };

            let summary = scan_sql_files(&options)?;
            report::print_findings(&summary.outcome);
            if let Some(path) = summary.report_path {
                println!("Entries written to excel file: {}", path.display());
            }
        }
    }

    Ok(())
}

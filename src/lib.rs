//! mssql-temp-table-finder: audit SQL Server stored procedures for temp tables
//! that are created but never dropped
//!
//! Procedure definitions come either from a live database ([`catalog`]) or
//! from `.sql` files ([`source_files`]). Each definition is normalized by the
//! [`formatter`], scanned by the [`tracker`], and procedures with orphaned
//! temp tables are written to a spreadsheet [`report`].

pub mod audit;
pub mod catalog;
pub mod error;
pub mod formatter;
pub mod report;
pub mod source_files;
pub mod tracker;
mod util;

use std::path::{Path, PathBuf};

use anyhow::Result;

pub use audit::{AuditOutcome, ProcedureFinding, ProcedureSource, SkippedProcedure};
pub use catalog::{ConnectionSettings, ProcedureCatalog, ProcedureName, SqlServerCatalog};
pub use error::TempTableFinderError;
pub use formatter::{SqlFormatter, TokenFormatter};
pub use tracker::scan;

/// Options for auditing a live database
#[derive(Debug, Clone)]
pub struct AuditOptions {
    /// Connection parameters
    pub connection: ConnectionSettings,
    /// Output path for the xlsx report
    pub output_path: PathBuf,
    /// Worker threads used for scanning (defaults to one per core)
    pub jobs: Option<usize>,
}

/// Options for auditing `.sql` files on disk
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// A `.sql` file or a directory searched recursively
    pub input_path: PathBuf,
    /// Optional xlsx report path
    pub output_path: Option<PathBuf>,
    /// Worker threads used for scanning (defaults to one per core)
    pub jobs: Option<usize>,
}

/// Outcome of a run plus where the report ended up
#[derive(Debug, Clone)]
pub struct AuditSummary {
    pub outcome: AuditOutcome,
    /// `None` when no report was requested or writing it failed
    pub report_path: Option<PathBuf>,
}

/// Audit every stored procedure in a database
///
/// Connection and enumeration failures abort the run. A procedure whose
/// definition cannot be fetched, is empty, or cannot be formatted is skipped.
/// A failure to write the report is logged and does not fail the run.
pub async fn run_audit(options: AuditOptions) -> Result<AuditSummary> {
    let connection = &options.connection;
    tracing::info!(server = %connection.server(), database = %connection.database, "Connecting");

    let mut catalog = SqlServerCatalog::connect(connection).await?;
    tracing::info!("Connection to the database succeeded");

    audit_catalog(&mut catalog, options.output_path, options.jobs).await
}

/// Audit every procedure a catalog lists, writing the report to `output_path`
pub async fn audit_catalog<C: ProcedureCatalog + ?Sized>(
    catalog: &mut C,
    output_path: PathBuf,
    jobs: Option<usize>,
) -> Result<AuditSummary> {
    // Step 1: Enumerate procedures
    let names = catalog.procedure_names().await?;
    if names.is_empty() {
        return Err(TempTableFinderError::NoProceduresFound {
            database: catalog.database().to_string(),
        }
        .into());
    }
    tracing::info!(count = names.len(), "Fetched stored procedure names");

    // Step 2: Fetch definitions one at a time over the shared connection
    let mut sources = Vec::with_capacity(names.len());
    let mut unfetched = Vec::new();
    for (index, name) in names.iter().enumerate() {
        tracing::debug!(procedure = %name, progress = index + 1, total = names.len(), "Fetching");
        match catalog.procedure_definition(name).await {
            Ok(Some(definition)) => sources.push(ProcedureSource::new(name.to_string(), definition)),
            Ok(None) => {
                tracing::warn!(procedure = %name, "Procedure definition was empty");
                unfetched.push(SkippedProcedure {
                    procedure: name.to_string(),
                    reason: "empty definition".to_string(),
                });
            }
            Err(e) => {
                tracing::error!(procedure = %name, error = %e, "Could not get procedure contents");
                unfetched.push(SkippedProcedure {
                    procedure: name.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    // Steps 3-4: Format, scan and write the report off the async runtime
    let summary = tokio::task::spawn_blocking(move || {
        finish_audit(&sources, unfetched, Some(output_path.as_path()), jobs)
    })
    .await??;
    Ok(summary)
}

/// Audit `.sql` files on disk
pub fn scan_sql_files(options: &ScanOptions) -> Result<AuditSummary> {
    let (sources, unread) = source_files::collect_sql_sources(&options.input_path)?;
    tracing::info!(files = sources.len(), path = %options.input_path.display(), "Loaded SQL files");

    Ok(finish_audit(
        &sources,
        unread,
        options.output_path.as_deref(),
        options.jobs,
    )?)
}

/// Scan the sources, put earlier skips ahead of scan-time skips and write the
/// report when a path is given
fn finish_audit(
    sources: &[ProcedureSource],
    skipped: Vec<SkippedProcedure>,
    output_path: Option<&Path>,
    jobs: Option<usize>,
) -> std::result::Result<AuditSummary, TempTableFinderError> {
    let mut outcome = audit::audit_sources_with_jobs(sources, &TokenFormatter, jobs)?;
    outcome.prepend_skipped(skipped);
    log_outcome(&outcome);

    let report_path = output_path.and_then(|path| write_report_logged(path, &outcome));

    Ok(AuditSummary {
        outcome,
        report_path,
    })
}

fn log_outcome(outcome: &AuditOutcome) {
    tracing::info!(
        scanned = outcome.scanned,
        skipped = outcome.skipped.len(),
        with_orphans = outcome.findings.len(),
        orphaned_tables = outcome.orphaned_count(),
        "Audit finished"
    );
}

fn write_report_logged(path: &Path, outcome: &AuditOutcome) -> Option<PathBuf> {
    match report::write_report(path, &outcome.findings) {
        Ok(()) => Some(path.canonicalize().unwrap_or_else(|_| path.to_path_buf())),
        Err(e) => {
            tracing::error!(error = %e, "Could not write report");
            None
        }
    }
}

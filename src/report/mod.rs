//! Audit report output
//!
//! Findings are written to a two-column spreadsheet (procedure name, orphaned
//! temp tables) or printed as plain text.

use std::path::{Path, PathBuf};

use chrono::Local;
use rust_xlsxwriter::{Format, FormatBorder, Workbook, Worksheet};

use crate::audit::{AuditOutcome, ProcedureFinding};
use crate::error::TempTableFinderError;

const HEADERS: [&str; 2] = ["SP Name", "Table Names"];
const HEADER_FONT_SIZE: u32 = 16;
const NAME_COLUMN_WIDTH: u32 = 75;
const TABLES_COLUMN_WIDTH: u32 = 50;

/// `./<YYYY_MM_DD_HH_MM>_output.xlsx` in the current directory
pub fn default_report_path() -> PathBuf {
    let timestamp = Local::now().format("%Y_%m_%d_%H_%M");
    PathBuf::from(".").join(format!("{}_output.xlsx", timestamp))
}

/// Write findings to an xlsx workbook at `path`.
///
/// The header row is bold; every written cell wraps text and has thin
/// borders. Temp table names share one cell, one name per line.
pub fn write_report(path: &Path, findings: &[ProcedureFinding]) -> Result<(), TempTableFinderError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let cell_format = Format::new()
        .set_text_wrap()
        .set_border(FormatBorder::Thin);
    let header_format = cell_format
        .clone()
        .set_bold()
        .set_font_size(HEADER_FONT_SIZE);

    write_rows(worksheet, findings, &header_format, &cell_format).map_err(|e| {
        TempTableFinderError::ReportWriteError {
            path: path.to_path_buf(),
            source: e,
        }
    })?;
    style_columns(worksheet)?;

    workbook
        .save(path)
        .map_err(|e| TempTableFinderError::ReportWriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

    tracing::info!(path = %path.display(), rows = findings.len(), "Report written");
    Ok(())
}

fn write_rows(
    worksheet: &mut Worksheet,
    findings: &[ProcedureFinding],
    header_format: &Format,
    cell_format: &Format,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    for (col, header) in (0u16..).zip(HEADERS) {
        worksheet.write_string_with_format(0, col, header, header_format)?;
    }

    for (row, finding) in (1u32..).zip(findings) {
        let tables = finding
            .orphaned
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        worksheet.write_string_with_format(row, 0, &finding.procedure, cell_format)?;
        worksheet.write_string_with_format(row, 1, &tables, cell_format)?;
    }

    Ok(())
}

fn style_columns(worksheet: &mut Worksheet) -> Result<(), TempTableFinderError> {
    worksheet.set_column_width(0, NAME_COLUMN_WIDTH)?;
    worksheet.set_column_width(1, TABLES_COLUMN_WIDTH)?;
    Ok(())
}

/// Print the audit outcome to stdout.
pub fn print_findings(outcome: &AuditOutcome) {
    println!("=== Temp Table Audit ===");
    println!();

    if outcome.findings.is_empty() {
        println!("No orphaned temp tables found.");
    } else {
        for finding in &outcome.findings {
            println!("{}", finding.procedure);
            for table in &finding.orphaned {
                println!("  {}", table);
            }
        }
    }
    println!();

    if !outcome.skipped.is_empty() {
        println!("Skipped ({}):", outcome.skipped.len());
        for skipped in &outcome.skipped {
            println!("  {}: {}", skipped.procedure, skipped.reason);
        }
        println!();
    }

    println!(
        "Scanned {} procedures, {} with orphaned temp tables ({} tables)",
        outcome.scanned,
        outcome.findings.len(),
        outcome.orphaned_count()
    );
}

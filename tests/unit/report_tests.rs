//! Spreadsheet report tests

use std::fs;

use tempfile::TempDir;

use mssql_temp_table_finder::report::write_report;
use mssql_temp_table_finder::{ProcedureFinding, TempTableFinderError};

use crate::common::names;

fn sample_findings() -> Vec<ProcedureFinding> {
    vec![
        ProcedureFinding {
            procedure: "dbo.usp_LoadOrders".to_string(),
            orphaned: names(&["#OrderLines"]),
        },
        ProcedureFinding {
            procedure: "reporting.usp_MonthlyReport".to_string(),
            orphaned: names(&["##SharedTotals", "#Temp"]),
        },
    ]
}

#[test]
fn test_report_is_written() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.xlsx");

    write_report(&path, &sample_findings()).expect("report should be written");

    let bytes = fs::read(&path).unwrap();
    // xlsx files are ZIP containers
    assert!(bytes.starts_with(b"PK"), "Expected a ZIP header");
}

#[test]
fn test_empty_report_still_has_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.xlsx");

    write_report(&path, &[]).expect("empty report should be written");
    assert!(path.exists());
}

#[test]
fn test_unwritable_path_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing").join("report.xlsx");

    let result = write_report(&path, &sample_findings());
    assert!(
        matches!(result, Err(TempTableFinderError::ReportWriteError { .. })),
        "Expected ReportWriteError, got {:?}",
        result
    );
}

//! Error types for mssql-temp-table-finder

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while auditing stored procedures
#[derive(Error, Debug)]
pub enum TempTableFinderError {
    #[error("Could not connect to SQL Server at {server}")]
    ConnectionError {
        server: String,
        #[source]
        source: tiberius::error::Error,
    },

    #[error("Could not open a TCP connection to {server}")]
    ConnectionIoError {
        server: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not fetch stored procedures from database {database}")]
    ProcedureListError {
        database: String,
        #[source]
        source: tiberius::error::Error,
    },

    #[error("No stored procedures found in database {database}")]
    NoProceduresFound { database: String },

    #[error("Could not get contents of stored procedure {procedure}")]
    ProcedureFetchError {
        procedure: String,
        #[source]
        source: tiberius::error::Error,
    },

    #[error("Could not format SQL: {message}")]
    SqlFormatError { message: String },

    #[error("Input path not found: {path}")]
    InputPathNotFound { path: PathBuf },

    #[error("Failed to read SQL file: {path}")]
    SqlFileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write report to {path}")]
    ReportWriteError {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("Error while formatting report: {message}")]
    ReportStyleError { message: String },

    #[error("Failed to start worker pool: {message}")]
    WorkerPoolError { message: String },
}

impl From<rust_xlsxwriter::XlsxError> for TempTableFinderError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        TempTableFinderError::ReportStyleError {
            message: err.to_string(),
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for TempTableFinderError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        TempTableFinderError::WorkerPoolError {
            message: err.to_string(),
        }
    }
}

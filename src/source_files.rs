//! Procedure definitions read from `.sql` files
//!
//! Offline counterpart of [`crate::catalog`]: each `.sql` file is treated as
//! one procedure definition, named after its path relative to the scan root.

use std::path::{Path, PathBuf};

use encoding_rs::WINDOWS_1252;

use crate::audit::{ProcedureSource, SkippedProcedure};
use crate::error::TempTableFinderError;

/// Read a file as a string, trying UTF-8 first, then Windows-1252 as fallback
fn read_file_with_encoding_fallback(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;

    match String::from_utf8(bytes) {
        Ok(s) if s.starts_with('\u{feff}') => Ok(s['\u{feff}'.len_utf8()..].to_string()),
        Ok(s) => Ok(s),
        Err(e) => {
            // Fall back to Windows-1252 (common for SQL scripted out of SSMS)
            let bytes = e.into_bytes();
            let (decoded, _, had_errors) = WINDOWS_1252.decode(&bytes);
            if had_errors {
                Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "File contains invalid characters",
                ))
            } else {
                Ok(decoded.into_owned())
            }
        }
    }
}

/// List the `.sql` files under `path` (or `path` itself if it is a file), sorted
pub fn find_sql_files(path: &Path) -> Result<Vec<PathBuf>, TempTableFinderError> {
    if !path.exists() {
        return Err(TempTableFinderError::InputPathNotFound {
            path: path.to_path_buf(),
        });
    }

    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|p| {
            p.extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("sql"))
        })
        .collect();
    files.sort();

    Ok(files)
}

/// Procedure name for a file: its path relative to `root`, without extension,
/// using `/` separators.
fn procedure_name(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let relative = if relative.as_os_str().is_empty() {
        // `root` was the file itself
        Path::new(file.file_name().unwrap_or(file.as_os_str()))
    } else {
        relative
    };

    relative
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Load every `.sql` file under `path` as a procedure source.
///
/// Files that cannot be read or decoded are returned as skipped procedures
/// and left out of the sources.
pub fn collect_sql_sources(
    path: &Path,
) -> Result<(Vec<ProcedureSource>, Vec<SkippedProcedure>), TempTableFinderError> {
    let files = find_sql_files(path)?;
    let mut sources = Vec::with_capacity(files.len());
    let mut skipped = Vec::new();

    for file in &files {
        let name = procedure_name(path, file);
        match read_file_with_encoding_fallback(file) {
            Ok(definition) => sources.push(ProcedureSource::new(name, definition)),
            Err(e) => {
                let reason = format!("unreadable file: {}", e);
                let err = TempTableFinderError::SqlFileReadError {
                    path: file.clone(),
                    source: e,
                };
                tracing::warn!(error = %err, %reason, "Skipping SQL file");
                skipped.push(SkippedProcedure {
                    procedure: name,
                    reason,
                });
            }
        }
    }

    tracing::debug!(files = files.len(), loaded = sources.len(), "Collected SQL files");
    Ok((sources, skipped))
}

//! Statement classification by line prefix.

use crate::util::starts_with_ci;

const CREATE_TEMP_TABLE_PREFIX: &str = "CREATE TABLE #";
const INSERT_PREFIX: &str = "INSERT";
const DROP_TABLE_PREFIX: &str = "DROP TABLE";

/// What a line means for temp table lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// `CREATE TABLE #...` or any `INSERT` statement.
    Creation,
    /// `DROP TABLE ...`, possibly continued on following lines.
    Deletion,
    /// Anything else.
    Irrelevant,
}

/// Classify a formatted line by its trimmed, case-insensitive prefix.
///
/// This is a heuristic: every `INSERT` line counts as a potential creation,
/// whatever its target. Temp names are only recorded when the line actually
/// carries a `#` token, so an `INSERT` into a permanent table that mentions a
/// temp table on the same line still credits that temp table as created.
pub fn classify_line(line: &str) -> StatementKind {
    let head = line.trim();

    if starts_with_ci(head, CREATE_TEMP_TABLE_PREFIX) || starts_with_ci(head, INSERT_PREFIX) {
        StatementKind::Creation
    } else if starts_with_ci(head, DROP_TABLE_PREFIX) {
        StatementKind::Deletion
    } else {
        StatementKind::Irrelevant
    }
}

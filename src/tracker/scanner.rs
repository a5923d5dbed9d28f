//! Per-procedure temp table scan.

use std::collections::BTreeSet;

use super::classifier::{classify_line, StatementKind};
use super::continuation::collect_continuation;
use super::cursor::LineCursor;
use super::extractor::extract_temp_identifiers;

/// Temp tables seen being created and dropped in one procedure body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TempTableLifetimes {
    /// Names from `CREATE TABLE #...` and `INSERT` lines
    pub created: BTreeSet<String>,
    /// Names from `DROP TABLE` lines and their continuations
    pub dropped: BTreeSet<String>,
}

impl TempTableLifetimes {
    /// Record every temp name on `line` as created.
    pub fn record_created(&mut self, line: &str) {
        self.created
            .extend(extract_temp_identifiers(line).map(str::to_owned));
    }

    /// Record every temp name on `line` as dropped.
    pub fn record_dropped(&mut self, line: &str) {
        self.dropped
            .extend(extract_temp_identifiers(line).map(str::to_owned));
    }

    /// Temp tables created but never dropped, compared by exact string equality.
    pub fn orphaned(&self) -> BTreeSet<String> {
        self.created.difference(&self.dropped).cloned().collect()
    }
}

/// Walk formatted procedure text and collect temp table creations and drops.
///
/// Never fails: lines that match no known prefix are ignored, so unexpected
/// input gives a partial (or empty) result rather than an error.
pub fn track_lifetimes(formatted_sql: &str) -> TempTableLifetimes {
    let mut lifetimes = TempTableLifetimes::default();
    let mut cursor = LineCursor::new(formatted_sql);

    while let Some(line) = cursor.next_line() {
        match classify_line(line) {
            StatementKind::Creation => lifetimes.record_created(line),
            StatementKind::Deletion => {
                lifetimes.record_dropped(line);
                // May advance the cursor past the rest of the drop list
                collect_continuation(&mut cursor, &mut lifetimes);
            }
            StatementKind::Irrelevant => {}
        }
    }

    lifetimes
}

/// Temp tables a procedure creates but never drops.
pub fn scan(formatted_sql: &str) -> BTreeSet<String> {
    track_lifetimes(formatted_sql).orphaned()
}

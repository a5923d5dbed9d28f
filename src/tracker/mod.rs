//! Temp table lifetime tracking
//!
//! A line-oriented, heuristic scanner over formatted T-SQL. It records which
//! `#temp` tables a procedure creates and which it drops, and reports the ones
//! left behind. The scanner is not a parser: it inspects line prefixes only and
//! assumes the layout produced by [`crate::formatter`] (one statement per line,
//! comma-first lists, uppercase keywords).

mod classifier;
mod continuation;
mod cursor;
mod extractor;
mod scanner;

pub use classifier::{classify_line, StatementKind};
pub use continuation::collect_continuation;
pub use cursor::LineCursor;
pub use extractor::extract_temp_identifiers;
pub use scanner::{scan, track_lifetimes, TempTableLifetimes};

/// Leading character of every local and global temp table name.
pub const TEMP_TABLE_MARKER: char = '#';

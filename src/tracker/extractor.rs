//! Temp table identifier extraction.

use super::TEMP_TABLE_MARKER;

/// Return every fragment of `line` that names a temp table.
///
/// The line is split on whitespace, each token on commas, and each comma
/// segment on `(`. Fragments starting with `#` are kept verbatim, so `#A,#B`
/// yields both names and `#Temp(` yields `#Temp`. Nothing else is stripped:
/// `#Temp;` stays `#Temp;`.
pub fn extract_temp_identifiers(line: &str) -> impl Iterator<Item = &str> {
    line.split_whitespace()
        .flat_map(|token| token.split(','))
        .flat_map(|segment| segment.split('('))
        .filter(|fragment| fragment.starts_with(TEMP_TABLE_MARKER))
}

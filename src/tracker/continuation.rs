//! Multi-line DROP TABLE handling.

use super::cursor::LineCursor;
use super::scanner::TempTableLifetimes;

/// Consume the continuation lines of a DROP statement.
///
/// Called right after the `DROP TABLE` line itself has been recorded. Every
/// following line that starts with `,` or `DROP` belongs to the same drop
/// list: its temp names are recorded as dropped and the shared cursor moves
/// past it. The first other line is left on the cursor for the caller.
///
/// Returns the number of lines consumed.
pub fn collect_continuation(cursor: &mut LineCursor<'_>, lifetimes: &mut TempTableLifetimes) -> usize {
    let mut consumed = 0;

    while let Some(line) = cursor.peek() {
        if !is_continuation_line(line) {
            break;
        }
        lifetimes.record_dropped(line);
        cursor.advance();
        consumed += 1;
    }

    consumed
}

fn is_continuation_line(line: &str) -> bool {
    let head = line.trim();
    head.starts_with(',') || head.starts_with("DROP")
}

//! SQL normalization ahead of temp table scanning
//!
//! The tracker reads SQL line by line, so procedure definitions are first
//! reflowed into a predictable shape:
//!
//! - comments removed
//! - keywords uppercased, identifiers (including `#temp` names) untouched
//! - each statement-level keyword starts a new line
//! - top-level lists written comma-first, one item per line
//!
//! ```
//! use mssql_temp_table_finder::formatter::{SqlFormatter, TokenFormatter};
//!
//! let sql = "drop table #a, #b -- cleanup";
//! let formatted = TokenFormatter.format(sql).unwrap();
//! assert_eq!(formatted, "DROP TABLE #a\n, #b");
//! ```

use sqlparser::dialect::MsSqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, Word};

use crate::error::TempTableFinderError;

/// Keywords that start a new line when they appear outside parentheses.
const LINE_START_KEYWORDS: &[&str] = &[
    "ALTER", "BEGIN", "CREATE", "DECLARE", "DELETE", "DROP", "ELSE", "END", "EXEC", "EXECUTE",
    "FROM", "GO", "GROUP", "HAVING", "IF", "INSERT", "MERGE", "ORDER", "PRINT", "RAISERROR",
    "RETURN", "SELECT", "SET", "THROW", "TRUNCATE", "UNION", "UPDATE", "VALUES", "WHERE", "WHILE",
];

/// Turns raw procedure text into the line layout the tracker expects.
pub trait SqlFormatter: Send + Sync {
    fn format(&self, sql: &str) -> Result<String, TempTableFinderError>;
}

/// Formatter built on the sqlparser MsSqlDialect tokenizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenFormatter;

impl SqlFormatter for TokenFormatter {
    fn format(&self, sql: &str) -> Result<String, TempTableFinderError> {
        let dialect = MsSqlDialect {};
        let tokens = Tokenizer::new(&dialect, sql)
            .tokenize()
            .map_err(|e| TempTableFinderError::SqlFormatError {
                message: e.to_string(),
            })?;

        let mut writer = LineWriter::default();
        let mut paren_depth = 0usize;
        let mut case_depth = 0usize;

        for token in &tokens {
            match token {
                // Comments count as whitespace and are dropped
                Token::Whitespace(_) => writer.space(),
                Token::LParen => {
                    writer.push("(");
                    writer.glue_next();
                    paren_depth += 1;
                }
                Token::RParen => {
                    paren_depth = paren_depth.saturating_sub(1);
                    writer.glue_next();
                    writer.push(")");
                }
                Token::Comma if paren_depth == 0 => {
                    writer.break_line();
                    writer.push(",");
                }
                Token::SemiColon => {
                    writer.space();
                    writer.push(";");
                    writer.break_line();
                }
                Token::Word(w) => {
                    let breaks = w.quote_style.is_none() && breaks_before(w, &mut case_depth);
                    if breaks && paren_depth == 0 {
                        writer.break_line();
                    }
                    writer.push(&render_word(w));
                }
                other => writer.push(&render_token(other)),
            }
        }

        Ok(writer.finish())
    }
}

/// Decide whether an unquoted word opens a new line, tracking CASE nesting so
/// that `ELSE`/`END` of a CASE expression stay inline.
fn breaks_before(word: &Word, case_depth: &mut usize) -> bool {
    let upper = word.value.to_ascii_uppercase();
    match upper.as_str() {
        "CASE" => {
            *case_depth += 1;
            false
        }
        "END" if *case_depth > 0 => {
            *case_depth -= 1;
            false
        }
        "ELSE" if *case_depth > 0 => false,
        other => LINE_START_KEYWORDS.contains(&other),
    }
}

fn render_word(word: &Word) -> String {
    if word.quote_style.is_none() && word.keyword != Keyword::NoKeyword {
        word.value.to_uppercase()
    } else {
        word.to_string()
    }
}

fn render_token(token: &Token) -> String {
    match token {
        Token::SingleQuotedString(s) => format!("'{}'", s.replace('\'', "''")),
        Token::NationalStringLiteral(s) => format!("N'{}'", s.replace('\'', "''")),
        Token::HexStringLiteral(s) => format!("0x{}", s),
        other => other.to_string(),
    }
}

/// Accumulates output lines, collapsing whitespace runs to one space.
#[derive(Debug, Default)]
struct LineWriter {
    lines: Vec<String>,
    current: String,
    pending_space: bool,
    glued: bool,
}

impl LineWriter {
    fn space(&mut self) {
        self.pending_space = true;
    }

    /// Drop any space between the last and the next pushed text.
    fn glue_next(&mut self) {
        self.glued = true;
    }

    fn push(&mut self, text: &str) {
        if self.pending_space && !self.glued && !self.current.is_empty() {
            self.current.push(' ');
        }
        self.pending_space = false;
        self.glued = false;
        self.current.push_str(text);
    }

    fn break_line(&mut self) {
        let line = std::mem::take(&mut self.current);
        if !line.is_empty() {
            self.lines.push(line);
        }
        self.pending_space = false;
        self.glued = false;
    }

    fn finish(mut self) -> String {
        self.break_line();
        self.lines.join("\n")
    }
}

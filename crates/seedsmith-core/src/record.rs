//! Tokenizer for parenthesized SQL value tuples.
//!
//! A bulk dump holds records such as
//! `('Widget', 'A nice, useful widget', '[1,2,3]')`. Commas separate fields
//! only when they sit outside single-quoted strings and outside bracketed
//! arrays, so a plain `split(',')` would corrupt text and list fields.

use thiserror::Error;

/// Field count of one bulk product record: title, description, created_at,
/// updated_at, image_url, features, images.
pub const PRODUCT_RECORD_FIELDS: usize = 7;

/// Reasons a record interior is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("unterminated quoted string")]
    UnterminatedQuote,
    #[error("{0} bracket(s) left open at end of record")]
    UnclosedBracket(usize),
    #[error("unexpected ']' at byte {0}")]
    UnexpectedBracket(usize),
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
}

/// Final state of a scan over one record interior.
#[derive(Debug)]
struct Scan {
    fields: Vec<String>,
    in_quotes: bool,
    depth: i64,
    stray_close: Option<usize>,
}

fn scan(inner: &str) -> Scan {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut depth: i64 = 0;
    let mut stray_close = None;

    for (offset, ch) in inner.char_indices() {
        match ch {
            // The escape check looks at the current field only; a quote right
            // after a separator is never escaped.
            '\'' if !current.ends_with('\\') => in_quotes = !in_quotes,
            '[' if !in_quotes => depth += 1,
            ']' if !in_quotes => {
                depth -= 1;
                if depth < 0 && stray_close.is_none() {
                    stray_close = Some(offset);
                }
            }
            _ => {}
        }

        if ch == ',' && !in_quotes && depth == 0 {
            fields.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(ch);
        }
    }

    if !current.is_empty() {
        fields.push(current.trim().to_string());
    }

    Scan {
        fields,
        in_quotes,
        depth,
        stray_close,
    }
}

/// Split a record interior into its top-level fields.
///
/// Fields are trimmed and returned in source order. No validation is done on
/// the end state; use [`tokenize`] to reject unbalanced input.
pub fn split_fields(inner: &str) -> Vec<String> {
    scan(inner).fields
}

/// Split a record interior, rejecting unterminated quotes and unbalanced
/// brackets.
pub fn tokenize(inner: &str) -> Result<Vec<String>, RecordError> {
    let scan = scan(inner);
    if let Some(offset) = scan.stray_close {
        return Err(RecordError::UnexpectedBracket(offset));
    }
    if scan.in_quotes {
        return Err(RecordError::UnterminatedQuote);
    }
    if scan.depth > 0 {
        return Err(RecordError::UnclosedBracket(scan.depth as usize));
    }
    Ok(scan.fields)
}

/// Tokenize a record interior and enforce its field count.
pub fn parse_record(inner: &str, expected: usize) -> Result<Vec<String>, RecordError> {
    let fields = tokenize(inner)?;
    if fields.len() != expected {
        return Err(RecordError::FieldCount {
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

/// Record interiors found in a `VALUES` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted<'a> {
    pub records: Vec<&'a str>,
    /// Text of a tuple that was opened but never closed.
    pub unterminated: Option<&'a str>,
}

/// Return the text after the `VALUES` keyword of an insert header.
///
/// Only the part before the first quoted string is searched, so row content
/// that happens to contain the word is left alone. Text without a header is
/// returned unchanged.
pub fn values_body(text: &str) -> &str {
    let head_len = text.find('\'').unwrap_or(text.len());
    let head = text[..head_len].to_ascii_uppercase();
    match head.find("VALUES") {
        Some(pos) => &text[pos + "VALUES".len()..],
        None => text,
    }
}

/// Find the interior of every top-level tuple in `body`.
///
/// Parentheses inside quoted strings do not open or close tuples, and both
/// `),` and the closing `);` end a record. A tuple left unbalanced by a stray
/// quote or parenthesis is cut at the end of its row when the next line opens
/// a new tuple, so the damage stays inside that one record.
pub fn extract_records(body: &str) -> Extracted<'_> {
    let mut records = Vec::new();
    let mut in_quotes = false;
    let mut depth = 0_usize;
    let mut start = 0_usize;
    let mut prev = None;

    for (offset, ch) in body.char_indices() {
        match ch {
            '\'' if prev != Some('\\') => in_quotes = !in_quotes,
            '(' if !in_quotes => {
                if depth == 0 {
                    start = offset + 1;
                }
                depth += 1;
            }
            ')' if !in_quotes && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    records.push(&body[start..offset]);
                }
            }
            '\n' if depth > 0 && body[offset..].trim_start().starts_with('(') => {
                if let Some(close) = row_close(body, start, offset) {
                    records.push(&body[start..close]);
                    in_quotes = false;
                    depth = 0;
                }
            }
            _ => {}
        }
        prev = Some(ch);
    }

    if depth > 0 {
        if let Some(close) = row_close(body, start, body.len()) {
            records.push(&body[start..close]);
            depth = 0;
        }
    }

    let unterminated = (depth > 0).then(|| &body[start..]);
    Extracted {
        records,
        unterminated,
    }
}

/// Byte offset of the `)` that ends the row `body[start..end]`, if the row
/// ends with `)`, `),` or `);`.
fn row_close(body: &str, start: usize, end: usize) -> Option<usize> {
    let row = body[start..end].trim_end();
    let row = row.strip_suffix([',', ';']).unwrap_or(row);
    row.strip_suffix(')').map(|_| start + row.len() - 1)
}

//! Small helpers for reading and writing SQL literal text.

/// Text between the first pair of unescaped single quotes on a line.
pub fn first_quoted(line: &str) -> Option<&str> {
    let start = line.find('\'')? + 1;
    let rest = &line[start..];
    let mut chars = rest.char_indices();
    while let Some((offset, ch)) = chars.next() {
        match ch {
            '\\' => {
                chars.next();
            }
            '\'' => return Some(&rest[..offset]),
            _ => {}
        }
    }
    None
}

/// Strip one pair of enclosing single quotes, if present.
pub fn unquote(field: &str) -> &str {
    let trimmed = field.trim();
    trimmed
        .strip_prefix('\'')
        .and_then(|value| value.strip_suffix('\''))
        .unwrap_or(trimmed)
}

/// Escape backslashes and single quotes for a MySQL string literal.
pub fn escape_sql(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '\\' || ch == '\'' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Reverse of [`escape_sql`]: drop the backslash in front of any character.
pub fn unescape_sql(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                unescaped.push(next);
                continue;
            }
        }
        unescaped.push(ch);
    }
    unescaped
}

/// Values of a single-column intermediate file.
///
/// Every line starting with `(` is one row; the surrounding parentheses and
/// the trailing `,` or `;` are removed, so `(12),` yields `12` and
/// `('{}');` yields `'{}'`.
pub fn single_value_rows(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with('('))
        .map(|line| {
            let line = line.trim_end_matches([',', ';']);
            let line = line.strip_prefix('(').unwrap_or(line);
            let line = line.strip_suffix(')').unwrap_or(line);
            line.trim().to_string()
        })
        .collect()
}

/// A multi-row `INSERT ... VALUES` statement rendered one row per line.
#[derive(Debug, Clone)]
pub struct InsertStatement {
    header: String,
    rows: Vec<String>,
}

impl InsertStatement {
    /// Build a statement for a backtick-quoted table and column list.
    pub fn new(table: &str, columns: &[&str]) -> Self {
        let columns = columns
            .iter()
            .map(|column| format!("`{column}`"))
            .collect::<Vec<_>>()
            .join(", ");
        Self::with_header(format!("INSERT INTO `{table}` ({columns}) VALUES"))
    }

    /// Build a statement around an existing header line.
    pub fn with_header(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            rows: Vec::new(),
        }
    }

    /// Append one row; values are written verbatim and joined with `, `.
    pub fn push_row<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values = values
            .into_iter()
            .map(|value| value.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        self.rows.push(format!("({values})"));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    /// Render the header and rows; the last row ends with `;`.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.header.len() + self.rows.len() * 32);
        out.push_str(&self.header);
        out.push('\n');
        out.push_str(&self.rows.join(",\n"));
        out.push_str(";\n");
        out
    }
}

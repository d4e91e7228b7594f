// ABOUTME: Tabular query results with a comma-delimited text rendering
// ABOUTME: Header row holds column names; every cell is the server's text output

use std::fmt;

const DELIMITER: char = ',';

/// Column names plus rows of text cells, in server order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// True when there are no data rows (the header may still be present)
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// All cells of the named column, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }

    /// Render as a header line followed by one line per row.
    ///
    /// Cells are joined with `,` and never quoted, so a value containing a
    /// comma or newline cannot be told apart from a cell boundary. A table
    /// without columns renders as the empty string.
    pub fn to_text(&self) -> String {
        if self.columns.is_empty() {
            return String::new();
        }

        let mut buf = String::new();
        push_line(&mut buf, &self.columns);
        for row in &self.rows {
            push_line(&mut buf, row);
        }
        buf
    }

    /// Read text in the format produced by [`Table::to_text`].
    ///
    /// Line 0 is the header; there is no index column and no unquoting.
    pub fn from_text(text: &str) -> Self {
        let mut lines = text.lines();
        let columns = match lines.next() {
            Some(header) if !header.is_empty() => split_line(header),
            _ => return Self::default(),
        };

        let rows = lines.map(split_line).collect();
        Self { columns, rows }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

fn push_line(buf: &mut String, cells: &[String]) {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            buf.push(DELIMITER);
        }
        buf.push_str(cell);
    }
    buf.push('\n');
}

fn split_line(line: &str) -> Vec<String> {
    line.split(DELIMITER).map(str::to_string).collect()
}

use chrono::NaiveDateTime;

//==============================================================================
// Cell Values
//==============================================================================

/// A single spreadsheet cell value after type detection.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Text cell (also covers booleans rendered as "true"/"false")
    Text(String),
    /// Numeric cell (Excel stores integers as floats)
    Number(f64),
    /// Date/time cell
    Date(NaiveDateTime),
    /// Empty cell
    Empty,
}

impl CellValue {
    /// Whether this cell counts as blank for key-column checks.
    /// Whitespace-only text is blank: spreadsheets routinely carry
    /// invisible padding in "empty" cells.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the cell as substitution text.
    ///
    /// Numbers drop trailing zeros (Excel shows `300`, not `300.0`);
    /// dates honor an optional chrono format string, defaulting to
    /// `%Y-%m-%d`; empty cells render as the empty string.
    pub fn format(&self, date_format: Option<&str>) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Date(dt) => dt.format(date_format.unwrap_or("%Y-%m-%d")).to_string(),
            CellValue::Empty => String::new(),
        }
    }
}

/// Format a number for substitution, removing unnecessary decimal places
fn format_number(n: f64) -> String {
    // Round to 6 decimal places; also hides float artifacts from Excel
    let rounded = (n * 1e6).round() / 1e6;
    format!("{:.6}", rounded)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

//==============================================================================
// Rows
//==============================================================================

/// One record of the source worksheet: an ordered mapping from column
/// name to cell value, plus the 1-based data-row index it came from
/// (row 1 is the first row after the header).
#[derive(Debug, Clone)]
pub struct Row {
    pub index: usize,
    cells: Vec<(String, CellValue)>,
}

impl Row {
    pub fn new(index: usize, cells: Vec<(String, CellValue)>) -> Self {
        Self { index, cells }
    }

    /// Look up a cell by column name.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// All cells in source column order.
    pub fn cells(&self) -> &[(String, CellValue)] {
        &self.cells
    }

    /// True when every listed column is blank in this row. An empty
    /// column list falls back to "every cell blank".
    pub fn is_blank_in(&self, columns: &[String]) -> bool {
        if columns.is_empty() {
            return self.cells.iter().all(|(_, v)| v.is_blank());
        }
        columns
            .iter()
            .all(|c| self.get(c).map(CellValue::is_blank).unwrap_or(true))
    }
}

//==============================================================================
// Generated Documents & Run Summary
//==============================================================================

/// A rendered document: packed .docx bytes plus the base name fed to
/// the output filename pattern's `{name}` token. Row-scoped; handed to
/// the output writer and dropped.
#[derive(Debug)]
pub struct GeneratedDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// One recorded unit-level failure under the skip policy. The unit is
/// "row N" in row mode, "column 'X'" in column mode.
#[derive(Debug)]
pub struct Failure {
    pub unit: String,
    pub message: String,
}

/// Outcome of a full generation run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub rows_processed: usize,
    pub rows_skipped: usize,
    pub documents_written: usize,
    pub warnings: usize,
    pub failures: Vec<Failure>,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

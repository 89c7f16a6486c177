//! Source reader - yields worksheet rows as ordered column/value mappings

use crate::config::{BlankRowPolicy, SourceConfig};
use crate::error::{SheetdocError, SheetdocResult};
use crate::types::{CellValue, Row};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use std::path::Path;

/// Reads the configured worksheet and yields [`Row`]s in sheet order,
/// starting after the header row.
#[derive(Debug)]
pub struct SheetReader {
    columns: Vec<String>,
    range: Range<Data>,
    header_idx: usize,
    key_columns: Vec<String>,
    on_blank: BlankRowPolicy,
}

impl SheetReader {
    /// Open the workbook and locate the worksheet and header row.
    ///
    /// `required_columns` are checked against the header up front so a
    /// misconfigured mapping fails before any document is generated.
    pub fn open(source: &SourceConfig, required_columns: &[String]) -> SheetdocResult<Self> {
        let mut workbook: Xlsx<_> = open_workbook(&source.path).map_err(|e| {
            SheetdocError::SourceRead(format!(
                "Failed to open source file '{}': {}",
                source.path.display(),
                e
            ))
        })?;

        let sheet_names = workbook.sheet_names().to_vec();
        let range = workbook.worksheet_range(&source.worksheet).map_err(|e| {
            SheetdocError::SourceRead(format!(
                "Failed to read worksheet '{}' from '{}': {} (available worksheets: {})",
                source.worksheet,
                source.path.display(),
                e,
                sheet_names.join(", ")
            ))
        })?;

        let header_idx = source.header_row - 1;
        let header = range.rows().nth(header_idx).ok_or_else(|| {
            SheetdocError::SourceRead(format!(
                "Header row {} is beyond the used range of worksheet '{}'",
                source.header_row, source.worksheet
            ))
        })?;

        let columns: Vec<String> = header.iter().map(header_name).collect();

        for required in required_columns {
            if !columns.iter().any(|c| c == required) {
                return Err(SheetdocError::SourceRead(format!(
                    "Column '{}' not found in header row of worksheet '{}' (available columns: {})",
                    required,
                    source.worksheet,
                    columns
                        .iter()
                        .filter(|c| !c.is_empty())
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        }

        Ok(SheetReader {
            columns,
            range,
            header_idx,
            key_columns: source.key_columns.clone(),
            on_blank: source.on_blank,
        })
    }

    /// Header column names in sheet order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Lazy, finite, non-restartable row sequence. Blank rows follow the
    /// configured policy: `skip` filters them, `stop` ends the sequence.
    pub fn rows(&self) -> RowIter<'_> {
        RowIter {
            reader: self,
            inner: self.range.rows().skip(self.header_idx + 1),
            next_index: 0,
            skipped: 0,
            stopped: false,
        }
    }
}

pub struct RowIter<'a> {
    reader: &'a SheetReader,
    inner: std::iter::Skip<calamine::Rows<'a, Data>>,
    next_index: usize,
    skipped: usize,
    stopped: bool,
}

impl<'a> RowIter<'a> {
    /// Blank rows filtered so far under the skip policy.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<'a> Iterator for RowIter<'a> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        if self.stopped {
            return None;
        }
        for raw in self.inner.by_ref() {
            self.next_index += 1;
            let cells = self
                .reader
                .columns
                .iter()
                .zip(raw.iter())
                .map(|(name, data)| (name.clone(), cell_value(data)))
                .collect();
            let row = Row::new(self.next_index, cells);

            if row.is_blank_in(&self.reader.key_columns) {
                match self.reader.on_blank {
                    BlankRowPolicy::Skip => {
                        self.skipped += 1;
                        continue;
                    }
                    BlankRowPolicy::Stop => {
                        self.stopped = true;
                        return None;
                    }
                }
            }
            return Some(row);
        }
        None
    }
}

/// Worksheet name and used dimensions, for `sheetdoc inspect`.
#[derive(Debug)]
pub struct WorksheetInfo {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
}

/// Enumerate the workbook's worksheets with their used dimensions.
pub fn inspect(path: &Path) -> SheetdocResult<Vec<WorksheetInfo>> {
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e| {
        SheetdocError::SourceRead(format!(
            "Failed to open source file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let mut infos = Vec::new();
    for name in workbook.sheet_names().to_vec() {
        let (rows, columns) = match workbook.worksheet_range(&name) {
            Ok(range) => range.get_size(),
            Err(_) => (0, 0),
        };
        infos.push(WorksheetInfo {
            name,
            rows,
            columns,
        });
    }
    Ok(infos)
}

fn header_name(data: &Data) -> String {
    match data {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        _ => String::new(),
    }
}

fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => CellValue::Date(naive),
            None => CellValue::Empty,
        },
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rust_xlsxwriter::Workbook;
    use std::path::PathBuf;

    fn fixture_xlsx(dir: &Path, blank_middle_row: bool) -> PathBuf {
        let path = dir.join("source.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Content").unwrap();
        sheet.write_string(0, 0, "Name").unwrap();
        sheet.write_string(0, 1, "City").unwrap();
        sheet.write_string(0, 2, "Amount").unwrap();
        sheet.write_string(1, 0, "Acme Corp").unwrap();
        sheet.write_string(1, 1, "Berlin").unwrap();
        sheet.write_number(1, 2, 1200.5).unwrap();
        if !blank_middle_row {
            sheet.write_string(2, 0, "Globex").unwrap();
            sheet.write_string(2, 1, "Hamburg").unwrap();
            sheet.write_number(2, 2, 300).unwrap();
        }
        sheet.write_string(3, 0, "Initech").unwrap();
        sheet.write_string(3, 1, "Munich").unwrap();
        sheet.write_number(3, 2, 7).unwrap();
        workbook.save(&path).unwrap();
        path
    }

    fn source_config(path: &Path, extra: &str) -> SourceConfig {
        let toml = format!(
            r#"
                [source]
                path = "{}"
                worksheet = "Content"
                {}

                [template]
                path = "unused.docx"

                [output]
                directory = "out"

                [mapping]
                bindings = [{{ column = "Name", placeholder = "{{{{NAME}}}}" }}]
            "#,
            path.display(),
            extra
        );
        Config::parse(&toml).unwrap().source
    }

    #[test]
    fn reads_rows_in_order_after_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture_xlsx(dir.path(), false);
        let source = source_config(&path, "");
        let reader = SheetReader::open(&source, &["Name".to_string()]).unwrap();

        assert_eq!(reader.columns(), ["Name", "City", "Amount"]);
        let rows: Vec<Row> = reader.rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].index, 1);
        assert_eq!(rows[0].get("Name"), Some(&CellValue::Text("Acme Corp".into())));
        assert_eq!(rows[1].get("Amount"), Some(&CellValue::Number(300.0)));
        assert_eq!(rows[2].index, 3);
    }

    #[test]
    fn missing_required_column_fails_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture_xlsx(dir.path(), false);
        let source = source_config(&path, "");
        let err = SheetReader::open(&source, &["Nope".to_string()]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'Nope'"));
        assert!(message.contains("Name, City, Amount"));
    }

    #[test]
    fn missing_worksheet_lists_available_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture_xlsx(dir.path(), false);
        let mut source = source_config(&path, "");
        source.worksheet = "Missing".to_string();
        let err = SheetReader::open(&source, &[]).unwrap_err();
        assert!(err.to_string().contains("available worksheets: Content"));
    }

    #[test]
    fn blank_row_skip_policy_filters_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture_xlsx(dir.path(), true);
        let source = source_config(&path, "key_columns = [\"Name\"]");
        let reader = SheetReader::open(&source, &[]).unwrap();
        let mut rows = reader.rows();
        let collected: Vec<Row> = rows.by_ref().collect();
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[1].get("Name"), Some(&CellValue::Text("Initech".into())));
        // The blank row keeps its position in the numbering
        assert_eq!(collected[1].index, 3);
        assert_eq!(rows.skipped(), 1);
    }

    #[test]
    fn blank_row_stop_policy_ends_the_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture_xlsx(dir.path(), true);
        let source = source_config(
            &path,
            "key_columns = [\"Name\"]\non_blank = \"stop\"",
        );
        let reader = SheetReader::open(&source, &[]).unwrap();
        let rows: Vec<Row> = reader.rows().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Name"), Some(&CellValue::Text("Acme Corp".into())));
    }

    #[test]
    fn inspect_reports_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture_xlsx(dir.path(), false);
        let infos = inspect(&path).unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, "Content");
        assert_eq!(infos[0].rows, 4);
        assert_eq!(infos[0].columns, 3);
    }
}

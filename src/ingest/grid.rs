use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;
use crate::error::{IngestError, Result};
use super::records::LOG_DATETIME_FORMAT;

/// Display text of the first worksheet, addressed 1-based by (row, column).
///
/// Every row is padded to the sheet's used width, the same way a
/// spreadsheet reports an empty string for cells that were never written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
    columns: usize,
}

impl Grid {
    /// Build a grid from row-major text; short rows are padded with "".
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|mut r| {
                r.resize(columns, String::new());
                r
            })
            .collect();
        Self { rows, columns }
    }

    /// Last used row number (1-based); 0 for an empty sheet
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Last used column number (1-based); 0 for an empty sheet
    pub fn column_count(&self) -> usize {
        self.columns
    }

    /// Text at (row, column), both 1-based; "" outside the used area
    pub fn cell(&self, row: usize, column: usize) -> &str {
        if row == 0 || column == 0 {
            return "";
        }
        self.rows
            .get(row - 1)
            .and_then(|r| r.get(column - 1))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// All cells of a 1-based row, `column_count()` wide
    pub fn row(&self, row: usize) -> Vec<String> {
        (1..=self.columns).map(|c| self.cell(row, c).to_string()).collect()
    }
}

/// Source of worksheet grids.
///
/// `Ok(None)` means the workbook opened but holds no worksheet.
pub trait GridReader {
    fn read_first_sheet(&self, path: &Path) -> Result<Option<Grid>>;
}

/// Reads `.xlsx` workbooks through calamine
#[derive(Debug, Clone, Copy, Default)]
pub struct CalamineGridReader;

impl GridReader for CalamineGridReader {
    fn read_first_sheet(&self, path: &Path) -> Result<Option<Grid>> {
        let mut workbook = open_workbook_auto(path)?;
        let range = match workbook.worksheet_range_at(0) {
            Some(range) => range?,
            None => return Ok(None),
        };
        Ok(Some(grid_from_range(&range)))
    }
}

/// Sheet cells from A1 up to the last used cell
fn grid_from_range(range: &Range<Data>) -> Grid {
    let Some((end_row, end_col)) = range.end() else {
        return Grid::default();
    };

    let rows = (0..=end_row)
        .map(|r| {
            (0..=end_col)
                .map(|c| range.get_value((r, c)).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();
    Grid::from_rows(rows)
}

/// Text a spreadsheet would display for a cell
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => ndt.format(LOG_DATETIME_FORMAT).to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    }
}

/// First worksheet of `path`; a workbook without sheets is an error
pub fn read_grid(reader: &dyn GridReader, path: &Path) -> Result<Grid> {
    reader
        .read_first_sheet(path)?
        .ok_or_else(|| IngestError::NoWorksheet(path.display().to_string()))
}

//! A named grid of cell values.

use crate::cell::CellValue;
use crate::utils::column_to_letter;

/// One worksheet: a display name plus rows of cells.
///
/// Rows are stored 0-based and may have different lengths. Output addressing
/// is 1-based (row 0, column 0 is `A1`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Worksheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Worksheet {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn with_rows(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Worksheet {
            name: name.into(),
            rows,
        }
    }

    /// Sheet display name.
    pub fn title(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<CellValue>> {
        self.rows
    }

    /// Append a row built from anything convertible into cells.
    pub fn append_row<I, V>(&mut self, cells: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    /// Append a row with no cells.
    pub fn append_blank_row(&mut self) {
        self.rows.push(Vec::new());
    }

    /// Set a cell by 1-based row and column, growing the grid with `Empty`
    /// cells as needed.
    pub fn set_cell_value(&mut self, row: u32, column: u32, value: impl Into<CellValue>) {
        if row == 0 || column == 0 {
            return;
        }
        let (r, c) = ((row - 1) as usize, (column - 1) as usize);
        if self.rows.len() <= r {
            self.rows.resize_with(r + 1, Vec::new);
        }
        let cells = &mut self.rows[r];
        if cells.len() <= c {
            cells.resize(c + 1, CellValue::Empty);
        }
        cells[c] = value.into();
    }

    /// Cell at a 1-based position, if the grid reaches that far.
    pub fn get_cell_value(&self, row: u32, column: u32) -> Option<&CellValue> {
        if row == 0 || column == 0 {
            return None;
        }
        self.rows
            .get((row - 1) as usize)?
            .get((column - 1) as usize)
    }

    /// Number of rows, including blank ones.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    pub fn max_columns(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Declared cell range for the `<dimension>` element.
    ///
    /// `A1:{last column}{row count}`, or just `A1` when the sheet has no
    /// cells, since `A1:0` is not a valid reference.
    pub fn dimension(&self) -> String {
        let cols = self.max_columns();
        if cols == 0 {
            return "A1".to_string();
        }
        format!("A1:{}{}", column_to_letter(cols as u32), self.rows.len())
    }
}

//! Cell-level editing of existing `.xlsx` workbooks.
//!
//! Workbooks are loaded and saved with `umya-spreadsheet`, so everything the
//! updater does not touch (formulas, styles, column widths, merged cells)
//! is written back as it was read. Cells are addressed with A1-style names
//! such as `B5`.

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use thiserror::Error;
use umya_spreadsheet::{Cell, Spreadsheet, Worksheet, XlsxError, reader, writer};

/// Largest column index Excel accepts (`XFD`).
const MAX_COL: u16 = 16_383;
/// Largest row number Excel accepts.
const MAX_ROW: u32 = 1_048_576;

#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("failed to read workbook {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },

    #[error("failed to write workbook: {0}")]
    Write(#[from] XlsxError),

    #[error("cannot add worksheet {name}: {reason}")]
    AddSheet { name: String, reason: String },

    #[error("failed to save workbook {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid cell address: {0}")]
    InvalidAddress(String),

    #[error("worksheet not found: {0}")]
    MissingSheet(String),
}

/// Zero-based cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u16,
}

impl CellRef {
    pub fn new(row: u32, col: u16) -> Self {
        CellRef { row, col }
    }

    /// Parse an A1-style address. Letters are case-insensitive.
    ///
    /// ```
    /// use macro_dashboard::workbook::CellRef;
    ///
    /// assert_eq!(CellRef::parse("B5"), Some(CellRef::new(4, 1)));
    /// assert_eq!(CellRef::parse("aa10"), Some(CellRef::new(9, 26)));
    /// assert_eq!(CellRef::parse("5B"), None);
    /// ```
    pub fn parse(name: &str) -> Option<Self> {
        let split = name.find(|c: char| !c.is_ascii_alphabetic())?;
        let (letters, digits) = name.split_at(split);

        if letters.is_empty()
            || digits.is_empty()
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        let mut col: u32 = 0;
        for c in letters.bytes() {
            col = col * 26 + (c.to_ascii_uppercase() - b'A' + 1) as u32;
            if col > MAX_COL as u32 + 1 {
                return None;
            }
        }

        let row: u32 = digits.parse().ok()?;
        if row == 0 || row > MAX_ROW {
            return None;
        }

        Some(CellRef {
            row: row - 1,
            col: (col - 1) as u16,
        })
    }

    /// Format back into an A1-style address.
    pub fn name(&self) -> String {
        format!("{}{}", column_to_letter(self.col + 1), self.row + 1)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Convert a 1-based column number to letters (1 = A, 27 = AA).
fn column_to_letter(col: u16) -> String {
    let mut name = String::new();
    let mut n = col;

    while n > 0 {
        n -= 1;
        name.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }

    name
}

/// The value stored in a single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Convert a JSON leaf into a cell value. `null` maps to `None` (an
    /// empty cell); arrays and objects are stored as compact JSON text.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(CellValue::Bool(*b)),
            Value::Number(n) => n.as_f64().map(CellValue::Number),
            Value::String(s) => Some(CellValue::Text(s.clone())),
            other => Some(CellValue::Text(other.to_string())),
        }
    }

    fn from_cell(cell: &Cell) -> Option<Self> {
        match cell.get_data_type() {
            "n" => cell.get_value_number().map(CellValue::Number),
            "b" => Some(CellValue::Bool(cell.get_value().eq_ignore_ascii_case("true"))),
            "e" => None,
            _ => {
                let text = cell.get_value();
                (!text.is_empty()).then(|| CellValue::Text(text.into_owned()))
            }
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

/// 1-based `(column, row)` coordinates as used by `umya-spreadsheet`.
fn coordinate(cell: CellRef) -> (u32, u32) {
    (cell.col as u32 + 1, cell.row + 1)
}

fn parse_address(addr: &str) -> Result<CellRef, WorkbookError> {
    CellRef::parse(addr).ok_or_else(|| WorkbookError::InvalidAddress(addr.to_string()))
}

fn read_cell(worksheet: &Worksheet, cell: CellRef) -> Option<CellValue> {
    worksheet
        .get_cell(coordinate(cell))
        .and_then(CellValue::from_cell)
}

/// Read-only view of a worksheet.
#[derive(Clone, Copy)]
pub struct Sheet<'a> {
    worksheet: &'a Worksheet,
}

impl Sheet<'_> {
    pub fn name(&self) -> &str {
        self.worksheet.get_name()
    }

    pub fn get(&self, addr: &str) -> Option<CellValue> {
        CellRef::parse(addr).and_then(|cell| self.get_at(cell))
    }

    pub fn get_at(&self, cell: CellRef) -> Option<CellValue> {
        read_cell(self.worksheet, cell)
    }
}

/// Mutable view of a worksheet. Writes replace only the cell value; the
/// cell's style is kept.
pub struct SheetMut<'a> {
    worksheet: &'a mut Worksheet,
}

impl SheetMut<'_> {
    pub fn name(&self) -> &str {
        self.worksheet.get_name()
    }

    pub fn get(&self, addr: &str) -> Option<CellValue> {
        CellRef::parse(addr).and_then(|cell| self.get_at(cell))
    }

    pub fn get_at(&self, cell: CellRef) -> Option<CellValue> {
        read_cell(self.worksheet, cell)
    }

    /// Store a value. An empty string clears the cell.
    pub fn set(&mut self, addr: &str, value: impl Into<CellValue>) -> Result<(), WorkbookError> {
        let cell = parse_address(addr)?;
        self.set_at(cell, Some(value.into()));
        Ok(())
    }

    /// Store an optional value; `None` clears the cell.
    pub fn set_at(&mut self, cell: CellRef, value: Option<CellValue>) {
        let coord = coordinate(cell);
        match value {
            Some(CellValue::Text(s)) if !s.is_empty() => {
                self.worksheet.get_cell_mut(coord).set_value_string(s);
            }
            Some(CellValue::Number(n)) => {
                self.worksheet.get_cell_mut(coord).set_value_number(n);
            }
            Some(CellValue::Bool(b)) => {
                self.worksheet.get_cell_mut(coord).set_value_bool(b);
            }
            _ => self.blank(coord),
        }
    }

    pub fn clear(&mut self, addr: &str) -> Result<(), WorkbookError> {
        let cell = parse_address(addr)?;
        self.blank(coordinate(cell));
        Ok(())
    }

    fn blank(&mut self, coord: (u32, u32)) {
        if self.worksheet.get_cell(coord).is_some() {
            self.worksheet.get_cell_mut(coord).set_blank();
        }
    }
}

/// An `.xlsx` workbook loaded for editing.
pub struct Workbook {
    book: Spreadsheet,
}

impl Default for Workbook {
    fn default() -> Self {
        Workbook {
            book: umya_spreadsheet::new_file_empty_worksheet(),
        }
    }
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a workbook with all of its content, not just cell values.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WorkbookError> {
        let path = path.as_ref();
        let book = reader::xlsx::read(path).map_err(|source| WorkbookError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Workbook { book })
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.book
            .get_sheet_collection()
            .iter()
            .map(Worksheet::get_name)
            .collect()
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.book.get_sheet_by_name(name).is_some()
    }

    pub fn sheet(&self, name: &str) -> Option<Sheet<'_>> {
        self.book
            .get_sheet_by_name(name)
            .map(|worksheet| Sheet { worksheet })
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<SheetMut<'_>> {
        self.book
            .get_sheet_by_name_mut(name)
            .map(|worksheet| SheetMut { worksheet })
    }

    /// Look up a sheet, failing with [`WorkbookError::MissingSheet`].
    pub fn require_sheet_mut(&mut self, name: &str) -> Result<SheetMut<'_>, WorkbookError> {
        self.sheet_mut(name)
            .ok_or_else(|| WorkbookError::MissingSheet(name.to_string()))
    }

    /// Append a new sheet, or return the existing one with that name.
    pub fn add_sheet(&mut self, name: &str) -> Result<SheetMut<'_>, WorkbookError> {
        if !self.has_sheet(name) {
            self.book
                .new_sheet(name)
                .map_err(|reason| WorkbookError::AddSheet {
                    name: name.to_string(),
                    reason: reason.to_string(),
                })?;
        }
        self.require_sheet_mut(name)
    }

    /// Serialize the workbook to `.xlsx` bytes.
    pub fn to_xlsx(&self) -> Result<Vec<u8>, WorkbookError> {
        let mut buffer = Cursor::new(Vec::new());
        writer::xlsx::write_writer(&self.book, &mut buffer)?;
        Ok(buffer.into_inner())
    }

    /// Write the workbook to `path`, replacing the file atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), WorkbookError> {
        let path = path.as_ref();
        let buffer = self.to_xlsx()?;
        crate::write_atomic(path, &buffer).map_err(|source| WorkbookError::Save {
            path: path.to_path_buf(),
            source,
        })
    }
}

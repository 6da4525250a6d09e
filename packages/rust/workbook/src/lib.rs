//! Workbook loader for opds-export.
//!
//! Opens a spreadsheet through calamine, keeps sheet order, and turns each
//! sheet into a header row plus data rows of typed [`Cell`]s.

pub mod cell;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{Data, Range, Reader, Sheets, open_workbook_auto};
use tracing::{debug, info, instrument};

use opds_export_shared::{OpdsExportError, Result};

pub use cell::{Cell, isoformat};

// ---------------------------------------------------------------------------
// Sheet sources
// ---------------------------------------------------------------------------

/// Where sheets come from. Names are known up front; contents are read on demand.
pub trait SheetSource {
    /// Sheet names in file order.
    fn sheet_names(&self) -> Vec<String>;
    /// Read one sheet's headers and rows.
    fn read_sheet(&mut self, name: &str) -> Result<Sheet>;
}

/// A spreadsheet file read through calamine.
pub struct CalamineSource {
    path: PathBuf,
    workbook: Sheets<BufReader<File>>,
}

impl CalamineSource {
    /// Open a workbook (xlsx, xlsm, xls, ods). Failure to open is fatal.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let workbook = open_workbook_auto(&path)
            .map_err(|e| OpdsExportError::workbook(&path, e.to_string()))?;
        Ok(Self { path, workbook })
    }
}

impl SheetSource for CalamineSource {
    fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Sheet> {
        let range = self.workbook.worksheet_range(name).map_err(|e| {
            OpdsExportError::workbook(&self.path, format!("sheet '{name}': {e}"))
        })?;
        Ok(Sheet::from_range(name.to_string(), &range))
    }
}

/// Sheets already in memory.
impl SheetSource for Vec<Sheet> {
    fn sheet_names(&self) -> Vec<String> {
        self.iter().map(|s| s.name.clone()).collect()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Sheet> {
        self.iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| OpdsExportError::workbook("<memory>", format!("no sheet '{name}'")))
    }
}

// ---------------------------------------------------------------------------
// Workbook
// ---------------------------------------------------------------------------

/// An ordered set of named sheets whose contents load one at a time.
pub struct Workbook {
    names: Vec<String>,
    source: Box<dyn SheetSource>,
}

impl std::fmt::Debug for Workbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbook")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

impl Workbook {
    /// Open a workbook file and list its sheets. Sheet contents are only read
    /// by [`Workbook::load_sheet`], so sheets that are never asked for are
    /// never parsed.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        info!("loading workbook");
        let workbook = Self::from_source(CalamineSource::open(path.as_ref())?);
        info!(sheets = workbook.names.len(), "workbook opened");
        Ok(workbook)
    }

    /// Build a workbook from in-memory sheets.
    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        Self::from_source(sheets)
    }

    /// Build a workbook over any sheet source.
    pub fn from_source(source: impl SheetSource + 'static) -> Self {
        Self {
            names: source.sheet_names(),
            source: Box::new(source),
        }
    }

    /// Sheet names in file order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.names.iter().map(String::as_str).collect()
    }

    /// Read one sheet. Failure is fatal to the caller.
    pub fn load_sheet(&mut self, name: &str) -> Result<Sheet> {
        let sheet = self.source.read_sheet(name)?;
        debug!(sheet = %sheet.name, rows = sheet.rows.len(), "read sheet");
        Ok(sheet)
    }
}

// ---------------------------------------------------------------------------
// Sheet
// ---------------------------------------------------------------------------

/// One worksheet: trimmed headers and the data rows below them.
#[derive(Debug, Clone)]
pub struct Sheet {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Build a sheet from a header row and data rows.
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let headers = headers.into_iter().map(|h| h.trim().to_string()).collect();
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Build a sheet from a grid whose first row holds the headers.
    pub fn from_grid(name: impl Into<String>, grid: Vec<Vec<Cell>>) -> Self {
        let mut rows = grid.into_iter();
        let headers = rows
            .next()
            .map(|row| row.iter().map(|c| c.as_text().trim().to_string()).collect())
            .unwrap_or_default();
        Self {
            name: name.into(),
            headers,
            rows: rows.collect(),
        }
    }

    fn from_range(name: String, range: &Range<Data>) -> Self {
        let grid = range
            .rows()
            .map(|row| row.iter().map(Cell::from).collect())
            .collect();
        Self::from_grid(name, grid)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows (header excluded).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Data rows zipped with the headers, numbered from 1.
    pub fn records(&self) -> impl Iterator<Item = RowRecord> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| RowRecord::zip(i + 1, &self.headers, row))
    }
}

// ---------------------------------------------------------------------------
// RowRecord
// ---------------------------------------------------------------------------

/// A data row keyed by header name.
#[derive(Debug, Clone)]
pub struct RowRecord {
    number: usize,
    fields: Vec<(String, Cell)>,
}

impl RowRecord {
    /// Pair `headers` with `row` by position. Headers and text are trimmed,
    /// missing cells read as empty, cells past the last header are dropped.
    pub fn zip(number: usize, headers: &[String], row: &[Cell]) -> Self {
        let fields = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let cell = row.get(i).map(Cell::trimmed).unwrap_or(Cell::Empty);
                (header.trim().to_string(), cell)
            })
            .collect();
        Self { number, fields }
    }

    /// 1-based row number after the header.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Value under exactly `key`. Headers are stored trimmed, so a key with
    /// surrounding whitespace never matches. A repeated header resolves to
    /// its last column.
    pub fn get(&self, key: &str) -> Option<&Cell> {
        self.fields
            .iter()
            .rev()
            .find(|(header, _)| header == key)
            .map(|(_, cell)| cell)
    }
}

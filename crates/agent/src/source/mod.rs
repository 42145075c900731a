//! Where sheets come from. The query path only ever calls `fetch`; the other
//! operations exist for setup.

use std::path::PathBuf;

use async_trait::async_trait;
use tablechat_core::{ApplicationError, RangeSpec, Row, Table};
use thiserror::Error;

pub mod memory;
pub mod workbook;

pub use memory::InMemorySource;
pub use workbook::CsvWorkbook;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("sheet `{0}` was not found")]
    SheetNotFound(String),
    #[error("sheet `{0}` already exists")]
    SheetExists(String),
    #[error("sheet `{0}` could not be created")]
    CreationRejected(String),
    #[error("no sheets are available")]
    NoSheets,
    #[error("permission denied for `{0}`")]
    PermissionDenied(PathBuf),
    #[error("i/o failure on `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed sheet file `{path}`: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv_async::Error,
    },
}

impl From<SourceError> for ApplicationError {
    fn from(value: SourceError) -> Self {
        match value {
            SourceError::PermissionDenied(_) => Self::Authentication(value.to_string()),
            other => Self::DataSource(other.to_string()),
        }
    }
}

#[async_trait]
pub trait TableSource: Send + Sync {
    /// Rows inside `range`, trailing blanks removed. A missing sheet is an
    /// error; an empty sheet is an empty table.
    async fn fetch(&self, range: &RangeSpec) -> Result<Table, SourceError>;
    /// Writes `rows` with the first cell at the range's top-left corner.
    async fn write(&self, range: &RangeSpec, rows: &[Row]) -> Result<(), SourceError>;
    /// Blanks every cell inside the range's columns.
    async fn clear(&self, range: &RangeSpec) -> Result<(), SourceError>;
    async fn sheets(&self) -> Result<Vec<String>, SourceError>;
    async fn create_sheet(&self, name: &str) -> Result<(), SourceError>;
}

pub(crate) fn read_window(grid: &[Row], range: &RangeSpec) -> Table {
    let mut rows = grid
        .iter()
        .skip(range.first_row)
        .map(|row| trim_trailing_blanks(range.clip(row)))
        .collect::<Vec<_>>();
    while rows.last().is_some_and(Row::is_empty) {
        rows.pop();
    }
    Table::new(rows)
}

pub(crate) fn write_window(grid: &mut Vec<Row>, range: &RangeSpec, rows: &[Row]) {
    for (offset, row) in rows.iter().enumerate() {
        let target_index = range.first_row + offset;
        if grid.len() <= target_index {
            grid.resize_with(target_index + 1, Row::default);
        }
        let target = &mut grid[target_index].0;

        let cells = match range.last_column {
            Some(last) => &row.0[..row.len().min((last + 1).saturating_sub(range.first_column))],
            None => &row.0[..],
        };
        let needed = range.first_column + cells.len();
        if target.len() < needed {
            target.resize(needed, String::new());
        }
        for (column, cell) in cells.iter().enumerate() {
            target[range.first_column + column] = cell.clone();
        }
    }
    compact(grid);
}

pub(crate) fn clear_window(grid: &mut Vec<Row>, range: &RangeSpec) {
    for row in grid.iter_mut().skip(range.first_row) {
        let end = range.last_column.map_or(row.len(), |last| (last + 1).min(row.len()));
        for cell in row.0.iter_mut().take(end).skip(range.first_column) {
            cell.clear();
        }
    }
    compact(grid);
}

fn trim_trailing_blanks(mut row: Row) -> Row {
    while row.0.last().is_some_and(|cell| cell.is_empty()) {
        row.0.pop();
    }
    row
}

fn compact(grid: &mut Vec<Row>) {
    for row in grid.iter_mut() {
        *row = trim_trailing_blanks(std::mem::take(row));
    }
    while grid.last().is_some_and(Row::is_empty) {
        grid.pop();
    }
}

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use csv_async::{AsyncReaderBuilder, AsyncWriterBuilder};
use futures::StreamExt;
use tablechat_core::{RangeSpec, Row, Table};
use tokio::fs::{self, File, OpenOptions};
use tracing::debug;

use super::{clear_window, read_window, write_window, SourceError, TableSource};

/// A directory of sheets, one `<name>.csv` file per sheet.
#[derive(Clone, Debug)]
pub struct CsvWorkbook {
    root: PathBuf,
}

impl CsvWorkbook {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.root.join(format!("{sheet}.csv"))
    }

    async fn read_grid(&self, sheet: &str) -> Result<Vec<Row>, SourceError> {
        let path = self.sheet_path(sheet);
        let file = File::open(&path).await.map_err(|error| match error.kind() {
            ErrorKind::NotFound => SourceError::SheetNotFound(sheet.to_string()),
            _ => io_error(&path, error),
        })?;

        let mut records =
            AsyncReaderBuilder::new().has_headers(false).flexible(true).create_reader(file).into_records();
        let mut grid = Vec::new();
        while let Some(record) = records.next().await {
            let record = record.map_err(|source| SourceError::Csv { path: path.clone(), source })?;
            grid.push(Row::new(record.iter()));
        }
        debug!(event_name = "source.sheet.read", sheet, rows = grid.len(), "sheet file read");
        Ok(grid)
    }

    /// Writes the grid beside the sheet and renames it into place, so a
    /// failed write leaves the previous contents intact.
    async fn write_grid(&self, sheet: &str, grid: &[Row]) -> Result<(), SourceError> {
        let path = self.sheet_path(sheet);
        let staging = self.root.join(format!("{sheet}.csv.tmp"));

        if let Err(error) = write_records(&staging, grid).await {
            let _ = fs::remove_file(&staging).await;
            return Err(error);
        }
        fs::rename(&staging, &path).await.map_err(|error| io_error(&path, error))?;
        debug!(event_name = "source.sheet.written", sheet, rows = grid.len(), "sheet file written");
        Ok(())
    }
}

async fn write_records(path: &Path, grid: &[Row]) -> Result<(), SourceError> {
    let file = File::create(path).await.map_err(|error| io_error(path, error))?;

    let mut writer = AsyncWriterBuilder::new().flexible(true).create_writer(file);
    for row in grid {
        writer
            .write_record(row.cells())
            .await
            .map_err(|source| SourceError::Csv { path: path.to_path_buf(), source })?;
    }
    writer.flush().await.map_err(|error| io_error(path, error))
}

fn io_error(path: &Path, error: std::io::Error) -> SourceError {
    match error.kind() {
        ErrorKind::PermissionDenied => SourceError::PermissionDenied(path.to_path_buf()),
        _ => SourceError::Io { path: path.to_path_buf(), source: error },
    }
}

#[async_trait]
impl TableSource for CsvWorkbook {
    async fn fetch(&self, range: &RangeSpec) -> Result<Table, SourceError> {
        let grid = self.read_grid(&range.sheet).await?;
        Ok(read_window(&grid, range))
    }

    async fn write(&self, range: &RangeSpec, rows: &[Row]) -> Result<(), SourceError> {
        let mut grid = self.read_grid(&range.sheet).await?;
        write_window(&mut grid, range, rows);
        self.write_grid(&range.sheet, &grid).await
    }

    async fn clear(&self, range: &RangeSpec) -> Result<(), SourceError> {
        let mut grid = self.read_grid(&range.sheet).await?;
        clear_window(&mut grid, range);
        self.write_grid(&range.sheet, &grid).await
    }

    async fn sheets(&self) -> Result<Vec<String>, SourceError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(io_error(&self.root, error)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|error| io_error(&self.root, error))? {
            let path = entry.path();
            if path.extension().is_some_and(|extension| extension == "csv") {
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn create_sheet(&self, name: &str) -> Result<(), SourceError> {
        fs::create_dir_all(&self.root).await.map_err(|error| io_error(&self.root, error))?;

        let path = self.sheet_path(name);
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(_) => Ok(()),
            Err(error) if error.kind() == ErrorKind::AlreadyExists => {
                Err(SourceError::SheetExists(name.to_string()))
            }
            Err(error) => Err(io_error(&path, error)),
        }
    }
}

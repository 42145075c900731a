use async_trait::async_trait;
use tablechat_core::{RangeSpec, Row, Table};
use tokio::sync::RwLock;

use super::{clear_window, read_window, write_window, SourceError, TableSource};

/// Sheets held in memory, in creation order.
pub struct InMemorySource {
    sheets: RwLock<Vec<(String, Vec<Row>)>>,
    allow_new_sheets: bool,
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self { sheets: RwLock::new(Vec::new()), allow_new_sheets: true }
    }
}

impl InMemorySource {
    pub fn with_sheet(mut self, name: impl Into<String>, rows: Vec<Row>) -> Self {
        self.sheets.get_mut().push((name.into(), rows));
        self
    }

    /// Rejects `create_sheet`, like a spreadsheet shared read-only for structure.
    pub fn without_sheet_creation(mut self) -> Self {
        self.allow_new_sheets = false;
        self
    }
}

#[async_trait]
impl TableSource for InMemorySource {
    async fn fetch(&self, range: &RangeSpec) -> Result<Table, SourceError> {
        let sheets = self.sheets.read().await;
        let (_, grid) = sheets
            .iter()
            .find(|(name, _)| *name == range.sheet)
            .ok_or_else(|| SourceError::SheetNotFound(range.sheet.clone()))?;
        Ok(read_window(grid, range))
    }

    async fn write(&self, range: &RangeSpec, rows: &[Row]) -> Result<(), SourceError> {
        let mut sheets = self.sheets.write().await;
        let (_, grid) = sheets
            .iter_mut()
            .find(|(name, _)| *name == range.sheet)
            .ok_or_else(|| SourceError::SheetNotFound(range.sheet.clone()))?;
        write_window(grid, range, rows);
        Ok(())
    }

    async fn clear(&self, range: &RangeSpec) -> Result<(), SourceError> {
        let mut sheets = self.sheets.write().await;
        let (_, grid) = sheets
            .iter_mut()
            .find(|(name, _)| *name == range.sheet)
            .ok_or_else(|| SourceError::SheetNotFound(range.sheet.clone()))?;
        clear_window(grid, range);
        Ok(())
    }

    async fn sheets(&self) -> Result<Vec<String>, SourceError> {
        let sheets = self.sheets.read().await;
        Ok(sheets.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn create_sheet(&self, name: &str) -> Result<(), SourceError> {
        if !self.allow_new_sheets {
            return Err(SourceError::CreationRejected(name.to_string()));
        }
        let mut sheets = self.sheets.write().await;
        if sheets.iter().any(|(existing, _)| existing == name) {
            return Err(SourceError::SheetExists(name.to_string()));
        }
        sheets.push((name.to_string(), Vec::new()));
        Ok(())
    }
}

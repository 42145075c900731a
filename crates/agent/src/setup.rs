//! Seeds a sheet with the sample employee table.

use tablechat_core::{RangeSpec, Row};
use tracing::{info, warn};

use crate::source::{SourceError, TableSource};

/// Columns A through Z are cleared before seeding.
const CLEAR_LAST_COLUMN: usize = 25;

pub fn sample_rows() -> Vec<Row> {
    vec![
        Row::new(["Id", "Name", "Department", "Salary", "HireDate"]),
        Row::new(["1", "Alice Johnson", "Engineering", "95000", "2022-01-15"]),
        Row::new(["2", "Bob Smith", "Sales", "82000", "2021-11-30"]),
        Row::new(["3", "Charlie Brown", "Engineering", "110000", "2020-05-20"]),
        Row::new(["4", "Diana Prince", "Sales", "78000", "2022-08-01"]),
        Row::new(["5", "Eve Adams", "HR", "65000", "2023-02-10"]),
    ]
}

/// Makes sure a sheet exists and resets it to [`sample_rows`]. Returns the
/// name of the sheet that was written, which is the first existing sheet when
/// `preferred` could not be created.
pub async fn prepare_sheet(source: &dyn TableSource, preferred: &str) -> Result<String, SourceError> {
    let target = resolve_sheet(source, preferred).await?;

    source.clear(&RangeSpec::columns(target.as_str(), 0, CLEAR_LAST_COLUMN)).await?;
    let rows = sample_rows();
    source.write(&RangeSpec::whole_sheet(target.as_str()), &rows).await?;

    info!(
        event_name = "setup.sheet.seeded",
        sheet = %target,
        rows = rows.len(),
        "sample data written"
    );
    Ok(target)
}

async fn resolve_sheet(source: &dyn TableSource, preferred: &str) -> Result<String, SourceError> {
    let existing = source.sheets().await?;
    if existing.iter().any(|name| name == preferred) {
        return Ok(preferred.to_string());
    }

    match source.create_sheet(preferred).await {
        Ok(()) => {
            info!(event_name = "setup.sheet.created", sheet = preferred, "sheet created");
            Ok(preferred.to_string())
        }
        Err(error) => {
            let fallback = existing.into_iter().next().ok_or(SourceError::NoSheets)?;
            warn!(
                event_name = "setup.sheet.fallback",
                sheet = preferred,
                fallback = %fallback,
                error = %error,
                "could not create sheet, using first existing sheet"
            );
            Ok(fallback)
        }
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One row of cells. Cells are untyped text; typed values are parsed at the
/// point of use.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(pub Vec<String>);

impl Row {
    pub fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(cells.into_iter().map(Into::into).collect())
    }

    pub fn cell(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn cells(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Ordered rows where row 0 is the header.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn header(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn data_rows(&self) -> &[Row] {
        self.rows.get(1..).unwrap_or_default()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn data_row_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }
}

impl From<Vec<Vec<String>>> for Table {
    fn from(rows: Vec<Vec<String>>) -> Self {
        Self::new(rows.into_iter().map(Row).collect())
    }
}

/// Positions of the columns the filter engine reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub department: usize,
    pub salary: usize,
    pub hire_date: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self { department: 2, salary: 3, hire_date: 4 }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("range `{0}` is missing a sheet name")]
    MissingSheet(String),
    #[error("range `{0}` has an invalid cell reference")]
    InvalidReference(String),
    #[error("range `{0}` ends before it starts")]
    Inverted(String),
}

/// A parsed A1-style range such as `Employees!A:E` or `Employees!A1`.
///
/// Columns are zero-based and inclusive. A single-cell range like `A1` is open
/// ended to the right, which is how writes anchored at `A1` behave.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeSpec {
    pub sheet: String,
    pub first_column: usize,
    pub last_column: Option<usize>,
    pub first_row: usize,
}

impl RangeSpec {
    pub fn columns(sheet: impl Into<String>, first: usize, last: usize) -> Self {
        Self { sheet: sheet.into(), first_column: first, last_column: Some(last), first_row: 0 }
    }

    pub fn whole_sheet(sheet: impl Into<String>) -> Self {
        Self { sheet: sheet.into(), first_column: 0, last_column: None, first_row: 0 }
    }

    pub fn parse(input: &str) -> Result<Self, RangeError> {
        let trimmed = input.trim();
        let Some((sheet, reference)) = trimmed.rsplit_once('!') else {
            return Err(RangeError::MissingSheet(trimmed.to_string()));
        };
        let sheet = sheet.trim_matches('\'');
        if sheet.is_empty() {
            return Err(RangeError::MissingSheet(trimmed.to_string()));
        }

        let (start, end) = match reference.split_once(':') {
            Some((start, end)) => (start, Some(end)),
            None => (reference, None),
        };

        let (first_column, first_row) = parse_cell_reference(start)
            .ok_or_else(|| RangeError::InvalidReference(trimmed.to_string()))?;
        let last_column = match end {
            Some(end) => {
                let (column, _) = parse_cell_reference(end)
                    .ok_or_else(|| RangeError::InvalidReference(trimmed.to_string()))?;
                if column < first_column {
                    return Err(RangeError::Inverted(trimmed.to_string()));
                }
                Some(column)
            }
            None => None,
        };

        Ok(Self {
            sheet: sheet.to_string(),
            first_column,
            last_column,
            first_row: first_row.unwrap_or(0),
        })
    }

    /// Keeps only the cells inside the column window.
    pub fn clip(&self, row: &Row) -> Row {
        let end = match self.last_column {
            Some(last) => (last + 1).min(row.len()),
            None => row.len(),
        };
        if self.first_column >= end {
            return Row::default();
        }
        Row(row.0[self.first_column..end].to_vec())
    }
}

impl std::fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}!{}", self.sheet, column_name(self.first_column))?;
        if self.first_row > 0 || self.last_column.is_none() {
            write!(f, "{}", self.first_row + 1)?;
        }
        if let Some(last) = self.last_column {
            write!(f, ":{}", column_name(last))?;
        }
        Ok(())
    }
}

/// Splits `AB12` into a zero-based column and an optional zero-based row.
fn parse_cell_reference(reference: &str) -> Option<(usize, Option<usize>)> {
    let reference = reference.trim();
    let split = reference.find(|ch: char| ch.is_ascii_digit()).unwrap_or(reference.len());
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return None;
    }

    let mut column = 0usize;
    for ch in letters.chars() {
        let value = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        column = column.checked_mul(26)?.checked_add(value)?;
    }

    let row = if digits.is_empty() {
        None
    } else {
        let number = digits.parse::<usize>().ok()?;
        Some(number.checked_sub(1)?)
    };

    Some((column - 1, row))
}

/// Zero-based column index to its A1 letters: 0 is `A`, 26 is `AA`.
pub(crate) fn column_name(index: usize) -> String {
    let mut name = Vec::new();
    let mut value = index + 1;
    while value > 0 {
        let remainder = (value - 1) % 26;
        name.push(b'A' + remainder as u8);
        value = (value - 1) / 26;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

#[cfg(test)]
mod tests {
    use super::{column_name, ColumnLayout, RangeError, RangeSpec, Row, Table};

    #[test]
    fn column_names_follow_a1_letters() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(4), "E");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
    }

    #[test]
    fn header_and_data_rows_are_split() {
        let table = Table::new(vec![
            Row::new(["Id", "Name"]),
            Row::new(["1", "Alice"]),
            Row::new(["2", "Bob"]),
        ]);

        assert_eq!(table.header(), Some(&Row::new(["Id", "Name"])));
        assert_eq!(table.data_rows().len(), 2);
        assert_eq!(table.data_row_count(), 2);
    }

    #[test]
    fn empty_table_has_no_header_or_data() {
        let table = Table::default();
        assert!(table.header().is_none());
        assert!(table.data_rows().is_empty());
        assert_eq!(table.data_row_count(), 0);
    }

    #[test]
    fn default_layout_matches_employee_sheet() {
        let layout = ColumnLayout::default();
        assert_eq!((layout.department, layout.salary, layout.hire_date), (2, 3, 4));
    }

    #[test]
    fn parses_column_span() {
        let range = RangeSpec::parse("Employees!A:E").expect("range should parse");
        assert_eq!(range, RangeSpec::columns("Employees", 0, 4));
        assert_eq!(range.to_string(), "Employees!A:E");
    }

    #[test]
    fn parses_anchor_cell_and_wide_columns() {
        let anchor = RangeSpec::parse("Employees!A1").expect("anchor should parse");
        assert_eq!(anchor.last_column, None);
        assert_eq!(anchor.first_row, 0);

        let wide = RangeSpec::parse("'Staff List'!B2:AA").expect("wide range should parse");
        assert_eq!(wide.sheet, "Staff List");
        assert_eq!(wide.first_column, 1);
        assert_eq!(wide.last_column, Some(26));
        assert_eq!(wide.first_row, 1);
    }

    #[test]
    fn rejects_malformed_ranges() {
        assert!(matches!(RangeSpec::parse("A:E"), Err(RangeError::MissingSheet(_))));
        assert!(matches!(RangeSpec::parse("Sheet!1:E"), Err(RangeError::InvalidReference(_))));
        assert!(matches!(RangeSpec::parse("Sheet!E:A"), Err(RangeError::Inverted(_))));
    }

    #[test]
    fn clip_keeps_only_window_cells() {
        let range = RangeSpec::columns("Employees", 1, 2);
        let row = Row::new(["1", "Alice", "Engineering", "95000"]);
        assert_eq!(range.clip(&row), Row::new(["Alice", "Engineering"]));

        let short = Row::new(["1"]);
        assert!(range.clip(&short).is_empty());
    }
}

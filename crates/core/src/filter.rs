use serde::Serialize;

use crate::extract::parse_salary;
use crate::intent::Intent;
use crate::table::{ColumnLayout, Row, Table};

/// Applies an intent's predicate to every data row of a table.
#[derive(Clone, Copy, Debug, Default)]
pub struct RowFilter {
    layout: ColumnLayout,
}

impl RowFilter {
    pub fn new(layout: ColumnLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> ColumnLayout {
        self.layout
    }

    /// Returns the header followed by the matching data rows in their original
    /// order. An empty table stays empty.
    pub fn apply(&self, table: &Table, intent: &Intent) -> Table {
        let Some(header) = table.header() else {
            return Table::default();
        };

        let mut rows = Vec::with_capacity(table.rows().len());
        rows.push(header.clone());
        rows.extend(table.data_rows().iter().filter(|row| self.matches(row, intent)).cloned());
        Table::new(rows)
    }

    pub fn matches(&self, row: &Row, intent: &Intent) -> bool {
        match intent {
            Intent::Department { keyword }
            | Intent::AverageSalary { department: Some(keyword) } => {
                cell_contains_folded(row, self.layout.department, keyword)
            }
            Intent::SalaryAbove { threshold } => {
                salary(row, self.layout.salary).is_some_and(|salary| salary > *threshold)
            }
            Intent::SalaryBelow { threshold } => {
                salary(row, self.layout.salary).is_some_and(|salary| salary < *threshold)
            }
            Intent::HireDate { year: Some(year) } => row
                .cell(self.layout.hire_date)
                .is_some_and(|hire_date| hire_date.contains(year.as_str())),
            Intent::AverageSalary { department: None }
            | Intent::Roster
            | Intent::HireDate { year: None }
            | Intent::All => true,
        }
    }
}

fn cell_contains_folded(row: &Row, index: usize, needle: &str) -> bool {
    row.cell(index).is_some_and(|cell| cell.to_lowercase().contains(&needle.to_lowercase()))
}

fn salary(row: &Row, index: usize) -> Option<i64> {
    row.cell(index).and_then(parse_salary)
}

/// How a filtered table should be reported to the person who asked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "rows", rename_all = "snake_case")]
pub enum FilterOutcome {
    /// The source returned nothing at all.
    NoData,
    /// Only the header survived.
    NoMatch,
    Matched(usize),
}

impl FilterOutcome {
    pub fn of(filtered: &Table) -> Self {
        if filtered.is_empty() {
            Self::NoData
        } else if filtered.data_row_count() == 0 {
            Self::NoMatch
        } else {
            Self::Matched(filtered.data_row_count())
        }
    }
}

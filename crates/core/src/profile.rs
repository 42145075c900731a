//! Summary statistics over a sheet, used to describe it to the model.

use serde::Serialize;

use crate::extract::{hire_year, parse_salary};
use crate::table::{column_name, ColumnLayout, Table};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TableProfile {
    pub columns: Vec<String>,
    pub departments: Vec<String>,
    pub salary_range: Option<(i64, i64)>,
    pub hire_years: Option<(i32, i32)>,
    pub rows: usize,
}

impl TableProfile {
    pub fn from_table(table: &Table, layout: ColumnLayout) -> Self {
        let columns = table.header().map(|header| header.cells().to_vec()).unwrap_or_default();

        let mut departments: Vec<String> = Vec::new();
        let mut salary_range: Option<(i64, i64)> = None;
        let mut hire_years: Option<(i32, i32)> = None;

        for row in table.data_rows() {
            if let Some(department) = row.cell(layout.department).map(str::trim) {
                if !department.is_empty() && !departments.iter().any(|seen| seen == department) {
                    departments.push(department.to_string());
                }
            }
            if let Some(salary) = row.cell(layout.salary).and_then(parse_salary) {
                salary_range = Some(match salary_range {
                    Some((low, high)) => (low.min(salary), high.max(salary)),
                    None => (salary, salary),
                });
            }
            if let Some(year) = row.cell(layout.hire_date).and_then(hire_year) {
                hire_years = Some(match hire_years {
                    Some((low, high)) => (low.min(year), high.max(year)),
                    None => (year, year),
                });
            }
        }

        Self { columns, departments, salary_range, hire_years, rows: table.data_row_count() }
    }

    /// The schema block given to the model ahead of the question.
    pub fn schema_description(&self, sheet: &str) -> String {
        let mut lines = vec![
            "Google Sheet Structure:".to_string(),
            format!("Sheet Name: {sheet}"),
            "Columns:".to_string(),
        ];
        for (index, column) in self.columns.iter().enumerate() {
            lines.push(format!("- {}: {column}", column_name(index)));
        }

        lines.push(String::new());
        lines.push("Sample Data Available:".to_string());
        if !self.departments.is_empty() {
            lines.push(format!("- Departments: {}", self.departments.join(", ")));
        }
        if let Some((low, high)) = self.salary_range {
            lines.push(format!(
                "- Salary ranges from ${} to ${}",
                group_thousands(low),
                group_thousands(high)
            ));
        }
        if let Some((low, high)) = self.hire_years {
            lines.push(format!("- Hire dates from {low} to {high}"));
        }
        lines.push(format!("- {} employees total in the dataset", self.rows));

        lines.push(String::new());
        lines.push("Supported Query Types:".to_string());
        lines.push("- Filter by department (e.g., 'Who are the engineers?')".to_string());
        lines.push("- Filter by salary (e.g., 'Who earns more than 90000?')".to_string());
        lines.push("- Calculate averages (e.g., 'What is the average salary in Sales?')".to_string());
        lines.push("- Filter by hire date (e.g., 'Who was hired in 2022?')".to_string());
        lines.push("- General employee information queries".to_string());

        lines.join("\n")
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if value < 0 {
        grouped.insert(0, '-');
    }
    grouped
}

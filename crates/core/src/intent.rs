//! Query intent classification.
//!
//! A question and the model's description of it are matched against an
//! ordered list of rules. The first rule that matches decides the intent and
//! extracts its parameters; nothing matching falls through to [`Intent::All`].
//!
//! Order is significant. The department rule runs before every salary rule, so
//! "What is the average salary for engineer roles?" is a department query.

use serde::{Deserialize, Serialize};

use crate::extract::first_integer;

/// The question as typed plus the model's description of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    question: String,
    description: String,
    question_lower: String,
    description_lower: String,
}

impl Query {
    pub fn new(question: impl Into<String>, description: impl Into<String>) -> Self {
        let question = question.into();
        let description = description.into();
        let question_lower = question.to_lowercase();
        let description_lower = description.to_lowercase();
        Self { question, description, question_lower, description_lower }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn question_has(&self, needle: &str) -> bool {
        self.question_lower.contains(needle)
    }

    pub fn description_has(&self, needle: &str) -> bool {
        self.description_lower.contains(needle)
    }

    pub fn either_has(&self, needle: &str) -> bool {
        self.question_has(needle) || self.description_has(needle)
    }

    fn first_integer(&self) -> Option<i64> {
        first_integer(&self.question_lower)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Department,
    SalaryAbove,
    SalaryBelow,
    AverageSalary,
    Roster,
    HireDate,
    All,
}

impl IntentKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Department => "department",
            Self::SalaryAbove => "salary_above",
            Self::SalaryBelow => "salary_below",
            Self::AverageSalary => "average_salary",
            Self::Roster => "roster",
            Self::HireDate => "hire_date",
            Self::All => "all",
        }
    }
}

/// A classified intent together with the parameters its filter needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    /// Rows whose department cell contains `keyword`.
    Department { keyword: String },
    SalaryAbove { threshold: i64 },
    SalaryBelow { threshold: i64 },
    /// Narrows the rows an average would be taken over. The average itself is
    /// left to whoever reads the rows.
    AverageSalary { department: Option<String> },
    Roster,
    HireDate { year: Option<String> },
    All,
}

impl Intent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Self::Department { .. } => IntentKind::Department,
            Self::SalaryAbove { .. } => IntentKind::SalaryAbove,
            Self::SalaryBelow { .. } => IntentKind::SalaryBelow,
            Self::AverageSalary { .. } => IntentKind::AverageSalary,
            Self::Roster => IntentKind::Roster,
            Self::HireDate { .. } => IntentKind::HireDate,
            Self::All => IntentKind::All,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            Self::Department { keyword } => format!("department contains `{keyword}`"),
            Self::SalaryAbove { threshold } => format!("salary > {threshold}"),
            Self::SalaryBelow { threshold } => format!("salary < {threshold}"),
            Self::AverageSalary { department: Some(department) } => {
                format!("average salary scope, department contains `{department}`")
            }
            Self::AverageSalary { department: None } => "average salary scope, all rows".to_string(),
            Self::Roster => "roster, all rows".to_string(),
            Self::HireDate { year: Some(year) } => format!("hire date contains `{year}`"),
            Self::HireDate { year: None } => "hire date, all rows".to_string(),
            Self::All => "all rows".to_string(),
        }
    }
}

/// A department as it appears in questions and in the sheet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentKeyword {
    /// Matched against the question, e.g. `engineer`.
    pub question_keyword: String,
    /// Matched against the description and the department cell, e.g. `engineering`.
    pub name: String,
}

impl DepartmentKeyword {
    pub fn new(question_keyword: impl Into<String>, name: impl Into<String>) -> Self {
        Self { question_keyword: question_keyword.into(), name: name.into() }
    }
}

/// Vocabulary and defaults the rules read. Passed in explicitly; the rules
/// never consult process state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub departments: Vec<DepartmentKeyword>,
    pub average_departments: Vec<String>,
    pub hire_years: Vec<String>,
    pub default_salary_above: i64,
    pub default_salary_below: i64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            departments: vec![
                DepartmentKeyword::new("engineer", "engineering"),
                DepartmentKeyword::new("sales", "sales"),
                DepartmentKeyword::new("hr", "hr"),
            ],
            average_departments: vec!["sales".to_string(), "engineering".to_string()],
            hire_years: vec!["2022".to_string(), "2023".to_string()],
            default_salary_above: 90_000,
            default_salary_below: 80_000,
        }
    }
}

pub type RuleMatcher = fn(&Query, &ClassifierConfig) -> bool;
pub type RuleExtractor = fn(&Query, &ClassifierConfig) -> Intent;

/// One entry of the precedence list.
#[derive(Clone, Copy)]
pub struct IntentRule {
    pub kind: IntentKind,
    pub matches: RuleMatcher,
    pub extract: RuleExtractor,
}

impl IntentRule {
    pub fn evaluate(&self, query: &Query, config: &ClassifierConfig) -> Option<Intent> {
        (self.matches)(query, config).then(|| (self.extract)(query, config))
    }
}

impl std::fmt::Debug for IntentRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentRule").field("kind", &self.kind).finish_non_exhaustive()
    }
}

/// The six rules in precedence order.
pub fn default_rules() -> Vec<IntentRule> {
    vec![
        IntentRule { kind: IntentKind::Department, matches: is_department, extract: department },
        IntentRule { kind: IntentKind::SalaryAbove, matches: is_salary_above, extract: salary_above },
        IntentRule { kind: IntentKind::SalaryBelow, matches: is_salary_below, extract: salary_below },
        IntentRule {
            kind: IntentKind::AverageSalary,
            matches: is_average_salary,
            extract: average_salary,
        },
        IntentRule { kind: IntentKind::Roster, matches: is_roster, extract: roster },
        IntentRule { kind: IntentKind::HireDate, matches: is_hire_date, extract: hire_date },
    ]
}

#[derive(Clone, Debug)]
pub struct IntentClassifier {
    config: ClassifierConfig,
    rules: Vec<IntentRule>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

impl IntentClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self::with_rules(config, default_rules())
    }

    pub fn with_rules(config: ClassifierConfig, rules: Vec<IntentRule>) -> Self {
        Self { config, rules }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    /// Always yields exactly one intent.
    pub fn classify(&self, query: &Query) -> Intent {
        self.rules
            .iter()
            .find_map(|rule| rule.evaluate(query, &self.config))
            .unwrap_or(Intent::All)
    }
}

fn matched_department<'a>(
    query: &Query,
    config: &'a ClassifierConfig,
) -> Option<&'a DepartmentKeyword> {
    config.departments.iter().find(|department| {
        query.question_has(&department.question_keyword) || query.description_has(&department.name)
    })
}

fn is_department(query: &Query, config: &ClassifierConfig) -> bool {
    matched_department(query, config).is_some()
}

fn department(query: &Query, config: &ClassifierConfig) -> Intent {
    match matched_department(query, config) {
        Some(department) => Intent::Department { keyword: department.name.clone() },
        None => Intent::All,
    }
}

fn is_salary_above(query: &Query, _: &ClassifierConfig) -> bool {
    query.question_has("salary")
        && (query.question_has("more than")
            || query.question_has(">")
            || query.description_has("greater"))
}

fn salary_above(query: &Query, config: &ClassifierConfig) -> Intent {
    Intent::SalaryAbove { threshold: query.first_integer().unwrap_or(config.default_salary_above) }
}

fn is_salary_below(query: &Query, _: &ClassifierConfig) -> bool {
    query.question_has("salary")
        && (query.question_has("less than")
            || query.question_has("<")
            || query.description_has("less"))
}

fn salary_below(query: &Query, config: &ClassifierConfig) -> Intent {
    Intent::SalaryBelow { threshold: query.first_integer().unwrap_or(config.default_salary_below) }
}

fn is_average_salary(query: &Query, _: &ClassifierConfig) -> bool {
    query.either_has("average") && query.question_has("salary")
}

fn average_salary(query: &Query, config: &ClassifierConfig) -> Intent {
    let department =
        config.average_departments.iter().find(|department| query.either_has(department)).cloned();
    Intent::AverageSalary { department }
}

fn is_roster(query: &Query, _: &ClassifierConfig) -> bool {
    query.question_has("who") || query.description_has("names") || query.description_has("employees")
}

fn roster(_: &Query, _: &ClassifierConfig) -> Intent {
    Intent::Roster
}

fn is_hire_date(query: &Query, _: &ClassifierConfig) -> bool {
    query.question_has("hired") || query.question_has("hire date") || query.description_has("date")
}

fn hire_date(query: &Query, config: &ClassifierConfig) -> Intent {
    let year = config.hire_years.iter().find(|year| query.either_has(year)).cloned();
    Intent::HireDate { year }
}

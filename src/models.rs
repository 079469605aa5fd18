//! Data models shared by the query engine, the aggregation engine and the
//! chat pipeline.
//!
//! Everything here is request-scoped: a [`FilterSpec`] is built per request,
//! a [`Table`] holds the rows fetched for it, and both are dropped once the
//! response has been produced.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::error::{ExplorerError, Result};

/// Optional constraints on the admissions view.
///
/// An absent field places no constraint on its dimension. Present text fields
/// match exactly; dates are inclusive bounds on the admission date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    /// Community of care
    pub community: Option<String>,
    /// Patient sex
    pub sex: Option<String>,
    /// Diagnosis category
    pub category: Option<String>,
    /// Earliest admission date (inclusive)
    pub date_from: Option<NaiveDate>,
    /// Latest admission date (inclusive)
    pub date_to: Option<NaiveDate>,
}

impl FilterSpec {
    /// Create a filter with no constraints
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one community of care
    #[must_use]
    pub fn with_community(mut self, community: impl Into<String>) -> Self {
        self.community = Some(community.into());
        self
    }

    /// Restrict to one sex
    #[must_use]
    pub fn with_sex(mut self, sex: impl Into<String>) -> Self {
        self.sex = Some(sex.into());
        self
    }

    /// Restrict to one diagnosis category
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Restrict admissions to `[from, to]`; either bound may be open
    #[must_use]
    pub const fn with_dates(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    /// Number of constrained dimensions
    #[must_use]
    pub fn present_count(&self) -> usize {
        [
            self.community.is_some(),
            self.sex.is_some(),
            self.category.is_some(),
            self.date_from.is_some(),
            self.date_to.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }

    /// True when no dimension is constrained
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.present_count() == 0
    }
}

/// One page of the raw table: page numbers start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    /// Page used when the caller does not ask for one
    pub const DEFAULT_PAGE: u32 = 1;
    /// Page size used when the caller does not ask for one
    pub const DEFAULT_PER_PAGE: u32 = 10;

    /// Build a page request, rejecting zero page numbers and sizes.
    pub fn new(page: u32, per_page: u32) -> Result<Self> {
        if page == 0 {
            return Err(ExplorerError::Validation("page debe ser mayor o igual que 1".into()));
        }
        if per_page == 0 {
            return Err(ExplorerError::Validation("per_page debe ser mayor o igual que 1".into()));
        }
        Ok(Self { page, per_page })
    }

    /// 1-based page number
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Rows per page
    #[must_use]
    pub const fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Number of rows before this page
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }

    /// Row number of the last row this page may hold
    #[must_use]
    pub const fn upper_bound(&self) -> u64 {
        self.offset() + self.per_page as u64
    }

    /// Number of pages needed for `total` rows
    #[must_use]
    pub const fn page_count(&self, total: u64) -> u64 {
        total.div_ceil(self.per_page as u64)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            per_page: Self::DEFAULT_PER_PAGE,
        }
    }
}

/// A value bound to a positional placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    /// Text value
    Text(String),
    /// Calendar date, bound as `YYYY-MM-DD`
    Date(NaiveDate),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// A single value read back from the store
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// SQL NULL
    Null,
    /// Integer value
    Integer(i64),
    /// Floating point value
    Real(f64),
    /// Text value
    Text(String),
}

impl Cell {
    /// Value used as a grouping key; NULL cells are not counted
    #[must_use]
    pub fn as_key(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Integer(value) => Some(value.to_string()),
            Self::Real(value) => Some(value.to_string()),
            Self::Text(text) => Some(text.clone()),
        }
    }

    /// Numeric reading of the cell.
    ///
    /// `NULL`, the literal text `NULL`, empty text and anything that does not
    /// parse to a finite number are all treated as missing.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            Self::Null => return None,
            Self::Integer(value) => *value as f64,
            Self::Real(value) => *value,
            Self::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
                    return None;
                }
                trimmed.parse::<f64>().ok()?
            }
        };
        value.is_finite().then_some(value)
    }

    /// JSON rendering used for table items
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Integer(value) => serde_json::Value::from(*value),
            Self::Real(value) => serde_json::Number::from_f64(*value)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Text(text) => serde_json::Value::String(text.clone()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Real(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::Real(value) if value.is_finite() => serializer.serialize_f64(*value),
            Self::Real(_) => serializer.serialize_none(),
            Self::Text(text) => serializer.serialize_str(text),
        }
    }
}

/// A JSON object describing one row
pub type RowMap = serde_json::Map<String, serde_json::Value>;

/// Rows returned by the store, with their column names in select order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Column names in select order
    pub columns: Vec<String>,
    /// Rows; each has one cell per column
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Create a table from columns and rows
    #[must_use]
    pub const fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when there are no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, ignoring ASCII case
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.eq_ignore_ascii_case(name))
    }

    /// Cells of one column, or `None` when the column is not selected
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Cell> + '_> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row.get(index).unwrap_or(&Cell::Null)))
    }

    /// Drop a column (case-insensitive); a missing column is a no-op
    #[must_use]
    pub fn without_column(mut self, name: &str) -> Self {
        if let Some(index) = self.column_index(name) {
            self.columns.remove(index);
            for row in &mut self.rows {
                if index < row.len() {
                    row.remove(index);
                }
            }
        }
        self
    }

    /// Rows as JSON objects keyed by column name
    #[must_use]
    pub fn to_records(&self) -> Vec<RowMap> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row.iter())
                    .map(|(column, cell)| (column.clone(), cell.to_json()))
                    .collect()
            })
            .collect()
    }
}

/// Table name to column names, in the backend's ordinal order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SchemaMap {
    tables: BTreeMap<String, Vec<String>>,
}

impl SchemaMap {
    /// Create an empty schema map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column to a table, keeping arrival order within the table
    pub fn push_column(&mut self, table: impl Into<String>, column: impl Into<String>) {
        self.tables.entry(table.into()).or_default().push(column.into());
    }

    /// Columns of one table
    #[must_use]
    pub fn columns(&self, table: &str) -> Option<&[String]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    /// Iterate tables in name order
    pub fn tables(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.tables.iter()
    }

    /// Number of tables
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True when no table was found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// One `TABLE(col1, col2, ...)` line per table, for model prompts
    #[must_use]
    pub fn to_prompt_text(&self) -> String {
        self.tables
            .iter()
            .map(|(table, columns)| format!("{table}({})", columns.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Counts keyed by observed value.
///
/// Entries serialize as a JSON object in the order they are stored, so the
/// aggregation engine decides the emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    entries: Vec<(String, u64)>,
}

impl FrequencyTable {
    /// Build from already ordered entries
    #[must_use]
    pub const fn from_entries(entries: Vec<(String, u64)>) -> Self {
        Self { entries }
    }

    /// Count for one key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<u64> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, count)| *count)
    }

    /// Stored entries in emission order
    #[must_use]
    pub fn entries(&self) -> &[(String, u64)] {
        &self.entries
    }

    /// Keys in emission order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Sum of all counts
    #[must_use]
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// True when there are no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for FrequencyTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, count) in &self.entries {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

/// Dashboard metrics over the filtered admissions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    /// Admissions per community of care
    #[serde(rename = "comunidades")]
    pub communities: FrequencyTable,
    /// Admissions per sex
    #[serde(rename = "sexos")]
    pub sexes: FrequencyTable,
    /// Admissions per diagnosis category
    #[serde(rename = "categorias")]
    pub categories: FrequencyTable,
    /// Admissions per month, ascending by month
    #[serde(rename = "ingresos_por_mes")]
    pub admissions_by_month: FrequencyTable,
    /// Mean length of stay in days
    #[serde(rename = "estancia_promedio")]
    pub mean_length_of_stay: f64,
    /// Sum of APR costs
    #[serde(rename = "coste_total")]
    pub total_cost: f64,
    /// ICU and non-ICU admission counts
    #[serde(rename = "ingresos_uci")]
    pub icu_breakdown: FrequencyTable,
    /// Admissions with at least one ICU day
    #[serde(rename = "pacientes_uci")]
    pub icu_patients: u64,
    /// Mean ICU days among ICU admissions
    #[serde(rename = "dias_uci_promedio")]
    pub mean_icu_days: f64,
}

/// One page of raw admissions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePage {
    /// Rows on this page
    pub items: Vec<RowMap>,
    /// Rows matching the filters
    pub total: u64,
    /// Pages available at this page size
    pub pages: u64,
    /// The page returned
    pub current_page: u32,
}

/// Values available for the filter selectors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    /// Communities of care
    #[serde(rename = "comunidades")]
    pub communities: Vec<String>,
    /// Sexes present in the admissions
    #[serde(rename = "sexos")]
    pub sexes: Vec<String>,
    /// Diagnosis categories
    #[serde(rename = "categorias")]
    pub categories: Vec<String>,
}

/// A completed natural-language question
#[derive(Debug, Clone, PartialEq)]
pub struct ChatExchange {
    /// The question as asked
    pub question: String,
    /// The statement that was executed
    pub generated_sql: String,
    /// Rows the statement returned
    pub result: Table,
    /// The model's explanation of the rows
    pub answer: String,
}

/// Chat endpoint payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatResponse {
    /// Prose answer
    pub answer: String,
    /// Executed statement
    pub sql_query: String,
}

impl From<ChatExchange> for ChatResponse {
    fn from(exchange: ChatExchange) -> Self {
        Self {
            answer: exchange.answer,
            sql_query: exchange.generated_sql,
        }
    }
}

/// Output format for exported rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Comma-separated values format
    Csv,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Get the file extension for this format
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ExplorerError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(ExplorerError::Validation(format!("formato de salida desconocido: {other}"))),
        }
    }
}

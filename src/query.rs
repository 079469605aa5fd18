//! Predicate compilation for the admissions view.
//!
//! A [`FilterSpec`] becomes a WHERE clause with positional `:N` placeholders
//! and a parallel list of bound values. The same compiled predicate feeds the
//! count, page and full-result queries so they always agree on the row set.

use std::fmt;

use crate::models::{FilterSpec, SqlValue};
use crate::schema::admissions;

/// Condition every clause starts from, so each predicate appends as `AND ...`
pub const ALWAYS_TRUE: &str = "1=1";

/// Comparison operators used by the filters
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operator {
    /// Equality (=)
    Equal,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,
    /// Less than or equal (<=)
    LessThanOrEqual,
}

impl Operator {
    /// SQL spelling of the operator
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThanOrEqual => "<=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One `column OP :N` condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    /// Column the condition applies to
    pub column: &'static str,
    /// Comparison operator
    pub operator: Operator,
    /// 1-based placeholder index
    pub placeholder: usize,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} :{}", self.column, self.operator, self.placeholder)
    }
}

/// A rendered WHERE clause and the values for its placeholders.
///
/// Placeholders run `:1..:n` in append order and `params().len() == n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledPredicate {
    predicates: Vec<Predicate>,
    params: Vec<SqlValue>,
}

impl CompiledPredicate {
    /// Conditions in append order
    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Bound values, index `i` belongs to placeholder `:i+1`
    #[must_use]
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// True when no condition was appended
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.predicates.is_empty()
    }

    /// The clause without the `WHERE` keyword
    #[must_use]
    pub fn where_clause(&self) -> String {
        let mut clause = String::from(ALWAYS_TRUE);
        for predicate in &self.predicates {
            clause.push_str(" AND ");
            clause.push_str(&predicate.to_string());
        }
        clause
    }
}

/// Accumulates conditions and their values, numbering placeholders as they
/// are appended.
#[derive(Debug, Default)]
pub struct PredicateBuilder {
    compiled: CompiledPredicate,
}

impl PredicateBuilder {
    /// Create a builder with no conditions
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `column OP :N` bound to `value`
    pub fn push(&mut self, column: &'static str, operator: Operator, value: SqlValue) -> &mut Self {
        let placeholder = self.compiled.params.len() + 1;
        self.compiled.predicates.push(Predicate {
            column,
            operator,
            placeholder,
        });
        self.compiled.params.push(value);
        self
    }

    /// Append the condition only when a value is present
    pub fn push_optional(
        &mut self,
        column: &'static str,
        operator: Operator,
        value: Option<SqlValue>,
    ) -> &mut Self {
        if let Some(value) = value {
            self.push(column, operator, value);
        }
        self
    }

    /// Finish building
    #[must_use]
    pub fn build(self) -> CompiledPredicate {
        self.compiled
    }
}

/// Compile filters into a WHERE clause.
///
/// Fields are always visited as community, sex, category, date from, date to,
/// so equal filters compile to identical output.
#[must_use]
pub fn compile(filters: &FilterSpec) -> CompiledPredicate {
    let mut builder = PredicateBuilder::new();
    builder
        .push_optional(
            admissions::COMMUNITY,
            Operator::Equal,
            filters.community.clone().map(SqlValue::Text),
        )
        .push_optional(admissions::SEX, Operator::Equal, filters.sex.clone().map(SqlValue::Text))
        .push_optional(
            admissions::CATEGORY,
            Operator::Equal,
            filters.category.clone().map(SqlValue::Text),
        )
        .push_optional(
            admissions::ADMISSION_DATE,
            Operator::GreaterThanOrEqual,
            filters.date_from.map(SqlValue::Date),
        )
        .push_optional(
            admissions::ADMISSION_DATE,
            Operator::LessThanOrEqual,
            filters.date_to.map(SqlValue::Date),
        );
    builder.build()
}

/// `SELECT * FROM source` with no filtering
#[must_use]
pub fn base_query(source: &str) -> String {
    format!("SELECT * FROM {source}")
}

/// Every filtered row of `source`
#[must_use]
pub fn select_query(source: &str, predicate: &CompiledPredicate) -> String {
    format!("{} WHERE {}", base_query(source), predicate.where_clause())
}

/// Number of filtered rows of `source`
#[must_use]
pub fn count_query(source: &str, predicate: &CompiledPredicate) -> String {
    format!("SELECT COUNT(*) FROM {source} WHERE {}", predicate.where_clause())
}

//! Dashboard aggregation over an already fetched row set.
//!
//! Every metric is computed on its own: a column that is not selected leaves
//! its metric at the neutral default (empty table or `0`) without affecting
//! the others. No metric is ever NaN.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{AggregateResult, Cell, FrequencyTable, Table};
use crate::schema::admissions;

/// Cohort label for admissions with at least one ICU day
pub const ICU_LABEL: &str = "Sí";
/// Cohort label for admissions without ICU days
pub const NO_ICU_LABEL: &str = "No";

/// Compute every dashboard metric over `rows`
#[must_use]
pub fn aggregate(rows: &Table) -> AggregateResult {
    let icu = icu_cohort(rows);

    AggregateResult {
        communities: frequency(rows, admissions::COMMUNITY),
        sexes: frequency(rows, admissions::SEX),
        categories: frequency(rows, admissions::CATEGORY),
        admissions_by_month: monthly(rows, admissions::ADMISSION_MONTH),
        mean_length_of_stay: rows
            .column(admissions::LENGTH_OF_STAY)
            .map_or(0.0, |cells| mean(cells.filter_map(Cell::as_number))),
        total_cost: rows
            .column(admissions::APR_COST)
            .map_or(0.0, |cells| sum(cells.filter_map(Cell::as_number))),
        icu_breakdown: icu.breakdown,
        icu_patients: icu.members,
        mean_icu_days: icu.mean_days,
    }
}

/// Occurrences of each non-null value, most frequent first
#[must_use]
pub fn frequency(rows: &Table, column: &str) -> FrequencyTable {
    let mut entries = count_values(rows, column);
    entries.sort_by(|(a_key, a_count), (b_key, b_count)| b_count.cmp(a_count).then_with(|| a_key.cmp(b_key)));
    FrequencyTable::from_entries(entries)
}

/// Occurrences of each month bucket, in ascending month order
#[must_use]
pub fn monthly(rows: &Table, column: &str) -> FrequencyTable {
    let mut entries = count_values(rows, column);
    entries.sort_by(|(a, _), (b, _)| compare_month_keys(a, b));
    FrequencyTable::from_entries(entries)
}

fn count_values(rows: &Table, column: &str) -> Vec<(String, u64)> {
    let Some(cells) = rows.column(column) else {
        return Vec::new();
    };
    let mut counts: HashMap<String, u64> = HashMap::new();
    for key in cells.filter_map(Cell::as_key) {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts.into_iter().collect()
}

// Numeric buckets (1..12, 202301) compare by value and sort before text
// buckets ("2023-01"), which compare lexically.
fn compare_month_keys(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Arithmetic mean, `0` for an empty input
#[must_use]
pub fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (total, count) = values.fold((0.0, 0_u64), |(total, count), value| (total + value, count + 1));
    if count == 0 {
        return 0.0;
    }
    finite_or_zero(total / count as f64)
}

/// Sum, `0` for an empty input
#[must_use]
pub fn sum(values: impl Iterator<Item = f64>) -> f64 {
    finite_or_zero(values.sum())
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

struct IcuCohort {
    breakdown: FrequencyTable,
    members: u64,
    mean_days: f64,
}

// Membership is `DIAS_UCI > 0` after numeric coercion. Any yes/no flag column
// in the view is ignored: it can disagree with the day count.
fn icu_cohort(rows: &Table) -> IcuCohort {
    let Some(cells) = rows.column(admissions::ICU_DAYS) else {
        return IcuCohort {
            breakdown: FrequencyTable::default(),
            members: 0,
            mean_days: 0.0,
        };
    };

    let member_days: Vec<f64> = cells
        .filter_map(Cell::as_number)
        .filter(|days| *days > 0.0)
        .collect();
    let members = member_days.len() as u64;
    let total = rows.len() as u64;

    IcuCohort {
        breakdown: FrequencyTable::from_entries(vec![
            (NO_ICU_LABEL.to_string(), total - members),
            (ICU_LABEL.to_string(), members),
        ]),
        members,
        mean_days: mean(member_days.into_iter()),
    }
}

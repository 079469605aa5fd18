//! Windowed pagination for backends without `LIMIT`/`OFFSET`.
//!
//! The filtered query is wrapped so that one select numbers the rows, one keeps
//! those numbered at most `upper_bound`, and the outermost keeps those above
//! `offset`. The page therefore holds the rows numbered `(offset, upper_bound]`.
//!
//! No `ORDER BY` is added before numbering, so the rows on a page follow the
//! backend's natural retrieval order and are not guaranteed to be stable
//! between calls.

use crate::db::Dialect;
use crate::models::{PageRequest, Table};
use crate::schema::ROW_NUMBER_COLUMN;

/// Render the statement that fetches one page of `base_query WHERE where_clause`
#[must_use]
pub fn build_page(base_query: &str, where_clause: &str, page: PageRequest, dialect: Dialect) -> String {
    let filtered = format!("{base_query} WHERE {where_clause}");
    let upper = page.upper_bound();
    let offset = page.offset();

    match dialect {
        // ROWNUM is assigned as rows are produced, so the upper bound has to be
        // applied in the same select that exposes it.
        Dialect::Oracle => format!(
            "SELECT * FROM (SELECT a.*, ROWNUM {ROW_NUMBER_COLUMN} FROM ({filtered}) a \
             WHERE ROWNUM <= {upper}) WHERE {ROW_NUMBER_COLUMN} > {offset}"
        ),
        Dialect::Sqlite => format!(
            "SELECT * FROM (SELECT * FROM (SELECT a.*, ROW_NUMBER() OVER () AS {ROW_NUMBER_COLUMN} \
             FROM ({filtered}) a) WHERE {ROW_NUMBER_COLUMN} <= {upper}) \
             WHERE {ROW_NUMBER_COLUMN} > {offset}"
        ),
    }
}

/// Remove the helper row-number column from a fetched page
#[must_use]
pub fn strip_row_number(table: Table) -> Table {
    table.without_column(ROW_NUMBER_COLUMN)
}

//! Catalog introspection for the chat pipeline.
//!
//! The schema is fetched on every chat request; nothing is cached between
//! requests.

use tracing::{debug, warn};

use crate::db::{AdmissionsStore, Dialect};
use crate::error::{ExplorerError, Result};
use crate::models::{Cell, SchemaMap, SqlValue};

/// Catalog statement listing `(table, column)` pairs in ordinal order
#[must_use]
pub fn catalog_query(dialect: Dialect, owner: &str) -> (String, Vec<SqlValue>) {
    match dialect {
        // Oracle folds unquoted identifiers to upper case
        Dialect::Oracle => (
            "SELECT TABLE_NAME, COLUMN_NAME FROM ALL_TAB_COLUMNS WHERE OWNER = :1 \
             ORDER BY TABLE_NAME, COLUMN_ID"
                .to_string(),
            vec![SqlValue::Text(owner.to_uppercase())],
        ),
        // SQLite has no owners
        Dialect::Sqlite => (
            "SELECT m.name AS TABLE_NAME, p.name AS COLUMN_NAME \
             FROM sqlite_master m JOIN pragma_table_info(m.name) p \
             WHERE m.type IN ('table', 'view') AND m.name NOT LIKE 'sqlite_%' \
             ORDER BY m.name, p.cid"
                .to_string(),
            Vec::new(),
        ),
    }
}

/// Tables and columns visible to `owner`, grouped by table
pub fn introspect(store: &dyn AdmissionsStore, owner: &str) -> Result<SchemaMap> {
    let (sql, params) = catalog_query(store.dialect(), owner);
    let rows = store.query(&sql, &params).map_err(|err| {
        warn!(owner, error = %err, "Catalog introspection failed");
        match err {
            ExplorerError::BackendUnavailable(message) => ExplorerError::SchemaUnavailable(message),
            other => ExplorerError::SchemaUnavailable(other.to_string()),
        }
    })?;

    let mut schema = SchemaMap::new();
    for row in &rows.rows {
        if let (Some(Cell::Text(table)), Some(Cell::Text(column))) = (row.first(), row.get(1)) {
            schema.push_column(table.as_str(), column.as_str());
        }
    }

    debug!(owner, tables = schema.len(), "Loaded catalog");
    Ok(schema)
}

//! Store access.
//!
//! [`AdmissionsStore`] is the only way the engine talks to the relational
//! backend. [`SqliteStore`] implements it over an r2d2 pool of rusqlite
//! connections; other backends plug in by implementing the trait.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::DatabaseConfig;
use crate::error::{ExplorerError, Result};
use crate::metrics::MetricsCollector;
use crate::models::{Cell, SqlValue, Table};

// Type alias for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
/// A connection checked out of [`DbPool`]
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// SQL flavour spoken by a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Oracle: `ROWNUM`, `ALL_TAB_COLUMNS`
    Oracle,
    /// SQLite: `ROW_NUMBER() OVER ()`, `pragma_table_info`
    Sqlite,
}

/// Connection capability used by the query engine.
///
/// Statements use `:N` placeholders numbered from 1; `params[i]` binds to
/// `:i+1`. Implementations must not bind anything when `params` is empty.
pub trait AdmissionsStore: Send + Sync {
    /// SQL flavour this store understands
    fn dialect(&self) -> Dialect;

    /// Run a statement and return every row
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Table>;

    /// Run a `COUNT(*)`-style statement and return the first column of the first row
    fn count(&self, sql: &str, params: &[SqlValue]) -> Result<u64>;
}

/// Run store work on the blocking thread pool
pub async fn with_store<T, F>(store: &Arc<dyn AdmissionsStore>, work: F) -> Result<T>
where
    F: FnOnce(&dyn AdmissionsStore) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || work(store.as_ref()))
        .await
        .map_err(|e| ExplorerError::BackendUnavailable(format!("store task failed: {e}")))?
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Text(text) => Ok(ToSqlOutput::from(text.as_str())),
            Self::Date(date) => Ok(ToSqlOutput::from(date.format("%Y-%m-%d").to_string())),
        }
    }
}

/// SQLite-backed store
pub struct SqliteStore {
    pool: DbPool,
    metrics: MetricsCollector,
}

impl SqliteStore {
    /// Open (or create) the database at `database_url`.
    ///
    /// Accepts plain paths as well as `sqlite:` and `sqlite://` URLs.
    pub fn open(database_url: &str, max_connections: u32, connection_timeout: Duration) -> Result<Self> {
        let path = strip_scheme(database_url);

        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(max_connections)
            .connection_timeout(connection_timeout)
            .build(manager)?;

        debug!(path, max_connections, "Opened SQLite store");
        Ok(Self {
            pool,
            metrics: MetricsCollector::default(),
        })
    }

    /// Open the store described by the database section of the configuration
    pub fn from_config(config: &DatabaseConfig, database_url: &str) -> Result<Self> {
        Self::open(
            database_url,
            config.max_connections,
            Duration::from_secs(config.connection_timeout_secs),
        )
    }

    /// Private in-memory database.
    ///
    /// The pool holds a single connection because every SQLite memory
    /// connection is its own database.
    pub fn in_memory() -> Result<Self> {
        let pool = Pool::builder()
            .max_size(1)
            .build(SqliteConnectionManager::memory())?;
        Ok(Self {
            pool,
            metrics: MetricsCollector::default(),
        })
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// Run a batch of statements, e.g. to create and seed the admissions view
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    fn timed<T>(&self, kind: &str, sql: &str, run: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let start = Instant::now();
        let result = self.get_connection().and_then(|conn| run(&*conn));
        let elapsed = start.elapsed();
        self.metrics.record_store_query(kind, elapsed, result.is_ok());

        match &result {
            Ok(_) => debug!(kind, duration_ms = elapsed.as_millis(), sql, "Store query completed"),
            Err(err) => warn!(kind, error = %err, sql, "Store query failed"),
        }
        result
    }
}

impl AdmissionsStore for SqliteStore {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Table> {
        self.timed("query", sql, |conn| {
            let mut stmt = conn.prepare(sql)?;
            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

            let mut rows = if params.is_empty() {
                stmt.query([])?
            } else {
                stmt.query(params_from_iter(params.iter()))?
            };

            let mut table = Table::new(columns, Vec::new());
            let width = table.columns.len();
            while let Some(row) = rows.next()? {
                let mut cells = Vec::with_capacity(width);
                for index in 0..width {
                    cells.push(cell_from(row.get_ref(index)?));
                }
                table.rows.push(cells);
            }
            Ok(table)
        })
    }

    fn count(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        self.timed("count", sql, |conn| {
            let count: i64 = if params.is_empty() {
                conn.query_row(sql, [], |row| row.get(0))?
            } else {
                conn.query_row(sql, params_from_iter(params.iter()), |row| row.get(0))?
            };
            u64::try_from(count)
                .map_err(|_| ExplorerError::BackendUnavailable(format!("negative row count: {count}")))
        })
    }
}

fn cell_from(value: ValueRef<'_>) -> Cell {
    match value {
        ValueRef::Null => Cell::Null,
        ValueRef::Integer(value) => Cell::Integer(value),
        ValueRef::Real(value) => Cell::Real(value),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Cell::Text(String::from_utf8_lossy(bytes).into_owned()),
    }
}

fn strip_scheme(database_url: &str) -> &str {
    database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url)
}

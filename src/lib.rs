//! Admissions Explorer - Filtered Analytics over Hospital Admissions
//!
//! A Rust library for exploring a mental-health admissions dataset through
//! filtered summaries, a paginated raw table, and natural-language questions
//! answered with generated SQL.
//!
//! # Features
//!
//! - Parameterized predicate compilation with positional placeholders
//! - Windowed pagination for backends without `LIMIT`/`OFFSET`
//! - Aggregation with numeric coercion over heterogeneous raw columns
//! - Question-to-SQL pipeline with sanitization and a read-only allow-list
//! - HTTP API, CLI and CSV/JSON export

/// Dashboard aggregation
pub mod aggregate;
/// HTTP API
pub mod api;
/// Natural-language question pipeline
pub mod chat;
/// Configuration management
pub mod config;
/// Store capability and the SQLite backend
pub mod db;
/// Error types
pub mod error;
/// CSV and JSON export
pub mod file_writer;
/// Catalog introspection
pub mod introspect;
/// Generative model client
pub mod llm;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Windowed pagination
pub mod pager;
/// Predicate compilation
pub mod query;
/// Generated SQL cleanup
pub mod sanitize;
/// Table and column names
pub mod schema;
/// Analytics service
pub mod service;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use db::{AdmissionsStore, Dialect, SqliteStore};
pub use error::{ExplorerError, Result};
pub use llm::{GeminiClient, TextGenerator};
pub use models::{AggregateResult, FilterSpec, PageRequest, Table, TablePage};
pub use service::AnalyticsService;

//! Error types for the admissions explorer.
//!
//! Every failure the engine can produce is one variant of [`ExplorerError`].
//! The HTTP layer renders all of them as a bare `{"error": ...}` payload, so a
//! caller never receives partial results next to an error.

use thiserror::Error;

/// Message returned when the filters leave no rows to summarise.
pub const NO_MATCHING_DATA_MESSAGE: &str = "No se encontraron datos con los filtros seleccionados";

/// Errors that can occur while answering an analytics or chat request.
#[derive(Error, Debug)]
pub enum ExplorerError {
    /// The relational store could not be reached or rejected a query.
    ///
    /// The message is the backend's own text, surfaced verbatim.
    #[error("{0}")]
    BackendUnavailable(String),

    /// No generative model is configured for the chat pipeline
    #[error("El servicio de chat no está configurado: falta la clave de API del modelo")]
    ServiceUnconfigured,

    /// Catalog introspection failed
    #[error("No se pudo obtener el esquema de la base de datos: {0}")]
    SchemaUnavailable(String),

    /// The filtered row set is empty
    #[error("No se encontraron datos con los filtros seleccionados")]
    NoMatchingData,

    /// Malformed request parameters
    #[error("Parámetro no válido: {0}")]
    Validation(String),

    /// A generated statement failed the read-only allow-list
    #[error("Consulta generada rechazada: {0}")]
    RejectedStatement(String),

    /// The generative model call failed or returned nothing usable
    #[error("Error del modelo generativo: {0}")]
    Generation(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV export errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ExplorerError {
    /// Short, stable name of the variant, used as a metrics label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::ServiceUnconfigured => "service_unconfigured",
            Self::SchemaUnavailable(_) => "schema_unavailable",
            Self::NoMatchingData => "no_matching_data",
            Self::Validation(_) => "validation",
            Self::RejectedStatement(_) => "rejected_statement",
            Self::Generation(_) => "generation",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Csv(_) => "csv",
            Self::Config(_) => "config",
        }
    }

    /// True for outcomes that are expected rather than faults.
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        matches!(self, Self::NoMatchingData | Self::Validation(_))
    }
}

/// Convenience type alias for Result with ExplorerError
pub type Result<T> = std::result::Result<T, ExplorerError>;

impl From<rusqlite::Error> for ExplorerError {
    fn from(err: rusqlite::Error) -> Self {
        Self::BackendUnavailable(err.to_string())
    }
}

impl From<r2d2::Error> for ExplorerError {
    fn from(err: r2d2::Error) -> Self {
        Self::BackendUnavailable(err.to_string())
    }
}

impl From<reqwest::Error> for ExplorerError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest errors print the request URL
        Self::Generation(err.without_url().to_string())
    }
}

impl From<config::ConfigError> for ExplorerError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

//! Request parameter normalization.
//!
//! Query strings arrive as optional text. [`RawQueryParams`] keeps them as
//! text so that malformed values become [`ExplorerError::Validation`] with a
//! useful message instead of a framework rejection.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::config::PaginationConfig;
use crate::error::{ExplorerError, Result};
use crate::models::{FilterSpec, PageRequest};

/// Raw filter and paging parameters as they appear in the query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQueryParams {
    /// Community of care
    pub comunidad: Option<String>,
    /// Patient sex
    pub sexo: Option<String>,
    /// Diagnosis category
    pub categoria: Option<String>,
    /// Earliest admission date, `YYYY-MM-DD`
    pub fecha_inicio: Option<String>,
    /// Latest admission date, `YYYY-MM-DD`
    pub fecha_fin: Option<String>,
    /// Page number, starting at 1
    pub page: Option<String>,
    /// Rows per page
    pub per_page: Option<String>,
}

impl RawQueryParams {
    /// Normalize the filter parameters
    pub fn filters(&self) -> Result<FilterSpec> {
        Ok(FilterSpec {
            community: InputValidator::non_empty(self.comunidad.as_deref()),
            sex: InputValidator::non_empty(self.sexo.as_deref()),
            category: InputValidator::non_empty(self.categoria.as_deref()),
            date_from: InputValidator::parse_date("fecha_inicio", self.fecha_inicio.as_deref())?,
            date_to: InputValidator::parse_date("fecha_fin", self.fecha_fin.as_deref())?,
        })
    }

    /// Normalize the paging parameters against the configured limits
    pub fn page(&self, limits: &PaginationConfig) -> Result<PageRequest> {
        let page = InputValidator::parse_positive("page", self.page.as_deref())?.unwrap_or(PageRequest::DEFAULT_PAGE);
        let per_page =
            InputValidator::parse_positive("per_page", self.per_page.as_deref())?.unwrap_or(limits.default_per_page);
        InputValidator::validate_per_page(per_page, limits.max_per_page)?;
        PageRequest::new(page, per_page)
    }
}

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Maximum accepted question length in characters
    pub const MAX_QUESTION_CHARS: usize = 2000;

    /// Treat missing and blank values alike; keep the value as given otherwise
    #[must_use]
    pub fn non_empty(value: Option<&str>) -> Option<String> {
        value.filter(|v| !v.trim().is_empty()).map(ToString::to_string)
    }

    /// Parse an optional `YYYY-MM-DD` date
    pub fn parse_date(name: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(None);
        };
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ExplorerError::Validation(format!("{name} debe tener el formato AAAA-MM-DD: {value}")))
    }

    /// Parse an optional integer that must be at least 1
    pub fn parse_positive(name: &str, value: Option<&str>) -> Result<Option<u32>> {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(None);
        };
        match value.parse::<u32>() {
            Ok(0) | Err(_) => Err(ExplorerError::Validation(format!(
                "{name} debe ser un entero mayor o igual que 1: {value}"
            ))),
            Ok(parsed) => Ok(Some(parsed)),
        }
    }

    /// Reject page sizes above the configured maximum
    pub fn validate_per_page(per_page: u32, max_per_page: u32) -> Result<()> {
        if per_page > max_per_page {
            return Err(ExplorerError::Validation(format!(
                "per_page no puede superar {max_per_page}"
            )));
        }
        Ok(())
    }

    /// Validate a chat question and return it trimmed
    pub fn validate_question(question: &str) -> Result<String> {
        let trimmed = Self::sanitize_text(question);
        if trimmed.is_empty() {
            return Err(ExplorerError::Validation("la pregunta no puede estar vacía".into()));
        }
        if trimmed.chars().count() > Self::MAX_QUESTION_CHARS {
            return Err(ExplorerError::Validation(format!(
                "la pregunta no puede superar {} caracteres",
                Self::MAX_QUESTION_CHARS
            )));
        }
        Ok(trimmed)
    }

    /// Sanitize text input
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
            .collect::<String>()
            .trim()
            .to_string()
    }
}

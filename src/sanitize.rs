//! Cleanup and allow-listing of model-generated SQL.
//!
//! [`SqlSanitizer::sanitize`] turns free model text into a single line of SQL:
//! Markdown fences go, a trailing terminator goes, and every run of
//! whitespace becomes one space. It does not parse anything.
//! [`SqlSanitizer::validate_read_only`] is the gate applied afterwards.

use regex::Regex;

use crate::error::{ExplorerError, Result};

/// Statement keywords a generated query may start with
pub const ALLOWED_LEADING_KEYWORDS: [&str; 2] = ["SELECT", "WITH"];

/// SQL text cleaner for model output
#[derive(Debug, Clone)]
pub struct SqlSanitizer {
    fenced_block_regex: Regex,
    fence_marker_regex: Regex,
    trailing_terminator_regex: Regex,
    whitespace_regex: Regex,
    leading_keyword_regex: Regex,
}

impl SqlSanitizer {
    /// Compile the cleanup patterns
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ExplorerError::Config(format!("invalid sanitizer pattern: {e}")))
        };

        Ok(Self {
            // ```sql\n ... ``` anywhere in the response; a tag only counts
            // as a language tag when a line break follows it
            fenced_block_regex: compile(r"(?s)```(?:[A-Za-z0-9_+-]*[ \t]*\r?\n)?(.*?)```")?,
            // A stray opening or closing fence
            fence_marker_regex: compile(r"```(?:[A-Za-z0-9_+-]*[ \t]*\r?\n)?")?,
            trailing_terminator_regex: compile(r"[\s;]*;\s*$")?,
            whitespace_regex: compile(r"\s+")?,
            leading_keyword_regex: compile(r"^([A-Za-z]+)")?,
        })
    }

    /// Reduce model output to one line of SQL
    #[must_use]
    pub fn sanitize(&self, raw: &str) -> String {
        let unfenced = match self.fenced_block_regex.captures(raw).and_then(|caps| caps.get(1)) {
            Some(inner) => inner.as_str().to_string(),
            None => self.fence_marker_regex.replace_all(raw, " ").into_owned(),
        };

        let collapsed = self.whitespace_regex.replace_all(unfenced.trim(), " ");
        self.trailing_terminator_regex
            .replace(&collapsed, "")
            .trim()
            .to_string()
    }

    /// Accept only a single read-only statement.
    ///
    /// The statement must start with `SELECT` or `WITH` and must not contain
    /// a statement terminator.
    pub fn validate_read_only(&self, sql: &str) -> Result<()> {
        if sql.is_empty() {
            return Err(ExplorerError::RejectedStatement("el modelo no devolvió ninguna consulta".into()));
        }

        let leading = self
            .leading_keyword_regex
            .captures(sql)
            .and_then(|caps| caps.get(1))
            .map(|keyword| keyword.as_str().to_ascii_uppercase());
        let allowed = leading
            .as_deref()
            .is_some_and(|keyword| ALLOWED_LEADING_KEYWORDS.contains(&keyword));
        if !allowed {
            return Err(ExplorerError::RejectedStatement(format!(
                "solo se permiten consultas SELECT o WITH: {sql}"
            )));
        }

        if sql.contains(';') {
            return Err(ExplorerError::RejectedStatement(format!(
                "solo se permite una sentencia: {sql}"
            )));
        }

        Ok(())
    }

    /// Sanitize and validate in one step
    pub fn clean(&self, raw: &str) -> Result<String> {
        let sql = self.sanitize(raw);
        self.validate_read_only(&sql)?;
        Ok(sql)
    }
}

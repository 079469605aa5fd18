//! Natural-language questions answered through generated SQL.
//!
//! A question moves through fixed stages:
//!
//! ```text
//! AwaitingQuestion -> SchemaLoaded -> SqlGenerated -> SqlSanitized
//!     -> SqlExecuted -> AnswerGenerated -> Done
//! ```
//!
//! Any stage may end the run in `Failed`. Nothing is retried: each model call
//! happens at most once and the explanation call only starts after the
//! generated statement has finished executing.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::db::{with_store, AdmissionsStore};
use crate::error::{ExplorerError, Result};
use crate::introspect::introspect;
use crate::llm::TextGenerator;
use crate::logging::OperationTimer;
use crate::metrics::MetricsCollector;
use crate::models::{ChatExchange, SchemaMap, Table};
use crate::sanitize::SqlSanitizer;
use crate::validation::InputValidator;

/// Where a pipeline run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Nothing has run yet
    AwaitingQuestion,
    /// The catalog has been read
    SchemaLoaded,
    /// The model returned a query
    SqlGenerated,
    /// The query passed cleanup and the read-only check
    SqlSanitized,
    /// The query ran against the store
    SqlExecuted,
    /// The model explained the rows
    AnswerGenerated,
    /// Finished successfully
    Done,
    /// Stopped on an error
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AwaitingQuestion => "awaiting_question",
            Self::SchemaLoaded => "schema_loaded",
            Self::SqlGenerated => "sql_generated",
            Self::SqlSanitized => "sql_sanitized",
            Self::SqlExecuted => "sql_executed",
            Self::AnswerGenerated => "answer_generated",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Build the prompt that asks the model for a query
#[must_use]
pub fn generation_prompt(schema: &SchemaMap, question: &str) -> String {
    format!(
        "Eres un experto en SQL. Con el siguiente esquema de base de datos:\n\n\
         {schema}\n\n\
         Escribe una única consulta SQL que responda a la pregunta del usuario.\n\
         Reglas:\n\
         - Devuelve solo la consulta, sin explicaciones ni texto adicional.\n\
         - Una sola sentencia SELECT.\n\
         - No termines la consulta con punto y coma.\n\n\
         Pregunta: {question}",
        schema = schema.to_prompt_text(),
    )
}

/// Build the prompt that asks the model to explain the rows
#[must_use]
pub fn explanation_prompt(question: &str, sql: &str, rows: &str) -> String {
    format!(
        "Un analista preguntó: {question}\n\n\
         Se ejecutó la consulta:\n{sql}\n\n\
         Resultado:\n{rows}\n\n\
         Responde a la pregunta en español de forma concisa. Empieza por los datos \
         y añade como mucho una breve nota interpretativa."
    )
}

/// Render rows as a pipe-separated text table, quoting at most `max_rows` rows
#[must_use]
pub fn render_table_text(table: &Table, max_rows: usize) -> String {
    if table.is_empty() {
        return "(sin resultados)".to_string();
    }

    let mut lines = Vec::with_capacity(table.len().min(max_rows) + 2);
    lines.push(table.columns.join(" | "));
    for row in table.rows.iter().take(max_rows) {
        lines.push(row.iter().map(ToString::to_string).collect::<Vec<_>>().join(" | "));
    }

    let omitted = table.len().saturating_sub(max_rows);
    if omitted > 0 {
        lines.push(format!("... ({omitted} filas más omitidas)"));
    }
    lines.join("\n")
}

/// Question-to-answer pipeline over a store and a generative model
pub struct ChatPipeline {
    store: Arc<dyn AdmissionsStore>,
    generator: Option<Arc<dyn TextGenerator>>,
    sanitizer: SqlSanitizer,
    schema_owner: String,
    max_prompt_rows: usize,
    metrics: MetricsCollector,
}

impl ChatPipeline {
    /// Create a pipeline; without a generator every question is answered
    /// with [`ExplorerError::ServiceUnconfigured`]
    pub fn new(
        store: Arc<dyn AdmissionsStore>,
        generator: Option<Arc<dyn TextGenerator>>,
        schema_owner: impl Into<String>,
        max_prompt_rows: usize,
    ) -> Result<Self> {
        Ok(Self {
            store,
            generator,
            sanitizer: SqlSanitizer::new()?,
            schema_owner: schema_owner.into(),
            max_prompt_rows,
            metrics: MetricsCollector::default(),
        })
    }

    /// True when a generative model is available
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    /// Answer one question
    pub async fn ask(&self, question: &str) -> Result<ChatExchange> {
        let mut stage = PipelineStage::AwaitingQuestion;
        let result = self.run(question, &mut stage).await;

        match &result {
            Ok(exchange) => {
                info!(sql = %exchange.generated_sql, rows = exchange.result.len(), "Chat question answered");
                self.metrics.record_chat_outcome(&PipelineStage::Done.to_string());
            }
            Err(err) => {
                warn!(failed_after = %stage, error = %err, "Chat pipeline failed");
                self.metrics.record_chat_outcome(&PipelineStage::Failed.to_string());
                self.metrics.record_error(err.kind(), "chat");
            }
        }
        result
    }

    async fn run(&self, question: &str, stage: &mut PipelineStage) -> Result<ChatExchange> {
        // Checked on the trimmed text; the model sees the question as asked
        InputValidator::validate_question(question)?;
        let generator = self.generator.as_ref().ok_or(ExplorerError::ServiceUnconfigured)?;

        let owner = self.schema_owner.clone();
        let schema = with_store(&self.store, move |store| introspect(store, &owner)).await?;
        advance(stage, PipelineStage::SchemaLoaded);

        let raw_sql = self
            .call_model(&**generator, "sql", &generation_prompt(&schema, question))
            .await?;
        advance(stage, PipelineStage::SqlGenerated);

        let sql = self.sanitizer.clean(&raw_sql)?;
        advance(stage, PipelineStage::SqlSanitized);

        let statement = sql.clone();
        let result = with_store(&self.store, move |store| store.query(&statement, &[])).await?;
        advance(stage, PipelineStage::SqlExecuted);

        let rows = render_table_text(&result, self.max_prompt_rows);
        let answer = self
            .call_model(&**generator, "answer", &explanation_prompt(question, &sql, &rows))
            .await?;
        advance(stage, PipelineStage::AnswerGenerated);

        advance(stage, PipelineStage::Done);
        Ok(ChatExchange {
            question: question.to_string(),
            generated_sql: sql,
            result,
            answer,
        })
    }

    async fn call_model(&self, generator: &dyn TextGenerator, purpose: &str, prompt: &str) -> Result<String> {
        let timer = OperationTimer::new(&format!("generate_{purpose}"));
        let result = generator.generate(prompt).await;
        self.metrics
            .record_generation(purpose, timer.elapsed(), result.is_ok());
        timer.finish();
        result
    }
}

fn advance(stage: &mut PipelineStage, next: PipelineStage) {
    tracing::debug!(from = %stage, to = %next, "Chat pipeline stage");
    *stage = next;
}

use std::sync::Arc;

use tracing::{debug, info};

use crate::aggregate::aggregate;
use crate::chat::ChatPipeline;
use crate::config::AppConfig;
use crate::db::{with_store, AdmissionsStore};
use crate::error::{ExplorerError, Result};
use crate::introspect::introspect;
use crate::llm::TextGenerator;
use crate::metrics::MetricsCollector;
use crate::models::{AggregateResult, ChatExchange, FilterOptions, FilterSpec, PageRequest, SchemaMap, Table, TablePage};
use crate::pager::{build_page, strip_row_number};
use crate::query::{base_query, compile, count_query, select_query};
use crate::schema::{admissions_table, categories, communities};

/// Analytics and chat operations over one admissions store
pub struct AnalyticsService {
    store: Arc<dyn AdmissionsStore>,
    chat: ChatPipeline,
    source_view: String,
    schema_owner: String,
    metrics: MetricsCollector,
}

impl AnalyticsService {
    pub fn new(
        store: Arc<dyn AdmissionsStore>,
        generator: Option<Arc<dyn TextGenerator>>,
        config: &AppConfig,
    ) -> Result<Self> {
        let chat = ChatPipeline::new(
            Arc::clone(&store),
            generator,
            config.database.schema_owner.clone(),
            config.llm.max_prompt_rows,
        )?;
        Ok(Self {
            store,
            chat,
            source_view: config.database.source_view.clone(),
            schema_owner: config.database.schema_owner.clone(),
            metrics: MetricsCollector::default(),
        })
    }

    /// True when the chat pipeline has a model to talk to
    pub fn chat_configured(&self) -> bool {
        self.chat.is_configured()
    }

    /// Dashboard metrics over the filtered admissions
    pub async fn summary(&self, filters: FilterSpec) -> Result<AggregateResult> {
        self.metrics.record_request("summary");
        let rows = self.all_rows(filters).await?;
        if rows.is_empty() {
            return Err(ExplorerError::NoMatchingData);
        }

        self.metrics.record_rows_aggregated(rows.len());
        Ok(aggregate(&rows))
    }

    /// One page of raw admissions
    pub async fn table_page(&self, filters: FilterSpec, page: PageRequest) -> Result<TablePage> {
        self.metrics.record_request("table");
        let source = self.source_view.clone();

        let (total, rows) = with_store(&self.store, move |store| {
            let predicate = compile(&filters);
            let total = store.count(&count_query(&source, &predicate), predicate.params())?;
            let sql = build_page(&base_query(&source), &predicate.where_clause(), page, store.dialect());
            let rows = store.query(&sql, predicate.params())?;
            Ok((total, rows))
        })
        .await?;

        let items = strip_row_number(rows).to_records();
        debug!(total, page = page.page(), returned = items.len(), "Fetched table page");
        Ok(TablePage {
            items,
            total,
            pages: page.page_count(total),
            current_page: page.page(),
        })
    }

    /// Every filtered row of the admissions view
    pub async fn all_rows(&self, filters: FilterSpec) -> Result<Table> {
        let source = self.source_view.clone();
        with_store(&self.store, move |store| {
            let predicate = compile(&filters);
            store.query(&select_query(&source, &predicate), predicate.params())
        })
        .await
    }

    /// Values for the filter selectors
    pub async fn filter_options(&self) -> Result<FilterOptions> {
        self.metrics.record_request("filters");
        with_store(&self.store, |store| {
            Ok(FilterOptions {
                communities: first_column(store.query(
                    &format!(
                        "SELECT {name} FROM {table} ORDER BY {name}",
                        name = communities::NAME,
                        table = communities::TABLE
                    ),
                    &[],
                )?),
                sexes: first_column(store.query(
                    &format!(
                        "SELECT DISTINCT {sex} FROM {table} WHERE {sex} IS NOT NULL ORDER BY {sex}",
                        sex = admissions_table::SEX,
                        table = admissions_table::TABLE
                    ),
                    &[],
                )?),
                categories: first_column(store.query(
                    &format!(
                        "SELECT {name} FROM {table} ORDER BY {name}",
                        name = categories::NAME,
                        table = categories::TABLE
                    ),
                    &[],
                )?),
            })
        })
        .await
    }

    /// Catalog visible to the configured schema owner
    pub async fn schema(&self) -> Result<SchemaMap> {
        let owner = self.schema_owner.clone();
        with_store(&self.store, move |store| introspect(store, &owner)).await
    }

    /// Answer a natural-language question
    pub async fn ask(&self, question: &str) -> Result<ChatExchange> {
        self.metrics.record_request("chat");
        let exchange = self.chat.ask(question).await?;
        info!(question = %exchange.question, "Answered chat question");
        Ok(exchange)
    }
}

fn first_column(table: Table) -> Vec<String> {
    table
        .rows
        .into_iter()
        .filter_map(|row| row.into_iter().next().and_then(|cell| cell.as_key()))
        .collect()
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use chrono::Local;
use tracing::{info, warn};

use admissions_explorer::api::{self, AppState};
use admissions_explorer::config::AppConfig;
use admissions_explorer::db::{AdmissionsStore, SqliteStore};
use admissions_explorer::file_writer::{write_table_to_file, write_table_to_timestamped_dir};
use admissions_explorer::llm::{GeminiClient, TextGenerator};
use admissions_explorer::logging::{init_logging, OperationTimer};
use admissions_explorer::metrics::MetricsCollector;
use admissions_explorer::models::{ChatResponse, OutputFormat};
use admissions_explorer::service::AnalyticsService;
use admissions_explorer::validation::RawQueryParams;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Filters shared by the data commands
#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    /// Community of care
    #[arg(long)]
    comunidad: Option<String>,

    /// Patient sex
    #[arg(long)]
    sexo: Option<String>,

    /// Diagnosis category
    #[arg(long)]
    categoria: Option<String>,

    /// Earliest admission date (YYYY-MM-DD)
    #[arg(long)]
    fecha_inicio: Option<String>,

    /// Latest admission date (YYYY-MM-DD)
    #[arg(long)]
    fecha_fin: Option<String>,
}

impl FilterArgs {
    fn into_params(self, page: Option<u32>, per_page: Option<u32>) -> RawQueryParams {
        RawQueryParams {
            comunidad: self.comunidad,
            sexo: self.sexo,
            categoria: self.categoria,
            fecha_inicio: self.fecha_inicio,
            fecha_fin: self.fecha_fin,
            page: page.map(|p| p.to_string()),
            per_page: per_page.map(|p| p.to_string()),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to bind (overrides configuration)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Print dashboard metrics for the filtered admissions
    Summary {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Print one page of raw admissions
    Table {
        #[command(flatten)]
        filters: FilterArgs,

        /// Page number, starting at 1
        #[arg(short, long)]
        page: Option<u32>,

        /// Rows per page
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Ask a question in natural language
    Ask {
        /// The question
        question: String,
    },
    /// Print the tables and columns the chat model sees
    Schema,
    /// Export the filtered admissions to a file
    Export {
        #[command(flatten)]
        filters: FilterArgs,

        /// Output format (csv or json)
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Output file; a timestamped file under ./output is used when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging; the guard flushes the log file on exit
    let _guard = init_logging(&config.logging, Some(config.get_log_level().as_str()))?;
    MetricsCollector::init()?;

    let cli = Cli::parse();

    let store = SqliteStore::from_config(&config.database, &config.get_database_url())
        .context("Failed to open admissions database")?;
    let store: Arc<dyn AdmissionsStore> = Arc::new(store);

    let generator = GeminiClient::from_config(&config.llm)?.map(|client| Arc::new(client) as Arc<dyn TextGenerator>);
    if generator.is_none() {
        warn!("No model API key configured; chat questions will be rejected");
    }

    let service = Arc::new(AnalyticsService::new(store, generator, &config)?);

    match cli.command {
        Commands::Serve { bind } => {
            let bind_address = bind.unwrap_or_else(|| config.server.bind_address.clone());
            let state = AppState {
                service,
                pagination: config.pagination.clone(),
            };
            api::serve(state, &bind_address).await?;
        }
        Commands::Summary { filters } => {
            let filters = filters.into_params(None, None).filters()?;
            let summary = service.summary(filters).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Table {
            filters,
            page,
            per_page,
        } => {
            let params = filters.into_params(page, per_page);
            let table = service
                .table_page(params.filters()?, params.page(&config.pagination)?)
                .await?;
            println!("{}", serde_json::to_string_pretty(&table)?);
        }
        Commands::Ask { question } => {
            let timer = OperationTimer::new("ask");
            let exchange = service.ask(&question).await?;
            timer.finish();
            println!("{}", serde_json::to_string_pretty(&ChatResponse::from(exchange))?);
        }
        Commands::Schema => {
            let schema = service.schema().await?;
            println!("{}", schema.to_prompt_text());
        }
        Commands::Export {
            filters,
            format,
            output,
        } => {
            let format: OutputFormat = format.parse()?;
            let filters = filters.into_params(None, None).filters()?;
            let rows = service.all_rows(filters).await?;

            match output {
                Some(path) => {
                    write_table_to_file(&rows, format, &path)?;
                    info!(rows = rows.len(), path = %path.display(), "Exported admissions");
                }
                None => {
                    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
                    match write_table_to_timestamped_dir(&rows, format, &PathBuf::from("./output"), &timestamp)? {
                        Some(path) => info!(rows = rows.len(), path = %path.display(), "Exported admissions"),
                        None => warn!("No admissions matched the filters; nothing exported"),
                    }
                }
            }
        }
    }

    Ok(())
}

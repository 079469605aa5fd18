use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::schema::admissions;

/// Application configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
    /// Catalog owner whose tables ground the chat model
    pub schema_owner: String,
    /// View the dashboard and table read from
    pub source_view: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Without a key the chat endpoint reports the service as unconfigured
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Result rows quoted to the model when it explains an answer
    pub max_prompt_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_per_page: u32,
    pub max_per_page: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/admissions.db".to_string(),
                max_connections: 10,
                connection_timeout_secs: 30,
                schema_owner: "ADMIN".to_string(),
                source_view: admissions::VIEW.to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            llm: LlmConfig {
                api_key: None,
                model: "gemini-1.5-flash".to_string(),
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                timeout_secs: 60,
                max_prompt_rows: 100,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1:5000".to_string(),
            },
            pagination: PaginationConfig {
                default_per_page: 10,
                max_per_page: 500,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    ///
    /// Defaults, then `config/default`, `config/local` and `admissions` files
    /// (any format the `config` crate reads), then `ADMISSIONS__SECTION__KEY`
    /// environment variables.
    pub fn load() -> Result<Self> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();

        let config = Self::default()
            .apply_defaults(Config::builder())?
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("admissions").required(false))
            // Add environment variables with prefix
            .add_source(Environment::with_prefix("ADMISSIONS").prefix_separator("__").separator("__"))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let mut app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        if app_config.llm.api_key.as_deref().map_or(true, str::is_empty) {
            app_config.llm.api_key = std::env::var("GOOGLE_API_KEY").ok().filter(|key| !key.is_empty());
        }

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    fn apply_defaults(
        self,
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let builder = builder
            .set_default("database.url", self.database.url)?
            .set_default("database.max_connections", self.database.max_connections)?
            .set_default("database.connection_timeout_secs", self.database.connection_timeout_secs)?
            .set_default("database.schema_owner", self.database.schema_owner)?
            .set_default("database.source_view", self.database.source_view)?
            .set_default("logging.level", self.logging.level)?
            .set_default("logging.file_path", self.logging.file_path)?
            .set_default("logging.format", self.logging.format)?
            .set_default("llm.api_key", self.llm.api_key)?
            .set_default("llm.model", self.llm.model)?
            .set_default("llm.base_url", self.llm.base_url)?
            .set_default("llm.timeout_secs", self.llm.timeout_secs)?
            .set_default("llm.max_prompt_rows", self.llm.max_prompt_rows as u64)?
            .set_default("server.bind_address", self.server.bind_address)?
            .set_default("pagination.default_per_page", self.pagination.default_per_page)?
            .set_default("pagination.max_per_page", self.pagination.max_per_page)?;
        Ok(builder)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate database config
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("max_connections must be greater than 0"));
        }
        if self.database.connection_timeout_secs == 0 {
            return Err(anyhow::anyhow!("connection_timeout_secs must be greater than 0"));
        }
        if self.database.source_view.trim().is_empty() {
            return Err(anyhow::anyhow!("source_view cannot be empty"));
        }
        if !self
            .database
            .source_view
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(anyhow::anyhow!(
                "source_view must be a plain identifier: {}",
                self.database.source_view
            ));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        // Validate LLM config
        if self.llm.timeout_secs == 0 {
            return Err(anyhow::anyhow!("llm timeout_secs must be greater than 0"));
        }
        if self.llm.max_prompt_rows == 0 {
            return Err(anyhow::anyhow!("max_prompt_rows must be greater than 0"));
        }

        // Validate pagination config
        if self.pagination.default_per_page == 0 {
            return Err(anyhow::anyhow!("default_per_page must be greater than 0"));
        }
        if self.pagination.max_per_page < self.pagination.default_per_page {
            return Err(anyhow::anyhow!(
                "max_per_page ({}) must not be below default_per_page ({})",
                self.pagination.max_per_page,
                self.pagination.default_per_page
            ));
        }

        Ok(())
    }

    /// Get database URL from environment or config
    pub fn get_database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.database.url.clone())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }

    /// True when a model key is available
    pub fn llm_configured(&self) -> bool {
        self.llm.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }
}

use clap::Parser;
use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Path to the DuckDB database file.
    pub path: String,
    pub pool_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed by the CORS layer. `["*"]` means any origin.
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    /// Rows returned when a request does not ask for a specific cap.
    pub default_max_rows: usize,
    /// Hard upper bound a request may ask for.
    pub max_rows_cap: usize,
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub llm: LlmConfig,
    pub limits: LimitsConfig,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to the DuckDB database file
    #[arg(long)]
    pub database: Option<String>,
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config_builder = Config::builder()
            .set_default("database.path", "data/database.db")?
            .set_default("database.pool_size", 4_i64)?
            .set_default("web.host", "0.0.0.0")?
            .set_default("web.port", 8000_i64)?
            .set_default("web.allowed_origins", vec!["*".to_string()])?
            .set_default(
                "llm.api_url",
                "https://api.groq.com/openai/v1/chat/completions",
            )?
            .set_default("llm.model", "llama-3.1-8b-instant")?
            .set_default("llm.temperature", 0.0_f64)?
            .set_default("llm.max_tokens", 1024_i64)?
            .set_default("limits.default_max_rows", 1000_i64)?
            .set_default("limits.max_rows_cap", 10000_i64)?
            .set_default("limits.rate_limit_requests", 5_i64)?
            .set_default("limits.rate_limit_window_secs", 60_i64)?;

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            // Check for config in default locations
            let default_locations = vec![
                "config.toml",
                "config/config.toml",
                "/etc/affogato/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        config.apply_env_overrides()?;

        // Override with command line args if provided
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }
        if let Some(database) = &args.database {
            config.database.path = database.clone();
        }

        Ok(config)
    }

    /// Environment variables take precedence over file values. Log verbosity
    /// is handled separately through `RUST_LOG`.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(key) = env::var("GROQ_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Ok(model) = env::var("GROQ_MODEL") {
            self.llm.model = model;
        }
        if let Ok(url) = env::var("GROQ_API_URL") {
            self.llm.api_url = url;
        }
        if let Ok(path) = env::var("DATABASE_PATH") {
            self.database.path = path;
        }
        if let Ok(rows) = env::var("MAX_QUERY_ROWS") {
            self.limits.default_max_rows = parse_env("MAX_QUERY_ROWS", &rows)?;
        }
        if let Ok(requests) = env::var("RATE_LIMIT_REQUESTS") {
            self.limits.rate_limit_requests = parse_env("RATE_LIMIT_REQUESTS", &requests)?;
        }
        if let Ok(window) = env::var("RATE_LIMIT_WINDOW") {
            self.limits.rate_limit_window_secs = parse_env("RATE_LIMIT_WINDOW", &window)?;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Message(format!("invalid value for {}: {}", name, value)))
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: "data/database.db".to_string(),
                pool_size: 4,
            },
            web: WebConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                allowed_origins: vec!["*".to_string()],
            },
            llm: LlmConfig {
                api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
                api_key: None,
                model: "llama-3.1-8b-instant".to_string(),
                temperature: 0.0,
                max_tokens: 1024,
            },
            limits: LimitsConfig {
                default_max_rows: 1000,
                max_rows_cap: 10000,
                rate_limit_requests: 5,
                rate_limit_window_secs: 60,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = AppConfig::default();
        assert_eq!(config.limits.default_max_rows, 1000);
        assert_eq!(config.limits.max_rows_cap, 10000);
        assert_eq!(config.limits.rate_limit_requests, 5);
        assert_eq!(config.limits.rate_limit_window_secs, 60);
        assert_eq!(config.web.port, 8000);
        assert_eq!(config.web.allowed_origins, vec!["*".to_string()]);
    }
}

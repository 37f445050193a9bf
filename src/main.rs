use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use affogato::config::{AppConfig, CliArgs};
use affogato::db::DatabaseService;
use affogato::llm::LlmManager;
use affogato::util::logging::init_tracing;
use affogato::web;
use affogato::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_tracing();

    let args = CliArgs::parse();

    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Ensure the directory holding the database file exists
    if let Some(parent) = Path::new(&config.database.path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            info!("Creating data directory: {}", parent.display());
            std::fs::create_dir_all(parent)?;
        }
    }

    info!(path = %config.database.path, "Initializing DuckDB connection pool");
    let db = DatabaseService::new(&config.database.path, config.database.pool_size);
    if let Err(e) = db.ping().await {
        error!("Database file inaccessible at {}: {}", config.database.path, e);
        return Err(e.into());
    }

    info!(model = %config.llm.model, "Initializing LLM client");
    let llm_manager = match LlmManager::new(&config.llm) {
        Ok(manager) => manager,
        Err(e) => {
            error!("Failed to initialize LLM client: {}", e);
            return Err(e.into());
        }
    };

    let state = Arc::new(AppState::new(config.clone(), db, llm_manager));

    info!(
        "Starting Affogato server on {}:{}",
        config.web.host, config.web.port
    );
    match web::run_server(state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()).into());
        }
    }

    Ok(())
}

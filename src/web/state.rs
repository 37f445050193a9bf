use crate::config::AppConfig;
use crate::db::DatabaseService;
use crate::llm::translate::Translator;
use crate::llm::LlmManager;
use crate::ratelimit::FixedWindowLimiter;
use std::time::Duration;

/// Shared application state for the web server.
pub struct AppState {
    pub config: AppConfig,
    pub db: DatabaseService,
    pub translator: Translator,
    pub limiter: FixedWindowLimiter,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseService, llm_manager: LlmManager) -> Self {
        let limiter = FixedWindowLimiter::new(
            config.limits.rate_limit_requests,
            Duration::from_secs(config.limits.rate_limit_window_secs),
        );

        Self {
            config,
            db,
            translator: Translator::new(llm_manager),
            limiter,
        }
    }
}

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::db::guard::{self, SqlCheck};
use crate::db::service::Row;
use crate::error::{ApiError, Result};
use crate::ratelimit::Decision;
use crate::web::state::AppState;

const MAX_QUESTION_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default = "default_use_nlq")]
    pub use_nlq: bool,
    pub max_rows: Option<usize>,
}

fn default_use_nlq() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub results: Vec<Row>,
    pub execution_time_ms: f64,
    pub row_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Row>>,
    pub execution_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
}

pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Welcome to Affogato Platform",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "healthy",
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "services": "initialized" })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "services": "database unavailable" })),
            )
                .into_response()
        }
    }
}

/// `POST /api/query`: validate, rate-limit, translate or take the text as
/// literal SQL, screen it, execute, and shape the response.
pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let started = Instant::now();
    info!(
        use_nlq = payload.use_nlq,
        question_length = payload.question.len(),
        "received query request"
    );

    let question = validate_question(&payload.question)?;
    let max_rows = effective_max_rows(&state, payload.max_rows)?;
    enforce_rate_limit(&state, &headers)?;

    let sql = if payload.use_nlq {
        let schema = state.db.describe_schema().await?;
        state.translator.translate(&question, &schema).await?
    } else {
        question
    };

    if let SqlCheck::Rejected(reason) = guard::check_read_only(&sql) {
        warn!(reason = %reason, "rejected query");
        return Err(ApiError::UnsafeQuery(reason));
    }

    let (results, _db_elapsed_ms) = state.db.execute(&sql, max_rows).await?;
    let execution_time_ms = elapsed_ms(started);

    info!(
        row_count = results.len(),
        execution_time_ms, "query executed successfully"
    );

    Ok(Json(QueryResponse {
        query: sql,
        row_count: results.len(),
        results,
        execution_time_ms,
    }))
}

/// `POST /api/chat`: a thin conversational wrapper over the same pipeline.
/// Messages that read like data questions are translated and executed;
/// anything else gets a canned guidance reply.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let started = Instant::now();
    info!(
        message_length = payload.message.len(),
        conversation_id = payload.conversation_id.as_deref().unwrap_or("-"),
        "received chat request"
    );

    let message = validate_question(&payload.message)
        .map_err(|_| ApiError::Validation("message cannot be empty".to_string()))?;
    enforce_rate_limit(&state, &headers)?;

    if !is_query_intent(&message) {
        return Ok(Json(ChatResponse {
            response: format!(
                "I understand you said: '{}'. I'm here to help with database queries. \
                 Try asking something like 'Show me all users' or 'How many products do we have?'",
                message
            ),
            query: None,
            results: None,
            execution_time_ms: elapsed_ms(started),
            row_count: None,
        }));
    }

    let schema = state.db.describe_schema().await?;
    let sql = state.translator.translate(&message, &schema).await?;

    if let SqlCheck::Rejected(reason) = guard::check_read_only(&sql) {
        warn!(reason = %reason, "rejected chat query");
        return Err(ApiError::UnsafeQuery(reason));
    }

    let max_rows = state.config.limits.default_max_rows;
    let (results, _db_elapsed_ms) = state.db.execute(&sql, max_rows).await?;

    let response = if results.is_empty() {
        "I didn't find any results for that query.".to_string()
    } else {
        format!("I found {} result(s). Here's what I got:", results.len())
    };

    Ok(Json(ChatResponse {
        response,
        query: Some(sql),
        row_count: Some(results.len()),
        results: Some(results),
        execution_time_ms: elapsed_ms(started),
    }))
}

fn validate_question(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation("question cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_QUESTION_CHARS {
        return Err(ApiError::Validation(format!(
            "question too long (max {} characters)",
            MAX_QUESTION_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

fn effective_max_rows(state: &AppState, requested: Option<usize>) -> Result<usize> {
    let cap = state.config.limits.max_rows_cap;
    match requested {
        None => Ok(state.config.limits.default_max_rows),
        Some(n) if n >= 1 && n <= cap => Ok(n),
        Some(n) => Err(ApiError::Validation(format!(
            "max_rows must be between 1 and {}, got {}",
            cap, n
        ))),
    }
}

fn enforce_rate_limit(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let client = client_key(headers);
    match state.limiter.check(&client) {
        Decision::Allowed => Ok(()),
        Decision::Denied => {
            warn!(client = %client, "rate limit exceeded");
            Err(ApiError::RateLimited)
        }
    }
}

/// Client identity for rate limiting: an explicit `x-client-id` wins (this
/// is also how tests isolate their counters), then the proxy-provided
/// address, then a shared fallback key.
fn client_key(headers: &HeaderMap) -> String {
    if let Some(id) = headers.get("x-client-id").and_then(|v| v.to_str().ok()) {
        return id.to_string();
    }
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    "unknown".to_string()
}

fn is_query_intent(message: &str) -> bool {
    const QUERY_KEYWORDS: [&str; 12] = [
        "show", "list", "get", "find", "select", "query", "how many", "what", "who", "where",
        "when", "count",
    ];
    let lowered = message.to_lowercase();
    QUERY_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

fn elapsed_ms(started: Instant) -> f64 {
    let ms = started.elapsed().as_secs_f64() * 1000.0;
    (ms * 100.0).round() / 100.0
}

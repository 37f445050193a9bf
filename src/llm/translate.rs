use crate::db::SchemaDescription;
use crate::error::ApiError;
use crate::llm::LlmManager;
use regex::Regex;
use tracing::debug;

/// What the cleaned model output turned out to be. Keeping this a tagged
/// variant makes the rejection reason part of the API instead of a log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlCandidate {
    Sql(String),
    Rejected(String),
}

/// Text-to-SQL translation: prompt the model with the schema, clean the
/// completion, and accept it only if it looks like a read query.
pub struct Translator {
    manager: LlmManager,
}

impl Translator {
    pub fn new(manager: LlmManager) -> Self {
        Self { manager }
    }

    pub async fn translate(
        &self,
        question: &str,
        schema: &SchemaDescription,
    ) -> Result<String, ApiError> {
        let raw = self
            .manager
            .generate_sql(question, &schema.to_prompt())
            .await
            .map_err(|e| ApiError::Translation(e.to_string()))?;

        let cleaned = clean_output(&raw);
        debug!(sql = %cleaned, "cleaned model output");

        match classify(&cleaned) {
            SqlCandidate::Sql(sql) => Ok(sql),
            SqlCandidate::Rejected(reason) => Err(ApiError::Translation(reason)),
        }
    }
}

/// Strips the formatting models wrap around SQL: reasoning tags, code
/// fences, backticks, and a trailing semicolon.
pub fn clean_output(raw: &str) -> String {
    let mut result = raw.trim().to_string();

    // Drop everything up to a closing reasoning tag if one is present
    if let Some(pos) = result.find("</think>") {
        result = result[pos + "</think>".len()..].trim().to_string();
    }

    let sql_fence = Regex::new(r"(?is)```sql\s*(.*?)\s*```").unwrap();
    if let Some(captures) = sql_fence.captures(&result) {
        result = captures[1].trim().to_string();
    } else {
        let any_fence = Regex::new(r"(?s)```\s*(.*?)\s*```").unwrap();
        if let Some(captures) = any_fence.captures(&result) {
            result = captures[1].trim().to_string();
        }
    }

    result = result.replace('`', "");

    result.trim().trim_end_matches(';').trim().to_string()
}

/// The "looks like SQL" sanity check: non-empty and starting with SELECT
/// or WITH. Everything else is prose or a statement we will not run.
pub fn classify(cleaned: &str) -> SqlCandidate {
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return SqlCandidate::Rejected("model returned no SQL".to_string());
    }

    let lowered = trimmed.to_lowercase();
    if lowered.starts_with("select") || lowered.starts_with("with") {
        SqlCandidate::Sql(trimmed.to_string())
    } else {
        SqlCandidate::Rejected(format!(
            "model output does not look like a SELECT statement: {}",
            truncate(trimmed, 80)
        ))
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_sql_code_fence() {
        let raw = "Here you go:\n```sql\nSELECT * FROM users;\n```";
        assert_eq!(clean_output(raw), "SELECT * FROM users");
    }

    #[test]
    fn strips_generic_code_fence() {
        let raw = "```\nSELECT count(*) FROM orders\n```";
        assert_eq!(clean_output(raw), "SELECT count(*) FROM orders");
    }

    #[test]
    fn strips_reasoning_tags() {
        let raw = "<think>counting users means COUNT(*)</think>\nSELECT COUNT(*) FROM users;";
        assert_eq!(clean_output(raw), "SELECT COUNT(*) FROM users");
    }

    #[test]
    fn strips_backticks_and_trailing_semicolon() {
        let raw = "SELECT * FROM `users`;";
        assert_eq!(clean_output(raw), "SELECT * FROM users");
    }

    #[test]
    fn bare_sql_passes_through() {
        assert_eq!(clean_output("SELECT 1"), "SELECT 1");
    }

    #[test]
    fn classify_accepts_select_and_with() {
        assert_eq!(
            classify("SELECT 1"),
            SqlCandidate::Sql("SELECT 1".to_string())
        );
        assert_eq!(
            classify("WITH t AS (SELECT 1) SELECT * FROM t"),
            SqlCandidate::Sql("WITH t AS (SELECT 1) SELECT * FROM t".to_string())
        );
    }

    #[test]
    fn classify_rejects_prose_and_empty() {
        assert!(matches!(classify(""), SqlCandidate::Rejected(_)));
        assert!(matches!(
            classify("I cannot answer that question."),
            SqlCandidate::Rejected(_)
        ));
    }
}

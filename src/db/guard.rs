use regex::Regex;

/// Outcome of the keyword-based safety check.
///
/// This is a substring/keyword screen, not a SQL parser. It cannot catch
/// every mutation pattern and is not meant to; anything that needs real
/// guarantees belongs in database permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlCheck {
    Sql,
    Rejected(String),
}

impl SqlCheck {
    pub fn is_rejected(&self) -> bool {
        matches!(self, SqlCheck::Rejected(_))
    }
}

const MUTATION_KEYWORDS: &str =
    r"\b(drop|delete|update|insert|alter|create|truncate|exec|execute)\b";

/// Screens a statement before execution: read-only statements only, one
/// statement at a time, no comments.
pub fn check_read_only(sql: &str) -> SqlCheck {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return SqlCheck::Rejected("statement is empty".to_string());
    }

    let lowered = trimmed.to_lowercase();

    if !(lowered.starts_with("select") || lowered.starts_with("with")) {
        return SqlCheck::Rejected(
            "only SELECT statements are allowed".to_string(),
        );
    }

    let keyword_re = Regex::new(MUTATION_KEYWORDS).unwrap();
    if let Some(found) = keyword_re.find(&lowered) {
        return SqlCheck::Rejected(format!(
            "statement contains forbidden keyword '{}'",
            found.as_str().to_uppercase()
        ));
    }

    if lowered.contains("--") || lowered.contains("/*") {
        return SqlCheck::Rejected("SQL comments are not allowed".to_string());
    }

    // Reject anything after a statement terminator so a second statement
    // can never ride along with the first.
    if let Some(pos) = trimmed.find(';') {
        if !trimmed[pos + 1..].trim().is_empty() {
            return SqlCheck::Rejected(
                "multiple statements are not allowed".to_string(),
            );
        }
    }

    SqlCheck::Sql
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_select() {
        assert_eq!(check_read_only("SELECT * FROM users"), SqlCheck::Sql);
        assert_eq!(check_read_only("select count(*) from orders;"), SqlCheck::Sql);
    }

    #[test]
    fn accepts_with_cte() {
        let sql = "WITH recent AS (SELECT * FROM orders) SELECT * FROM recent";
        assert_eq!(check_read_only(sql), SqlCheck::Sql);
    }

    #[test]
    fn rejects_mutation_keywords() {
        for sql in [
            "DROP TABLE users;",
            "DELETE FROM users",
            "INSERT INTO users VALUES (1)",
            "UPDATE users SET name = 'x'",
            "ALTER TABLE users ADD COLUMN x INT",
            "SELECT * FROM users; DROP TABLE users;",
        ] {
            assert!(check_read_only(sql).is_rejected(), "should reject: {}", sql);
        }
    }

    #[test]
    fn rejects_keyword_in_subexpression() {
        // Substring screen by design, so even a harmless-looking SELECT
        // mentioning a keyword is refused.
        assert!(check_read_only("SELECT * FROM audit WHERE action = delete").is_rejected());
    }

    #[test]
    fn rejects_comments_and_multistatement() {
        assert!(check_read_only("SELECT 1 -- hidden").is_rejected());
        assert!(check_read_only("SELECT 1 /* hidden */").is_rejected());
        assert!(check_read_only("SELECT 1; SELECT 2").is_rejected());
    }

    #[test]
    fn rejects_empty_and_non_select() {
        assert!(check_read_only("   ").is_rejected());
        assert!(check_read_only("SHOW TABLES").is_rejected());
        assert!(check_read_only("PRAGMA table_info(users)").is_rejected());
    }

    #[test]
    fn trailing_semicolon_is_fine() {
        assert_eq!(check_read_only("SELECT 1;"), SqlCheck::Sql);
        assert_eq!(check_read_only("SELECT 1;   "), SqlCheck::Sql);
    }
}

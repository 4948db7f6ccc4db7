// Helper functions for safe logging and store error classification

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```ignore
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            let first: String = local.chars().take(1).collect();
            format!("{}***@{}", first, domain)
        }
        _ => "***@***.***".to_string(),
    }
}

/// Masks tokens for safe logging
/// Shows only first and last 4 characters
pub fn safe_token_log(token: &str) -> String {
    if token.len() > 8 && token.is_ascii() {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    } else {
        "***".to_string()
    }
}

/// Lookup key for emails: trimmed and lowercased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// True when the store rejected a write because of a UNIQUE constraint
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

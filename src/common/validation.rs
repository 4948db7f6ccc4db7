// Common validation types and traits

use regex::Regex;
use std::sync::OnceLock;

use super::error::ApiError;

#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    /// `Ok(())` when nothing was flagged, otherwise a `ValidationFailed` error
    /// listing every field.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(self.into())
        }
    }

    // Shared field rules

    pub fn check_name(&mut self, field: &str, name: &str, max: usize) {
        let len = name.trim().chars().count();
        if len < 2 {
            self.add_error(field, "Name must be at least 2 characters long");
        } else if len > max {
            self.add_error(field, &format!("Name cannot exceed {} characters", max));
        }
    }

    pub fn check_email(&mut self, field: &str, email: &str) {
        if email.trim().is_empty() {
            self.add_error(field, "Email is required");
        } else if !is_valid_email(email.trim()) {
            self.add_error(field, "Please enter a valid email address");
        }
    }

    /// At least 8 characters with an uppercase letter, a digit and one of `!@#$%^&*`.
    pub fn check_strong_password(&mut self, field: &str, password: &str) {
        if !is_strong_password(password) {
            self.add_error(
                field,
                "Password must be at least 8 characters long, include at least one uppercase letter, one number, and one special character (!@#$%^&*)",
            );
        }
    }
}

pub trait Validator<T> {
    fn validate(&self, data: &T) -> ValidationResult;
}

pub fn is_valid_email(email: &str) -> bool {
    static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL_RE
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(email))
}

pub fn is_strong_password(password: &str) -> bool {
    const SPECIALS: &str = "!@#$%^&*";
    let allowed = password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || SPECIALS.contains(c));

    allowed
        && (8..=128).contains(&password.len())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| SPECIALS.contains(c))
}

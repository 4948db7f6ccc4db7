// src/auth/validators.rs

use super::models::{LoginRequest, RegisterRequest};
use crate::common::{ValidationResult, Validator};

pub struct RegisterValidator;

impl Validator<RegisterRequest> for RegisterValidator {
    fn validate(&self, data: &RegisterRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.check_name("name", &data.name, 50);
        result.check_email("email", &data.email);
        result.check_strong_password("password", &data.password);
        result
    }
}

pub struct LoginValidator;

impl Validator<LoginRequest> for LoginValidator {
    fn validate(&self, data: &LoginRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.check_email("email", &data.email);

        if data.password.is_empty() {
            result.add_error("password", "Password is required");
        } else if data.password.len() > 128 {
            result.add_error("password", "Password cannot exceed 128 characters");
        }

        result
    }
}

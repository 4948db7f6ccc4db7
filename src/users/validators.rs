// src/users/validators.rs

use super::models::{
    ChangePasswordRequest, CreateUserRequest, UpdateStatusRequest, UpdateUserRequest,
};
use crate::common::{ValidationResult, Validator};

const MAX_NAME_LEN: usize = 100;
const SUPPORTED_PROVIDERS: &[&str] = &["google"];

fn check_avatar_url(result: &mut ValidationResult, avatar_url: Option<&str>) {
    if let Some(url) = avatar_url.map(str::trim).filter(|u| !u.is_empty()) {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            result.add_error("avatar_url", "Avatar URL must be a valid URL");
        }
    }
}

pub struct CreateUserValidator;

impl Validator<CreateUserRequest> for CreateUserValidator {
    fn validate(&self, data: &CreateUserRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.check_name("name", &data.name, MAX_NAME_LEN);
        result.check_email("email", &data.email);

        // Accounts created for an external identity never get a password.
        match (&data.oauth_provider, &data.password) {
            (Some(_), _) => {}
            (None, Some(password)) => result.check_strong_password("password", password),
            (None, None) => result.add_error("password", "Password is required"),
        }

        if let Some(provider) = &data.oauth_provider {
            if !SUPPORTED_PROVIDERS.contains(&provider.as_str()) {
                result.add_error("oauth_provider", "Unsupported OAuth provider");
            }
        }
        if data.oauth_id.is_some() != data.oauth_provider.is_some() {
            result.add_error(
                "oauth_id",
                "OAuth provider and OAuth id must be given together",
            );
        }

        check_avatar_url(&mut result, data.avatar_url.as_deref());
        result
    }
}

pub struct UpdateUserValidator;

impl Validator<UpdateUserRequest> for UpdateUserValidator {
    fn validate(&self, data: &UpdateUserRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Some(name) = &data.name {
            result.check_name("name", name, MAX_NAME_LEN);
        }
        if let Some(email) = &data.email {
            result.check_email("email", email);
        }
        check_avatar_url(&mut result, data.avatar_url.as_deref());

        if data.name.is_none()
            && data.email.is_none()
            && data.role.is_none()
            && data.avatar_url.is_none()
        {
            result.add_error("body", "At least one field must be provided");
        }

        result
    }
}

pub struct ChangePasswordValidator;

impl Validator<ChangePasswordRequest> for ChangePasswordValidator {
    fn validate(&self, data: &ChangePasswordRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.current_password.is_empty() {
            result.add_error("currentPassword", "Current password is required");
        }
        result.check_strong_password("newPassword", &data.new_password);
        if data.confirm_password != data.new_password {
            result.add_error(
                "confirmPassword",
                "Password confirmation does not match new password",
            );
        }

        result
    }
}

pub struct UpdateStatusValidator;

impl Validator<UpdateStatusRequest> for UpdateStatusValidator {
    fn validate(&self, data: &UpdateStatusRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        if data.is_active.is_none() {
            result.add_error("is_active", "is_active must be a boolean");
        }
        result
    }
}

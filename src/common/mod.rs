// Common module - shared types and utilities across all modules

pub mod config;
pub mod cookies;
pub mod error;
pub mod extract;
pub mod helpers;
pub mod migrations;
pub mod response;
pub mod state;
pub mod validation;

// Re-export commonly used types for convenience
pub use error::ApiError;
pub use extract::{ApiJson, ApiPath};
pub use helpers::safe_email_log;
pub use response::ApiResponse;
pub use state::AppState;
pub use validation::{ValidationResult, Validator};

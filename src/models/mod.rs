//! Data models for the CRM.
//!
//! Field names follow the remote row schema (snake_case) so rows round-trip without mapping.

mod activity;
mod lead;
mod settings;
mod task;
mod user;

pub use activity::*;
pub use lead::*;
pub use settings::*;
pub use task::*;
pub use user::*;

use crate::errors::AppError;

/// Reject blank required fields with the form-style message the UI shows.
pub(crate) fn require(fields: &[&str], message: &str) -> Result<(), AppError> {
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(AppError::Validation(message.to_string()));
    }
    Ok(())
}

//! User (profile) model.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::require;
use crate::errors::AppError;

/// Minimum accepted password length for newly provisioned users.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Access role of a user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum UserRole {
    Admin,
    /// Older rows store this role as `"User"`.
    #[default]
    #[serde(alias = "User")]
    Member,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "Admin",
            UserRole::Member => "Member",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Admin" => Some(UserRole::Admin),
            "Member" | "User" => Some(UserRole::Member),
            _ => None,
        }
    }
}

/// A person with store-wide visibility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Request to provision a new authenticated user.
///
/// Carries the login credential, which never becomes part of a [`User`]:
/// [`NewUserRequest::into_user`] consumes the request and drops it.
#[derive(Clone, Deserialize)]
pub struct NewUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub avatar: Option<String>,
    pub password: String,
}

impl NewUserRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require(&[&self.name, &self.email], "Name and Email are required.")?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password is required and must be at least {} characters.",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }

    /// Build the stored profile under its canonical id.
    pub fn into_user(self, id: String) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            role: self.role,
            avatar: self.avatar.filter(|a| !a.is_empty()),
        }
    }
}

impl fmt::Debug for NewUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUserRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("role", &self.role)
            .field("avatar", &self.avatar)
            .field("password", &"<redacted>")
            .finish()
    }
}

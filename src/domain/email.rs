//! Validated email address.
//!
//! [`EmailAddress`] is a newtype around [`String`] that can only be built
//! through [`EmailAddress::parse`], so every address reaching the services
//! or the store has already been checked.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::ValidateEmail;

use crate::error::TrackerError;

/// Column width of `users.email` and `activities.user_email`.
pub const MAX_EMAIL_LEN: usize = 255;

/// A syntactically valid email address.
///
/// Surrounding whitespace is trimmed and the domain part is lower-cased;
/// the local part is kept as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validates and normalizes `raw`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Validation`] if the address is empty, longer
    /// than [`MAX_EMAIL_LEN`], or not a valid email.
    pub fn parse(raw: &str) -> Result<Self, TrackerError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TrackerError::Validation("email must not be empty".to_string()));
        }
        if trimmed.len() > MAX_EMAIL_LEN {
            return Err(TrackerError::Validation(format!(
                "email must be at most {MAX_EMAIL_LEN} characters"
            )));
        }
        if !trimmed.validate_email() {
            return Err(TrackerError::Validation(format!(
                "'{trimmed}' is not a valid email address"
            )));
        }
        let normalized = match trimmed.rsplit_once('@') {
            Some((local, domain)) => format!("{local}@{}", domain.to_ascii_lowercase()),
            None => trimmed.to_string(),
        };
        Ok(Self(normalized))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = TrackerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EmailAddress> for String {
    fn from(email: EmailAddress) -> Self {
        email.0
    }
}

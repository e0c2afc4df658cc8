use crate::core::domain::error::ValidationError;
use std::time::{Duration, SystemTime};

/// A bearer credential issued by the login endpoint.
#[derive(Clone)]
pub struct BearerToken {
    value: String,
    created_at: SystemTime,
}

impl BearerToken {
    /// Creates a new token without validation.
    pub(crate) fn new_unchecked(value: String) -> Self {
        Self {
            value,
            created_at: SystemTime::now(),
        }
    }

    /// Returns the token value as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Returns the creation time.
    #[must_use]
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Checks if the token is expired based on a given lifetime.
    #[must_use]
    pub fn is_expired(&self, lifetime: Duration) -> bool {
        self.created_at
            .elapsed()
            .map(|age| age > lifetime)
            .unwrap_or(true)
    }

    /// Formats the token as an `Authorization` header value.
    #[must_use]
    pub fn as_header_value(&self) -> String {
        format!("Bearer {}", self.value)
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("value", &"****")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Validates a token string: non-empty, no whitespace or control characters.
pub(crate) fn validate_token(token: &str) -> Result<(), ValidationError> {
    if token.is_empty() {
        return Err(ValidationError::Field {
            field: "token".to_string(),
            message: "Token cannot be empty".to_string(),
        });
    }
    if token.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::Format(
            "Token cannot contain whitespace or control characters".to_string(),
        ));
    }
    Ok(())
}

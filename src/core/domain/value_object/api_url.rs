use crate::core::domain::{
    error::ValidationError,
    value_object::{host::VirtHost, port::VirtPort},
};

const MAX_URL_LENGTH: usize = 2083;

/// A validated base URL of the dashboard backend (`scheme://host:port/`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiUrl(String);

impl ApiUrl {
    /// Creates a new URL without validation.
    pub(crate) fn new_unchecked(url: String) -> Self {
        Self(url)
    }

    /// Composes the base URL from its parts.
    pub(crate) fn from_parts(host: &VirtHost, port: &VirtPort, secure: bool) -> Self {
        let scheme = if secure { "https" } else { "http" };
        let host = if host.as_str().contains(':') {
            format!("[{}]", host.as_str())
        } else {
            host.as_str().to_string()
        };
        Self(format!("{}://{}:{}/", scheme, host, port.get()))
    }

    /// Returns the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Appends path segments to the base URL.
    ///
    /// Each segment is percent-encoded on its own, so a VM name holding `/`,
    /// `?` or `#` stays one segment of the intended endpoint.
    ///
    /// # Errors
    /// Returns `ValidationError::Format` for an empty, `.` or `..` segment.
    pub fn join_segments(&self, segments: &[&str]) -> Result<String, ValidationError> {
        if let Some(segment) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(ValidationError::Format(format!(
                "Invalid path segment: {:?}",
                segment
            )));
        }
        let mut url = url::Url::parse(&self.0)
            .map_err(|e| ValidationError::Format(format!("Invalid URL format: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| {
                ValidationError::ConstraintViolation("URL cannot carry a path".to_string())
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url.to_string())
    }
}

/// Validates a base URL: http(s) scheme, a host, bounded length.
pub(crate) fn validate_url(url: &str) -> Result<(), ValidationError> {
    if url.is_empty() {
        return Err(ValidationError::Field {
            field: "url".to_string(),
            message: "URL cannot be empty".to_string(),
        });
    }
    if url.len() > MAX_URL_LENGTH {
        return Err(ValidationError::Format(format!(
            "URL exceeds maximum length of {} characters",
            MAX_URL_LENGTH
        )));
    }
    let parsed = url::Url::parse(url)
        .map_err(|e| ValidationError::Format(format!("Invalid URL format: {}", e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::ConstraintViolation(
            "Invalid scheme. Must be one of: http, https".to_string(),
        ));
    }
    if parsed.host_str().is_none() {
        return Err(ValidationError::ConstraintViolation(
            "URL must contain a host".to_string(),
        ));
    }
    Ok(())
}

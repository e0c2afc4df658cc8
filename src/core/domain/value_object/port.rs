//! Port numbers of the dashboard API and of negotiated display endpoints.

use crate::core::domain::error::ValidationError;
use std::fmt;

/// Port the dashboard backend listens on unless configured otherwise.
pub const DEFAULT_API_PORT: u16 = 8000;

/// The service a port addresses; names the offending field in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PortRole {
    /// The REST API the client talks to.
    Api,
    /// A VM's remote display, as handed out by console negotiation.
    Display,
}

impl PortRole {
    fn field(self) -> &'static str {
        match self {
            PortRole::Api => "port",
            PortRole::Display => "console_port",
        }
    }
}

/// Port of the dashboard REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtPort(u16);

impl VirtPort {
    pub(crate) fn new_unchecked(port: u16) -> Self {
        Self(port)
    }

    pub fn get(&self) -> u16 {
        self.0
    }
}

impl Default for VirtPort {
    fn default() -> Self {
        Self(DEFAULT_API_PORT)
    }
}

impl fmt::Display for VirtPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Port 0 only means "any port" to a listener; nothing can be reached on it.
///
/// The display role matters when the backend has no graphics device for a
/// VM and reports port 0 instead of an error.
pub(crate) fn validate_port(port: u16, role: PortRole) -> Result<(), ValidationError> {
    if port == 0 {
        return Err(ValidationError::Field {
            field: role.field().to_string(),
            message: match role {
                PortRole::Api => "The dashboard API cannot listen on port 0".to_string(),
                PortRole::Display => "The VM exposes no display (port 0)".to_string(),
            },
        });
    }
    Ok(())
}

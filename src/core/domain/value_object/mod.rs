mod api_url;
mod bearer_token;
mod host;
mod password;
mod port;
mod username;

pub use api_url::ApiUrl;
pub use bearer_token::BearerToken;
pub use host::VirtHost;
pub use password::VirtPassword;
pub use port::{DEFAULT_API_PORT, VirtPort};
pub use username::VirtUsername;

// Re-export validation functions for internal use
pub(crate) use api_url::validate_url;
pub(crate) use bearer_token::validate_token;
pub(crate) use host::validate_host;
pub(crate) use password::validate_password;
pub(crate) use port::{PortRole, validate_port};
pub(crate) use username::validate_username;

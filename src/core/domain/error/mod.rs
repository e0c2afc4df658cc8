use crate::core::domain::model::{
    action::ActionKind,
    vm::{VmIdentity, VmLifecycleState},
};
use thiserror::Error;

/// The main error type for virtdeck operations.
///
/// Variants map onto how a dashboard reacts to them: transient fetch
/// failures degrade to stale data, fatal ones (expired session, broken
/// console) replace the view, and local admission failures never reach
/// the backend at all.
#[derive(Error, Debug)]
pub enum VirtError {
    /// Represents errors that occur while talking to the backend
    ///
    /// # Fields
    /// * `0` - A description of what went wrong during the request
    #[error("Connection error: {0}")]
    Connection(String),

    /// The backend answered with a non-success status other than 401
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A bounded operation did not complete in time
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Represents login failures
    ///
    /// # Fields
    /// * `0` - A description of the authentication failure
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The bearer credential is missing, expired, or was rejected with 401.
    /// The caller must re-authenticate.
    #[error("Session expired: re-authentication required")]
    AuthExpired,

    /// A lifecycle command was sent and failed
    #[error("{kind} of VM '{vm_id}' failed: {message}")]
    ActionCommand {
        vm_id: VmIdentity,
        kind: ActionKind,
        message: String,
    },

    /// Another action is still pending for this VM
    #[error("VM '{vm_id}' already has a pending {kind} action")]
    ActionInProgress { vm_id: VmIdentity, kind: ActionKind },

    /// The action is not admissible in the VM's current lifecycle state
    #[error("{kind} is not allowed while VM '{vm_id}' is {state}")]
    ActionRejected {
        vm_id: VmIdentity,
        kind: ActionKind,
        state: VmLifecycleState,
    },

    /// The typed confirmation does not match the VM name
    #[error("Confirmation text does not match VM name '{vm_id}'")]
    ConfirmationMismatch { vm_id: VmIdentity },

    /// The remote display session could not be opened or was lost
    #[error("Console session error: {0}")]
    ConsoleSession(String),

    /// Represents validation failures with detailed context
    ///
    /// # Fields
    /// * `source` - The underlying validation error
    #[error("Validation error: {source}")]
    Validation { source: ValidationError },
}

impl VirtError {
    /// Returns `true` for failures the next poll tick may recover from.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            VirtError::Connection(_) | VirtError::Api { .. } | VirtError::Timeout(_)
        )
    }

    /// Returns `true` for failures that must replace the view with an error state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, VirtError::AuthExpired | VirtError::ConsoleSession(_))
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, VirtError::AuthExpired)
    }
}

impl From<ValidationError> for VirtError {
    fn from(error: ValidationError) -> Self {
        VirtError::Validation { source: error }
    }
}

/// Specialized error type for validation failures.
///
/// This enum provides detailed context about why a validation
/// failed, including field-specific errors and format violations.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Represents a validation failure for a specific field
    ///
    /// # Fields
    /// * `field` - The name of the field that failed validation
    /// * `message` - A detailed message about why validation failed
    #[error("Field '{field}' validation failed: {message}")]
    Field { field: String, message: String },

    /// Represents format/syntax validation failures
    ///
    /// # Fields
    /// * `0` - Description of the format violation
    #[error("Format error: {0}")]
    Format(String),

    /// Represents violations of domain constraints
    ///
    /// # Fields
    /// * `0` - Description of the constraint violation
    #[error("Domain constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Type alias for Results that may fail with a VirtError
pub type VirtResult<T> = Result<T, VirtError>;

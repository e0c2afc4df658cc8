//! Typed-name confirmation in front of VM deletion.

use crate::core::domain::{
    error::{ValidationError, VirtError, VirtResult},
    model::{
        action::{ActionOutcome, DeleteRequest},
        vm::VmIdentity,
    },
};
use crate::lifecycle::action_controller::VmActionController;
use tracing::{debug, info};

/// An open deletion dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteContext {
    pub vm_id: VmIdentity,
    /// The confirmed request, kept once the typed name matched.
    pub accepted: Option<DeleteRequest>,
    /// Error of the last failed submission, if any.
    pub last_error: Option<String>,
}

/// Two-step confirmation in front of [`VmActionController::delete`].
///
/// The user must type the VM's name exactly before the delete is sent. Once
/// it matched, a failed delete can be sent again with [`retry`](Self::retry)
/// without typing the name a second time.
#[derive(Debug, Default)]
pub struct DeleteConfirmationGate {
    context: Option<DeleteContext>,
}

impl DeleteConfirmationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the confirmation for `vm_id`, replacing any previous one.
    pub fn request_delete(&mut self, vm_id: VmIdentity) {
        debug!(vm = %vm_id, "delete confirmation requested");
        self.context = Some(DeleteContext {
            vm_id,
            accepted: None,
            last_error: None,
        });
    }

    pub fn context(&self) -> Option<&DeleteContext> {
        self.context.as_ref()
    }

    /// Whether `confirmation_text` would unlock the delete.
    pub fn can_submit(&self, confirmation_text: &str) -> bool {
        self.context
            .as_ref()
            .is_some_and(|ctx| ctx.vm_id.as_str() == confirmation_text)
    }

    /// Whether a confirmed delete is waiting to be sent again.
    pub fn can_retry(&self) -> bool {
        self.context
            .as_ref()
            .is_some_and(|ctx| ctx.accepted.is_some())
    }

    /// Sends the delete if `confirmation_text` matches the VM name.
    ///
    /// On success the context is cleared. On failure it stays open with the
    /// error recorded, and the matched request is kept for [`retry`](Self::retry).
    pub async fn submit(
        &mut self,
        controller: &VmActionController,
        confirmation_text: &str,
        purge_secondary_storage: bool,
    ) -> VirtResult<ActionOutcome> {
        let context = self.open_context()?;

        let request = DeleteRequest {
            vm_id: context.vm_id.clone(),
            confirmation_text: confirmation_text.to_string(),
            purge_secondary_storage,
        };
        if !request.is_confirmed() {
            let err = VirtError::ConfirmationMismatch {
                vm_id: request.vm_id,
            };
            context.last_error = Some(err.to_string());
            return Err(err);
        }

        context.accepted = Some(request.clone());
        self.send(controller, request).await
    }

    /// Sends the already confirmed delete again, with the same purge choice.
    ///
    /// # Errors
    /// Returns `ValidationError::ConstraintViolation` when no dialog is open
    /// or its name has not been confirmed yet.
    pub async fn retry(&mut self, controller: &VmActionController) -> VirtResult<ActionOutcome> {
        let request = self.open_context()?.accepted.clone().ok_or_else(|| {
            ValidationError::ConstraintViolation(
                "The deletion has not been confirmed yet".to_string(),
            )
        })?;

        debug!(vm = %request.vm_id, purge = request.purge_secondary_storage, "retrying delete");
        self.send(controller, request).await
    }

    /// Closes the dialog without side effects.
    pub fn cancel(&mut self) {
        self.context = None;
    }

    fn open_context(&mut self) -> VirtResult<&mut DeleteContext> {
        self.context.as_mut().ok_or_else(|| {
            ValidationError::ConstraintViolation(
                "No deletion is awaiting confirmation".to_string(),
            )
            .into()
        })
    }

    async fn send(
        &mut self,
        controller: &VmActionController,
        request: DeleteRequest,
    ) -> VirtResult<ActionOutcome> {
        match controller
            .delete(&request.vm_id, request.purge_secondary_storage)
            .await
        {
            Ok(outcome) => {
                info!(vm = %request.vm_id, purge = request.purge_secondary_storage, "VM deleted");
                self.context = None;
                Ok(outcome)
            }
            Err(e) => {
                if let Some(context) = self.context.as_mut() {
                    context.last_error = Some(e.to_string());
                }
                Err(e)
            }
        }
    }
}

//! Lifecycle commands with one pending action per VM.

use crate::core::{
    domain::{
        error::{VirtError, VirtResult},
        model::{
            action::{ActionKind, ActionOutcome, ActionState, LifecycleCommand, PendingAction},
            vm::{CreateDomainParams, VmIdentity},
        },
    },
    infrastructure::virt_backend::VirtBackend,
};
use crate::telemetry::status_board::StatusBoard;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

type PendingTable = Arc<Mutex<HashMap<VmIdentity, PendingAction>>>;

fn lock(table: &PendingTable) -> MutexGuard<'_, HashMap<VmIdentity, PendingAction>> {
    table.lock().unwrap_or_else(|e| e.into_inner())
}

/// Holds a VM's pending slot; releasing it returns the VM to `Idle`.
struct PendingGuard {
    table: PendingTable,
    vm_id: VmIdentity,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        lock(&self.table).remove(&self.vm_id);
    }
}

/// Issues start/stop/reboot/delete/create commands.
///
/// A VM moves `Idle -> Pending(kind)` when a command is accepted and back to
/// `Idle` once the command failed, timed out, or succeeded and the status
/// board was resynchronized. The board is never updated optimistically.
#[derive(Clone)]
pub struct VmActionController {
    backend: Arc<dyn VirtBackend>,
    board: Arc<StatusBoard>,
    pending: PendingTable,
    action_timeout: Duration,
}

impl VmActionController {
    pub fn new(
        backend: Arc<dyn VirtBackend>,
        board: Arc<StatusBoard>,
        action_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            board,
            pending: Arc::new(Mutex::new(HashMap::new())),
            action_timeout,
        }
    }

    pub async fn start(&self, vm_id: &VmIdentity) -> VirtResult<ActionOutcome> {
        self.issue(vm_id, LifecycleCommand::Start).await
    }

    pub async fn stop(&self, vm_id: &VmIdentity, force: bool) -> VirtResult<ActionOutcome> {
        self.issue(vm_id, LifecycleCommand::Stop { force }).await
    }

    pub async fn reboot(&self, vm_id: &VmIdentity) -> VirtResult<ActionOutcome> {
        self.issue(vm_id, LifecycleCommand::Reboot).await
    }

    /// Deletes the VM, optionally purging its secondary storage.
    ///
    /// Callers facing a user should go through
    /// [`DeleteConfirmationGate`](crate::lifecycle::delete_gate::DeleteConfirmationGate).
    pub async fn delete(
        &self,
        vm_id: &VmIdentity,
        purge_secondary_storage: bool,
    ) -> VirtResult<ActionOutcome> {
        self.issue(
            vm_id,
            LifecycleCommand::Delete {
                purge_storage: purge_secondary_storage,
            },
        )
        .await
    }

    /// Provisions a new VM. The new name is locked while the request runs.
    pub async fn create(&self, params: &CreateDomainParams) -> VirtResult<ActionOutcome> {
        let vm_id = VmIdentity::new(params.name.clone());
        let _guard = self.reserve(&vm_id, ActionKind::Create)?;

        info!(vm = %vm_id, vcpus = params.vcpus, memory_mb = params.memory_mb, "provisioning VM");
        self.bounded(&vm_id, ActionKind::Create, self.backend.create_domain(params))
            .await?;
        self.complete(vm_id, ActionKind::Create).await
    }

    /// Fetches the full status map and merges it into the board.
    ///
    /// Returns the number of VM entries applied.
    pub async fn resync(&self) -> VirtResult<usize> {
        let sequence = self.board.begin();
        let statuses = self.backend.domains_status().await?;
        let applied = self.board.merge(sequence, statuses).await;
        debug!(sequence, applied, "status board resynchronized");
        Ok(applied)
    }

    pub fn state(&self, vm_id: &VmIdentity) -> ActionState {
        match lock(&self.pending).get(vm_id) {
            Some(action) => ActionState::Pending(action.kind),
            None => ActionState::Idle,
        }
    }

    pub fn pending(&self, vm_id: &VmIdentity) -> Option<PendingAction> {
        lock(&self.pending).get(vm_id).cloned()
    }

    pub fn status_board(&self) -> &Arc<StatusBoard> {
        &self.board
    }

    async fn issue(
        &self,
        vm_id: &VmIdentity,
        command: LifecycleCommand,
    ) -> VirtResult<ActionOutcome> {
        let kind = command.kind();
        let _guard = self.reserve(vm_id, kind)?;

        let state = self.board.lifecycle_state(vm_id).await;
        if !kind.admissible_in(state) {
            debug!(vm = %vm_id, action = %kind, %state, "action rejected by admission rules");
            return Err(VirtError::ActionRejected {
                vm_id: vm_id.clone(),
                kind,
                state,
            });
        }

        info!(vm = %vm_id, action = %kind, "issuing lifecycle command");
        self.bounded(vm_id, kind, self.backend.domain_command(vm_id, command))
            .await?;
        self.complete(vm_id.clone(), kind).await
    }

    /// Claims the pending slot for `vm_id`.
    fn reserve(&self, vm_id: &VmIdentity, kind: ActionKind) -> VirtResult<PendingGuard> {
        let mut table = lock(&self.pending);
        if let Some(existing) = table.get(vm_id) {
            return Err(VirtError::ActionInProgress {
                vm_id: vm_id.clone(),
                kind: existing.kind,
            });
        }
        table.insert(vm_id.clone(), PendingAction::new(vm_id.clone(), kind));

        Ok(PendingGuard {
            table: Arc::clone(&self.pending),
            vm_id: vm_id.clone(),
        })
    }

    /// Runs a backend command under `action_timeout`.
    async fn bounded<F>(&self, vm_id: &VmIdentity, kind: ActionKind, command: F) -> VirtResult<()>
    where
        F: Future<Output = VirtResult<()>>,
    {
        match tokio::time::timeout(self.action_timeout, command).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(vm = %vm_id, action = %kind, error = %e, "lifecycle command failed");
                Err(match e {
                    VirtError::AuthExpired | VirtError::Timeout(_) => e,
                    other => VirtError::ActionCommand {
                        vm_id: vm_id.clone(),
                        kind,
                        message: other.to_string(),
                    },
                })
            }
            Err(_) => {
                warn!(vm = %vm_id, action = %kind, "lifecycle command timed out");
                Err(VirtError::Timeout(format!(
                    "{} of VM '{}' did not complete within {:?}",
                    kind, vm_id, self.action_timeout
                )))
            }
        }
    }

    /// Resyncs after a successful command.
    async fn complete(&self, vm_id: VmIdentity, kind: ActionKind) -> VirtResult<ActionOutcome> {
        let mut outcome = ActionOutcome {
            vm_id,
            kind,
            resynced: None,
            resync_error: None,
        };

        match self.resync().await {
            Ok(applied) => outcome.resynced = Some(applied),
            Err(e) if e.is_auth_expired() => return Err(e),
            Err(e) => {
                warn!(vm = %outcome.vm_id, action = %kind, error = %e, "resync after command failed");
                outcome.resync_error = Some(e.to_string());
            }
        }
        info!(vm = %outcome.vm_id, action = %kind, "lifecycle command completed");
        Ok(outcome)
    }
}

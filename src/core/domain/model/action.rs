//! Lifecycle actions and their admission rules.

use crate::core::domain::model::vm::{VmIdentity, VmLifecycleState};
use serde::Serialize;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Kind of lifecycle action a user can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Start,
    Stop,
    Reboot,
    Delete,
    Create,
}

impl ActionKind {
    /// Whether this action may be issued while the VM is in `state`.
    ///
    /// `Unknown` admits everything; the backend is the final judge there.
    pub fn admissible_in(self, state: VmLifecycleState) -> bool {
        match (self, state) {
            (_, VmLifecycleState::Unknown) => true,
            (ActionKind::Start, VmLifecycleState::Running) => false,
            (ActionKind::Stop | ActionKind::Reboot, VmLifecycleState::Shutoff) => false,
            _ => true,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Start => "start",
            ActionKind::Stop => "stop",
            ActionKind::Reboot => "reboot",
            ActionKind::Delete => "delete",
            ActionKind::Create => "create",
        };
        f.write_str(name)
    }
}

/// A lifecycle command as sent to `POST /virt/domain/{id}/{command}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    Start,
    Stop { force: bool },
    Reboot,
    Delete { purge_storage: bool },
}

#[derive(Serialize)]
struct StopBody {
    force: bool,
}

#[derive(Serialize)]
struct DeleteBody {
    purge_storage: bool,
}

impl LifecycleCommand {
    pub fn kind(&self) -> ActionKind {
        match self {
            LifecycleCommand::Start => ActionKind::Start,
            LifecycleCommand::Stop { .. } => ActionKind::Stop,
            LifecycleCommand::Reboot => ActionKind::Reboot,
            LifecycleCommand::Delete { .. } => ActionKind::Delete,
        }
    }

    /// Final path segment of the command endpoint.
    pub fn path_segment(&self) -> &'static str {
        match self {
            LifecycleCommand::Start => "start",
            LifecycleCommand::Stop { .. } => "stop",
            LifecycleCommand::Reboot => "reboot",
            LifecycleCommand::Delete { .. } => "delete",
        }
    }

    /// JSON body carried by the command.
    pub fn body(&self) -> serde_json::Value {
        let body = match *self {
            LifecycleCommand::Stop { force } => serde_json::to_value(StopBody { force }),
            LifecycleCommand::Delete { purge_storage } => {
                serde_json::to_value(DeleteBody { purge_storage })
            }
            LifecycleCommand::Start | LifecycleCommand::Reboot => {
                return serde_json::Value::Object(Default::default());
            }
        };
        body.unwrap_or_else(|_| serde_json::Value::Object(Default::default()))
    }
}

/// The in-flight marker for a VM. At most one exists per VM.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    pub vm_id: VmIdentity,
    pub kind: ActionKind,
    pub issued_at: SystemTime,
}

impl PendingAction {
    pub fn new(vm_id: VmIdentity, kind: ActionKind) -> Self {
        Self {
            vm_id,
            kind,
            issued_at: SystemTime::now(),
        }
    }

    /// Issue time in milliseconds since the UNIX epoch.
    pub fn issued_at_ms(&self) -> u64 {
        self.issued_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Per-VM view of the action state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Idle,
    Pending(ActionKind),
}

/// Result of a successful lifecycle action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    pub vm_id: VmIdentity,
    pub kind: ActionKind,
    /// Number of VM entries merged by the post-action resync.
    pub resynced: Option<usize>,
    /// Why the post-action resync failed, if it did. The command itself succeeded.
    pub resync_error: Option<String>,
}

/// A deletion request as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub vm_id: VmIdentity,
    pub confirmation_text: String,
    pub purge_secondary_storage: bool,
}

impl DeleteRequest {
    /// Exact, case-sensitive match with no trimming.
    pub fn is_confirmed(&self) -> bool {
        self.confirmation_text == self.vm_id.as_str()
    }
}

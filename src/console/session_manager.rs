//! One remote display session at a time, with terminal failures.

use crate::console::transport::{DisplayConnection, DisplayTransport};
use crate::core::{
    domain::{
        error::{VirtError, VirtResult},
        model::{console::ConsoleEndpoint, vm::VmIdentity},
        value_object::{PortRole, validate_port},
    },
    infrastructure::virt_backend::VirtBackend,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What the console view should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleStatus {
    Closed,
    Connected(VmIdentity),
    /// Setup or the live connection failed. Stays until [`ConsoleSessionManager::close`].
    Failed { vm_id: VmIdentity, reason: String },
}

/// An open display session.
pub struct ConsoleSession {
    vm_id: VmIdentity,
    endpoint: ConsoleEndpoint,
    connection: Box<dyn DisplayConnection>,
}

impl ConsoleSession {
    pub fn vm_id(&self) -> &VmIdentity {
        &self.vm_id
    }

    pub fn endpoint(&self) -> &ConsoleEndpoint {
        &self.endpoint
    }

    pub fn protocol_version(&self) -> &str {
        self.connection.protocol_version()
    }
}

impl fmt::Debug for ConsoleSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSession")
            .field("vm_id", &self.vm_id)
            .field("endpoint", &self.endpoint)
            .field("protocol_version", &self.protocol_version())
            .finish()
    }
}

#[derive(Debug, Clone)]
struct Failure {
    vm_id: VmIdentity,
    reason: String,
}

/// Opens, tracks and tears down the console session of the selected VM.
///
/// A failed session is not retried: further `open` calls for the same VM
/// fail until [`close`](Self::close) is called.
pub struct ConsoleSessionManager {
    backend: Arc<dyn VirtBackend>,
    transport: Arc<dyn DisplayTransport>,
    setup_timeout: Duration,
    session: Option<ConsoleSession>,
    failure: Option<Failure>,
}

impl ConsoleSessionManager {
    pub fn new(
        backend: Arc<dyn VirtBackend>,
        transport: Arc<dyn DisplayTransport>,
        setup_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            transport,
            setup_timeout,
            session: None,
            failure: None,
        }
    }

    /// Opens the console of `vm_id`, or returns the session already open for it.
    pub async fn open(&mut self, vm_id: &VmIdentity) -> VirtResult<&mut ConsoleSession> {
        if let Some(failure) = &self.failure {
            if failure.vm_id == *vm_id {
                return Err(VirtError::ConsoleSession(format!(
                    "console of VM '{}' failed: {}",
                    vm_id, failure.reason
                )));
            }
        }

        if self.session.as_ref().is_some_and(|s| s.vm_id == *vm_id) {
            return self
                .session
                .as_mut()
                .ok_or_else(|| VirtError::ConsoleSession("session vanished".to_string()));
        }

        // Navigating to another VM.
        self.close().await;

        let setup = Self::establish(
            Arc::clone(&self.backend),
            Arc::clone(&self.transport),
            vm_id.clone(),
        );
        let result = match tokio::time::timeout(self.setup_timeout, setup).await {
            Ok(result) => result,
            Err(_) => Err(VirtError::ConsoleSession(format!(
                "console setup did not complete within {:?}",
                self.setup_timeout
            ))),
        };

        match result {
            Ok(session) => {
                info!(vm = %vm_id, endpoint = %session.endpoint, "console session open");
                Ok(self.session.insert(session))
            }
            Err(e) => {
                warn!(vm = %vm_id, error = %e, "console setup failed");
                self.failure = Some(Failure {
                    vm_id: vm_id.clone(),
                    reason: e.to_string(),
                });
                Err(match e {
                    VirtError::AuthExpired | VirtError::ConsoleSession(_) => e,
                    other => VirtError::ConsoleSession(other.to_string()),
                })
            }
        }
    }

    async fn establish(
        backend: Arc<dyn VirtBackend>,
        transport: Arc<dyn DisplayTransport>,
        vm_id: VmIdentity,
    ) -> VirtResult<ConsoleSession> {
        let details = backend.domain_details(&vm_id).await?;
        if !details.state.is_active() {
            return Err(VirtError::ConsoleSession(format!(
                "VM '{}' is {}, a console needs a running VM",
                vm_id, details.state
            )));
        }

        let endpoint = backend.console_endpoint(&vm_id).await?;
        debug!(vm = %vm_id, %endpoint, "console endpoint negotiated");
        validate_port(endpoint.port, PortRole::Display)?;
        let connection = transport.connect(&endpoint).await?;

        Ok(ConsoleSession {
            vm_id,
            endpoint,
            connection,
        })
    }

    /// Sends input to the open session. Any transport error ends the session.
    pub async fn send(&mut self, data: &[u8]) -> VirtResult<()> {
        let session = self.active()?;
        let result = session.connection.send(data).await;
        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail_active(e).await),
        }
    }

    /// Receives display data. Any transport error ends the session.
    pub async fn recv(&mut self, buf: &mut [u8]) -> VirtResult<usize> {
        let session = self.active()?;
        let result = session.connection.recv(buf).await;
        match result {
            Ok(n) => Ok(n),
            Err(e) => Err(self.fail_active(e).await),
        }
    }

    /// Releases the transport handle and forgets any recorded failure.
    pub async fn close(&mut self) {
        self.failure = None;
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.connection.close().await {
                debug!(vm = %session.vm_id, error = %e, "error while closing console");
            }
            info!(vm = %session.vm_id, "console session closed");
        }
    }

    pub fn status(&self) -> ConsoleStatus {
        if let Some(failure) = &self.failure {
            return ConsoleStatus::Failed {
                vm_id: failure.vm_id.clone(),
                reason: failure.reason.clone(),
            };
        }
        match &self.session {
            Some(session) => ConsoleStatus::Connected(session.vm_id.clone()),
            None => ConsoleStatus::Closed,
        }
    }

    pub fn session(&self) -> Option<&ConsoleSession> {
        self.session.as_ref()
    }

    fn active(&mut self) -> VirtResult<&mut ConsoleSession> {
        self.session
            .as_mut()
            .ok_or_else(|| VirtError::ConsoleSession("no console session is open".to_string()))
    }

    async fn fail_active(&mut self, error: VirtError) -> VirtError {
        let Some(mut session) = self.session.take() else {
            return error;
        };
        warn!(vm = %session.vm_id, error = %error, "console connection lost");
        let _ = session.connection.close().await;
        self.failure = Some(Failure {
            vm_id: session.vm_id,
            reason: error.to_string(),
        });
        match error {
            VirtError::ConsoleSession(_) => error,
            other => VirtError::ConsoleSession(other.to_string()),
        }
    }
}

impl fmt::Debug for ConsoleSessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSessionManager")
            .field("setup_timeout", &self.setup_timeout)
            .field("session", &self.session)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

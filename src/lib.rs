mod auth;
mod core;

pub mod console;
pub mod lifecycle;
pub mod telemetry;

#[cfg(test)]
mod tests;

pub use crate::core::domain::error::{ValidationError, VirtError, VirtResult};
pub use crate::core::domain::model::{
    action::{
        ActionKind, ActionOutcome, ActionState, DeleteRequest, LifecycleCommand, PendingAction,
    },
    client_config::{ClientConfig, RateLimitConfig},
    connection::VirtConnection,
    console::ConsoleEndpoint,
    host::{HostCpu, HostDisk, HostInfo, HostMemory},
    session_context::SessionContext,
    vm::{CreateDomainParams, VmDetails, VmIdentity, VmLifecycleState, VmStatus, VmStatusMap},
};
pub use crate::core::domain::value_object::{
    ApiUrl, BearerToken, DEFAULT_API_PORT, VirtHost, VirtPassword, VirtPort, VirtUsername,
};
pub use crate::core::infrastructure::virt_backend::VirtBackend;

use crate::{
    auth::application::service::login_service::LoginService,
    console::{session_manager::ConsoleSessionManager, transport::TcpDisplayTransport},
    core::{
        domain::value_object::{
            PortRole, validate_host, validate_password, validate_port, validate_url,
            validate_username,
        },
        infrastructure::api_client::ApiClient,
    },
    lifecycle::{action_controller::VmActionController, delete_gate::DeleteConfirmationGate},
    telemetry::{
        monitor::{HostMonitor, VmMonitor},
        status_board::StatusBoard,
    },
};
use std::sync::Arc;
use tracing::info;

/// A client for a libvirt dashboard backend.
///
/// The client owns the session, the shared status board and the action
/// controller. Telemetry monitors and console managers are created on demand
/// and stop when dropped.
///
/// # Examples
///
/// ```no_run
/// use virtdeck::{VirtClient, VirtResult, VmIdentity};
///
/// #[tokio::main]
/// async fn main() -> VirtResult<()> {
///     let client = VirtClient::builder()
///         .host("virt.example.com")
///         .port(8000)
///         .credentials("admin", "password")
///         .secure(true)
///         .build()?;
///
///     client.login().await?;
///     client.refresh_status().await?;
///
///     let web01 = VmIdentity::from("web01");
///     client.action_controller().start(&web01).await?;
///
///     let monitor = client.vm_monitor(web01);
///     if let Some(telemetry) = monitor.latest() {
///         println!("cpu {:.1}%", telemetry.cpu.percent());
///     }
///     Ok(())
/// }
/// ```
pub struct VirtClient {
    api_client: Arc<ApiClient>,
    board: Arc<StatusBoard>,
    controller: VmActionController,
}

/// Builder for VirtClient configuration
#[derive(Debug, Default)]
pub struct VirtClientBuilder {
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    secure: bool,
    accept_invalid_certs: bool,
    config: ClientConfig,
}

fn required(field: &str) -> VirtError {
    ValidationError::Field {
        field: field.to_string(),
        message: format!("{} is required", field),
    }
    .into()
}

impl VirtClientBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Backend port, 8000 when not set.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Use HTTPS. Off by default.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Accept self-signed certificates. Only meaningful with `secure(true)`.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates every setting and builds the client. No request is sent.
    pub fn build(self) -> VirtResult<VirtClient> {
        self.config.validate()?;

        let host = self.host.ok_or_else(|| required("host"))?;
        validate_host(&host)?;
        let host = VirtHost::new_unchecked(host);

        let port = self.port.unwrap_or(DEFAULT_API_PORT);
        validate_port(port, PortRole::Api)?;
        let port = VirtPort::new_unchecked(port);

        let username = self.username.ok_or_else(|| required("username"))?;
        validate_username(&username, self.config.block_reserved_usernames)?;
        let username = VirtUsername::new_unchecked(username);

        let password = self.password.ok_or_else(|| required("password"))?;
        validate_password(&password, self.config.password_min_score)?;
        let password = VirtPassword::new_unchecked(password);

        let url = ApiUrl::from_parts(&host, &port, self.secure);
        validate_url(url.as_str())?;

        let connection = VirtConnection::new(
            host,
            port,
            username,
            password,
            self.secure,
            self.accept_invalid_certs,
            url,
        );
        let session = Arc::new(SessionContext::new(self.config.token_lifetime));
        let action_timeout = self.config.action_timeout;
        let api_client = Arc::new(ApiClient::new(connection, self.config, session)?);

        let board = Arc::new(StatusBoard::new());
        let backend: Arc<dyn VirtBackend> = api_client.clone();
        let controller = VmActionController::new(backend, Arc::clone(&board), action_timeout);

        Ok(VirtClient {
            api_client,
            board,
            controller,
        })
    }
}

impl VirtClient {
    /// Creates a new builder for VirtClient configuration
    pub fn builder() -> VirtClientBuilder {
        VirtClientBuilder::default()
    }

    /// Exchanges the configured credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// - `Authentication` if the backend rejects the credentials
    /// - `Connection` / `Timeout` if the backend cannot be reached
    pub async fn login(&self) -> VirtResult<()> {
        let service = LoginService::new(self.config().request_timeout);
        let token = service.execute(self.api_client.connection()).await?;
        self.api_client.session().set_token(token).await;
        Ok(())
    }

    /// Drops the token and stops every loop bound to the session.
    pub async fn logout(&self) {
        let username = self.api_client.connection().username();
        info!(login = username.login(), realm = username.realm(), "logging out");
        self.api_client.session().expire().await;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.api_client.session().is_authenticated().await
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        self.api_client.session()
    }

    pub fn connection(&self) -> &VirtConnection {
        self.api_client.connection()
    }

    pub fn config(&self) -> &ClientConfig {
        self.api_client.config()
    }

    /// The backend operations, for components built outside this client.
    pub fn backend(&self) -> Arc<dyn VirtBackend> {
        self.api_client.clone()
    }

    pub async fn host_cpu(&self) -> VirtResult<HostCpu> {
        self.api_client.host_cpu().await
    }

    pub async fn host_memory(&self) -> VirtResult<HostMemory> {
        self.api_client.host_memory().await
    }

    pub async fn host_disk(&self) -> VirtResult<HostDisk> {
        self.api_client.host_disk().await
    }

    pub async fn host_info(&self) -> VirtResult<HostInfo> {
        self.api_client.host_info().await
    }

    pub async fn domain_details(&self, vm_id: &VmIdentity) -> VirtResult<VmDetails> {
        self.api_client.domain_details(vm_id).await
    }

    /// Fetches the full VM status map into the status board.
    ///
    /// Returns the number of entries applied.
    pub async fn refresh_status(&self) -> VirtResult<usize> {
        self.controller.resync().await
    }

    pub fn status_board(&self) -> &Arc<StatusBoard> {
        &self.board
    }

    pub fn action_controller(&self) -> &VmActionController {
        &self.controller
    }

    pub fn delete_gate(&self) -> DeleteConfirmationGate {
        DeleteConfirmationGate::new()
    }

    /// Starts live telemetry for `vm_id`. The monitor stops when the session
    /// expires or when it is dropped.
    pub fn vm_monitor(&self, vm_id: VmIdentity) -> VmMonitor {
        VmMonitor::start(
            self.backend(),
            vm_id,
            self.config().vm_poll_interval,
            Some(self.session().expiry_signal()),
        )
    }

    pub fn host_monitor(&self) -> HostMonitor {
        HostMonitor::start(
            self.backend(),
            self.config().host_poll_interval,
            Some(self.session().expiry_signal()),
        )
    }

    /// A console manager speaking RFB over TCP.
    pub fn console_manager(&self) -> ConsoleSessionManager {
        ConsoleSessionManager::new(
            self.backend(),
            Arc::new(TcpDisplayTransport::new()),
            self.config().console_timeout,
        )
    }
}

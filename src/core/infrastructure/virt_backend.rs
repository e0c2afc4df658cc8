//! The backend operations consumed by the telemetry, lifecycle and console components.

use crate::core::{
    domain::{
        error::VirtResult,
        model::{
            action::LifecycleCommand,
            console::ConsoleEndpoint,
            host::{HostCpu, HostDisk, HostInfo, HostMemory},
            vm::{CreateDomainParams, VmDetails, VmIdentity, VmStatusMap},
        },
    },
    infrastructure::api_client::ApiClient,
};
use async_trait::async_trait;

/// Every REST operation the core depends on.
///
/// [`ApiClient`] is the production implementation; tests substitute a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VirtBackend: Send + Sync {
    async fn host_cpu(&self) -> VirtResult<HostCpu>;

    async fn host_memory(&self) -> VirtResult<HostMemory>;

    async fn host_disk(&self) -> VirtResult<HostDisk>;

    async fn host_info(&self) -> VirtResult<HostInfo>;

    /// `GET /virt/domains/status`
    async fn domains_status(&self) -> VirtResult<VmStatusMap>;

    /// `GET /virt/domain/{id}/details`
    async fn domain_details(&self, vm_id: &VmIdentity) -> VirtResult<VmDetails>;

    /// `POST /virt/domain/{id}/{start|stop|reboot|delete}`
    async fn domain_command(
        &self,
        vm_id: &VmIdentity,
        command: LifecycleCommand,
    ) -> VirtResult<()>;

    /// `POST /virt/domain/create`
    async fn create_domain(&self, params: &CreateDomainParams) -> VirtResult<()>;

    /// Negotiates the remote display endpoint for a VM.
    async fn console_endpoint(&self, vm_id: &VmIdentity) -> VirtResult<ConsoleEndpoint>;
}

#[async_trait]
impl VirtBackend for ApiClient {
    async fn host_cpu(&self) -> VirtResult<HostCpu> {
        self.get(&["host", "cpu"]).await
    }

    async fn host_memory(&self) -> VirtResult<HostMemory> {
        self.get(&["host", "mem"]).await
    }

    async fn host_disk(&self) -> VirtResult<HostDisk> {
        self.get(&["host", "disk"]).await
    }

    async fn host_info(&self) -> VirtResult<HostInfo> {
        self.get(&["host", "info"]).await
    }

    async fn domains_status(&self) -> VirtResult<VmStatusMap> {
        self.get(&["virt", "domains", "status"]).await
    }

    async fn domain_details(&self, vm_id: &VmIdentity) -> VirtResult<VmDetails> {
        self.get(&["virt", "domain", vm_id.as_str(), "details"]).await
    }

    async fn domain_command(
        &self,
        vm_id: &VmIdentity,
        command: LifecycleCommand,
    ) -> VirtResult<()> {
        self.post_command(
            &["virt", "domain", vm_id.as_str(), command.path_segment()],
            &command.body(),
        )
        .await
    }

    async fn create_domain(&self, params: &CreateDomainParams) -> VirtResult<()> {
        self.post_command(&["virt", "domain", "create"], params).await
    }

    async fn console_endpoint(&self, vm_id: &VmIdentity) -> VirtResult<ConsoleEndpoint> {
        self.get(&["virt", "domain", vm_id.as_str(), "console"]).await
    }
}

//! Domain models for host telemetry from the `/host/*` endpoints.

use serde::{Deserialize, Serialize};

/// Host CPU counters from `/host/cpu`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HostCpu {
    /// Cumulative busy CPU time across all cores, in seconds.
    pub cpu_time: f64,
    /// Number of logical CPUs.
    pub cpu_count: u32,
}

/// Host memory usage from `/host/mem`, in KiB.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HostMemory {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<u64>,
}

/// Host disk usage from `/host/disk`, in bytes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HostDisk {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

/// Static host information from `/host/info`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HostInfo {
    /// Host name.
    pub hostname: String,
    /// Operating system name and release.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    /// Kernel version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,
    /// CPU model string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_model: Option<String>,
    /// Number of logical CPUs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_count: Option<u32>,
    /// Hypervisor (libvirt/QEMU) version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hypervisor_version: Option<String>,
    /// Uptime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
}

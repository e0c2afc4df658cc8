//! Domain models for virtual machine status and provisioning.
//!
//! This module defines the structures exchanged with the `/virt/...` endpoints.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

/// Opaque, stable identity of a VM (its domain name on the host).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct VmIdentity(String);

impl VmIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VmIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VmIdentity {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for VmIdentity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for VmIdentity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Authoritative run-state of a VM.
///
/// The backend encodes it as a small integer; [`VmLifecycleState::from_code`]
/// is the only place that knows the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(from = "i64", into = "i64")]
pub enum VmLifecycleState {
    Running,
    Paused,
    Shutoff,
    #[default]
    Unknown,
}

impl VmLifecycleState {
    const CODES: [(i64, VmLifecycleState); 3] = [
        (1, VmLifecycleState::Running),
        (3, VmLifecycleState::Paused),
        (5, VmLifecycleState::Shutoff),
    ];

    /// Maps a wire code to a state. Unrecognized codes become `Unknown`.
    pub fn from_code(code: i64) -> Self {
        Self::CODES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, state)| *state)
            .unwrap_or(VmLifecycleState::Unknown)
    }

    pub fn code(self) -> i64 {
        Self::CODES
            .iter()
            .find(|(_, state)| *state == self)
            .map(|(c, _)| *c)
            .unwrap_or(0)
    }

    /// A VM is active (eligible for a console) only while running.
    pub fn is_active(self) -> bool {
        self == VmLifecycleState::Running
    }
}

impl From<i64> for VmLifecycleState {
    fn from(code: i64) -> Self {
        Self::from_code(code)
    }
}

impl From<VmLifecycleState> for i64 {
    fn from(state: VmLifecycleState) -> Self {
        state.code()
    }
}

impl fmt::Display for VmLifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VmLifecycleState::Running => "running",
            VmLifecycleState::Paused => "paused",
            VmLifecycleState::Shutoff => "shutoff",
            VmLifecycleState::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One entry of the `/virt/domains/status` map.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VmStatus {
    /// Current lifecycle state.
    pub state: VmLifecycleState,
    /// Number of virtual CPUs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_count: Option<u32>,
    /// Current memory in KiB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    /// Maximum memory in KiB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_memory: Option<u64>,
}

/// The full status map, keyed by VM identity.
pub type VmStatusMap = HashMap<VmIdentity, VmStatus>;

/// Cumulative counters from `/virt/domain/{id}/details`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VmDetails {
    /// Current lifecycle state.
    #[serde(default)]
    pub state: VmLifecycleState,
    /// Total CPU time consumed, in seconds. Resets when the VM restarts.
    pub cpu_time: f64,
    /// Balloon memory in use, in KiB.
    pub memory_usage: u64,
    /// Maximum balloon memory, in KiB.
    pub max_memory: u64,
    /// Number of virtual CPUs.
    #[serde(rename = "cpuCount")]
    pub cpu_count: u32,
}

/// Parameters for provisioning a new VM via `/virt/domain/create`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateDomainParams {
    /// Domain name (becomes the VM identity).
    pub name: String,
    /// Number of virtual CPUs.
    pub vcpus: u32,
    /// Memory in MiB.
    pub memory_mb: u64,
    /// Primary disk size in GiB.
    pub disk_gb: u64,
    /// Installation image (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Start with the host (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autostart: Option<bool>,
}

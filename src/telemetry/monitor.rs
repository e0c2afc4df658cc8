//! Live telemetry for one VM or for the host: a polling loop feeding rate samplers.

use crate::core::{
    domain::model::{
        host::HostInfo,
        vm::{VmDetails, VmIdentity, VmLifecycleState},
    },
    infrastructure::virt_backend::VirtBackend,
};
use crate::telemetry::{
    polling_loop::{PollHandle, PollState, PollingLoop},
    rate_sampler::{RateSampler, UtilizationRate, UtilizationSample, unit_count},
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Derived telemetry of one VM.
#[derive(Debug, Clone, PartialEq)]
pub struct VmTelemetry {
    pub vm_id: VmIdentity,
    pub state: VmLifecycleState,
    /// CPU utilization normalized by the vCPU count.
    pub cpu: UtilizationRate,
    /// Balloon memory in use relative to its maximum.
    pub memory: UtilizationRate,
    /// The raw counters the rates were derived from.
    pub details: VmDetails,
    /// Fetch sequence that produced this value.
    pub sequence: u64,
}

/// Derived telemetry of the host.
#[derive(Debug, Clone, PartialEq)]
pub struct HostTelemetry {
    pub cpu: UtilizationRate,
    pub memory: UtilizationRate,
    pub disk: UtilizationRate,
    pub info: HostInfo,
    pub sequence: u64,
}

/// Sampler plus the sequence of the newest applied fetch.
#[derive(Debug, Default)]
struct Track {
    sampler: RateSampler,
    applied: u64,
}

impl Track {
    /// Accepts `sequence` if it is newer than anything applied so far.
    fn accept(&mut self, sequence: u64) -> bool {
        if sequence <= self.applied {
            return false;
        }
        self.applied = sequence;
        true
    }
}

/// Hands out fetch sequence numbers and monotonic sample timestamps.
#[derive(Debug)]
struct Clock {
    epoch: Instant,
    sequence: AtomicU64,
}

impl Clock {
    fn new() -> Self {
        Self {
            epoch: Instant::now(),
            sequence: AtomicU64::new(0),
        }
    }

    fn next(&self) -> (u64, u64) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        (sequence, self.epoch.elapsed().as_millis() as u64)
    }
}

/// Polls `/virt/domain/{id}/details` and publishes [`VmTelemetry`].
///
/// Dropping the monitor stops its loop.
#[derive(Debug)]
pub struct VmMonitor {
    vm_id: VmIdentity,
    handle: PollHandle,
    telemetry: watch::Receiver<Option<VmTelemetry>>,
}

impl VmMonitor {
    pub fn start(
        backend: Arc<dyn VirtBackend>,
        vm_id: VmIdentity,
        interval: Duration,
        expiry: Option<watch::Receiver<bool>>,
    ) -> Self {
        let (tx, telemetry) = watch::channel(None);
        let tx = Arc::new(tx);
        let track = Arc::new(Mutex::new(Track::default()));
        let clock = Arc::new(Clock::new());

        let mut polling = PollingLoop::new(interval).named("vm-telemetry");
        if let Some(expiry) = expiry {
            polling = polling.abort_on_expiry(expiry);
        }

        let id = vm_id.clone();
        let handle = polling.start(move || {
            let backend = Arc::clone(&backend);
            let vm_id = id.clone();
            let track = Arc::clone(&track);
            let tx = Arc::clone(&tx);
            let (sequence, timestamp_ms) = clock.next();

            async move {
                let details = backend.domain_details(&vm_id).await?;
                if details.cpu_count == 0 {
                    warn!(vm = %vm_id, "backend reported zero vCPUs, normalizing by 1");
                }

                let telemetry = {
                    let mut track = track.lock().unwrap_or_else(|e| e.into_inner());
                    if !track.accept(sequence) {
                        debug!(vm = %vm_id, sequence, "discarding stale telemetry");
                        return Ok(());
                    }
                    let cpu = track.sampler.sample(
                        UtilizationSample::new(timestamp_ms, details.cpu_time),
                        unit_count(details.cpu_count),
                    );
                    VmTelemetry {
                        vm_id,
                        state: details.state,
                        cpu,
                        memory: UtilizationRate::from_ratio(
                            details.memory_usage as f64,
                            details.max_memory as f64,
                        ),
                        details,
                        sequence,
                    }
                };
                tx.send_replace(Some(telemetry));
                Ok(())
            }
        });

        Self {
            vm_id,
            handle,
            telemetry,
        }
    }

    pub fn vm_id(&self) -> &VmIdentity {
        &self.vm_id
    }

    /// Latest derived telemetry, `None` until the first successful fetch.
    pub fn latest(&self) -> Option<VmTelemetry> {
        self.telemetry.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<VmTelemetry>> {
        self.telemetry.clone()
    }

    pub fn poll_state(&self) -> PollState {
        self.handle.state()
    }

    pub fn stop(&self) {
        self.handle.stop();
    }
}

/// Polls the `/host/*` endpoints and publishes [`HostTelemetry`].
#[derive(Debug)]
pub struct HostMonitor {
    handle: PollHandle,
    telemetry: watch::Receiver<Option<HostTelemetry>>,
}

impl HostMonitor {
    pub fn start(
        backend: Arc<dyn VirtBackend>,
        interval: Duration,
        expiry: Option<watch::Receiver<bool>>,
    ) -> Self {
        let (tx, telemetry) = watch::channel(None);
        let tx = Arc::new(tx);
        let track = Arc::new(Mutex::new(Track::default()));
        let clock = Arc::new(Clock::new());

        let mut polling = PollingLoop::new(interval).named("host-telemetry");
        if let Some(expiry) = expiry {
            polling = polling.abort_on_expiry(expiry);
        }

        let handle = polling.start(move || {
            let backend = Arc::clone(&backend);
            let track = Arc::clone(&track);
            let tx = Arc::clone(&tx);
            let (sequence, timestamp_ms) = clock.next();

            async move {
                let (cpu, memory, disk, info) = tokio::try_join!(
                    backend.host_cpu(),
                    backend.host_memory(),
                    backend.host_disk(),
                    backend.host_info(),
                )?;

                let telemetry = {
                    let mut track = track.lock().unwrap_or_else(|e| e.into_inner());
                    if !track.accept(sequence) {
                        debug!(sequence, "discarding stale host telemetry");
                        return Ok(());
                    }
                    HostTelemetry {
                        cpu: track.sampler.sample(
                            UtilizationSample::new(timestamp_ms, cpu.cpu_time),
                            unit_count(cpu.cpu_count),
                        ),
                        memory: UtilizationRate::from_ratio(memory.used as f64, memory.total as f64),
                        disk: UtilizationRate::from_ratio(disk.used as f64, disk.total as f64),
                        info,
                        sequence,
                    }
                };
                tx.send_replace(Some(telemetry));
                Ok(())
            }
        });

        Self { handle, telemetry }
    }

    pub fn latest(&self) -> Option<HostTelemetry> {
        self.telemetry.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<HostTelemetry>> {
        self.telemetry.clone()
    }

    pub fn poll_state(&self) -> PollState {
        self.handle.state()
    }

    pub fn stop(&self) {
        self.handle.stop();
    }
}

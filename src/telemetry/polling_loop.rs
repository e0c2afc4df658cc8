//! Recurring fetch primitive with explicit cancellation.

use crate::core::domain::error::VirtResult;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

/// Observable state of a running loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollState {
    /// Number of times the fetch function was invoked.
    pub invocations: u64,
    pub successes: u64,
    pub failures: u64,
    /// Message of the latest failed fetch; cleared by the next success.
    pub last_error: Option<String>,
    /// The session expired; the loop stopped and the caller must re-authenticate.
    pub auth_expired: bool,
    pub stopped: bool,
}

#[derive(Debug)]
struct Shared {
    stopped: Mutex<bool>,
    wake: Notify,
    state: watch::Sender<PollState>,
}

impl Shared {
    fn gate(&self) -> MutexGuard<'_, bool> {
        self.stopped.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn halt(&self) {
        *self.gate() = true;
        self.wake.notify_one();
        self.state.send_modify(|s| s.stopped = true);
    }
}

/// Configures and starts a polling loop.
///
/// The fetch runs immediately and then on a fixed `interval` schedule. Each
/// invocation runs in its own task, so a slow fetch does not delay the next
/// tick and completions may arrive out of order.
pub struct PollingLoop {
    interval: Duration,
    expiry: Option<watch::Receiver<bool>>,
    name: &'static str,
}

impl PollingLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            expiry: None,
            name: "poll",
        }
    }

    /// Label used in log events.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Stops the loop as soon as the receiver observes `true`.
    pub fn abort_on_expiry(mut self, expiry: watch::Receiver<bool>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Starts ticking. Must be called within a tokio runtime.
    pub fn start<F, Fut>(self, mut fetch: F) -> PollHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = VirtResult<()>> + Send + 'static,
    {
        let (state, state_rx) = watch::channel(PollState::default());
        let shared = Arc::new(Shared {
            stopped: Mutex::new(false),
            wake: Notify::new(),
            state,
        });

        let PollingLoop {
            interval: period,
            mut expiry,
            name,
        } = self;
        let scheduler = Arc::clone(&shared);

        let task = tokio::spawn(async move {
            info!(loop_name = name, interval_ms = period.as_millis() as u64, "starting polling loop");
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !invoke(&scheduler, &mut fetch, name) {
                            break;
                        }
                    }
                    _ = scheduler.wake.notified() => break,
                    _ = wait_expired(&mut expiry) => {
                        info!(loop_name = name, "session expired, stopping polling loop");
                        scheduler.state.send_modify(|s| s.auth_expired = true);
                        scheduler.halt();
                        break;
                    }
                }
            }
            debug!(loop_name = name, "polling loop finished");
        });

        PollHandle {
            shared,
            state: state_rx,
            task,
        }
    }
}

/// Calls `fetch` unless the loop was stopped. Returns `false` once stopped.
fn invoke<F, Fut>(shared: &Arc<Shared>, fetch: &mut F, name: &'static str) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = VirtResult<()>> + Send + 'static,
{
    // The fetch is created and spawned under the stop lock so that no
    // invocation can start after `stop()` returned.
    let gate = shared.gate();
    if *gate {
        return false;
    }
    let fut = fetch();
    shared.state.send_modify(|s| s.invocations += 1);

    let shared = Arc::clone(shared);
    tokio::spawn(async move {
        match fut.await {
            Ok(()) => shared.state.send_modify(|s| {
                s.successes += 1;
                s.last_error = None;
            }),
            Err(e) if e.is_auth_expired() => {
                warn!(loop_name = name, "fetch rejected by backend, stopping polling loop");
                shared.state.send_modify(|s| {
                    s.failures += 1;
                    s.auth_expired = true;
                    s.last_error = Some(e.to_string());
                });
                shared.halt();
            }
            Err(e) => {
                debug!(loop_name = name, error = %e, "fetch failed, will retry on next tick");
                shared.state.send_modify(|s| {
                    s.failures += 1;
                    s.last_error = Some(e.to_string());
                });
            }
        }
    });
    drop(gate);
    true
}

async fn wait_expired(expiry: &mut Option<watch::Receiver<bool>>) {
    match expiry {
        Some(rx) => {
            if rx.wait_for(|expired| *expired).await.is_err() {
                // Sender gone: the session can no longer expire.
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending::<()>().await,
    }
}

/// Handle to a running loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct PollHandle {
    shared: Arc<Shared>,
    state: watch::Receiver<PollState>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stops the loop. No invocation of the fetch function starts after this returns;
    /// invocations already in flight run to completion.
    pub fn stop(&self) {
        self.shared.halt();
    }

    pub fn is_running(&self) -> bool {
        !*self.shared.gate()
    }

    /// Snapshot of the loop's state.
    pub fn state(&self) -> PollState {
        self.state.borrow().clone()
    }

    /// Receiver for state changes.
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.clone()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
        self.task.abort();
    }
}

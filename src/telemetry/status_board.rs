//! Shared VM status state, merged from full status fetches.

use crate::core::domain::model::vm::{VmIdentity, VmLifecycleState, VmStatus, VmStatusMap};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    sequence: u64,
    status: VmStatus,
}

#[derive(Debug, Default)]
struct Board {
    entries: HashMap<VmIdentity, Entry>,
    /// Sequence of the newest full map merged so far.
    latest_full: u64,
}

/// Latest known status of every VM.
///
/// Each fetch draws a sequence number with [`StatusBoard::begin`] before the
/// request goes out. A VM's entry is only replaced by a fetch with a higher
/// sequence, so a slow, older response can never overwrite a newer one.
#[derive(Debug, Default)]
pub struct StatusBoard {
    next_sequence: AtomicU64,
    board: RwLock<Board>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the sequence number for a fetch about to be issued.
    pub fn begin(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Merges a full status map fetched under `sequence`.
    ///
    /// Returns how many VM entries were applied. A map newer than every full
    /// map merged so far replaces the board, so VMs it omits are dropped. An
    /// older map may only refresh entries it still outranks and never adds a
    /// VM back.
    pub async fn merge(&self, sequence: u64, statuses: VmStatusMap) -> usize {
        let mut board = self.board.write().await;
        let mut applied = 0;

        if sequence > board.latest_full {
            for (vm_id, status) in statuses {
                let newer = board
                    .entries
                    .get(&vm_id)
                    .is_none_or(|entry| entry.sequence < sequence);
                if newer {
                    board.entries.insert(vm_id, Entry { sequence, status });
                    applied += 1;
                }
            }
            board.latest_full = sequence;
            board.entries.retain(|_, entry| entry.sequence >= sequence);
        } else {
            for (vm_id, status) in statuses {
                if let Some(entry) = board
                    .entries
                    .get_mut(&vm_id)
                    .filter(|entry| entry.sequence < sequence)
                {
                    *entry = Entry { sequence, status };
                    applied += 1;
                }
            }
            debug!(sequence, latest = board.latest_full, applied, "merged stale status map");
        }
        applied
    }

    /// Current lifecycle state, `Unknown` for VMs never reported.
    pub async fn lifecycle_state(&self, vm_id: &VmIdentity) -> VmLifecycleState {
        self.board
            .read()
            .await
            .entries
            .get(vm_id)
            .map(|entry| entry.status.state)
            .unwrap_or_default()
    }

    pub async fn get(&self, vm_id: &VmIdentity) -> Option<VmStatus> {
        self.board
            .read()
            .await
            .entries
            .get(vm_id)
            .map(|entry| entry.status.clone())
    }

    pub async fn snapshot(&self) -> VmStatusMap {
        self.board
            .read()
            .await
            .entries
            .iter()
            .map(|(id, entry)| (id.clone(), entry.status.clone()))
            .collect()
    }
}

/*!
 * Snapshot Serializer
 *
 * Writes the live process table to the snapshot store as one JSON blob and
 * rebuilds it after a reset. Restore goes through the process registry: each
 * descriptor names a type, the factory for that type rebuilds the body from
 * the descriptor payload, and the kernel re-inserts it under its original id.
 */

use crate::core::data_structures::InlineString;
use crate::core::types::{Cycle, KernelResult, Pid, Priority};
use crate::process::registry::ProcessSeed;
use crate::process::types::{AdmitOptions, ProcessHeader, ProcessStatus};
use crate::scheduler::Kernel;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Persisted form of one process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDescriptor {
    pub id: Pid,
    pub priority: Priority,
    pub parent_id: Option<Pid>,
    pub type_name: InlineString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stable_key: Option<InlineString>,
    pub status: ProcessStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wake_cycle: Option<Cycle>,
    #[serde(default)]
    pub payload: Value,
}

/// Persisted form of the whole process table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub process_table: Vec<ProcessDescriptor>,
    pub next_id: Pid,
}

/// Outcome of a restore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestoreSummary {
    pub restored: usize,
    /// Descriptors dropped for a missing or failing factory, or an id/key clash
    pub dropped: usize,
}

impl Kernel {
    /// Capture every live process in id order
    pub fn snapshot(&self) -> Snapshot {
        let process_table = self
            .table
            .pids()
            .into_iter()
            .filter_map(|pid| self.table.find_by_id(pid))
            .filter(|entry| !entry.header().status().is_terminated())
            .map(|entry| {
                let header = entry.header();
                ProcessDescriptor {
                    id: header.id(),
                    priority: header.priority(),
                    parent_id: header.parent(),
                    type_name: header.type_name.clone(),
                    stable_key: header.stable_key.clone(),
                    status: header.status(),
                    wake_cycle: header.wake_cycle(),
                    payload: entry.process().map_or(Value::Null, |p| p.serialize()),
                }
            })
            .collect();

        Snapshot {
            process_table,
            next_id: self.table.next_id(),
        }
    }

    /// Write the snapshot blob under the configured key
    pub fn serialize(&self) -> KernelResult<()> {
        let snapshot = self.snapshot();
        let blob = serde_json::to_vec(&snapshot)?;
        self.store.store(&self.config.snapshot_key, &blob)?;
        info!(
            processes = snapshot.process_table.len(),
            next_id = snapshot.next_id,
            bytes = blob.len(),
            "Kernel serialized"
        );
        Ok(())
    }

    /// Replace the process table with the stored snapshot
    ///
    /// A missing blob leaves the kernel empty. Descriptors whose factory is
    /// missing or fails are logged and dropped; the rest keep their ids.
    pub fn restore(&mut self) -> KernelResult<RestoreSummary> {
        let Some(blob) = self.store.load(&self.config.snapshot_key)? else {
            self.table.clear();
            self.wakes.clear();
            info!(key = %self.config.snapshot_key, "No snapshot found, starting empty");
            return Ok(RestoreSummary::default());
        };
        let snapshot: Snapshot = serde_json::from_slice(&blob)?;
        Ok(self.restore_snapshot(snapshot))
    }

    /// Replace the process table with an in-memory snapshot
    pub fn restore_snapshot(&mut self, snapshot: Snapshot) -> RestoreSummary {
        self.table.clear();
        self.wakes.clear();

        let mut summary = RestoreSummary::default();
        for descriptor in snapshot.process_table {
            if self.restore_descriptor(descriptor) {
                summary.restored += 1;
            } else {
                summary.dropped += 1;
            }
        }
        self.table.reserve_next_id(snapshot.next_id);

        info!(
            restored = summary.restored,
            dropped = summary.dropped,
            next_id = self.table.next_id(),
            pending_wakes = self.wakes.len(),
            "Kernel restored"
        );
        summary
    }

    fn restore_descriptor(&mut self, descriptor: ProcessDescriptor) -> bool {
        let ProcessDescriptor {
            id,
            priority,
            parent_id,
            type_name,
            stable_key,
            status,
            wake_cycle,
            payload,
        } = descriptor;

        let seed = ProcessSeed {
            id,
            priority,
            parent: parent_id,
            payload,
        };
        let process = match self.registry.build(&type_name, seed) {
            Some(Ok(process)) => process,
            Some(Err(err)) => {
                error!(pid = id, type_name = %type_name, error = %format!("{:#}", err), "Process factory failed, dropping descriptor");
                return false;
            }
            None => {
                error!(pid = id, type_name = %type_name, "No factory registered, dropping descriptor");
                return false;
            }
        };

        let options = AdmitOptions {
            priority,
            parent: parent_id,
            stable_key,
        };
        let mut header = ProcessHeader::new(id, type_name, options);
        let pending_wake = match (status, wake_cycle) {
            (ProcessStatus::Sleeping, Some(cycle)) => {
                header.sleep_until(cycle);
                Some(cycle)
            }
            (ProcessStatus::Sleeping, None) => {
                debug!(pid = id, "Sleeping descriptor without wake cycle restored alive");
                None
            }
            (ProcessStatus::Alive, _) => None,
            (ProcessStatus::Suspended, _) => {
                header.suspend();
                None
            }
            (ProcessStatus::Terminated, _) => {
                header.terminate();
                None
            }
        };

        if let Err(conflict) = self.table.insert(header, process) {
            warn!(pid = id, conflict = ?conflict, "Descriptor rejected by the process table, dropping");
            return false;
        }
        if let Some(cycle) = pending_wake {
            self.wakes.register(cycle, id);
        }
        true
    }
}

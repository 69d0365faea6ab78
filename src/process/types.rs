/*!
 * Process Types
 * Kernel-owned process metadata and admission options
 */

use crate::core::data_structures::InlineString;
use crate::core::types::{Compute, Cycle, Pid, Priority};
use serde::{Deserialize, Serialize};

/// Process lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    /// Runnable; executed once per cycle when its priority is eligible
    Alive,
    /// Waiting for its wake cycle (or an explicit wake)
    Sleeping,
    /// Administratively paused; ignored until resumed
    Suspended,
    /// Marked for removal at the end-of-cycle sweep
    Terminated,
}

impl ProcessStatus {
    #[inline(always)]
    pub const fn is_alive(self) -> bool {
        matches!(self, Self::Alive)
    }

    #[inline(always)]
    pub const fn is_terminated(self) -> bool {
        matches!(self, Self::Terminated)
    }
}

/// Options supplied when admitting a process
#[derive(Debug, Clone, Default)]
pub struct AdmitOptions {
    pub priority: Priority,
    pub parent: Option<Pid>,
    pub stable_key: Option<InlineString>,
}

impl AdmitOptions {
    #[inline]
    #[must_use]
    pub fn new(priority: Priority) -> Self {
        Self {
            priority,
            parent: None,
            stable_key: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_parent(mut self, parent: Pid) -> Self {
        self.parent = Some(parent);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_stable_key(mut self, key: impl Into<InlineString>) -> Self {
        self.stable_key = Some(key.into());
        self
    }
}

/// Scheduling metadata the kernel keeps for every process
#[derive(Debug, Clone)]
pub struct ProcessHeader {
    pub(crate) id: Pid,
    pub(crate) priority: Priority,
    pub(crate) parent: Option<Pid>,
    pub(crate) type_name: InlineString,
    pub(crate) stable_key: Option<InlineString>,
    pub(crate) status: ProcessStatus,
    pub(crate) wake_cycle: Option<Cycle>,
    pub(crate) last_cycle: Option<Cycle>,
    pub(crate) compute_used: Compute,
    pub(crate) runs: u64,
}

impl ProcessHeader {
    pub(crate) fn new(id: Pid, type_name: InlineString, options: AdmitOptions) -> Self {
        Self {
            id,
            priority: options.priority,
            parent: options.parent,
            type_name,
            stable_key: options.stable_key,
            status: ProcessStatus::Alive,
            wake_cycle: None,
            last_cycle: None,
            compute_used: 0.0,
            runs: 0,
        }
    }

    #[inline(always)]
    pub fn id(&self) -> Pid {
        self.id
    }

    #[inline(always)]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    #[inline]
    pub fn parent(&self) -> Option<Pid> {
        self.parent
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[inline]
    pub fn stable_key(&self) -> Option<&str> {
        self.stable_key.as_deref()
    }

    #[inline(always)]
    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    #[inline]
    pub fn wake_cycle(&self) -> Option<Cycle> {
        self.wake_cycle
    }

    /// Cycle in which the process last executed
    #[inline]
    pub fn last_cycle(&self) -> Option<Cycle> {
        self.last_cycle
    }

    /// Total compute accounted to this process since admission (or restore)
    #[inline]
    pub fn compute_used(&self) -> Compute {
        self.compute_used
    }

    /// Number of execution steps taken since admission (or restore)
    #[inline]
    pub fn runs(&self) -> u64 {
        self.runs
    }

    pub(crate) fn sleep_until(&mut self, wake_cycle: Cycle) {
        self.status = ProcessStatus::Sleeping;
        self.wake_cycle = Some(wake_cycle);
    }

    pub(crate) fn wake(&mut self) {
        self.status = ProcessStatus::Alive;
        self.wake_cycle = None;
    }

    pub(crate) fn suspend(&mut self) {
        self.status = ProcessStatus::Suspended;
        self.wake_cycle = None;
    }

    pub(crate) fn terminate(&mut self) {
        self.status = ProcessStatus::Terminated;
        self.wake_cycle = None;
    }
}

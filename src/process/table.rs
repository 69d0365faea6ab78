/*!
 * Process Table
 *
 * Authoritative owner of every live process. Three views are kept in lock-step
 * with the primary map:
 * - stable key → pid (unique)
 * - type name → pids (admission order)
 * - priority → pids (the bucket queue, admission order within a bucket)
 *
 * Every structural change goes through `admit`, `insert`, `remove` or
 * `set_priority`, which update all views together.
 */

use super::traits::{Continuation, Process};
use super::types::{AdmitOptions, ProcessHeader, ProcessStatus};
use crate::core::data_structures::InlineString;
use crate::core::errors::KernelError;
use crate::core::types::{KernelResult, Pid, Priority};
use ahash::AHashMap;
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};
use tracing::{debug, warn};

/// A process together with its kernel-owned metadata
pub struct ProcessEntry {
    header: ProcessHeader,
    // None only while checked out for execution
    process: Option<Box<dyn Process>>,
    continuation: Option<Box<dyn Continuation>>,
}

impl ProcessEntry {
    #[inline(always)]
    pub fn header(&self) -> &ProcessHeader {
        &self.header
    }

    #[inline]
    pub fn process(&self) -> Option<&dyn Process> {
        self.process.as_deref()
    }

    /// Whether a multi-cycle execution is in progress
    #[inline]
    pub fn has_continuation(&self) -> bool {
        self.continuation.is_some()
    }

    pub(crate) fn header_mut(&mut self) -> &mut ProcessHeader {
        &mut self.header
    }
}

impl std::fmt::Debug for ProcessEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessEntry")
            .field("header", &self.header)
            .field("has_continuation", &self.continuation.is_some())
            .finish()
    }
}

/// Why a pre-identified process could not be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InsertConflict {
    /// `Pid::MAX` is the exhausted-counter sentinel and never names a process
    IdOutOfRange(Pid),
    DuplicateId(Pid),
    DuplicateKey(InlineString),
}

/// Process table with id, stable-key, type and priority indexes
pub struct ProcessTable {
    entries: AHashMap<Pid, ProcessEntry>,
    by_key: AHashMap<InlineString, Pid>,
    by_type: AHashMap<InlineString, Vec<Pid>>,
    buckets: BTreeMap<Priority, Vec<Pid>>,
    next_id: Pid,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            entries: AHashMap::new(),
            by_key: AHashMap::new(),
            by_type: AHashMap::new(),
            buckets: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Admit a new process, assigning the next sequential id
    ///
    /// If `options.stable_key` is already registered, nothing is inserted and
    /// the existing process's id is returned. `Pid::MAX` is never assigned;
    /// once the counter reaches it admission fails with `PidExhausted`.
    pub fn admit(
        &mut self,
        process: Box<dyn Process>,
        options: AdmitOptions,
    ) -> KernelResult<Pid> {
        if let Some(key) = options.stable_key.as_deref() {
            if let Some(&existing) = self.by_key.get(key) {
                debug!(pid = existing, stable_key = key, "Stable key already admitted");
                return Ok(existing);
            }
        }

        let id = self.next_id;
        let Some(next_id) = id.checked_add(1) else {
            warn!(next_id = id, "Process id space exhausted, admission refused");
            return Err(KernelError::PidExhausted(id));
        };
        self.next_id = next_id;

        let header = ProcessHeader::new(id, process.type_name().into(), options);
        debug!(
            pid = id,
            type_name = header.type_name(),
            priority = header.priority(),
            "Process admitted"
        );
        self.link(header, process);
        Ok(id)
    }

    /// Insert a process under an id chosen by the caller (restore path)
    pub(crate) fn insert(
        &mut self,
        header: ProcessHeader,
        process: Box<dyn Process>,
    ) -> Result<(), InsertConflict> {
        if header.id == Pid::MAX {
            return Err(InsertConflict::IdOutOfRange(header.id));
        }
        if self.entries.contains_key(&header.id) {
            return Err(InsertConflict::DuplicateId(header.id));
        }
        if let Some(key) = &header.stable_key {
            if self.by_key.contains_key(key.as_str()) {
                return Err(InsertConflict::DuplicateKey(key.clone()));
            }
        }

        self.next_id = self.next_id.max(header.id + 1);
        self.link(header, process);
        Ok(())
    }

    fn link(&mut self, header: ProcessHeader, process: Box<dyn Process>) {
        let id = header.id;
        if let Some(key) = &header.stable_key {
            self.by_key.insert(key.clone(), id);
        }
        self.by_type
            .entry(header.type_name.clone())
            .or_default()
            .push(id);
        self.buckets.entry(header.priority).or_default().push(id);
        self.entries.insert(
            id,
            ProcessEntry {
                header,
                process: Some(process),
                continuation: None,
            },
        );
    }

    /// Remove a process from the table and every index; absent ids are a no-op
    pub fn remove(&mut self, pid: Pid) -> Option<ProcessEntry> {
        let entry = self.entries.remove(&pid)?;
        let header = &entry.header;

        if let Some(key) = &header.stable_key {
            self.by_key.remove(key.as_str());
        }
        if let Some(pids) = self.by_type.get_mut(header.type_name.as_str()) {
            pids.retain(|&p| p != pid);
            if pids.is_empty() {
                self.by_type.remove(header.type_name.as_str());
            }
        }
        self.unbucket(pid, header.priority);

        debug!(pid, type_name = header.type_name(), "Process removed");
        Some(entry)
    }

    fn unbucket(&mut self, pid: Pid, priority: Priority) {
        if let Some(bucket) = self.buckets.get_mut(&priority) {
            if let Some(pos) = bucket.iter().position(|&p| p == pid) {
                bucket.remove(pos);
            }
            if bucket.is_empty() {
                self.buckets.remove(&priority);
            }
        }
    }

    /// Move a process to another priority bucket (appended at the back)
    pub fn set_priority(&mut self, pid: Pid, priority: Priority) -> bool {
        let Some(entry) = self.entries.get_mut(&pid) else {
            return false;
        };
        let previous = entry.header.priority;
        if previous == priority {
            return true;
        }
        entry.header.priority = priority;

        self.unbucket(pid, previous);
        self.buckets.entry(priority).or_default().push(pid);
        debug!(pid, from = previous, to = priority, "Process re-prioritized");
        true
    }

    #[inline]
    pub fn find_by_id(&self, pid: Pid) -> Option<&ProcessEntry> {
        self.entries.get(&pid)
    }

    pub fn find_by_stable_key(&self, key: &str) -> Option<&ProcessEntry> {
        self.by_key.get(key).and_then(|pid| self.entries.get(pid))
    }

    /// All processes of a type, in admission order
    pub fn find_all_by_type(&self, type_name: &str) -> Vec<&ProcessEntry> {
        self.pids_by_type(type_name)
            .iter()
            .filter_map(|pid| self.entries.get(pid))
            .collect()
    }

    #[inline]
    pub fn pid_by_stable_key(&self, key: &str) -> Option<Pid> {
        self.by_key.get(key).copied()
    }

    #[inline]
    pub fn pids_by_type(&self, type_name: &str) -> &[Pid] {
        self.by_type.get(type_name).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn get_mut(&mut self, pid: Pid) -> Option<&mut ProcessEntry> {
        self.entries.get_mut(&pid)
    }

    /// Distinct priority levels, ascending
    pub fn priorities(&self) -> Vec<Priority> {
        self.buckets.keys().copied().collect()
    }

    /// Lowest populated level strictly above `after`, or the lowest overall
    pub fn next_level_after(&self, after: Option<Priority>) -> Option<Priority> {
        match after {
            None => self.buckets.keys().next().copied(),
            Some(level) => self
                .buckets
                .range((Excluded(level), Unbounded))
                .next()
                .map(|(&priority, _)| priority),
        }
    }

    /// Members of one priority bucket, in admission order
    pub fn bucket(&self, priority: Priority) -> &[Pid] {
        self.buckets.get(&priority).map_or(&[], Vec::as_slice)
    }

    /// Take the process body out for execution
    ///
    /// The header stays in the table so lookups keep working while the
    /// process runs.
    pub(crate) fn checkout(
        &mut self,
        pid: Pid,
    ) -> Option<(Box<dyn Process>, Option<Box<dyn Continuation>>)> {
        let entry = self.entries.get_mut(&pid)?;
        let process = entry.process.take()?;
        Some((process, entry.continuation.take()))
    }

    /// Return a process body taken with `checkout`
    pub(crate) fn checkin(
        &mut self,
        pid: Pid,
        process: Box<dyn Process>,
        continuation: Option<Box<dyn Continuation>>,
    ) {
        match self.entries.get_mut(&pid) {
            Some(entry) => {
                entry.process = Some(process);
                entry.continuation = continuation;
            }
            None => warn!(pid, "Checked-in process no longer in table, dropping"),
        }
    }

    /// Ids of every process, in id (admission) order
    pub fn pids(&self) -> Vec<Pid> {
        let mut pids: Vec<Pid> = self.entries.keys().copied().collect();
        pids.sort_unstable();
        pids
    }

    /// Ids of every process awaiting the sweep
    pub fn terminated(&self) -> Vec<Pid> {
        let mut pids: Vec<Pid> = self
            .entries
            .values()
            .filter(|e| e.header.status == ProcessStatus::Terminated)
            .map(|e| e.header.id)
            .collect();
        pids.sort_unstable();
        pids
    }

    /// Ids of processes that name `parent` as their parent
    pub fn children_of(&self, parent: Pid) -> Vec<Pid> {
        let mut pids: Vec<Pid> = self
            .entries
            .values()
            .filter(|e| e.header.parent == Some(parent))
            .map(|e| e.header.id)
            .collect();
        pids.sort_unstable();
        pids
    }

    /// Next id `admit` will assign
    #[inline]
    pub fn next_id(&self) -> Pid {
        self.next_id
    }

    pub(crate) fn reserve_next_id(&mut self, next_id: Pid) {
        self.next_id = self.next_id.max(next_id);
    }

    /// Drop every process and index
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.by_key.clear();
        self.by_type.clear();
        self.buckets.clear();
        self.next_id = 1;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

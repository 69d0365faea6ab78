/*!
 * Wake Map
 *
 * Sleeping processes indexed by the cycle at which they must wake, so a cycle
 * only touches the processes that are due. Slots are ordered by cycle; a
 * resolution drains every slot at or before the current cycle, so a wake that
 * is overdue (restored from an old snapshot, or a cycle the kernel never ran)
 * still fires on the next resolution.
 *
 * A membership set mirrors the slots so registration and lookup stay O(1)
 * however many sleepers share a cycle.
 */

use crate::core::types::{Cycle, Pid};
use ahash::AHashSet;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct WakeMap {
    slots: BTreeMap<Cycle, Vec<Pid>>,
    members: AHashSet<(Cycle, Pid)>,
}

impl WakeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pid` to wake at `cycle`; duplicate registrations are ignored
    pub fn register(&mut self, cycle: Cycle, pid: Pid) {
        if self.members.insert((cycle, pid)) {
            self.slots.entry(cycle).or_default().push(pid);
        }
    }

    /// Drop a registration; the slot disappears with its last member
    pub fn unregister(&mut self, cycle: Cycle, pid: Pid) {
        if !self.members.remove(&(cycle, pid)) {
            return;
        }
        if let Some(slot) = self.slots.get_mut(&cycle) {
            slot.retain(|&p| p != pid);
            if slot.is_empty() {
                self.slots.remove(&cycle);
            }
        }
    }

    /// Remove and return every pid registered at or before `cycle`
    ///
    /// Slots are consumed whether or not the pids are still live.
    pub fn drain_due(&mut self, cycle: Cycle) -> Vec<(Cycle, Pid)> {
        let later = match cycle.checked_add(1) {
            Some(next) => self.slots.split_off(&next),
            None => BTreeMap::new(),
        };
        let due = std::mem::replace(&mut self.slots, later);
        let drained: Vec<(Cycle, Pid)> = due
            .into_iter()
            .flat_map(|(slot, pids)| pids.into_iter().map(move |pid| (slot, pid)))
            .collect();
        for member in &drained {
            self.members.remove(member);
        }
        drained
    }

    /// Pids registered for exactly `cycle`
    pub fn pending_at(&self, cycle: Cycle) -> &[Pid] {
        self.slots.get(&cycle).map_or(&[], Vec::as_slice)
    }

    /// Earliest cycle with a pending wake
    pub fn next_wake(&self) -> Option<Cycle> {
        self.slots.keys().next().copied()
    }

    pub fn contains(&self, cycle: Cycle, pid: Pid) -> bool {
        self.members.contains(&(cycle, pid))
    }

    /// Total number of registrations
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.members.clear();
    }
}

/*!
 * Scheduler Report
 * Per-cycle diagnostics for monitoring collaborators (not authoritative state)
 */

use super::governor::{Ceilings, OperatingMode};
use crate::core::errors::ProcessFault;
use crate::core::types::{Compute, Cycle, Priority};
use serde::Serialize;
use std::collections::BTreeMap;

/// Why the bucket walk ended before every level was visited
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CycleStop {
    Soft { used: Compute, ceiling: Compute },
    Hard { used: Compute, ceiling: Compute },
}

/// Diagnostics for the most recent cycle; overwritten every cycle
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerReport {
    pub cycle: Cycle,
    pub mode: OperatingMode,
    pub ceilings: Ceilings,
    /// Processes executed, by priority
    pub executed: BTreeMap<Priority, u32>,
    /// Alive processes skipped by mode gating, by priority
    pub skipped: BTreeMap<Priority, u32>,
    /// Sleeping processes seen during the walk
    pub sleeping: u32,
    /// Processes woken at the start of the cycle
    pub woken: u32,
    /// Terminated processes removed by the sweep
    pub swept: u32,
    /// Compute accounted per process type
    pub compute_by_type: BTreeMap<String, Compute>,
    pub faults: Vec<ProcessFault>,
    pub stop: Option<CycleStop>,
}

impl SchedulerReport {
    /// Clear for a new cycle, keeping allocations
    pub(crate) fn reset(&mut self, cycle: Cycle) {
        self.cycle = cycle;
        self.mode = OperatingMode::Normal;
        self.ceilings = Ceilings::default();
        self.executed.clear();
        self.skipped.clear();
        self.sleeping = 0;
        self.woken = 0;
        self.swept = 0;
        self.compute_by_type.clear();
        self.faults.clear();
        self.stop = None;
    }

    pub(crate) fn record_executed(&mut self, priority: Priority, type_name: &str, compute: Compute) {
        *self.executed.entry(priority).or_insert(0) += 1;
        match self.compute_by_type.get_mut(type_name) {
            Some(total) => *total += compute,
            None => {
                self.compute_by_type.insert(type_name.to_string(), compute);
            }
        }
    }

    pub(crate) fn record_skipped(&mut self, priority: Priority, count: u32) {
        if count > 0 {
            *self.skipped.entry(priority).or_insert(0) += count;
        }
    }

    pub fn executed_count(&self) -> u32 {
        self.executed.values().sum()
    }

    pub fn skipped_count(&self) -> u32 {
        self.skipped.values().sum()
    }

    /// Total compute accounted to processes this cycle
    pub fn compute_total(&self) -> Compute {
        self.compute_by_type.values().sum()
    }
}

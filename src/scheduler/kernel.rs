/*!
 * Kernel
 *
 * Owns the process table, the wake map and the budget governor, and runs one
 * scheduling cycle per `run_cycle` call:
 *
 * 1. reset the report
 * 2. derive the operating mode from the reserve (panic flag on Emergency)
 * 3. wake every sleeping process that is due
 * 4. walk priority levels ascending; gate levels by mode, stop at the
 *    soft/hard ceilings, execute Alive processes with crash containment
 * 5. sweep Terminated processes
 *
 * `run_cycle` never fails: the narrowest unit of work (one process) absorbs
 * every fault.
 */

use super::builder::KernelBuilder;
use super::config::KernelConfig;
use super::execution::{self, ExecutionOutcome};
use super::governor::{BudgetGovernor, Ceilings, OperatingMode};
use super::report::{CycleStop, SchedulerReport};
use super::wake::WakeMap;
use crate::clock::ClockProvider;
use crate::core::errors::{KernelError, ProcessFault};
use crate::core::types::{Cycle, KernelResult, Pid, Priority};
use crate::persistence::SnapshotStore;
use crate::process::context::{ContextRequests, LifecycleRequest, ProcessContext};
use crate::process::registry::ProcessRegistry;
use crate::process::table::{ProcessEntry, ProcessTable};
use crate::process::traits::Process;
use crate::process::types::{AdmitOptions, ProcessHeader, ProcessStatus};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Cooperative, budget-governed process scheduler
pub struct Kernel {
    pub(crate) table: ProcessTable,
    pub(crate) wakes: WakeMap,
    pub(crate) registry: ProcessRegistry,
    pub(crate) store: Arc<dyn SnapshotStore>,
    pub(crate) config: KernelConfig,
    governor: BudgetGovernor,
    clock: Arc<dyn ClockProvider>,
    report: SchedulerReport,
    mode: Option<OperatingMode>,
    panic_active: bool,
}

impl Kernel {
    pub fn builder() -> KernelBuilder {
        KernelBuilder::new()
    }

    pub(crate) fn from_parts(
        clock: Arc<dyn ClockProvider>,
        store: Arc<dyn SnapshotStore>,
        registry: ProcessRegistry,
        config: KernelConfig,
    ) -> Self {
        info!(
            safe_watermark = config.budget.safe_watermark,
            emergency_watermark = config.budget.emergency_watermark,
            safe_priority_threshold = config.budget.safe_priority_threshold,
            factories = registry.len(),
            "Kernel initialized"
        );

        Self {
            table: ProcessTable::new(),
            wakes: WakeMap::new(),
            registry,
            store,
            governor: BudgetGovernor::new(config.budget.clone()),
            config,
            clock,
            report: SchedulerReport::default(),
            mode: None,
            panic_active: false,
        }
    }

    // =========================================================================
    // Process table
    // =========================================================================

    /// Admit a process and return its id
    ///
    /// Admitting with a stable key that is already registered returns the
    /// existing id and drops `process`. Fails with `PidExhausted` once every
    /// assignable id has been used.
    pub fn admit(
        &mut self,
        process: Box<dyn Process>,
        options: AdmitOptions,
    ) -> KernelResult<Pid> {
        self.table.admit(process, options)
    }

    /// Remove a process from every index; returns false if it was absent
    pub fn remove(&mut self, pid: Pid) -> bool {
        match self.table.remove(pid) {
            Some(entry) => {
                if let Some(wake_cycle) = entry.header().wake_cycle() {
                    self.wakes.unregister(wake_cycle, pid);
                }
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn find_by_id(&self, pid: Pid) -> Option<&ProcessEntry> {
        self.table.find_by_id(pid)
    }

    #[inline]
    pub fn find_by_stable_key(&self, key: &str) -> Option<&ProcessEntry> {
        self.table.find_by_stable_key(key)
    }

    #[inline]
    pub fn find_all_by_type(&self, type_name: &str) -> Vec<&ProcessEntry> {
        self.table.find_all_by_type(type_name)
    }

    pub fn children_of(&self, parent: Pid) -> Vec<Pid> {
        self.table.children_of(parent)
    }

    #[inline]
    pub fn table(&self) -> &ProcessTable {
        &self.table
    }

    #[inline]
    pub fn wake_map(&self) -> &WakeMap {
        &self.wakes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    // =========================================================================
    // Administrative lifecycle control
    // =========================================================================

    /// Pause a process until `resume`; clears any pending wake
    pub fn suspend(&mut self, pid: Pid) -> KernelResult<()> {
        self.clear_wake(pid)?;
        self.header_mut(pid)?.suspend();
        debug!(pid, "Process suspended");
        Ok(())
    }

    /// Unpause a suspended process; other states are left alone
    pub fn resume(&mut self, pid: Pid) -> KernelResult<()> {
        let header = self.header_mut(pid)?;
        if header.status == ProcessStatus::Suspended {
            header.status = ProcessStatus::Alive;
            debug!(pid, "Process resumed");
        }
        Ok(())
    }

    /// Put a process to sleep for `cycles` cycles from the current cycle
    pub fn sleep(&mut self, pid: Pid, cycles: u64) -> KernelResult<()> {
        let wake_cycle = self.clock.cycle().saturating_add(cycles);
        self.clear_wake(pid)?;
        self.header_mut(pid)?.sleep_until(wake_cycle);
        self.wakes.register(wake_cycle, pid);
        debug!(pid, wake_cycle, "Process sleeping");
        Ok(())
    }

    /// Wake a sleeping process immediately
    pub fn wake(&mut self, pid: Pid) -> KernelResult<()> {
        if self.header_mut(pid)?.status != ProcessStatus::Sleeping {
            return Ok(());
        }
        self.clear_wake(pid)?;
        self.header_mut(pid)?.wake();
        debug!(pid, "Process woken");
        Ok(())
    }

    /// Mark a process Terminated; it is removed at the end of the next cycle
    pub fn terminate(&mut self, pid: Pid) -> KernelResult<()> {
        self.clear_wake(pid)?;
        self.header_mut(pid)?.terminate();
        debug!(pid, "Process terminated");
        Ok(())
    }

    pub fn set_priority(&mut self, pid: Pid, priority: Priority) -> KernelResult<()> {
        if self.table.set_priority(pid, priority) {
            Ok(())
        } else {
            Err(KernelError::ProcessNotFound(pid))
        }
    }

    fn header_mut(&mut self, pid: Pid) -> KernelResult<&mut ProcessHeader> {
        self.table
            .get_mut(pid)
            .map(ProcessEntry::header_mut)
            .ok_or(KernelError::ProcessNotFound(pid))
    }

    fn clear_wake(&mut self, pid: Pid) -> KernelResult<()> {
        let pending = self.header_mut(pid)?.wake_cycle;
        if let Some(wake_cycle) = pending {
            self.wakes.unregister(wake_cycle, pid);
        }
        Ok(())
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Diagnostics for the last completed cycle
    #[inline]
    pub fn report(&self) -> &SchedulerReport {
        &self.report
    }

    /// Whether the reserve is below the emergency watermark
    #[inline]
    pub fn is_panic_active(&self) -> bool {
        self.panic_active
    }

    /// Mode of the last cycle (None before the first cycle)
    #[inline]
    pub fn mode(&self) -> Option<OperatingMode> {
        self.mode
    }

    #[inline]
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    #[inline]
    pub fn clock(&self) -> &dyn ClockProvider {
        self.clock.as_ref()
    }

    #[inline]
    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Register factories after construction (before `restore`)
    #[inline]
    pub fn registry_mut(&mut self) -> &mut ProcessRegistry {
        &mut self.registry
    }

    // =========================================================================
    // Scheduling cycle
    // =========================================================================

    /// Run one scheduling cycle and return its report
    pub fn run_cycle(&mut self) -> &SchedulerReport {
        let cycle = self.clock.cycle();
        let _span = tracing::debug_span!("cycle", cycle).entered();

        self.report.reset(cycle);
        let mode = self.update_mode();
        self.report.mode = mode;

        self.resolve_wakes(cycle);

        let ceilings = self.governor.ceilings(mode, self.clock.as_ref());
        self.report.ceilings = ceilings;

        self.walk_levels(cycle, mode, ceilings);
        self.sweep();

        debug!(
            executed = self.report.executed_count(),
            skipped = self.report.skipped_count(),
            sleeping = self.report.sleeping,
            faults = self.report.faults.len(),
            used = self.clock.used(),
            "Cycle complete"
        );
        &self.report
    }

    fn update_mode(&mut self) -> OperatingMode {
        let reserve = self.clock.reserve();
        let mode = self.governor.mode_for(reserve);

        match self.mode {
            Some(previous) if previous != mode => {
                info!(from = %previous, to = %mode, reserve, "Operating mode changed");
            }
            None => debug!(mode = %mode, reserve, "Initial operating mode"),
            _ => {}
        }

        if mode == OperatingMode::Emergency {
            if !self.panic_active {
                self.panic_active = true;
                error!(
                    reserve,
                    watermark = self.governor.config().emergency_watermark,
                    "Reserve depleted: emergency mode, only priority 0 runs"
                );
            }
        } else if self.panic_active {
            self.panic_active = false;
            warn!(reserve, mode = %mode, "Reserve recovered: emergency cleared");
        }

        self.mode = Some(mode);
        mode
    }

    fn resolve_wakes(&mut self, cycle: Cycle) {
        for (slot, pid) in self.wakes.drain_due(cycle) {
            let Some(entry) = self.table.get_mut(pid) else {
                trace!(pid, slot, "Stale wake entry ignored");
                continue;
            };
            let header = entry.header_mut();
            let due = header.wake_cycle.map_or(false, |wake_cycle| wake_cycle <= cycle);
            if header.status == ProcessStatus::Sleeping && due {
                if slot < cycle {
                    debug!(pid, slot, "Overdue wake resolved");
                }
                header.wake();
                self.report.woken += 1;
            }
        }
    }

    fn walk_levels(&mut self, cycle: Cycle, mode: OperatingMode, ceilings: Ceilings) {
        // Levels are looked up one at a time so a level created mid-walk
        // above the current one is still visited this cycle
        let mut cursor = None;
        while let Some(priority) = self.table.next_level_after(cursor) {
            cursor = Some(priority);
            // Snapshot: admissions and re-prioritizations during the walk
            // must not disturb the level being iterated
            let members = self.table.bucket(priority).to_vec();

            if !self.governor.is_eligible(mode, priority) {
                let alive = members
                    .iter()
                    .filter(|&&pid| {
                        self.table
                            .find_by_id(pid)
                            .map_or(false, |e| e.header().status().is_alive())
                    })
                    .count();
                self.report.record_skipped(priority, alive as u32);
                continue;
            }

            for pid in members {
                if let Some(stop) = self.ceiling_stop(ceilings) {
                    match stop {
                        CycleStop::Hard { used, ceiling } => {
                            warn!(used, ceiling, "Hard compute ceiling reached, ending cycle")
                        }
                        CycleStop::Soft { used, ceiling } => {
                            debug!(used, ceiling, "Soft compute ceiling reached, ending cycle")
                        }
                    }
                    self.report.stop = Some(stop);
                    return;
                }

                let Some(entry) = self.table.find_by_id(pid) else {
                    continue;
                };
                let header = entry.header();
                match header.status() {
                    ProcessStatus::Sleeping => {
                        self.report.sleeping += 1;
                        if let Some(wake_cycle) = header.wake_cycle() {
                            self.wakes.register(wake_cycle, pid);
                        }
                    }
                    ProcessStatus::Alive if header.last_cycle() != Some(cycle) => {
                        self.execute(pid, cycle);
                    }
                    _ => {}
                }
            }
        }
    }

    fn ceiling_stop(&self, ceilings: Ceilings) -> Option<CycleStop> {
        let used = self.clock.used();
        if used >= ceilings.hard {
            Some(CycleStop::Hard {
                used,
                ceiling: ceilings.hard,
            })
        } else if used >= ceilings.soft {
            Some(CycleStop::Soft {
                used,
                ceiling: ceilings.soft,
            })
        } else {
            None
        }
    }

    fn execute(&mut self, pid: Pid, cycle: Cycle) {
        let Some(entry) = self.table.find_by_id(pid) else {
            return;
        };
        let header = entry.header();
        let priority = header.priority();
        let parent = header.parent();
        let type_name = header.type_name.clone();

        let Some((mut process, mut continuation)) = self.table.checkout(pid) else {
            warn!(pid, "Process body missing, skipping");
            return;
        };

        let before = self.clock.used();
        let mut ctx = ProcessContext::new(pid, cycle, priority, parent, &mut self.table);
        let outcome = execution::drive(process.as_mut(), &mut continuation, &mut ctx);
        let requests = ctx.into_requests();
        let compute = (self.clock.used() - before).max(0.0);

        self.table.checkin(pid, process, continuation);
        self.report.record_executed(priority, &type_name, compute);

        if let Some(entry) = self.table.get_mut(pid) {
            let header = entry.header_mut();
            header.last_cycle = Some(cycle);
            header.compute_used += compute;
            header.runs += 1;
        }

        trace!(pid, type_name = %type_name, compute, outcome = ?outcome, "Process executed");

        match outcome {
            ExecutionOutcome::Faulted { kind, message } => {
                error!(
                    pid,
                    type_name = %type_name,
                    kind = ?kind,
                    error = %message,
                    "Process faulted, terminating"
                );
                if let Some(entry) = self.table.get_mut(pid) {
                    entry.header_mut().terminate();
                }
                self.report.faults.push(ProcessFault {
                    pid,
                    type_name,
                    cycle,
                    kind,
                    message,
                });
            }
            ExecutionOutcome::Completed | ExecutionOutcome::Yielded => {
                self.apply_requests(pid, cycle, requests);
            }
        }
    }

    fn apply_requests(&mut self, pid: Pid, cycle: Cycle, requests: ContextRequests) {
        if !requests.spawned.is_empty() {
            debug!(pid, children = ?requests.spawned, "Children admitted");
        }
        if let Some(priority) = requests.priority {
            self.table.set_priority(pid, priority);
        }

        let Some(lifecycle) = requests.lifecycle else {
            return;
        };
        let Some(entry) = self.table.get_mut(pid) else {
            return;
        };
        let header = entry.header_mut();
        match lifecycle {
            LifecycleRequest::Sleep(cycles) => {
                let wake_cycle = cycle.saturating_add(cycles);
                header.sleep_until(wake_cycle);
                self.wakes.register(wake_cycle, pid);
                trace!(pid, wake_cycle, "Sleep registered");
            }
            LifecycleRequest::Suspend => header.suspend(),
            LifecycleRequest::Terminate => header.terminate(),
        }
    }

    fn sweep(&mut self) {
        for pid in self.table.terminated() {
            if let Some(entry) = self.table.remove(pid) {
                if let Some(wake_cycle) = entry.header().wake_cycle() {
                    self.wakes.unregister(wake_cycle, pid);
                }
                self.report.swept += 1;
            }
        }
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("processes", &self.table.len())
            .field("pending_wakes", &self.wakes.len())
            .field("mode", &self.mode)
            .field("panic_active", &self.panic_active)
            .finish()
    }
}

/*!
 * Process Context
 *
 * The only handle a running process gets on the kernel. A process may change
 * its own lifecycle (sleep, suspend, terminate, priority) and admit children;
 * it can look other processes up by id only. Lifecycle requests are applied by
 * the scheduler once the current execution step returns.
 */

use super::table::ProcessTable;
use super::traits::Process;
use super::types::{AdmitOptions, ProcessStatus};
use crate::core::types::{Cycle, KernelResult, Pid, Priority};

/// Lifecycle change requested by a process during one execution step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LifecycleRequest {
    Sleep(u64),
    Suspend,
    Terminate,
}

/// Everything a process asked for during one execution step
#[derive(Debug, Default)]
pub(crate) struct ContextRequests {
    pub lifecycle: Option<LifecycleRequest>,
    pub priority: Option<Priority>,
    pub spawned: Vec<Pid>,
}

/// Execution context passed to `Process::run` and `Continuation::resume`
pub struct ProcessContext<'a> {
    pid: Pid,
    cycle: Cycle,
    priority: Priority,
    parent: Option<Pid>,
    table: &'a mut ProcessTable,
    requests: ContextRequests,
}

impl<'a> ProcessContext<'a> {
    pub(crate) fn new(
        pid: Pid,
        cycle: Cycle,
        priority: Priority,
        parent: Option<Pid>,
        table: &'a mut ProcessTable,
    ) -> Self {
        Self {
            pid,
            cycle,
            priority,
            parent,
            table,
            requests: ContextRequests::default(),
        }
    }

    pub(crate) fn into_requests(self) -> ContextRequests {
        self.requests
    }

    /// Id of the running process
    #[inline(always)]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Current cycle number
    #[inline(always)]
    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    /// Priority the process is running at this cycle
    #[inline]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    #[inline]
    pub fn parent(&self) -> Option<Pid> {
        self.parent
    }

    /// Sleep for `cycles` cycles; the process wakes at `cycle() + cycles`
    ///
    /// `sleep(0)` wakes on the next cycle.
    pub fn sleep(&mut self, cycles: u64) {
        self.request(LifecycleRequest::Sleep(cycles));
    }

    /// Pause until the host resumes this process
    pub fn suspend(&mut self) {
        self.request(LifecycleRequest::Suspend);
    }

    // Terminate cannot be overridden by a later request in the same step
    fn request(&mut self, request: LifecycleRequest) {
        if self.requests.lifecycle != Some(LifecycleRequest::Terminate) {
            self.requests.lifecycle = Some(request);
        }
    }

    /// Mark for removal at the end of this cycle
    pub fn terminate(&mut self) {
        self.requests.lifecycle = Some(LifecycleRequest::Terminate);
    }

    /// Change priority; takes effect from the next bucket walk
    pub fn set_priority(&mut self, priority: Priority) {
        self.requests.priority = Some(priority);
    }

    /// Admit a child process; its parent defaults to the running process
    ///
    /// Same stable-key semantics as `Kernel::admit`: an already registered
    /// key returns the existing id.
    pub fn spawn(
        &mut self,
        process: Box<dyn Process>,
        mut options: AdmitOptions,
    ) -> KernelResult<Pid> {
        if options.parent.is_none() {
            options.parent = Some(self.pid);
        }
        let pid = self.table.admit(process, options)?;
        self.requests.spawned.push(pid);
        Ok(pid)
    }

    pub fn find_by_stable_key(&self, key: &str) -> Option<Pid> {
        self.table.pid_by_stable_key(key)
    }

    pub fn find_all_by_type(&self, type_name: &str) -> Vec<Pid> {
        self.table.pids_by_type(type_name).to_vec()
    }

    /// Status of any process in the table
    pub fn status_of(&self, pid: Pid) -> Option<ProcessStatus> {
        self.table.find_by_id(pid).map(|e| e.header().status())
    }
}

/*!
 * Cycle Kernel Library
 * Cooperative, budget-governed process scheduler exposed as a library
 */

pub mod clock;
pub mod core;
pub mod monitoring;
pub mod persistence;
pub mod process;
pub mod scheduler;

// Re-exports
pub use crate::core::*;
pub use clock::{ClockProvider, ManualClock};
pub use monitoring::{emit_report, init_tracing};
pub use persistence::{FileStore, MemoryStore, ProcessDescriptor, RestoreSummary, Snapshot, SnapshotStore};
pub use process::{
    AdmitOptions, Continuation, Process, ProcessContext, ProcessEntry, ProcessHeader,
    ProcessRegistry, ProcessSeed, ProcessStatus, ProcessTable, RunOutcome, Step,
};
pub use scheduler::{
    BudgetConfig, CycleStop, Kernel, KernelBuilder, KernelConfig, OperatingMode, SchedulerReport,
    WakeMap,
};

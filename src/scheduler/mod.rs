/*!
 * Scheduler Module
 * Kernel, budget governor, wake map and per-cycle reporting
 */

mod builder;
pub mod config;
mod execution;
pub mod governor;
mod kernel;
pub mod report;
pub mod wake;

// Re-export public API
pub use builder::KernelBuilder;
pub use config::{BudgetConfig, KernelConfig};
pub use governor::{BudgetGovernor, Ceilings, OperatingMode};
pub use kernel::Kernel;
pub use report::{CycleStop, SchedulerReport};
pub use wake::WakeMap;

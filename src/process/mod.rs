/*!
 * Process Module
 * Process contract, process table and factory registry
 */

pub mod context;
pub mod registry;
pub mod table;
pub mod traits;
pub mod types;

pub use context::ProcessContext;
pub use registry::{ProcessFactory, ProcessRegistry, ProcessSeed};
pub use table::{ProcessEntry, ProcessTable};
pub use traits::{Continuation, Process, RunOutcome, Step};
pub use types::{AdmitOptions, ProcessHeader, ProcessStatus};

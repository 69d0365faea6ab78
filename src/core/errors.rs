/*!
 * Error Types
 * Centralized error handling with thiserror and miette diagnostics
 *
 * Only host-facing operations fail with these errors. Faults raised inside a
 * process never leave the scheduler loop; see `ProcessFault`.
 */

use super::data_structures::InlineString;
use super::types::{Cycle, Pid};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified kernel error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum KernelError {
    #[error("Process {0} not found")]
    #[diagnostic(
        code(kernel::process_not_found),
        help("The process may have been swept after terminating, or was never admitted.")
    )]
    ProcessNotFound(Pid),

    #[error("Process id space exhausted at {0}")]
    #[diagnostic(
        code(kernel::pid_exhausted),
        help("Every assignable process id has been handed out. Reset the kernel from an empty snapshot to start numbering again.")
    )]
    PidExhausted(Pid),

    #[error("Storage error: {0}")]
    #[diagnostic(
        code(kernel::storage_error),
        help("The snapshot store rejected the operation. Check the store backend.")
    )]
    Storage(InlineString),

    #[error("Snapshot codec error: {0}")]
    #[diagnostic(
        code(kernel::codec_error),
        help("The snapshot blob is not a valid kernel snapshot. It may be truncated or from another format.")
    )]
    Codec(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(kernel::configuration_error),
        help("Invalid configuration. Review watermarks and ceiling fractions.")
    )]
    Configuration(InlineString),

    #[error("I/O error: {0}")]
    #[diagnostic(
        code(kernel::io_error),
        help("Filesystem operation failed. Check the storage path and permissions.")
    )]
    Io(InlineString),
}

impl From<std::io::Error> for KernelError {
    fn from(err: std::io::Error) -> Self {
        KernelError::Io(err.to_string().into())
    }
}

/// Where a process fault was raised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// `run` or a continuation returned an error
    Error,
    /// `run` or a continuation panicked
    Panic,
}

/// A contained process failure, recorded in the cycle report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessFault {
    pub pid: Pid,
    pub type_name: InlineString,
    pub cycle: Cycle,
    pub kind: FaultKind,
    /// Full error chain (`{:#}`) or panic message
    pub message: String,
}

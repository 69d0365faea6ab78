/*!
 * Core Types
 * Common types used across the kernel
 */

/// Process ID type, assigned sequentially by the process table
pub type Pid = u32;

/// Priority level (0-255, lower runs earlier; 0 runs in every operating mode)
pub type Priority = u8;

/// Cycle number reported by the clock provider
pub type Cycle = u64;

/// Compute units as metered by the host (fractional)
pub type Compute = f64;

/// Common result type for kernel operations
pub type KernelResult<T> = Result<T, super::errors::KernelError>;

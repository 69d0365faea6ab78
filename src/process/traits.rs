/*!
 * Process Traits
 *
 * The contract every schedulable unit of work implements. Multi-cycle work is
 * expressed as an explicit state machine: `run` hands the kernel a
 * [`Continuation`], and the kernel steps it exactly once per cycle until it
 * reports [`Step::Done`].
 */

use super::context::ProcessContext;
use serde_json::Value;

/// Result of a fresh `run` call
pub enum RunOutcome {
    /// All work for this cycle finished synchronously
    Done,
    /// Work continues over several cycles; the kernel stores and steps this
    Yielded(Box<dyn Continuation>),
}

impl RunOutcome {
    /// Convenience for wrapping a continuation
    pub fn yielded(continuation: impl Continuation + 'static) -> Self {
        Self::Yielded(Box::new(continuation))
    }
}

impl std::fmt::Debug for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Done => f.write_str("Done"),
            Self::Yielded(_) => f.write_str("Yielded(..)"),
        }
    }
}

/// Result of stepping a continuation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// More steps remain; resume on a later cycle
    Yield,
    /// The multi-cycle execution has finished
    Done,
}

/// Suspended multi-cycle execution
pub trait Continuation {
    /// Advance to the next yield point
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> anyhow::Result<Step>;
}

/// A schedulable unit of long-lived work
///
/// Any error returned (or panic raised) from `run` or from a continuation is
/// contained by the scheduler: the process is terminated and the fault is
/// reported, other processes keep running.
pub trait Process {
    /// Type name used for factory lookup on restore and for accounting
    fn type_name(&self) -> &str;

    /// Execute one cycle's worth of work
    fn run(&mut self, ctx: &mut ProcessContext<'_>) -> anyhow::Result<RunOutcome>;

    /// Minimal state needed to rebuild this process after a total state loss
    fn serialize(&self) -> Value {
        Value::Null
    }

    /// Rebuild internal state from a payload produced by `serialize`
    ///
    /// Must not assume any other process has been restored yet.
    fn restore(&mut self, _payload: Value) -> anyhow::Result<()> {
        Ok(())
    }
}

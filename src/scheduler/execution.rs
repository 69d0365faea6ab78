/*!
 * Process Execution
 *
 * Drives one execution step of a process and contains any failure at the
 * process boundary. Errors returned from `run`/`resume` and panics raised
 * inside them are both turned into an `ExecutionOutcome::Faulted`; the
 * continuation is dropped in either case.
 */

use crate::core::errors::FaultKind;
use crate::process::context::ProcessContext;
use crate::process::traits::{Continuation, Process, RunOutcome, Step};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// What happened during one execution step
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ExecutionOutcome {
    /// Finished this cycle's work (fresh run or final continuation step)
    Completed,
    /// A continuation is stored and will be resumed next cycle
    Yielded,
    Faulted { kind: FaultKind, message: String },
}

/// Execute one step: resume the stored continuation, or run fresh
///
/// A fresh run that yields a continuation has that continuation stepped
/// immediately, so multi-cycle work makes progress on its first cycle.
pub(crate) fn drive(
    process: &mut dyn Process,
    continuation: &mut Option<Box<dyn Continuation>>,
    ctx: &mut ProcessContext<'_>,
) -> ExecutionOutcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| step(process, continuation, ctx)));

    match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => {
            *continuation = None;
            ExecutionOutcome::Faulted {
                kind: FaultKind::Error,
                message: format!("{:#}", err),
            }
        }
        Err(payload) => {
            *continuation = None;
            ExecutionOutcome::Faulted {
                kind: FaultKind::Panic,
                message: panic_message(payload.as_ref()),
            }
        }
    }
}

fn step(
    process: &mut dyn Process,
    continuation: &mut Option<Box<dyn Continuation>>,
    ctx: &mut ProcessContext<'_>,
) -> anyhow::Result<ExecutionOutcome> {
    if let Some(active) = continuation.as_mut() {
        return match active.resume(ctx)? {
            Step::Yield => Ok(ExecutionOutcome::Yielded),
            Step::Done => {
                *continuation = None;
                Ok(ExecutionOutcome::Completed)
            }
        };
    }

    match process.run(ctx)? {
        RunOutcome::Done => Ok(ExecutionOutcome::Completed),
        RunOutcome::Yielded(mut fresh) => match fresh.resume(ctx)? {
            Step::Yield => {
                *continuation = Some(fresh);
                Ok(ExecutionOutcome::Yielded)
            }
            Step::Done => Ok(ExecutionOutcome::Completed),
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked with a non-string payload".to_string()
    }
}

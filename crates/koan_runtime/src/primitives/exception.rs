//! Exception primitives: `signal` plus the handler actions. Each action
//! locates the running handler for the receiver and turns it into an
//! unwind.

use crate::activation::{Unwind, UnwindAction};
use crate::core::Value;
use crate::error::{ErrKind, RtError};
use crate::object::PrimResult;
use crate::runtime::Runtime;

use super::native;

fn prim_signal(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    rt.signal_exception(recv);
    PrimResult::Done
}

fn take_active(rt: &mut Runtime, exc: Value) -> Result<crate::activation::ActiveHandler, RtError> {
    match rt.active.iter().rposition(|ah| ah.exc == exc) {
        Some(pos) => Ok(rt.active.remove(pos)),
        None => Err(RtError::new(
            ErrKind::Error,
            "no handler is active for this exception",
        )),
    }
}

/// `resume: v` — continue at the signal point; `v` becomes the value of
/// the failed operation.
fn prim_resume(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let ah = match take_active(rt, recv) {
        Ok(ah) => ah,
        Err(e) => return PrimResult::Err(e),
    };
    if let Some(entry) = rt.handlers.iter_mut().find(|h| h.id == ah.entry_id) {
        entry.disabled = false;
    }
    rt.unwind = Some(Unwind {
        target: ah.signal_depth,
        action: UnwindAction::Deliver(args[0]),
    });
    rt.unwind_paused = false;
    PrimResult::Done
}

/// `return: v` — the whole `on:do:` expression completes with `v`.
fn prim_return(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let ah = match take_active(rt, recv) {
        Ok(ah) => ah,
        Err(e) => return PrimResult::Err(e),
    };
    let Some(pos) = rt.handlers.iter().position(|h| h.id == ah.entry_id) else {
        return PrimResult::Err(RtError::new(ErrKind::Error, "handler entry is gone"));
    };
    let entry = rt.handlers.remove(pos);
    rt.unwind = Some(Unwind {
        target: entry.owner_depth,
        action: UnwindAction::Deliver(args[0]),
    });
    rt.unwind_paused = false;
    PrimResult::Done
}

/// `retry` — re-evaluate the protected block from the beginning.
fn prim_retry(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    let ah = match take_active(rt, recv) {
        Ok(ah) => ah,
        Err(e) => return PrimResult::Err(e),
    };
    let Some(entry) = rt.handlers.iter().find(|h| h.id == ah.entry_id) else {
        return PrimResult::Err(RtError::new(ErrKind::Error, "handler entry is gone"));
    };
    let target = entry.owner_depth;
    rt.unwind = Some(Unwind {
        target,
        action: UnwindAction::Retry {
            entry_id: ah.entry_id,
        },
    });
    rt.unwind_paused = false;
    PrimResult::Done
}

/// `pass` — unwind the handler frames and continue the search outward;
/// the passing handler stays disabled.
fn prim_pass(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    let ah = match take_active(rt, recv) {
        Ok(ah) => ah,
        Err(e) => return PrimResult::Err(e),
    };
    rt.unwind = Some(Unwind {
        target: ah.signal_depth,
        action: UnwindAction::Resignal(ah.exc),
    });
    rt.unwind_paused = false;
    PrimResult::Done
}

pub(crate) fn install(rt: &mut Runtime) {
    let exception = rt.kernel.exception;
    native(rt, exception, "signal", 0, prim_signal);
    native(rt, exception, "resume:", 1, prim_resume);
    native(rt, exception, "return:", 1, prim_return);
    native(rt, exception, "retry", 0, prim_retry);
    native(rt, exception, "pass", 0, prim_pass);
}

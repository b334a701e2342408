//! Block primitives: invocation, the loop drivers, and the two dynamic
//! extents (`on:do:` handlers and `ensure:` cleanups).

use crate::activation::{Cont, HandlerEntry, WhilePhase};
use crate::core::Value;
use crate::error::{ErrKind, RtError};
use crate::object::PrimResult;
use crate::runtime::Runtime;

use super::native;

fn prim_value(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    match rt.push_block(recv, args) {
        Ok(_) => PrimResult::Done,
        Err(e) => PrimResult::Err(e),
    }
}

fn check_block(v: Value, what: &str) -> Result<(), RtError> {
    match v {
        Value::Block(_) => Ok(()),
        other => Err(RtError::new(
            ErrKind::Type,
            format!("{} must be a block, got {}", what, other.type_name()),
        )),
    }
}

fn while_loop(rt: &mut Runtime, recv: Value, args: &[Value], until: bool) -> PrimResult {
    if let Err(e) = check_block(recv, "loop condition") {
        return PrimResult::Err(e);
    }
    if let Err(e) = check_block(args[0], "loop body") {
        return PrimResult::Err(e);
    }
    rt.cur_act().work.push(Cont::While {
        cond: recv,
        body: args[0],
        phase: WhilePhase::Start,
        until,
    });
    PrimResult::Done
}

fn prim_while_true(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    while_loop(rt, recv, args, true)
}

fn prim_while_false(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    while_loop(rt, recv, args, false)
}

fn prim_num_args(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match rt.block_arity(recv) {
        Some(n) => PrimResult::Value(Value::Int(n as i64)),
        None => PrimResult::Err(RtError::new(ErrKind::Type, "not a block")),
    }
}

/// `aBlock on: ExceptionClass do: handlerBlock` — install a handler for
/// the dynamic extent of the receiver block and evaluate it.
fn prim_on_do(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    if !matches!(args[0], Value::Class(_)) {
        return PrimResult::Err(RtError::new(
            ErrKind::Type,
            "on:do: expects an exception class",
        ));
    }
    if let Err(e) = check_block(args[1], "handler") {
        return PrimResult::Err(e);
    }
    let id = rt.next_handler_id;
    rt.next_handler_id += 1;
    let owner_depth = rt.acts.len();
    match rt.push_block(recv, &[]) {
        Ok(serial) => {
            rt.handlers.push(HandlerEntry {
                id,
                class: args[0],
                handler: args[1],
                protected: recv,
                owner_depth,
                prot_serial: serial,
                disabled: false,
            });
            PrimResult::Done
        }
        Err(e) => PrimResult::Err(e),
    }
}

/// `aBlock ensure: cleanupBlock` — the cleanup runs when the receiver's
/// activation leaves the stack, normally or by unwinding.
fn prim_ensure(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    if let Err(e) = check_block(args[0], "ensure block") {
        return PrimResult::Err(e);
    }
    match rt.push_block(recv, &[]) {
        Ok(_) => {
            rt.cur_act().ensure = Some(args[0]);
            PrimResult::Done
        }
        Err(e) => PrimResult::Err(e),
    }
}

pub(crate) fn install(rt: &mut Runtime) {
    let block = rt.kernel.block;
    native(rt, block, "value", 0, prim_value);
    native(rt, block, "value:", 1, prim_value);
    native(rt, block, "value:value:", 2, prim_value);
    native(rt, block, "value:value:value:", 3, prim_value);
    native(rt, block, "whileTrue:", 1, prim_while_true);
    native(rt, block, "whileFalse:", 1, prim_while_false);
    native(rt, block, "numArgs", 0, prim_num_args);
    native(rt, block, "on:do:", 2, prim_on_do);
    native(rt, block, "ensure:", 1, prim_ensure);
}

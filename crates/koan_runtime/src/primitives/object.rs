//! Object primitives: identity, reflection, `perform:`, and slot access by
//! selector for data-oriented classes.

use crate::core::{Managed, Value};
use crate::error::{ErrKind, RtError};
use crate::object::{is_kind_of, PrimResult};
use crate::runtime::send::Lookup;
use crate::runtime::Runtime;

use super::native;

fn prim_class(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    PrimResult::Value(Value::Class(rt.class_of(recv)))
}

fn prim_print_string(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    let text = rt.basic_print(recv);
    PrimResult::Value(rt.make_str(text))
}

fn prim_identical(_rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    PrimResult::Value(Value::Bool(recv == args[0]))
}

fn prim_is_nil(_rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    PrimResult::Value(Value::Bool(recv.is_nil()))
}

fn prim_not_nil(_rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    PrimResult::Value(Value::Bool(!recv.is_nil()))
}

fn do_perform(rt: &mut Runtime, recv: Value, selector: Value, args: &[Value]) -> PrimResult {
    let Value::Sym(sel) = selector else {
        return PrimResult::Err(RtError::new(
            ErrKind::Type,
            "perform: expects a symbol selector",
        ));
    };
    rt.perform(recv, sel, args);
    PrimResult::Done
}

fn prim_perform(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    do_perform(rt, recv, args[0], &[])
}

fn prim_perform_with(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    do_perform(rt, recv, args[0], &args[1..2])
}

fn prim_perform_with_with(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    do_perform(rt, recv, args[0], &args[1..3])
}

/// Probe the merged method table.
fn prim_responds_to(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let Value::Sym(sel) = args[0] else {
        return PrimResult::Err(RtError::new(
            ErrKind::Type,
            "respondsTo: expects a symbol selector",
        ));
    };
    let answer = matches!(rt.lookup(recv, sel), Lookup::Found(_));
    PrimResult::Value(Value::Bool(answer))
}

fn prim_is_kind_of(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let Value::Class(ancestor) = args[0] else {
        return PrimResult::Err(RtError::new(ErrKind::Type, "isKindOf: expects a class"));
    };
    let class = rt.class_of(recv);
    PrimResult::Value(Value::Bool(is_kind_of(&rt.heap, class, ancestor)))
}

/// Named slot access from outside the instance.
fn prim_slot_at(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let Value::Sym(name) = args[0] else {
        return PrimResult::Err(RtError::new(ErrKind::Type, "at: expects a symbol slot name"));
    };
    let Value::Instance(id) = recv else {
        return PrimResult::Err(RtError::new(
            ErrKind::Type,
            format!("{} has no named slots", recv.type_name()),
        ));
    };
    let class = match rt.heap.get(id) {
        Managed::Instance(inst) => inst.class,
        _ => return PrimResult::Err(RtError::new(ErrKind::Type, "not an instance")),
    };
    let Some(idx) = rt.heap.class(class).slot_index(name) else {
        return PrimResult::Err(RtError::new(
            ErrKind::Error,
            format!(
                "{} has no slot named {}",
                rt.heap.class(class).name,
                rt.syms.resolve(name)
            ),
        ));
    };
    match rt.heap.get(id) {
        Managed::Instance(inst) => {
            PrimResult::Value(inst.slots.get(idx).copied().unwrap_or(Value::Nil))
        }
        _ => PrimResult::Err(RtError::new(ErrKind::Type, "not an instance")),
    }
}

fn prim_slot_at_put(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let Value::Sym(name) = args[0] else {
        return PrimResult::Err(RtError::new(
            ErrKind::Type,
            "at:put: expects a symbol slot name",
        ));
    };
    let Value::Instance(id) = recv else {
        return PrimResult::Err(RtError::new(
            ErrKind::Type,
            format!("{} has no named slots", recv.type_name()),
        ));
    };
    let class = match rt.heap.get(id) {
        Managed::Instance(inst) => inst.class,
        _ => return PrimResult::Err(RtError::new(ErrKind::Type, "not an instance")),
    };
    let Some(idx) = rt.heap.class(class).slot_index(name) else {
        return PrimResult::Err(RtError::new(
            ErrKind::Error,
            format!(
                "{} has no slot named {}",
                rt.heap.class(class).name,
                rt.syms.resolve(name)
            ),
        ));
    };
    if let Managed::Instance(inst) = rt.heap.get_mut(id) {
        if idx >= inst.slots.len() {
            inst.slots.resize(idx + 1, Value::Nil);
        }
        inst.slots[idx] = args[1];
    }
    PrimResult::Value(args[1])
}

pub(crate) fn install(rt: &mut Runtime) {
    let object = rt.kernel.object;
    native(rt, object, "class", 0, prim_class);
    native(rt, object, "printString", 0, prim_print_string);
    native(rt, object, "==", 1, prim_identical);
    native(rt, object, "=", 1, prim_identical);
    native(rt, object, "isNil", 0, prim_is_nil);
    native(rt, object, "notNil", 0, prim_not_nil);
    native(rt, object, "perform:", 1, prim_perform);
    native(rt, object, "perform:with:", 2, prim_perform_with);
    native(rt, object, "perform:with:with:", 3, prim_perform_with_with);
    native(rt, object, "respondsTo:", 1, prim_responds_to);
    native(rt, object, "isKindOf:", 1, prim_is_kind_of);
    native(rt, object, "at:", 1, prim_slot_at);
    native(rt, object, "at:put:", 2, prim_slot_at_put);
}

//! Array primitives. 1-based indexing throughout; 0 and size+1 are out of
//! bounds. The iteration protocols (`do:`, `collect:`, …) live in the
//! kernel on top of `to:do:`.

use crate::core::{Managed, Value};
use crate::error::{ErrKind, RtError};
use crate::object::PrimResult;
use crate::runtime::Runtime;

use super::{native, native_class_side};

fn array_id(recv: Value) -> Result<crate::core::ObjectId, RtError> {
    match recv {
        Value::Array(id) => Ok(id),
        other => Err(RtError::new(
            ErrKind::Type,
            format!("expected an array, got {}", other.type_name()),
        )),
    }
}

fn with_items<R>(rt: &Runtime, recv: Value, f: impl FnOnce(&Vec<Value>) -> R) -> Result<R, RtError> {
    let id = array_id(recv)?;
    match rt.heap.get(id) {
        Managed::Array(items) => Ok(f(items)),
        _ => Err(RtError::new(ErrKind::Type, "not an array")),
    }
}

fn bounds_error(i: i64, len: usize) -> RtError {
    RtError::new(
        ErrKind::Subscript,
        format!("index {} out of bounds for array of size {}", i, len),
    )
}

fn prim_new(rt: &mut Runtime, _recv: Value, _args: &[Value]) -> PrimResult {
    PrimResult::Value(Value::Array(rt.heap.alloc(Managed::Array(Vec::new()))))
}

fn prim_size(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match with_items(rt, recv, |items| items.len() as i64) {
        Ok(n) => PrimResult::Value(Value::Int(n)),
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_at(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let Value::Int(i) = args[0] else {
        return PrimResult::Err(RtError::new(ErrKind::Type, "index must be an integer"));
    };
    let result = with_items(rt, recv, |items| {
        if i < 1 || i as usize > items.len() {
            Err(bounds_error(i, items.len()))
        } else {
            Ok(items[(i - 1) as usize])
        }
    });
    match result {
        Ok(Ok(v)) => PrimResult::Value(v),
        Ok(Err(e)) | Err(e) => PrimResult::Err(e),
    }
}

fn prim_at_put(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let Value::Int(i) = args[0] else {
        return PrimResult::Err(RtError::new(ErrKind::Type, "index must be an integer"));
    };
    let id = match array_id(recv) {
        Ok(id) => id,
        Err(e) => return PrimResult::Err(e),
    };
    match rt.heap.get_mut(id) {
        Managed::Array(items) => {
            if i < 1 || i as usize > items.len() {
                return PrimResult::Err(bounds_error(i, items.len()));
            }
            items[(i - 1) as usize] = args[1];
            PrimResult::Value(args[1])
        }
        _ => PrimResult::Err(RtError::new(ErrKind::Type, "not an array")),
    }
}

fn prim_add(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let id = match array_id(recv) {
        Ok(id) => id,
        Err(e) => return PrimResult::Err(e),
    };
    match rt.heap.get_mut(id) {
        Managed::Array(items) => {
            items.push(args[0]);
            PrimResult::Value(args[0])
        }
        _ => PrimResult::Err(RtError::new(ErrKind::Type, "not an array")),
    }
}

fn prim_add_first(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let id = match array_id(recv) {
        Ok(id) => id,
        Err(e) => return PrimResult::Err(e),
    };
    match rt.heap.get_mut(id) {
        Managed::Array(items) => {
            items.insert(0, args[0]);
            PrimResult::Value(args[0])
        }
        _ => PrimResult::Err(RtError::new(ErrKind::Type, "not an array")),
    }
}

fn prim_remove_last(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    let id = match array_id(recv) {
        Ok(id) => id,
        Err(e) => return PrimResult::Err(e),
    };
    match rt.heap.get_mut(id) {
        Managed::Array(items) => match items.pop() {
            Some(v) => PrimResult::Value(v),
            None => PrimResult::Err(RtError::new(
                ErrKind::Subscript,
                "removeLast on an empty array",
            )),
        },
        _ => PrimResult::Err(RtError::new(ErrKind::Type, "not an array")),
    }
}

fn prim_first(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    let result = with_items(rt, recv, |items| items.first().copied());
    match result {
        Ok(Some(v)) => PrimResult::Value(v),
        Ok(None) => PrimResult::Err(RtError::new(ErrKind::Subscript, "first on an empty array")),
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_last(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    let result = with_items(rt, recv, |items| items.last().copied());
    match result {
        Ok(Some(v)) => PrimResult::Value(v),
        Ok(None) => PrimResult::Err(RtError::new(ErrKind::Subscript, "last on an empty array")),
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_copy(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    let items = match with_items(rt, recv, |items| items.clone()) {
        Ok(v) => v,
        Err(e) => return PrimResult::Err(e),
    };
    PrimResult::Value(rt.make_array(items))
}

fn prim_reverse(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    let mut items = match with_items(rt, recv, |items| items.clone()) {
        Ok(v) => v,
        Err(e) => return PrimResult::Err(e),
    };
    items.reverse();
    PrimResult::Value(rt.make_array(items))
}

pub(crate) fn install(rt: &mut Runtime) {
    let array = rt.kernel.array;
    native_class_side(rt, array, "new", 0, prim_new);
    native(rt, array, "size", 0, prim_size);
    native(rt, array, "at:", 1, prim_at);
    native(rt, array, "at:put:", 2, prim_at_put);
    native(rt, array, "add:", 1, prim_add);
    native(rt, array, "addFirst:", 1, prim_add_first);
    native(rt, array, "removeLast", 0, prim_remove_last);
    native(rt, array, "first", 0, prim_first);
    native(rt, array, "last", 0, prim_last);
    native(rt, array, "copy", 0, prim_copy);
    native(rt, array, "reverse", 0, prim_reverse);
}

//! FileStream primitives — just enough surface for `Stdout`.

use crate::core::Value;
use crate::error::{ErrKind, RtError};
use crate::object::PrimResult;
use crate::runtime::Runtime;

use super::native;

fn text_arg(rt: &Runtime, v: Value) -> Result<String, RtError> {
    match v {
        Value::Str(id) => Ok(rt.heap.str_value(id).to_string()),
        other => Err(RtError::new(
            ErrKind::Type,
            format!("expected a string, got {}", other.type_name()),
        )),
    }
}

fn prim_print(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    match text_arg(rt, args[0]) {
        Ok(s) => {
            rt.emit(&s);
            PrimResult::Value(recv)
        }
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_println(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    match text_arg(rt, args[0]) {
        Ok(s) => {
            rt.emit(&s);
            rt.emit("\n");
            PrimResult::Value(recv)
        }
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_nl(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    rt.emit("\n");
    PrimResult::Value(recv)
}

pub(crate) fn install(rt: &mut Runtime) {
    let filestream = rt.kernel.filestream;
    native(rt, filestream, "print:", 1, prim_print);
    native(rt, filestream, "println:", 1, prim_println);
    native(rt, filestream, "nl", 0, prim_nl);
}

//! Arithmetic and comparison primitives, installed on Number so Integer
//! and Float share them. Integer arithmetic wraps on overflow
//! (two's-complement); `/` answers a Float when integers do not divide
//! evenly; `//` and `%` are floored.

use crate::activation::Cont;
use crate::core::Value;
use crate::error::{ErrKind, RtError};
use crate::object::PrimResult;
use crate::runtime::{format_float, Runtime};

use super::native;

enum Pair {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn numeric_pair(recv: Value, arg: Value) -> Result<Pair, RtError> {
    match (recv, arg) {
        (Value::Int(a), Value::Int(b)) => Ok(Pair::Ints(a, b)),
        (Value::Int(a), Value::Float(b)) => Ok(Pair::Floats(a as f64, b)),
        (Value::Float(a), Value::Int(b)) => Ok(Pair::Floats(a, b as f64)),
        (Value::Float(a), Value::Float(b)) => Ok(Pair::Floats(a, b)),
        (_, other) => Err(RtError::new(
            ErrKind::Type,
            format!("expected a number, got {}", other.type_name()),
        )),
    }
}

fn prim_add(_rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    match numeric_pair(recv, args[0]) {
        Ok(Pair::Ints(a, b)) => PrimResult::Value(Value::Int(a.wrapping_add(b))),
        Ok(Pair::Floats(a, b)) => PrimResult::Value(Value::Float(a + b)),
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_sub(_rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    match numeric_pair(recv, args[0]) {
        Ok(Pair::Ints(a, b)) => PrimResult::Value(Value::Int(a.wrapping_sub(b))),
        Ok(Pair::Floats(a, b)) => PrimResult::Value(Value::Float(a - b)),
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_mul(_rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    match numeric_pair(recv, args[0]) {
        Ok(Pair::Ints(a, b)) => PrimResult::Value(Value::Int(a.wrapping_mul(b))),
        Ok(Pair::Floats(a, b)) => PrimResult::Value(Value::Float(a * b)),
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_div(_rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    match numeric_pair(recv, args[0]) {
        Ok(Pair::Ints(a, b)) => {
            if b == 0 {
                return PrimResult::Err(RtError::new(ErrKind::DivisionByZero, "division by zero"));
            }
            if a % b == 0 {
                PrimResult::Value(Value::Int(a.wrapping_div(b)))
            } else {
                PrimResult::Value(Value::Float(a as f64 / b as f64))
            }
        }
        Ok(Pair::Floats(a, b)) => {
            if b == 0.0 {
                return PrimResult::Err(RtError::new(ErrKind::DivisionByZero, "division by zero"));
            }
            PrimResult::Value(Value::Float(a / b))
        }
        Err(e) => PrimResult::Err(e),
    }
}

fn floor_div(a: i64, b: i64) -> i64 {
    let q = a.wrapping_div(b);
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

fn floor_mod(a: i64, b: i64) -> i64 {
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }
}

fn prim_intdiv(_rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    match numeric_pair(recv, args[0]) {
        Ok(Pair::Ints(a, b)) => {
            if b == 0 {
                return PrimResult::Err(RtError::new(ErrKind::DivisionByZero, "division by zero"));
            }
            PrimResult::Value(Value::Int(floor_div(a, b)))
        }
        Ok(Pair::Floats(a, b)) => {
            if b == 0.0 {
                return PrimResult::Err(RtError::new(ErrKind::DivisionByZero, "division by zero"));
            }
            PrimResult::Value(Value::Float((a / b).floor()))
        }
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_mod(_rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    match numeric_pair(recv, args[0]) {
        Ok(Pair::Ints(a, b)) => {
            if b == 0 {
                return PrimResult::Err(RtError::new(ErrKind::DivisionByZero, "division by zero"));
            }
            PrimResult::Value(Value::Int(floor_mod(a, b)))
        }
        Ok(Pair::Floats(a, b)) => {
            if b == 0.0 {
                return PrimResult::Err(RtError::new(ErrKind::DivisionByZero, "division by zero"));
            }
            PrimResult::Value(Value::Float(a - b * (a / b).floor()))
        }
        Err(e) => PrimResult::Err(e),
    }
}

fn compare(recv: Value, arg: Value, op: fn(f64, f64) -> bool, iop: fn(i64, i64) -> bool) -> PrimResult {
    match numeric_pair(recv, arg) {
        Ok(Pair::Ints(a, b)) => PrimResult::Value(Value::Bool(iop(a, b))),
        Ok(Pair::Floats(a, b)) => PrimResult::Value(Value::Bool(op(a, b))),
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_lt(_rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    compare(recv, args[0], |a, b| a < b, |a, b| a < b)
}

fn prim_gt(_rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    compare(recv, args[0], |a, b| a > b, |a, b| a > b)
}

fn prim_le(_rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    compare(recv, args[0], |a, b| a <= b, |a, b| a <= b)
}

fn prim_ge(_rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    compare(recv, args[0], |a, b| a >= b, |a, b| a >= b)
}

/// Numeric `=`: value equality across Integer and Float; anything else is
/// not equal.
fn prim_eq(_rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let eq = match numeric_pair(recv, args[0]) {
        Ok(Pair::Ints(a, b)) => a == b,
        Ok(Pair::Floats(a, b)) => a == b,
        Err(_) => false,
    };
    PrimResult::Value(Value::Bool(eq))
}

fn prim_as_float(_rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match recv {
        Value::Int(i) => PrimResult::Value(Value::Float(i as f64)),
        Value::Float(_) => PrimResult::Value(recv),
        _ => PrimResult::Err(RtError::new(ErrKind::Type, "not a number")),
    }
}

fn prim_as_string(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    let text = match recv {
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format_float(f),
        _ => return PrimResult::Err(RtError::new(ErrKind::Type, "not a number")),
    };
    PrimResult::Value(rt.make_str(text))
}

fn prim_truncated(_rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match recv {
        Value::Int(_) => PrimResult::Value(recv),
        Value::Float(f) => PrimResult::Value(Value::Int(f.trunc() as i64)),
        _ => PrimResult::Err(RtError::new(ErrKind::Type, "not a number")),
    }
}

fn prim_floor(_rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match recv {
        Value::Int(_) => PrimResult::Value(recv),
        Value::Float(f) => PrimResult::Value(Value::Int(f.floor() as i64)),
        _ => PrimResult::Err(RtError::new(ErrKind::Type, "not a number")),
    }
}

fn prim_ceiling(_rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match recv {
        Value::Int(_) => PrimResult::Value(recv),
        Value::Float(f) => PrimResult::Value(Value::Int(f.ceil() as i64)),
        _ => PrimResult::Err(RtError::new(ErrKind::Type, "not a number")),
    }
}

fn prim_rounded(_rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match recv {
        Value::Int(_) => PrimResult::Value(recv),
        Value::Float(f) => PrimResult::Value(Value::Int(f.round() as i64)),
        _ => PrimResult::Err(RtError::new(ErrKind::Type, "not a number")),
    }
}

fn prim_sqrt(_rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    let f = match recv {
        Value::Int(i) => i as f64,
        Value::Float(f) => f,
        _ => return PrimResult::Err(RtError::new(ErrKind::Type, "not a number")),
    };
    PrimResult::Value(Value::Float(f.sqrt()))
}

/// `from to: limit do: aBlock` — the machine-level counting loop every
/// kernel iteration protocol builds on.
fn prim_to_do(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let Value::Int(from) = recv else {
        return PrimResult::Err(RtError::new(ErrKind::Type, "to:do: needs an integer receiver"));
    };
    let Value::Int(limit) = args[0] else {
        return PrimResult::Err(RtError::new(ErrKind::Type, "to:do: needs an integer limit"));
    };
    let block = args[1];
    if !matches!(block, Value::Block(_)) {
        return PrimResult::Err(RtError::new(ErrKind::Type, "to:do: needs a block"));
    }
    // seed the loop continuation; each iteration discards the previous
    // body value
    rt.push_val(Value::Nil);
    rt.cur_act().work.push(Cont::ToDo {
        i: from,
        limit,
        block,
        recv,
    });
    PrimResult::Done
}

pub(crate) fn install(rt: &mut Runtime) {
    let number = rt.kernel.number;
    native(rt, number, "+", 1, prim_add);
    native(rt, number, "-", 1, prim_sub);
    native(rt, number, "*", 1, prim_mul);
    native(rt, number, "/", 1, prim_div);
    native(rt, number, "//", 1, prim_intdiv);
    native(rt, number, "%", 1, prim_mod);
    native(rt, number, "<", 1, prim_lt);
    native(rt, number, ">", 1, prim_gt);
    native(rt, number, "<=", 1, prim_le);
    native(rt, number, ">=", 1, prim_ge);
    native(rt, number, "=", 1, prim_eq);
    native(rt, number, "asFloat", 0, prim_as_float);
    native(rt, number, "asString", 0, prim_as_string);
    native(rt, number, "truncated", 0, prim_truncated);
    native(rt, number, "floor", 0, prim_floor);
    native(rt, number, "ceiling", 0, prim_ceiling);
    native(rt, number, "rounded", 0, prim_rounded);
    native(rt, number, "sqrt", 0, prim_sqrt);
    let integer = rt.kernel.integer;
    native(rt, integer, "to:do:", 2, prim_to_do);
}

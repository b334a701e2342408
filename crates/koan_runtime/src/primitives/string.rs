//! String primitives. Strings are immutable byte sequences indexed from 1.

use crate::core::Value;
use crate::error::{ErrKind, RtError};
use crate::object::PrimResult;
use crate::runtime::Runtime;

use super::native;

fn string_of(rt: &Runtime, v: Value) -> Result<String, RtError> {
    match v {
        Value::Str(id) => Ok(rt.heap.str_value(id).to_string()),
        other => Err(RtError::new(
            ErrKind::Type,
            format!("expected a string, got {}", other.type_name()),
        )),
    }
}

fn prim_size(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match string_of(rt, recv) {
        Ok(s) => PrimResult::Value(Value::Int(s.len() as i64)),
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_at(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let s = match string_of(rt, recv) {
        Ok(s) => s,
        Err(e) => return PrimResult::Err(e),
    };
    let Value::Int(i) = args[0] else {
        return PrimResult::Err(RtError::new(ErrKind::Type, "index must be an integer"));
    };
    if i < 1 || i as usize > s.len() {
        return PrimResult::Err(RtError::new(
            ErrKind::Subscript,
            format!("index {} out of bounds for string of size {}", i, s.len()),
        ));
    }
    let byte = s.as_bytes()[(i - 1) as usize];
    let v = rt.make_str(String::from_utf8_lossy(&[byte]).into_owned());
    PrimResult::Value(v)
}

fn prim_concat(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let a = match string_of(rt, recv) {
        Ok(s) => s,
        Err(e) => return PrimResult::Err(e),
    };
    let b = match string_of(rt, args[0]) {
        Ok(s) => s,
        Err(e) => return PrimResult::Err(e),
    };
    PrimResult::Value(rt.make_str(a + &b))
}

fn prim_eq(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let eq = match (recv, args[0]) {
        (Value::Str(a), Value::Str(b)) => {
            a == b || rt.heap.str_value(a) == rt.heap.str_value(b)
        }
        _ => false,
    };
    PrimResult::Value(Value::Bool(eq))
}

fn prim_as_symbol(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match string_of(rt, recv) {
        Ok(s) => {
            let sym = rt.syms.intern(&s);
            PrimResult::Value(Value::Sym(sym))
        }
        Err(e) => PrimResult::Err(e),
    }
}

/// Answers the parsed integer, or nil when the text is not a number.
fn prim_as_integer(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match string_of(rt, recv) {
        Ok(s) => match s.trim().parse::<i64>() {
            Ok(i) => PrimResult::Value(Value::Int(i)),
            Err(_) => PrimResult::Value(Value::Nil),
        },
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_repeat(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let s = match string_of(rt, recv) {
        Ok(s) => s,
        Err(e) => return PrimResult::Err(e),
    };
    let Value::Int(n) = args[0] else {
        return PrimResult::Err(RtError::new(ErrKind::Type, "repeat count must be an integer"));
    };
    if n < 0 {
        return PrimResult::Err(RtError::new(ErrKind::Type, "repeat count must not be negative"));
    }
    PrimResult::Value(rt.make_str(s.repeat(n as usize)))
}

fn prim_println(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match string_of(rt, recv) {
        Ok(s) => {
            rt.emit(&s);
            rt.emit("\n");
            PrimResult::Value(recv)
        }
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_print(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match string_of(rt, recv) {
        Ok(s) => {
            rt.emit(&s);
            PrimResult::Value(recv)
        }
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_is_empty(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match string_of(rt, recv) {
        Ok(s) => PrimResult::Value(Value::Bool(s.is_empty())),
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_starts_with(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let (a, b) = match (string_of(rt, recv), string_of(rt, args[0])) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => return PrimResult::Err(e),
    };
    PrimResult::Value(Value::Bool(a.starts_with(&b)))
}

/// 1-based byte position of the first occurrence, or nil.
fn prim_index_of(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let (a, b) = match (string_of(rt, recv), string_of(rt, args[0])) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => return PrimResult::Err(e),
    };
    match a.find(&b) {
        Some(i) => PrimResult::Value(Value::Int(i as i64 + 1)),
        None => PrimResult::Value(Value::Nil),
    }
}

fn prim_uppercase(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match string_of(rt, recv) {
        Ok(s) => PrimResult::Value(rt.make_str(s.to_uppercase())),
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_lowercase(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match string_of(rt, recv) {
        Ok(s) => PrimResult::Value(rt.make_str(s.to_lowercase())),
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_trim(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match string_of(rt, recv) {
        Ok(s) => PrimResult::Value(rt.make_str(s.trim().to_string())),
        Err(e) => PrimResult::Err(e),
    }
}

/// `substringFrom:to:` — 1-based, inclusive on both ends.
fn prim_substring(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let s = match string_of(rt, recv) {
        Ok(s) => s,
        Err(e) => return PrimResult::Err(e),
    };
    let (Value::Int(from), Value::Int(to)) = (args[0], args[1]) else {
        return PrimResult::Err(RtError::new(ErrKind::Type, "bounds must be integers"));
    };
    if from < 1 || to > s.len() as i64 || from > to + 1 {
        return PrimResult::Err(RtError::new(
            ErrKind::Subscript,
            format!("substring {}..{} out of bounds for size {}", from, to, s.len()),
        ));
    }
    let sub = s.as_bytes()[(from - 1) as usize..to as usize].to_vec();
    PrimResult::Value(rt.make_str(String::from_utf8_lossy(&sub).into_owned()))
}

fn prim_split(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let (s, sep) = match (string_of(rt, recv), string_of(rt, args[0])) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => return PrimResult::Err(e),
    };
    let parts: Vec<String> = if sep.is_empty() {
        s.chars().map(|c| c.to_string()).collect()
    } else {
        s.split(&sep).map(|p| p.to_string()).collect()
    };
    let values: Vec<Value> = parts.into_iter().map(|p| rt.make_str(p)).collect();
    PrimResult::Value(rt.make_array(values))
}

fn prim_sym_as_string(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match recv {
        Value::Sym(s) => {
            let text = rt.syms.resolve(s).to_string();
            PrimResult::Value(rt.make_str(text))
        }
        _ => PrimResult::Err(RtError::new(ErrKind::Type, "not a symbol")),
    }
}

pub(crate) fn install(rt: &mut Runtime) {
    let string = rt.kernel.string;
    native(rt, string, "size", 0, prim_size);
    native(rt, string, "at:", 1, prim_at);
    native(rt, string, ",", 1, prim_concat);
    native(rt, string, "=", 1, prim_eq);
    native(rt, string, "asSymbol", 0, prim_as_symbol);
    native(rt, string, "asInteger", 0, prim_as_integer);
    native(rt, string, "repeat:", 1, prim_repeat);
    native(rt, string, "println", 0, prim_println);
    native(rt, string, "print", 0, prim_print);
    native(rt, string, "isEmpty", 0, prim_is_empty);
    native(rt, string, "startsWith:", 1, prim_starts_with);
    native(rt, string, "indexOf:", 1, prim_index_of);
    native(rt, string, "asUppercase", 0, prim_uppercase);
    native(rt, string, "asLowercase", 0, prim_lowercase);
    native(rt, string, "trim", 0, prim_trim);
    native(rt, string, "substringFrom:to:", 2, prim_substring);
    native(rt, string, "split:", 1, prim_split);

    let symbol = rt.kernel.symbol;
    native(rt, symbol, "asString", 0, prim_sym_as_string);
}

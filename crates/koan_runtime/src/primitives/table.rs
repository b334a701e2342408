//! Table primitives: a mapping from strings to values. Iteration order is
//! not observable from the language.

use crate::core::{fast_map_new, Managed, Value};
use crate::error::{ErrKind, RtError};
use crate::object::PrimResult;
use crate::runtime::Runtime;

use super::{native, native_class_side};

fn table_id(recv: Value) -> Result<crate::core::ObjectId, RtError> {
    match recv {
        Value::Table(id) => Ok(id),
        other => Err(RtError::new(
            ErrKind::Type,
            format!("expected a table, got {}", other.type_name()),
        )),
    }
}

fn key_of(rt: &Runtime, v: Value) -> Result<String, RtError> {
    match v {
        Value::Str(id) => Ok(rt.heap.str_value(id).to_string()),
        other => Err(RtError::new(
            ErrKind::Type,
            format!("table keys must be strings, got {}", other.type_name()),
        )),
    }
}

fn prim_new(rt: &mut Runtime, _recv: Value, _args: &[Value]) -> PrimResult {
    PrimResult::Value(Value::Table(rt.heap.alloc(Managed::Table(fast_map_new()))))
}

fn prim_at(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let id = match table_id(recv) {
        Ok(id) => id,
        Err(e) => return PrimResult::Err(e),
    };
    let key = match key_of(rt, args[0]) {
        Ok(k) => k,
        Err(e) => return PrimResult::Err(e),
    };
    match rt.heap.get(id) {
        Managed::Table(map) => match map.get(&key) {
            Some(&v) => PrimResult::Value(v),
            None => PrimResult::Err(RtError::new(
                ErrKind::Subscript,
                format!("key not found: \"{}\"", key),
            )),
        },
        _ => PrimResult::Err(RtError::new(ErrKind::Type, "not a table")),
    }
}

fn prim_at_put(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let id = match table_id(recv) {
        Ok(id) => id,
        Err(e) => return PrimResult::Err(e),
    };
    let key = match key_of(rt, args[0]) {
        Ok(k) => k,
        Err(e) => return PrimResult::Err(e),
    };
    match rt.heap.get_mut(id) {
        Managed::Table(map) => {
            map.insert(key, args[1]);
            PrimResult::Value(args[1])
        }
        _ => PrimResult::Err(RtError::new(ErrKind::Type, "not a table")),
    }
}

/// `at:ifAbsent:` — the non-signalling accessor; the absent block is
/// evaluated for a missing key.
fn prim_at_if_absent(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let id = match table_id(recv) {
        Ok(id) => id,
        Err(e) => return PrimResult::Err(e),
    };
    let key = match key_of(rt, args[0]) {
        Ok(k) => k,
        Err(e) => return PrimResult::Err(e),
    };
    let hit = match rt.heap.get(id) {
        Managed::Table(map) => map.get(&key).copied(),
        _ => None,
    };
    match hit {
        Some(v) => PrimResult::Value(v),
        None => match rt.push_block(args[1], &[]) {
            Ok(_) => PrimResult::Done,
            Err(e) => PrimResult::Err(e),
        },
    }
}

fn prim_keys(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    let id = match table_id(recv) {
        Ok(id) => id,
        Err(e) => return PrimResult::Err(e),
    };
    let keys: Vec<String> = match rt.heap.get(id) {
        Managed::Table(map) => map.keys().cloned().collect(),
        _ => return PrimResult::Err(RtError::new(ErrKind::Type, "not a table")),
    };
    let values: Vec<Value> = keys.into_iter().map(|k| rt.make_str(k)).collect();
    PrimResult::Value(rt.make_array(values))
}

fn prim_values(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    let id = match table_id(recv) {
        Ok(id) => id,
        Err(e) => return PrimResult::Err(e),
    };
    let values: Vec<Value> = match rt.heap.get(id) {
        Managed::Table(map) => map.values().copied().collect(),
        _ => return PrimResult::Err(RtError::new(ErrKind::Type, "not a table")),
    };
    PrimResult::Value(rt.make_array(values))
}

fn prim_includes_key(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let id = match table_id(recv) {
        Ok(id) => id,
        Err(e) => return PrimResult::Err(e),
    };
    let key = match key_of(rt, args[0]) {
        Ok(k) => k,
        Err(e) => return PrimResult::Err(e),
    };
    match rt.heap.get(id) {
        Managed::Table(map) => PrimResult::Value(Value::Bool(map.contains_key(&key))),
        _ => PrimResult::Err(RtError::new(ErrKind::Type, "not a table")),
    }
}

/// Answers the removed value, or nil when the key was absent.
fn prim_remove_key(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let id = match table_id(recv) {
        Ok(id) => id,
        Err(e) => return PrimResult::Err(e),
    };
    let key = match key_of(rt, args[0]) {
        Ok(k) => k,
        Err(e) => return PrimResult::Err(e),
    };
    match rt.heap.get_mut(id) {
        Managed::Table(map) => PrimResult::Value(map.remove(&key).unwrap_or(Value::Nil)),
        _ => PrimResult::Err(RtError::new(ErrKind::Type, "not a table")),
    }
}

fn prim_size(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    let id = match table_id(recv) {
        Ok(id) => id,
        Err(e) => return PrimResult::Err(e),
    };
    match rt.heap.get(id) {
        Managed::Table(map) => PrimResult::Value(Value::Int(map.len() as i64)),
        _ => PrimResult::Err(RtError::new(ErrKind::Type, "not a table")),
    }
}

pub(crate) fn install(rt: &mut Runtime) {
    let table = rt.kernel.table;
    native_class_side(rt, table, "new", 0, prim_new);
    native(rt, table, "at:", 1, prim_at);
    native(rt, table, "at:put:", 2, prim_at_put);
    native(rt, table, "at:ifAbsent:", 2, prim_at_if_absent);
    native(rt, table, "keys", 0, prim_keys);
    native(rt, table, "values", 0, prim_values);
    native(rt, table, "includesKey:", 1, prim_includes_key);
    native(rt, table, "removeKey:", 1, prim_remove_key);
    native(rt, table, "size", 0, prim_size);
}

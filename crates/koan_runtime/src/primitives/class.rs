//! Class primitives: derivation, parent extension, instantiation and
//! introspection. These are instance methods of the `Class` class, so
//! every class receiver reaches them through ordinary lookup.

use crate::core::{Managed, ObjectId, Sym, Value};
use crate::error::{ErrKind, RtError};
use crate::object::{
    is_kind_of, merge_slots, new_instance, recompute_merged, ClassObj, PrimResult,
};
use crate::runtime::Runtime;

use super::native;

fn class_id(recv: Value) -> Result<ObjectId, RtError> {
    match recv {
        Value::Class(id) => Ok(id),
        other => Err(RtError::new(
            ErrKind::Type,
            format!("expected a class, got {}", other.type_name()),
        )),
    }
}

fn prim_name(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match class_id(recv) {
        Ok(id) => {
            let name = rt.heap.class(id).name.clone();
            PrimResult::Value(rt.make_str(name))
        }
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_new(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match class_id(recv) {
        Ok(id) => PrimResult::Value(Value::Instance(new_instance(&mut rt.heap, id))),
        Err(e) => PrimResult::Err(e),
    }
}

/// Slot names out of a `#(x y)` literal: symbols (or strings) only.
fn slot_syms(rt: &mut Runtime, v: Value) -> Result<Vec<Sym>, RtError> {
    let Value::Array(id) = v else {
        return Err(RtError::new(
            ErrKind::Type,
            "derive: expects an array of slot names",
        ));
    };
    let items = match rt.heap.get(id) {
        Managed::Array(items) => items.clone(),
        _ => return Err(RtError::new(ErrKind::Type, "not an array")),
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Sym(s) => out.push(s),
            Value::Str(sid) => {
                let text = rt.heap.str_value(sid).to_string();
                out.push(rt.syms.intern(&text));
            }
            other => {
                return Err(RtError::new(
                    ErrKind::Type,
                    format!("slot names must be symbols, got {}", other.type_name()),
                ))
            }
        }
    }
    Ok(out)
}

fn derive(rt: &mut Runtime, parent: ObjectId, own: Vec<Sym>) -> Result<Value, RtError> {
    let slots = merge_slots(&rt.heap, &[parent], &own, &rt.syms)?;
    let mut class = ClassObj::new("");
    class.parents = vec![parent];
    class.own_slots = own;
    class.slots = slots;
    let id = rt.heap.alloc(Managed::Class(Box::new(class)));
    rt.heap.class_mut(parent).subclasses.push(id);
    recompute_merged(&mut rt.heap, id);
    Ok(Value::Class(id))
}

fn prim_derive(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    let parent = match class_id(recv) {
        Ok(id) => id,
        Err(e) => return PrimResult::Err(e),
    };
    match derive(rt, parent, Vec::new()) {
        Ok(v) => PrimResult::Value(v),
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_derive_slots(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let parent = match class_id(recv) {
        Ok(id) => id,
        Err(e) => return PrimResult::Err(e),
    };
    let own = match slot_syms(rt, args[0]) {
        Ok(v) => v,
        Err(e) => return PrimResult::Err(e),
    };
    match derive(rt, parent, own) {
        Ok(v) => PrimResult::Value(v),
        Err(e) => PrimResult::Err(e),
    }
}

/// `addParent:` — extend a class with an additional superclass after
/// creation. Slot lists re-merge (conflicts signal) and the merged method
/// table is recomputed for the class and all its subclasses.
fn prim_add_parent(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let child = match class_id(recv) {
        Ok(id) => id,
        Err(e) => return PrimResult::Err(e),
    };
    let parent = match class_id(args[0]) {
        Ok(id) => id,
        Err(e) => return PrimResult::Err(e),
    };
    if child == parent || is_kind_of(&rt.heap, parent, child) {
        return PrimResult::Err(RtError::new(
            ErrKind::Error,
            "addParent: would create an inheritance cycle",
        ));
    }
    let mut parents = rt.heap.class(child).parents.clone();
    parents.push(parent);
    let own = rt.heap.class(child).own_slots.clone();
    let slots = match merge_slots(&rt.heap, &parents, &own, &rt.syms) {
        Ok(s) => s,
        Err(e) => return PrimResult::Err(e),
    };
    {
        let class = rt.heap.class_mut(child);
        class.parents = parents;
        class.slots = slots;
    }
    rt.heap.class_mut(parent).subclasses.push(child);
    recompute_merged(&mut rt.heap, child);
    PrimResult::Value(recv)
}

fn prim_slots(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match class_id(recv) {
        Ok(id) => {
            let slots: Vec<Value> = rt
                .heap
                .class(id)
                .slots
                .iter()
                .map(|&s| Value::Sym(s))
                .collect();
            PrimResult::Value(rt.make_array(slots))
        }
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_superclasses(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match class_id(recv) {
        Ok(id) => {
            let parents: Vec<Value> = rt
                .heap
                .class(id)
                .parents
                .iter()
                .map(|&p| Value::Class(p))
                .collect();
            PrimResult::Value(rt.make_array(parents))
        }
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_tags(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match class_id(recv) {
        Ok(id) => {
            let tags = rt.heap.class(id).tags.clone();
            let values: Vec<Value> = tags.into_iter().map(|t| rt.make_str(t)).collect();
            PrimResult::Value(rt.make_array(values))
        }
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_tag(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let id = match class_id(recv) {
        Ok(id) => id,
        Err(e) => return PrimResult::Err(e),
    };
    let Value::Str(sid) = args[0] else {
        return PrimResult::Err(RtError::new(ErrKind::Type, "tag: expects a string"));
    };
    let tag = rt.heap.str_value(sid).to_string();
    rt.heap.class_mut(id).tags.push(tag);
    PrimResult::Value(recv)
}

pub(crate) fn install(rt: &mut Runtime) {
    let class = rt.kernel.class;
    native(rt, class, "name", 0, prim_name);
    native(rt, class, "new", 0, prim_new);
    native(rt, class, "derive", 0, prim_derive);
    native(rt, class, "derive:", 1, prim_derive_slots);
    native(rt, class, "addParent:", 1, prim_add_parent);
    native(rt, class, "slots", 0, prim_slots);
    native(rt, class, "superclasses", 0, prim_superclasses);
    native(rt, class, "tags", 0, prim_tags);
    native(rt, class, "tag:", 1, prim_tag);
}

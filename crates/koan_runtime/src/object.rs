//! Classes, instances, methods and blocks.
//!
//! Every class precomputes a merged method table: the selector-wise union
//! of its own methods and each parent's merged table, own methods winning
//! and cross-parent disagreements recorded as conflict markers. The table
//! is recomputed eagerly whenever a class gains a method or a parent, and
//! the recompute propagates through subclass backlinks so `lookup` is a
//! single hash probe.

use std::rc::Rc;

use koan_ir::Stmt;
use koan_syntax::{SourceId, Span};

use crate::core::{fast_map_new, FastHashMap, FrameRef, Heap, Managed, ObjectId, Sym, Value};
use crate::error::{ErrKind, RtError};
use crate::runtime::Runtime;

/// Native method implementations get the runtime, the receiver and the
/// evaluated arguments.
pub type Primitive = fn(&mut Runtime, Value, &[Value]) -> PrimResult;

/// What a primitive did.
pub enum PrimResult {
    /// Produced a value: deliver it as the send's result.
    Value(Value),
    /// Arranged its own continuation (pushed an activation, blocked the
    /// process, started an unwind); nothing to deliver here.
    Done,
    /// Failed; the error is signalled as an exception at the send site.
    Err(RtError),
}

pub struct Method {
    pub selector: Sym,
    pub params: Box<[Sym]>,
    pub temps: Box<[Sym]>,
    pub body: Rc<[Stmt]>,
    pub primitive: Option<Primitive>,
    /// Class the method was installed on; `super` restarts lookup above it.
    pub holder: ObjectId,
    pub source: SourceId,
    pub span: Span,
}

impl Method {
    pub fn native(selector: Sym, arity: usize, holder: ObjectId, f: Primitive) -> Rc<Method> {
        Rc::new(Method {
            selector,
            params: vec![Sym(u32::MAX); arity].into(),
            temps: Box::new([]),
            body: Rc::from(Vec::new()),
            primitive: Some(f),
            holder,
            source: SourceId(0),
            span: Span::default(),
        })
    }
}

#[derive(Clone)]
pub enum MergedEntry {
    Method(Rc<Method>),
    /// Two parents disagree on this selector and the class does not
    /// override it.
    Conflict,
}

pub struct ClassObj {
    pub name: String,
    /// Full ordered slot list (inherited then own); instance vectors index
    /// into this.
    pub slots: Vec<Sym>,
    /// Slots declared on this class itself, kept for re-merging.
    pub own_slots: Vec<Sym>,
    pub parents: Vec<ObjectId>,
    pub subclasses: Vec<ObjectId>,
    pub methods: FastHashMap<Sym, Rc<Method>>,
    pub class_methods: FastHashMap<Sym, Rc<Method>>,
    pub merged: FastHashMap<Sym, MergedEntry>,
    pub tags: Vec<String>,
}

impl ClassObj {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: Vec::new(),
            own_slots: Vec::new(),
            parents: Vec::new(),
            subclasses: Vec::new(),
            methods: fast_map_new(),
            class_methods: fast_map_new(),
            merged: fast_map_new(),
            tags: Vec::new(),
        }
    }

    pub fn slot_index(&self, name: Sym) -> Option<usize> {
        self.slots.iter().position(|&s| s == name)
    }
}

pub struct InstanceObj {
    pub class: ObjectId,
    pub slots: Vec<Value>,
    /// Opaque handle for proxy classes (process ids, channel ids, fds).
    pub native: Option<u64>,
}

pub struct BlockObj {
    pub node: Rc<koan_ir::BlockNode>,
    /// The frame the literal was evaluated in; the activation chain walks
    /// through it for variable lookup and non-local return targeting.
    pub frame: FrameRef,
    pub source: SourceId,
}

/// Rebuild `class_id`'s merged table from its parents and own methods,
/// then propagate to every transitive subclass.
pub fn recompute_merged(heap: &mut Heap, class_id: ObjectId) {
    let mut work = vec![class_id];
    while let Some(cid) = work.pop() {
        let (parents, subclasses) = {
            let c = heap.class(cid);
            (c.parents.clone(), c.subclasses.clone())
        };

        let mut merged: FastHashMap<Sym, MergedEntry> = fast_map_new();
        for pid in &parents {
            let parent_merged = heap.class(*pid).merged.clone();
            for (sel, entry) in parent_merged {
                match merged.entry(sel) {
                    hashbrown::hash_map::Entry::Vacant(slot) => {
                        slot.insert(entry);
                    }
                    hashbrown::hash_map::Entry::Occupied(mut slot) => {
                        let conflict = match (slot.get(), &entry) {
                            // the same method reached through two parents
                            // (a diamond) is not a conflict
                            (MergedEntry::Method(a), MergedEntry::Method(b)) => {
                                !Rc::ptr_eq(a, b)
                            }
                            (MergedEntry::Conflict, _) => false,
                            (_, MergedEntry::Conflict) => true,
                        };
                        if conflict {
                            slot.insert(MergedEntry::Conflict);
                        }
                    }
                }
            }
        }
        {
            let class = heap.class_mut(cid);
            for (sel, m) in &class.methods {
                merged.insert(*sel, MergedEntry::Method(m.clone()));
            }
            class.merged = merged;
        }
        work.extend(subclasses);
    }
}

/// Merge parent slot lists with the class's own declarations. A slot name
/// provided by two different parents is a conflict unless the class
/// declares it itself (the override resolves it).
pub fn merge_slots(
    heap: &Heap,
    parents: &[ObjectId],
    own: &[Sym],
    syms: &crate::core::Interner,
) -> Result<Vec<Sym>, RtError> {
    let mut slots: Vec<Sym> = Vec::new();
    let mut origin: Vec<usize> = Vec::new();
    for (pi, pid) in parents.iter().enumerate() {
        for &slot in &heap.class(*pid).slots {
            if let Some(at) = slots.iter().position(|&s| s == slot) {
                if origin[at] != pi && !own.contains(&slot) {
                    return Err(RtError::new(
                        ErrKind::SlotConflict,
                        format!("slot '{}' is declared by more than one parent", syms.resolve(slot)),
                    ));
                }
            } else {
                slots.push(slot);
                origin.push(pi);
            }
        }
    }
    for &slot in own {
        if !slots.contains(&slot) {
            slots.push(slot);
            origin.push(usize::MAX);
        }
    }
    Ok(slots)
}

/// Search a class's class-method chain: own table first, then each parent
/// depth-first in declaration order.
pub fn find_class_method(heap: &Heap, class_id: ObjectId, sel: Sym) -> Option<Rc<Method>> {
    let class = heap.class(class_id);
    if let Some(m) = class.class_methods.get(&sel) {
        return Some(m.clone());
    }
    for &pid in &class.parents {
        if let Some(m) = find_class_method(heap, pid, sel) {
            return Some(m);
        }
    }
    None
}

/// Whether `class_id` is `ancestor` or transitively derives from it.
pub fn is_kind_of(heap: &Heap, class_id: ObjectId, ancestor: ObjectId) -> bool {
    if class_id == ancestor {
        return true;
    }
    let class = heap.class(class_id);
    class.parents.iter().any(|&p| is_kind_of(heap, p, ancestor))
}

/// Allocate an instance of a class with nil slots.
pub fn new_instance(heap: &mut Heap, class_id: ObjectId) -> ObjectId {
    let count = heap.class(class_id).slots.len();
    heap.alloc(Managed::Instance(Box::new(InstanceObj {
        class: class_id,
        slots: vec![Value::Nil; count],
        native: None,
    })))
}

//! Method lookup and message dispatch.

use std::rc::Rc;

use koan_ir::SuperMode;
use tracing::trace;

use crate::activation::{ActKind, Activation, EnsureThen};
use crate::core::{Frame, Managed, ObjectId, Sym, Value};
use crate::error::{ErrKind, RtError};
use crate::object::{find_class_method, Method, MergedEntry, PrimResult};
use crate::runtime::Runtime;

pub(crate) enum Lookup {
    Found(Rc<Method>),
    Conflict,
    Missing,
}

impl Runtime {
    /// Resolve a selector against a receiver per the lookup rules and
    /// invoke the result; falls back to `doesNotUnderstand:`.
    pub(crate) fn dispatch(
        &mut self,
        recv: Value,
        sel: Sym,
        args: &[Value],
        super_mode: &SuperMode,
    ) {
        let lookup = match super_mode {
            SuperMode::None => self.lookup(recv, sel),
            SuperMode::Super | SuperMode::Scoped(_) => {
                let holder = self
                    .acts
                    .last()
                    .and_then(|a| a.frame.borrow().holder);
                let Some(holder) = holder else {
                    return self.raise(RtError::new(
                        ErrKind::Error,
                        "super used outside a method",
                    ));
                };
                let start = match super_mode {
                    SuperMode::Scoped(name) => {
                        let found = self
                            .heap
                            .class(holder)
                            .parents
                            .iter()
                            .copied()
                            .find(|&p| self.heap.class(p).name == **name);
                        match found {
                            Some(p) => p,
                            None => {
                                let e = RtError::new(
                                    ErrKind::Name,
                                    format!(
                                        "'{}' is not a parent of {}",
                                        name,
                                        self.heap.class(holder).name
                                    ),
                                );
                                return self.raise(e);
                            }
                        }
                    }
                    _ => {
                        let first = self.heap.class(holder).parents.first().copied();
                        match first {
                            Some(p) => p,
                            None => {
                                let e = RtError::new(
                                    ErrKind::MessageNotUnderstood,
                                    format!(
                                        "{} has no superclass",
                                        self.heap.class(holder).name
                                    ),
                                );
                                return self.raise(e);
                            }
                        }
                    }
                };
                self.lookup_in_class(start, sel)
            }
        };

        match lookup {
            Lookup::Found(method) => self.invoke(recv, &method, args),
            Lookup::Conflict => {
                let class = self.class_of(recv);
                self.raise(RtError::new(
                    ErrKind::AmbiguousMethod,
                    format!(
                        "#{} is provided by more than one parent of {}",
                        self.syms.resolve(sel),
                        self.heap.class(class).name
                    ),
                ))
            }
            Lookup::Missing => self.does_not_understand(recv, sel),
        }
    }

    /// §4.5: merged table of the receiver's class; for class receivers the
    /// class-method chain is consulted first, then the merged table of the
    /// `Class` class (where `new`, `derive:` and friends live).
    pub(crate) fn lookup(&self, recv: Value, sel: Sym) -> Lookup {
        if let Value::Class(cid) = recv {
            if let Some(m) = find_class_method(&self.heap, cid, sel) {
                return Lookup::Found(m);
            }
        }
        self.lookup_in_class(self.class_of(recv), sel)
    }

    pub(crate) fn lookup_in_class(&self, class: ObjectId, sel: Sym) -> Lookup {
        match self.heap.class(class).merged.get(&sel) {
            Some(MergedEntry::Method(m)) => Lookup::Found(m.clone()),
            Some(MergedEntry::Conflict) => Lookup::Conflict,
            None => Lookup::Missing,
        }
    }

    fn does_not_understand(&mut self, recv: Value, sel: Sym) {
        let dnu = self.syms.intern("doesNotUnderstand:");
        if sel != dnu {
            if let Lookup::Found(m) = self.lookup(recv, dnu) {
                let arg = Value::Sym(sel);
                return self.invoke(recv, &m, &[arg]);
            }
        }
        let class = self.class_of(recv);
        self.raise(RtError::new(
            ErrKind::MessageNotUnderstood,
            format!(
                "{} does not understand #{}",
                self.heap.class(class).name,
                self.syms.resolve(sel)
            ),
        ))
    }

    pub(crate) fn invoke(&mut self, recv: Value, method: &Rc<Method>, args: &[Value]) {
        if method.params.len() != args.len() {
            return self.raise(RtError::new(
                ErrKind::Arity,
                format!(
                    "#{} expects {} argument(s), got {}",
                    self.syms.resolve(method.selector),
                    method.params.len(),
                    args.len()
                ),
            ));
        }

        if let Some(prim) = method.primitive {
            trace!(selector = self.syms.resolve(method.selector), "primitive");
            match prim(self, recv, args) {
                PrimResult::Value(v) => self.push_val(v),
                PrimResult::Done => {}
                PrimResult::Err(e) => self.raise(e),
            }
            return;
        }

        if self.acts.len() >= self.config.max_stack {
            return self.raise(RtError::new(
                ErrKind::StackOverflow,
                format!("activation depth exceeded {}", self.config.max_stack),
            ));
        }

        trace!(selector = self.syms.resolve(method.selector), "send");
        let serial = self.next_serial();
        let frame = Frame::new(recv, serial, Some(method.holder), None);
        {
            let mut f = frame.borrow_mut();
            for (i, &p) in method.params.iter().enumerate() {
                f.names.push(p);
                f.values.push(args[i]);
            }
            for &t in method.temps.iter() {
                f.names.push(t);
                f.values.push(Value::Nil);
            }
        }
        self.acts.push(Activation {
            serial,
            kind: ActKind::Method {
                method: method.clone(),
            },
            receiver: recv,
            frame,
            body: method.body.clone(),
            pc: 0,
            work: Vec::new(),
            vals: Vec::new(),
            ensure: None,
            ensure_then: None,
            has_returned: false,
            ret: Value::Nil,
            cur_span: method.span,
            source: method.source,
        });
    }

    /// Push a block activation; the new activation's variable lookup walks
    /// the block's captured chain.
    pub(crate) fn push_block(&mut self, block: Value, args: &[Value]) -> Result<u64, RtError> {
        self.push_block_with(block, args, None)
    }

    pub(crate) fn push_block_with(
        &mut self,
        block: Value,
        args: &[Value],
        ensure_then: Option<EnsureThen>,
    ) -> Result<u64, RtError> {
        let act = self.block_activation(block, args, ensure_then)?;
        let serial = act.serial;
        self.acts.push(act);
        Ok(serial)
    }

    /// Build (but do not push) a block activation — `fork:` uses this to
    /// seed another process's stack.
    pub(crate) fn block_activation(
        &mut self,
        block: Value,
        args: &[Value],
        ensure_then: Option<EnsureThen>,
    ) -> Result<Activation, RtError> {
        let Value::Block(id) = block else {
            return Err(RtError::new(
                ErrKind::Type,
                format!("expected a block, got {}", block.type_name()),
            ));
        };
        let (node, parent, source) = match self.heap.get(id) {
            Managed::Block(b) => (b.node.clone(), b.frame.clone(), b.source),
            _ => unreachable!("block id resolves to a block"),
        };
        if node.params.len() != args.len() {
            return Err(RtError::new(
                ErrKind::Arity,
                format!(
                    "block expects {} argument(s), got {}",
                    node.params.len(),
                    args.len()
                ),
            ));
        }
        if self.acts.len() >= self.config.max_stack {
            return Err(RtError::new(
                ErrKind::StackOverflow,
                format!("activation depth exceeded {}", self.config.max_stack),
            ));
        }
        let serial = self.next_serial();
        let (receiver, home, holder) = {
            let f = parent.borrow();
            (f.receiver, f.home_serial, f.holder)
        };
        let frame = Frame::new(receiver, home, holder, Some(parent));
        {
            let mut f = frame.borrow_mut();
            for (i, p) in node.params.iter().enumerate() {
                let sym = self.syms.intern(p);
                f.names.push(sym);
                f.values.push(args[i]);
            }
            for t in node.temps.iter() {
                let sym = self.syms.intern(t);
                f.names.push(sym);
                f.values.push(Value::Nil);
            }
        }
        Ok(Activation {
            serial,
            kind: ActKind::Block,
            receiver,
            frame,
            body: node.body.clone(),
            pc: 0,
            work: Vec::new(),
            vals: Vec::new(),
            ensure: None,
            ensure_then,
            has_returned: false,
            ret: Value::Nil,
            cur_span: node.span,
            source,
        })
    }

    /// Number of parameters a block takes, for handler-arity leniency.
    pub(crate) fn block_arity(&self, block: Value) -> Option<usize> {
        match block {
            Value::Block(id) => match self.heap.get(id) {
                Managed::Block(b) => Some(b.node.params.len()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Full re-dispatch used by `perform:` and its variants.
    pub(crate) fn perform(&mut self, recv: Value, sel: Sym, args: &[Value]) {
        self.sends += 1;
        self.dispatch(recv, sel, args, &SuperMode::None);
    }
}

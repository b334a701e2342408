//! The machine step: statement advance, expression continuations, and
//! activation completion.

use std::rc::Rc;

use koan_ir::{Expr, SuperMode};
use smallvec::SmallVec;

use crate::activation::{ActKind, Cont, EnsureThen, Unwind, UnwindAction, WhilePhase};
use crate::core::{Managed, Value};
use crate::error::{ErrKind, RtError};
use crate::object::{recompute_merged, BlockObj, Method};
use crate::runtime::Runtime;

enum Next {
    RunCont(Cont),
    PushStmt(Expr),
    Complete,
}

impl Runtime {
    /// Advance the current process by one bounded unit of work. Returns
    /// false when the process has nothing left to do.
    pub(crate) fn step(&mut self) -> bool {
        if let Some(uw) = &self.unwind {
            if !self.unwind_paused {
                if self.acts.len() <= uw.target {
                    return self.finish_unwind();
                }
                return self.unwind_pop_one();
            }
        }

        if self.acts.is_empty() {
            if self.switch.is_none() {
                self.finish_current(Value::Nil);
            }
            return false;
        }

        let next = {
            let act = self.acts.last_mut().expect("activation");
            if let Some(cont) = act.work.pop() {
                Next::RunCont(cont)
            } else {
                // Statement boundary: the last value becomes the default
                // return, leftovers from abandoned subexpressions drop.
                if let Some(v) = act.vals.pop() {
                    act.ret = v;
                    act.vals.clear();
                }
                if !act.has_returned && act.pc < act.body.len() {
                    let stmt = &act.body[act.pc];
                    act.cur_span = stmt.span;
                    let expr = stmt.expr.clone();
                    act.pc += 1;
                    Next::PushStmt(expr)
                } else {
                    Next::Complete
                }
            }
        };

        match next {
            Next::PushStmt(expr) => {
                self.cur_act().work.push(Cont::Eval(expr));
                true
            }
            Next::Complete => self.complete_top(),
            Next::RunCont(cont) => {
                self.run_cont(cont);
                true
            }
        }
    }

    pub(crate) fn cur_act(&mut self) -> &mut crate::activation::Activation {
        self.acts.last_mut().expect("no current activation")
    }

    pub(crate) fn push_val(&mut self, v: Value) {
        self.cur_act().vals.push(v);
    }

    pub(crate) fn pop_val(&mut self) -> Value {
        self.cur_act().vals.pop().expect("value stack underflow")
    }

    pub(crate) fn finish_current(&mut self, v: Value) {
        if self.cur_result.is_none() {
            self.cur_result = Some(v);
        }
        self.switch = Some(crate::process::Switch::Terminated);
    }

    pub(crate) fn deliver(&mut self, v: Value) {
        if let Some(parent) = self.acts.last_mut() {
            parent.vals.push(v);
        } else {
            self.finish_current(v);
        }
    }

    /// The top activation finished its body: pop it, honour `ensure:`,
    /// route handler-block completion, deliver the value.
    fn complete_top(&mut self) -> bool {
        let mut act = self.acts.pop().expect("activation");
        let v = act.ret;

        if let Some(cleanup) = act.ensure.take() {
            self.drop_act_bookkeeping(act.serial);
            match self.push_block_with(cleanup, &[], Some(EnsureThen::Deliver(v))) {
                Ok(_) => {}
                Err(e) => self.raise(e),
            }
            return true;
        }

        if let Some(then) = act.ensure_then.take() {
            match then {
                EnsureThen::Deliver(value) => self.deliver(value),
                EnsureThen::Unwinding => self.unwind_paused = false,
            }
            return true;
        }

        // A handler block that ran to completion behaves as `return:` of
        // its last value.
        if let Some(pos) = self
            .active
            .iter()
            .rposition(|ah| ah.act_serial == act.serial)
        {
            let ah = self.active.remove(pos);
            if let Some(epos) = self.handlers.iter().position(|h| h.id == ah.entry_id) {
                let entry = self.handlers.remove(epos);
                self.unwind = Some(Unwind {
                    target: entry.owner_depth,
                    action: UnwindAction::Deliver(v),
                });
                return true;
            }
        }

        self.drop_act_bookkeeping(act.serial);
        self.deliver(v);
        true
    }

    pub(crate) fn drop_act_bookkeeping(&mut self, serial: u64) {
        self.handlers.retain(|h| h.prot_serial != serial);
        self.active.retain(|ah| ah.act_serial != serial);
    }

    fn run_cont(&mut self, cont: Cont) {
        match cont {
            Cont::Eval(expr) => self.eval_expr(expr),
            Cont::Store(name) => {
                let v = *self
                    .cur_act()
                    .vals
                    .last()
                    .expect("assignment value");
                if let Err(e) = self.store_name(&name, v) {
                    self.raise(e);
                }
            }
            Cont::Dispatch {
                selector,
                argc,
                super_mode,
                span,
            } => {
                let (recv, args) = {
                    let act = self.cur_act();
                    let split = act.vals.len() - argc;
                    let args: SmallVec<[Value; 4]> = act.vals.drain(split..).collect();
                    let recv = act.vals.pop().expect("send receiver");
                    act.cur_span = span;
                    (recv, args)
                };
                self.sends += 1;
                let sym = self.intern_selector(&selector);
                self.dispatch(recv, sym, &args, &super_mode);
            }
            Cont::CascadeNext { node, idx, recv } => {
                let recv = if idx == 0 {
                    self.pop_val()
                } else {
                    let v = self.pop_val();
                    if idx == node.messages.len() {
                        self.push_val(v);
                        return;
                    }
                    recv
                };
                let msg = &node.messages[idx];
                let act = self.cur_act();
                act.work.push(Cont::CascadeNext {
                    node: node.clone(),
                    idx: idx + 1,
                    recv,
                });
                act.work.push(Cont::Dispatch {
                    selector: msg.selector.clone(),
                    argc: msg.args.len(),
                    super_mode: SuperMode::None,
                    span: msg.span,
                });
                for arg in msg.args.iter().rev() {
                    act.work.push(Cont::Eval(arg.clone()));
                }
                act.vals.push(recv);
            }
            Cont::MakeArray { n } => {
                let items: Vec<Value> = {
                    let act = self.cur_act();
                    let split = act.vals.len() - n;
                    act.vals.drain(split..).collect()
                };
                let v = self.make_array(items);
                self.push_val(v);
            }
            Cont::MakeTable { n } => {
                let items: Vec<Value> = {
                    let act = self.cur_act();
                    let split = act.vals.len() - n;
                    act.vals.drain(split..).collect()
                };
                let mut map = crate::core::fast_map_with_capacity(items.len());
                for item in items {
                    let pair = match item {
                        Value::Array(id) => match self.heap.get(id) {
                            Managed::Array(pair) if pair.len() == 2 => {
                                Some((pair[0], pair[1]))
                            }
                            _ => None,
                        },
                        _ => None,
                    };
                    let Some((k, val)) = pair else {
                        return self.raise(RtError::new(
                            ErrKind::Type,
                            "table literal items must be pairs (key -> value)",
                        ));
                    };
                    let Value::Str(kid) = k else {
                        return self.raise(RtError::new(
                            ErrKind::Type,
                            "table keys must be strings",
                        ));
                    };
                    map.insert(self.heap.str_value(kid).to_string(), val);
                }
                let v = Value::Table(self.heap.alloc(Managed::Table(map)));
                self.push_val(v);
            }
            Cont::Return => {
                let v = self.pop_val();
                self.do_return(v);
            }
            Cont::Install { node } => {
                let class_v = self.pop_val();
                let Value::Class(cid) = class_v else {
                    return self.raise(RtError::new(
                        ErrKind::Type,
                        "method definitions install on classes",
                    ));
                };
                let src = &node.method;
                let selector = self.syms.intern(&src.selector.text);
                let params: Box<[_]> =
                    src.params.iter().map(|p| self.syms.intern(p)).collect();
                let temps: Box<[_]> =
                    src.temps.iter().map(|t| self.syms.intern(t)).collect();
                let source = self.cur_act().source;
                let method = Rc::new(Method {
                    selector,
                    params,
                    temps,
                    body: src.body.clone(),
                    primitive: None,
                    holder: cid,
                    source,
                    span: src.span,
                });
                if node.class_side {
                    self.heap.class_mut(cid).class_methods.insert(selector, method);
                } else {
                    self.heap.class_mut(cid).methods.insert(selector, method);
                    recompute_merged(&mut self.heap, cid);
                }
                self.push_val(class_v);
            }
            Cont::While {
                cond,
                body,
                phase,
                until,
            } => match phase {
                WhilePhase::Start => {
                    self.cur_act().work.push(Cont::While {
                        cond,
                        body,
                        phase: WhilePhase::AfterCond,
                        until,
                    });
                    if let Err(e) = self.push_block(cond, &[]) {
                        self.raise(e);
                    }
                }
                WhilePhase::AfterCond => {
                    let v = self.pop_val();
                    match v {
                        Value::Bool(b) if b == until => {
                            self.cur_act().work.push(Cont::While {
                                cond,
                                body,
                                phase: WhilePhase::AfterBody,
                                until,
                            });
                            if let Err(e) = self.push_block(body, &[]) {
                                self.raise(e);
                            }
                        }
                        Value::Bool(_) => self.push_val(Value::Nil),
                        other => self.raise(RtError::new(
                            ErrKind::Type,
                            format!(
                                "loop condition must answer a boolean, got {}",
                                other.type_name()
                            ),
                        )),
                    }
                }
                WhilePhase::AfterBody => {
                    let _ = self.pop_val();
                    self.cur_act().work.push(Cont::While {
                        cond,
                        body,
                        phase: WhilePhase::AfterCond,
                        until,
                    });
                    if let Err(e) = self.push_block(cond, &[]) {
                        self.raise(e);
                    }
                }
            },
            Cont::ToDo {
                i,
                limit,
                block,
                recv,
            } => {
                let _ = self.pop_val();
                if i > limit {
                    self.push_val(recv);
                } else {
                    // saturate so an i64::MAX bound still terminates
                    let (next, limit) = match i.checked_add(1) {
                        Some(n) => (n, limit),
                        None => (i64::MAX, i64::MIN),
                    };
                    self.cur_act().work.push(Cont::ToDo {
                        i: next,
                        limit,
                        block,
                        recv,
                    });
                    if let Err(e) = self.push_block(block, &[Value::Int(i)]) {
                        self.raise(e);
                    }
                }
            }
        }
    }

    fn eval_expr(&mut self, expr: Expr) {
        match expr {
            Expr::Nil => self.push_val(Value::Nil),
            Expr::True => self.push_val(Value::Bool(true)),
            Expr::False => self.push_val(Value::Bool(false)),
            Expr::Int(v) => self.push_val(Value::Int(v)),
            Expr::Float(v) => self.push_val(Value::Float(v)),
            Expr::Str(s) => {
                let v = self.make_str(&*s);
                self.push_val(v);
            }
            Expr::Symbol(s) => {
                let sym = self.syms.intern(&s);
                self.push_val(Value::Sym(sym));
            }
            Expr::SelfRef => {
                let recv = self.cur_act().receiver;
                self.push_val(recv);
            }
            Expr::Ident(name) => match self.lookup_name(&name) {
                Ok(v) => self.push_val(v),
                Err(e) => self.raise(e),
            },
            Expr::Assign(node) => {
                let act = self.cur_act();
                act.work.push(Cont::Store(node.target.clone()));
                act.work.push(Cont::Eval(node.value.clone()));
            }
            Expr::Send(node) => {
                let act = self.cur_act();
                act.work.push(Cont::Dispatch {
                    selector: node.selector.clone(),
                    argc: node.args.len(),
                    super_mode: node.super_mode.clone(),
                    span: node.span,
                });
                for arg in node.args.iter().rev() {
                    act.work.push(Cont::Eval(arg.clone()));
                }
                act.work.push(Cont::Eval(node.recv.clone()));
            }
            Expr::Cascade(node) => {
                let act = self.cur_act();
                act.work.push(Cont::CascadeNext {
                    node: node.clone(),
                    idx: 0,
                    recv: Value::Nil,
                });
                act.work.push(Cont::Eval(node.recv.clone()));
            }
            Expr::Block(node) => {
                let (frame, source) = {
                    let act = self.acts.last().expect("activation");
                    (act.frame.clone(), act.source)
                };
                let id = self.heap.alloc(Managed::Block(BlockObj {
                    node,
                    frame,
                    source,
                }));
                self.push_val(Value::Block(id));
            }
            Expr::ArrayLit(node) => {
                let act = self.cur_act();
                act.work.push(Cont::MakeArray {
                    n: node.items.len(),
                });
                for item in node.items.iter().rev() {
                    act.work.push(Cont::Eval(item.clone()));
                }
            }
            Expr::TableLit(node) => {
                let act = self.cur_act();
                act.work.push(Cont::MakeTable {
                    n: node.items.len(),
                });
                for item in node.items.iter().rev() {
                    act.work.push(Cont::Eval(item.clone()));
                }
            }
            Expr::Return(node) => {
                let act = self.cur_act();
                act.work.push(Cont::Return);
                match &node.value {
                    Some(e) => act.work.push(Cont::Eval(e.clone())),
                    None => act.vals.push(Value::Nil),
                }
            }
            Expr::MethodDef(node) => {
                let act = self.cur_act();
                act.work.push(Cont::Install { node: node.clone() });
                act.work.push(Cont::Eval(node.target.clone()));
            }
        }
    }

    /// `^ value`: complete the enclosing method, or unwind to a block's
    /// home activation.
    fn do_return(&mut self, v: Value) {
        let (is_block, home) = {
            let act = self.cur_act();
            match act.kind {
                ActKind::Block => (true, act.frame.borrow().home_serial),
                _ => (false, 0),
            }
        };
        if !is_block {
            let act = self.cur_act();
            act.ret = v;
            act.has_returned = true;
            act.work.clear();
            act.vals.clear();
            return;
        }
        match self.acts.iter().position(|a| a.serial == home) {
            Some(pos) => {
                // a non-local return supersedes any unwind in progress
                self.unwind = Some(Unwind {
                    target: pos + 1,
                    action: UnwindAction::HomeReturn(v),
                });
                self.unwind_paused = false;
            }
            None => self.raise(RtError::new(
                ErrKind::BlockContextExpired,
                "non-local return from a block whose home has already returned",
            )),
        }
    }
}

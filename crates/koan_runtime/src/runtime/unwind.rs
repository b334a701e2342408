//! Exception signalling and stack unwinding.
//!
//! Handlers run *at the signal point*: `signal` pushes the handler block
//! on top of the signalling activation without unwinding anything. What
//! the handler then does decides the unwind: `resume:` truncates back to
//! the signal point and feeds a value into the paused send, `return:` (or
//! plain completion) truncates to the `on:do:` sender, `retry` re-runs the
//! protected block, `pass` keeps searching outward. `ensure:` cleanups run
//! LIFO whenever an unwind pops their activation.

use smallvec::SmallVec;
use tracing::debug;

use crate::activation::{EnsureThen, Unwind, UnwindAction};
use crate::core::{Managed, Value};
use crate::error::RtError;
use crate::object::{is_kind_of, new_instance};
use crate::process::Switch;
use crate::runtime::Runtime;

impl Runtime {
    /// Turn a machine error into an exception instance and signal it at
    /// the current activation.
    pub(crate) fn raise(&mut self, e: RtError) {
        debug!(kind = ?e.kind, message = %e.message, "raise");
        let exc = self.make_exception(&e);
        self.signal_exception(exc);
    }

    pub(crate) fn make_exception(&mut self, e: &RtError) -> Value {
        let class = self.kernel.class_for(e.kind);
        let inst = new_instance(&mut self.heap, class);
        let text = self.make_str(e.message.clone());
        let slot = self.syms.intern("messageText");
        if let Some(idx) = self.heap.class(class).slot_index(slot) {
            if let Managed::Instance(i) = self.heap.get_mut(inst) {
                if idx < i.slots.len() {
                    i.slots[idx] = text;
                }
            }
        }
        Value::Instance(inst)
    }

    /// Search outward from the signal point for the nearest enabled
    /// handler whose class covers the exception, and run its handler
    /// block on top of the current stack.
    pub(crate) fn signal_exception(&mut self, exc: Value) {
        let exc_class = self.class_of(exc);
        let found = self.handlers.iter().enumerate().rev().find_map(|(i, h)| {
            if h.disabled {
                return None;
            }
            match h.class {
                Value::Class(hc) if is_kind_of(&self.heap, exc_class, hc) => Some(i),
                _ => None,
            }
        });
        let Some(i) = found else {
            return self.unhandled(exc);
        };

        let (entry_id, handler) = {
            let h = &mut self.handlers[i];
            h.disabled = true;
            (h.id, h.handler)
        };
        let signal_depth = self.acts.len();
        let argv: SmallVec<[Value; 1]> = match self.block_arity(handler) {
            Some(1) => SmallVec::from_slice(&[exc]),
            _ => SmallVec::new(),
        };
        match self.push_block(handler, &argv) {
            Ok(serial) => {
                self.active.push(crate::activation::ActiveHandler {
                    entry_id,
                    exc,
                    signal_depth,
                    act_serial: serial,
                });
            }
            Err(_) => self.unhandled(exc),
        }
    }

    /// No handler: terminate the process, leaving the rendered diagnostic
    /// on it. Pending `ensure:` blocks still run while the stack unwinds.
    fn unhandled(&mut self, exc: Value) {
        let diag = self.render_unhandled(exc);
        self.cur_error = Some(diag);
        self.cur_result = None;
        self.unwind = Some(Unwind {
            target: 0,
            action: UnwindAction::Terminate,
        });
        self.unwind_paused = false;
    }

    /// One unwind step: pop the top activation, or start its cleanup.
    pub(crate) fn unwind_pop_one(&mut self) -> bool {
        let mut act = self.acts.pop().expect("unwind past empty stack");
        // a retry is about to re-push this entry's protected block, so it
        // must survive the pop
        let keep = match &self.unwind {
            Some(Unwind {
                action: UnwindAction::Retry { entry_id },
                ..
            }) => Some(*entry_id),
            _ => None,
        };
        self.handlers
            .retain(|h| h.prot_serial != act.serial || Some(h.id) == keep);
        self.active.retain(|ah| ah.act_serial != act.serial);
        if let Some(cleanup) = act.ensure.take() {
            self.unwind_paused = true;
            if self
                .push_block_with(cleanup, &[], Some(EnsureThen::Unwinding))
                .is_err()
            {
                self.unwind_paused = false;
            }
        }
        true
    }

    /// The unwind reached its target depth: perform its action.
    pub(crate) fn finish_unwind(&mut self) -> bool {
        let uw = self.unwind.take().expect("unwind");
        match uw.action {
            UnwindAction::Deliver(v) => self.deliver(v),
            UnwindAction::HomeReturn(v) => {
                let act = self.acts.last_mut().expect("home activation");
                act.ret = v;
                act.has_returned = true;
                act.work.clear();
                act.vals.clear();
            }
            UnwindAction::Retry { entry_id } => {
                let (protected, found) = match self
                    .handlers
                    .iter_mut()
                    .find(|h| h.id == entry_id)
                {
                    Some(entry) => {
                        entry.disabled = false;
                        (entry.protected, true)
                    }
                    None => (Value::Nil, false),
                };
                if found {
                    match self.push_block(protected, &[]) {
                        Ok(serial) => {
                            if let Some(entry) =
                                self.handlers.iter_mut().find(|h| h.id == entry_id)
                            {
                                entry.prot_serial = serial;
                            }
                        }
                        Err(e) => self.raise(e),
                    }
                }
            }
            UnwindAction::Resignal(exc) => self.signal_exception(exc),
            UnwindAction::Terminate => {
                if self.cur_result.is_none() && self.cur_error.is_none() {
                    self.cur_result = Some(Value::Nil);
                }
                self.switch = Some(Switch::Terminated);
            }
        }
        true
    }

    /// Diagnostic for an unhandled exception: kind, message, and the call
    /// stack from the signal point outward.
    pub(crate) fn render_unhandled(&self, exc: Value) -> String {
        let class = self.class_of(exc);
        let class_name = self.heap.class(class).name.clone();
        let message = self.exception_message(exc);
        let mut out = match message {
            Some(m) => format!("{}: {}", class_name, m),
            None => class_name,
        };
        for act in self.acts.iter().rev() {
            let label = match act.selector_label() {
                Some(m) => format!("#{}", self.syms.resolve(m.selector)),
                None => match act.kind {
                    crate::activation::ActKind::Block => "[block]".to_string(),
                    _ => "<top>".to_string(),
                },
            };
            let recv_class = self.heap.class(self.class_of(act.receiver)).name.clone();
            let pos = self
                .sources
                .get(act.source.0 as usize)
                .map(|src| {
                    let (line, col) = src.text.line_col(act.cur_span.start.0);
                    format!("{}:{}:{}", src.name, line + 1, col + 1)
                })
                .unwrap_or_else(|| "<native>".to_string());
            out.push_str(&format!("\n    {} ({}) {}", label, recv_class, pos));
        }
        out
    }

    pub(crate) fn exception_message(&self, exc: Value) -> Option<String> {
        let Value::Instance(id) = exc else { return None };
        let Managed::Instance(inst) = self.heap.get(id) else {
            return None;
        };
        let class = self.heap.class(inst.class);
        let slot = class
            .slots
            .iter()
            .position(|&s| self.syms.resolve(s) == "messageText")?;
        match inst.slots.get(slot) {
            Some(Value::Str(sid)) => Some(self.heap.str_value(*sid).to_string()),
            _ => None,
        }
    }
}

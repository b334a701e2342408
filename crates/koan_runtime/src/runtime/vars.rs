//! The naming rule at run time.
//!
//! Reads: activation-local frame chain → receiver slots → (uppercase only)
//! globals. Writes stop at the first scope that declares the name and
//! otherwise define in the current activation's locals; uppercase names
//! always read and write the global namespace.

use koan_ir::Name;
use koan_syntax::find_best_match;

use crate::core::{frame_define, frame_get, frame_set, Managed, Value};
use crate::error::{ErrKind, RtError};
use crate::runtime::Runtime;

impl Runtime {
    pub(crate) fn lookup_name(&mut self, name: &Name) -> Result<Value, RtError> {
        if name.global {
            if let Some(&v) = self.globals.get(&*name.text) {
                return Ok(v);
            }
            let mut err = RtError::new(
                ErrKind::Name,
                format!("undefined global: {}", name.text),
            );
            if let Some(close) = find_best_match(&name.text, self.globals.keys().map(|k| k.as_str()))
            {
                err.message.push_str(&format!(" (did you mean {}?)", close));
            }
            return Err(err);
        }

        let sym = self.syms.intern(&name.text);
        let frame = self.cur_act().frame.clone();
        if let Some(v) = frame_get(&frame, sym) {
            return Ok(v);
        }
        if let Some(v) = self.receiver_slot(sym) {
            return Ok(v);
        }
        Err(RtError::new(
            ErrKind::Name,
            format!("undefined variable: {}", name.text),
        ))
    }

    pub(crate) fn store_name(&mut self, name: &Name, v: Value) -> Result<(), RtError> {
        if name.global {
            // first assignment of an anonymous class names it
            if let Value::Class(cid) = v {
                let class = self.heap.class_mut(cid);
                if class.name.is_empty() {
                    class.name = name.text.to_string();
                }
            }
            self.globals.insert(name.text.to_string(), v);
            return Ok(());
        }

        let sym = self.syms.intern(&name.text);
        let frame = self.cur_act().frame.clone();
        if frame_set(&frame, sym, v) {
            return Ok(());
        }
        if self.set_receiver_slot(sym, v) {
            return Ok(());
        }
        frame_define(&frame, sym, v);
        Ok(())
    }

    fn receiver_slot(&mut self, sym: crate::core::Sym) -> Option<Value> {
        let recv = self.cur_act().receiver;
        let Value::Instance(id) = recv else { return None };
        let Managed::Instance(inst) = self.heap.get(id) else {
            return None;
        };
        let idx = self.heap.class(inst.class).slot_index(sym)?;
        let Managed::Instance(inst) = self.heap.get(id) else {
            return None;
        };
        Some(inst.slots.get(idx).copied().unwrap_or(Value::Nil))
    }

    fn set_receiver_slot(&mut self, sym: crate::core::Sym, v: Value) -> bool {
        let recv = self.cur_act().receiver;
        let Value::Instance(id) = recv else { return false };
        let class = match self.heap.get(id) {
            Managed::Instance(inst) => inst.class,
            _ => return false,
        };
        let Some(idx) = self.heap.class(class).slot_index(sym) else {
            return false;
        };
        if let Managed::Instance(inst) = self.heap.get_mut(id) {
            if idx >= inst.slots.len() {
                inst.slots.resize(idx + 1, Value::Nil);
            }
            inst.slots[idx] = v;
        }
        true
    }
}

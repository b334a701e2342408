//! Lexical frames.
//!
//! A frame owns the locals of one activation and points at its lexical
//! parent; a block's frame chains to the frame it was created in, so an
//! escaped block keeps reading (and writing) its captured variables after
//! the defining method has returned. Frames live outside the heap arena —
//! the arena's `Block` objects hold the `Rc` that keeps a chain alive, so
//! cycles never form through `Rc` alone.

use std::cell::RefCell;
use std::rc::Rc;

use super::heap::ObjectId;
use super::value::{Sym, Value};

pub type FrameRef = Rc<RefCell<Frame>>;

pub struct Frame {
    pub names: Vec<Sym>,
    pub values: Vec<Value>,
    pub parent: Option<FrameRef>,
    /// `self` for this chain; copied from the parent for block frames.
    pub receiver: Value,
    /// Activation serial of the method frame at the chain root; the target
    /// of non-local returns.
    pub home_serial: u64,
    /// Class holding the defining method, for `super` inside blocks.
    pub holder: Option<ObjectId>,
}

impl Frame {
    pub fn new(
        receiver: Value,
        home_serial: u64,
        holder: Option<ObjectId>,
        parent: Option<FrameRef>,
    ) -> FrameRef {
        Rc::new(RefCell::new(Frame {
            names: Vec::new(),
            values: Vec::new(),
            parent,
            receiver,
            home_serial,
            holder,
        }))
    }

    pub fn bind(&mut self, name: Sym, value: Value) {
        if let Some(i) = self.names.iter().position(|&n| n == name) {
            self.values[i] = value;
        } else {
            self.names.push(name);
            self.values.push(value);
        }
    }
}

/// Read a variable, walking the lexical chain.
pub fn frame_get(frame: &FrameRef, name: Sym) -> Option<Value> {
    let mut cur = frame.clone();
    loop {
        let next = {
            let f = cur.borrow();
            if let Some(i) = f.names.iter().position(|&n| n == name) {
                return Some(f.values[i]);
            }
            f.parent.clone()
        };
        match next {
            Some(parent) => cur = parent,
            None => return None,
        }
    }
}

/// Write a variable into the innermost frame that declares it. Returns
/// false when no frame in the chain declares the name.
pub fn frame_set(frame: &FrameRef, name: Sym, value: Value) -> bool {
    let mut cur = frame.clone();
    loop {
        let next = {
            let mut f = cur.borrow_mut();
            if let Some(i) = f.names.iter().position(|&n| n == name) {
                f.values[i] = value;
                return true;
            }
            f.parent.clone()
        };
        match next {
            Some(parent) => cur = parent,
            None => return false,
        }
    }
}

/// Declare (or overwrite) a variable in this frame specifically.
pub fn frame_define(frame: &FrameRef, name: Sym, value: Value) {
    frame.borrow_mut().bind(name, value);
}

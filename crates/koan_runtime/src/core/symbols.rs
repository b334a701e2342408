//! Symbol interner: selector and slot names resolve to dense `Sym` ids so
//! method tables key on a `u32` instead of a string.

use std::rc::Rc;

use super::value::{fast_map_new, FastHashMap, Sym};

pub struct Interner {
    map: FastHashMap<Rc<str>, u32>,
    rev: Vec<Rc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self {
            map: fast_map_new(),
            rev: Vec::with_capacity(256),
        }
    }

    pub fn intern(&mut self, text: &str) -> Sym {
        if let Some(&id) = self.map.get(text) {
            return Sym(id);
        }
        let id = self.rev.len() as u32;
        let shared: Rc<str> = text.into();
        self.rev.push(shared.clone());
        self.map.insert(shared, id);
        Sym(id)
    }

    pub fn resolve(&self, sym: Sym) -> &str {
        &self.rev[sym.0 as usize]
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

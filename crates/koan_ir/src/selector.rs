//! Message selectors.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// A message selector: unary (`size`), binary (`+`) or keyword (`at:put:`).
///
/// The `cache` cell memoizes the runtime's interned symbol id for this
/// selector so repeated sends skip the intern lookup; it is ignored by
/// equality and debug formatting.
#[derive(Clone)]
pub struct Selector {
    pub text: Rc<str>,
    pub arity: u8,
    pub cache: Cell<Option<u32>>,
}

impl Selector {
    pub fn new(text: impl Into<Rc<str>>, arity: u8) -> Self {
        Self {
            text: text.into(),
            arity,
            cache: Cell::new(None),
        }
    }

    pub fn unary(text: impl Into<Rc<str>>) -> Self {
        Self::new(text, 0)
    }

    pub fn binary(text: impl Into<Rc<str>>) -> Self {
        Self::new(text, 1)
    }

    pub fn is_keyword(&self) -> bool {
        self.text.ends_with(':')
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.arity == other.arity
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({})", self.text)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

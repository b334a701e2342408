//! Runtime values.
//!
//! A `Value` is a small `Copy` tag: immediates carry their payload, heap
//! kinds carry an `ObjectId` into the arena. Equality on the enum is
//! identity for heap values (same arena slot) and payload equality for
//! immediates, which is exactly what `==` means in the language.

use ahash::RandomState;
use hashbrown::HashMap;
use std::hash::Hash;

use super::heap::ObjectId;

/// An interned symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Sym(pub u32);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Sym(Sym),
    Str(ObjectId),
    Array(ObjectId),
    Table(ObjectId),
    Block(ObjectId),
    Class(ObjectId),
    Instance(ObjectId),
}

impl Default for Value {
    fn default() -> Self {
        Value::Nil
    }
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn obj_id(&self) -> Option<ObjectId> {
        match self {
            Value::Str(id)
            | Value::Array(id)
            | Value::Table(id)
            | Value::Block(id)
            | Value::Class(id)
            | Value::Instance(id) => Some(*id),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Sym(_) => "symbol",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Table(_) => "table",
            Value::Block(_) => "block",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }
}

pub type FastHashMap<K, V> = HashMap<K, V, RandomState>;

/// Seeded hasher so iteration order is stable across runs.
fn fast_hasher() -> RandomState {
    RandomState::with_seeds(0, 0, 0, 0)
}

pub fn fast_map_new<K: Eq + Hash, V>() -> FastHashMap<K, V> {
    HashMap::with_hasher(fast_hasher())
}

pub fn fast_map_with_capacity<K: Eq + Hash, V>(cap: usize) -> FastHashMap<K, V> {
    HashMap::with_capacity_and_hasher(cap, fast_hasher())
}

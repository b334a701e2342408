//! Core runtime data: values, the heap arena, the symbol interner and the
//! lexical frame chain.

mod frame;
mod heap;
mod symbols;
mod value;

pub use frame::{frame_define, frame_get, frame_set, Frame, FrameRef};
pub use heap::{Heap, Managed, ObjectId};
pub use symbols::Interner;
pub use value::{fast_map_new, fast_map_with_capacity, FastHashMap, Sym, Value};

//! Lexer for Koan source text.
mod lexer;

pub use lexer::{LexResult, Lexer};

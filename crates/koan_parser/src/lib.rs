//! Parser for Koan.
//!
//! Converts lexer tokens into a syntax tree (`Program`/`Stmt`/`Expr`) and
//! collects diagnostics. Statement parsing is recursive descent; expressions
//! follow the Smalltalk precedence ladder (unary > binary > keyword) with
//! cascades and assignment at the outermost level.
mod expr;
mod parser;

pub use parser::{parse_source, ParseResult, Parser};

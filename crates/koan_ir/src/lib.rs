//! AST node types shared by the parser and the runtime.
mod ast;
mod selector;

pub use ast::{
    ArrayNode, AssignNode, BlockNode, CascadeMsg, CascadeNode, Expr, MethodDefNode, MethodSrc,
    Name, Program, ReturnNode, SendNode, Stmt, SuperMode,
};
pub use selector::Selector;

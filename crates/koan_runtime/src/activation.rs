//! Activation records and their expression-continuation frames.
//!
//! The machine never recurses in Rust across a message send: evaluating an
//! expression pushes small `Cont` frames onto the activation's work stack,
//! and sending to a user method or block pushes a whole new `Activation`.
//! That makes every process resumable at message-send granularity, which
//! is what quanta, `resume:` and `terminate` unwinding are built on.

use std::rc::Rc;

use koan_ir::{CascadeNode, Expr, MethodDefNode, Name, Selector, SuperMode};
use koan_syntax::{SourceId, Span};

use crate::core::{FrameRef, Value};
use crate::object::Method;

/// What kind of code an activation is running.
#[derive(Clone)]
pub enum ActKind {
    /// Top-level statements of a program or REPL line.
    TopLevel,
    /// A method body.
    Method { method: Rc<Method> },
    /// A block body; its home is found through the frame chain.
    Block,
}

/// What to do once an `ensure:` cleanup block finishes.
#[derive(Clone)]
pub enum EnsureThen {
    /// Normal completion path: hand this value to the caller.
    Deliver(Value),
    /// The cleanup ran in the middle of an unwind; resume it.
    Unwinding,
}

pub struct Activation {
    pub serial: u64,
    pub kind: ActKind,
    pub receiver: Value,
    pub frame: FrameRef,
    pub body: Rc<[koan_ir::Stmt]>,
    pub pc: usize,
    pub work: Vec<Cont>,
    pub vals: Vec<Value>,
    /// Cleanup block installed by `ensure:` on this activation.
    pub ensure: Option<Value>,
    /// Set when this activation *is* an ensure cleanup; carries the
    /// continuation for when it finishes.
    pub ensure_then: Option<EnsureThen>,
    pub has_returned: bool,
    pub ret: Value,
    pub cur_span: Span,
    pub source: SourceId,
}

impl Activation {
    pub fn selector_label(&self) -> Option<&Rc<Method>> {
        match &self.kind {
            ActKind::Method { method } => Some(method),
            _ => None,
        }
    }
}

/// Expression continuation frames.
pub enum Cont {
    /// Evaluate a node; literals complete immediately, composites push
    /// further frames.
    Eval(Expr),
    /// Value on top of the stack → store through the naming rule, leaving
    /// the value in place as the assignment's value.
    Store(Name),
    /// Pop `argc` arguments and a receiver, then dispatch.
    Dispatch {
        selector: Selector,
        argc: usize,
        super_mode: SuperMode,
        span: Span,
    },
    /// Continue a cascade at message `idx`; `recv` is the saved receiver
    /// (nil until the receiver expression completes).
    CascadeNext {
        node: Rc<CascadeNode>,
        idx: usize,
        recv: Value,
    },
    /// Pop `n` values into a fresh array.
    MakeArray { n: usize },
    /// Pop `n` pair arrays into a fresh table.
    MakeTable { n: usize },
    /// Value on top of the stack → method return or non-local return.
    Return,
    /// Value on top of the stack is the target class → install a method.
    Install { node: Rc<MethodDefNode> },
    /// `whileTrue:` / `whileFalse:` loop driver.
    While {
        cond: Value,
        body: Value,
        phase: WhilePhase,
        /// Loop while the condition equals this.
        until: bool,
    },
    /// `to:do:` loop driver; entered with the previous iteration's value
    /// (or a seed) on the stack.
    ToDo {
        i: i64,
        limit: i64,
        block: Value,
        recv: Value,
    },
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum WhilePhase {
    /// Kick off: evaluate the condition block.
    Start,
    /// The condition's result is on the value stack.
    AfterCond,
    /// The body's result is on the value stack; discard and re-check.
    AfterBody,
}

/// A handler installed by `on:do:`, alive while the protected block runs.
pub struct HandlerEntry {
    pub id: u64,
    /// Exception class this handler covers.
    pub class: Value,
    pub handler: Value,
    /// The protected block, kept for `retry`.
    pub protected: Value,
    /// Stack depth of the activation the `on:do:` send is pending in;
    /// `return:` unwinds to exactly this depth.
    pub owner_depth: usize,
    pub prot_serial: u64,
    /// Disabled while its own handler runs, so a signal inside the handler
    /// searches outward.
    pub disabled: bool,
}

/// A handler currently running for a signalled exception.
pub struct ActiveHandler {
    pub entry_id: u64,
    pub exc: Value,
    /// Stack depth at the signal point; `resume:` truncates back to here
    /// and delivers into the paused `signal` send.
    pub signal_depth: usize,
    /// Serial of the handler-block activation.
    pub act_serial: u64,
}

/// An unwind in progress: pop activations (running `ensure:` blocks LIFO)
/// until `target` depth, then perform the action.
pub struct Unwind {
    pub target: usize,
    pub action: UnwindAction,
}

pub enum UnwindAction {
    /// Push a value into the activation left on top (resume / handler
    /// return / ensure-normal-return).
    Deliver(Value),
    /// The activation left on top is a non-local return's home; complete
    /// it with this value.
    HomeReturn(Value),
    /// Re-run an `on:do:` protected block from the start.
    Retry { entry_id: u64 },
    /// Continue an exception search outward (`pass`).
    Resignal(Value),
    /// Process termination: discard everything.
    Terminate,
}

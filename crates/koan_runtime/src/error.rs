//! Runtime error kinds and the host-facing error type.

use thiserror::Error;

/// The error taxonomy. Every kind maps onto a bootstrap exception class, so
/// a natively raised error is catchable with `on:do:` like any signalled
/// exception.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrKind {
    Name,
    Arity,
    MessageNotUnderstood,
    AmbiguousMethod,
    SlotConflict,
    Subscript,
    DivisionByZero,
    Type,
    BlockContextExpired,
    StackOverflow,
    Process,
    Error,
}

impl ErrKind {
    /// Name of the exception class instances of this kind belong to.
    pub fn class_name(self) -> &'static str {
        match self {
            ErrKind::Name => "NameError",
            ErrKind::Arity => "ArityError",
            ErrKind::MessageNotUnderstood => "MessageNotUnderstood",
            ErrKind::AmbiguousMethod => "AmbiguousMethod",
            ErrKind::SlotConflict => "SlotConflict",
            ErrKind::Subscript => "SubscriptOutOfBounds",
            ErrKind::DivisionByZero => "DivisionByZero",
            ErrKind::Type => "TypeError",
            ErrKind::BlockContextExpired => "BlockContextExpired",
            ErrKind::StackOverflow => "StackOverflow",
            ErrKind::Process => "ProcessError",
            ErrKind::Error => "Error",
        }
    }
}

/// An error raised inside the machine, before it becomes an exception
/// instance.
#[derive(Clone, Debug)]
pub struct RtError {
    pub kind: ErrKind,
    pub message: String,
}

impl RtError {
    pub fn new(kind: ErrKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Host-facing failures of a whole evaluation.
#[derive(Debug, Error)]
pub enum KoanError {
    /// Lex or parse diagnostics, already rendered against the source.
    #[error("{0}")]
    Parse(String),
    /// An exception reached the top of the main process; carries the
    /// rendered diagnostic with the call stack.
    #[error("{0}")]
    Unhandled(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

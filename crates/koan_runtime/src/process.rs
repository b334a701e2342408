//! Green-thread processes and the synchronisation structures they block on.

use std::collections::VecDeque;
use std::time::Instant;

use crate::activation::{ActiveHandler, Activation, HandlerEntry, Unwind};
use crate::core::{ObjectId, Value};

pub type Pid = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcState {
    Ready,
    Running,
    Blocked,
    Suspended,
    Terminated,
}

impl ProcState {
    pub fn label(self) -> &'static str {
        match self {
            ProcState::Ready => "ready",
            ProcState::Running => "running",
            ProcState::Blocked => "blocked",
            ProcState::Suspended => "suspended",
            ProcState::Terminated => "terminated",
        }
    }
}

/// What a blocked process is waiting for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WaitCond {
    None,
    Sleep(Instant),
    Semaphore(usize),
    Channel(usize),
    Join(Pid),
}

/// One cooperative process: a private activation stack plus handler state,
/// sharing the global namespace and heap with every other process.
pub struct Process {
    pub id: Pid,
    pub name: String,
    pub state: ProcState,
    pub priority: i64,
    pub acts: Vec<Activation>,
    pub handlers: Vec<HandlerEntry>,
    pub active: Vec<ActiveHandler>,
    pub unwind: Option<Unwind>,
    /// True while an `ensure:` cleanup is running inside an unwind.
    pub unwind_paused: bool,
    pub wait: WaitCond,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub join_waiters: Vec<Pid>,
    /// The `Process` proxy instance handed to the language.
    pub proxy: Option<ObjectId>,
    /// Forked processes print their unhandled-exception diagnostics; the
    /// main process hands them to the embedder instead.
    pub report_errors: bool,
}

impl Process {
    pub fn new(id: Pid, name: String) -> Self {
        Self {
            id,
            name,
            state: ProcState::Ready,
            priority: 0,
            acts: Vec::new(),
            handlers: Vec::new(),
            active: Vec::new(),
            unwind: None,
            unwind_paused: false,
            wait: WaitCond::None,
            result: None,
            error: None,
            join_waiters: Vec::new(),
            proxy: None,
            report_errors: false,
        }
    }
}

/// Pending state change for the currently running process, applied at the
/// quantum boundary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Switch {
    Yield,
    Block(WaitCond),
    Suspend,
    Terminated,
}

pub struct ChannelState {
    pub queue: VecDeque<Value>,
    pub waiters: VecDeque<Pid>,
}

impl ChannelState {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            waiters: VecDeque::new(),
        }
    }
}

pub struct SemState {
    pub count: i64,
    pub waiters: VecDeque<Pid>,
}

impl SemState {
    pub fn new() -> Self {
        Self {
            count: 0,
            waiters: VecDeque::new(),
        }
    }
}

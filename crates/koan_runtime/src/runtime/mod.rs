//! The runtime: shared heap/globals, the process table, and the execution
//! state of the currently running process.
//!
//! One `Runtime` hosts every green thread. While a process runs its
//! quantum, its activation stack and handler state are swapped into the
//! runtime so the machine and primitives work on plain fields; the
//! scheduler swaps them back at the quantum boundary.

mod sched;
pub(crate) mod send;
mod step;
mod unwind;
mod vars;

use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use koan_ir::{Program, Selector};
use koan_parser::parse_source;
use koan_syntax::{render_diagnostics, Severity, SourceFile, SourceId, Span};

use crate::activation::{ActKind, Activation, ActiveHandler, Cont, HandlerEntry, Unwind};
use crate::bootstrap::{self, KernelClasses};
use crate::core::{Frame, FrameRef, Heap, Interner, Managed, ObjectId, Sym, Value};
use crate::error::KoanError;
use crate::process::{ChannelState, Pid, Process, ProcState, SemState, Switch};

/// Tunables surfaced on the command line.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Activation-stack ceiling per process.
    pub max_stack: usize,
    /// Message sends per scheduling quantum.
    pub quantum: usize,
    /// Library directory for kernel overrides (`$KOAN_HOME` / `--home`).
    pub home: Option<PathBuf>,
    /// Replacement bootstrap file (`--bootstrap`).
    pub bootstrap: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_stack: 10_000,
            quantum: 1,
            home: None,
            bootstrap: None,
        }
    }
}

pub struct Runtime {
    pub heap: Heap,
    pub syms: Interner,
    pub globals: IndexMap<String, Value>,
    pub sources: Vec<SourceFile>,
    pub(crate) kernel: KernelClasses,
    pub config: RunConfig,

    /// Captured program output; mirrored to stdout when `echo` is set.
    pub(crate) output: String,
    pub(crate) echo: bool,

    pub(crate) procs: Vec<Option<Process>>,
    pub(crate) ready: VecDeque<Pid>,
    pub(crate) cur: Pid,

    // Execution state of the running process, swapped in for the quantum.
    pub(crate) acts: Vec<Activation>,
    pub(crate) handlers: Vec<HandlerEntry>,
    pub(crate) active: Vec<ActiveHandler>,
    pub(crate) unwind: Option<Unwind>,
    pub(crate) unwind_paused: bool,
    pub(crate) switch: Option<Switch>,
    pub(crate) cur_result: Option<Value>,
    pub(crate) cur_error: Option<String>,
    pub(crate) sends: usize,

    pub(crate) next_serial: u64,
    pub(crate) next_handler_id: u64,
    pub(crate) channels: Vec<ChannelState>,
    pub(crate) semaphores: Vec<SemState>,
    /// Persistent top-level frame: REPL lowercase bindings live here.
    pub(crate) top_frame: FrameRef,
}

impl Runtime {
    pub fn new() -> Result<Self, KoanError> {
        Self::with_config(RunConfig::default())
    }

    pub fn with_config(config: RunConfig) -> Result<Self, KoanError> {
        let top_frame = Frame::new(Value::Nil, 0, None, None);
        let mut rt = Self {
            heap: Heap::new(),
            syms: Interner::new(),
            globals: IndexMap::new(),
            sources: Vec::new(),
            kernel: KernelClasses::default(),
            config,
            output: String::new(),
            echo: false,
            procs: Vec::new(),
            ready: VecDeque::new(),
            cur: 0,
            acts: Vec::new(),
            handlers: Vec::new(),
            active: Vec::new(),
            unwind: None,
            unwind_paused: false,
            switch: None,
            cur_result: None,
            cur_error: None,
            sends: 0,
            next_serial: 1,
            next_handler_id: 1,
            channels: Vec::new(),
            semaphores: Vec::new(),
            top_frame,
        };
        bootstrap::install(&mut rt)?;
        Ok(rt)
    }

    /// Mirror program output to stdout as it happens.
    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    pub(crate) fn emit(&mut self, text: &str) {
        if self.echo {
            print!("{text}");
        } else {
            self.output.push_str(text);
        }
    }

    // --- front door -----------------------------------------------------

    /// Parse a source unit, registering it for diagnostics. Parse errors
    /// come back rendered.
    pub fn parse_program(
        &mut self,
        name: &str,
        text: &str,
    ) -> Result<(Program, SourceId), KoanError> {
        let result = parse_source(text);
        let id = SourceId(self.sources.len() as u32);
        let file = SourceFile::new(id, name, text.to_string());
        if result
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
        {
            let rendered = render_diagnostics(&file, &result.diagnostics);
            return Err(KoanError::Parse(rendered));
        }
        self.sources.push(file);
        Ok((result.program, id))
    }

    /// Run a parsed program on a fresh main process to completion.
    pub fn run_program(&mut self, program: &Program, source: SourceId) -> Result<Value, KoanError> {
        let pid = self.spawn_toplevel(program.stmts.clone(), source, "main");
        self.run_scheduler();
        self.reap(pid)
    }

    /// Parse and run a source unit.
    pub fn eval_source(&mut self, name: &str, text: &str) -> Result<Value, KoanError> {
        let (program, source) = self.parse_program(name, text)?;
        self.run_program(&program, source)
    }

    fn reap(&mut self, pid: Pid) -> Result<Value, KoanError> {
        let proc = self.procs[pid].as_mut().expect("process row");
        if let Some(err) = proc.error.take() {
            return Err(KoanError::Unhandled(err));
        }
        Ok(proc.result.unwrap_or(Value::Nil))
    }

    /// The result's `printString`, via a scratch process; falls back to the
    /// native rendering when the send itself fails.
    pub fn display(&mut self, value: Value) -> String {
        let sel = self.syms.intern("printString");
        let pid = self.spawn_send(value, sel, &[], "printString");
        self.run_scheduler();
        let proc = self.procs[pid].as_mut().expect("process row");
        if proc.error.take().is_none() {
            if let Some(Value::Str(id)) = proc.result {
                return self.heap.str_value(id).to_string();
            }
        }
        self.basic_print(value)
    }

    // --- process construction -------------------------------------------

    pub(crate) fn next_serial(&mut self) -> u64 {
        let s = self.next_serial;
        self.next_serial += 1;
        s
    }

    fn new_process(&mut self, name: &str) -> Pid {
        let pid = self.procs.len();
        let mut proc = Process::new(pid, name.to_string());
        proc.state = ProcState::Ready;
        self.procs.push(Some(proc));
        self.ready.push_back(pid);
        debug!(pid, name, "process created");
        pid
    }

    /// A process whose root activation runs top-level statements against
    /// the persistent top-level frame.
    pub(crate) fn spawn_toplevel(
        &mut self,
        body: Rc<[koan_ir::Stmt]>,
        source: SourceId,
        name: &str,
    ) -> Pid {
        let pid = self.new_process(name);
        let act = Activation {
            serial: 0,
            kind: ActKind::TopLevel,
            receiver: Value::Nil,
            frame: self.top_frame.clone(),
            body,
            pc: 0,
            work: Vec::new(),
            vals: Vec::new(),
            ensure: None,
            ensure_then: None,
            has_returned: false,
            ret: Value::Nil,
            cur_span: Span::default(),
            source,
        };
        self.procs[pid].as_mut().expect("process row").acts.push(act);
        pid
    }

    /// A scratch process that performs one send and terminates with its
    /// result.
    pub(crate) fn spawn_send(&mut self, recv: Value, sel: Sym, args: &[Value], name: &str) -> Pid {
        let pid = self.new_process(name);
        let serial = self.next_serial();
        let frame = Frame::new(Value::Nil, serial, None, None);
        let mut act = Activation {
            serial,
            kind: ActKind::TopLevel,
            receiver: Value::Nil,
            frame,
            body: Rc::from(Vec::new()),
            pc: 0,
            work: Vec::new(),
            vals: Vec::new(),
            ensure: None,
            ensure_then: None,
            has_returned: false,
            ret: Value::Nil,
            cur_span: Span::default(),
            source: SourceId(0),
        };
        act.vals.push(recv);
        act.vals.extend_from_slice(args);
        let text = self.syms.resolve(sel).to_string();
        act.work.push(Cont::Dispatch {
            selector: Selector::new(text, args.len() as u8),
            argc: args.len(),
            super_mode: koan_ir::SuperMode::None,
            span: Span::default(),
        });
        self.procs[pid].as_mut().expect("process row").acts.push(act);
        pid
    }

    // --- small shared helpers -------------------------------------------

    pub(crate) fn intern_selector(&mut self, sel: &Selector) -> Sym {
        if let Some(id) = sel.cache.get() {
            return Sym(id);
        }
        let sym = self.syms.intern(&sel.text);
        sel.cache.set(Some(sym.0));
        sym
    }

    pub(crate) fn make_str(&mut self, s: impl Into<String>) -> Value {
        Value::Str(self.heap.alloc(Managed::Str(s.into())))
    }

    pub(crate) fn make_array(&mut self, items: Vec<Value>) -> Value {
        Value::Array(self.heap.alloc(Managed::Array(items)))
    }

    /// Class of a value, for dispatch.
    pub(crate) fn class_of(&self, v: Value) -> ObjectId {
        match v {
            Value::Nil => self.kernel.undefined,
            Value::Bool(true) => self.kernel.true_class,
            Value::Bool(false) => self.kernel.false_class,
            Value::Int(_) => self.kernel.integer,
            Value::Float(_) => self.kernel.float,
            Value::Sym(_) => self.kernel.symbol,
            Value::Str(_) => self.kernel.string,
            Value::Array(_) => self.kernel.array,
            Value::Table(_) => self.kernel.table,
            Value::Block(_) => self.kernel.block,
            Value::Class(_) => self.kernel.class,
            Value::Instance(id) => match self.heap.get(id) {
                Managed::Instance(inst) => inst.class,
                _ => self.kernel.object,
            },
        }
    }

    /// Dispatch-free rendering, used as the `printString` fallback and for
    /// diagnostics.
    pub(crate) fn basic_print(&self, v: Value) -> String {
        self.basic_print_depth(v, 0)
    }

    fn basic_print_depth(&self, v: Value, depth: u32) -> String {
        // cyclic structures bottom out instead of recursing forever
        if depth > 8 {
            return "...".to_string();
        }
        match v {
            Value::Nil => "nil".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(f),
            Value::Sym(s) => format!("#{}", self.syms.resolve(s)),
            Value::Str(id) => format!("\"{}\"", self.heap.str_value(id).replace('"', "\"\"")),
            Value::Array(id) => match self.heap.get(id) {
                Managed::Array(items) => {
                    let inner: Vec<String> = items
                        .iter()
                        .map(|&e| self.basic_print_depth(e, depth + 1))
                        .collect();
                    format!("#({})", inner.join(" "))
                }
                _ => "#()".to_string(),
            },
            Value::Table(id) => match self.heap.get(id) {
                Managed::Table(map) => {
                    let inner: Vec<String> = map
                        .iter()
                        .map(|(k, &val)| {
                            format!("\"{}\" -> {}", k, self.basic_print_depth(val, depth + 1))
                        })
                        .collect();
                    format!("#[{}]", inner.join(". "))
                }
                _ => "#[]".to_string(),
            },
            Value::Block(_) => "a Block".to_string(),
            Value::Class(id) => {
                let name = &self.heap.class(id).name;
                if name.is_empty() {
                    "a Class".to_string()
                } else {
                    name.clone()
                }
            }
            Value::Instance(id) => match self.heap.get(id) {
                Managed::Instance(inst) => {
                    let name = &self.heap.class(inst.class).name;
                    if name.is_empty() {
                        "an instance".to_string()
                    } else {
                        format!("a {}", name)
                    }
                }
                _ => "an instance".to_string(),
            },
        }
    }
}

pub(crate) fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

//! The cooperative scheduler.
//!
//! One OS thread, a round-robin ready queue, and a quantum counted in
//! message sends. The running process's stacks are swapped into the
//! runtime for the quantum and swapped back at the boundary, so a
//! process can always be parked mid-program.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::activation::{Cont, Unwind, UnwindAction};
use crate::core::{FrameRef, Managed, Value};
use crate::error::{ErrKind, RtError};
use crate::object::new_instance;
use crate::process::{ChannelState, Pid, ProcState, SemState, Switch, WaitCond};
use crate::runtime::Runtime;

impl Runtime {
    /// Run until no process is Ready and no deadline is pending.
    pub(crate) fn run_scheduler(&mut self) {
        loop {
            if self.heap.should_gc() {
                self.gc();
            }
            self.wake_sleepers();
            let Some(pid) = self.pop_ready() else {
                match self.next_wake_time() {
                    Some(next) => {
                        let now = Instant::now();
                        if next > now {
                            std::thread::sleep(next - now);
                        }
                        continue;
                    }
                    None => break,
                }
            };
            self.run_quantum(pid);
            if self.procs[pid]
                .as_ref()
                .map_or(false, |p| p.state == ProcState::Ready)
            {
                self.ready.push_back(pid);
            }
        }
    }

    fn pop_ready(&mut self) -> Option<Pid> {
        while let Some(pid) = self.ready.pop_front() {
            if self.procs[pid]
                .as_ref()
                .map_or(false, |p| p.state == ProcState::Ready)
            {
                return Some(pid);
            }
        }
        None
    }

    fn run_quantum(&mut self, pid: Pid) {
        self.swap_in(pid);
        loop {
            if self.switch.is_some() {
                break;
            }
            if !self.step() {
                break;
            }
            if self.sends >= self.config.quantum {
                break;
            }
        }
        self.swap_out(pid);
    }

    fn swap_in(&mut self, pid: Pid) {
        let proc = self.procs[pid].as_mut().expect("process row");
        proc.state = ProcState::Running;
        self.cur = pid;
        self.acts = std::mem::take(&mut proc.acts);
        self.handlers = std::mem::take(&mut proc.handlers);
        self.active = std::mem::take(&mut proc.active);
        self.unwind = proc.unwind.take();
        self.unwind_paused = proc.unwind_paused;
        self.switch = None;
        self.cur_result = None;
        self.cur_error = None;
        self.sends = 0;
    }

    fn swap_out(&mut self, pid: Pid) {
        let acts = std::mem::take(&mut self.acts);
        let handlers = std::mem::take(&mut self.handlers);
        let active = std::mem::take(&mut self.active);
        let unwind = self.unwind.take();
        let unwind_paused = std::mem::replace(&mut self.unwind_paused, false);
        let switch = self.switch.take();
        let result = self.cur_result.take();
        let error = self.cur_error.take();

        let (terminated, waiters, final_result) = {
            let proc = self.procs[pid].as_mut().expect("process row");
            proc.acts = acts;
            proc.handlers = handlers;
            proc.active = active;
            proc.unwind = unwind;
            proc.unwind_paused = unwind_paused;
            match switch {
                Some(Switch::Terminated) => {
                    proc.state = ProcState::Terminated;
                    proc.wait = WaitCond::None;
                    proc.result = result;
                    proc.error = error;
                    proc.acts.clear();
                    proc.handlers.clear();
                    proc.active.clear();
                    proc.unwind = None;
                    debug!(pid, "process terminated");
                    if let (Some(err), true) = (&proc.error, proc.report_errors) {
                        eprintln!("{}", err);
                    }
                    (
                        true,
                        std::mem::take(&mut proc.join_waiters),
                        proc.result.unwrap_or(Value::Nil),
                    )
                }
                Some(Switch::Yield) | None => {
                    proc.state = ProcState::Ready;
                    (false, Vec::new(), Value::Nil)
                }
                Some(Switch::Block(wait)) => {
                    proc.state = ProcState::Blocked;
                    proc.wait = wait;
                    (false, Vec::new(), Value::Nil)
                }
                Some(Switch::Suspend) => {
                    proc.state = ProcState::Suspended;
                    (false, Vec::new(), Value::Nil)
                }
            }
        };

        if terminated {
            for w in waiters {
                self.wake_joiner(w, final_result);
            }
        }
    }

    fn wake_joiner(&mut self, pid: Pid, result: Value) {
        if let Some(proc) = self.procs.get_mut(pid).and_then(|p| p.as_mut()) {
            if proc.state == ProcState::Blocked && matches!(proc.wait, WaitCond::Join(_)) {
                proc.wait = WaitCond::None;
                proc.state = ProcState::Ready;
                if let Some(act) = proc.acts.last_mut() {
                    act.vals.push(result);
                }
                self.ready.push_back(pid);
            }
        }
    }

    fn wake_sleepers(&mut self) {
        let now = Instant::now();
        let mut woken: Vec<Pid> = Vec::new();
        for proc in self.procs.iter_mut().flatten() {
            if proc.state == ProcState::Blocked {
                if let WaitCond::Sleep(deadline) = proc.wait {
                    if deadline <= now {
                        proc.state = ProcState::Ready;
                        proc.wait = WaitCond::None;
                        woken.push(proc.id);
                    }
                }
            }
        }
        for pid in woken {
            self.ready.push_back(pid);
        }
    }

    fn next_wake_time(&self) -> Option<Instant> {
        self.procs
            .iter()
            .flatten()
            .filter_map(|p| match (p.state, p.wait) {
                (ProcState::Blocked, WaitCond::Sleep(deadline)) => Some(deadline),
                _ => None,
            })
            .min()
    }

    // --- process operations (used by the Processor primitives) ----------

    /// `Processor fork: aBlock` — a new Ready process whose root
    /// activation evaluates the block.
    pub(crate) fn fork_block(&mut self, block: Value) -> Result<Value, RtError> {
        let act = self.block_activation(block, &[], None)?;
        let pid = self.procs.len();
        let mut proc = crate::process::Process::new(pid, format!("process-{}", pid));
        proc.report_errors = true;
        proc.acts.push(act);
        let proxy = new_instance(&mut self.heap, self.kernel.process);
        if let Managed::Instance(inst) = self.heap.get_mut(proxy) {
            inst.native = Some(pid as u64);
        }
        proc.proxy = Some(proxy);
        self.procs.push(Some(proc));
        self.ready.push_back(pid);
        debug!(pid, "forked");
        Ok(Value::Instance(proxy))
    }

    /// Resolve a Process proxy instance back to its pid.
    pub(crate) fn proxy_pid(&self, recv: Value) -> Result<Pid, RtError> {
        if let Value::Instance(id) = recv {
            if let Managed::Instance(inst) = self.heap.get(id) {
                if let Some(pid) = inst.native {
                    let pid = pid as usize;
                    if pid < self.procs.len() && self.procs[pid].is_some() {
                        return Ok(pid);
                    }
                }
            }
        }
        Err(RtError::new(ErrKind::Process, "not a process"))
    }

    pub(crate) fn state_of(&self, pid: Pid) -> ProcState {
        self.procs[pid].as_ref().map(|p| p.state).unwrap_or(ProcState::Terminated)
    }

    /// Push a value into a parked process's pending send.
    fn deliver_to(&mut self, pid: Pid, v: Value) {
        if pid == self.cur {
            self.push_val(v);
        } else if let Some(proc) = self.procs.get_mut(pid).and_then(|p| p.as_mut()) {
            if let Some(act) = proc.acts.last_mut() {
                act.vals.push(v);
            }
        }
    }

    pub(crate) fn terminate_process(&mut self, pid: Pid) -> Result<(), RtError> {
        if pid == self.cur {
            self.unwind = Some(Unwind {
                target: 0,
                action: UnwindAction::Terminate,
            });
            self.unwind_paused = false;
            return Ok(());
        }
        let proc = self.procs[pid].as_mut().expect("process row");
        if proc.state == ProcState::Terminated {
            return Err(RtError::new(
                ErrKind::Process,
                "process is already terminated",
            ));
        }
        // park an unwind on the target; the scheduler drives its ensure
        // blocks before discarding the stack
        proc.unwind = Some(Unwind {
            target: 0,
            action: UnwindAction::Terminate,
        });
        proc.unwind_paused = false;
        proc.wait = WaitCond::None;
        proc.state = ProcState::Ready;
        self.ready.push_back(pid);
        Ok(())
    }

    pub(crate) fn suspend_process(&mut self, pid: Pid) -> Result<(), RtError> {
        if pid == self.cur {
            self.switch = Some(Switch::Suspend);
            return Ok(());
        }
        let proc = self.procs[pid].as_mut().expect("process row");
        match proc.state {
            ProcState::Ready => {
                proc.state = ProcState::Suspended;
                Ok(())
            }
            ProcState::Suspended => Ok(()),
            ProcState::Terminated => Err(RtError::new(
                ErrKind::Process,
                "cannot suspend a terminated process",
            )),
            _ => Err(RtError::new(
                ErrKind::Process,
                "cannot suspend a blocked process",
            )),
        }
    }

    pub(crate) fn resume_process(&mut self, pid: Pid) -> Result<(), RtError> {
        if pid == self.cur {
            return Ok(());
        }
        let wait = {
            let proc = self.procs[pid].as_mut().expect("process row");
            match proc.state {
                ProcState::Suspended => {
                    proc.state = ProcState::Ready;
                    WaitCond::None
                }
                ProcState::Blocked => {
                    let w = proc.wait;
                    proc.wait = WaitCond::None;
                    proc.state = ProcState::Ready;
                    w
                }
                ProcState::Ready | ProcState::Running => return Ok(()),
                ProcState::Terminated => {
                    return Err(RtError::new(
                        ErrKind::Process,
                        "cannot resume a terminated process",
                    ))
                }
            }
        };
        // A forced resume out of a channel receive or join leaves a send
        // waiting for its value; feed it nil. Sleeps and semaphore waits
        // delivered their value when they parked.
        if matches!(wait, WaitCond::Channel(_) | WaitCond::Join(_)) {
            self.deliver_to(pid, Value::Nil);
        }
        if let WaitCond::Join(target) = wait {
            if let Some(t) = self.procs.get_mut(target).and_then(|p| p.as_mut()) {
                t.join_waiters.retain(|&w| w != pid);
            }
        }
        self.ready.push_back(pid);
        Ok(())
    }

    pub(crate) fn join_process(&mut self, pid: Pid) -> Result<Option<Value>, RtError> {
        if pid == self.cur {
            return Err(RtError::new(ErrKind::Process, "a process cannot join itself"));
        }
        let proc = self.procs[pid].as_mut().expect("process row");
        if proc.state == ProcState::Terminated {
            return Ok(Some(proc.result.unwrap_or(Value::Nil)));
        }
        proc.join_waiters.push(self.cur);
        self.switch = Some(Switch::Block(WaitCond::Join(pid)));
        Ok(None)
    }

    // --- channels & semaphores ------------------------------------------

    pub(crate) fn new_channel(&mut self) -> usize {
        self.channels.push(ChannelState::new());
        self.channels.len() - 1
    }

    pub(crate) fn new_semaphore(&mut self) -> usize {
        self.semaphores.push(SemState::new());
        self.semaphores.len() - 1
    }

    /// Deliver to the first waiter that is still genuinely waiting on
    /// this condition, or report that none was.
    fn pop_valid_waiter(&mut self, waiters: &mut std::collections::VecDeque<Pid>, cond: impl Fn(WaitCond) -> bool) -> Option<Pid> {
        while let Some(w) = waiters.pop_front() {
            let valid = self
                .procs
                .get(w)
                .and_then(|p| p.as_ref())
                .map_or(false, |p| p.state == ProcState::Blocked && cond(p.wait));
            if valid {
                return Some(w);
            }
        }
        None
    }

    pub(crate) fn channel_send(&mut self, chan: usize, v: Value) {
        let mut waiters = std::mem::take(&mut self.channels[chan].waiters);
        let woken = self.pop_valid_waiter(&mut waiters, |w| w == WaitCond::Channel(chan));
        self.channels[chan].waiters = waiters;
        match woken {
            Some(w) => {
                self.deliver_to(w, v);
                if let Some(proc) = self.procs.get_mut(w).and_then(|p| p.as_mut()) {
                    proc.state = ProcState::Ready;
                    proc.wait = WaitCond::None;
                }
                self.ready.push_back(w);
            }
            None => self.channels[chan].queue.push_back(v),
        }
    }

    /// Returns the received value, or None after parking the current
    /// process on the channel.
    pub(crate) fn channel_receive(&mut self, chan: usize) -> Option<Value> {
        if let Some(v) = self.channels[chan].queue.pop_front() {
            return Some(v);
        }
        let cur = self.cur;
        self.channels[chan].waiters.push_back(cur);
        self.switch = Some(Switch::Block(WaitCond::Channel(chan)));
        None
    }

    pub(crate) fn semaphore_signal(&mut self, sem: usize) {
        let mut waiters = std::mem::take(&mut self.semaphores[sem].waiters);
        let woken = self.pop_valid_waiter(&mut waiters, |w| w == WaitCond::Semaphore(sem));
        self.semaphores[sem].waiters = waiters;
        match woken {
            Some(w) => {
                if let Some(proc) = self.procs.get_mut(w).and_then(|p| p.as_mut()) {
                    proc.state = ProcState::Ready;
                    proc.wait = WaitCond::None;
                }
                self.ready.push_back(w);
            }
            None => self.semaphores[sem].count += 1,
        }
    }

    /// Returns true when the wait was satisfied immediately; false after
    /// parking.
    pub(crate) fn semaphore_wait(&mut self, sem: usize) -> bool {
        if self.semaphores[sem].count > 0 {
            self.semaphores[sem].count -= 1;
            return true;
        }
        let cur = self.cur;
        self.semaphores[sem].waiters.push_back(cur);
        self.switch = Some(Switch::Block(WaitCond::Semaphore(sem)));
        false
    }

    pub(crate) fn sleep_millis(&mut self, millis: i64) {
        let delay = Duration::from_millis(millis.max(0) as u64);
        self.switch = Some(Switch::Block(WaitCond::Sleep(Instant::now() + delay)));
    }

    // --- garbage collection ---------------------------------------------

    fn gc(&mut self) {
        let mut roots: Vec<Value> = Vec::with_capacity(256);
        let mut frames: Vec<FrameRef> = vec![self.top_frame.clone()];

        roots.extend(self.globals.values().copied());
        self.kernel.push_roots(&mut roots);
        if let Some(v) = self.cur_result {
            roots.push(v);
        }

        collect_exec_roots(
            &self.acts,
            &self.handlers,
            &self.active,
            &self.unwind,
            &mut roots,
            &mut frames,
        );
        for proc in self.procs.iter().flatten() {
            collect_exec_roots(
                &proc.acts,
                &proc.handlers,
                &proc.active,
                &proc.unwind,
                &mut roots,
                &mut frames,
            );
            if let Some(v) = proc.result {
                roots.push(v);
            }
            if let Some(p) = proc.proxy {
                roots.push(Value::Instance(p));
            }
        }
        for chan in &self.channels {
            roots.extend(chan.queue.iter().copied());
        }

        self.heap.collect(&roots, &frames);
    }
}

fn collect_exec_roots(
    acts: &[crate::activation::Activation],
    handlers: &[crate::activation::HandlerEntry],
    active: &[crate::activation::ActiveHandler],
    unwind: &Option<Unwind>,
    roots: &mut Vec<Value>,
    frames: &mut Vec<FrameRef>,
) {
    for act in acts {
        roots.push(act.receiver);
        roots.push(act.ret);
        roots.extend(act.vals.iter().copied());
        if let Some(e) = act.ensure {
            roots.push(e);
        }
        frames.push(act.frame.clone());
        for cont in &act.work {
            match cont {
                Cont::CascadeNext { recv, .. } => roots.push(*recv),
                Cont::While { cond, body, .. } => {
                    roots.push(*cond);
                    roots.push(*body);
                }
                Cont::ToDo { block, recv, .. } => {
                    roots.push(*block);
                    roots.push(*recv);
                }
                _ => {}
            }
        }
        if let Some(crate::activation::EnsureThen::Deliver(v)) = &act.ensure_then {
            roots.push(*v);
        }
    }
    for h in handlers {
        roots.push(h.class);
        roots.push(h.handler);
        roots.push(h.protected);
    }
    for ah in active {
        roots.push(ah.exc);
    }
    if let Some(uw) = unwind {
        match &uw.action {
            UnwindAction::Deliver(v)
            | UnwindAction::HomeReturn(v)
            | UnwindAction::Resignal(v) => roots.push(*v),
            _ => {}
        }
    }
}

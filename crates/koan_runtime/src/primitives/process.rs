//! Process, Processor, Semaphore and Channel primitives. Process values
//! are proxy instances whose native handle is the pid; channels and
//! semaphores hold an index into the runtime's tables the same way.

use crate::core::{Managed, Value};
use crate::error::{ErrKind, RtError};
use crate::object::{new_instance, PrimResult};
use crate::process::Switch;
use crate::runtime::Runtime;

use super::{native, native_class_side};

fn native_handle(rt: &Runtime, recv: Value, what: &str) -> Result<u64, RtError> {
    if let Value::Instance(id) = recv {
        if let Managed::Instance(inst) = rt.heap.get(id) {
            if let Some(h) = inst.native {
                return Ok(h);
            }
        }
    }
    Err(RtError::new(ErrKind::Type, format!("not a {}", what)))
}

// --- Processor (the Scheduler singleton) -------------------------------

fn prim_fork(rt: &mut Runtime, _recv: Value, args: &[Value]) -> PrimResult {
    match rt.fork_block(args[0]) {
        Ok(v) => PrimResult::Value(v),
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_yield(rt: &mut Runtime, _recv: Value, _args: &[Value]) -> PrimResult {
    rt.switch = Some(Switch::Yield);
    PrimResult::Value(Value::Nil)
}

fn prim_sleep(rt: &mut Runtime, _recv: Value, args: &[Value]) -> PrimResult {
    let Value::Int(ms) = args[0] else {
        return PrimResult::Err(RtError::new(
            ErrKind::Type,
            "sleep: expects milliseconds as an integer",
        ));
    };
    rt.sleep_millis(ms);
    PrimResult::Value(Value::Nil)
}

fn prim_active_process(rt: &mut Runtime, _recv: Value, _args: &[Value]) -> PrimResult {
    let cur = rt.cur;
    let existing = rt.procs[cur].as_ref().and_then(|p| p.proxy);
    let proxy = match existing {
        Some(p) => p,
        None => {
            let p = new_instance(&mut rt.heap, rt.kernel.process);
            if let Managed::Instance(inst) = rt.heap.get_mut(p) {
                inst.native = Some(cur as u64);
            }
            if let Some(proc) = rt.procs[cur].as_mut() {
                proc.proxy = Some(p);
            }
            p
        }
    };
    PrimResult::Value(Value::Instance(proxy))
}

// --- Process proxies ----------------------------------------------------

fn prim_pid(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match rt.proxy_pid(recv) {
        Ok(pid) => PrimResult::Value(Value::Int(pid as i64)),
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_name(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match rt.proxy_pid(recv) {
        Ok(pid) => {
            let name = rt.procs[pid]
                .as_ref()
                .map(|p| p.name.clone())
                .unwrap_or_default();
            PrimResult::Value(rt.make_str(name))
        }
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_name_put(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let pid = match rt.proxy_pid(recv) {
        Ok(pid) => pid,
        Err(e) => return PrimResult::Err(e),
    };
    let Value::Str(sid) = args[0] else {
        return PrimResult::Err(RtError::new(ErrKind::Type, "name: expects a string"));
    };
    let name = rt.heap.str_value(sid).to_string();
    if let Some(proc) = rt.procs[pid].as_mut() {
        proc.name = name;
    }
    PrimResult::Value(recv)
}

fn prim_state(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match rt.proxy_pid(recv) {
        Ok(pid) => {
            let label = rt.state_of(pid).label();
            let sym = rt.syms.intern(label);
            PrimResult::Value(Value::Sym(sym))
        }
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_priority(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match rt.proxy_pid(recv) {
        Ok(pid) => {
            let p = rt.procs[pid].as_ref().map(|p| p.priority).unwrap_or(0);
            PrimResult::Value(Value::Int(p))
        }
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_priority_put(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    let pid = match rt.proxy_pid(recv) {
        Ok(pid) => pid,
        Err(e) => return PrimResult::Err(e),
    };
    let Value::Int(p) = args[0] else {
        return PrimResult::Err(RtError::new(ErrKind::Type, "priority: expects an integer"));
    };
    if let Some(proc) = rt.procs[pid].as_mut() {
        proc.priority = p;
    }
    PrimResult::Value(recv)
}

fn prim_suspend(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match rt.proxy_pid(recv).and_then(|pid| rt.suspend_process(pid)) {
        Ok(()) => PrimResult::Value(recv),
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_resume(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match rt.proxy_pid(recv).and_then(|pid| rt.resume_process(pid)) {
        Ok(()) => PrimResult::Value(recv),
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_terminate(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match rt.proxy_pid(recv).and_then(|pid| rt.terminate_process(pid)) {
        Ok(()) => PrimResult::Value(recv),
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_join(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    let pid = match rt.proxy_pid(recv) {
        Ok(pid) => pid,
        Err(e) => return PrimResult::Err(e),
    };
    match rt.join_process(pid) {
        Ok(Some(v)) => PrimResult::Value(v),
        Ok(None) => PrimResult::Done,
        Err(e) => PrimResult::Err(e),
    }
}

// --- Semaphore ----------------------------------------------------------

fn prim_sem_new(rt: &mut Runtime, _recv: Value, _args: &[Value]) -> PrimResult {
    let idx = rt.new_semaphore();
    let inst = new_instance(&mut rt.heap, rt.kernel.semaphore);
    if let Managed::Instance(i) = rt.heap.get_mut(inst) {
        i.native = Some(idx as u64);
    }
    PrimResult::Value(Value::Instance(inst))
}

fn prim_sem_signal(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match native_handle(rt, recv, "semaphore") {
        Ok(idx) => {
            rt.semaphore_signal(idx as usize);
            PrimResult::Value(recv)
        }
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_sem_wait(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match native_handle(rt, recv, "semaphore") {
        Ok(idx) => {
            // the wait's value is nil either way; when parked, the value
            // is already in place for the wake-up
            rt.semaphore_wait(idx as usize);
            PrimResult::Value(Value::Nil)
        }
        Err(e) => PrimResult::Err(e),
    }
}

// --- Channel ------------------------------------------------------------

fn prim_chan_new(rt: &mut Runtime, _recv: Value, _args: &[Value]) -> PrimResult {
    let idx = rt.new_channel();
    let inst = new_instance(&mut rt.heap, rt.kernel.channel);
    if let Managed::Instance(i) = rt.heap.get_mut(inst) {
        i.native = Some(idx as u64);
    }
    PrimResult::Value(Value::Instance(inst))
}

fn prim_chan_send(rt: &mut Runtime, recv: Value, args: &[Value]) -> PrimResult {
    match native_handle(rt, recv, "channel") {
        Ok(idx) => {
            rt.channel_send(idx as usize, args[0]);
            PrimResult::Value(recv)
        }
        Err(e) => PrimResult::Err(e),
    }
}

fn prim_chan_receive(rt: &mut Runtime, recv: Value, _args: &[Value]) -> PrimResult {
    match native_handle(rt, recv, "channel") {
        Ok(idx) => match rt.channel_receive(idx as usize) {
            Some(v) => PrimResult::Value(v),
            None => PrimResult::Done,
        },
        Err(e) => PrimResult::Err(e),
    }
}

pub(crate) fn install(rt: &mut Runtime) {
    let scheduler = rt.kernel.scheduler;
    native(rt, scheduler, "fork:", 1, prim_fork);
    native(rt, scheduler, "yield", 0, prim_yield);
    native(rt, scheduler, "sleep:", 1, prim_sleep);
    native(rt, scheduler, "activeProcess", 0, prim_active_process);

    let process = rt.kernel.process;
    native(rt, process, "pid", 0, prim_pid);
    native(rt, process, "name", 0, prim_name);
    native(rt, process, "name:", 1, prim_name_put);
    native(rt, process, "state", 0, prim_state);
    native(rt, process, "priority", 0, prim_priority);
    native(rt, process, "priority:", 1, prim_priority_put);
    native(rt, process, "suspend", 0, prim_suspend);
    native(rt, process, "resume", 0, prim_resume);
    native(rt, process, "terminate", 0, prim_terminate);
    native(rt, process, "join", 0, prim_join);

    let semaphore = rt.kernel.semaphore;
    native_class_side(rt, semaphore, "new", 0, prim_sem_new);
    native(rt, semaphore, "signal", 0, prim_sem_signal);
    native(rt, semaphore, "wait", 0, prim_sem_wait);

    let channel = rt.kernel.channel;
    native_class_side(rt, channel, "new", 0, prim_chan_new);
    native(rt, channel, "send:", 1, prim_chan_send);
    native(rt, channel, "receive", 0, prim_chan_receive);
}

//! Scheduler and process lifecycle.

mod common;

use common::{eval, eval_err, eval_output, eval_text};
use koan_runtime::core::Value;

#[test]
fn fork_runs_and_join_returns_result() {
    let src = "\
p := Processor fork: [ 6 * 7 ]
p join";
    assert_eq!(eval(src), Value::Int(42));
}

#[test]
fn forked_processes_share_globals() {
    let src = "\
Shared := 0
p := Processor fork: [ Shared := Shared + 5 ]
p join
Shared";
    assert_eq!(eval(src), Value::Int(5));
}

#[test]
fn forked_processes_share_captured_locals() {
    let src = "\
count := 0
p := Processor fork: [ count := count + 1 ]
p join
count";
    assert_eq!(eval(src), Value::Int(1));
}

#[test]
fn yield_rotates_the_ready_queue() {
    let src = "\
log := Array new
a := Processor fork: [ log add: 1. Processor yield. log add: 3 ]
b := Processor fork: [ log add: 2. Processor yield. log add: 4 ]
a join. b join.
(log collect: [:e | e asString]) join: \"\"";
    assert_eq!(eval_text(src), "1234");
}

#[test]
fn process_introspection() {
    let src = "\
p := Processor fork: [ nil ]
p pid";
    match eval(src) {
        Value::Int(n) => assert!(n > 0),
        other => panic!("expected pid, got {:?}", other),
    }

    let src = "\
p := Processor fork: [ nil ]
p join
p state";
    let mut rt = common::rt();
    let v = rt.eval_source("<test>", src).expect("eval");
    assert_eq!(rt.display(v), "#terminated");
}

#[test]
fn active_process_answers_a_proxy() {
    let src = "Processor activeProcess state";
    let mut rt = common::rt();
    let v = rt.eval_source("<test>", src).expect("eval");
    // the main process is Running while it asks
    assert_eq!(rt.display(v), "#running");
}

#[test]
fn suspend_and_resume() {
    let src = "\
flag := 0
p := Processor fork: [ flag := 1 ]
p suspend
Processor yield
before := flag
p resume
p join
before + flag";
    // suspended process must not run until resumed
    assert_eq!(eval(src), Value::Int(1));
}

#[test]
fn terminate_runs_ensure_blocks() {
    let src = "\
log := Array new
started := Semaphore new
p := Processor fork: [ [ log add: 1. started signal. Processor sleep: 60000. log add: 9 ] ensure: [ log add: 2 ] ]
started wait
p terminate
p join
(log collect: [:e | e asString]) join: \"\"";
    assert_eq!(eval_text(src), "12");
}

#[test]
fn terminating_a_terminated_process_is_an_error() {
    let src = "\
p := Processor fork: [ nil ]
p join
p terminate";
    let err = eval_err(src);
    assert!(err.contains("ProcessError"), "got: {}", err);
}

#[test]
fn semaphore_orders_producer_and_consumer() {
    let src = "\
sem := Semaphore new
log := Array new
Processor fork: [ sem wait. log add: 2 ]
Processor yield
log add: 1
sem signal
Processor yield
(log collect: [:e | e asString]) join: \"\"";
    assert_eq!(eval_text(src), "12");
}

#[test]
fn channel_passes_values_between_processes() {
    let src = "\
ch := Channel new
Processor fork: [ ch send: 41 ]
(ch receive) + 1";
    assert_eq!(eval(src), Value::Int(42));
}

#[test]
fn channel_buffers_when_nobody_waits() {
    let src = "\
ch := Channel new
ch send: 1
ch send: 2
(ch receive) + (ch receive)";
    assert_eq!(eval(src), Value::Int(3));
}

#[test]
fn sleep_wakes_up_again() {
    let src = "\
Processor sleep: 5
7";
    assert_eq!(eval(src), Value::Int(7));
}

#[test]
fn forked_output_arrives_before_join_returns() {
    let src = "\
p := Processor fork: [ \"b\" print ]
\"a\" print
p join
\"c\" print";
    let (_, out) = eval_output(src);
    assert_eq!(out.len(), 3);
    assert!(out.contains('a') && out.contains('b'), "got: {}", out);
    assert!(out.ends_with('c'), "got: {}", out);
}

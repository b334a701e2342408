//! Exception engine: handler search, resume/return/retry/pass, ensure,
//! and process termination on unhandled signals.

mod common;

use common::{eval, eval_err, eval_text};
use koan_runtime::core::Value;

#[test]
fn handler_value_is_on_do_value() {
    let src = "[ 10 / 0 ] on: DivisionByZero do: [:ex | 5 ]";
    assert_eq!(eval(src), Value::Int(5));
}

#[test]
fn no_signal_returns_block_value() {
    let src = "[ 1 + 2 ] on: Error do: [:ex | 99 ]";
    assert_eq!(eval(src), Value::Int(3));
}

#[test]
fn handler_matches_ancestor_class() {
    // DivisionByZero derives from Error derives from Exception
    let src = "[ 10 / 0 ] on: Exception do: [:ex | 7 ]";
    assert_eq!(eval(src), Value::Int(7));
}

#[test]
fn handler_does_not_match_unrelated_class() {
    let src = "[ #(1) at: 5 ] on: DivisionByZero do: [:ex | 0 ]";
    let err = eval_err(src);
    assert!(err.contains("SubscriptOutOfBounds"), "got: {}", err);
}

#[test]
fn explicit_return_value() {
    let src = "[ 10 / 0 ] on: DivisionByZero do: [:ex | ex return: 42 ]";
    assert_eq!(eval(src), Value::Int(42));
}

#[test]
fn resume_continues_after_the_signal_point() {
    let src = "[ (10 / 0) + 1 ] on: DivisionByZero do: [:ex | ex resume: 99 ]";
    assert_eq!(eval(src), Value::Int(100));
}

#[test]
fn handler_runs_exactly_once() {
    let src = "\
hits := 0
[ 10 / 0 ] on: DivisionByZero do: [:ex | hits := hits + 1. ex resume: 0 ]
hits";
    assert_eq!(eval(src), Value::Int(1));
}

#[test]
fn pass_reaches_the_outer_handler() {
    let src = "\
inner := [ [ 10 / 0 ] on: DivisionByZero do: [:ex | ex pass ] ]
inner on: Error do: [:ex | 77 ]";
    assert_eq!(eval(src), Value::Int(77));
}

#[test]
fn retry_reevaluates_the_protected_block() {
    let src = "\
attempts := 0
body := [ attempts := attempts + 1. (attempts < 3) ifTrue: [ Error signal: \"again\" ]. attempts ]
body on: Error do: [:ex | ex retry ]";
    assert_eq!(eval(src), Value::Int(3));
}

#[test]
fn signal_with_message_text() {
    let src = "[ Error signal: \"boom\" ] on: Error do: [:ex | ex messageText ]";
    assert_eq!(eval_text(src), "boom");
}

#[test]
fn user_exception_classes_participate() {
    let src = "\
Timeout := Error derive
[ Timeout signal: \"late\" ] on: Timeout do: [:ex | ex messageText ]";
    assert_eq!(eval_text(src), "late");
}

#[test]
fn ensure_runs_on_normal_completion() {
    let src = "\
log := Array new
[ log add: 1 ] ensure: [ log add: 2 ]
log size";
    assert_eq!(eval(src), Value::Int(2));
}

#[test]
fn ensure_runs_while_unwinding() {
    let src = "\
log := Array new
body := [ [ log add: 1. Error signal: \"x\". log add: 99 ] ensure: [ log add: 2 ] ]
body on: Error do: [:ex | nil ]
(log collect: [:e | e asString]) join: \",\"";
    assert_eq!(eval_text(src), "1,2");
}

#[test]
fn ensure_order_is_lifo() {
    let src = "\
out := \"\"
body := [ [ [ Error signal: \"x\" ] ensure: [ out := out , \"inner\" ] ] ensure: [ out := out , \" outer\" ] ]
body on: Error do: [:ex | nil ]
out";
    assert_eq!(eval_text(src), "inner outer");
}

#[test]
fn unhandled_error_reports_kind_and_stack() {
    let src = "\
Broken := Object derive
Broken>>blow [ ^ 1 / 0 ]
(Broken new) blow";
    let err = eval_err(src);
    assert!(err.contains("DivisionByZero"), "got: {}", err);
    assert!(err.contains("#blow"), "got: {}", err);
    assert!(err.contains("Broken"), "got: {}", err);
}

#[test]
fn unhandled_error_in_fork_does_not_kill_main() {
    let src = "\
done := Semaphore new
Processor fork: [ [ 1 / 0 ] ensure: [ done signal ] ]
done wait
123";
    assert_eq!(eval(src), Value::Int(123));
}

#[test]
fn block_context_expired() {
    let src = "\
Maker := Object derive
Maker>>escape [ ^ [ ^ 1 ] ]
b := (Maker new) escape
b value";
    let err = eval_err(src);
    assert!(err.contains("BlockContextExpired"), "got: {}", err);
}

#[test]
fn exception_description() {
    let src = "[ 10 / 0 ] on: DivisionByZero do: [:ex | ex description ]";
    let out = eval_text(src);
    assert!(out.contains("DivisionByZero"), "got: {}", out);
}

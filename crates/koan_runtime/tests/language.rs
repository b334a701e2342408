//! Core language semantics: literals, the naming rule, cascades,
//! collections, booleans, loops, numbers.

mod common;

use common::{eval, eval_err, eval_output, eval_text};
use koan_runtime::core::Value;
use koan_runtime::{RunConfig, Runtime};

#[test]
fn literals() {
    assert_eq!(eval("42"), Value::Int(42));
    assert_eq!(eval("-3"), Value::Int(-3));
    assert_eq!(eval("2.5"), Value::Float(2.5));
    assert_eq!(eval("true"), Value::Bool(true));
    assert_eq!(eval("nil"), Value::Nil);
    assert_eq!(eval_text("\"he said \"\"hi\"\"\""), "he said \"hi\"");
}

#[test]
fn uppercase_assignment_is_global_lowercase_is_local() {
    // the global is visible inside a method body, the local is not
    let src = "\
Limit := 10
check := 5
A := Object derive
A>>readGlobal [ ^ Limit ]
(A new) readGlobal";
    assert_eq!(eval(src), Value::Int(10));

    let src = "\
check := 5
A := Object derive
A>>readLocal [ ^ check ]
(A new) readLocal";
    let err = eval_err(src);
    assert!(err.contains("NameError"), "got: {}", err);
}

#[test]
fn unbound_global_suggests_a_near_miss() {
    let err = eval_err("Arrey new");
    assert!(err.contains("NameError"), "got: {}", err);
    assert!(err.contains("Array"), "got: {}", err);
}

#[test]
fn assignment_is_an_expression() {
    assert_eq!(eval("a := b := 3\na + b"), Value::Int(6));
}

#[test]
fn cascade_returns_last_message_value() {
    let src = "\
Point := Object derive: #(x y)
Point>>sum [ ^ x + y ]
p := Point new
p at: #x put: 3; at: #y put: 4; sum";
    assert_eq!(eval(src), Value::Int(7));
}

#[test]
fn table_literal_and_access() {
    assert_eq!(eval("#[ \"a\" -> 1. \"b\" -> 2 ] at: \"b\""), Value::Int(2));
    assert_eq!(eval("#[] size"), Value::Int(0));
}

#[test]
fn table_protocol() {
    let src = "\
t := Table new
t at: \"k\" put: 5
(t includesKey: \"k\") & (t size = 1)";
    assert_eq!(eval(src), Value::Bool(true));
    assert_eq!(eval("#[ \"a\" -> 1 ] at: \"missing\" ifAbsent: [ 9 ]"), Value::Int(9));
    let err = eval_err("#[] at: \"missing\"");
    assert!(err.contains("SubscriptOutOfBounds"), "got: {}", err);
}

#[test]
fn array_protocol() {
    assert_eq!(eval("#(3 7 15) size"), Value::Int(3));
    assert_eq!(eval("#(3 7 15) at: 2"), Value::Int(7));
    assert_eq!(eval("(#(1 2 3) collect: [:e | e * 2]) at: 3"), Value::Int(6));
    assert_eq!(eval("(#(1 2 3 4) select: [:e | e even]) size"), Value::Int(2));
    assert_eq!(eval("#(1 2 3) detect: [:e | e > 1]"), Value::Int(2));
    assert_eq!(eval("#(9 9) detect: [:e | e > 10]"), Value::Nil);
    assert_eq!(eval("#(1 2 3) inject: 0 into: [:a :b | a + b]"), Value::Int(6));
    assert_eq!(eval_text("#(1 2) join: \"-\""), "1-2");
    assert_eq!(eval("#(1 2 3) includes: 2"), Value::Bool(true));
}

#[test]
fn one_based_indexing_rejects_bounds() {
    for src in ["#(1 2) at: 0", "#(1 2) at: 3"] {
        let err = eval_err(src);
        assert!(err.contains("SubscriptOutOfBounds"), "got: {}", err);
    }
}

#[test]
fn empty_array_do_runs_zero_iterations() {
    let src = "\
hits := 0
#() do: [:e | hits := hits + 1]
hits";
    assert_eq!(eval(src), Value::Int(0));
}

#[test]
fn boolean_protocol_short_circuits() {
    let src = "\
hits := 0
false and: [ hits := hits + 1. true ]
true or: [ hits := hits + 1. true ]
hits";
    assert_eq!(eval(src), Value::Int(0));
    assert_eq!(eval("(3 > 2) and: [ 2 > 1 ]"), Value::Bool(true));
    assert_eq!(eval("false ifTrue: [1] ifFalse: [2]"), Value::Int(2));
}

#[test]
fn while_loop_accumulates() {
    let src = "\
i := 0
sum := 0
[ i < 5 ] whileTrue: [ i := i + 1. sum := sum + i ]
sum";
    assert_eq!(eval(src), Value::Int(15));
}

#[test]
fn to_do_counts_inclusively() {
    let src = "\
sum := 0
1 to: 4 do: [:i | sum := sum + i]
sum";
    assert_eq!(eval(src), Value::Int(10));
}

#[test]
fn times_repeat() {
    let src = "\
n := 0
3 timesRepeat: [ n := n + 1 ]
n";
    assert_eq!(eval(src), Value::Int(3));
}

#[test]
fn numeric_tower() {
    assert_eq!(eval("10 / 2"), Value::Int(5));
    assert_eq!(eval("10 / 4"), Value::Float(2.5));
    assert_eq!(eval("7 // 2"), Value::Int(3));
    assert_eq!(eval("-7 // 2"), Value::Int(-4));
    assert_eq!(eval("7 % 3"), Value::Int(1));
    assert_eq!(eval("-7 % 3"), Value::Int(2));
    assert_eq!(eval("2 + 3.5"), Value::Float(5.5));
    assert_eq!(eval("3 = 3.0"), Value::Bool(true));
    assert_eq!(eval("2 asFloat"), Value::Float(2.0));
    let err = eval_err("1 // 0");
    assert!(err.contains("DivisionByZero"), "got: {}", err);
}

#[test]
fn integer_overflow_wraps() {
    assert_eq!(
        eval("9223372036854775807 + 1"),
        Value::Int(i64::MIN)
    );
}

#[test]
fn string_protocol() {
    assert_eq!(eval("\"hello\" size"), Value::Int(5));
    assert_eq!(eval_text("\"hello\" at: 1"), "h");
    assert_eq!(eval_text("\"ab\" , \"cd\""), "abcd");
    assert_eq!(eval("\"ab\" = \"ab\""), Value::Bool(true));
    assert_eq!(eval("\"12\" asInteger"), Value::Int(12));
    assert_eq!(eval("(\"x\" asSymbol) == #x"), Value::Bool(true));
    assert_eq!(eval_text("\"ab\" repeat: 3"), "ababab");
    assert_eq!(eval_text("(\"a-b-c\" split: \"-\") at: 2"), "b");
    assert_eq!(eval_text("\"hello\" substringFrom: 2 to: 4"), "ell");
    assert_eq!(eval("\"hello\" endsWith: \"llo\""), Value::Bool(true));
}

#[test]
fn println_writes_to_output() {
    let (_, out) = eval_output("\"hi\" println\n5 println");
    assert_eq!(out, "hi\n5\n");
}

#[test]
fn stdout_stream() {
    let (_, out) = eval_output("Stdout print: \"a\"; print: \"b\"; nl");
    assert_eq!(out, "ab\n");
}

#[test]
fn print_string_forms() {
    assert_eq!(eval_text("7 printString"), "7");
    assert_eq!(eval_text("2.5 printString"), "2.5");
    assert_eq!(eval_text("#(1 2) printString"), "#(1 2)");
    assert_eq!(eval_text("nil printString"), "nil");
    assert_eq!(eval_text("#x printString"), "#x");
    let src = "\
Point := Object derive: #(x y)
Point new printString";
    assert_eq!(eval_text(src), "a Point");
}

#[test]
fn identity_versus_equality() {
    assert_eq!(eval("\"ab\" == \"ab\""), Value::Bool(false));
    assert_eq!(eval("\"ab\" = \"ab\""), Value::Bool(true));
    assert_eq!(eval("a := #(1)\na == a"), Value::Bool(true));
    assert_eq!(eval("3 ~= 4"), Value::Bool(true));
}

#[test]
fn stack_overflow_is_reported() {
    let mut config = RunConfig::default();
    config.max_stack = 64;
    let mut rt = Runtime::with_config(config).expect("bootstrap");
    let err = rt
        .eval_source("<test>", "Loop := Object derive\nLoop>>go [ ^ self go ]\n(Loop new) go")
        .expect_err("must overflow");
    assert!(err.to_string().contains("StackOverflow"), "got: {}", err);
}

#[test]
fn keyword_chain_spans_lines() {
    let src = "t := Table new\nt at: \"k\"\nput: 3\nt at: \"k\"";
    assert_eq!(eval(src), Value::Int(3));
}

#[test]
fn blocks_are_first_class() {
    let src = "\
adder := [:a :b | a + b]
adder value: 2 value: 3";
    assert_eq!(eval(src), Value::Int(5));
    assert_eq!(eval("[] value"), Value::Nil);
    assert_eq!(eval("[:x | x] numArgs"), Value::Int(1));
}

#[test]
fn closures_capture_their_environment() {
    let src = "\
Maker := Object derive
Maker>>counter [ | n | n := 0. ^ [ n := n + 1. n ] ]
c := (Maker new) counter
c value. c value. c value";
    assert_eq!(eval(src), Value::Int(3));
}

//! Class model: derivation, merged method tables, multiple inheritance,
//! slots, reflection.

mod common;

use common::{eval, eval_err, eval_text};
use koan_runtime::core::Value;

#[test]
fn derive_and_slots() {
    assert_eq!(
        eval("Point := Object derive: #(x y)\nPoint slots size"),
        Value::Int(2)
    );
}

#[test]
fn slots_are_nil_initialised() {
    let src = "\
Point := Object derive: #(x y)
p := Point new
(p at: #x) isNil";
    assert_eq!(eval(src), Value::Bool(true));
}

#[test]
fn method_installed_on_parent_reaches_existing_subclass() {
    // merged tables recompute through subclass backlinks, so a selector
    // defined after derivation is still inherited
    let src = "\
A := Object derive
B := A derive
A>>greet [ ^ 42 ]
(B new) greet";
    assert_eq!(eval(src), Value::Int(42));
}

#[test]
fn own_method_wins_over_inherited() {
    let src = "\
A := Object derive. A>>x [^1]
B := A derive. B>>x [^2]
(B new) x";
    assert_eq!(eval(src), Value::Int(2));
}

#[test]
fn super_restarts_at_first_parent() {
    let src = "\
A := Object derive
A>>name [ ^ \"a\" ]
B := A derive
B>>name [ ^ super name , \"b\" ]
(B new) name";
    assert_eq!(eval_text(src), "ab");
}

#[test]
fn scoped_super_resolves_a_conflict() {
    let src = "\
A := Object derive. A>>x [^1]
B := Object derive. B>>x [^2]
C := A derive. C addParent: B.
C>>viaB [ ^ super<B> x ]
(C new) viaB";
    assert_eq!(eval(src), Value::Int(2));
}

#[test]
fn own_override_resolves_a_conflict() {
    let src = "\
A := Object derive. A>>x [^1]
B := Object derive. B>>x [^2]
C := A derive. C addParent: B.
C>>x [^3]
(C new) x";
    assert_eq!(eval(src), Value::Int(3));
}

#[test]
fn add_parent_merges_later_selectors() {
    // a selector introduced by a parent added after derivation becomes
    // visible immediately
    let src = "\
A := Object derive
Extra := Object derive
Extra>>bonus [ ^ 9 ]
C := A derive
C addParent: Extra
(C new) bonus";
    assert_eq!(eval(src), Value::Int(9));
}

#[test]
fn slot_conflict_across_parents() {
    let src = "\
A := Object derive: #(v)
B := Object derive: #(v)
C := A derive. C addParent: B.
C new";
    let err = eval_err(src);
    assert!(err.contains("SlotConflict"), "got: {}", err);
}

#[test]
fn does_not_understand_hook() {
    let src = "\
Ghost := Object derive
Ghost>>doesNotUnderstand: selector [ ^ selector asString ]
(Ghost new) frobnicate";
    assert_eq!(eval_text(src), "frobnicate");
}

#[test]
fn message_not_understood_without_hook() {
    let err = eval_err("3 frobnicate");
    assert!(err.contains("MessageNotUnderstood"), "got: {}", err);
    assert!(err.contains("frobnicate"), "got: {}", err);
}

#[test]
fn responds_to_probes_the_merged_table() {
    let src = "\
A := Object derive. A>>x [^1]
B := A derive
(B new) respondsTo: #x";
    assert_eq!(eval(src), Value::Bool(true));
    assert_eq!(eval("3 respondsTo: #frobnicate"), Value::Bool(false));
}

#[test]
fn perform_dispatches_dynamically() {
    assert_eq!(eval("3 perform: #+ with: 4"), Value::Int(7));
    assert_eq!(eval("#(1 2 3) perform: #size"), Value::Int(3));
}

#[test]
fn class_side_methods() {
    let src = "\
Point := Object derive: #(x y)
Point class >> origin [ | p | p := Point new. p at: #x put: 0. p at: #y put: 0. ^ p ]
(Point origin at: #x)";
    assert_eq!(eval(src), Value::Int(0));
}

#[test]
fn class_side_methods_inherit() {
    let src = "\
Shape := Object derive
Shape class >> kind [ ^ \"shape\" ]
Circle := Shape derive
Circle kind";
    assert_eq!(eval_text(src), "shape");
}

#[test]
fn is_kind_of_walks_parents() {
    let src = "\
A := Object derive
B := A derive
(B new) isKindOf: A";
    assert_eq!(eval(src), Value::Bool(true));
}

#[test]
fn anonymous_class_takes_its_global_name() {
    assert_eq!(eval_text("Point := Object derive\nPoint name"), "Point");
}

#[test]
fn arity_mismatch_is_an_error() {
    let src = "\
A := Object derive
A>>pair: a with: b [ ^ a + b ]
(A new) perform: #pair:with: with: 1";
    let err = eval_err(src);
    assert!(err.contains("ArityError"), "got: {}", err);
}

#[test]
fn assignment_in_method_targets_slot() {
    let src = "\
Counter := Object derive: #(count)
Counter>>bump [ count := (count isNil ifTrue: [0] ifFalse: [count]) + 1. ^ count ]
c := Counter new
c bump. c bump. c bump";
    assert_eq!(eval(src), Value::Int(3));
}

use koan_ir::{Expr, SuperMode};
use koan_parser::parse_source;

fn parse_clean(src: &str) -> koan_ir::Program {
    let result = parse_source(src);
    assert!(
        result.diagnostics.is_empty(),
        "unexpected diagnostics for {:?}: {:?}",
        src,
        result.diagnostics
    );
    result.program
}

#[test]
fn parse_binary_send() {
    let program = parse_clean("3 + 4");
    assert_eq!(program.stmts.len(), 1);
    match &program.stmts[0].expr {
        Expr::Send(send) => {
            assert_eq!(&*send.selector.text, "+");
            assert_eq!(send.args.len(), 1);
        }
        other => panic!("expected send, got {:?}", other),
    }
}

#[test]
fn parse_precedence_unary_binary_keyword() {
    // `a foo + 2 bar: 3 baz: x qux` groups as `((a foo) + (2)) bar: 3 baz: (x qux)`
    let program = parse_clean("a foo + 2 bar: 3 baz: x qux");
    match &program.stmts[0].expr {
        Expr::Send(send) => {
            assert_eq!(&*send.selector.text, "bar:baz:");
            assert_eq!(send.args.len(), 2);
            match &send.recv {
                Expr::Send(plus) => assert_eq!(&*plus.selector.text, "+"),
                other => panic!("expected + send, got {:?}", other),
            }
            match &send.args[1] {
                Expr::Send(unary) => assert_eq!(&*unary.selector.text, "qux"),
                other => panic!("expected unary send, got {:?}", other),
            }
        }
        other => panic!("expected keyword send, got {:?}", other),
    }
}

#[test]
fn parse_class_definition_scenario() {
    let src = "Point := Object derive: #(x y)\nPoint>>sum [ ^ x + y ]\np := Point new\np at: #x put: 3\np sum";
    let program = parse_clean(src);
    assert_eq!(program.stmts.len(), 5);
    match &program.stmts[0].expr {
        Expr::Assign(assign) => {
            assert!(assign.target.global);
            assert_eq!(&*assign.target.text, "Point");
        }
        other => panic!("expected assignment, got {:?}", other),
    }
    match &program.stmts[1].expr {
        Expr::MethodDef(def) => {
            assert!(!def.class_side);
            assert_eq!(&*def.method.selector.text, "sum");
            assert_eq!(def.method.params.len(), 0);
        }
        other => panic!("expected method definition, got {:?}", other),
    }
    match &program.stmts[2].expr {
        Expr::Assign(assign) => assert!(!assign.target.global),
        other => panic!("expected assignment, got {:?}", other),
    }
}

#[test]
fn parse_method_with_keyword_selector() {
    let program = parse_clean("Finder>>findIn: arr [ arr do: [:e | (e > 10) ifTrue: [^ e]]. ^ nil ]");
    match &program.stmts[0].expr {
        Expr::MethodDef(def) => {
            assert_eq!(&*def.method.selector.text, "findIn:");
            assert_eq!(def.method.params.len(), 1);
            assert_eq!(&*def.method.params[0], "arr");
            assert_eq!(def.method.body.len(), 2);
        }
        other => panic!("expected method definition, got {:?}", other),
    }
}

#[test]
fn parse_class_side_method() {
    let program = parse_clean("Point class >> origin [ ^ Point new ]");
    match &program.stmts[0].expr {
        Expr::MethodDef(def) => {
            assert!(def.class_side);
            match &def.target {
                Expr::Ident(name) => assert_eq!(&*name.text, "Point"),
                other => panic!("expected plain class target, got {:?}", other),
            }
        }
        other => panic!("expected method definition, got {:?}", other),
    }
}

#[test]
fn parse_keyword_chain_absorbs_newline() {
    let program = parse_clean("d at: 1\nput: 2");
    assert_eq!(program.stmts.len(), 1);
    match &program.stmts[0].expr {
        Expr::Send(send) => assert_eq!(&*send.selector.text, "at:put:"),
        other => panic!("expected keyword send, got {:?}", other),
    }
}

#[test]
fn parse_newline_does_not_continue_binary() {
    // `1` is a complete statement; the dangling `+ 2` is an error
    let result = parse_source("1\n+ 2");
    assert!(!result.diagnostics.is_empty());
}

#[test]
fn parse_cascade() {
    let program = parse_clean("p at: #x put: 3; at: #y put: 4; sum");
    match &program.stmts[0].expr {
        Expr::Cascade(cascade) => {
            assert_eq!(cascade.messages.len(), 3);
            assert_eq!(&*cascade.messages[0].selector.text, "at:put:");
            assert_eq!(&*cascade.messages[2].selector.text, "sum");
            match &cascade.recv {
                Expr::Ident(name) => assert_eq!(&*name.text, "p"),
                other => panic!("expected ident receiver, got {:?}", other),
            }
        }
        other => panic!("expected cascade, got {:?}", other),
    }
}

#[test]
fn parse_block_with_temps() {
    let program = parse_clean("[:a :b | | t | t := a + b. t]");
    match &program.stmts[0].expr {
        Expr::Block(block) => {
            assert_eq!(block.params.len(), 2);
            assert_eq!(block.temps.len(), 1);
            assert_eq!(block.body.len(), 2);
        }
        other => panic!("expected block, got {:?}", other),
    }
}

#[test]
fn parse_super_modes() {
    let program = parse_clean("C>>x [ ^ super x ]");
    match &program.stmts[0].expr {
        Expr::MethodDef(def) => match &def.method.body[0].expr {
            Expr::Return(ret) => match ret.value.as_ref().unwrap() {
                Expr::Send(send) => assert_eq!(send.super_mode, SuperMode::Super),
                other => panic!("expected send, got {:?}", other),
            },
            other => panic!("expected return, got {:?}", other),
        },
        other => panic!("expected method definition, got {:?}", other),
    }

    let program = parse_clean("C>>x [ ^ super<A> x ]");
    match &program.stmts[0].expr {
        Expr::MethodDef(def) => match &def.method.body[0].expr {
            Expr::Return(ret) => match ret.value.as_ref().unwrap() {
                Expr::Send(send) => {
                    assert_eq!(send.super_mode, SuperMode::Scoped("A".into()));
                }
                other => panic!("expected send, got {:?}", other),
            },
            other => panic!("expected return, got {:?}", other),
        },
        other => panic!("expected method definition, got {:?}", other),
    }
}

#[test]
fn parse_super_outside_method_is_error() {
    let result = parse_source("super foo");
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.message.contains("super")));
}

#[test]
fn parse_array_literal() {
    let program = parse_clean("#(3 7 -1 #x y \"s\" #(1 2))");
    match &program.stmts[0].expr {
        Expr::ArrayLit(node) => {
            assert_eq!(node.items.len(), 7);
            assert_eq!(node.items[0], Expr::Int(3));
            assert_eq!(node.items[2], Expr::Int(-1));
            assert_eq!(node.items[3], Expr::Symbol("x".into()));
            assert_eq!(node.items[4], Expr::Symbol("y".into()));
            assert!(matches!(node.items[6], Expr::ArrayLit(_)));
        }
        other => panic!("expected array literal, got {:?}", other),
    }
}

#[test]
fn parse_table_literal() {
    let program = parse_clean("#[ \"a\" -> 1. \"b\" -> 2 ]");
    match &program.stmts[0].expr {
        Expr::TableLit(node) => {
            assert_eq!(node.items.len(), 2);
            match &node.items[0] {
                Expr::Send(send) => assert_eq!(&*send.selector.text, "->"),
                other => panic!("expected pair send, got {:?}", other),
            }
        }
        other => panic!("expected table literal, got {:?}", other),
    }
}

#[test]
fn parse_statement_per_line() {
    let program = parse_clean("a\nb\nc");
    assert_eq!(program.stmts.len(), 3);
}

#[test]
fn parse_error_reports_position() {
    let result = parse_source("x := )");
    assert!(!result.diagnostics.is_empty());
    assert!(result.diagnostics.iter().any(|d| d.span.is_some()));
}

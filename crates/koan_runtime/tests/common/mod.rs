use koan_runtime::core::Value;
use koan_runtime::Runtime;

pub fn rt() -> Runtime {
    Runtime::new().expect("bootstrap")
}

pub fn eval(src: &str) -> Value {
    rt().eval_source("<test>", src).expect("eval")
}

#[allow(dead_code)]
pub fn eval_in(rt: &mut Runtime, src: &str) -> Value {
    rt.eval_source("<test>", src).expect("eval")
}

#[allow(dead_code)]
pub fn eval_err(src: &str) -> String {
    match rt().eval_source("<test>", src) {
        Err(e) => e.to_string(),
        Ok(v) => panic!("expected an error, got {:?}", v),
    }
}

#[allow(dead_code)]
pub fn eval_output(src: &str) -> (Value, String) {
    let mut rt = rt();
    let v = rt.eval_source("<test>", src).expect("eval");
    let out = rt.take_output();
    (v, out)
}

/// Unwrap a string result.
#[allow(dead_code)]
pub fn text(rt: &Runtime, v: Value) -> String {
    match v {
        Value::Str(id) => rt.heap.str_value(id).to_string(),
        other => panic!("expected a string value, got {:?}", other),
    }
}

#[allow(dead_code)]
pub fn eval_text(src: &str) -> String {
    let mut rt = rt();
    let v = rt.eval_source("<test>", src).expect("eval");
    text(&rt, v)
}

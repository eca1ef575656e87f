#![no_main]

use libfuzzer_sys::fuzz_target;
use vireo_core::{ObservableObject, Value};
use vireo_expr::{
    EvalContext, cache_len, clear_cache, compile_setter, compile_statement, try_compile,
    try_compile_interpolation,
};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if cache_len() > 4096 {
        clear_cache();
    }
    let scope = Value::Object(ObservableObject::from_entries([
        ("a", Value::from(1)),
        ("s", Value::from("x")),
    ]));
    let ctx = EvalContext::new(scope);
    if let Ok(expr) = try_compile(text) {
        let _ = expr.evaluate(&ctx);
    }
    if let Ok(expr) = try_compile_interpolation(text) {
        let _ = expr.call(&ctx);
    }
    let _ = compile_statement(text).call(&ctx);
    if let Some(setter) = compile_setter(text) {
        let _ = setter.assign(&ctx, Value::Null);
    }
});

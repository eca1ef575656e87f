//! Property tests: the compiler never panics and arithmetic matches f64.

use proptest::prelude::*;
use vireo_core::{ObservableObject, Value};
use vireo_expr::{EvalContext, compile, compile_interpolation, try_compile};

fn scope(a: i32, b: i32) -> Value {
    Value::Object(ObservableObject::from_entries([
        ("a", Value::from(a)),
        ("b", Value::from(b)),
    ]))
}

proptest! {
    #[test]
    fn arbitrary_text_never_panics(text in ".{0,64}") {
        let ctx = EvalContext::new(scope(1, 2));
        let _ = compile(&text).call(&ctx);
        let _ = compile_interpolation(&text).call(&ctx);
    }

    #[test]
    fn expression_alphabet_never_panics(text in "[ab0-9+*/%!?:()\\[\\]{}.,;='\" -]{0,48}") {
        let ctx = EvalContext::new(scope(3, 4));
        let _ = compile(&text).call(&ctx);
    }

    #[test]
    fn arithmetic_matches_native(a in -1000i32..1000, b in 1i32..1000) {
        let ctx = EvalContext::new(scope(a, b));
        let expected = f64::from(a) * 2.0 - f64::from(b) / 4.0;
        let value = compile("a * 2 - b / 4").call(&ctx);
        prop_assert_eq!(value, Value::from(expected));
        prop_assert_eq!(
            compile("a < b ? a : b").call(&ctx),
            Value::from(a.min(b))
        );
    }

    #[test]
    fn interpolation_renders_each_fragment(a in any::<i16>(), b in any::<i16>()) {
        let ctx = EvalContext::new(scope(i32::from(a), i32::from(b)));
        let rendered = compile_interpolation("{{a}}/{{ b }}").call(&ctx);
        prop_assert_eq!(rendered, Value::from(format!("{a}/{b}")));
    }
}

#[test]
fn reserved_words_are_rejected() {
    for source in ["new X()", "function() {}", "var x = 1", "delete a.b", "a in b"] {
        assert!(try_compile(source).is_err(), "{source} should not compile");
    }
}

#![no_main]

use libfuzzer_sys::fuzz_target;
use vireo_view::parse_for_expression;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(parsed) = parse_for_expression(text) {
        assert!(!parsed.value.is_empty());
        assert!(!parsed.collection.is_empty());
    }
});

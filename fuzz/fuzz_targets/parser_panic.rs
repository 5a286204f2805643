#![no_main]
use ferromath_semantics::analyze;
use ferromath_syntax::{parse, tokenize};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Lossy conversion keeps inputs that are almost text.
    let s = String::from_utf8_lossy(data);
    let tokens = tokenize(&s);
    assert!(tokens.last().is_some_and(|t| t.is_eof()));
    if let Ok(parsed) = parse(&tokens) {
        let _ = analyze(&parsed);
    }
});

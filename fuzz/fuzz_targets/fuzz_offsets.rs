#![no_main]

use {
    hsmatch::{Database, Expression, Flag},
    libfuzzer_sys::fuzz_target,
};

// Every match of an extracting pattern must carry exactly the characters
// its offsets cover.
fuzz_target!(|haystack: &str| {
    let db = Database::compile_many(vec![
        Expression::with_flags(".", Flag::Utf8 | Flag::ExtractMatched),
        Expression::with_flags(
            "[^a-z]+",
            Flag::Utf8 | Flag::DotAll | Flag::ExtractMatched,
        ),
    ])
    .unwrap();
    let mut scanner = db.scanner().unwrap();
    let chars: Vec<char> = haystack.chars().collect();
    for m in scanner.scan(&db, haystack).unwrap() {
        let expected: String = chars[m.start()..m.end()].iter().collect();
        assert_eq!(Some(expected.as_str()), m.matched_text(), "{:?}", m);
    }
});

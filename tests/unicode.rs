// Copyright 2014 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use hsmatch::{Database, Expression, Flag};

scan!(cjk, [e!("测试", Utf8)], "这是一个测试", [(0, 4, 6)]);
scan!(
    cjk_after_ascii,
    [e!("测试", Utf8 | Caseless), e!("test", Caseless)],
    "a TEST 测试 string",
    [(1, 2, 6), (0, 7, 9)],
);
scan!(astral, [e!("b", Utf8)], "😀😀b", [(0, 2, 3)]);
scan!(astral_pattern, [e!("😀+", Utf8)], "a😀😀b", [(0, 1, 3)]);
scan!(
    caseless_folding,
    [e!("ÉCOLE", Utf8 | Caseless)],
    "une école",
    [(0, 4, 9)],
);
scan!(caseless_bytes_fold_ascii_only, [e!("É", Caseless)], "é", []);
scan!(caseless_bytes, [e!("É", Caseless)], "aÉ", [(0, 1, 2)]);
scan!(word_class_bytes, [e!(r"\w+")], "café", [(0, 0, 3)]);
scan!(word_class_ascii, [e!(r"\w+", Utf8)], "café", [(0, 0, 3)]);
scan!(word_class_ucp, [e!(r"\w+", Utf8 | Ucp)], "café", [(0, 0, 4)]);
scan!(
    word_class_ucp_in_brackets,
    [e!(r"[\w-]+", Utf8 | Ucp), e!(r"[\w-]+", Utf8)],
    "é-a",
    [(0, 0, 3), (1, 1, 3)],
);
scan!(
    not_word_is_one_character,
    [e!(r"\W", Utf8)],
    "é!",
    [(0, 0, 1), (0, 1, 2)],
);
scan!(word_boundary_ascii, [e!(r"\bx", Utf8)], "éx", [(0, 1, 2)]);
scan!(word_boundary_ucp, [e!(r"\bx", Utf8 | Ucp)], "éx", []);
scan!(dot_is_one_character, [e!(".", Utf8)], "é", [(0, 0, 1)]);
scan!(
    class_of_letters,
    [e!(r"\p{Greek}+", Utf8 | Ucp)],
    "abc αβγ def",
    [(0, 4, 7)],
);
scan!(zero_width_after_multibyte, [e!("$")], "éé", [(0, 2, 2)]);

#[test]
fn extracted_text_is_whole_characters() {
    let db = Database::compile(Expression::with_flags(
        "[^ ]+",
        Flag::Utf8 | Flag::SingleMatch | Flag::ExtractMatched,
    ))
    .unwrap();
    let mut scanner = db.scanner().unwrap();
    let matches = scanner.scan(&db, "日本語 text").unwrap();
    assert_eq!(1, matches.len());
    assert_eq!(0..3, matches[0].range());
    assert_eq!(Some("日本語"), matches[0].matched_text());
}

#[test]
fn offsets_stay_in_bounds() {
    let text = "ü😀 測";
    let chars = text.chars().count();
    let db = Database::compile_many(vec![
        Expression::new(""),
        Expression::new("."),
        Expression::new(r"\b"),
    ])
    .unwrap();
    let mut scanner = db.scanner().unwrap();
    for m in scanner.scan(&db, text).unwrap() {
        assert!(m.start() <= m.end(), "{:?}", m);
        assert!(m.end() <= chars, "{:?}", m);
    }
}

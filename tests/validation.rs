// Copyright 2014 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::sync::Arc;

use hsmatch::{engine::Portable, Database, ErrorKind, Expression, Flag};

#[test]
fn backreference_is_invalid_on_both_variants() {
    let result = Expression::new(r"test\1").validate();
    assert!(!result.is_valid_base());
    assert!(!result.is_valid_extended());
    assert!(!result.is_valid());
    assert!(!result.base().error_message().unwrap().is_empty());
    assert!(!result.extended().error_message().unwrap().is_empty());
}

#[test]
fn plain_pattern_is_valid_on_both_variants() {
    let result = Expression::with_flags("Test", Flag::Caseless).validate();
    assert!(result.is_valid_base());
    assert!(result.is_valid_extended());
    assert_eq!(None, result.base().error_message());
    assert_eq!(None, result.extended().error_message());
}

#[test]
fn empty_pattern_splits_the_verdict() {
    // The base variant insists on the allow-empty flag, which the extended
    // variant doesn't know.
    let result = Expression::new("a|").validate();
    assert!(!result.is_valid_base());
    assert!(result.is_valid_extended());
    assert!(result.is_valid());

    let result = Expression::with_flags("a|", Flag::AllowEmpty).validate();
    assert!(result.is_valid_base());
    assert!(!result.is_valid_extended());
}

#[test]
fn failed_compile_names_the_expression() {
    let bad = Arc::new(Expression::new(r"test\1"));
    let err = Database::compile(Arc::clone(&bad)).unwrap_err();
    let compile = match err.kind() {
        ErrorKind::PatternCompileFailed(compile) => compile,
        kind => panic!("unexpected error kind: {:?}", kind),
    };
    assert!(Arc::ptr_eq(&bad, compile.expression()));
    assert_eq!(0, compile.index());
    assert!(!compile.message().is_empty());
    assert_eq!(Some(-4), err.code());
}

#[test]
fn failed_batch_names_the_right_expression() {
    let exprs = vec![
        Arc::new(Expression::new("fine")),
        Arc::new(Expression::new("also fine")),
        Arc::new(Expression::new("(unclosed")),
    ];
    let err = Database::compile_many(exprs.clone()).unwrap_err();
    let compile = err.compile_error().unwrap();
    assert_eq!(2, compile.index());
    assert_eq!(Some(2), compile.engine_index());
    assert!(Arc::ptr_eq(&exprs[2], compile.expression()));
}

#[test]
fn base_only_flag_fails_compile() {
    let err = Database::compile(Expression::with_flags("a", Flag::Prefilter))
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidParameter), "{}", err);
    assert!(err.to_string().contains("expression 0"), "{}", err);
    // Caught before the engine saw it.
    assert_eq!(None, err.code());
}

#[test]
fn oversized_pattern_fails_compile() {
    let huge = || {
        Expression::with_flags(r"\w{100}{100}", Flag::Utf8 | Flag::Ucp)
    };
    let err = Database::compile(huge()).unwrap_err();
    let compile = err.compile_error().unwrap();
    assert!(compile.message().contains("too large"), "{}", err);
    assert_eq!(Some(-4), err.code());

    let result = huge().validate();
    assert!(!result.is_valid_extended());
    let msg = result.extended().error_message().unwrap();
    assert!(msg.contains("too large"), "{}", msg);
}

#[test]
fn size_limit_can_be_changed() {
    let expr = || Expression::with_flags(r"\w{50}", Flag::Utf8 | Flag::Ucp);
    let tight = Portable::new().size_limit(Some(1 << 10));
    let err = Database::compile_with(tight, expr()).unwrap_err();
    assert!(err.compile_error().is_some(), "{}", err);

    let unbounded = Portable::new().size_limit(None);
    assert!(Database::compile_with(unbounded, expr()).is_ok());
}

#[test]
fn info_reports_character_widths_in_bytes() {
    let info = Expression::with_flags("é{2,3}", Flag::Utf8).info().unwrap();
    assert_eq!(4, info.min_width());
    assert_eq!(Some(6), info.max_width());
    assert!(!info.unordered_matches());

    let info = Expression::new("a+").info().unwrap();
    assert_eq!(1, info.min_width());
    assert_eq!(None, info.max_width());
}

#[test]
fn info_of_end_anchored_pattern() {
    let info = Expression::new("abc$").info().unwrap();
    assert!(info.matches_at_eod());
    assert!(info.matches_only_at_eod());

    let info = Expression::new("abc").info().unwrap();
    assert!(!info.matches_only_at_eod());
}

#[test]
fn info_of_invalid_pattern() {
    let err = Expression::new("(").info().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::CompilerFailure), "{}", err);
}

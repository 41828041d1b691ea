// Copyright 2014 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use hsmatch::{Expression, Flag, Flags};

// Builds an expression from a pattern and any number of flags.
macro_rules! e {
    ($pat:expr) => {
        crate::expr($pat, &[])
    };
    ($pat:expr, $($flag:ident)|+) => {
        crate::expr($pat, &[$(hsmatch::Flag::$flag),+])
    };
}

// Compiles every expression into one database, scans the text and compares
// the `(pattern id, start, end)` of every match, in order.
macro_rules! scan {
    ($name:ident, [$($expr:expr),+ $(,)?], $text:expr, [$($m:expr),* $(,)?] $(,)?) => {
        #[test]
        fn $name() {
            crate::init_logging();
            let text = $text;
            let db = hsmatch::Database::compile_many(vec![$($expr),+])
                .unwrap();
            let mut scanner = db.scanner().unwrap();
            let got: Vec<(usize, usize, usize)> = scanner
                .scan(&db, text)
                .unwrap()
                .iter()
                .map(|m| (m.id(), m.start(), m.end()))
                .collect();
            let expected: Vec<(usize, usize, usize)> = vec![$($m),*];
            if expected != got {
                panic!(
                    "For {:?} against {:?}, expected {:?} but got {:?}",
                    db.expressions(), text, expected, got,
                );
            }
        }
    };
}

fn expr(pattern: &str, flags: &[Flag]) -> Expression {
    Expression::with_flags(pattern, flags.iter().copied().collect::<Flags>())
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

mod concurrency;
mod engines;
mod unicode;
mod validation;

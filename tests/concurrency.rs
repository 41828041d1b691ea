// Copyright 2014 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::{sync::Arc, thread};

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use hsmatch::{Database, Error, Expression, Flag, Scanner};

fn assert_send<T: Send>() {}
fn assert_sync<T: Sync>() {}

#[test]
fn auto_traits() {
    assert_send::<Database>();
    assert_sync::<Database>();
    assert_send::<Scanner>();
    assert_send::<Expression>();
    assert_sync::<Expression>();
    assert_send::<Error>();
    assert_sync::<Error>();
}

fn patterns() -> Vec<Expression> {
    vec![
        Expression::new("[0-9]+"),
        Expression::with_flags("ab", Flag::Caseless),
        Expression::with_flags("é+", Flag::Utf8 | Flag::ExtractMatched),
        Expression::with_flags("😀", Flag::SingleMatch),
    ]
}

fn haystacks(count: usize) -> Vec<String> {
    let alphabet = ['a', 'B', 'b', '1', '2', 'é', '😀', ' ', '\n'];
    let mut rng = StdRng::seed_from_u64(0x5eed);
    (0..count)
        .map(|_| {
            let len = rng.gen_range(0..64);
            (0..len)
                .map(|_| *alphabet.choose(&mut rng).unwrap())
                .collect::<String>()
        })
        .collect()
}

type Found = Vec<(usize, usize, usize, Option<String>)>;

fn scan_all(
    db: &Database,
    scanner: &mut Scanner,
    haystacks: &[String],
) -> Vec<Found> {
    haystacks
        .iter()
        .map(|text| {
            scanner
                .scan(db, text)
                .unwrap()
                .iter()
                .map(|m| {
                    (
                        m.id(),
                        m.start(),
                        m.end(),
                        m.matched_text().map(str::to_string),
                    )
                })
                .collect()
        })
        .collect()
}

#[test]
fn shared_database_many_scanners() {
    crate::init_logging();
    let db = Arc::new(Database::compile_many(patterns()).unwrap());
    let haystacks = Arc::new(haystacks(200));
    let expected = {
        let mut scanner = db.scanner().unwrap();
        Arc::new(scan_all(&db, &mut scanner, &haystacks))
    };

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let db = Arc::clone(&db);
            let haystacks = Arc::clone(&haystacks);
            let expected = Arc::clone(&expected);
            thread::spawn(move || {
                let mut scanner = Scanner::new();
                scanner.alloc(&db).unwrap();
                for _ in 0..5 {
                    let got = scan_all(&db, &mut scanner, &haystacks);
                    assert_eq!(*expected, got);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn scanner_moves_between_threads() {
    let db = Arc::new(Database::compile(Expression::new("b+")).unwrap());
    let mut scanner = db.scanner().unwrap();
    assert_eq!(1, scanner.scan(&db, "abba").unwrap().len());
    let scanner = {
        let db = Arc::clone(&db);
        thread::spawn(move || {
            let n = scanner.scan(&db, "b b b").unwrap().len();
            assert_eq!(3, n);
            scanner
        })
        .join()
        .unwrap()
    };
    drop(scanner);
}

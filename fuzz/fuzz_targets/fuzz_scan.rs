#![no_main]

use {
    arbitrary::{Arbitrary, Unstructured},
    hsmatch::{
        engine::{Variant, EXTENDED_FLAGS},
        Database, Expression, Flags,
    },
    libfuzzer_sys::fuzz_target,
};

#[derive(Debug)]
struct Case {
    patterns: Vec<(String, u32)>,
    haystack: String,
}

impl<'a> Arbitrary<'a> for Case {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Case> {
        let len = u.int_in_range(1..=4)?;
        let mut patterns = Vec::with_capacity(len);
        for _ in 0..len {
            patterns.push((String::arbitrary(u)?, u32::arbitrary(u)?));
        }
        Ok(Case { patterns, haystack: String::arbitrary(u)? })
    }
}

fuzz_target!(|case: Case| {
    let _ = env_logger::try_init();
    let _ = run(case);
});

fn run(case: Case) -> Option<()> {
    let exprs: Vec<Expression> = case
        .patterns
        .iter()
        .map(|(pattern, bits)| {
            let flags = Flags::decode(Variant::Extended, bits & EXTENDED_FLAGS)
                .unwrap_or_default();
            Expression::with_flags(pattern.as_str(), flags)
        })
        .collect();
    let db = Database::compile_many(exprs).ok()?;
    let mut scanner = db.scanner().ok()?;
    let chars = case.haystack.chars().count();
    for m in scanner.scan(&db, &case.haystack).ok()? {
        assert!(m.id() < db.len());
        assert!(m.start() <= m.end(), "{:?}", m);
        assert!(m.end() <= chars, "{:?} in {} chars", m, chars);
    }
    Some(())
}

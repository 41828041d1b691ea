use std::io::{stdout, Write};

use {
    anyhow::Context,
    bstr::ByteSlice,
    lexopt::{Arg, Parser},
};

use crate::{
    args::{self, Configurable, Usage},
    util::{self, Table},
};

pub fn run(p: &mut Parser) -> anyhow::Result<()> {
    const USAGE: &str = "\
Compiles every pattern into one database and scans a haystack with it.

Each match is printed as 'id:start:end', where offsets are counted in
characters. With -x/--extract the matched text follows as a fourth field.

USAGE:
    hsmatch-cli scan [-p <pattern> ...] <haystack-path>
    hsmatch-cli scan [-p <pattern> ...] -y <haystack>

TIP:
    use -h for short docs and --help for long docs

OPTIONS:
%options%
";

    let mut common = args::common::Config::default();
    let mut patterns = args::patterns::Config::only_flags();
    let mut flags = args::flags::Config::default();
    let mut engine = args::engine::Config::default();
    let mut haystack = args::haystack::Config::default();
    let mut scan = Config::default();
    args::configure(
        p,
        USAGE,
        &mut [
            &mut common,
            &mut patterns,
            &mut flags,
            &mut engine,
            &mut haystack,
            &mut scan,
        ],
    )?;

    let exprs = patterns.expressions(flags.flags())?;
    let builder = engine.builder(exprs)?;
    let mut table = Table::empty();
    let (db, time) = util::timeitr(|| builder.build())?;
    table.add("compile time", time);
    table.add("patterns", db.len());
    table.add("database size", db.size()?);
    let (mut scanner, time) = util::timeitr(|| db.scanner())?;
    table.add("scratch alloc time", time);
    table.add("scratch size", scanner.scratch_size()?);

    let mut out = stdout();
    haystack.with(|haystack| {
        let (matches, time) = util::timeitr(|| {
            let mut matches = vec![];
            for _ in 0..scan.repeat() {
                matches = scanner.scan(&db, haystack)?;
            }
            Ok::<_, hsmatch::Error>(matches)
        })
        .context("scan failed")?;
        table.add("haystack characters", haystack.chars().count());
        table.add("scan time", time);
        table.add("total matches", matches.len());
        if scan.count || common.quiet {
            let mut counts = vec![0u64; db.len()];
            for m in matches.iter() {
                counts[m.id()] += 1;
            }
            if common.quiet {
                writeln!(out, "{}", matches.len())?;
            } else {
                for (id, count) in counts.iter().enumerate() {
                    writeln!(out, "{}:{}", id, count)?;
                }
            }
        } else {
            for m in matches.iter() {
                match m.matched_text() {
                    None => {
                        writeln!(out, "{}:{}:{}", m.id(), m.start(), m.end())?
                    }
                    Some(text) => writeln!(
                        out,
                        "{}:{}:{}:{}",
                        m.id(),
                        m.start(),
                        m.end(),
                        text.as_bytes().escape_bytes(),
                    )?,
                }
            }
        }
        if common.table() {
            table.print(&mut out)?;
        }
        Ok(())
    })
}

#[derive(Debug, Default)]
struct Config {
    count: bool,
    repeat: Option<u32>,
}

impl Config {
    fn repeat(&self) -> u32 {
        self.repeat.unwrap_or(1).max(1)
    }
}

impl Configurable for Config {
    fn configure(
        &mut self,
        p: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool> {
        match *arg {
            Arg::Short('c') | Arg::Long("count") => {
                self.count = true;
            }
            Arg::Long("repeat") => {
                self.repeat = Some(args::parse(p, "--repeat")?);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        const USAGES: &[Usage] = &[
            Usage::new(
                "-c, --count",
                "Print a count of matches per pattern.",
                r#"
Prints 'id:count' for every pattern instead of the matches themselves.
"#,
            ),
            Usage::new(
                "--repeat <n>",
                "Scan the haystack n times.",
                r#"
Scans the haystack this many times with the same scratch space, which is
useful for ad hoc timing. Only the matches of the last scan are printed. The
default is 1.
"#,
            ),
        ];
        USAGES
    }
}

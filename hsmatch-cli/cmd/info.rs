use std::io::{stdout, Write};

use {hsmatch::engine::Engine, lexopt::Parser};

use crate::{
    args,
    util::{self, Table},
};

pub fn run(p: &mut Parser) -> anyhow::Result<()> {
    const USAGE: &str = "\
Prints what the base engine variant knows about each pattern, then compiles
all of them into one database and prints its size and the size of scratch
space allocated for it.

USAGE:
    hsmatch-cli info <pattern> ...

TIP:
    use -h for short docs and --help for long docs

OPTIONS:
%options%
";

    let mut common = args::common::Config::default();
    let mut patterns = args::patterns::Config::positional();
    let mut flags = args::flags::Config::default();
    let mut engine = args::engine::Config::default();
    args::configure(
        p,
        USAGE,
        &mut [&mut common, &mut patterns, &mut flags, &mut engine],
    )?;

    let exprs = patterns.expressions(flags.flags())?;
    let mut out = stdout();
    if !common.quiet {
        let eng = engine.engine()?;
        for (id, expr) in exprs.iter().enumerate() {
            writeln!(out, "{}: {}", id, expr.pattern())?;
            match expr.info_with(&eng) {
                Err(err) => writeln!(out, "    error: {}", err)?,
                Ok(info) => {
                    let max = match info.max_width() {
                        None => "unbounded".to_string(),
                        Some(max) => max.to_string(),
                    };
                    writeln!(out, "    min width: {}", info.min_width())?;
                    writeln!(out, "    max width: {}", max)?;
                    writeln!(
                        out,
                        "    unordered matches: {}",
                        info.unordered_matches()
                    )?;
                    writeln!(
                        out,
                        "    matches at end: {}",
                        info.matches_at_eod()
                    )?;
                    writeln!(
                        out,
                        "    matches only at end: {}",
                        info.matches_only_at_eod()
                    )?;
                }
            }
        }
    }

    let builder = engine.builder(exprs)?;
    let mut table = Table::empty();
    let (db, time) = util::timeitr(|| builder.build())?;
    table.add("compile time", time);
    table.add("database size", db.size()?);
    let scanner = db.scanner()?;
    table.add("scratch size", scanner.scratch_size()?);
    match scanner.base_scratch_size() {
        Ok(size) => table.add("base scratch size", size),
        Err(err) => log::debug!("no base scratch size: {}", err),
    }
    table.add("engine", db.engine().version());
    if common.table() {
        table.print(&mut out)?;
    }
    Ok(())
}

use std::io::{stdout, Write};

use lexopt::Parser;

use crate::{
    args,
    util::{self, Table},
};

pub fn run(p: &mut Parser) -> anyhow::Result<()> {
    const USAGE: &str = "\
Checks every pattern against both engine variants and prints the verdicts.

For each pattern, one line is printed per variant, either 'ok' or the reason
the variant rejected the pattern. A pattern is usable if at least one variant
accepts it. The command fails if any pattern is unusable.

USAGE:
    hsmatch-cli validate <pattern> ...

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

    let engine = engine.engine()?;
    let exprs = patterns.expressions(flags.flags())?;
    let mut out = stdout();
    let mut table = Table::empty();
    let (results, time) = util::timeit(|| {
        exprs
            .iter()
            .map(|expr| expr.validate_with(&engine))
            .collect::<Vec<_>>()
    });
    table.add("validation time", time);

    let mut unusable = 0;
    for (id, (expr, result)) in exprs.iter().zip(results.iter()).enumerate() {
        if !result.is_valid() {
            unusable += 1;
        }
        if common.quiet {
            continue;
        }
        writeln!(out, "{}: {}", id, expr.pattern())?;
        let verdicts =
            [("base", result.base()), ("extended", result.extended())];
        for (variant, verdict) in verdicts.iter() {
            match verdict.error_message() {
                None => writeln!(out, "    {}: ok", variant)?,
                Some(msg) => writeln!(out, "    {}: {}", variant, msg)?,
            }
        }
    }
    table.add("unusable patterns", unusable);
    if common.table() {
        table.print(&mut out)?;
    }
    anyhow::ensure!(unusable == 0, "{} pattern(s) are unusable", unusable);
    Ok(())
}

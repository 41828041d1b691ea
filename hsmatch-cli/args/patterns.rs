use std::path::PathBuf;

use {
    anyhow::Context,
    hsmatch::{Expression, Flags},
    lexopt::{Arg, Parser, ValueExt},
};

use crate::args::{Configurable, Usage};

/// Patterns read from `-p/--pattern`, `-f/--pattern-file` and, for
/// commands that take no other positional arguments, from positional
/// arguments.
#[derive(Debug, Default)]
pub struct Config {
    patterns: Vec<String>,
    fixed_strings: bool,
    positional: bool,
}

impl Config {
    /// Every positional argument is a pattern.
    pub fn positional() -> Config {
        Config { positional: true, ..Config::default() }
    }

    /// Patterns only come from flags, leaving positional arguments to
    /// someone else.
    pub fn only_flags() -> Config {
        Config::default()
    }

    /// Returns one expression per pattern, each with `flags`. Pattern ids
    /// follow the order the patterns were given in.
    pub fn expressions(
        &self,
        flags: Flags,
    ) -> anyhow::Result<Vec<Expression>> {
        anyhow::ensure!(!self.patterns.is_empty(), "no patterns were given");
        Ok(self
            .patterns
            .iter()
            .map(|p| {
                let pattern = if self.fixed_strings {
                    regex_syntax::escape(p)
                } else {
                    p.clone()
                };
                Expression::with_flags(pattern, flags)
            })
            .collect())
    }
}

impl Configurable for Config {
    fn configure(
        &mut self,
        p: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool> {
        match *arg {
            Arg::Short('p') | Arg::Long("pattern") => {
                let pat = p.value().context("-p/--pattern needs a value")?;
                let pat = pat
                    .string()
                    .context("-p/--pattern must be valid UTF-8")?;
                self.patterns.push(pat);
            }
            Arg::Short('F') | Arg::Long("fixed-strings") => {
                self.fixed_strings = true;
            }
            Arg::Short('f') | Arg::Long("pattern-file") => {
                let path =
                    PathBuf::from(p.value().context("-f/--pattern-file")?);
                let contents =
                    std::fs::read_to_string(&path).with_context(|| {
                        format!("failed to read {}", path.display())
                    })?;
                self.patterns.extend(
                    contents
                        .lines()
                        .filter(|line| !line.is_empty())
                        .map(|line| line.to_string()),
                );
            }
            Arg::Value(ref mut v) => {
                if !self.positional {
                    return Ok(false);
                }
                let v = std::mem::take(v);
                self.patterns
                    .push(v.string().context("patterns must be valid UTF-8")?);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        const USAGES: &[Usage] = &[
            Usage::new(
                "-p, --pattern <pattern>",
                "Add a pattern to this command.",
                r#"
Adds a pattern. Its id is its position among all the patterns given, counting
from zero, whether they come from this flag, from -f/--pattern-file or from
positional arguments (where supported).

All patterns must be valid UTF-8.
"#,
            ),
            Usage::new(
                "-f, --pattern-file <path>",
                "Read patterns from a file, one per line.",
                r#"
Reads patterns from the file given, one per line. Empty lines are skipped.
"#,
            ),
            Usage::new(
                "-F, --fixed-strings",
                "Interpret all patterns literally.",
                r#"
Escapes every pattern so that meta characters like '+' match themselves.
"#,
            ),
        ];
        USAGES
    }
}

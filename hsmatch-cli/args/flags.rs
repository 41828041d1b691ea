use {
    hsmatch::{Flag, Flags},
    lexopt::{Arg, Parser},
};

use crate::args::{self, Configurable, Usage};

/// Pattern flags, applied to every pattern of a command.
#[derive(Debug, Default)]
pub struct Config {
    flags: Flags,
}

impl Config {
    pub fn flags(&self) -> Flags {
        self.flags
    }
}

impl Configurable for Config {
    fn configure(
        &mut self,
        p: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool> {
        let flag = match *arg {
            Arg::Short('i') | Arg::Long("caseless") => Flag::Caseless,
            Arg::Short('s') | Arg::Long("dotall") => Flag::DotAll,
            Arg::Short('m') | Arg::Long("multiline") => Flag::MultiLine,
            Arg::Short('u') | Arg::Long("utf8") => Flag::Utf8,
            Arg::Long("single-match") => Flag::SingleMatch,
            Arg::Short('x') | Arg::Long("extract") => Flag::ExtractMatched,
            Arg::Long("flag") => args::parse(p, "--flag")?,
            _ => return Ok(false),
        };
        self.flags.insert(flag);
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        const USAGES: &[Usage] = &[
            Usage::new(
                "-i, --caseless",
                "Match case insensitively.",
                r#"
Sets the caseless flag on every pattern.
"#,
            ),
            Usage::new(
                "-s, --dotall",
                "Let '.' match a line terminator.",
                r#"
Sets the dotall flag on every pattern, so that '.' also matches '\n'.
"#,
            ),
            Usage::new(
                "-m, --multiline",
                "Let '^' and '$' match at line boundaries.",
                r#"
Sets the multiline flag on every pattern, so that '^' and '$' match at the
start and end of every line instead of only at the start and end of the
haystack.
"#,
            ),
            Usage::new(
                "-u, --utf8",
                "Treat patterns and haystacks as UTF-8.",
                r#"
Sets the utf8 flag on every pattern.
"#,
            ),
            Usage::new(
                "--single-match",
                "Report at most one match per pattern.",
                r#"
Sets the single-match flag on every pattern. Each pattern then reports only
its first match in the haystack.
"#,
            ),
            Usage::new(
                "-x, --extract",
                "Print the text of each match.",
                r#"
Extracts the matched text of every match and prints it after the offsets.
"#,
            ),
            Usage::new(
                "--flag <name>",
                "Set a flag by name.",
                r#"
Sets any flag by its name. The names are: caseless, dotall, multiline,
single-match, allow-empty, utf8, ucp, prefilter, som-leftmost and
extract-matched.

The allow-empty, prefilter and som-leftmost flags are only understood by the
base engine variant, so they only make sense with the 'validate' and 'info'
commands.
"#,
            ),
        ];
        USAGES
    }
}

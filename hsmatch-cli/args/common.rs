use lexopt::{Arg, Parser};

use crate::args::{Configurable, Usage};

/// Output knobs shared by every command.
#[derive(Debug, Default)]
pub struct Config {
    pub quiet: bool,
    pub no_table: bool,
}

impl Config {
    pub fn table(&self) -> bool {
        !self.no_table && !self.quiet
    }
}

impl Configurable for Config {
    fn configure(
        &mut self,
        _: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool> {
        match *arg {
            Arg::Short('q') | Arg::Long("quiet") => {
                self.quiet = true;
            }
            Arg::Long("no-table") => {
                self.no_table = true;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        const USAGES: &[Usage] = &[
            Usage::new(
                "-q, --quiet",
                "Suppress the table and per-item output.",
                r#"
Suppresses everything but the essential result of a command. For 'scan' this
means only the total number of matches is printed. For 'validate' nothing is
printed and the exit status says whether every pattern was valid.
"#,
            ),
            Usage::new(
                "--no-table",
                "Omit the table of timings and sizes.",
                r#"
Most commands print a table of timings and sizes after their main output.
Passing this flag suppresses it.
"#,
            ),
        ];
        USAGES
    }
}

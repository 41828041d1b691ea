use {
    hsmatch::{engine::DefaultEngine, Builder, Expression},
    lexopt::{Arg, Parser},
};

use crate::args::{self, Configurable, Usage};

/// Knobs for the engine and for database compilation.
#[derive(Debug, Default)]
pub struct Config {
    // Only set when --size-limit is given. The inner `None` means unbounded.
    size_limit: Option<Option<usize>>,
    no_groups: bool,
}

impl Config {
    /// Returns the engine to compile and scan with.
    pub fn engine(&self) -> anyhow::Result<DefaultEngine> {
        #[cfg(not(feature = "native"))]
        {
            let engine = hsmatch::engine::Portable::new();
            Ok(match self.size_limit {
                None => engine,
                Some(limit) => engine.size_limit(limit),
            })
        }
        #[cfg(feature = "native")]
        {
            use hsmatch::engine::Engine;

            anyhow::ensure!(
                self.size_limit.is_none(),
                "--size-limit is not supported by the native engine",
            );
            let engine = hsmatch::engine::Native::new();
            anyhow::ensure!(
                engine.valid_platform(),
                "this CPU can't run {}",
                engine.version(),
            );
            Ok(engine)
        }
    }

    /// Returns a database builder for `expressions`.
    pub fn builder(
        &self,
        expressions: Vec<Expression>,
    ) -> anyhow::Result<Builder<DefaultEngine>> {
        Ok(Builder::new()
            .engine(self.engine()?)
            .groups(!self.no_groups)
            .expressions(expressions))
    }
}

impl Configurable for Config {
    fn configure(
        &mut self,
        p: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool> {
        match *arg {
            Arg::Long("size-limit") => {
                self.size_limit =
                    Some(args::parse_maybe(p, "--size-limit")?);
            }
            Arg::Long("no-groups") => {
                self.no_groups = true;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        const USAGES: &[Usage] = &[
            Usage::new(
                "--size-limit <bytes>",
                "Bound the compiled size of each pattern.",
                r#"
Sets the maximum size in bytes of each pattern's compiled automaton. Patterns
that exceed it fail to compile. The default is 10485760 (10 MiB). The special
value 'none' removes the limit.

Only the portable engine supports this.
"#,
            ),
            Usage::new(
                "--no-groups",
                "Compile without capture group support.",
                r#"
Compiles the database in a mode that doesn't track capture groups. Match
offsets are unaffected.
"#,
            ),
        ];
        USAGES
    }
}

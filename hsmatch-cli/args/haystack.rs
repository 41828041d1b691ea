use std::path::PathBuf;

use {
    anyhow::Context,
    bstr::{ByteSlice, ByteVec},
    lexopt::{Arg, Parser, ValueExt},
};

use crate::args::{Configurable, Usage};

/// The haystack to scan: either inline via `-y/--haystack` or a file path
/// given as a positional argument. Exactly one is required.
#[derive(Debug, Default)]
pub struct Config {
    kind: Option<Kind>,
}

#[derive(Debug)]
enum Kind {
    Inline(String),
    Path(PathBuf),
}

impl Config {
    /// Passes the haystack to `f`. Files are memory mapped and must be
    /// valid UTF-8.
    pub fn with<T>(
        &self,
        mut f: impl FnMut(&str) -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        match self.kind {
            Some(Kind::Inline(ref haystack)) => f(haystack),
            Some(Kind::Path(ref path)) => {
                let file = std::fs::File::open(path).with_context(|| {
                    format!("failed to open {}", path.display())
                })?;
                // SAFETY: the mapping is only ever read, and we assume
                // nobody truncates the file while we scan it.
                let mmap = unsafe {
                    memmap2::Mmap::map(&file).with_context(|| {
                        format!("failed to mmap {}", path.display())
                    })?
                };
                let haystack = mmap.to_str().with_context(|| {
                    format!("{} is not valid UTF-8", path.display())
                })?;
                f(haystack)
            }
            None => anyhow::bail!(
                "haystack is required via the -y/--haystack flag \
                 or via a positional argument",
            ),
        }
    }
}

impl Configurable for Config {
    fn configure(
        &mut self,
        p: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool> {
        match *arg {
            Arg::Short('y') | Arg::Long("haystack") => {
                anyhow::ensure!(
                    self.kind.is_none(),
                    "only one haystack is allowed",
                );
                let hay = p.value().context("-y/--haystack needs a value")?;
                let hay = hay
                    .string()
                    .context("-y/--haystack must be valid UTF-8")?;
                let hay = Vec::unescape_bytes(&hay)
                    .into_string()
                    .context("-y/--haystack must unescape to valid UTF-8")?;
                self.kind = Some(Kind::Inline(hay));
            }
            Arg::Value(ref mut v) => {
                anyhow::ensure!(
                    self.kind.is_none(),
                    "only one haystack is allowed",
                );
                self.kind = Some(Kind::Path(PathBuf::from(std::mem::take(v))));
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        const USAGES: &[Usage] = &[Usage::new(
            "-y, --haystack <haystack>",
            "Provide an inline haystack on the command line.",
            r#"
Scans the value of this flag instead of a file. Escape sequences are
supported, so "-y 'a\tb'" contains a tab. The result must be valid UTF-8,
since match offsets are reported in characters.

Exactly one haystack is permitted: either this flag or a file path given as a
positional argument. Files are memory mapped.
"#,
        )];
        USAGES
    }
}

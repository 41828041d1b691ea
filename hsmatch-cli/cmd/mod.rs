mod info;
mod scan;
mod validate;

const USAGE: &str = "\
A tool for compiling, validating and scanning with hsmatch databases.

USAGE:
    hsmatch-cli <command> ...

COMMANDS:
    info      Print metadata about patterns and the database they compile to.
    scan      Compile patterns into a database and scan a haystack with it.
    validate  Check patterns against both engine variants.
    version   Print the engine version and whether this CPU can run it.
";

pub fn run(p: &mut lexopt::Parser) -> anyhow::Result<()> {
    let cmd = crate::args::next_as_command(USAGE, p)?;
    match &*cmd {
        "info" => info::run(p),
        "scan" => scan::run(p),
        "validate" => validate::run(p),
        "version" => run_version(p),
        unk => anyhow::bail!("unrecognized command '{unk}'"),
    }
}

fn run_version(p: &mut lexopt::Parser) -> anyhow::Result<()> {
    const USAGE: &str = "\
Prints the version of the default engine and whether this CPU can run it.

USAGE:
    hsmatch-cli version
";
    crate::args::configure(p, USAGE, &mut [])?;
    println!("hsmatch-cli {}", env!("CARGO_PKG_VERSION"));
    println!("engine: {}", hsmatch::version());
    println!("valid platform: {}", hsmatch::is_valid_platform());
    Ok(())
}

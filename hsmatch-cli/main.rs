use std::{env, io::Write};

mod args;
mod cmd;
mod logger;
mod util;

fn main() -> anyhow::Result<()> {
    let level = match env::var("RUST_LOG") {
        Ok(level) => level.parse().map_err(|_| {
            anyhow::anyhow!("unrecognized log level '{}'", level)
        })?,
        Err(_) => log::LevelFilter::Off,
    };
    logger::Logger::init()?;
    log::set_max_level(level);

    if let Err(err) = cmd::run(&mut lexopt::Parser::from_env()) {
        let mut stderr = std::io::stderr();
        if env::var("RUST_BACKTRACE").map_or(false, |v| v == "1") {
            let _ = writeln!(stderr, "{:?}", err);
        } else {
            let _ = writeln!(stderr, "{:#}", err);
        }
        std::process::exit(1);
    }
    Ok(())
}

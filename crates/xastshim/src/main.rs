//! Xastshim runs selector queries against XML documents.

use clap::Parser;
use xastshim::{
    args::{Args, Command, RunCommand},
    config::Config,
};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = Config::load()?;

    match args.command {
        Command::Query(args) => args.run(config)?,
    }
    Ok(())
}

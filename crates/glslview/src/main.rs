mod cli;
mod run;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    run::initialise_tracing();
    let args = cli::Cli::parse();
    run::run(args)
}

use anyhow::Context;
use clap::Parser;
use metar_processor::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli).context("metar-processor failed")
}

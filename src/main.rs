mod builder;
mod cli;
mod config;
mod github;
mod model;
mod split;
mod sync;
mod util;

use anyhow::Result;
use clap::Parser;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::init_logging(cli.verbose);

    // Load config
    let config = config::load_config()?;

    cli::run(cli, config).await
}

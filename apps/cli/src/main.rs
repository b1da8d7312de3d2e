//! svedb-extract: card catalog extraction tool.
//!
//! Pulls every card of the requested segments from the catalog search API,
//! enriches each from its detail page, optionally mirrors the images to an
//! S3-compatible bucket, and writes the result as one JSON document.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
